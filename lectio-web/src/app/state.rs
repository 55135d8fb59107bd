use std::sync::Arc;

use lectio_application::{SessionService, VerseService};

/// Application state shared across route handlers.
pub struct AppState {
    pub session: Arc<SessionService>,
    pub verses: Arc<VerseService>,
}
