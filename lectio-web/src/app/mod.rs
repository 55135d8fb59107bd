mod bootstrap;
mod state;

pub use bootstrap::{bootstrap, AppBootstrap};
pub use state::AppState;
