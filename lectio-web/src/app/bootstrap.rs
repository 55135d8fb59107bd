use std::sync::Arc;

use lectio_application::{SessionService, SubscriptionGuard, VerseService};
use lectio_infrastructure::{ConfigService, SupabaseAuthClient, SupabaseVerseRepository};

use crate::app::AppState;

pub struct AppBootstrap {
    pub app_state: Arc<AppState>,
    pub bind_addr: String,
    /// Keeps the provider-event registration alive for the process
    /// lifetime; releasing it stops session updates.
    pub listener_guard: SubscriptionGuard,
}

pub async fn bootstrap() -> AppBootstrap {
    // Composition Root: configuration first
    let config = ConfigService::new()
        .get_config()
        .expect("Failed to load configuration");
    config
        .validate()
        .expect("Incomplete configuration: set supabase_url and anon_key");

    tracing::info!("[Bootstrap] Backend: {}", config.supabase_url);
    tracing::info!("[Bootstrap] Callback URL: {}", config.callback_url());

    // Identity provider and session lifecycle
    let provider = Arc::new(SupabaseAuthClient::new(
        &config.supabase_url,
        &config.anon_key,
    ));
    let session = Arc::new(SessionService::new(provider, config.callback_url()));

    // Record store, scoped by the session's token
    let repository = Arc::new(SupabaseVerseRepository::new(
        &config.supabase_url,
        &config.anon_key,
        session.clone(),
    ));
    let verses = Arc::new(VerseService::new(repository, session.clone()));

    // One startup session check, then the push-event registration
    session.bootstrap().await;
    let listener_guard = session.clone().listen();

    tracing::info!(
        "[Bootstrap] Session ready (signed in: {})",
        session.state().is_signed_in()
    );

    AppBootstrap {
        app_state: Arc::new(AppState { session, verses }),
        bind_addr: config.bind_addr().to_string(),
        listener_guard,
    }
}
