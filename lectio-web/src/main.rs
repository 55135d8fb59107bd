mod app;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bootstrap = app::bootstrap().await;
    let router = routes::router(bootstrap.app_state.clone());

    // The guard keeps the auth-change listener alive for the life of
    // the server; dropping it would detach the session from the
    // provider's push events.
    let _listener_guard = bootstrap.listener_guard;

    let listener = tokio::net::TcpListener::bind(&bootstrap.bind_addr).await?;
    tracing::info!("[Bootstrap] Listening on {}", bootstrap.bind_addr);
    axum::serve(listener, router).await?;

    Ok(())
}
