use tracing_subscriber::EnvFilter;

use hr_docflow::app;
use hr_docflow::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, ENCRYPTION_KEY, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();

    // RUST_LOG wins; otherwise request traces follow API_ENABLE_REQUEST_LOGGING
    let default_filter = if config.api.enable_request_logging {
        "info,tower_http=debug"
    } else {
        "info,tower_http=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    tracing::info!("Starting Docflow API in {:?} mode", config.environment);
    let port = config.api.port;

    let state = app::bootstrap(config).await?;
    tracing::info!("Storage backend: {}", state.backend.kind());
    let router = app::router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Docflow API listening on http://{}", bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}
