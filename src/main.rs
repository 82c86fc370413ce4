use tracing_subscriber::EnvFilter;

use practice_api::{app, config, is_production};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SESSION_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("practice_api=info,tower_http=info")),
        )
        .with_ansi(!is_production!())
        .init();

    let config = config::config().clone();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    tracing::info!("Starting Practice API in {:?} mode", config.environment);

    let stores = app::build_stores(&config).await?;
    let port = config.api.port;
    let router = app::router(app::AppState::new(config, stores));

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Practice API listening on http://{}", bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}
