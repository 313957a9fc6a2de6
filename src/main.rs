use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use subway_outlets::core::config::{AppPaths, ConfigService};
use subway_outlets::logging;
use subway_outlets::server;
use subway_outlets::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "server.log");

    let config_service = ConfigService::new(paths.clone());
    let config = config_service
        .settings()
        .context("Failed to load configuration")?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::initialize(paths, config).await.map_err(|err| {
        tracing::error!("Startup failed: {}", err);
        err
    })?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
