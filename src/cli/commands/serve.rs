use anyhow::Context;
use tracing::info;

use crate::config::AppConfig;
use crate::state::AppState;

pub async fn handle(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    info!(
        "Starting giaycung-api in {:?} mode ({:?} sheets, {:?} shoe storage)",
        config.environment, config.sheets.backend, config.service_orders.shoe_storage
    );

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let app = crate::app(AppState::from_config(config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
