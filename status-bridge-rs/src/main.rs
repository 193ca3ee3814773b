// status-bridge-rs/src/main.rs
// Status Bridge - alerting incidents and maintenance onto the status page
// Port 8080 - POST /webhook for signed deliveries, GET /health for probes

use std::sync::Arc;

use config_rs::BridgeConfig;
use status_bridge::StatusBridge;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = BridgeConfig::from_env();
    tracing::info!(config = ?config, "Loaded configuration");

    let (bridge, reconciler) = StatusBridge::from_config(&config)?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reconciler_task = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

    let app = Arc::new(bridge).create_router();
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    tracing::info!("Status Bridge listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx))
        .await?;

    if let Err(e) = reconciler_task.await {
        tracing::error!(error = %e, "Maintenance reconciliation task panicked");
    }

    tracing::info!("Status Bridge stopped");
    Ok(())
}

/// Resolve on Ctrl+C and tell every task to stop
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown requested");
    let _ = shutdown_tx.send(());
}
