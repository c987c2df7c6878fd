//! # Courier Node
//!
//! Binary entry point. See the `node_runtime` library for the moving parts.

use std::sync::Arc;

use anyhow::{Context, Result};
use courier_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::{NodeConfig, NodeRuntime, NodeServices};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    let config = NodeConfig::load().context("failed to load configuration")?;
    let addr = config.server.socket_addr()?;

    let services = NodeServices::open(config).context("failed to assemble services")?;
    let runtime = Arc::new(NodeRuntime::new(services));
    runtime.start().await.context("failed to start node")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let server = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.serve(listener).await })
    };

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    server.await??;
    Ok(())
}
