//! Node lifecycle.

use std::sync::Arc;

use axum::Router;
use cc_02_ledger::LedgerApi;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api;
use crate::container::NodeServices;
use crate::error::Result;
use crate::wiring::spawn_event_bridge;

/// Owns the background tasks of a running node.
///
/// ## Shutdown Sequence
///
/// 1. Stop accepting HTTP requests and stop the sealing cycle, which seals
///    the remaining mempool once when configured to
/// 2. Stop the event bridge, after the final `BlockSealed` went through it
/// 3. Close every pool connection
pub struct NodeRuntime {
    services: Arc<NodeServices>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    bridge_tx: watch::Sender<bool>,
    ledger_task: Mutex<Option<JoinHandle<()>>>,
    bridge_task: Mutex<Option<JoinHandle<()>>>,
}

impl NodeRuntime {
    pub fn new(services: NodeServices) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (bridge_tx, _) = watch::channel(false);
        Self {
            services: Arc::new(services),
            shutdown_tx,
            shutdown_rx,
            bridge_tx,
            ledger_task: Mutex::new(None),
            bridge_task: Mutex::new(None),
        }
    }

    pub fn services(&self) -> Arc<NodeServices> {
        Arc::clone(&self.services)
    }

    /// Starts the event bridge, then establishes the chain head and the
    /// sealing cycle.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Courier-Chain Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let bridge = spawn_event_bridge(
            &self.services.bus,
            self.services.direct_pool.clone(),
            self.bridge_tx.subscribe(),
        );
        *self.bridge_task.lock() = Some(bridge);

        let ledger = self
            .services
            .ledger
            .initialize(self.shutdown_rx.clone())
            .await?;
        *self.ledger_task.lock() = Some(ledger);

        let head = self.services.ledger.head()?;
        info!(
            height = head.height,
            head = %head.id,
            "[node] Node ready"
        );
        Ok(())
    }

    pub fn router(&self) -> Router {
        api::router(self.services())
    }

    /// Serves HTTP until shutdown is signalled.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "[node] HTTP listening");

        let mut shutdown = self.shutdown_rx.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;
        info!("[node] HTTP server stopped");
        Ok(())
    }

    pub async fn shutdown(&self) {
        info!("[node] Initiating graceful shutdown");
        let _ = self.shutdown_tx.send(true);

        let ledger = self.ledger_task.lock().take();
        if let Some(task) = ledger {
            if let Err(e) = task.await {
                error!(error = %e, "[node] Sealing task panicked");
            }
        }

        let _ = self.bridge_tx.send(true);
        let bridge = self.bridge_task.lock().take();
        if let Some(task) = bridge {
            if let Err(e) = task.await {
                error!(error = %e, "[node] Event bridge panicked");
            }
        }

        self.services.shutdown_pools().await;
        info!("[node] Shutdown complete");
    }
}
