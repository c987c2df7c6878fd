//! # Node Services
//!
//! Owns the constructed subsystems.
//!
//! ## Initialization Order
//!
//! ```text
//! store ──→ event bus ──→ mempool ──→ ledger ──→ pools (direct, secret)
//! ```
//!
//! The ledger depends on the store, the mempool and the bus; the direct pool
//! depends on the store (registration sweep) and the bus. The secret pool
//! has no store: its traffic is never persisted.

use std::sync::Arc;

use cc_01_mempool::{Mempool, SystemTimeSource, TimeSource};
use cc_02_ledger::{LedgerService, LedgerStore};
use cc_03_delivery::{ConnectionPool, MessageStore, PoolHandle};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, InMemoryEventBus};
use tokio::task::JoinHandle;
use tracing::info;

use super::config::{NodeConfig, StorageBackend};
use crate::adapters::storage::{InMemoryStore, MessageRepository};
use crate::error::{Result, RuntimeError};

/// Every long-lived service of a running node.
pub struct NodeServices {
    pub config: NodeConfig,
    pub bus: Arc<InMemoryEventBus>,
    pub mempool: Arc<Mempool>,
    pub clock: Arc<dyn TimeSource>,
    pub ledger: Arc<LedgerService>,
    pub direct_pool: PoolHandle,
    pub secret_pool: PoolHandle,
    pub messages: Arc<dyn MessageStore>,
    pub repository: Arc<dyn MessageRepository>,
    pool_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NodeServices {
    /// Opens the configured backend and builds on it.
    pub fn open(config: NodeConfig) -> Result<Self> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("[node] Using in-memory storage");
                Self::build(config, Arc::new(InMemoryStore::new()))
            }
            StorageBackend::RocksDb => Self::open_rocksdb(config),
        }
    }

    #[cfg(feature = "rocksdb")]
    fn open_rocksdb(config: NodeConfig) -> Result<Self> {
        use crate::adapters::storage::{RocksDbConfig, RocksDbStore};

        let store = RocksDbStore::open(RocksDbConfig::in_dir(&config.storage.data_dir))?;
        Self::build(config, Arc::new(store))
    }

    #[cfg(not(feature = "rocksdb"))]
    fn open_rocksdb(_config: NodeConfig) -> Result<Self> {
        Err(RuntimeError::BackendUnavailable("rocksdb"))
    }

    /// Wires every service on top of one store.
    ///
    /// Must be called inside a Tokio runtime; the pool actors are spawned
    /// here.
    pub fn build<S>(config: NodeConfig, store: Arc<S>) -> Result<Self>
    where
        S: LedgerStore + MessageStore + MessageRepository + 'static,
    {
        Self::build_with_clock(config, store, Arc::new(SystemTimeSource))
    }

    pub fn build_with_clock<S>(
        config: NodeConfig,
        store: Arc<S>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self>
    where
        S: LedgerStore + MessageStore + MessageRepository + 'static,
    {
        config.validate()?;

        let bus = Arc::new(InMemoryEventBus::new());
        let publisher: Arc<dyn EventPublisher> = bus.clone();
        let mempool = Arc::new(Mempool::new(config.mempool_config())?);

        let ledger_store: Arc<dyn LedgerStore> = store.clone();
        let messages: Arc<dyn MessageStore> = store.clone();
        let repository: Arc<dyn MessageRepository> = store;

        let ledger = Arc::new(LedgerService::new(
            config.ledger_config(),
            ledger_store,
            mempool.clone(),
            publisher.clone(),
            clock.clone(),
        ));

        let (direct_pool, direct_task) = ConnectionPool::spawn(
            config.direct_pool_config(),
            Some(messages.clone()),
            publisher.clone(),
        )?;
        let (secret_pool, secret_task) =
            ConnectionPool::spawn(config.secret_pool_config(), None, publisher)?;

        info!(
            direct = direct_pool.name(),
            secret = secret_pool.name(),
            "[node] Services assembled"
        );

        Ok(Self {
            config,
            bus,
            mempool,
            clock,
            ledger,
            direct_pool,
            secret_pool,
            messages,
            repository,
            pool_tasks: Mutex::new(vec![direct_task, secret_task]),
        })
    }

    /// Stops both pools and waits for their actors to exit.
    pub async fn shutdown_pools(&self) {
        for pool in [&self.direct_pool, &self.secret_pool] {
            if let Err(e) = pool.shutdown().await {
                tracing::debug!(pool = pool.name(), error = %e, "[node] Pool already stopped");
            }
        }
        let tasks: Vec<_> = self.pool_tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
    }
}
