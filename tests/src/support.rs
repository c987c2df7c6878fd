//! Shared fixtures for the integration flows.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cc_01_mempool::{Mempool, MockTimeSource};
use cc_02_ledger::{LedgerConfig, LedgerService, LedgerStore};
use node_runtime::adapters::storage::InMemoryStore;
use parking_lot::Mutex;
use serde_json::Value;
use shared_bus::InMemoryEventBus;
use shared_types::{Block, ChainStats, StorageError, Transaction, TransactionKind};
use tokio::sync::mpsc::UnboundedReceiver;

pub const T0: u64 = 1_700_000_000_000_000_000;

// =============================================================================
// FAILING STORE
// =============================================================================

/// [`InMemoryStore`] with switchable write failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: Arc<InMemoryStore>,
    fail_blocks: AtomicBool,
    fail_tx_for: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_blocks(&self, fail: bool) {
        self.fail_blocks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_transaction_for(&self, entity_id: &str) {
        self.fail_tx_for.lock().insert(entity_id.to_string());
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn load_latest_block(&self) -> Result<Block, StorageError> {
        self.inner.load_latest_block().await
    }

    async fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        if self.fail_blocks.load(Ordering::SeqCst) {
            return Err(StorageError::DatabaseError("disk full".into()));
        }
        self.inner.save_block(block).await
    }

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), StorageError> {
        if self.fail_tx_for.lock().contains(&tx.entity_id) {
            return Err(StorageError::DatabaseError(format!("rejected {}", tx.entity_id)));
        }
        self.inner.save_transaction(tx).await
    }

    async fn set_entity_block_ref(
        &self,
        kind: TransactionKind,
        entity_id: &str,
        block_id: &str,
    ) -> Result<(), StorageError> {
        self.inner.set_entity_block_ref(kind, entity_id, block_id).await
    }

    async fn block_by_id(&self, id: &str) -> Result<Block, StorageError> {
        self.inner.block_by_id(id).await
    }

    async fn block_by_height(&self, height: u64) -> Result<Block, StorageError> {
        self.inner.block_by_height(height).await
    }

    async fn transactions_for_block(&self, block_id: &str) -> Result<Vec<Transaction>, StorageError> {
        self.inner.transactions_for_block(block_id).await
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, StorageError> {
        self.inner.transaction_by_hash(hash).await
    }

    async fn transaction_for_entity(&self, entity_id: &str) -> Result<Transaction, StorageError> {
        self.inner.transaction_for_entity(entity_id).await
    }

    async fn transactions_for_address(
        &self,
        address: &str,
    ) -> Result<Vec<Transaction>, StorageError> {
        self.inner.transactions_for_address(address).await
    }

    async fn stats(&self) -> Result<ChainStats, StorageError> {
        self.inner.stats().await
    }
}

// =============================================================================
// LEDGER HARNESS
// =============================================================================

pub struct LedgerHarness {
    pub ledger: Arc<LedgerService>,
    pub mempool: Arc<Mempool>,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: Arc<MockTimeSource>,
}

pub fn ledger_harness(
    store: Arc<dyn LedgerStore>,
    capacity: usize,
    block_time_secs: u64,
) -> LedgerHarness {
    let mempool = Arc::new(Mempool::with_capacity(capacity));
    let bus = Arc::new(InMemoryEventBus::new());
    let clock = Arc::new(MockTimeSource::new(T0));
    let config = LedgerConfig {
        block_time_secs,
        ..Default::default()
    };
    let ledger = Arc::new(LedgerService::new(
        config,
        store,
        mempool.clone(),
        bus.clone(),
        clock.clone(),
    ));
    LedgerHarness {
        ledger,
        mempool,
        bus,
        clock,
    }
}

// =============================================================================
// FRAME CAPTURE
// =============================================================================

/// Waits for the next frame of `kind`, skipping others.
pub async fn next_of_kind(frames: &mut UnboundedReceiver<String>, kind: &str) -> Value {
    let wait = async {
        while let Some(frame) = frames.recv().await {
            let value: Value = serde_json::from_str(&frame).expect("frame is JSON");
            if value["type"] == kind {
                return value;
            }
        }
        panic!("connection closed before a {kind} frame");
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .unwrap_or_else(|_| panic!("no {kind} frame within 2s"))
}

/// Types of every frame already buffered.
pub fn buffered_kinds(frames: &mut UnboundedReceiver<String>) -> Vec<String> {
    let mut kinds = Vec::new();
    while let Ok(frame) = frames.try_recv() {
        let value: Value = serde_json::from_str(&frame).expect("frame is JSON");
        kinds.push(value["type"].as_str().unwrap_or_default().to_string());
    }
    kinds
}
