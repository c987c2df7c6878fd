//! Ledger engine service.
//!
//! Owns the chain head and runs the periodic sealing cycle. The sealing task
//! is the only writer of the head and the only consumer of the mempool.

use std::sync::Arc;

use async_trait::async_trait;
use cc_01_mempool::{MempoolApi, TimeSource};
use shared_bus::{BackfillOutcome, EventPublisher, NodeEvent};
use shared_types::{
    Block, BlockWithTransactions, ChainStats, MempoolEntry, StorageError, Transaction,
    TransactionKind, UnixNanos,
};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    check_block, find_nonce, hash_block, hash_transaction, merkle_proof, merkle_root,
    supports_backfill, verify_merkle_proof, ChainHead, DroppedEntry, EntityProof, SealReport,
    SealedEntry, GENESIS_MERKLE_ROOT,
};
use crate::error::{LedgerError, Result};
use crate::ports::{LedgerApi, LedgerStore};

/// The ledger engine.
///
/// Lifecycle: `Uninitialized → Active`. The transition happens once, in
/// [`LedgerService::establish_head`]; sealing afterwards only moves the head.
pub struct LedgerService {
    config: LedgerConfig,
    store: Arc<dyn LedgerStore>,
    mempool: Arc<dyn MempoolApi>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    head: ChainHead,
    /// Serializes seals between the background task and direct callers.
    seal_lock: Mutex<()>,
}

impl LedgerService {
    pub fn new(
        config: LedgerConfig,
        store: Arc<dyn LedgerStore>,
        mempool: Arc<dyn MempoolApi>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        info!("[cc-02] Initializing Ledger Service");
        info!("  Block Time: {}s", config.block_time_secs);
        info!("  Seal On Shutdown: {}", config.seal_on_shutdown);

        Self {
            config,
            store,
            mempool,
            publisher,
            clock,
            head: ChainHead::new(),
            seal_lock: Mutex::new(()),
        }
    }

    /// Establishes the head, then spawns the sealing cycle.
    ///
    /// Returns as soon as the head is set; the returned handle finishes after
    /// `shutdown` flips to `true` (or its sender is dropped).
    pub async fn initialize(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>> {
        self.config.validate()?;
        self.establish_head().await?;

        let service = Arc::clone(self);
        Ok(tokio::spawn(async move {
            service.run_sealing_loop(shutdown).await;
        }))
    }

    /// Loads the latest block, minting genesis on an empty store.
    ///
    /// # Errors
    /// - `AlreadyInitialized`: the head is already set
    /// - `InitializationFailed`: any store error other than not-found
    pub async fn establish_head(&self) -> Result<Block> {
        if self.head.is_set() {
            return Err(LedgerError::AlreadyInitialized);
        }

        match self.store.load_latest_block().await {
            Ok(block) => {
                info!(
                    block_id = %block.id,
                    height = block.height,
                    "[cc-02] Resuming chain from persisted head"
                );
                self.head.set(block.clone());
                Ok(block)
            }
            Err(StorageError::NotFound(_)) => {
                let genesis = self.mint_genesis();
                self.store
                    .save_block(&genesis)
                    .await
                    .map_err(LedgerError::InitializationFailed)?;
                info!(block_id = %genesis.id, "[cc-02] Genesis block created");
                self.head.set(genesis.clone());
                self.publisher
                    .publish(NodeEvent::GenesisMinted {
                        block: genesis.clone(),
                    })
                    .await;
                Ok(genesis)
            }
            Err(e) => {
                error!(error = %e, "[cc-02] Failed to load latest block");
                Err(LedgerError::InitializationFailed(e))
            }
        }
    }

    fn mint_genesis(&self) -> Block {
        let timestamp = self.clock.now();
        Block {
            id: hash_block(None, timestamp, GENESIS_MERKLE_ROOT, 0),
            previous_id: None,
            timestamp,
            merkle_root: GENESIS_MERKLE_ROOT.to_string(),
            nonce: 0,
            height: 0,
        }
    }

    async fn run_sealing_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.block_time());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        info!("[cc-02] Sealing task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        if self.config.seal_on_shutdown {
                            info!("[cc-02] Final seal before shutdown");
                            self.tick().await;
                        }
                        break;
                    }
                }
            }
        }

        info!("[cc-02] Sealing task stopped");
    }

    async fn tick(&self) {
        match self.seal_once().await {
            Ok(_) => {}
            Err(LedgerError::EmptyMempool) => debug!("[cc-02] Mempool empty, skipping block"),
            Err(e) => warn!(error = %e, "[cc-02] Failed to create block"),
        }
    }

    /// Seals every buffered entry into one block.
    ///
    /// Per-entry failures are recorded in the report and on the bus; they do
    /// not abort the seal and the entry is not requeued. If the block itself
    /// cannot be persisted, the mempool is left untouched.
    ///
    /// # Errors
    /// - `NotInitialized`: no head yet
    /// - `EmptyMempool`: nothing to seal (a skip, not a failure)
    /// - `BlockPersistence`: `save_block` failed
    pub async fn seal_once(&self) -> Result<SealReport> {
        let _guard = self.seal_lock.lock().await;

        let head = self.head.get().ok_or(LedgerError::NotInitialized)?;
        let batch = self
            .mempool
            .snapshot()
            .map_err(|_| LedgerError::EmptyMempool)?;

        let height = head.height + 1;
        let root = merkle_root(&batch);
        let timestamp = self.clock.now();
        let nonce = find_nonce(&head.id, timestamp, &root);
        let block = Block {
            id: hash_block(Some(head.id.as_str()), timestamp, &root, nonce),
            previous_id: Some(head.id.clone()),
            timestamp,
            merkle_root: root,
            nonce,
            height,
        };

        if let Err(source) = self.store.save_block(&block).await {
            warn!(height, error = %source, "[cc-02] Block persistence failed, keeping mempool");
            self.publisher
                .publish(NodeEvent::SealFailed {
                    height,
                    reason: source.to_string(),
                })
                .await;
            return Err(LedgerError::BlockPersistence { height, source });
        }

        let mut sealed = Vec::with_capacity(batch.len());
        let mut dropped = Vec::new();
        // Strictly increasing within the batch, so repeated entities hash apart.
        let mut persisted_at: UnixNanos = 0;
        for entry in &batch {
            persisted_at = self.clock.now().max(persisted_at.saturating_add(1));
            match self.seal_entry(entry, &block.id, persisted_at).await {
                Ok(entry) => sealed.push(entry),
                Err(entry) => dropped.push(entry),
            }
        }

        self.head.set(block.clone());
        self.mempool.remove_sealed(&batch);
        let mempool_remaining = self.mempool.len();

        info!(
            block_id = %block.id,
            height,
            transactions = sealed.len(),
            dropped = dropped.len(),
            "[cc-02] Block created"
        );
        self.publisher
            .publish(NodeEvent::BlockSealed {
                block: block.clone(),
                sealed: sealed.len(),
                dropped: dropped.len(),
                mempool_remaining,
            })
            .await;

        Ok(SealReport {
            block,
            sealed,
            dropped,
        })
    }

    async fn seal_entry(
        &self,
        entry: &MempoolEntry,
        block_id: &str,
        persisted_at: UnixNanos,
    ) -> std::result::Result<SealedEntry, DroppedEntry> {
        let tx = Transaction {
            hash: hash_transaction(entry.kind, &entry.entity_id, block_id, persisted_at),
            block_id: block_id.to_string(),
            kind: entry.kind,
            entity_id: entry.entity_id.clone(),
            timestamp: entry.enqueued_at,
        };

        if let Err(e) = self.store.save_transaction(&tx).await {
            warn!(
                kind = %entry.kind,
                entity_id = %entry.entity_id,
                error = %e,
                "[cc-02] Failed to create transaction, entry dropped"
            );
            self.publisher
                .publish(NodeEvent::EntryDropped {
                    kind: entry.kind,
                    entity_id: entry.entity_id.clone(),
                    block_id: block_id.to_string(),
                    reason: e.to_string(),
                })
                .await;
            return Err(DroppedEntry {
                kind: entry.kind,
                entity_id: entry.entity_id.clone(),
                reason: e.to_string(),
            });
        }

        let backfill = self.backfill(entry, block_id).await;
        self.publisher
            .publish(NodeEvent::EntrySealed {
                kind: entry.kind,
                entity_id: entry.entity_id.clone(),
                block_id: block_id.to_string(),
                tx_hash: tx.hash.clone(),
                backfill: backfill.clone(),
            })
            .await;

        Ok(SealedEntry {
            kind: entry.kind,
            entity_id: entry.entity_id.clone(),
            tx_hash: tx.hash,
            backfill,
        })
    }

    async fn backfill(&self, entry: &MempoolEntry, block_id: &str) -> BackfillOutcome {
        if !supports_backfill(entry.kind) {
            debug!(kind = %entry.kind, "[cc-02] No back-fill handler for kind");
            return BackfillOutcome::Unsupported;
        }
        match self
            .store
            .set_entity_block_ref(entry.kind, &entry.entity_id, block_id)
            .await
        {
            Ok(()) => BackfillOutcome::Applied,
            Err(e) => {
                warn!(
                    kind = %entry.kind,
                    entity_id = %entry.entity_id,
                    error = %e,
                    "[cc-02] Failed to update block reference"
                );
                BackfillOutcome::Failed(e.to_string())
            }
        }
    }

    async fn with_transactions(&self, block: Block) -> Result<BlockWithTransactions> {
        let transactions = self.store.transactions_for_block(&block.id).await?;
        Ok(BlockWithTransactions {
            block,
            transactions,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

#[async_trait]
impl LedgerApi for LedgerService {
    async fn add_to_mempool(&self, kind: TransactionKind, entity_id: &str) {
        let entry = MempoolEntry::new(kind, entity_id, self.clock.now());
        if let Some(evicted) = self.mempool.add(entry) {
            self.publisher
                .publish(NodeEvent::MempoolEvicted {
                    kind: evicted.kind,
                    entity_id: evicted.entity_id,
                })
                .await;
        }
    }

    fn head(&self) -> Result<Block> {
        self.head.get().ok_or(LedgerError::NotInitialized)
    }

    async fn block_by_id(&self, id: &str) -> Result<BlockWithTransactions> {
        let block = self.store.block_by_id(id).await?;
        self.with_transactions(block).await
    }

    async fn block_by_height(&self, height: u64) -> Result<BlockWithTransactions> {
        let block = self.store.block_by_height(height).await?;
        self.with_transactions(block).await
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction> {
        Ok(self.store.transaction_by_hash(hash).await?)
    }

    async fn stats(&self) -> Result<ChainStats> {
        Ok(self.store.stats().await?)
    }

    async fn transactions_for_address(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self.store.transactions_for_address(address).await?)
    }

    async fn merkle_proof_for(&self, entity_id: &str) -> Result<EntityProof> {
        let tx = self.store.transaction_for_entity(entity_id).await?;
        let block = self.store.block_by_id(&tx.block_id).await?;
        let entries: Vec<MempoolEntry> = self
            .store
            .transactions_for_block(&block.id)
            .await?
            .iter()
            .map(Transaction::as_entry)
            .collect();

        let index = entries
            .iter()
            .position(|e| e.entity_id == entity_id)
            .ok_or_else(|| LedgerError::NotFound(format!("entity {entity_id} in block")))?;
        let proof = merkle_proof(&entries, index)
            .ok_or_else(|| LedgerError::NotFound(format!("entity {entity_id} in block")))?;
        let verified = verify_merkle_proof(&proof, &block.merkle_root);

        Ok(EntityProof {
            entity_id: entity_id.to_string(),
            block_id: block.id,
            merkle_root: block.merkle_root,
            proof,
            verified,
        })
    }

    async fn verify_chain(&self) -> Result<u64> {
        let head = LedgerApi::head(self)?;
        let mut parent: Option<Block> = None;
        for height in 0..=head.height {
            let block = self.store.block_by_height(height).await?;
            check_block(&block, parent.as_ref())?;
            parent = Some(block);
        }
        match parent {
            Some(tip) if tip.id == head.id => Ok(head.height + 1),
            _ => Err(LedgerError::ChainBroken(
                "persisted tip differs from head".into(),
            )),
        }
    }

    fn pending_count(&self) -> usize {
        self.mempool.len()
    }
}
