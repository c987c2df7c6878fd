//! # Inbound Port - LedgerApi
//!
//! The surface handlers use: submit a pending reference, query chain state.

use async_trait::async_trait;
use shared_types::{Block, BlockWithTransactions, ChainStats, Transaction, TransactionKind};

use crate::domain::EntityProof;
use crate::error::Result;

/// Primary API of the ledger engine.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Queues a reference to an already-persisted entity. Never fails; a full
    /// mempool silently evicts its oldest entry.
    async fn add_to_mempool(&self, kind: TransactionKind, entity_id: &str);

    /// Current chain head.
    ///
    /// # Errors
    /// - `NotInitialized`: called before `initialize`
    fn head(&self) -> Result<Block>;

    async fn block_by_id(&self, id: &str) -> Result<BlockWithTransactions>;

    async fn block_by_height(&self, height: u64) -> Result<BlockWithTransactions>;

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction>;

    async fn stats(&self) -> Result<ChainStats>;

    /// Sealed activity of one address, newest first.
    async fn transactions_for_address(&self, address: &str) -> Result<Vec<Transaction>>;

    /// Merkle inclusion proof for a sealed entity.
    async fn merkle_proof_for(&self, entity_id: &str) -> Result<EntityProof>;

    /// Walks the persisted chain from genesis to the head, checking every
    /// link. Returns the number of blocks checked.
    async fn verify_chain(&self) -> Result<u64>;

    /// Entries waiting for the next seal.
    fn pending_count(&self) -> usize;
}
