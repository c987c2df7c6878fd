//! Outbound (Driven) ports: the persistence gateway.

use async_trait::async_trait;
use shared_types::{Block, ChainStats, StorageError, Transaction, TransactionKind};

/// Durable store for blocks, transactions and entity back-references.
///
/// Implementations must return transactions of a block in the order they
/// were saved, and must treat `set_entity_block_ref` as set-once.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Highest block, or `StorageError::NotFound` on an empty chain.
    async fn load_latest_block(&self) -> Result<Block, StorageError>;

    async fn save_block(&self, block: &Block) -> Result<(), StorageError>;

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), StorageError>;

    /// Writes `block_id` onto the referenced entity.
    ///
    /// Succeeds without change if the entity already carries the same id;
    /// fails with `Conflict` if it carries a different one.
    async fn set_entity_block_ref(
        &self,
        kind: TransactionKind,
        entity_id: &str,
        block_id: &str,
    ) -> Result<(), StorageError>;

    async fn block_by_id(&self, id: &str) -> Result<Block, StorageError>;

    async fn block_by_height(&self, height: u64) -> Result<Block, StorageError>;

    async fn transactions_for_block(&self, block_id: &str) -> Result<Vec<Transaction>, StorageError>;

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, StorageError>;

    /// The transaction that sealed `entity_id`, if any.
    async fn transaction_for_entity(&self, entity_id: &str) -> Result<Transaction, StorageError>;

    /// Sealed transactions touching `address`, newest first.
    ///
    /// An address with no activity yields an empty list, not `NotFound`.
    async fn transactions_for_address(
        &self,
        address: &str,
    ) -> Result<Vec<Transaction>, StorageError>;

    async fn stats(&self) -> Result<ChainStats, StorageError>;
}

#[cfg(test)]
pub use mock::MockLedgerStore;
