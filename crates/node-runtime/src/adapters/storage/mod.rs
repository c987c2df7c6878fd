//! # Storage Adapters
//!
//! Implementations of the ledger's [`LedgerStore`] and the delivery pool's
//! [`MessageStore`], plus the write side for new messages.
//!
//! | Backend            | Feature   | Durability         |
//! |--------------------|-----------|--------------------|
//! | [`InMemoryStore`]  | default   | process lifetime   |
//! | `RocksDbStore`     | `rocksdb` | on disk, bincode   |
//!
//! [`LedgerStore`]: cc_02_ledger::LedgerStore
//! [`MessageStore`]: cc_03_delivery::MessageStore

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

pub use memory::InMemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore, COLUMN_FAMILIES};

use async_trait::async_trait;
use shared_types::{StorageError, StoredMessage, Transaction, TransactionKind};

/// Write side for new entities.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persists a new message. Fails with `Conflict` on a duplicate id.
    async fn insert_message(&self, message: StoredMessage) -> Result<(), StorageError>;

    /// Records who authored a non-direct entity (channel or group message,
    /// create, join). The first author recorded wins.
    async fn record_author(
        &self,
        kind: TransactionKind,
        entity_id: &str,
        author: &str,
    ) -> Result<(), StorageError>;
}

/// Key of an entity back-reference.
pub(crate) fn entity_key(kind: TransactionKind, entity_id: &str) -> String {
    format!("{}:{}", kind.as_str(), entity_id)
}

/// Applies the set-once back-reference rule to an existing value.
pub(crate) fn check_block_ref(
    existing: Option<&str>,
    entity_id: &str,
    block_id: &str,
) -> Result<bool, StorageError> {
    match existing {
        None => Ok(true),
        Some(current) if current == block_id => Ok(false),
        Some(current) => Err(StorageError::Conflict(format!(
            "{entity_id} already sealed in {current}"
        ))),
    }
}

/// True when `tx` belongs to `address`'s activity.
///
/// Direct messages match on either party, authored entities on the author,
/// and joins on an entity id of the form `<parent>:<address>`.
pub(crate) fn involves(
    tx: &Transaction,
    address: &str,
    message: Option<&StoredMessage>,
    author: Option<&str>,
) -> bool {
    if author == Some(address) {
        return true;
    }
    match tx.kind {
        TransactionKind::DirectMessage => message
            .is_some_and(|m| m.sender_address == address || m.recipient_address == address),
        TransactionKind::ChannelJoin | TransactionKind::GroupJoin => tx
            .entity_id
            .rsplit_once(':')
            .is_some_and(|(_, member)| member == address),
        _ => false,
    }
}

/// Newest first; ties by hash so the order is stable.
pub(crate) fn newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
}
