//! Outcome of one sealing pass.

use serde::{Deserialize, Serialize};
use shared_bus::BackfillOutcome;
use shared_types::{Block, TransactionKind};

/// An entry recorded in the sealed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEntry {
    pub kind: TransactionKind,
    pub entity_id: String,
    pub tx_hash: String,
    pub backfill: BackfillOutcome,
}

/// An entry whose transaction could not be persisted. It is not requeued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedEntry {
    pub kind: TransactionKind,
    pub entity_id: String,
    pub reason: String,
}

/// Everything a successful seal did, in snapshot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealReport {
    pub block: Block,
    pub sealed: Vec<SealedEntry>,
    pub dropped: Vec<DroppedEntry>,
}

impl SealReport {
    /// Entries whose back-reference was written.
    pub fn backfilled(&self) -> impl Iterator<Item = &SealedEntry> {
        self.sealed
            .iter()
            .filter(|e| e.backfill == BackfillOutcome::Applied)
    }

    /// Entries sealed without a back-fill handler for their kind.
    pub fn unsupported(&self) -> impl Iterator<Item = &SealedEntry> {
        self.sealed
            .iter()
            .filter(|e| e.backfill == BackfillOutcome::Unsupported)
    }
}

/// Kinds whose referenced entity carries a `block_id` column.
pub fn supports_backfill(kind: TransactionKind) -> bool {
    matches!(
        kind,
        TransactionKind::DirectMessage
            | TransactionKind::ChannelMessage
            | TransactionKind::GroupMessage
    )
}
