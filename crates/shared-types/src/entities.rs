//! # Core Domain Entities
//!
//! Defines the ledger entities exchanged between the mempool, the sealing
//! engine, the persistence gateway and the HTTP surface.
//!
//! ## Clusters
//!
//! - **Pending**: `MempoolEntry`, `TransactionKind`
//! - **Chain**: `Block`, `Transaction`, `BlockWithTransactions`, `ChainStats`
//! - **Messaging**: `StoredMessage`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::status::DeliveryStatus;

/// Nanoseconds since the Unix epoch.
pub type UnixNanos = u64;

/// Hex-encoded SHA-256 digest (64 characters).
pub type HexHash = String;

// =============================================================================
// CLUSTER A: PENDING REFERENCES
// =============================================================================

/// The kind of entity a ledger transaction points at.
///
/// The string form is part of every transaction and Merkle leaf hash, so it
/// must never change for an existing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "message")]
    DirectMessage,
    #[serde(rename = "channel_message")]
    ChannelMessage,
    #[serde(rename = "channel_create")]
    ChannelCreate,
    #[serde(rename = "channel_join")]
    ChannelJoin,
    #[serde(rename = "group_message")]
    GroupMessage,
    #[serde(rename = "group_create")]
    GroupCreate,
    #[serde(rename = "group_join")]
    GroupJoin,
}

impl TransactionKind {
    /// Every kind, in declaration order.
    pub const ALL: [TransactionKind; 7] = [
        TransactionKind::DirectMessage,
        TransactionKind::ChannelMessage,
        TransactionKind::ChannelCreate,
        TransactionKind::ChannelJoin,
        TransactionKind::GroupMessage,
        TransactionKind::GroupCreate,
        TransactionKind::GroupJoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::DirectMessage => "message",
            TransactionKind::ChannelMessage => "channel_message",
            TransactionKind::ChannelCreate => "channel_create",
            TransactionKind::ChannelJoin => "channel_join",
            TransactionKind::GroupMessage => "group_message",
            TransactionKind::GroupCreate => "group_create",
            TransactionKind::GroupJoin => "group_join",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown kind string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown transaction kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A pending reference to a persisted entity, waiting to be sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolEntry {
    pub kind: TransactionKind,
    /// Id of the already-persisted entity this entry anchors.
    pub entity_id: String,
    pub enqueued_at: UnixNanos,
}

impl MempoolEntry {
    pub fn new(kind: TransactionKind, entity_id: impl Into<String>, enqueued_at: UnixNanos) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            enqueued_at,
        }
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// A sealed, hash-linked block.
///
/// Invariant: `id == hash_block(previous_id, timestamp, merkle_root, nonce)`.
/// `previous_id` is `None` only for genesis (height 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: HexHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<HexHash>,
    pub timestamp: UnixNanos,
    pub merkle_root: String,
    pub nonce: u64,
    pub height: u64,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.previous_id.is_none()
    }
}

/// One sealed mempool entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: HexHash,
    pub block_id: HexHash,
    pub kind: TransactionKind,
    pub entity_id: String,
    /// Enqueue time of the originating mempool entry.
    pub timestamp: UnixNanos,
}

impl Transaction {
    /// The mempool entry this transaction was sealed from.
    pub fn as_entry(&self) -> MempoolEntry {
        MempoolEntry::new(self.kind, self.entity_id.clone(), self.timestamp)
    }
}

/// A block together with its transactions in sealing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWithTransactions {
    #[serde(flatten)]
    pub block: Block,
    pub transactions: Vec<Transaction>,
}

/// Aggregate chain statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    pub block_count: u64,
    pub transaction_count: u64,
    /// Transaction count keyed by kind string.
    pub per_kind: BTreeMap<String, u64>,
    pub latest_block_time: Option<UnixNanos>,
}

// =============================================================================
// CLUSTER C: MESSAGING
// =============================================================================

/// A persisted direct message as seen by the delivery pool.
///
/// Content is owned by the persistence layer; only routing metadata and
/// the anchoring block reference are exposed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub sender_address: String,
    pub recipient_address: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub block_id: Option<HexHash>,
    pub created_at: UnixNanos,
}

impl StoredMessage {
    pub fn new(
        id: impl Into<String>,
        sender_address: impl Into<String>,
        recipient_address: impl Into<String>,
        created_at: UnixNanos,
    ) -> Self {
        Self {
            id: id.into(),
            sender_address: sender_address.into(),
            recipient_address: recipient_address.into(),
            status: DeliveryStatus::Pending,
            block_id: None,
            created_at,
        }
    }
}
