//! # Node Events
//!
//! Defines the observable outcomes published on the bus.
//!
//! ## Event Flow
//!
//! ```text
//! [Mempool] ──MempoolEvicted──────────────────────────┐
//!                                                     │
//! [Ledger] ──GenesisMinted / BlockSealed / SealFailed ┼──→ [Event Bus] ──→ metrics bridge
//!          ──EntrySealed / EntryDropped               │                 ──→ new_block fan-out
//!                                                     │                 ──→ tests
//! [Delivery] ──ClientOnline / ClientOffline ──────────┤
//!            ──StatusAdvanced / DeliveryFailed ───────┘
//! ```
//!
//! Per-entry sealing results are events rather than log lines so callers can
//! assert on them.

use serde::{Deserialize, Serialize};
use shared_types::{Block, DeliveryStatus, TransactionKind};

/// What happened to a sealed entry's back-reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackfillOutcome {
    /// The referenced entity now carries the block id.
    Applied,
    /// The kind has no back-fill handler; the entry is sealed regardless.
    Unsupported,
    /// The store rejected the back-fill.
    Failed(String),
}

/// Events published by the mempool, the ledger and the delivery pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeEvent {
    // =========================================================================
    // MEMPOOL
    // =========================================================================
    /// The oldest entry was evicted to make room.
    MempoolEvicted {
        kind: TransactionKind,
        entity_id: String,
    },

    // =========================================================================
    // LEDGER
    // =========================================================================
    /// The genesis block was minted at startup.
    GenesisMinted { block: Block },

    /// A block was persisted and became the chain head.
    BlockSealed {
        block: Block,
        sealed: usize,
        dropped: usize,
        mempool_remaining: usize,
    },

    /// A mempool entry was recorded in a block.
    EntrySealed {
        kind: TransactionKind,
        entity_id: String,
        block_id: String,
        tx_hash: String,
        backfill: BackfillOutcome,
    },

    /// A mempool entry could not be recorded and was discarded.
    EntryDropped {
        kind: TransactionKind,
        entity_id: String,
        block_id: String,
        reason: String,
    },

    /// Block persistence failed; the mempool is kept for the next tick.
    SealFailed { height: u64, reason: String },

    // =========================================================================
    // DELIVERY
    // =========================================================================
    /// A connection registered with a pool.
    ClientOnline { pool: String, identity: String },

    /// A connection left a pool.
    ClientOffline { pool: String, identity: String },

    /// A message status moved forward in persistence.
    StatusAdvanced {
        message_id: String,
        status: DeliveryStatus,
    },

    /// A frame could not be written to a client.
    DeliveryFailed {
        pool: String,
        identity: String,
        reason: String,
    },
}

impl NodeEvent {
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::MempoolEvicted { .. } => EventTopic::Mempool,
            Self::GenesisMinted { .. }
            | Self::BlockSealed { .. }
            | Self::EntrySealed { .. }
            | Self::EntryDropped { .. }
            | Self::SealFailed { .. } => EventTopic::Ledger,
            Self::ClientOnline { .. }
            | Self::ClientOffline { .. }
            | Self::StatusAdvanced { .. }
            | Self::DeliveryFailed { .. } => EventTopic::Delivery,
        }
    }
}

/// Which part of the node an event comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Mempool,
    Ledger,
    Delivery,
}

/// Topic filter applied on the receiving side. No topics means everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    #[must_use]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            id: "b1".into(),
            previous_id: Some("b0".into()),
            timestamp: 1,
            merkle_root: "root".into(),
            nonce: 3,
            height: 1,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        let sealed = NodeEvent::BlockSealed {
            block: sample_block(),
            sealed: 2,
            dropped: 0,
            mempool_remaining: 0,
        };
        assert_eq!(sealed.topic(), EventTopic::Ledger);

        let evicted = NodeEvent::MempoolEvicted {
            kind: TransactionKind::DirectMessage,
            entity_id: "m1".into(),
        };
        assert_eq!(evicted.topic(), EventTopic::Mempool);

        let advanced = NodeEvent::StatusAdvanced {
            message_id: "m1".into(),
            status: DeliveryStatus::Read,
        };
        assert_eq!(advanced.topic(), EventTopic::Delivery);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = EventFilter::all();
        assert!(filter.matches(&NodeEvent::ClientOnline {
            pool: "direct".into(),
            identity: "alice".into(),
        }));
        assert!(filter.matches(&NodeEvent::GenesisMinted {
            block: sample_block(),
        }));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Ledger, EventTopic::Mempool]);

        assert!(filter.matches(&NodeEvent::SealFailed {
            height: 4,
            reason: "disk".into(),
        }));
        assert!(!filter.matches(&NodeEvent::ClientOffline {
            pool: "direct".into(),
            identity: "bob".into(),
        }));
    }
}
