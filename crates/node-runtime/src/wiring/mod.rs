//! # Event Wiring
//!
//! Connects the event bus to the parts of the node that react to it.
//!
//! ```text
//! [Ledger / Mempool / Pools] ──publish──→ [Event Bus]
//!                                             │
//!                                             ▼
//!                                      event_bridge
//!                                     ├─→ Prometheus counters
//!                                     └─→ new_block fan-out (direct pool)
//! ```

pub mod event_bridge;

pub use event_bridge::{record, spawn_event_bridge};
