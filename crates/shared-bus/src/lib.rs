//! # Shared Bus - In-Process Event Bus
//!
//! Carries the observable outcomes of the mempool, the ledger engine and the
//! delivery pools to whoever wants them: the metrics bridge, the `new_block`
//! fan-out in the runtime, and tests that assert on sealing results.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Ledger       │                    │ Runtime      │
//! │              │    publish()       │ bridge       │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Publishing never blocks and never fails: with no subscribers the event is
//! simply dropped. Slow subscribers lag and skip events rather than applying
//! backpressure to the sealing task.

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{BackfillOutcome, EventFilter, EventTopic, NodeEvent};
pub use publisher::{EventPublisher, InMemoryEventBus, NoOpPublisher};
pub use subscriber::Subscription;

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
