//! # Pending Reference Pool (Mempool)
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Buffers references to already-persisted entities (messages, channel
//! messages, group joins, ...) until the ledger seals them into a block.
//! Entries live only in memory.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Insertion order is preserved | `domain/pool.rs` - `VecDeque` append / front eviction |
//! | Never more than `capacity` entries | `domain/pool.rs` - `Mempool::add()` |
//! | Overflow evicts the oldest, silently | `domain/pool.rs` - `Mempool::add()` |
//! | Lock never held across I/O | `domain/pool.rs` - every method is synchronous |
//!
//! ## Lifecycle of an Entry
//!
//! ```text
//! handler ──add()──→ [BUFFERED] ──snapshot()──→ sealing cycle ──remove_sealed()──→ [GONE]
//!                        │
//!                        └── capacity overflow ──→ [EVICTED] (never sealed)
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - MempoolApi trait                           │
//! │  ports/outbound.rs - TimeSource trait                           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/pool.rs    - Mempool (RwLock<VecDeque>)                 │
//! │  domain/config.rs  - MempoolConfig                              │
//! │  domain/errors.rs  - MempoolError                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;

pub use domain::{Mempool, MempoolConfig, MempoolError, DEFAULT_CAPACITY};
pub use ports::{MempoolApi, MockTimeSource, SystemTimeSource, TimeSource};
