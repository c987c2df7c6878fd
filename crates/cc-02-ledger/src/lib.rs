//! # Ledger Engine
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Anchors references to persisted messages into an append-only, hash-linked
//! chain. A background task wakes every `block_time`, drains the mempool into
//! one block, persists it with one transaction per entry, and writes the
//! block id back onto each referenced entity.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | `id == hash_block(previous_id, timestamp, merkle_root, nonce)` | `service.rs` - `seal_once()`, checked by `domain/chain.rs` |
//! | Heights gapless from genesis (0) | `service.rs` - `height = head.height + 1` |
//! | Sealed ids end in `"00"` | `domain/hashing.rs` - `find_nonce()` |
//! | Transactions keep snapshot order | `service.rs` - sequential per-entry loop |
//! | Mempool cleared only after the block persists | `service.rs` - `remove_sealed()` after `save_block()` |
//! | Single head writer | `service.rs` - `seal_lock` + sealing task |
//!
//! ## Sealing Cycle
//!
//! ```text
//!  tick ──→ snapshot ──empty──→ skip (debug log)
//!              │
//!              ▼
//!     merkle_root, find_nonce, hash_block
//!              │
//!        save_block ──fail──→ SealFailed, mempool kept
//!              │
//!     for each entry (in order):
//!        save_transaction ──fail──→ EntryDropped (not requeued)
//!              │
//!        back-fill by kind ──→ Applied | Unsupported | Failed
//!              │
//!     swap head ──→ remove sealed entries ──→ BlockSealed
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs        - LedgerService (sealing task, accessors)    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - LedgerApi                                  │
//! │  ports/outbound.rs - LedgerStore (persistence gateway)          │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/hashing.rs - block/tx hashes, Merkle root, nonce search │
//! │  domain/merkle.rs  - inclusion proofs                           │
//! │  domain/chain.rs   - ChainHead, link checks                     │
//! │  domain/seal.rs    - SealReport, back-fill policy               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::LedgerConfig;
pub use domain::{EntityProof, MerkleProof, SealReport};
pub use error::{LedgerError, Result};
pub use ports::{LedgerApi, LedgerStore};
pub use service::LedgerService;
