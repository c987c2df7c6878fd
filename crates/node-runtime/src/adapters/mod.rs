//! # Adapter Implementations
//!
//! Concrete implementations of the outbound ports declared by the ledger
//! (`LedgerStore`) and the delivery pool (`MessageStore`).
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  cc-02 LedgerStore   cc-03 MessageStore      │  ports
//! └──────────────────────────────────────────────┘
//!                   ↑ implements ↑
//! ┌──────────────────────────────────────────────┐
//! │  storage::InMemoryStore / RocksDbStore       │  adapters
//! └──────────────────────────────────────────────┘
//! ```

pub mod storage;
