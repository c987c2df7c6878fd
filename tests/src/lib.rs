//! # Courier-Chain Test Suite
//!
//! Cross-crate flows that unit tests inside each crate cannot cover.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── support.rs            # shared fixtures (failing store, frame capture)
//! │   └── integration/
//! │       ├── ledger_flow.rs    # mempool → seal → back-fill → proofs
//! │       ├── delivery_flow.rs  # pools, sweeps, sessions, status updates
//! │       └── node_flow.rs      # assembled node: HTTP + bridge + pools
//! └── benches/
//!     └── ledger_benchmarks.rs  # hashing, Merkle and mempool throughput
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cc-tests
//! cargo test -p cc-tests integration::delivery_flow
//! cargo bench -p cc-tests
//! ```

pub mod integration;
pub mod support;
