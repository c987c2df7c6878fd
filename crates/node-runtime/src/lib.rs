//! # Courier Node Runtime
//!
//! Assembles the mempool, the ledger engine and the delivery pools into one
//! process and exposes them over HTTP and WebSocket.
//!
//! ## Module Structure
//!
//! - `container/` - configuration and service assembly
//! - `adapters/storage/` - in-memory and RocksDB persistence
//! - `api/` - REST handlers and socket upgrades
//! - `wiring/` - event bus bridge (metrics, `new_block` fan-out)
//! - `runtime.rs` - start, serve, graceful shutdown
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load configuration (defaults, `COURIER_CONFIG`, environment)
//! 3. Open storage and assemble services
//! 4. Start the event bridge, establish the chain head (genesis if empty)
//! 5. Serve HTTP until Ctrl+C

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod api;
pub mod container;
pub mod error;
pub mod runtime;
pub mod wiring;

pub use container::{NodeConfig, NodeServices};
pub use error::{Result, RuntimeError};
pub use runtime::NodeRuntime;
