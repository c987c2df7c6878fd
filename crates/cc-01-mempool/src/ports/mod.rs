//! Ports layer for the mempool.
//!
//! - Inbound (Driving) port: API exposed to the ledger and handlers
//! - Outbound (Driven) port: clock abstraction

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
