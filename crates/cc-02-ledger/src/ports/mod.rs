//! Ports layer for the ledger engine.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
