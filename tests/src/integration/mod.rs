//! Integration flows.

pub mod delivery_flow;
pub mod ledger_flow;
pub mod node_flow;
