//! Domain layer: wire envelope and connection model.

pub mod client;
pub mod envelope;

pub use client::Client;
pub use envelope::{kinds, ClientCommand, Envelope};
