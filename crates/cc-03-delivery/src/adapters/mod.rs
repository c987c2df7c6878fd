//! Transport adapters.

pub mod ws;

pub use ws::{serve_socket, WsSink};
