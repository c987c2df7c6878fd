//! Mempool error types.

use thiserror::Error;

/// Mempool errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// Nothing is buffered. A sealing cycle treats this as "skip this tick".
    #[error("Mempool is empty")]
    Empty,

    /// Rejected configuration.
    #[error("Invalid mempool config: {0}")]
    InvalidConfig(String),
}
