//! Error types for the delivery pools.

use shared_types::StorageError;
use thiserror::Error;

/// Errors surfaced by pool handles, sinks and sessions.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The pool actor has stopped.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The peer closed the connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Reading from or writing to the connection failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A write did not complete within the pool's write timeout.
    #[error("Write timed out after {0} ms")]
    WriteTimeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid pool config: {0}")]
    InvalidConfig(String),
}

impl DeliveryError {
    /// True when the error ends the connection's read loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::Transport(_)
                | Self::WriteTimeout(_)
                | Self::PoolClosed
        )
    }
}
