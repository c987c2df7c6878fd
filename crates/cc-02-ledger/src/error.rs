//! Error types for the ledger engine

use shared_types::StorageError;
use thiserror::Error;

use crate::domain::LinkViolation;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in the ledger engine
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Nothing to seal this tick
    #[error("Mempool is empty")]
    EmptyMempool,

    /// The chain head has not been established yet
    #[error("Ledger not initialized")]
    NotInitialized,

    /// `initialize` was called twice
    #[error("Ledger already initialized")]
    AlreadyInitialized,

    /// Loading or minting the chain head failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(StorageError),

    /// The block itself could not be persisted; the mempool is kept
    #[error("Failed to persist block at height {height}: {source}")]
    BlockPersistence {
        /// Height of the block that was being sealed
        height: u64,
        /// Underlying store error
        source: StorageError,
    },

    /// Unknown block, transaction or entity
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted chain violates a linkage rule
    #[error("Chain broken: {0}")]
    ChainBroken(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Any other store failure
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => LedgerError::NotFound(what),
            other => LedgerError::Storage(other),
        }
    }
}

impl From<LinkViolation> for LedgerError {
    fn from(violation: LinkViolation) -> Self {
        LedgerError::ChainBroken(violation.to_string())
    }
}

impl LedgerError {
    /// Check if error is recoverable (the next tick may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyMempool | Self::BlockPersistence { .. } | Self::Storage(_)
        )
    }

    /// Check if error is critical (startup must abort)
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::InitializationFailed(_) | Self::ChainBroken(_) | Self::InvalidConfig(_)
        )
    }
}
