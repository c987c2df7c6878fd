//! # Error Types
//!
//! Defines the persistence error taxonomy shared by every storage port.

use thiserror::Error;

/// Errors reported by a persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A set-once field already holds a different value.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored bytes could not be decoded.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// The backend failed the operation.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
