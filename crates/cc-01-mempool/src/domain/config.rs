//! Mempool configuration.

use serde::{Deserialize, Serialize};

use super::errors::MempoolError;

/// Default number of buffered references.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Mempool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum entries held before the oldest is evicted.
    pub capacity: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl MempoolConfig {
    pub fn validate(&self) -> Result<(), MempoolError> {
        if self.capacity == 0 {
            return Err(MempoolError::InvalidConfig(
                "capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
