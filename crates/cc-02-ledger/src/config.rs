//! Configuration types for the ledger engine

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Default sealing interval in seconds
pub const DEFAULT_BLOCK_TIME_SECS: u64 = 10;

/// Runtime configuration for the ledger engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Interval between sealing ticks
    pub block_time_secs: u64,

    /// Run one last seal when shutdown is signalled
    pub seal_on_shutdown: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            block_time_secs: DEFAULT_BLOCK_TIME_SECS,
            seal_on_shutdown: true,
        }
    }
}

impl LedgerConfig {
    pub fn block_time(&self) -> Duration {
        Duration::from_secs(self.block_time_secs)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.block_time_secs == 0 {
            return Err(LedgerError::InvalidConfig(
                "block_time_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
