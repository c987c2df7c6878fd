//! Runtime error type.

use cc_01_mempool::MempoolError;
use cc_02_ledger::LedgerError;
use cc_03_delivery::DeliveryError;
use courier_telemetry::TelemetryError;
use shared_types::StorageError;
use thiserror::Error;

use crate::container::ConfigError;

/// Errors raised while assembling or running the node.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Mempool(#[from] MempoolError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured backend was not compiled in.
    #[error("Storage backend {0} requires the `{0}` feature")]
    BackendUnavailable(&'static str),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
