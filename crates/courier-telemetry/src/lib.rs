//! # Courier Telemetry
//!
//! Logging and metrics shared by every Courier-Chain binary.
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, human-readable or
//!   JSON lines.
//! - **Metrics**: a process-wide Prometheus registry, scraped as text.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable              | Default           | Description               |
//! |-----------------------|-------------------|---------------------------|
//! | `RUST_LOG`            | `info`            | Log filter directives     |
//! | `COURIER_LOG_LEVEL`   | -                 | Overrides `RUST_LOG`      |
//! | `COURIER_LOG_FORMAT`  | `text`            | `json` for JSON lines     |
//! | `COURIER_SERVICE`     | `courier-chain`   | Service name in logs      |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, BACKFILL_OUTCOMES, BLOCKS_SEALED, CHAIN_HEIGHT,
    CLIENTS_CONNECTED, DELIVERY_FAILURES, LEDGER_ENTRIES, MEMPOOL_EVICTIONS, MEMPOOL_PENDING,
    SEAL_FAILURES, STATUS_ADVANCED,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Failed to encode metrics: {0}")]
    Encode(String),
}

/// Installs the global subscriber and registers all metrics.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    logging::init_logging(&config)?;
    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Telemetry initialized"
    );
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Held for the lifetime of the process.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Increments a counter, optionally with label values.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
