//! Telemetry configuration from environment variables.

use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line.
    pub service_name: String,

    /// `EnvFilter` directives, e.g. `info` or `cc_02_ledger=debug,info`.
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    /// ANSI colors in text mode.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "courier-chain".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Reads `COURIER_SERVICE`, `COURIER_LOG_LEVEL` (falling back to
    /// `RUST_LOG`) and `COURIER_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let json_logs = lookup("COURIER_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(defaults.json_logs);

        Self {
            service_name: lookup("COURIER_SERVICE").unwrap_or(defaults.service_name),
            log_level: lookup("COURIER_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs,
            ansi: !json_logs && lookup("NO_COLOR").is_none(),
        }
    }
}
