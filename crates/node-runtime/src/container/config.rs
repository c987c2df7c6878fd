//! # Node Configuration
//!
//! One JSON document, every field defaulted, then environment overrides.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. The file named by `COURIER_CONFIG`
//! 3. `COURIER_PORT`, `COURIER_BLOCK_TIME_SECS`, `COURIER_MEMPOOL_CAPACITY`,
//!    `COURIER_DATA_DIR`, `COURIER_STORAGE`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use cc_01_mempool::MempoolConfig;
use cc_02_ledger::LedgerConfig;
use cc_03_delivery::PoolConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub ledger: LedgerSection,
    pub delivery: DeliverySection,
    pub storage: StorageConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Loads defaults, the optional file and environment overrides, then
    /// validates.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("COURIER_CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(port) = parse_env(lookup, "COURIER_PORT")? {
            self.server.port = port;
        }
        if let Some(secs) = parse_env(lookup, "COURIER_BLOCK_TIME_SECS")? {
            self.ledger.block_time_secs = secs;
        }
        if let Some(capacity) = parse_env(lookup, "COURIER_MEMPOOL_CAPACITY")? {
            self.ledger.mempool_capacity = capacity;
        }
        if let Some(dir) = lookup("COURIER_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = parse_env(lookup, "COURIER_STORAGE")? {
            self.storage.backend = backend;
        }
        Ok(())
    }

    /// Rejects values the subsystems cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.mempool_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.direct_pool_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.server.socket_addr()?;
        Ok(())
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            block_time_secs: self.ledger.block_time_secs,
            seal_on_shutdown: self.ledger.seal_on_shutdown,
        }
    }

    pub fn mempool_config(&self) -> MempoolConfig {
        MempoolConfig {
            capacity: self.ledger.mempool_capacity,
        }
    }

    pub fn direct_pool_config(&self) -> PoolConfig {
        PoolConfig {
            welcome_message: self.delivery.welcome_message.clone(),
            command_buffer: self.delivery.command_buffer,
            write_timeout_ms: self.delivery.write_timeout_ms,
            ..PoolConfig::direct()
        }
    }

    pub fn secret_pool_config(&self) -> PoolConfig {
        PoolConfig {
            command_buffer: self.delivery.command_buffer,
            write_timeout_ms: self.delivery.write_timeout_ms,
            ..PoolConfig::ephemeral()
        }
    }
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        None => Ok(None),
    }
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad listen address {}:{}", self.host, self.port)))
    }
}

/// Sealing cadence and mempool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub block_time_secs: u64,
    pub mempool_capacity: usize,
    pub seal_on_shutdown: bool,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            block_time_secs: 10,
            mempool_capacity: 10_000,
            seal_on_shutdown: true,
        }
    }
}

/// Connection pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySection {
    pub welcome_message: String,
    pub command_buffer: usize,
    /// Per-frame write limit before a client is dropped.
    pub write_timeout_ms: u64,
}

impl Default for DeliverySection {
    fn default() -> Self {
        let direct = PoolConfig::direct();
        Self {
            welcome_message: direct.welcome_message,
            command_buffer: direct.command_buffer,
            write_timeout_ms: direct.write_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root for the RocksDB directory.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}
