//! # Dependency Container
//!
//! Loads [`NodeConfig`] and assembles every service the node runs into one
//! [`NodeServices`] value shared by the HTTP surface and the event bridge.

pub mod config;
pub mod services;

pub use config::{
    ConfigError, DeliverySection, LedgerSection, NodeConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
pub use services::NodeServices;
