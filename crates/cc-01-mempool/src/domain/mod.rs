//! Domain layer for the mempool.

pub mod config;
pub mod errors;
pub mod pool;

pub use config::{MempoolConfig, DEFAULT_CAPACITY};
pub use errors::MempoolError;
pub use pool::Mempool;
