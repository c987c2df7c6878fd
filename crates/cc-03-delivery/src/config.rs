//! Pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// How a targeted envelope (`to` set) is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// `to` names one participant identity.
    Direct,
    /// `to` names a room; every client registered in that room receives it.
    Room,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Label used in logs, events and metrics.
    pub name: String,
    pub mode: PoolMode,
    /// Text of the `welcome` frame sent on registration.
    pub welcome_message: String,
    /// Capacity of the actor's command queue.
    pub command_buffer: usize,
    /// Run the pending-message sweep when a client registers.
    pub sweep_on_register: bool,
    /// Upper bound on one frame write from the actor. A client that exceeds
    /// it is dropped from the pool.
    pub write_timeout_ms: u64,
}

pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

impl Default for PoolConfig {
    fn default() -> Self {
        Self::direct()
    }
}

impl PoolConfig {
    /// Pool keyed by durable user address.
    pub fn direct() -> Self {
        Self {
            name: "direct".into(),
            mode: PoolMode::Direct,
            welcome_message: "Welcome to Courier!".into(),
            command_buffer: 1024,
            sweep_on_register: true,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }

    /// Pool for anonymous, room-scoped sessions. No persistence-backed sweep.
    pub fn ephemeral() -> Self {
        Self {
            name: "secret".into(),
            mode: PoolMode::Room,
            welcome_message: "Welcome to Courier secret chat!".into(),
            command_buffer: 1024,
            sweep_on_register: false,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }

    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.command_buffer == 0 {
            return Err(DeliveryError::InvalidConfig(
                "command_buffer must be greater than zero".into(),
            ));
        }
        if self.write_timeout_ms == 0 {
            return Err(DeliveryError::InvalidConfig(
                "write_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.name.is_empty() {
            return Err(DeliveryError::InvalidConfig("name must not be empty".into()));
        }
        Ok(())
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
