//! # Delivery Status
//!
//! The message status state machine shared by the persistence gateway and the
//! delivery pool.
//!
//! ```text
//! Pending ──► Delivered ──► Read
//! ```
//!
//! Transitions are monotonic. A write never replaces a more advanced status,
//! so a `read` receipt that races ahead of a `delivered` sweep is kept.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Delivery status of a persisted message. Ordered by progress.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivered,
    Read,
}

impl DeliveryStatus {
    /// Returns the more advanced of `self` and `incoming`.
    pub fn advance(self, incoming: DeliveryStatus) -> DeliveryStatus {
        self.max(incoming)
    }

    /// True when applying `incoming` would change the stored status.
    pub fn is_advanced_by(self, incoming: DeliveryStatus) -> bool {
        incoming > self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "read" => Ok(DeliveryStatus::Read),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}
