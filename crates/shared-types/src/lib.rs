//! # Shared Types Crate
//!
//! This crate contains the domain entities shared by the mempool, the ledger
//! engine and the delivery pool.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every cross-crate type is defined here.
//! - **Opaque References**: Ledger entities hold ids of persisted records,
//!   never their content.
//! - **Monotonic Status**: Message delivery status only moves forward
//!   (`pending -> delivered -> read`); see [`DeliveryStatus::advance`].

pub mod entities;
pub mod errors;
pub mod status;

pub use entities::*;
pub use errors::*;
pub use status::*;
