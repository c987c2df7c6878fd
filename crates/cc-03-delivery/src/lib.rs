//! # Courier Delivery Pools (Subsystem 3)
//!
//! Real-time fan-out over long-lived connections: presence, typing relay,
//! new-message pushes and delivery receipts.
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────── ConnectionPool actor ─────────────────────┐
//!  Register ─┤                                                                │
//!  Unregister┤   HashMap<identity, Arc<Client>>   (owned by one task)         │
//!  Broadcast ┤                                                                ├──→ Client::send
//!  Deliver ──┤   presence ─ welcome ─ spawn sweep                             │     (per-client lock)
//!  Online ───┘                                                                │
//!            └────────────────────────────────────────────────────────────────┘
//!                   ▲                               ▲
//!   ClientSession ──┘ (ping/typing/read/received)   └── notify_* / announce_block (HTTP layer)
//! ```
//!
//! ## Message Status
//!
//! `pending → delivered → read`. Every write goes through
//! [`MessageStore::set_message_status`], which keeps the maximum of the
//! stored and requested status, so a late `received` never undoes `read`.
//!
//! ## Pool Modes
//!
//! | Mode     | Key                | `to` targets          | Sweep |
//! |----------|--------------------|-----------------------|-------|
//! | `Direct` | user address       | one identity          | yes   |
//! | `Room`   | opaque session id  | every client in room  | no    |
//!
//! ## Connection Lifecycle
//!
//! `Connecting → Registered → Unregistered`. A reconnect is a new
//! [`Client`] with a new connection id; an unregister carrying an older id
//! is ignored so it cannot evict the newer connection.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod pool;
pub mod ports;
pub mod session;
pub mod sweep;

pub use adapters::{serve_socket, WsSink};
pub use config::{PoolConfig, PoolMode, DEFAULT_WRITE_TIMEOUT_MS};
pub use domain::{kinds, Client, ClientCommand, Envelope};
pub use error::DeliveryError;
pub use notify::{announce_block, notify_channel_message, notify_group_message, notify_new_message};
pub use pool::{ConnectionPool, PoolHandle};
pub use ports::{ChannelSink, FrameSink, MessageStore};
pub use session::ClientSession;
pub use sweep::{acknowledge, advance_status, delivery_sweep, SweepReport};
