//! Ports: the pool's dependencies on transport and persistence.

pub mod outbound;

pub use outbound::{ChannelSink, FrameSink, MessageStore};
