//! # Outbound Ports
//!
//! - [`FrameSink`]: the write half of one client connection
//! - [`MessageStore`]: direct-message persistence used by the sweep and by
//!   read/received acknowledgements

use async_trait::async_trait;
use shared_types::{DeliveryStatus, StorageError, StoredMessage};
use tokio::sync::mpsc;

use crate::error::DeliveryError;

/// Write half of a client connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Writes one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), DeliveryError>;

    /// Closes the connection. Default is a no-op.
    async fn close(&mut self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Direct-message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages addressed to `recipient` still in `pending`, oldest first.
    async fn fetch_pending_for_recipient(
        &self,
        recipient: &str,
    ) -> Result<Vec<StoredMessage>, StorageError>;

    /// Moves a message's status forward.
    ///
    /// Implementations must apply the monotonic rule: the stored status
    /// becomes `max(current, status)`. Returns the resulting status.
    async fn set_message_status(
        &self,
        message_id: &str,
        status: DeliveryStatus,
    ) -> Result<DeliveryStatus, StorageError>;

    async fn load_message(&self, message_id: &str) -> Result<StoredMessage, StorageError>;
}

/// Sink backed by an unbounded channel. Each frame is one `String`.
///
/// Fails once the receiving side is dropped, like a closed socket.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&mut self, text: String) -> Result<(), DeliveryError> {
        self.tx
            .send(text)
            .map_err(|_| DeliveryError::Transport("receiver dropped".into()))
    }
}
