//! One registered connection.

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::envelope::Envelope;
use crate::error::DeliveryError;
use crate::ports::FrameSink;

/// A live connection registered with a pool.
///
/// Writes are serialized through the sink mutex, so frames from the pool
/// actor, the sweep and the read loop never interleave on the wire.
pub struct Client {
    identity: String,
    room: Option<String>,
    connection_id: Uuid,
    sink: Mutex<Box<dyn FrameSink>>,
}

impl Client {
    pub fn new(identity: impl Into<String>, sink: impl FrameSink + 'static) -> Self {
        Self {
            identity: identity.into(),
            room: None,
            connection_id: Uuid::new_v4(),
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Places the client in a room (room-keyed pools).
    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub async fn send(&self, envelope: &Envelope) -> Result<(), DeliveryError> {
        let text = serde_json::to_string(envelope)?;
        self.sink.lock().await.send_text(text).await
    }

    pub async fn close(&self) -> Result<(), DeliveryError> {
        self.sink.lock().await.close().await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("identity", &self.identity)
            .field("room", &self.room)
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ChannelSink;

    #[tokio::test]
    async fn test_send_writes_json_frame() {
        let (sink, mut rx) = ChannelSink::new();
        let client = Client::new("alice", sink).in_room("r1");
        client.send(&Envelope::welcome("hi")).await.unwrap();

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "welcome");
        assert_eq!(client.room(), Some("r1"));
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let (a, _ra) = ChannelSink::new();
        let (b, _rb) = ChannelSink::new();
        assert_ne!(
            Client::new("alice", a).connection_id(),
            Client::new("alice", b).connection_id()
        );
    }
}
