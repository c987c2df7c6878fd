//! axum WebSocket adapter.
//!
//! Splits an upgraded socket into a [`WsSink`] owned by the registered
//! [`Client`] and a text-frame stream consumed by [`ClientSession`].

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use crate::domain::Client;
use crate::error::DeliveryError;
use crate::pool::PoolHandle;
use crate::ports::{FrameSink, MessageStore};
use crate::session::ClientSession;

/// Write half of an upgraded WebSocket.
pub struct WsSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), DeliveryError> {
        self.0
            .send(Message::Text(text))
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), DeliveryError> {
        self.0
            .close()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

fn to_frame(message: Result<Message, axum::Error>) -> Option<Result<String, DeliveryError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(data)) => match String::from_utf8(data) {
            Ok(text) => Some(Ok(text)),
            Err(_) => {
                warn!("[cc-03] Dropping non UTF-8 binary frame");
                None
            }
        },
        // Control frames are answered by the transport.
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
        Ok(Message::Close(_)) => Some(Err(DeliveryError::ConnectionClosed)),
        Err(e) => Some(Err(DeliveryError::Transport(e.to_string()))),
    }
}

/// Registers an upgraded socket with `pool` and runs its read loop.
///
/// `room` places the client in a room for room-keyed pools.
pub async fn serve_socket(
    socket: WebSocket,
    identity: String,
    room: Option<String>,
    pool: PoolHandle,
    store: Option<Arc<dyn MessageStore>>,
) {
    let (sink, stream) = socket.split();
    let mut client = Client::new(identity, WsSink(sink));
    if let Some(room) = room {
        client = client.in_room(room);
    }
    let client = Arc::new(client);
    info!(
        pool = %pool.name(),
        identity = %client.identity(),
        connection_id = %client.connection_id(),
        "[cc-03] New WebSocket connection"
    );

    if let Err(e) = pool.register(Arc::clone(&client)).await {
        warn!(error = %e, "[cc-03] Pool rejected connection");
        let _ = client.close().await;
        return;
    }

    let frames = stream.filter_map(|message| async move { to_frame(message) });
    ClientSession::new(client, pool, store).run(frames).await;
}
