//! # Client Read Loop
//!
//! One [`ClientSession`] per registered connection. It consumes text frames
//! until the transport ends, then unregisters its own connection id.
//!
//! | Frame type | Action                                                  |
//! |------------|---------------------------------------------------------|
//! | `ping`     | `pong` with the server time, straight to this client    |
//! | `typing`   | relayed to `payload.to`, tagged `from` this identity    |
//! | `read`     | status `read` persisted, sender notified                |
//! | `received` | status `delivered` persisted, sender notified           |
//! | other      | logged and ignored, connection stays open               |

use std::sync::Arc;

use futures::{Stream, StreamExt};
use shared_types::DeliveryStatus;
use tracing::{debug, info, warn};

use crate::domain::{ClientCommand, Client, Envelope};
use crate::error::DeliveryError;
use crate::pool::PoolHandle;
use crate::ports::MessageStore;
use crate::sweep::acknowledge;

pub struct ClientSession {
    client: Arc<Client>,
    pool: PoolHandle,
    store: Option<Arc<dyn MessageStore>>,
}

impl ClientSession {
    /// `store` is required for `read`/`received`; without it those frames
    /// are ignored.
    pub fn new(
        client: Arc<Client>,
        pool: PoolHandle,
        store: Option<Arc<dyn MessageStore>>,
    ) -> Self {
        Self {
            client,
            pool,
            store,
        }
    }

    /// Runs until `frames` ends or yields an error, then unregisters.
    pub async fn run<S>(self, frames: S)
    where
        S: Stream<Item = Result<String, DeliveryError>> + Send,
    {
        let mut frames = std::pin::pin!(frames);
        let mut handled = 0u64;

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(text) => {
                    handled += 1;
                    if !self.handle_text(&text).await {
                        break;
                    }
                }
                Err(DeliveryError::ConnectionClosed) => break,
                Err(e) => {
                    warn!(
                        identity = %self.client.identity(),
                        connection_id = %self.client.connection_id(),
                        error = %e,
                        "[cc-03] Read failed, closing connection"
                    );
                    break;
                }
            }
        }

        info!(
            identity = %self.client.identity(),
            connection_id = %self.client.connection_id(),
            frames = handled,
            "[cc-03] Connection closed"
        );
        if let Err(e) = self
            .pool
            .unregister(self.client.identity(), self.client.connection_id())
            .await
        {
            debug!(error = %e, "[cc-03] Pool gone before unregister");
        }
    }

    /// Returns false when the connection can no longer be served.
    async fn handle_text(&self, text: &str) -> bool {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    identity = %self.client.identity(),
                    error = %e,
                    "[cc-03] Ignoring malformed frame"
                );
                return true;
            }
        };

        let result = match ClientCommand::classify(&envelope) {
            ClientCommand::Ping => self.client.send(&Envelope::pong()).await,
            ClientCommand::Typing { to } => {
                self.pool
                    .broadcast(Envelope::typing(self.client.identity(), &to))
                    .await
            }
            ClientCommand::Read { message_id } => {
                self.acknowledge(&message_id, DeliveryStatus::Read).await
            }
            ClientCommand::Received { message_id } => {
                self.acknowledge(&message_id, DeliveryStatus::Delivered).await
            }
            ClientCommand::Malformed { kind, missing } => {
                warn!(
                    identity = %self.client.identity(),
                    kind = %kind,
                    missing = missing,
                    "[cc-03] Frame missing required payload field"
                );
                Ok(())
            }
            ClientCommand::Unknown(kind) => {
                warn!(
                    identity = %self.client.identity(),
                    kind = %kind,
                    "[cc-03] Unknown message type"
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(
                identity = %self.client.identity(),
                kind = %envelope.kind,
                error = %e,
                "[cc-03] Frame handling failed"
            );
            return !e.is_terminal();
        }
        true
    }

    async fn acknowledge(
        &self,
        message_id: &str,
        status: DeliveryStatus,
    ) -> Result<(), DeliveryError> {
        let Some(store) = &self.store else {
            debug!(
                pool = %self.pool.name(),
                message_id = %message_id,
                "[cc-03] Acknowledgement ignored, pool has no message store"
            );
            return Ok(());
        };
        acknowledge(
            store.as_ref(),
            &self.pool,
            self.client.identity(),
            message_id,
            status,
        )
        .await
        .map(|_| ())
    }
}
