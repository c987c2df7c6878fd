//! # Connection Pool Actor
//!
//! One task owns the identity → client map. Every mutation and every
//! fan-out arrives as a [`PoolCommand`] on a bounded queue and is applied in
//! arrival order; callers hold a cloneable [`PoolHandle`].
//!
//! ```text
//!  read loops ──┐
//!  sweep tasks ─┼── PoolCommand ──→ [PoolActor] ──→ Client::send (per-client lock)
//!  notifiers ───┤                      │
//!  HTTP routes ─┘                      └──→ NodeEvent (ClientOnline, ClientOffline, DeliveryFailed)
//! ```
//!
//! A failed write is logged and published; it never affects other
//! recipients. The client's own read loop notices the broken transport and
//! unregisters. Actor-side writes are bounded by `write_timeout_ms`; a client
//! that stalls past it is dropped from the pool so it cannot hold up the
//! queue.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use shared_bus::{EventPublisher, NodeEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{PoolConfig, PoolMode};
use crate::domain::{Client, Envelope};
use crate::error::DeliveryError;
use crate::ports::MessageStore;
use crate::sweep::delivery_sweep;

pub(crate) enum PoolCommand {
    Register(Arc<Client>),
    Unregister {
        identity: String,
        connection_id: Uuid,
    },
    Broadcast(Envelope),
    Deliver {
        identity: String,
        envelope: Envelope,
        reply: oneshot::Sender<bool>,
    },
    Online(oneshot::Sender<Vec<String>>),
    IsOnline(String, oneshot::Sender<bool>),
    Shutdown,
}

/// Cloneable front door to a running pool.
#[derive(Clone)]
pub struct PoolHandle {
    sender: mpsc::Sender<PoolCommand>,
    name: Arc<str>,
    mode: PoolMode,
    publisher: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl PoolHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> PoolMode {
        self.mode
    }

    pub(crate) fn publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.publisher
    }

    async fn send(&self, command: PoolCommand) -> Result<(), DeliveryError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| DeliveryError::PoolClosed)
    }

    /// Queues a registration. Presence, welcome and sweep follow in the actor.
    pub async fn register(&self, client: Arc<Client>) -> Result<(), DeliveryError> {
        self.send(PoolCommand::Register(client)).await
    }

    /// Queues removal of `identity`, but only if its current registration
    /// is still `connection_id`.
    pub async fn unregister(
        &self,
        identity: impl Into<String>,
        connection_id: Uuid,
    ) -> Result<(), DeliveryError> {
        self.send(PoolCommand::Unregister {
            identity: identity.into(),
            connection_id,
        })
        .await
    }

    /// Fans out an envelope according to its `to` field.
    pub async fn broadcast(&self, envelope: Envelope) -> Result<(), DeliveryError> {
        self.send(PoolCommand::Broadcast(envelope)).await
    }

    /// Targets `to` at `identity` and broadcasts. Silent if absent.
    pub async fn send_to(
        &self,
        identity: impl Into<String>,
        envelope: Envelope,
    ) -> Result<(), DeliveryError> {
        self.broadcast(envelope.to_target(identity)).await
    }

    /// Writes directly to one registered identity.
    ///
    /// Returns whether the identity was registered and the write succeeded.
    pub async fn deliver(
        &self,
        identity: impl Into<String>,
        envelope: Envelope,
    ) -> Result<bool, DeliveryError> {
        let (reply, rx) = oneshot::channel();
        self.send(PoolCommand::Deliver {
            identity: identity.into(),
            envelope,
            reply,
        })
        .await?;
        rx.await.map_err(|_| DeliveryError::PoolClosed)
    }

    /// Registered identities, sorted.
    pub async fn online(&self) -> Result<Vec<String>, DeliveryError> {
        let (reply, rx) = oneshot::channel();
        self.send(PoolCommand::Online(reply)).await?;
        rx.await.map_err(|_| DeliveryError::PoolClosed)
    }

    pub async fn is_online(&self, identity: impl Into<String>) -> Result<bool, DeliveryError> {
        let (reply, rx) = oneshot::channel();
        self.send(PoolCommand::IsOnline(identity.into(), reply)).await?;
        rx.await.map_err(|_| DeliveryError::PoolClosed)
    }

    /// Stops the actor after the commands already queued. Registered
    /// connections are closed.
    pub async fn shutdown(&self) -> Result<(), DeliveryError> {
        self.send(PoolCommand::Shutdown).await
    }
}

/// Entry point for starting a pool.
pub struct ConnectionPool;

impl ConnectionPool {
    /// Spawns the actor task.
    ///
    /// `store` backs the registration sweep; pools without one (or with
    /// `sweep_on_register` off) skip it.
    pub fn spawn(
        config: PoolConfig,
        store: Option<Arc<dyn MessageStore>>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<(PoolHandle, JoinHandle<()>), DeliveryError> {
        config.validate()?;
        let (sender, commands) = mpsc::channel(config.command_buffer);
        let handle = PoolHandle {
            sender: sender.clone(),
            name: Arc::from(config.name.as_str()),
            mode: config.mode,
            publisher: Arc::clone(&publisher),
        };
        let actor = PoolActor {
            weak: sender.downgrade(),
            name: Arc::clone(&handle.name),
            config,
            clients: HashMap::new(),
            commands,
            store,
            publisher,
        };
        drop(sender);
        let task = tokio::spawn(actor.run());
        Ok((handle, task))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Sent,
    Failed,
    Stalled,
}

struct PoolActor {
    config: PoolConfig,
    clients: HashMap<String, Arc<Client>>,
    commands: mpsc::Receiver<PoolCommand>,
    // Lets sweeps talk back to the pool without keeping it alive.
    weak: mpsc::WeakSender<PoolCommand>,
    name: Arc<str>,
    store: Option<Arc<dyn MessageStore>>,
    publisher: Arc<dyn EventPublisher>,
}

impl PoolActor {
    async fn run(mut self) {
        info!(pool = %self.config.name, mode = ?self.config.mode, "[cc-03] Connection pool started");

        while let Some(command) = self.commands.recv().await {
            match command {
                PoolCommand::Register(client) => self.register(client).await,
                PoolCommand::Unregister {
                    identity,
                    connection_id,
                } => self.unregister(&identity, connection_id).await,
                PoolCommand::Broadcast(envelope) => {
                    let stalled = self.broadcast(&envelope).await;
                    self.evict(stalled).await;
                }
                PoolCommand::Deliver {
                    identity,
                    envelope,
                    reply,
                } => {
                    let outcome = match self.clients.get(&identity).cloned() {
                        Some(client) => {
                            let outcome = self.write(&client, &envelope).await;
                            if outcome == WriteOutcome::Stalled {
                                self.evict(vec![client]).await;
                            }
                            outcome
                        }
                        None => WriteOutcome::Failed,
                    };
                    let _ = reply.send(outcome == WriteOutcome::Sent);
                }
                PoolCommand::Online(reply) => {
                    let mut identities: Vec<String> = self.clients.keys().cloned().collect();
                    identities.sort();
                    let _ = reply.send(identities);
                }
                PoolCommand::IsOnline(identity, reply) => {
                    let _ = reply.send(self.clients.contains_key(&identity));
                }
                PoolCommand::Shutdown => break,
            }
        }

        let limit = self.config.write_timeout();
        for client in self.clients.values() {
            let _ = timeout(limit, client.close()).await;
        }
        info!(
            pool = %self.config.name,
            remaining = self.clients.len(),
            "[cc-03] Connection pool stopped"
        );
    }

    async fn register(&mut self, client: Arc<Client>) {
        let identity = client.identity().to_string();
        if let Some(previous) = self.clients.insert(identity.clone(), Arc::clone(&client)) {
            debug!(
                pool = %self.config.name,
                identity = %identity,
                replaced = %previous.connection_id(),
                "[cc-03] Identity re-registered, newer connection wins"
            );
        }
        info!(
            pool = %self.config.name,
            identity = %identity,
            connection_id = %client.connection_id(),
            clients = self.clients.len(),
            "[cc-03] Client registered"
        );

        let mut stalled = self.broadcast(&self.presence(&client, true)).await;
        let welcome = Envelope::welcome(&self.config.welcome_message);
        if self.write(&client, &welcome).await == WriteOutcome::Stalled {
            stalled.push(Arc::clone(&client));
        }
        self.publisher
            .publish(NodeEvent::ClientOnline {
                pool: self.config.name.clone(),
                identity: identity.clone(),
            })
            .await;

        let newcomer_stalled = stalled
            .iter()
            .any(|c| c.connection_id() == client.connection_id());
        if self.config.sweep_on_register && !newcomer_stalled {
            self.spawn_sweep(identity);
        }
        self.evict(stalled).await;
    }

    async fn unregister(&mut self, identity: &str, connection_id: Uuid) {
        match self.clients.get(identity) {
            Some(client) if client.connection_id() == connection_id => {}
            Some(_) => {
                debug!(
                    pool = %self.config.name,
                    identity = %identity,
                    stale = %connection_id,
                    "[cc-03] Ignoring unregister from a replaced connection"
                );
                return;
            }
            None => return,
        }
        let Some(current) = self.clients.remove(identity) else {
            return;
        };
        info!(
            pool = %self.config.name,
            identity = %identity,
            clients = self.clients.len(),
            "[cc-03] Client unregistered"
        );
        let stalled = self.announce_offline(&current).await;
        self.evict(stalled).await;
    }

    /// Drops clients whose writes timed out, then announces them offline.
    /// Clients that stall on the offline presence are dropped in turn.
    async fn evict(&mut self, mut stalled: Vec<Arc<Client>>) {
        while let Some(client) = stalled.pop() {
            let current = self
                .clients
                .get(client.identity())
                .is_some_and(|c| c.connection_id() == client.connection_id());
            if !current {
                continue;
            }
            self.clients.remove(client.identity());
            warn!(
                pool = %self.config.name,
                identity = %client.identity(),
                connection_id = %client.connection_id(),
                timeout_ms = self.config.write_timeout_ms,
                "[cc-03] Dropping stalled client"
            );
            stalled.extend(self.announce_offline(&client).await);
        }
    }

    /// Broadcasts offline presence and publishes `ClientOffline`. Returns
    /// recipients that stalled on the presence frame.
    async fn announce_offline(&self, client: &Client) -> Vec<Arc<Client>> {
        let stalled = self.broadcast(&self.presence(client, false)).await;
        self.publisher
            .publish(NodeEvent::ClientOffline {
                pool: self.config.name.clone(),
                identity: client.identity().to_string(),
            })
            .await;
        stalled
    }

    /// Presence is scoped to the client's room in room-keyed pools.
    fn presence(&self, client: &Client, online: bool) -> Envelope {
        let envelope = Envelope::presence(client.identity(), online);
        match (self.config.mode, client.room()) {
            (PoolMode::Room, Some(room)) => envelope.to_target(room),
            _ => envelope,
        }
    }

    fn recipients(&self, envelope: &Envelope) -> Vec<Arc<Client>> {
        match (&envelope.to, self.config.mode) {
            (None, _) => self.clients.values().cloned().collect(),
            (Some(identity), PoolMode::Direct) => {
                self.clients.get(identity).cloned().into_iter().collect()
            }
            (Some(room), PoolMode::Room) => self
                .clients
                .values()
                .filter(|c| c.room() == Some(room.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Writes to every recipient concurrently. Returns the ones that stalled.
    async fn broadcast(&self, envelope: &Envelope) -> Vec<Arc<Client>> {
        let recipients = self.recipients(envelope);
        if recipients.is_empty() {
            debug!(
                pool = %self.config.name,
                kind = %envelope.kind,
                to = ?envelope.to,
                "[cc-03] No registered recipient"
            );
            return Vec::new();
        }
        let writes = recipients.iter().map(|client| self.write(client, envelope));
        let outcomes = join_all(writes).await;
        recipients
            .into_iter()
            .zip(outcomes)
            .filter(|(_, outcome)| *outcome == WriteOutcome::Stalled)
            .map(|(client, _)| client)
            .collect()
    }

    async fn write(&self, client: &Client, envelope: &Envelope) -> WriteOutcome {
        let result = match timeout(self.config.write_timeout(), client.send(envelope)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::WriteTimeout(self.config.write_timeout_ms)),
        };
        match result {
            Ok(()) => WriteOutcome::Sent,
            Err(e) => {
                warn!(
                    pool = %self.config.name,
                    identity = %client.identity(),
                    kind = %envelope.kind,
                    error = %e,
                    "[cc-03] Write to client failed"
                );
                self.publisher
                    .publish(NodeEvent::DeliveryFailed {
                        pool: self.config.name.clone(),
                        identity: client.identity().to_string(),
                        reason: e.to_string(),
                    })
                    .await;
                if matches!(e, DeliveryError::WriteTimeout(_)) {
                    WriteOutcome::Stalled
                } else {
                    WriteOutcome::Failed
                }
            }
        }
    }

    fn spawn_sweep(&self, identity: String) {
        let (Some(store), Some(sender)) = (self.store.clone(), self.weak.upgrade()) else {
            return;
        };
        let pool = PoolHandle {
            sender,
            name: Arc::clone(&self.name),
            mode: self.config.mode,
            publisher: Arc::clone(&self.publisher),
        };
        tokio::spawn(async move {
            let report = delivery_sweep(&identity, store.as_ref(), &pool).await;
            if !report.is_empty() {
                info!(
                    identity = %identity,
                    delivered = report.delivered.len(),
                    failed = report.failed.len(),
                    "[cc-03] Delivery sweep finished"
                );
            }
        });
    }
}
