//! Publishing side of the bus.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use crate::events::{EventFilter, NodeEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Sink for node events.
///
/// The ledger and the delivery pools hold an `Arc<dyn EventPublisher>`;
/// the runtime hands them the shared [`InMemoryEventBus`], unit tests a
/// [`NoOpPublisher`].
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: NodeEvent);
}

/// Broadcast-channel bus. Every subscriber sees every event published after
/// it subscribed and filters on its side.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<NodeEvent>,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription::new(self.sender.subscribe(), filter)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: NodeEvent) {
        let topic = event.topic();
        // An error only means nobody is subscribed.
        if let Ok(receivers) = self.sender.send(event) {
            trace!(topic = ?topic, receivers, "Event published");
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpPublisher;

#[async_trait]
impl EventPublisher for NoOpPublisher {
    async fn publish(&self, _event: NodeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTopic;

    fn online(identity: &str) -> NodeEvent {
        NodeEvent::ClientOnline {
            pool: "direct".into(),
            identity: identity.into(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let bus = InMemoryEventBus::new();
        bus.publish(online("alice")).await;

        let mut late = bus.subscribe(EventFilter::all());
        assert!(late.drain().is_empty());
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_its_matching_events() {
        let bus = InMemoryEventBus::new();
        let mut all = bus.subscribe(EventFilter::all());
        let mut ledger = bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));

        bus.publish(online("bob")).await;

        assert_eq!(all.drain().len(), 1);
        assert!(ledger.drain().is_empty());
    }

    #[tokio::test]
    async fn test_noop_publisher_accepts_events() {
        NoOpPublisher.publish(online("carol")).await;
    }
}
