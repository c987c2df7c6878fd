//! # Delivery Flow
//!
//! Connection pools, registration sweeps, client sessions and status
//! updates, backed by the node's in-memory store.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cc_03_delivery::{
        acknowledge, ChannelSink, Client, ClientSession, ConnectionPool, DeliveryError, Envelope,
        MessageStore, PoolConfig, PoolHandle,
    };
    use futures::channel::mpsc;
    use futures::SinkExt;
    use node_runtime::adapters::storage::{InMemoryStore, MessageRepository};
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, NodeEvent};
    use shared_types::{DeliveryStatus, StoredMessage};
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::support::{buffered_kinds, next_of_kind};

    struct Fixture {
        store: Arc<InMemoryStore>,
        bus: Arc<InMemoryEventBus>,
        pool: PoolHandle,
    }

    fn direct_pool() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let messages: Arc<dyn MessageStore> = store.clone();
        let (pool, _task) =
            ConnectionPool::spawn(PoolConfig::direct(), Some(messages), bus.clone()).unwrap();
        Fixture { store, bus, pool }
    }

    async fn connect(pool: &PoolHandle, identity: &str) -> (Arc<Client>, UnboundedReceiver<String>) {
        let (sink, frames) = ChannelSink::new();
        let client = Arc::new(Client::new(identity, sink));
        pool.register(client.clone()).await.unwrap();
        pool.online().await.unwrap();
        (client, frames)
    }

    // =========================================================================
    // REGISTRATION SWEEP
    // =========================================================================

    #[tokio::test]
    async fn test_pending_messages_swept_on_connect() {
        let f = direct_pool();
        f.store
            .insert_message(StoredMessage::new("m1", "bob", "alice", 1))
            .await
            .unwrap();
        let (_bob, mut bob_frames) = connect(&f.pool, "bob").await;

        let (_alice, mut alice_frames) = connect(&f.pool, "alice").await;
        let welcome = next_of_kind(&mut alice_frames, "welcome").await;
        assert_eq!(welcome["payload"]["message"], "Welcome to Courier!");
        let notice = next_of_kind(&mut alice_frames, "new_message").await;
        assert_eq!(notice["payload"]["id"], "m1");

        let update = next_of_kind(&mut bob_frames, "status_update").await;
        assert_eq!(update["payload"]["message_id"], "m1");
        assert_eq!(update["payload"]["status"], "delivered");
        assert_eq!(
            f.store.load_message("m1").await.unwrap().status,
            DeliveryStatus::Delivered
        );
    }

    #[tokio::test]
    async fn test_presence_announced_to_others() {
        let f = direct_pool();
        let mut delivery = f.bus.subscribe(EventFilter::topics(vec![EventTopic::Delivery]));
        let (_bob, mut bob_frames) = connect(&f.pool, "bob").await;
        let (alice, _alice_frames) = connect(&f.pool, "alice").await;

        // Presence goes to every connection, the newcomer included.
        let mut seen = Vec::new();
        while let Ok(frame) = bob_frames.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            if value["type"] == "presence" {
                seen.push((value["payload"]["address"].clone(), value["payload"]["status"].clone()));
            }
        }
        assert!(seen.contains(&("alice".into(), "online".into())));

        f.pool
            .unregister("alice", alice.connection_id())
            .await
            .unwrap();
        assert_eq!(f.pool.online().await.unwrap(), vec!["bob"]);

        let events = delivery.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            NodeEvent::ClientOffline { identity, .. } if identity == "alice"
        )));
    }

    // =========================================================================
    // CLIENT SESSION
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_frame_keeps_connection_open() {
        let f = direct_pool();
        let (alice, mut frames) = connect(&f.pool, "alice").await;
        let (mut tx, rx) = mpsc::unbounded::<Result<String, DeliveryError>>();
        let session = tokio::spawn(
            ClientSession::new(alice, f.pool.clone(), Some(f.store.clone())).run(rx),
        );

        tx.send(Ok(r#"{"type":"dance"}"#.into())).await.unwrap();
        tx.send(Ok("not json".into())).await.unwrap();
        tx.send(Ok(r#"{"type":"ping"}"#.into())).await.unwrap();
        let pong = next_of_kind(&mut frames, "pong").await;
        assert!(pong["payload"]["time"].is_string());
        assert_eq!(f.pool.online().await.unwrap(), vec!["alice"]);

        drop(tx);
        session.await.unwrap();
        assert!(f.pool.online().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_typing_relayed_to_target_only() {
        let f = direct_pool();
        let (alice, _alice_frames) = connect(&f.pool, "alice").await;
        let (_bob, mut bob_frames) = connect(&f.pool, "bob").await;
        let (_carol, mut carol_frames) = connect(&f.pool, "carol").await;

        let (mut tx, rx) = mpsc::unbounded::<Result<String, DeliveryError>>();
        let session = tokio::spawn(ClientSession::new(alice, f.pool.clone(), None).run(rx));
        tx.send(Ok(r#"{"type":"typing","payload":{"to":"bob"}}"#.into()))
            .await
            .unwrap();

        let typing = next_of_kind(&mut bob_frames, "typing").await;
        assert_eq!(typing["from"], "alice");
        drop(tx);
        session.await.unwrap();

        assert!(!buffered_kinds(&mut carol_frames).contains(&"typing".to_string()));
    }

    // =========================================================================
    // STATUS STATE MACHINE
    // =========================================================================

    #[tokio::test]
    async fn test_status_never_moves_backwards() {
        let f = direct_pool();
        f.store
            .insert_message(StoredMessage::new("m1", "bob", "alice", 1))
            .await
            .unwrap();
        let (_bob, mut bob_frames) = connect(&f.pool, "bob").await;

        let read = acknowledge(f.store.as_ref(), &f.pool, "alice", "m1", DeliveryStatus::Read)
            .await
            .unwrap();
        assert_eq!(read, Some(DeliveryStatus::Read));

        let late = acknowledge(
            f.store.as_ref(),
            &f.pool,
            "alice",
            "m1",
            DeliveryStatus::Delivered,
        )
        .await
        .unwrap();
        assert_eq!(late, Some(DeliveryStatus::Read));
        assert_eq!(
            f.store.load_message("m1").await.unwrap().status,
            DeliveryStatus::Read
        );

        let first = next_of_kind(&mut bob_frames, "status_update").await;
        let second = next_of_kind(&mut bob_frames, "status_update").await;
        assert_eq!(first["payload"]["status"], "read");
        assert_eq!(second["payload"]["status"], "read");
    }

    #[tokio::test]
    async fn test_ack_from_stranger_is_ignored() {
        let f = direct_pool();
        f.store
            .insert_message(StoredMessage::new("m1", "bob", "alice", 1))
            .await
            .unwrap();

        let outcome = acknowledge(f.store.as_ref(), &f.pool, "mallory", "m1", DeliveryStatus::Read)
            .await
            .unwrap();
        assert_eq!(outcome, None);
        assert_eq!(
            f.store.load_message("m1").await.unwrap().status,
            DeliveryStatus::Pending
        );
    }

    // =========================================================================
    // ROOMS AND RE-REGISTRATION
    // =========================================================================

    #[tokio::test]
    async fn test_room_broadcast_stays_in_room() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (pool, _task) = ConnectionPool::spawn(PoolConfig::ephemeral(), None, bus).unwrap();

        let mut frames = Vec::new();
        for (session, room) in [("s1", "room-a"), ("s2", "room-a"), ("s3", "room-b")] {
            let (sink, rx) = ChannelSink::new();
            pool.register(Arc::new(Client::new(session, sink).in_room(room)))
                .await
                .unwrap();
            frames.push(rx);
        }
        pool.online().await.unwrap();

        pool.broadcast(Envelope::secret_chat_message("room-a", "x1", "ghost", "c1ph3r"))
            .await
            .unwrap();
        pool.online().await.unwrap();

        let kinds: Vec<_> = frames.iter_mut().map(buffered_kinds).collect();
        let got = |i: usize| kinds[i].contains(&"secret_chat_message".to_string());
        assert!(got(0));
        assert!(got(1));
        assert!(!got(2));
    }

    #[tokio::test]
    async fn test_stale_unregister_keeps_newer_connection() {
        let f = direct_pool();
        let (old, _old_frames) = connect(&f.pool, "alice").await;
        let (new, mut new_frames) = connect(&f.pool, "alice").await;
        assert_ne!(old.connection_id(), new.connection_id());

        f.pool.unregister("alice", old.connection_id()).await.unwrap();
        assert_eq!(f.pool.online().await.unwrap(), vec!["alice"]);

        assert!(f
            .pool
            .deliver("alice", Envelope::typing("bob", "alice"))
            .await
            .unwrap());
        next_of_kind(&mut new_frames, "typing").await;
    }
}
