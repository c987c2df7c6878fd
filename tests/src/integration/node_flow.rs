//! # Node Flow
//!
//! The assembled node: HTTP handlers, the event bridge and both pools
//! sharing one store.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use cc_01_mempool::MockTimeSource;
    use cc_02_ledger::LedgerApi;
    use cc_03_delivery::{ChannelSink, Client};
    use http_body_util::BodyExt;
    use node_runtime::adapters::storage::InMemoryStore;
    use node_runtime::{NodeConfig, NodeRuntime, NodeServices};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::support::{next_of_kind, T0};

    fn node() -> NodeRuntime {
        let mut config = NodeConfig::default();
        config.ledger.block_time_secs = 3600;
        let services = NodeServices::build_with_clock(
            config,
            Arc::new(InMemoryStore::new()),
            Arc::new(MockTimeSource::new(T0)),
        )
        .unwrap();
        NodeRuntime::new(services)
    }

    async fn request(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_message_is_delivered_sealed_and_announced() {
        let runtime = node();
        runtime.start().await.unwrap();
        let services = runtime.services();
        let app = runtime.router();

        let (sink, mut alice) = ChannelSink::new();
        services
            .direct_pool
            .register(Arc::new(Client::new("alice", sink)))
            .await
            .unwrap();
        services.direct_pool.online().await.unwrap();

        let (status, created) = request(
            &app,
            "POST",
            "/api/v1/messages",
            Some(json!({ "id": "m1", "sender_address": "bob", "recipient_address": "alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["delivered"], true);
        let notice = next_of_kind(&mut alice, "new_message").await;
        assert_eq!(notice["payload"]["id"], "m1");

        let report = services.ledger.seal_once().await.unwrap();
        let announced = next_of_kind(&mut alice, "new_block").await;
        assert_eq!(announced["payload"]["id"], report.block.id.as_str());
        assert_eq!(announced["payload"]["height"], 1);

        let (_, message) = request(&app, "GET", "/api/v1/messages/m1?reader=alice", None).await;
        assert_eq!(message["status"], "read");
        assert_eq!(message["block_id"], report.block.id.as_str());

        let (_, health) = request(&app, "GET", "/health", None).await;
        assert_eq!(health["height"], 1);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_channel_and_group_fan_out() {
        let runtime = node();
        runtime.start().await.unwrap();
        let services = runtime.services();
        let app = runtime.router();

        let (sink, mut carol) = ChannelSink::new();
        services
            .direct_pool
            .register(Arc::new(Client::new("carol", sink)))
            .await
            .unwrap();
        services.direct_pool.online().await.unwrap();

        let (status, body) = request(
            &app,
            "POST",
            "/api/v1/channels/general/messages",
            Some(json!({ "id": "cm1", "sender_address": "bob", "members": ["bob", "carol", "dave"] })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["notified"], 2);
        let notice = next_of_kind(&mut carol, "new_channel_message").await;
        assert_eq!(notice["payload"]["channel_id"], "general");

        request(
            &app,
            "POST",
            "/api/v1/groups/g1/messages",
            Some(json!({ "id": "gm1", "sender_address": "bob", "members": ["carol"] })),
        )
        .await;
        let notice = next_of_kind(&mut carol, "new_group_message").await;
        assert_eq!(notice["payload"]["group_id"], "g1");

        assert_eq!(services.ledger.pending_count(), 2);
        let report = services.ledger.seal_once().await.unwrap();
        assert_eq!(report.sealed.len(), 2);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_explore_lists_every_sealed_activity_of_an_address() {
        let runtime = node();
        runtime.start().await.unwrap();
        let services = runtime.services();
        let app = runtime.router();

        let writes = [
            (
                "/api/v1/messages",
                json!({ "id": "m-in", "sender_address": "bob", "recipient_address": "alice" }),
            ),
            (
                "/api/v1/messages",
                json!({ "id": "m-out", "sender_address": "alice", "recipient_address": "carol" }),
            ),
            (
                "/api/v1/messages",
                json!({ "id": "m-other", "sender_address": "bob", "recipient_address": "carol" }),
            ),
            (
                "/api/v1/channels/general/messages",
                json!({ "id": "cm1", "sender_address": "alice" }),
            ),
            (
                "/api/v1/groups/team/messages",
                json!({ "id": "gm1", "sender_address": "bob" }),
            ),
            (
                "/api/v1/mempool",
                json!({ "kind": "channel_create", "entity_id": "general", "author": "alice" }),
            ),
            (
                "/api/v1/mempool",
                json!({ "kind": "group_join", "entity_id": "team:alice" }),
            ),
            (
                "/api/v1/mempool",
                json!({ "kind": "group_join", "entity_id": "team:carol" }),
            ),
        ];
        for (uri, body) in writes {
            let (status, _) = request(&app, "POST", uri, Some(body)).await;
            assert!(status.is_success(), "{uri} answered {status}");
        }

        // Nothing is reported before the seal.
        let (status, pending) = request(&app, "GET", "/api/v1/explore/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending["count"], 0);

        let report = services.ledger.seal_once().await.unwrap();
        assert_eq!(report.sealed.len(), 8);

        let (status, body) = request(&app, "GET", "/api/v1/explore/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "alice");
        assert_eq!(body["count"], 5);
        let mut entities: Vec<_> = body["transactions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| {
                assert_eq!(t["block_id"], report.block.id.as_str());
                t["entity_id"].as_str().unwrap().to_string()
            })
            .collect();
        entities.sort();
        assert_eq!(entities, vec!["cm1", "general", "m-in", "m-out", "team:alice"]);

        let (_, carol) = request(&app, "GET", "/api/v1/explore/carol", None).await;
        assert_eq!(carol["count"], 3);
        let (_, nobody) = request(&app, "GET", "/api/v1/explore/nobody", None).await;
        assert_eq!(nobody["count"], 0);
        let (status, _) = request(&app, "GET", "/api/v1/explore/%20", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        runtime.shutdown().await;
    }
}
