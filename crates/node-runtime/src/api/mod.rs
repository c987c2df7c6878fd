//! # HTTP Surface
//!
//! | Method | Path                                   | Handler                  |
//! |--------|----------------------------------------|--------------------------|
//! | GET    | `/health`                              | liveness + head summary  |
//! | GET    | `/metrics`                             | Prometheus text          |
//! | GET    | `/ws?address=`                         | direct pool socket       |
//! | GET    | `/ws/secret/:session_id?room=`         | secret room socket       |
//! | GET    | `/api/v1/head`                         | chain head               |
//! | GET    | `/api/v1/blocks/:id`                   | block + transactions     |
//! | GET    | `/api/v1/blocks/height/:height`        | block + transactions     |
//! | GET    | `/api/v1/transactions/:hash`           | one transaction          |
//! | GET    | `/api/v1/stats`                        | chain and mempool stats  |
//! | GET    | `/api/v1/proof/:entity_id`             | Merkle inclusion proof   |
//! | GET    | `/api/v1/chain/verify`                 | full link check          |
//! | GET    | `/api/v1/explore/:address`             | activity of an address   |
//! | POST   | `/api/v1/mempool`                      | queue a reference        |
//! | POST   | `/api/v1/messages`                     | create direct message    |
//! | GET    | `/api/v1/messages/:id?reader=`         | load (and mark read)     |
//! | POST   | `/api/v1/channels/:id/messages`        | channel fan-out          |
//! | POST   | `/api/v1/groups/:id/messages`          | group fan-out            |
//! | POST   | `/api/v1/secret/:room/messages`        | relay ciphertext         |
//! | DELETE | `/api/v1/secret/:room`                 | tear down a room         |
//! | GET    | `/api/v1/online`                       | connected identities     |

pub mod error;
pub mod handlers;
pub mod ws;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::container::NodeServices;

/// Shared handler state.
pub type AppState = Arc<NodeServices>;

/// Builds the full router.
pub fn router(services: AppState) -> Router {
    let api = Router::new()
        .route("/head", get(handlers::head))
        .route("/blocks/:id", get(handlers::block_by_id))
        .route("/blocks/height/:height", get(handlers::block_by_height))
        .route("/transactions/:hash", get(handlers::transaction_by_hash))
        .route("/stats", get(handlers::stats))
        .route("/proof/:entity_id", get(handlers::proof))
        .route("/chain/verify", get(handlers::verify_chain))
        .route("/explore/:address", get(handlers::explore))
        .route("/mempool", post(handlers::submit_entry))
        .route("/messages", post(handlers::create_message))
        .route("/messages/:id", get(handlers::get_message))
        .route("/channels/:id/messages", post(handlers::create_channel_message))
        .route("/groups/:id/messages", post(handlers::create_group_message))
        .route("/secret/:room/messages", post(handlers::relay_secret_message))
        .route("/secret/:room", delete(handlers::delete_secret_room))
        .route("/online", get(handlers::online));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/ws", get(ws::direct_socket))
        .route("/ws/secret/:session_id", get(ws::secret_socket))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}
