//! WebSocket upgrade endpoints.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use cc_03_delivery::serve_socket;
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct DirectParams {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SecretParams {
    #[serde(default)]
    pub room: Option<String>,
}

fn upgrade_required() -> ApiError {
    ApiError::BadRequest("WebSocket upgrade required".into())
}

/// `GET /ws?address=<identity>` joins the direct pool.
pub async fn direct_socket(
    State(state): State<AppState>,
    Query(params): Query<DirectParams>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let address = params
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("address query parameter is required".into()))?;
    let ws = ws.ok_or_else(upgrade_required)?;

    debug!(identity = %address, "[api] Upgrading direct connection");
    let pool = state.direct_pool.clone();
    let store = Some(state.messages.clone());
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, address, None, pool, store)))
}

/// `GET /ws/secret/:session_id?room=<room>` joins a secret room. The room
/// defaults to the session id.
pub async fn secret_socket(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<SecretParams>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let ws = ws.ok_or_else(upgrade_required)?;
    let room = params
        .room
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| session_id.clone());

    debug!(session = %session_id, room = %room, "[api] Upgrading secret connection");
    let pool = state.secret_pool.clone();
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, session_id, Some(room), pool, None)))
}
