//! REST handlers.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cc_02_ledger::LedgerApi;
use cc_03_delivery::{
    acknowledge, notify_channel_message, notify_group_message, notify_new_message, Envelope,
};
use serde::Deserialize;
use serde_json::json;
use shared_types::{DeliveryStatus, StoredMessage, TransactionKind};
use tracing::info;
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;

type ApiResult<T> = Result<T, ApiError>;

fn require(field: &'static str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn id_or_new(id: Option<String>) -> String {
    id.filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let head = state.ledger.head().ok();
    Json(json!({
        "status": "healthy",
        "service": "courier-node",
        "version": env!("CARGO_PKG_VERSION"),
        "height": head.as_ref().map(|b| b.height),
        "head": head.map(|b| b.id),
        "mempool": state.ledger.pending_count(),
    }))
}

// =============================================================================
// CHAIN QUERIES
// =============================================================================

pub async fn head(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.ledger.head()?))
}

pub async fn block_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.ledger.block_by_id(&id).await?))
}

pub async fn block_by_height(
    State(state): State<AppState>,
    Path(height): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.ledger.block_by_height(height).await?))
}

pub async fn transaction_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.ledger.transaction_by_hash(&hash).await?))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stats = state.ledger.stats().await?;
    Ok(Json(json!({
        "chain": stats,
        "mempool": {
            "pending": state.mempool.len(),
            "capacity": state.mempool.capacity(),
            "evicted_total": state.mempool.evicted_total(),
        },
    })))
}

pub async fn proof(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.ledger.merkle_proof_for(&entity_id).await?))
}

pub async fn verify_chain(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let checked = state.ledger.verify_chain().await?;
    Ok(Json(json!({ "valid": true, "blocks_checked": checked })))
}

/// Sealed activity of one address, newest first.
pub async fn explore(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require("address", &address)?;
    let transactions = state.ledger.transactions_for_address(&address).await?;
    Ok(Json(json!({
        "address": address,
        "count": transactions.len(),
        "transactions": transactions,
    })))
}

// =============================================================================
// MEMPOOL
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitEntry {
    pub kind: String,
    pub entity_id: String,
    /// Creator of a non-direct entity, indexed for `/explore`.
    #[serde(default)]
    pub author: Option<String>,
}

pub async fn submit_entry(
    State(state): State<AppState>,
    Json(body): Json<SubmitEntry>,
) -> ApiResult<impl IntoResponse> {
    let kind = TransactionKind::from_str(&body.kind)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require("entity_id", &body.entity_id)?;

    if let Some(author) = body.author.as_deref().filter(|a| !a.trim().is_empty()) {
        state
            .repository
            .record_author(kind, &body.entity_id, author)
            .await?;
    }
    state.ledger.add_to_mempool(kind, &body.entity_id).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "kind": kind, "entity_id": body.entity_id, "pending": state.ledger.pending_count() })),
    ))
}

// =============================================================================
// DIRECT MESSAGES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_address: String,
    pub recipient_address: String,
}

/// Persists a message, queues it for sealing and pushes a notification.
pub async fn create_message(
    State(state): State<AppState>,
    Json(body): Json<NewMessage>,
) -> ApiResult<impl IntoResponse> {
    require("sender_address", &body.sender_address)?;
    require("recipient_address", &body.recipient_address)?;

    let message = StoredMessage::new(
        id_or_new(body.id),
        body.sender_address,
        body.recipient_address,
        state.clock.now(),
    );
    state.repository.insert_message(message.clone()).await?;
    state
        .ledger
        .add_to_mempool(TransactionKind::DirectMessage, &message.id)
        .await;

    let delivered =
        notify_new_message(&state.direct_pool, state.messages.as_ref(), &message).await?;
    info!(
        message_id = %message.id,
        delivered,
        "[api] Message accepted"
    );

    let message = state.messages.load_message(&message.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": message, "delivered": delivered })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub reader: Option<String>,
}

/// Loads a message; a read by its recipient marks it read.
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ReadQuery>,
) -> ApiResult<impl IntoResponse> {
    let message = state.messages.load_message(&id).await?;
    if let Some(reader) = query.reader.filter(|r| *r == message.recipient_address) {
        acknowledge(
            state.messages.as_ref(),
            &state.direct_pool,
            &reader,
            &id,
            DeliveryStatus::Read,
        )
        .await?;
        return Ok(Json(state.messages.load_message(&id).await?));
    }
    Ok(Json(message))
}

// =============================================================================
// CHANNELS AND GROUPS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FanOutMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_address: String,
    #[serde(default)]
    pub members: Vec<String>,
}

pub async fn create_channel_message(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(body): Json<FanOutMessage>,
) -> ApiResult<impl IntoResponse> {
    require("sender_address", &body.sender_address)?;
    let id = id_or_new(body.id);
    state
        .repository
        .record_author(TransactionKind::ChannelMessage, &id, &body.sender_address)
        .await?;
    state
        .ledger
        .add_to_mempool(TransactionKind::ChannelMessage, &id)
        .await;
    let notified = notify_channel_message(
        &state.direct_pool,
        &channel_id,
        &id,
        &body.sender_address,
        &body.members,
    )
    .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "id": id, "channel_id": channel_id, "notified": notified })),
    ))
}

pub async fn create_group_message(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(body): Json<FanOutMessage>,
) -> ApiResult<impl IntoResponse> {
    require("sender_address", &body.sender_address)?;
    let id = id_or_new(body.id);
    state
        .repository
        .record_author(TransactionKind::GroupMessage, &id, &body.sender_address)
        .await?;
    state
        .ledger
        .add_to_mempool(TransactionKind::GroupMessage, &id)
        .await;
    let notified = notify_group_message(
        &state.direct_pool,
        &group_id,
        &id,
        &body.sender_address,
        &body.members,
    )
    .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "id": id, "group_id": group_id, "notified": notified })),
    ))
}

// =============================================================================
// SECRET ROOMS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SecretMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub display_name: String,
    pub encrypted_content: String,
}

/// Relays ciphertext to every session in a room. Nothing is persisted.
pub async fn relay_secret_message(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(body): Json<SecretMessage>,
) -> ApiResult<impl IntoResponse> {
    require("encrypted_content", &body.encrypted_content)?;
    let id = id_or_new(body.id);
    state
        .secret_pool
        .broadcast(Envelope::secret_chat_message(
            &room,
            &id,
            &body.display_name,
            &body.encrypted_content,
        ))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id, "room": room }))))
}

pub async fn delete_secret_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state
        .secret_pool
        .broadcast(Envelope::secret_chat_deleted(&room))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// PRESENCE AND METRICS
// =============================================================================

pub async fn online(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(json!({
        "direct": state.direct_pool.online().await?,
        "secret": state.secret_pool.online().await?,
    })))
}

/// Prometheus text exposition. Point-in-time gauges are refreshed here.
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    courier_telemetry::MEMPOOL_PENDING.set(state.ledger.pending_count() as f64);
    for pool in [&state.direct_pool, &state.secret_pool] {
        let connected = pool.online().await?.len();
        courier_telemetry::CLIENTS_CONNECTED
            .with_label_values(&[pool.name()])
            .set(connected as f64);
    }
    let body = courier_telemetry::encode_metrics()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
