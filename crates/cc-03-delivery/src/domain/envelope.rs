//! # Wire Envelope
//!
//! Every frame exchanged over a pool connection is one JSON object:
//!
//! ```text
//! { "type": "<kind>", "payload": { ... }, "from"?: "<identity>", "to"?: "<identity|room>" }
//! ```
//!
//! A missing `to` means broadcast. The recognized `type` values are listed
//! in [`kinds`]; anything else coming from a client parses fine and is
//! answered with a warning log, never a disconnect.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use shared_types::{Block, DeliveryStatus};

/// Envelope `type` strings.
pub mod kinds {
    // Server to client
    pub const PRESENCE: &str = "presence";
    pub const WELCOME: &str = "welcome";
    pub const PONG: &str = "pong";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const NEW_CHANNEL_MESSAGE: &str = "new_channel_message";
    pub const NEW_GROUP_MESSAGE: &str = "new_group_message";
    pub const NEW_BLOCK: &str = "new_block";
    pub const SECRET_CHAT_MESSAGE: &str = "secret_chat_message";
    pub const SECRET_CHAT_DELETED: &str = "secret_chat_deleted";

    // Both directions
    pub const TYPING: &str = "typing";

    // Client to server
    pub const PING: &str = "ping";
    pub const READ: &str = "read";
    pub const RECEIVED: &str = "received";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn rfc3339_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload: object(payload),
            from: None,
            to: None,
        }
    }

    pub fn from_identity(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to_target(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Parses a client frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// String field of the payload, if present.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    // =========================================================================
    // SERVER FRAMES
    // =========================================================================

    pub fn presence(identity: &str, online: bool) -> Self {
        let status = if online { "online" } else { "offline" };
        Self::new(
            kinds::PRESENCE,
            json!({ "address": identity, "status": status }),
        )
    }

    pub fn welcome(message: &str) -> Self {
        Self::new(kinds::WELCOME, json!({ "message": message }))
    }

    pub fn pong() -> Self {
        Self::new(kinds::PONG, json!({ "time": rfc3339_now() }))
    }

    /// Typing indicator relayed from `from` to `to`.
    pub fn typing(from: &str, to: &str) -> Self {
        Self::new(kinds::TYPING, json!({ "from": from }))
            .from_identity(from)
            .to_target(to)
    }

    /// Receipt sent to a message's original sender.
    pub fn status_update(
        message_id: &str,
        status: DeliveryStatus,
        recipient: &str,
        sender: &str,
    ) -> Self {
        Self::new(
            kinds::STATUS_UPDATE,
            json!({
                "message_id": message_id,
                "status": status.as_str(),
                "recipient": recipient,
                "timestamp": rfc3339_now(),
            }),
        )
        .to_target(sender)
    }

    pub fn new_message(message_id: &str, sender: &str, recipient: &str) -> Self {
        Self::new(
            kinds::NEW_MESSAGE,
            json!({ "id": message_id, "sender_address": sender }),
        )
        .from_identity(sender)
        .to_target(recipient)
    }

    pub fn new_channel_message(
        message_id: &str,
        channel_id: &str,
        sender: &str,
        member: &str,
    ) -> Self {
        Self::new(
            kinds::NEW_CHANNEL_MESSAGE,
            json!({ "id": message_id, "channel_id": channel_id, "sender_address": sender }),
        )
        .from_identity(sender)
        .to_target(member)
    }

    pub fn new_group_message(
        message_id: &str,
        group_id: &str,
        sender: &str,
        member: &str,
    ) -> Self {
        Self::new(
            kinds::NEW_GROUP_MESSAGE,
            json!({ "id": message_id, "group_id": group_id, "sender_address": sender }),
        )
        .from_identity(sender)
        .to_target(member)
    }

    /// Broadcast announcing a freshly sealed block.
    pub fn new_block(block: &Block) -> Self {
        Self::new(
            kinds::NEW_BLOCK,
            json!({
                "id": block.id,
                "height": block.height,
                "timestamp": block.timestamp,
                "merkle_root": block.merkle_root,
            }),
        )
    }

    /// Opaque ciphertext relayed to every session in a room.
    pub fn secret_chat_message(
        room: &str,
        message_id: &str,
        display_name: &str,
        encrypted_content: &str,
    ) -> Self {
        Self::new(
            kinds::SECRET_CHAT_MESSAGE,
            json!({
                "id": message_id,
                "channel_id": room,
                "display_name": display_name,
                "encrypted_content": encrypted_content,
                "timestamp": rfc3339_now(),
            }),
        )
        .to_target(room)
    }

    /// Tells a room it has been torn down.
    pub fn secret_chat_deleted(room: &str) -> Self {
        Self::new(kinds::SECRET_CHAT_DELETED, json!({ "channel_id": room })).to_target(room)
    }
}

/// A client frame, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Ping,
    Typing { to: String },
    Read { message_id: String },
    Received { message_id: String },
    /// A recognized type whose payload is missing a required field.
    Malformed { kind: String, missing: &'static str },
    Unknown(String),
}

impl ClientCommand {
    pub fn classify(envelope: &Envelope) -> Self {
        let required = |field: &'static str| {
            envelope
                .payload_str(field)
                .map(str::to_string)
                .ok_or(field)
        };
        let kind = envelope.kind.as_str();
        let parsed = match kind {
            kinds::PING => Ok(Self::Ping),
            kinds::TYPING => required("to").map(|to| Self::Typing { to }),
            kinds::READ => required("message_id").map(|message_id| Self::Read { message_id }),
            kinds::RECEIVED => {
                required("message_id").map(|message_id| Self::Received { message_id })
            }
            other => Ok(Self::Unknown(other.to_string())),
        };
        parsed.unwrap_or_else(|missing| Self::Malformed {
            kind: kind.to_string(),
            missing,
        })
    }
}
