//! Delivery sweep and status receipts.
//!
//! Both paths end the same way: persist a monotonic status write, then tell
//! the original sender with a targeted `status_update`.

use shared_bus::NodeEvent;
use shared_types::{DeliveryStatus, StoredMessage};
use tracing::{debug, warn};

use crate::domain::Envelope;
use crate::error::DeliveryError;
use crate::pool::PoolHandle;
use crate::ports::MessageStore;

/// Outcome of one registration sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Message ids advanced to `delivered`.
    pub delivered: Vec<String>,
    /// Message ids whose status write failed, with the error.
    pub failed: Vec<(String, String)>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }
}

/// Advances every pending message addressed to `recipient` to `delivered`
/// and notifies each sender that is online.
///
/// Best effort: failures are logged and reported, never propagated.
pub async fn delivery_sweep(
    recipient: &str,
    store: &dyn MessageStore,
    pool: &PoolHandle,
) -> SweepReport {
    let mut report = SweepReport::default();
    let pending = match store.fetch_pending_for_recipient(recipient).await {
        Ok(pending) => pending,
        Err(e) => {
            warn!(recipient = %recipient, error = %e, "[cc-03] Sweep could not load pending messages");
            return report;
        }
    };

    for message in pending {
        match advance_status(store, pool, &message, DeliveryStatus::Delivered).await {
            Ok(_) => report.delivered.push(message.id),
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    recipient = %recipient,
                    error = %e,
                    "[cc-03] Sweep failed to mark message delivered"
                );
                report.failed.push((message.id, e.to_string()));
            }
        }
    }
    report
}

/// Writes `max(current, status)` for `message` and sends the resulting
/// status to its sender.
pub async fn advance_status(
    store: &dyn MessageStore,
    pool: &PoolHandle,
    message: &StoredMessage,
    status: DeliveryStatus,
) -> Result<DeliveryStatus, DeliveryError> {
    let stored = store.set_message_status(&message.id, status).await?;
    debug!(
        message_id = %message.id,
        requested = %status,
        stored = %stored,
        "[cc-03] Message status written"
    );
    pool.publisher()
        .publish(NodeEvent::StatusAdvanced {
            message_id: message.id.clone(),
            status: stored,
        })
        .await;

    let update = Envelope::status_update(
        &message.id,
        stored,
        &message.recipient_address,
        &message.sender_address,
    );
    pool.broadcast(update).await?;
    Ok(stored)
}

/// Applies a `read`/`received` acknowledgement from `acknowledger`.
///
/// Only the message's recipient may acknowledge it; anything else is
/// ignored and `Ok(None)` is returned.
pub async fn acknowledge(
    store: &dyn MessageStore,
    pool: &PoolHandle,
    acknowledger: &str,
    message_id: &str,
    status: DeliveryStatus,
) -> Result<Option<DeliveryStatus>, DeliveryError> {
    let message = store.load_message(message_id).await?;
    if message.recipient_address != acknowledger {
        warn!(
            message_id = %message_id,
            acknowledger = %acknowledger,
            "[cc-03] Ignoring acknowledgement from non-recipient"
        );
        return Ok(None);
    }
    advance_status(store, pool, &message, status).await.map(Some)
}
