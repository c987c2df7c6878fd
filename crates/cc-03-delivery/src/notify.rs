//! Notifications fired by the HTTP layer after it persists something.

use shared_types::{Block, DeliveryStatus, StoredMessage};
use tracing::debug;

use crate::domain::Envelope;
use crate::error::DeliveryError;
use crate::pool::PoolHandle;
use crate::ports::MessageStore;
use crate::sweep::advance_status;

/// Pushes `new_message` to the recipient if online.
///
/// On a successful write the message is marked `delivered` and the sender
/// gets a `status_update`. Returns whether the recipient was reached; an
/// offline recipient picks the message up in its next registration sweep.
pub async fn notify_new_message(
    pool: &PoolHandle,
    store: &dyn MessageStore,
    message: &StoredMessage,
) -> Result<bool, DeliveryError> {
    let envelope = Envelope::new_message(
        &message.id,
        &message.sender_address,
        &message.recipient_address,
    );
    if !pool.deliver(&message.recipient_address, envelope).await? {
        debug!(
            message_id = %message.id,
            recipient = %message.recipient_address,
            "[cc-03] Recipient offline, message stays pending"
        );
        return Ok(false);
    }
    advance_status(store, pool, message, DeliveryStatus::Delivered).await?;
    Ok(true)
}

/// Fans a channel post out to every member except its author.
pub async fn notify_channel_message(
    pool: &PoolHandle,
    channel_id: &str,
    message_id: &str,
    sender: &str,
    members: &[String],
) -> Result<usize, DeliveryError> {
    let mut queued = 0;
    for member in members.iter().filter(|m| m.as_str() != sender) {
        pool.broadcast(Envelope::new_channel_message(
            message_id, channel_id, sender, member,
        ))
        .await?;
        queued += 1;
    }
    Ok(queued)
}

/// Fans a group post out to every member except its author.
pub async fn notify_group_message(
    pool: &PoolHandle,
    group_id: &str,
    message_id: &str,
    sender: &str,
    members: &[String],
) -> Result<usize, DeliveryError> {
    let mut queued = 0;
    for member in members.iter().filter(|m| m.as_str() != sender) {
        pool.broadcast(Envelope::new_group_message(
            message_id, group_id, sender, member,
        ))
        .await?;
        queued += 1;
    }
    Ok(queued)
}

/// Broadcasts a `new_block` frame to every connected client.
pub async fn announce_block(pool: &PoolHandle, block: &Block) -> Result<(), DeliveryError> {
    pool.broadcast(Envelope::new_block(block)).await
}
