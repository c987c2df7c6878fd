//! Bus subscriber that feeds metrics and announces sealed blocks.

use cc_03_delivery::{announce_block, PoolHandle};
use courier_telemetry::{
    BACKFILL_OUTCOMES, BLOCKS_SEALED, CHAIN_HEIGHT, DELIVERY_FAILURES, LEDGER_ENTRIES,
    MEMPOOL_EVICTIONS, MEMPOOL_PENDING, SEAL_FAILURES, STATUS_ADVANCED,
};
use shared_bus::{BackfillOutcome, EventFilter, InMemoryEventBus, NodeEvent, Subscription};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Applies one event to the Prometheus registry.
pub fn record(event: &NodeEvent) {
    match event {
        NodeEvent::MempoolEvicted { .. } => MEMPOOL_EVICTIONS.inc(),
        NodeEvent::GenesisMinted { block } => {
            BLOCKS_SEALED.inc();
            CHAIN_HEIGHT.set(block.height as f64);
        }
        NodeEvent::BlockSealed {
            block,
            mempool_remaining,
            ..
        } => {
            BLOCKS_SEALED.inc();
            CHAIN_HEIGHT.set(block.height as f64);
            MEMPOOL_PENDING.set(*mempool_remaining as f64);
        }
        NodeEvent::EntrySealed { kind, backfill, .. } => {
            LEDGER_ENTRIES
                .with_label_values(&[kind.as_str(), "sealed"])
                .inc();
            let outcome = match backfill {
                BackfillOutcome::Applied => "applied",
                BackfillOutcome::Unsupported => "unsupported",
                BackfillOutcome::Failed(_) => "failed",
            };
            BACKFILL_OUTCOMES.with_label_values(&[outcome]).inc();
        }
        NodeEvent::EntryDropped { kind, .. } => {
            LEDGER_ENTRIES
                .with_label_values(&[kind.as_str(), "dropped"])
                .inc();
        }
        NodeEvent::SealFailed { .. } => SEAL_FAILURES.inc(),
        NodeEvent::StatusAdvanced { status, .. } => {
            STATUS_ADVANCED.with_label_values(&[status.as_str()]).inc();
        }
        NodeEvent::DeliveryFailed { pool, .. } => {
            DELIVERY_FAILURES.with_label_values(&[pool.as_str()]).inc();
        }
        // Connection gauges are refreshed at scrape time.
        NodeEvent::ClientOnline { .. } | NodeEvent::ClientOffline { .. } => {}
    }
}

/// Subscribes to every topic and runs until `shutdown` flips.
///
/// Events already published when the signal arrives are still handled, so
/// the block sealed during shutdown is announced.
pub fn spawn_event_bridge(
    bus: &InMemoryEventBus,
    direct_pool: PoolHandle,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let subscription = bus.subscribe(EventFilter::all());
    tokio::spawn(run(subscription, direct_pool, shutdown))
}

async fn run(
    mut subscription: Subscription,
    direct_pool: PoolHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("[node] Event bridge started");
    loop {
        tokio::select! {
            biased;
            event = subscription.recv() => {
                let Some(event) = event else { break };
                handle(&event, &direct_pool).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    for event in subscription.drain() {
                        handle(&event, &direct_pool).await;
                    }
                    break;
                }
            }
        }
    }
    info!("[node] Event bridge stopped");
}

async fn handle(event: &NodeEvent, direct_pool: &PoolHandle) {
    record(event);
    if let NodeEvent::BlockSealed { block, .. } = event {
        if let Err(e) = announce_block(direct_pool, block).await {
            warn!(block_id = %block.id, error = %e, "[node] new_block fan-out failed");
        } else {
            debug!(block_id = %block.id, height = block.height, "[node] new_block announced");
        }
    }
}
