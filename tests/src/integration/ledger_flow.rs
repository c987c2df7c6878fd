//! # Ledger Flow
//!
//! Mempool → sealing cycle → persistence → back-fill → proofs, running the
//! real ledger engine against the node's in-memory store.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cc_02_ledger::domain::{hash_block, merkle_root, verify_merkle_proof};
    use cc_02_ledger::{LedgerApi, LedgerError, LedgerStore};
    use cc_03_delivery::MessageStore;
    use node_runtime::adapters::storage::{InMemoryStore, MessageRepository};
    use shared_bus::{BackfillOutcome, EventFilter, EventTopic, NodeEvent};
    use shared_types::{StoredMessage, TransactionKind};
    use tokio::sync::watch;

    use crate::support::{ledger_harness, FlakyStore, T0};

    const MSG: TransactionKind = TransactionKind::DirectMessage;

    // =========================================================================
    // MEMPOOL
    // =========================================================================

    #[tokio::test]
    async fn test_capacity_three_evicts_oldest() {
        let h = ledger_harness(Arc::new(InMemoryStore::new()), 3, 10);
        let mut events = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Mempool]));

        for id in ["A", "B", "C", "D"] {
            h.ledger.add_to_mempool(MSG, id).await;
        }

        let ids: Vec<_> = h
            .mempool
            .snapshot()
            .unwrap()
            .into_iter()
            .map(|e| e.entity_id)
            .collect();
        assert_eq!(ids, vec!["B", "C", "D"]);

        let evicted: Vec<_> = events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                NodeEvent::MempoolEvicted { entity_id, .. } => Some(entity_id),
                _ => None,
            })
            .collect();
        assert_eq!(evicted, vec!["A"]);
    }

    // =========================================================================
    // GENESIS
    // =========================================================================

    #[tokio::test]
    async fn test_genesis_minted_on_empty_store() {
        let store = Arc::new(InMemoryStore::new());
        let h = ledger_harness(store.clone(), 10, 10);
        let mut events = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));

        let genesis = h.ledger.establish_head().await.unwrap();
        assert_eq!(genesis.height, 0);
        assert!(genesis.previous_id.is_none());
        assert_eq!(genesis.merkle_root, "genesis");
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.timestamp, T0);
        assert_eq!(genesis.id, hash_block(None, T0, "genesis", 0));
        assert_eq!(store.load_latest_block().await.unwrap(), genesis);
        assert!(matches!(
            events.drain().as_slice(),
            [NodeEvent::GenesisMinted { .. }]
        ));

        assert!(matches!(
            h.ledger.establish_head().await,
            Err(LedgerError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn test_restart_resumes_persisted_head() {
        let store = Arc::new(InMemoryStore::new());
        let first = ledger_harness(store.clone(), 10, 10);
        first.ledger.establish_head().await.unwrap();
        first.ledger.add_to_mempool(MSG, "m1").await;
        let sealed = first.ledger.seal_once().await.unwrap().block;

        let second = ledger_harness(store, 10, 10);
        let mut events = second.bus.subscribe(EventFilter::all());
        let head = second.ledger.establish_head().await.unwrap();

        assert_eq!(head, sealed);
        assert!(events.drain().is_empty());
        assert_eq!(second.ledger.verify_chain().await.unwrap(), 2);
    }

    // =========================================================================
    // SEALING
    // =========================================================================

    #[tokio::test]
    async fn test_seal_links_block_and_backfills() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_message(StoredMessage::new("m1", "bob", "alice", T0))
            .await
            .unwrap();
        let h = ledger_harness(store.clone(), 10, 10);
        let genesis = h.ledger.establish_head().await.unwrap();

        h.ledger.add_to_mempool(MSG, "m1").await;
        h.clock.advance(5);
        h.ledger
            .add_to_mempool(TransactionKind::ChannelCreate, "c1")
            .await;
        let batch = h.mempool.snapshot().unwrap();
        h.clock.advance(1_000);

        let report = h.ledger.seal_once().await.unwrap();
        let block = &report.block;

        assert_eq!(block.height, 1);
        assert_eq!(block.previous_id.as_deref(), Some(genesis.id.as_str()));
        assert!(block.id.ends_with("00"));
        assert_eq!(block.merkle_root, merkle_root(&batch));
        assert_eq!(
            block.id,
            hash_block(
                block.previous_id.as_deref(),
                block.timestamp,
                &block.merkle_root,
                block.nonce
            )
        );
        assert!(h.mempool.is_empty());

        let outcomes: Vec<_> = report.sealed.iter().map(|e| e.backfill.clone()).collect();
        assert_eq!(
            outcomes,
            vec![BackfillOutcome::Applied, BackfillOutcome::Unsupported]
        );
        assert_eq!(
            store.load_message("m1").await.unwrap().block_id.as_deref(),
            Some(block.id.as_str())
        );

        let view = h.ledger.block_by_height(1).await.unwrap();
        let entities: Vec<_> = view.transactions.iter().map(|t| t.entity_id.as_str()).collect();
        assert_eq!(entities, vec!["m1", "c1"]);
        assert_eq!(view.transactions[0].timestamp, batch[0].enqueued_at);

        for entity in ["m1", "c1"] {
            let proof = h.ledger.merkle_proof_for(entity).await.unwrap();
            assert!(proof.verified);
            assert!(verify_merkle_proof(&proof.proof, &block.merkle_root));
        }
        assert_eq!(h.ledger.verify_chain().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_tick_is_skipped() {
        let h = ledger_harness(Arc::new(InMemoryStore::new()), 10, 10);
        let genesis = h.ledger.establish_head().await.unwrap();

        assert!(matches!(
            h.ledger.seal_once().await,
            Err(LedgerError::EmptyMempool)
        ));
        assert_eq!(h.ledger.head().unwrap(), genesis);
    }

    #[tokio::test]
    async fn test_seal_before_initialize_fails() {
        let h = ledger_harness(Arc::new(InMemoryStore::new()), 10, 10);
        h.ledger.add_to_mempool(MSG, "m1").await;
        assert!(matches!(
            h.ledger.seal_once().await,
            Err(LedgerError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_failed_entry_does_not_abort_seal() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(InMemoryStore::new())));
        flaky.fail_transaction_for("bad");
        let h = ledger_harness(flaky.clone(), 10, 10);
        let mut events = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));
        h.ledger.establish_head().await.unwrap();

        for id in ["good-1", "bad", "good-2"] {
            h.ledger.add_to_mempool(TransactionKind::GroupJoin, id).await;
        }
        let report = h.ledger.seal_once().await.unwrap();

        assert_eq!(report.sealed.len(), 2);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].entity_id, "bad");
        assert!(h.mempool.is_empty());

        let stored = flaky.transactions_for_block(&report.block.id).await.unwrap();
        assert_eq!(stored.len(), 2);

        let events = events.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            NodeEvent::EntryDropped { entity_id, .. } if entity_id == "bad"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            NodeEvent::BlockSealed { sealed: 2, dropped: 1, .. }
        )));

        // The root covers the whole batch, so the surviving proofs no longer
        // reproduce it.
        let proof = h.ledger.merkle_proof_for("good-1").await.unwrap();
        assert!(!proof.verified);
    }

    #[tokio::test]
    async fn test_entity_queued_twice_under_frozen_clock_seals_both() {
        let store = Arc::new(InMemoryStore::new());
        let h = ledger_harness(store.clone(), 10, 10);
        h.ledger.establish_head().await.unwrap();

        h.ledger.add_to_mempool(TransactionKind::ChannelJoin, "general:alice").await;
        h.ledger.add_to_mempool(TransactionKind::ChannelJoin, "general:alice").await;
        let report = h.ledger.seal_once().await.unwrap();

        assert_eq!(report.sealed.len(), 2);
        assert!(report.dropped.is_empty());
        let stored = store.transactions_for_block(&report.block.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].hash, stored[1].hash);
        assert_eq!(store.stats().await.unwrap().transaction_count, 2);
    }

    #[tokio::test]
    async fn test_block_failure_keeps_mempool() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(InMemoryStore::new())));
        let h = ledger_harness(flaky.clone(), 10, 10);
        let mut events = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));
        h.ledger.establish_head().await.unwrap();
        h.ledger.add_to_mempool(MSG, "m1").await;

        flaky.fail_blocks(true);
        assert!(matches!(
            h.ledger.seal_once().await,
            Err(LedgerError::BlockPersistence { height: 1, .. })
        ));
        assert_eq!(h.ledger.pending_count(), 1);
        assert_eq!(h.ledger.head().unwrap().height, 0);
        assert!(events
            .drain()
            .iter()
            .any(|e| matches!(e, NodeEvent::SealFailed { height: 1, .. })));

        flaky.fail_blocks(false);
        let report = h.ledger.seal_once().await.unwrap();
        assert_eq!(report.block.height, 1);
        assert_eq!(h.ledger.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_entries_added_during_seal_wait_for_next_block() {
        let h = ledger_harness(Arc::new(InMemoryStore::new()), 10, 10);
        h.ledger.establish_head().await.unwrap();
        h.ledger.add_to_mempool(MSG, "m1").await;
        let first = h.ledger.seal_once().await.unwrap();

        h.ledger.add_to_mempool(MSG, "m2").await;
        h.clock.advance(1);
        let second = h.ledger.seal_once().await.unwrap();

        assert_eq!(second.block.previous_id.as_deref(), Some(first.block.id.as_str()));
        assert_eq!(second.sealed.len(), 1);
        assert_eq!(second.sealed[0].entity_id, "m2");
        assert_ne!(first.block.merkle_root, second.block.merkle_root);
    }

    // =========================================================================
    // PERIODIC CYCLE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_periodic_cycle_seals_and_stops() {
        let h = ledger_harness(Arc::new(InMemoryStore::new()), 10, 1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = h.ledger.initialize(shutdown_rx).await.unwrap();

        h.ledger.add_to_mempool(MSG, "m1").await;
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(h.ledger.head().unwrap().height, 1);

        // Nothing pending: the next tick is skipped.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.ledger.head().unwrap().height, 1);

        h.ledger.add_to_mempool(MSG, "m2").await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(h.ledger.head().unwrap().height, 2);
    }
}
