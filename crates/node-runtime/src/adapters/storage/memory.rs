//! In-memory store, the default backend and the fake used by tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use cc_02_ledger::LedgerStore;
use cc_03_delivery::MessageStore;
use parking_lot::RwLock;
use shared_types::{
    Block, ChainStats, DeliveryStatus, StorageError, StoredMessage, Transaction, TransactionKind,
};

use super::{check_block_ref, entity_key, involves, newest_first, MessageRepository};

#[derive(Default)]
struct Tables {
    blocks: HashMap<String, Block>,
    heights: BTreeMap<u64, String>,
    transactions: HashMap<String, Transaction>,
    /// Transaction hashes per block, in save order.
    block_txs: HashMap<String, Vec<String>>,
    /// entity id → sealing transaction hash
    entity_txs: HashMap<String, String>,
    /// `kind:id` → block id
    block_refs: HashMap<String, String>,
    messages: HashMap<String, StoredMessage>,
    /// `kind:id` → author address
    authors: HashMap<String, String>,
    stats: ChainStats,
}

/// Thread-safe in-memory implementation of every storage port.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block id recorded for an entity, if sealed.
    pub fn block_ref(&self, kind: TransactionKind, entity_id: &str) -> Option<String> {
        self.tables
            .read()
            .block_refs
            .get(&entity_key(kind, entity_id))
            .cloned()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn load_latest_block(&self) -> Result<Block, StorageError> {
        let tables = self.tables.read();
        tables
            .heights
            .values()
            .next_back()
            .and_then(|id| tables.blocks.get(id))
            .cloned()
            .ok_or_else(|| StorageError::NotFound("latest block".into()))
    }

    async fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        if tables.blocks.contains_key(&block.id) {
            return Err(StorageError::Conflict(format!("block {} exists", block.id)));
        }
        if tables.heights.contains_key(&block.height) {
            return Err(StorageError::Conflict(format!(
                "height {} already taken",
                block.height
            )));
        }
        tables.heights.insert(block.height, block.id.clone());
        tables.blocks.insert(block.id.clone(), block.clone());
        tables.stats.block_count += 1;
        tables.stats.latest_block_time = tables.stats.latest_block_time.max(Some(block.timestamp));
        Ok(())
    }

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        if tables.transactions.contains_key(&tx.hash) {
            return Err(StorageError::Conflict(format!("transaction {} exists", tx.hash)));
        }
        tables
            .block_txs
            .entry(tx.block_id.clone())
            .or_default()
            .push(tx.hash.clone());
        tables.entity_txs.insert(tx.entity_id.clone(), tx.hash.clone());
        tables.transactions.insert(tx.hash.clone(), tx.clone());
        tables.stats.transaction_count += 1;
        *tables
            .stats
            .per_kind
            .entry(tx.kind.as_str().to_string())
            .or_default() += 1;
        Ok(())
    }

    async fn set_entity_block_ref(
        &self,
        kind: TransactionKind,
        entity_id: &str,
        block_id: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let key = entity_key(kind, entity_id);
        if !check_block_ref(tables.block_refs.get(&key).map(String::as_str), entity_id, block_id)? {
            return Ok(());
        }
        tables.block_refs.insert(key, block_id.to_string());
        if kind == TransactionKind::DirectMessage {
            if let Some(message) = tables.messages.get_mut(entity_id) {
                message.block_id = Some(block_id.to_string());
            }
        }
        Ok(())
    }

    async fn block_by_id(&self, id: &str) -> Result<Block, StorageError> {
        self.tables
            .read()
            .blocks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("block {id}")))
    }

    async fn block_by_height(&self, height: u64) -> Result<Block, StorageError> {
        let tables = self.tables.read();
        tables
            .heights
            .get(&height)
            .and_then(|id| tables.blocks.get(id))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("block at height {height}")))
    }

    async fn transactions_for_block(&self, block_id: &str) -> Result<Vec<Transaction>, StorageError> {
        let tables = self.tables.read();
        Ok(tables
            .block_txs
            .get(block_id)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|hash| tables.transactions.get(hash))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, StorageError> {
        self.tables
            .read()
            .transactions
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("transaction {hash}")))
    }

    async fn transaction_for_entity(&self, entity_id: &str) -> Result<Transaction, StorageError> {
        let tables = self.tables.read();
        tables
            .entity_txs
            .get(entity_id)
            .and_then(|hash| tables.transactions.get(hash))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("entity {entity_id}")))
    }

    async fn transactions_for_address(
        &self,
        address: &str,
    ) -> Result<Vec<Transaction>, StorageError> {
        let tables = self.tables.read();
        let mut found: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|tx| {
                involves(
                    tx,
                    address,
                    tables.messages.get(&tx.entity_id),
                    tables
                        .authors
                        .get(&entity_key(tx.kind, &tx.entity_id))
                        .map(String::as_str),
                )
            })
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn stats(&self) -> Result<ChainStats, StorageError> {
        Ok(self.tables.read().stats.clone())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn fetch_pending_for_recipient(
        &self,
        recipient: &str,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let mut pending: Vec<StoredMessage> = self
            .tables
            .read()
            .messages
            .values()
            .filter(|m| m.recipient_address == recipient && m.status == DeliveryStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn set_message_status(
        &self,
        message_id: &str,
        status: DeliveryStatus,
    ) -> Result<DeliveryStatus, StorageError> {
        let mut tables = self.tables.write();
        let message = tables
            .messages
            .get_mut(message_id)
            .ok_or_else(|| StorageError::NotFound(format!("message {message_id}")))?;
        message.status = message.status.advance(status);
        Ok(message.status)
    }

    async fn load_message(&self, message_id: &str) -> Result<StoredMessage, StorageError> {
        self.tables
            .read()
            .messages
            .get(message_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("message {message_id}")))
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn insert_message(&self, message: StoredMessage) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        if tables.messages.contains_key(&message.id) {
            return Err(StorageError::Conflict(format!("message {} exists", message.id)));
        }
        tables.messages.insert(message.id.clone(), message);
        Ok(())
    }

    async fn record_author(
        &self,
        kind: TransactionKind,
        entity_id: &str,
        author: &str,
    ) -> Result<(), StorageError> {
        self.tables
            .write()
            .authors
            .entry(entity_key(kind, entity_id))
            .or_insert_with(|| author.to_string());
        Ok(())
    }
}
