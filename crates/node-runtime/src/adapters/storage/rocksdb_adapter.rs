//! # RocksDB Storage Adapter
//!
//! Durable implementation of [`LedgerStore`], [`MessageStore`] and
//! [`MessageRepository`].
//!
//! ## Column Families
//!
//! | CF            | Key                      | Value                     |
//! |---------------|--------------------------|---------------------------|
//! | `blocks`      | block id                 | bincode `BlockRecord`     |
//! | `heights`     | height (big-endian u64)  | block id                  |
//! | `transactions`| tx hash                  | bincode `Transaction`     |
//! | `block_txs`   | block id                 | bincode `Vec<tx hash>`    |
//! | `entity_tx`   | entity id                | tx hash                   |
//! | `entity_refs` | `kind:entity id`         | block id                  |
//! | `messages`    | message id               | bincode `StoredMessage`   |
//! | `authors`     | `kind:entity id`         | author address            |
//! | `metadata`    | `stats`                  | bincode `ChainStats`      |
//!
//! Read-modify-write sequences hold `write_lock`; single puts go straight
//! to the database.

use std::path::Path;

use async_trait::async_trait;
use cc_02_ledger::LedgerStore;
use cc_03_delivery::MessageStore;
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared_types::{
    Block, ChainStats, DeliveryStatus, StorageError, StoredMessage, Transaction, TransactionKind,
};
use tracing::info;

use super::{check_block_ref, entity_key, involves, newest_first, MessageRepository};

pub const CF_BLOCKS: &str = "blocks";
pub const CF_HEIGHTS: &str = "heights";
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_BLOCK_TXS: &str = "block_txs";
pub const CF_ENTITY_TX: &str = "entity_tx";
pub const CF_ENTITY_REFS: &str = "entity_refs";
pub const CF_MESSAGES: &str = "messages";
pub const CF_AUTHORS: &str = "authors";
pub const CF_METADATA: &str = "metadata";

/// All column families used by the node
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_BLOCKS,
    CF_HEIGHTS,
    CF_TRANSACTIONS,
    CF_BLOCK_TXS,
    CF_ENTITY_TX,
    CF_ENTITY_REFS,
    CF_MESSAGES,
    CF_AUTHORS,
    CF_METADATA,
];

const STATS_KEY: &[u8] = b"stats";

/// RocksDB tuning.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 32MB)
    pub write_buffer_size: usize,
    pub max_write_buffer_number: i32,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/rocksdb".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 32 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Defaults rooted at `data_dir/rocksdb`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join("rocksdb").to_string_lossy().to_string(),
            ..Default::default()
        }
    }

    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

/// Bincode mirror of [`Block`]; bincode cannot decode skipped fields.
#[derive(Serialize, Deserialize)]
struct BlockRecord {
    id: String,
    previous_id: Option<String>,
    timestamp: u64,
    merkle_root: String,
    nonce: u64,
    height: u64,
}

impl From<&Block> for BlockRecord {
    fn from(block: &Block) -> Self {
        Self {
            id: block.id.clone(),
            previous_id: block.previous_id.clone(),
            timestamp: block.timestamp,
            merkle_root: block.merkle_root.clone(),
            nonce: block.nonce,
            height: block.height,
        }
    }
}

impl From<BlockRecord> for Block {
    fn from(record: BlockRecord) -> Self {
        Self {
            id: record.id,
            previous_id: record.previous_id,
            timestamp: record.timestamp,
            merkle_root: record.merkle_root,
            nonce: record.nonce,
            height: record.height,
        }
    }
}

/// RocksDB-backed implementation of every storage port.
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
    write_lock: Mutex<()>,
}

impl RocksDbStore {
    /// Open or create a RocksDB database
    pub fn open(config: RocksDbConfig) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to open RocksDB: {e}")))?;

        info!(path = %config.path, "[node] RocksDB store opened");
        Ok(Self {
            db,
            config,
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::DatabaseError(format!("missing column family {name}")))
    }

    fn get_raw(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get_cf(self.cf(cf)?, key)
            .map_err(|e| StorageError::DatabaseError(format!("RocksDB get failed: {e}")))
    }

    fn get<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>, StorageError> {
        self.get_raw(cf, key)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_string(&self, cf: &str, key: &[u8]) -> Result<Option<String>, StorageError> {
        self.get_raw(cf, key)?
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|e| StorageError::DataCorruption(format!("non-utf8 value: {e}")))
            })
            .transpose()
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| StorageError::DatabaseError(format!("RocksDB batch write failed: {e}")))
    }

    fn load_stats(&self) -> Result<ChainStats, StorageError> {
        Ok(self.get(CF_METADATA, STATS_KEY)?.unwrap_or_default())
    }

    fn block_at(&self, id: &str) -> Result<Option<Block>, StorageError> {
        Ok(self
            .get::<BlockRecord>(CF_BLOCKS, id.as_bytes())?
            .map(Block::from))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(value).map_err(|e| StorageError::DatabaseError(format!("encode: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(bytes).map_err(|e| StorageError::DataCorruption(format!("decode: {e}")))
}

#[async_trait]
impl LedgerStore for RocksDbStore {
    async fn load_latest_block(&self) -> Result<Block, StorageError> {
        let mut iter = self.db.iterator_cf(self.cf(CF_HEIGHTS)?, IteratorMode::End);
        let id = match iter.next() {
            Some(Ok((_, id))) => String::from_utf8(id.to_vec())
                .map_err(|e| StorageError::DataCorruption(format!("non-utf8 block id: {e}")))?,
            Some(Err(e)) => {
                return Err(StorageError::DatabaseError(format!("RocksDB scan failed: {e}")))
            }
            None => return Err(StorageError::NotFound("latest block".into())),
        };
        self.block_at(&id)?
            .ok_or_else(|| StorageError::DataCorruption(format!("height index points at missing block {id}")))
    }

    async fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        if self.get_raw(CF_BLOCKS, block.id.as_bytes())?.is_some() {
            return Err(StorageError::Conflict(format!("block {} exists", block.id)));
        }
        let height_key = block.height.to_be_bytes();
        if self.get_raw(CF_HEIGHTS, &height_key)?.is_some() {
            return Err(StorageError::Conflict(format!(
                "height {} already taken",
                block.height
            )));
        }

        let mut stats = self.load_stats()?;
        stats.block_count += 1;
        stats.latest_block_time = stats.latest_block_time.max(Some(block.timestamp));

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_BLOCKS)?, block.id.as_bytes(), encode(&BlockRecord::from(block))?);
        batch.put_cf(self.cf(CF_HEIGHTS)?, height_key, block.id.as_bytes());
        batch.put_cf(self.cf(CF_METADATA)?, STATS_KEY, encode(&stats)?);
        self.write(batch)
    }

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        if self.get_raw(CF_TRANSACTIONS, tx.hash.as_bytes())?.is_some() {
            return Err(StorageError::Conflict(format!("transaction {} exists", tx.hash)));
        }

        let mut hashes: Vec<String> = self
            .get(CF_BLOCK_TXS, tx.block_id.as_bytes())?
            .unwrap_or_default();
        hashes.push(tx.hash.clone());

        let mut stats = self.load_stats()?;
        stats.transaction_count += 1;
        *stats.per_kind.entry(tx.kind.as_str().to_string()).or_default() += 1;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_TRANSACTIONS)?, tx.hash.as_bytes(), encode(tx)?);
        batch.put_cf(self.cf(CF_BLOCK_TXS)?, tx.block_id.as_bytes(), encode(&hashes)?);
        batch.put_cf(self.cf(CF_ENTITY_TX)?, tx.entity_id.as_bytes(), tx.hash.as_bytes());
        batch.put_cf(self.cf(CF_METADATA)?, STATS_KEY, encode(&stats)?);
        self.write(batch)
    }

    async fn set_entity_block_ref(
        &self,
        kind: TransactionKind,
        entity_id: &str,
        block_id: &str,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let key = entity_key(kind, entity_id);
        let existing = self.get_string(CF_ENTITY_REFS, key.as_bytes())?;
        if !check_block_ref(existing.as_deref(), entity_id, block_id)? {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ENTITY_REFS)?, key.as_bytes(), block_id.as_bytes());
        if kind == TransactionKind::DirectMessage {
            if let Some(mut message) =
                self.get::<StoredMessage>(CF_MESSAGES, entity_id.as_bytes())?
            {
                message.block_id = Some(block_id.to_string());
                batch.put_cf(self.cf(CF_MESSAGES)?, entity_id.as_bytes(), encode(&message)?);
            }
        }
        self.write(batch)
    }

    async fn block_by_id(&self, id: &str) -> Result<Block, StorageError> {
        self.block_at(id)?
            .ok_or_else(|| StorageError::NotFound(format!("block {id}")))
    }

    async fn block_by_height(&self, height: u64) -> Result<Block, StorageError> {
        let id = self
            .get_string(CF_HEIGHTS, &height.to_be_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("block at height {height}")))?;
        self.block_by_id(&id).await
    }

    async fn transactions_for_block(&self, block_id: &str) -> Result<Vec<Transaction>, StorageError> {
        let hashes: Vec<String> = self
            .get(CF_BLOCK_TXS, block_id.as_bytes())?
            .unwrap_or_default();
        let mut transactions = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(tx) = self.get(CF_TRANSACTIONS, hash.as_bytes())? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, StorageError> {
        self.get(CF_TRANSACTIONS, hash.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("transaction {hash}")))
    }

    async fn transaction_for_entity(&self, entity_id: &str) -> Result<Transaction, StorageError> {
        let hash = self
            .get_string(CF_ENTITY_TX, entity_id.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("entity {entity_id}")))?;
        self.transaction_by_hash(&hash).await
    }

    /// Full scan of `transactions`; each hit costs one or two point reads.
    async fn transactions_for_address(
        &self,
        address: &str,
    ) -> Result<Vec<Transaction>, StorageError> {
        let mut found = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_TRANSACTIONS)?, IteratorMode::Start) {
            let (_, bytes) =
                item.map_err(|e| StorageError::DatabaseError(format!("RocksDB scan failed: {e}")))?;
            let tx: Transaction = decode(&bytes)?;
            let message = match tx.kind {
                TransactionKind::DirectMessage => {
                    self.get::<StoredMessage>(CF_MESSAGES, tx.entity_id.as_bytes())?
                }
                _ => None,
            };
            let author =
                self.get_string(CF_AUTHORS, entity_key(tx.kind, &tx.entity_id).as_bytes())?;
            if involves(&tx, address, message.as_ref(), author.as_deref()) {
                found.push(tx);
            }
        }
        newest_first(&mut found);
        Ok(found)
    }

    async fn stats(&self) -> Result<ChainStats, StorageError> {
        self.load_stats()
    }
}

#[async_trait]
impl MessageStore for RocksDbStore {
    async fn fetch_pending_for_recipient(
        &self,
        recipient: &str,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let mut pending = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_MESSAGES)?, IteratorMode::Start) {
            let (_, bytes) =
                item.map_err(|e| StorageError::DatabaseError(format!("RocksDB scan failed: {e}")))?;
            let message: StoredMessage = decode(&bytes)?;
            if message.recipient_address == recipient && message.status == DeliveryStatus::Pending {
                pending.push(message);
            }
        }
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn set_message_status(
        &self,
        message_id: &str,
        status: DeliveryStatus,
    ) -> Result<DeliveryStatus, StorageError> {
        let _guard = self.write_lock.lock();
        let mut message: StoredMessage = self
            .get(CF_MESSAGES, message_id.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("message {message_id}")))?;
        let next = message.status.advance(status);
        if next != message.status {
            message.status = next;
            let mut batch = WriteBatch::default();
            batch.put_cf(self.cf(CF_MESSAGES)?, message_id.as_bytes(), encode(&message)?);
            self.write(batch)?;
        }
        Ok(next)
    }

    async fn load_message(&self, message_id: &str) -> Result<StoredMessage, StorageError> {
        self.get(CF_MESSAGES, message_id.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("message {message_id}")))
    }
}

#[async_trait]
impl MessageRepository for RocksDbStore {
    async fn insert_message(&self, message: StoredMessage) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        if self.get_raw(CF_MESSAGES, message.id.as_bytes())?.is_some() {
            return Err(StorageError::Conflict(format!("message {} exists", message.id)));
        }
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_MESSAGES)?, message.id.as_bytes(), encode(&message)?);
        self.write(batch)
    }

    async fn record_author(
        &self,
        kind: TransactionKind,
        entity_id: &str,
        author: &str,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let key = entity_key(kind, entity_id);
        if self.get_raw(CF_AUTHORS, key.as_bytes())?.is_some() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_AUTHORS)?, key.as_bytes(), author.as_bytes());
        self.write(batch)
    }
}
