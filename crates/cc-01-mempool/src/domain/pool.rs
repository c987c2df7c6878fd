//! The bounded FIFO pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use shared_types::MempoolEntry;
use tracing::debug;

use super::config::MempoolConfig;
use super::errors::MempoolError;

/// Capacity-bounded FIFO buffer of pending references.
///
/// All methods take `&self`; the internal lock is held only for the duration
/// of the call, so producers are never blocked by a slow seal.
#[derive(Debug)]
pub struct Mempool {
    entries: RwLock<VecDeque<MempoolEntry>>,
    capacity: usize,
    evicted_total: AtomicU64,
}

impl Mempool {
    /// Builds a pool from a validated config.
    pub fn new(config: MempoolConfig) -> Result<Self, MempoolError> {
        config.validate()?;
        Ok(Self::with_capacity(config.capacity))
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            evicted_total: AtomicU64::new(0),
        }
    }

    /// Appends an entry, evicting the oldest one first when full.
    ///
    /// Never fails. The evicted entry, if any, is returned so the caller can
    /// report it; it will not be sealed.
    pub fn add(&self, entry: MempoolEntry) -> Option<MempoolEntry> {
        let mut entries = self.entries.write();
        let evicted = if entries.len() >= self.capacity {
            entries.pop_front()
        } else {
            None
        };
        entries.push_back(entry);
        drop(entries);

        if let Some(old) = &evicted {
            self.evicted_total.fetch_add(1, Ordering::Relaxed);
            debug!(
                kind = %old.kind,
                entity_id = %old.entity_id,
                "[cc-01] Mempool full, oldest entry evicted"
            );
        }
        evicted
    }

    /// Copy of the buffered entries in insertion order.
    ///
    /// # Errors
    /// `MempoolError::Empty` when nothing is buffered.
    pub fn snapshot(&self) -> Result<Vec<MempoolEntry>, MempoolError> {
        let entries = self.entries.read();
        if entries.is_empty() {
            return Err(MempoolError::Empty);
        }
        Ok(entries.iter().cloned().collect())
    }

    /// Drops every buffered entry. Idempotent.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes a previously snapshotted batch after it has been sealed.
    ///
    /// Since a snapshot was taken, the pool can only have lost entries at the
    /// front (eviction) and gained entries at the back (new adds). Entries
    /// appended meanwhile are kept. Returns how many entries were removed.
    pub fn remove_sealed(&self, sealed: &[MempoolEntry]) -> usize {
        let mut entries = self.entries.write();
        let mut removed = 0;
        for entry in sealed {
            if entries.front() == Some(entry) {
                entries.pop_front();
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries evicted since creation.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total.load(Ordering::Relaxed)
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::with_capacity(super::config::DEFAULT_CAPACITY)
    }
}
