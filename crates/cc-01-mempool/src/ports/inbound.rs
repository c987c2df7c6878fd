//! # Inbound Port - MempoolApi
//!
//! | Method | Caller |
//! |--------|--------|
//! | `add` | Ledger `add_to_mempool` (on behalf of handlers) |
//! | `snapshot` | Sealing cycle |
//! | `remove_sealed` / `clear` | Sealing cycle, after persistence succeeds |

use shared_types::MempoolEntry;

use crate::domain::{Mempool, MempoolError};

/// Primary API of the pending reference pool.
pub trait MempoolApi: Send + Sync {
    /// Appends an entry; returns the entry evicted to make room, if any.
    fn add(&self, entry: MempoolEntry) -> Option<MempoolEntry>;

    /// Ordered copy of the buffered entries.
    ///
    /// # Errors
    /// - `Empty`: nothing is buffered
    fn snapshot(&self) -> Result<Vec<MempoolEntry>, MempoolError>;

    /// Drops every buffered entry.
    fn clear(&self);

    /// Drops a sealed batch, keeping anything added after its snapshot.
    fn remove_sealed(&self, sealed: &[MempoolEntry]) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MempoolApi for Mempool {
    fn add(&self, entry: MempoolEntry) -> Option<MempoolEntry> {
        Mempool::add(self, entry)
    }

    fn snapshot(&self) -> Result<Vec<MempoolEntry>, MempoolError> {
        Mempool::snapshot(self)
    }

    fn clear(&self) {
        Mempool::clear(self)
    }

    fn remove_sealed(&self, sealed: &[MempoolEntry]) -> usize {
        Mempool::remove_sealed(self, sealed)
    }

    fn len(&self) -> usize {
        Mempool::len(self)
    }
}
