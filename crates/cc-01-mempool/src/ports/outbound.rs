//! Outbound (Driven) ports for the mempool and its callers.

use std::sync::atomic::{AtomicU64, Ordering};

use shared_types::UnixNanos;

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current time in nanoseconds since the Unix epoch.
    fn now(&self) -> UnixNanos;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> UnixNanos {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as UnixNanos
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    pub fn new(initial: UnixNanos) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, nanos: u64) {
        self.time.fetch_add(nanos, Ordering::SeqCst);
    }

    pub fn set(&self, time: UnixNanos) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> UnixNanos {
        self.time.load(Ordering::SeqCst)
    }
}
