//! Batcher statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Snapshot of a batcher's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatcherStats {
    /// Operations currently waiting.
    pub queue_size: usize,
    /// Whether a drain is in flight.
    pub draining: bool,
    /// Operations accepted into the queue.
    pub enqueued: u64,
    /// Operations refused at admission (full queue or closed batcher).
    pub rejected: u64,
    /// Operations resolved with a value.
    pub settled_ok: u64,
    /// Operations rejected by a failed flush.
    pub settled_err: u64,
    /// Executor invocations.
    pub flushes: u64,
    /// Wall-clock time of the last completed flush, ms since epoch.
    pub last_flush_at_ms: Option<u128>,
}

impl BatcherStats {
    /// Operations accepted but not yet settled.
    pub const fn in_flight(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.settled_ok)
            .saturating_sub(self.settled_err)
    }
}

/// Internal counters (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct BatcherCounters {
    pub enqueued: AtomicU64,
    pub rejected: AtomicU64,
    pub settled_ok: AtomicU64,
    pub settled_err: AtomicU64,
    pub flushes: AtomicU64,
}

impl BatcherCounters {
    /// Get a snapshot of the counters; queue-side fields are filled by the caller.
    pub fn snapshot(
        &self,
        queue_size: usize,
        draining: bool,
        last_flush_at_ms: Option<u128>,
    ) -> BatcherStats {
        BatcherStats {
            queue_size,
            draining,
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            settled_ok: self.settled_ok.load(Ordering::Relaxed),
            settled_err: self.settled_err.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            last_flush_at_ms,
        }
    }
}
