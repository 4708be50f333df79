//! In-memory queue of pending operations ordered by priority, FIFO within priority.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use tokio::time::Instant;

use crate::core::PendingOperation;

/// Heap entry ordering operations by priority (highest first) and sequence (lowest first).
struct QueuedOperation<T> {
    op: PendingOperation<T>,
}

impl<T> PartialEq for QueuedOperation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.op.sequence() == other.op.sequence()
    }
}

impl<T> Eq for QueuedOperation<T> {}

impl<T> PartialOrd for QueuedOperation<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueuedOperation<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority wins, then the lower (earlier) sequence.
        self.op
            .priority()
            .cmp(&other.op.priority())
            .then_with(|| other.op.sequence().cmp(&self.op.sequence()))
    }
}

/// Priority queue of pending operations.
///
/// Enqueue and dequeue are O(log n). A side index keyed by sequence number
/// tracks arrival times so the oldest pending operation is found without
/// scanning the heap.
pub struct OperationQueue<T> {
    heap: BinaryHeap<QueuedOperation<T>>,
    arrivals: BTreeMap<u64, Instant>,
}

impl<T> OperationQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            arrivals: BTreeMap::new(),
        }
    }

    /// Add an operation.
    pub fn push(&mut self, op: PendingOperation<T>) {
        self.arrivals.insert(op.sequence(), op.enqueued_at());
        self.heap.push(QueuedOperation { op });
    }

    /// Remove the most urgent operation.
    pub fn pop(&mut self) -> Option<PendingOperation<T>> {
        let op = self.heap.pop()?.op;
        self.arrivals.remove(&op.sequence());
        Some(op)
    }

    /// Remove up to `max` operations in drain order.
    pub fn pop_batch(&mut self, max: usize) -> Vec<PendingOperation<T>> {
        let mut batch = Vec::with_capacity(max.min(self.len()));
        while batch.len() < max {
            match self.pop() {
                Some(op) => batch.push(op),
                None => break,
            }
        }
        batch
    }

    /// Enqueue time of the oldest operation still waiting, regardless of priority.
    pub fn oldest_enqueued_at(&self) -> Option<Instant> {
        self.arrivals.first_key_value().map(|(_, at)| *at)
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for OperationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
