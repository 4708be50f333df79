//! Pending operations and the caller-facing handle that settles with their outcome.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::core::{BatchError, Thunk};
use crate::util::types::{OperationId, Priority};

/// One caller's enqueued unit of work plus its continuation.
///
/// Nothing about an operation changes after creation; it only leaves the queue
/// when a flush selects it.
pub struct PendingOperation<T> {
    id: OperationId,
    thunk: Thunk<T>,
    settlement: Settlement<T>,
    priority: Priority,
    sequence: u64,
    enqueued_at: Instant,
}

impl<T> PendingOperation<T> {
    /// Create an operation stamped with the current time, together with the
    /// handle its caller awaits.
    pub fn new(thunk: Thunk<T>, priority: Priority, sequence: u64) -> (Self, OperationHandle<T>) {
        let id = OperationId::new();
        let (tx, rx) = oneshot::channel();
        let op = Self {
            id,
            thunk,
            settlement: Settlement { id, tx },
            priority,
            sequence,
            enqueued_at: Instant::now(),
        };
        (op, OperationHandle { id, rx })
    }

    /// Correlation token.
    pub const fn id(&self) -> OperationId {
        self.id
    }

    /// Scheduling priority.
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Per-batcher arrival sequence; breaks priority ties FIFO.
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the operation was enqueued.
    pub const fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// Split into the work handed to the executor and the continuation kept by the scheduler.
    pub fn into_parts(self) -> (Thunk<T>, Settlement<T>) {
        (self.thunk, self.settlement)
    }
}

impl<T> std::fmt::Debug for PendingOperation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOperation")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

/// Continuation of a pending operation. Consumed on use, so it settles at most once.
pub struct Settlement<T> {
    id: OperationId,
    tx: oneshot::Sender<Result<T, BatchError>>,
}

impl<T> Settlement<T> {
    /// Operation this settlement belongs to.
    pub const fn id(&self) -> OperationId {
        self.id
    }

    /// Resolve with a value. Returns `false` if the caller dropped its handle.
    pub fn resolve(self, value: T) -> bool {
        self.tx.send(Ok(value)).is_ok()
    }

    /// Reject with an error. Returns `false` if the caller dropped its handle.
    pub fn reject(self, err: BatchError) -> bool {
        self.tx.send(Err(err)).is_ok()
    }
}

/// Future returned by `execute`/`batch`; resolves once the flush containing the
/// operation has completed.
///
/// Dropping the handle does not cancel the operation; it still runs with its batch.
#[must_use = "the operation's outcome is only observable through its handle"]
pub struct OperationHandle<T> {
    id: OperationId,
    rx: oneshot::Receiver<Result<T, BatchError>>,
}

impl<T> OperationHandle<T> {
    /// A handle that is already rejected; used when admission fails.
    pub(crate) fn rejected(err: BatchError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self {
            id: OperationId::new(),
            rx,
        }
    }

    /// Correlation token of the underlying operation.
    pub const fn id(&self) -> OperationId {
        self.id
    }
}

impl<T> Future for OperationHandle<T> {
    type Output = Result<T, BatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the scheduler went away without settling.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(BatchError::Closed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::thunk;

    #[tokio::test]
    async fn test_resolve_reaches_handle() {
        let (op, handle) = PendingOperation::new(thunk(|| async { 7u32 }), Priority::NORMAL, 0);
        assert_eq!(op.id(), handle.id());

        let (run, settlement) = op.into_parts();
        let value = run().await;
        assert!(settlement.resolve(value));
        assert_eq!(handle.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_reject_reaches_handle() {
        let (op, handle) = PendingOperation::new(thunk(|| async { 0u32 }), Priority::HIGH, 1);
        let (_run, settlement) = op.into_parts();
        assert!(settlement.reject(BatchError::QueueFull("x".into())));
        assert!(matches!(handle.await, Err(BatchError::QueueFull(_))));
    }

    #[tokio::test]
    async fn test_dropped_settlement_reports_closed() {
        let (op, handle) = PendingOperation::new(thunk(|| async { 0u32 }), Priority::NORMAL, 2);
        drop(op);
        assert!(matches!(handle.await, Err(BatchError::Closed)));
    }

    #[tokio::test]
    async fn test_resolve_after_handle_dropped() {
        let (op, handle) = PendingOperation::new(thunk(|| async { 0u32 }), Priority::NORMAL, 3);
        drop(handle);
        let (_run, settlement) = op.into_parts();
        assert!(!settlement.resolve(1));
    }
}
