//! Error types for batching operations.

use std::sync::Arc;

use thiserror::Error;

/// Errors delivered to callers of a batcher or pool.
///
/// Cloneable so that a single executor failure can be fanned out to every
/// operation of the batch it belonged to.
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    /// The executor call failed. Every operation of the batch receives the same `Arc`.
    #[error("executor failed: {0}")]
    Executor(Arc<anyhow::Error>),
    /// The executor panicked while running a batch.
    #[error("executor panicked: {0}")]
    ExecutorPanicked(String),
    /// The executor returned a different number of results than it received thunks.
    #[error("executor returned {actual} results for a batch of {expected}")]
    ResultCountMismatch {
        /// Operations in the batch.
        expected: usize,
        /// Results returned by the executor.
        actual: usize,
    },
    /// The queue reached its configured depth.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// The batcher or pool has been shut down.
    #[error("batcher closed")]
    Closed,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No tokio runtime is available to drive timers and drains.
    #[error("no tokio runtime available")]
    NoRuntime,
    /// A domain was registered twice.
    #[error("domain already registered: {0}")]
    DuplicateDomain(String),
}

impl BatchError {
    /// Wrap an executor failure so it can be shared across a batch.
    pub fn executor(err: anyhow::Error) -> Self {
        Self::Executor(Arc::new(err))
    }

    /// True when the failure came from the executor (error, panic or bad result count)
    /// rather than from admission or lifecycle checks.
    pub const fn is_executor_failure(&self) -> bool {
        matches!(
            self,
            Self::Executor(_) | Self::ExecutorPanicked(_) | Self::ResultCountMismatch { .. }
        )
    }
}
