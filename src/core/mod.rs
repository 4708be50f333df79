//! Core batching abstractions: operations, queue, scheduler and pool.

pub mod batcher;
pub mod error;
pub mod executor;
pub mod operation;
pub mod pool;
pub mod queue;
pub mod stats;

pub use batcher::Batcher;
pub use error::BatchError;
pub use executor::{run_concurrent, run_sequential, thunk, BatchExecutor, SharedExecutor, Thunk};
pub use operation::{OperationHandle, PendingOperation, Settlement};
pub use pool::BatcherPool;
pub use queue::OperationQueue;
pub use stats::BatcherStats;
