//! Batch executor trait and thunk abstraction.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture};
use futures::FutureExt;

/// A deferred, zero-argument unit of work producing a `T`.
///
/// Thunks are never invoked by the scheduler itself; only the executor decides
/// when (and whether concurrently) to run them.
pub type Thunk<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

/// Executor handle shared between batchers (e.g. across pool domains).
pub type SharedExecutor<T> = Arc<dyn BatchExecutor<T>>;

/// Box a closure into a [`Thunk`].
pub fn thunk<T, F, Fut>(f: F) -> Thunk<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    Box::new(move || f().boxed())
}

/// Performs one batched call for a list of thunks.
///
/// The returned vector must have one entry per thunk, in the same order: entry
/// `i` settles the caller that submitted thunk `i`. Returning `Err` fails every
/// operation in the batch, so executors that want per-item isolation should
/// catch failures inside each thunk and resolve to a tagged value such as
/// `Result<V, E>`.
///
/// Any `Fn(Vec<Thunk<T>>) -> impl Future<Output = anyhow::Result<Vec<T>>>`
/// closure is an executor.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_batcher::core::{run_concurrent, BatchExecutor, Thunk};
///
/// struct LookupExecutor;
///
/// #[async_trait]
/// impl BatchExecutor<u64> for LookupExecutor {
///     async fn execute(&self, thunks: Vec<Thunk<u64>>) -> anyhow::Result<Vec<u64>> {
///         // acquire one connection, then run every lookup on it
///         Ok(run_concurrent(thunks).await)
///     }
/// }
/// ```
#[async_trait]
pub trait BatchExecutor<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    /// Run a batch and return one result per thunk, index-aligned.
    async fn execute(&self, thunks: Vec<Thunk<T>>) -> anyhow::Result<Vec<T>>;
}

#[async_trait]
impl<T, F, Fut> BatchExecutor<T> for F
where
    T: Send + 'static,
    F: Fn(Vec<Thunk<T>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<T>>> + Send + 'static,
{
    async fn execute(&self, thunks: Vec<Thunk<T>>) -> anyhow::Result<Vec<T>> {
        self(thunks).await
    }
}

/// Run thunks one after another, preserving order.
pub async fn run_sequential<T>(thunks: Vec<Thunk<T>>) -> Vec<T> {
    let mut results = Vec::with_capacity(thunks.len());
    for run in thunks {
        results.push(run().await);
    }
    results
}

/// Run thunks concurrently on the current task, preserving order.
pub async fn run_concurrent<T>(thunks: Vec<Thunk<T>>) -> Vec<T> {
    future::join_all(thunks.into_iter().map(|run| run())).await
}
