//! Named registry of independently scheduled batchers.
//!
//! Each domain key gets its own [`Batcher`], with its own queue, timer and
//! flush policy, so unrelated workloads never share flush timing. Batchers are
//! created on first use from the pool's [`PoolConfig`] and default executor,
//! or registered up front with a dedicated executor.
//!
//! ```rust,ignore
//! let pool = BatcherPool::new(
//!     PoolConfig::default().with_domain("inventory", BatcherConfig::new().with_window_ms(5)),
//!     |thunks: Vec<Thunk<Row>>| async move { Ok::<_, anyhow::Error>(run_concurrent(thunks).await) },
//! )?;
//!
//! let row = pool.batch("inventory", move || load_row(id)).await?;
//! pool.flush_all().await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::{BatcherConfig, PoolConfig};
use crate::core::{
    BatchError, BatchExecutor, Batcher, BatcherStats, OperationHandle, SharedExecutor,
};
use crate::runtime::{SharedSpawner, TokioSpawner};
use crate::util::types::Priority;

/// Owns one [`Batcher`] per domain key.
pub struct BatcherPool<T> {
    config: PoolConfig,
    executor: SharedExecutor<T>,
    spawner: SharedSpawner,
    batchers: RwLock<HashMap<String, Batcher<T>>>,
    default_priority: Priority,
    closed: AtomicBool,
}

impl<T> BatcherPool<T>
where
    T: Send + 'static,
{
    /// Create a pool driven by the current tokio runtime.
    pub fn new(config: PoolConfig, executor: impl BatchExecutor<T>) -> Result<Self, BatchError> {
        let spawner = TokioSpawner::current()?;
        Self::with_parts(config, Arc::new(executor), Arc::new(spawner))
    }

    /// Create a pool from shared parts.
    pub fn with_parts(
        config: PoolConfig,
        executor: SharedExecutor<T>,
        spawner: SharedSpawner,
    ) -> Result<Self, BatchError> {
        config.validate().map_err(BatchError::InvalidConfig)?;
        Ok(Self {
            config,
            executor,
            spawner,
            batchers: RwLock::new(HashMap::new()),
            default_priority: Priority::NORMAL,
            closed: AtomicBool::new(false),
        })
    }

    /// Priority used by [`batch`](Self::batch).
    #[must_use]
    pub fn with_default_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.default_priority = priority.into();
        self
    }

    /// Priority used by [`batch`](Self::batch).
    pub const fn default_priority(&self) -> Priority {
        self.default_priority
    }

    /// Pool configuration.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Register a domain with its own policy and executor.
    ///
    /// Fails with [`BatchError::DuplicateDomain`] if the domain already has a
    /// batcher, including one created lazily by [`batch`](Self::batch).
    pub fn register(
        &self,
        domain: impl Into<String>,
        config: BatcherConfig,
        executor: SharedExecutor<T>,
    ) -> Result<Batcher<T>, BatchError> {
        let domain = domain.into();
        let mut batchers = self.batchers.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(BatchError::Closed);
        }
        if batchers.contains_key(&domain) {
            return Err(BatchError::DuplicateDomain(domain));
        }
        let batcher =
            Batcher::with_parts(domain.clone(), config, executor, Arc::clone(&self.spawner))?;
        batchers.insert(domain.clone(), batcher.clone());
        info!(%domain, "batcher registered");
        Ok(batcher)
    }

    /// Batcher for `domain`, created on first use.
    pub fn batcher(&self, domain: &str) -> Result<Batcher<T>, BatchError> {
        let existing = self.batchers.read().get(domain).cloned();
        if let Some(batcher) = existing {
            return Ok(batcher);
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(BatchError::Closed);
        }

        let mut batchers = self.batchers.write();
        // Another caller may have created it, or shut the pool down, between the two locks.
        if let Some(batcher) = batchers.get(domain) {
            return Ok(batcher.clone());
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(BatchError::Closed);
        }
        let batcher = Batcher::with_parts(
            domain,
            self.config.for_domain(domain).clone(),
            Arc::clone(&self.executor),
            Arc::clone(&self.spawner),
        )?;
        batchers.insert(domain.to_string(), batcher.clone());
        debug!(domain, "batcher created on first use");
        Ok(batcher)
    }

    /// Enqueue work on `domain` at the pool's default priority.
    pub fn batch<F, Fut>(&self, domain: &str, f: F) -> OperationHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.batch_with_priority(domain, f, self.default_priority)
    }

    /// Enqueue work on `domain` with an explicit priority.
    pub fn batch_with_priority<F, Fut>(
        &self,
        domain: &str,
        f: F,
        priority: impl Into<Priority>,
    ) -> OperationHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        match self.batcher(domain) {
            Ok(batcher) => batcher.execute_with_priority(f, priority),
            Err(err) => {
                warn!(domain, error = %err, "batch rejected");
                OperationHandle::rejected(err)
            }
        }
    }

    /// Drain every domain's queue. Domains flush concurrently.
    pub async fn flush_all(&self) {
        let batchers = self.snapshot();
        future::join_all(batchers.iter().map(Batcher::flush)).await;
    }

    /// Queue size per domain.
    pub fn stats(&self) -> HashMap<String, usize> {
        self.batchers
            .read()
            .iter()
            .map(|(domain, batcher)| (domain.clone(), batcher.queue_size()))
            .collect()
    }

    /// Full counters per domain.
    pub fn detailed_stats(&self) -> HashMap<String, BatcherStats> {
        self.batchers
            .read()
            .iter()
            .map(|(domain, batcher)| (domain.clone(), batcher.stats()))
            .collect()
    }

    /// Known domain keys, sorted.
    pub fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.batchers.read().keys().cloned().collect();
        domains.sort();
        domains
    }

    /// Close every batcher to new work and drain them.
    pub async fn shutdown(&self) {
        // Closing under the write lock means no batcher can be inserted after the snapshot.
        let batchers = {
            let registry = self.batchers.write();
            self.closed.store(true, Ordering::Release);
            registry.values().cloned().collect::<Vec<_>>()
        };
        info!(domains = batchers.len(), "batcher pool shutting down");
        future::join_all(batchers.iter().map(Batcher::shutdown)).await;
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Vec<Batcher<T>> {
        self.batchers.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{run_sequential, Thunk};

    fn pool() -> BatcherPool<u32> {
        BatcherPool::new(PoolConfig::default(), |thunks: Vec<Thunk<u32>>| async move {
            Ok::<_, anyhow::Error>(run_sequential(thunks).await)
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_batcher_created_lazily_once() {
        let pool = pool();
        assert!(pool.domains().is_empty());

        let a = pool.batcher("users").unwrap();
        let b = pool.batcher("users").unwrap();
        assert_eq!(pool.domains(), vec!["users".to_string()]);
        assert_eq!(a.name(), b.name());

        let _pending = a.execute(|| async { 1 });
        assert_eq!(b.queue_size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_rejects_duplicates() {
        let pool = pool();
        let exec: SharedExecutor<u32> = Arc::new(|thunks: Vec<Thunk<u32>>| async move {
            Ok::<_, anyhow::Error>(run_sequential(thunks).await)
        });

        pool.register("orders", BatcherConfig::default(), Arc::clone(&exec))
            .unwrap();
        let again = pool.register("orders", BatcherConfig::default(), exec);
        assert!(matches!(again, Err(BatchError::DuplicateDomain(d)) if d == "orders"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_pool_rejects_new_domains() {
        let pool = pool();
        pool.shutdown().await;
        assert!(pool.is_closed());
        assert!(matches!(pool.batcher("late"), Err(BatchError::Closed)));
        let exec: SharedExecutor<u32> = Arc::new(|thunks: Vec<Thunk<u32>>| async move {
            Ok::<_, anyhow::Error>(run_sequential(thunks).await)
        });
        assert!(matches!(
            pool.register("late", BatcherConfig::default(), exec),
            Err(BatchError::Closed)
        ));
        assert!(matches!(
            pool.batch("late", || async { 1 }).await,
            Err(BatchError::Closed)
        ));
    }
}
