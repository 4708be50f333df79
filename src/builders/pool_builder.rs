//! Builder that assembles a batcher pool from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PoolConfig;
use crate::core::{BatchError, BatchExecutor, BatcherPool, SharedExecutor};
use crate::runtime::{SharedSpawner, Spawn, TokioSpawner};
use crate::util::types::Priority;

/// Assembles a [`BatcherPool`]: validated config, a default executor for lazily
/// created domains, and optional dedicated executors registered eagerly.
pub struct PoolBuilder<T> {
    config: PoolConfig,
    executor: Option<SharedExecutor<T>>,
    domain_executors: HashMap<String, SharedExecutor<T>>,
    spawner: Option<SharedSpawner>,
    default_priority: Priority,
}

impl<T> PoolBuilder<T>
where
    T: Send + 'static,
{
    /// Start from a pool configuration.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            executor: None,
            domain_executors: HashMap::new(),
            spawner: None,
            default_priority: Priority::NORMAL,
        }
    }

    /// Start from a JSON pool configuration.
    pub fn from_json_str(input: &str) -> Result<Self, BatchError> {
        PoolConfig::from_json_str(input)
            .map(Self::new)
            .map_err(|e| BatchError::InvalidConfig(format!("config invalid: {e}")))
    }

    /// Configuration the pool will be built with.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Priority applied by [`BatcherPool::batch`]. Defaults to [`Priority::NORMAL`].
    #[must_use]
    pub fn with_default_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.default_priority = priority.into();
        self
    }

    /// Executor for domains without a dedicated one.
    #[must_use]
    pub fn with_executor(mut self, executor: impl BatchExecutor<T>) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Shared executor for domains without a dedicated one.
    #[must_use]
    pub fn with_shared_executor(mut self, executor: SharedExecutor<T>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Dedicated executor for one domain; the domain is registered at build time.
    #[must_use]
    pub fn with_domain_executor(
        mut self,
        domain: impl Into<String>,
        executor: impl BatchExecutor<T>,
    ) -> Self {
        self.domain_executors.insert(domain.into(), Arc::new(executor));
        self
    }

    /// Spawner for timers and drains. Defaults to the current tokio runtime.
    #[must_use]
    pub fn with_spawner(mut self, spawner: impl Spawn) -> Self {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    /// Validate and build the pool.
    pub fn build(self) -> Result<BatcherPool<T>, BatchError> {
        let executor = self
            .executor
            .ok_or_else(|| BatchError::InvalidConfig("a default executor is required".into()))?;
        let spawner: SharedSpawner = match self.spawner {
            Some(spawner) => spawner,
            None => Arc::new(TokioSpawner::current()?),
        };

        let pool = BatcherPool::with_parts(self.config, executor, spawner)?
            .with_default_priority(self.default_priority);
        for (domain, executor) in self.domain_executors {
            let config = pool.config().for_domain(&domain).clone();
            pool.register(domain, config, executor)?;
        }
        Ok(pool)
    }
}
