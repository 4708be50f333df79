//! Tokio runtime spawner implementation.

use futures::future::BoxFuture;
use tokio::runtime::Handle;

use crate::core::BatchError;
use crate::runtime::Spawn;

/// Tokio-based spawner that executes futures on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running on.
    pub fn current() -> Result<Self, BatchError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| BatchError::NoRuntime)
    }

    /// Underlying runtime handle.
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        self.handle.spawn(fut);
    }
}
