//! Spawning abstraction used by batchers for timers and deferred drains.

use std::sync::Arc;

use futures::future::BoxFuture;

/// Abstraction for spawning background work on a runtime.
pub trait Spawn: Send + Sync + 'static {
    /// Spawn a detached future.
    fn spawn(&self, fut: BoxFuture<'static, ()>);
}

/// Spawner shared between a pool and its batchers.
pub type SharedSpawner = Arc<dyn Spawn>;
