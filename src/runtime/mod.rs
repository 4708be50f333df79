//! Runtime adapters that drive flush timers and drains.

pub mod spawn;
pub mod tokio_spawner;

pub use spawn::{SharedSpawner, Spawn};
pub use tokio_spawner::TokioSpawner;
