//! Configuration models for batchers and batcher pools.

pub mod pool;

pub use pool::{BatcherConfig, PoolConfig};
