//! # Prometheus Batcher
//!
//! A time-windowed operation batching scheduler for the Prometheus AI Platform.
//!
//! Many independent callers issue small asynchronous operations in quick
//! succession. Each of them carries a fixed overhead (a round trip, a lock, a
//! kernel launch) that is much cheaper to pay once per group. The batcher holds
//! operations for a short window, hands them to a caller-supplied executor in a
//! single call, and routes every result back to the caller that asked for it.
//!
//! ## Key Features
//!
//! - **Windowed coalescing**: flush on window expiry, on batch size, or when the
//!   oldest operation gets too old
//! - **Priority ordering**: higher priority first, FIFO within a priority
//! - **Per-caller results**: every `execute` returns its own future
//! - **Named pools**: independent queues and timers per domain key
//! - **Bounded batches**: at most `max_batch_size` operations per executor call
//!
//! ## Batcher
//!
//! ```rust,ignore
//! use prometheus_batcher::config::BatcherConfig;
//! use prometheus_batcher::core::{run_concurrent, Batcher, Thunk};
//!
//! let batcher = Batcher::new(
//!     BatcherConfig::new().with_window_ms(10).with_max_batch_size(100).with_max_wait_ms(50),
//!     |thunks: Vec<Thunk<String>>| async move {
//!         // one connection checkout for the whole batch
//!         Ok::<_, anyhow::Error>(run_concurrent(thunks).await)
//!     },
//! )?;
//!
//! let greeting = batcher.execute(|| async { "hello".to_string() }).await?;
//! batcher.flush().await;
//! ```
//!
//! ## Failure semantics
//!
//! If the executor fails, every operation in that batch receives the same
//! [`BatchError::Executor`](core::BatchError::Executor) and the batcher keeps
//! serving later work. Callers that need per-item isolation should make their
//! thunks resolve to a `Result` instead of failing the executor.
//!
//! For complete examples, see:
//! - `tests/batcher_test.rs` - Scheduler behavior
//! - `tests/pool_test.rs` - Domain pools

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core batching abstractions: operations, queue, scheduler and pool.
pub mod core;
/// Configuration models for batchers and pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Runtime adapters that drive timers and drains.
pub mod runtime;
/// Shared utilities.
pub mod util;
