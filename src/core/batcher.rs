//! Time-windowed batching scheduler.
//!
//! A [`Batcher`] accepts independent units of work, holds them for a short
//! window, and hands them to a [`BatchExecutor`] in one call. Each caller
//! receives its own result through the [`OperationHandle`] returned by
//! [`Batcher::execute`].
//!
//! # Flush policy
//!
//! The scheduling decision runs after every enqueue and after every flush:
//!
//! 1. queue length ≥ `max_batch_size` → flush now (on a spawned task, so
//!    `execute` returns first);
//! 2. oldest operation older than `max_wait_ms` → flush now;
//! 3. otherwise arm a timer unless one is already armed. It fires after
//!    `window_ms`, or earlier if the oldest operation reaches `max_wait_ms`.
//!
//! Only one drain runs at a time. Work enqueued while a drain is in flight is
//! picked up when that drain re-evaluates.
//!
//! ```rust,ignore
//! use prometheus_batcher::config::BatcherConfig;
//! use prometheus_batcher::core::{run_concurrent, Batcher, Thunk};
//!
//! let batcher = Batcher::new(BatcherConfig::default(), |thunks: Vec<Thunk<u64>>| async move {
//!     Ok::<_, anyhow::Error>(run_concurrent(thunks).await)
//! })?;
//!
//! let a = batcher.execute(|| async { 1 });
//! let b = batcher.execute_with_priority(|| async { 2 }, 10);
//! assert_eq!(a.await?, 1);
//! assert_eq!(b.await?, 2);
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::{AbortHandle, AbortRegistration, Abortable, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::BatcherConfig;
use crate::core::stats::{BatcherCounters, BatcherStats};
use crate::core::{
    thunk, BatchError, BatchExecutor, OperationHandle, OperationQueue, PendingOperation,
    SharedExecutor, Thunk,
};
use crate::runtime::{SharedSpawner, TokioSpawner};
use crate::util::clock::now_ms;
use crate::util::types::Priority;

/// Timer currently armed for a batcher.
struct ArmedTimer {
    generation: u64,
    abort: AbortHandle,
}

/// Mutable scheduler state, guarded by one mutex.
struct SchedulerState<T> {
    queue: OperationQueue<T>,
    next_sequence: u64,
    /// Set while a drain owns the queue.
    draining: bool,
    timer: Option<ArmedTimer>,
    timer_generation: u64,
    closed: bool,
    last_flush_at_ms: Option<u128>,
}

impl<T> SchedulerState<T> {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort.abort();
        }
    }
}

/// What to do once the state lock has been released.
enum FlushAction {
    None,
    /// A drain has been claimed (`draining` already set).
    Immediate,
    ArmTimer {
        generation: u64,
        deadline: Instant,
        registration: AbortRegistration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainMode {
    /// Drain one batch, then follow the flush policy.
    Policy,
    /// Keep draining until the queue is empty.
    Forced,
}

struct Inner<T> {
    name: String,
    config: BatcherConfig,
    executor: SharedExecutor<T>,
    spawner: SharedSpawner,
    state: Mutex<SchedulerState<T>>,
    counters: BatcherCounters,
    /// Signalled whenever a drain releases the queue.
    idle: Notify,
}

/// Coalesces independently issued operations into batched executor calls.
///
/// Cloning is cheap; clones share the same queue, timer and executor.
pub struct Batcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Batcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Batcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<T> Batcher<T>
where
    T: Send + 'static,
{
    /// Create a batcher driven by the current tokio runtime.
    pub fn new(config: BatcherConfig, executor: impl BatchExecutor<T>) -> Result<Self, BatchError> {
        let spawner = TokioSpawner::current()?;
        Self::with_parts("default", config, Arc::new(executor), Arc::new(spawner))
    }

    /// Create a batcher from shared parts. `name` only labels log output and stats.
    pub fn with_parts(
        name: impl Into<String>,
        config: BatcherConfig,
        executor: SharedExecutor<T>,
        spawner: SharedSpawner,
    ) -> Result<Self, BatchError> {
        config.validate().map_err(BatchError::InvalidConfig)?;
        Ok(Self {
            inner: Arc::new(Inner {
                name: name.into(),
                config,
                executor,
                spawner,
                state: Mutex::new(SchedulerState {
                    queue: OperationQueue::new(),
                    next_sequence: 0,
                    draining: false,
                    timer: None,
                    timer_generation: 0,
                    closed: false,
                    last_flush_at_ms: None,
                }),
                counters: BatcherCounters::default(),
                idle: Notify::new(),
            }),
        })
    }

    /// Label used in logs and pool stats.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Flush policy in effect.
    pub fn config(&self) -> &BatcherConfig {
        &self.inner.config
    }

    /// Enqueue work at the default priority.
    ///
    /// The closure is not called here; it runs when the executor processes the
    /// batch it lands in.
    pub fn execute<F, Fut>(&self, f: F) -> OperationHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.execute_thunk(thunk(f), Priority::NORMAL)
    }

    /// Enqueue work with an explicit priority (higher drains first).
    pub fn execute_with_priority<F, Fut>(
        &self,
        f: F,
        priority: impl Into<Priority>,
    ) -> OperationHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.execute_thunk(thunk(f), priority.into())
    }

    /// Enqueue an already boxed thunk.
    pub fn execute_thunk(&self, work: Thunk<T>, priority: Priority) -> OperationHandle<T> {
        let inner = &self.inner;
        let admitted = {
            let mut state = inner.state.lock();
            if state.closed {
                Err(BatchError::Closed)
            } else if inner
                .config
                .max_queue_depth
                .is_some_and(|depth| state.queue.len() >= depth)
            {
                Err(BatchError::QueueFull(format!(
                    "{}: max queue depth reached ({})",
                    inner.name,
                    state.queue.len()
                )))
            } else {
                let sequence = state.next_sequence;
                state.next_sequence += 1;
                let (op, handle) = PendingOperation::new(work, priority, sequence);
                debug!(
                    batcher = %inner.name,
                    id = %op.id(),
                    %priority,
                    depth = state.queue.len() + 1,
                    "operation enqueued"
                );
                state.queue.push(op);
                inner.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok((handle, inner.evaluate(&mut state)))
            }
        };

        match admitted {
            Ok((handle, action)) => {
                inner.apply(action);
                handle
            }
            Err(err) => {
                inner.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(batcher = %inner.name, error = %err, "operation rejected");
                OperationHandle::rejected(err)
            }
        }
    }

    /// Drain the queue completely, ignoring the window and age policy.
    ///
    /// Waits for an in-flight drain first, then loops flush cycles until the
    /// queue is empty.
    pub async fn flush(&self) {
        Inner::flush(&self.inner).await;
    }

    /// Stop accepting work and drain what is already queued.
    ///
    /// Later `execute` calls resolve to [`BatchError::Closed`].
    pub async fn shutdown(&self) {
        self.inner.state.lock().closed = true;
        info!(batcher = %self.inner.name, "batcher shutting down");
        self.flush().await;
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Operations currently waiting.
    pub fn queue_size(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Snapshot of counters and queue state.
    pub fn stats(&self) -> BatcherStats {
        let state = self.inner.state.lock();
        self.inner
            .counters
            .snapshot(state.queue.len(), state.draining, state.last_flush_at_ms)
    }
}

impl<T> Inner<T>
where
    T: Send + 'static,
{
    /// Scheduling decision. Must be called with the state lock held.
    fn evaluate(&self, state: &mut SchedulerState<T>) -> FlushAction {
        if state.queue.is_empty() {
            state.cancel_timer();
            return FlushAction::None;
        }
        if state.draining {
            // The running drain re-evaluates when it finishes.
            return FlushAction::None;
        }

        let full = state.queue.len() >= self.config.max_batch_size;
        let oldest = state.queue.oldest_enqueued_at();
        let overdue = oldest.is_some_and(|at| at.elapsed() >= self.config.max_wait());
        if full || overdue {
            state.cancel_timer();
            state.draining = true;
            return FlushAction::Immediate;
        }

        if state.timer.is_some() {
            return FlushAction::None;
        }
        // Fire at the window end or when the oldest operation hits max_wait,
        // whichever comes first. Later arrivals are never older, so the
        // deadline holds until the timer fires or is cancelled.
        let now = Instant::now();
        let window_end = now.checked_add(self.config.window()).unwrap_or(now);
        let deadline = oldest
            .and_then(|at| at.checked_add(self.config.max_wait()))
            .map_or(window_end, |age_limit| age_limit.min(window_end));

        state.timer_generation += 1;
        let generation = state.timer_generation;
        let (abort, registration) = AbortHandle::new_pair();
        state.timer = Some(ArmedTimer { generation, abort });
        FlushAction::ArmTimer {
            generation,
            deadline,
            registration,
        }
    }

    /// Carry out a scheduling decision. Must be called without the state lock.
    fn apply(self: &Arc<Self>, action: FlushAction) {
        match action {
            FlushAction::None => {}
            FlushAction::Immediate => {
                debug!(batcher = %self.name, "immediate flush scheduled");
                self.spawner
                    .spawn(Arc::clone(self).drain(DrainMode::Policy));
            }
            FlushAction::ArmTimer {
                generation,
                deadline,
                registration,
            } => {
                debug!(batcher = %self.name, window_ms = self.config.window_ms, "flush timer armed");
                let inner = Arc::clone(self);
                // `execute` may run off-runtime; the sleep is created inside the task.
                self.spawner.spawn(
                    async move {
                        let sleep = Abortable::new(tokio::time::sleep_until(deadline), registration);
                        if sleep.await.is_ok() {
                            inner.on_timer(generation).await;
                        }
                    }
                    .boxed(),
                );
            }
        }
    }

    fn on_timer(self: Arc<Self>, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            let claimed = {
                let mut state = self.state.lock();
                match &state.timer {
                    Some(timer) if timer.generation == generation => {}
                    // Superseded by an immediate flush or a newer timer.
                    _ => return,
                }
                state.timer = None;
                if state.draining || state.queue.is_empty() {
                    false
                } else {
                    state.draining = true;
                    true
                }
            };
            if claimed {
                debug!(batcher = %self.name, "window elapsed");
                self.drain(DrainMode::Policy).await;
            }
        }
        .boxed()
    }

    /// Run flush cycles. The caller must have claimed the drain (`draining = true`).
    fn drain(self: Arc<Self>, mode: DrainMode) -> BoxFuture<'static, ()> {
        async move {
            loop {
                let batch = self.state.lock().queue.pop_batch(self.config.max_batch_size);
                if !batch.is_empty() {
                    self.dispatch(batch).await;
                }

                let action = {
                    let mut state = self.state.lock();
                    state.draining = false;
                    if mode == DrainMode::Forced && !state.queue.is_empty() {
                        state.cancel_timer();
                        state.draining = true;
                        FlushAction::Immediate
                    } else {
                        self.evaluate(&mut state)
                    }
                };
                match action {
                    FlushAction::Immediate => continue,
                    other => {
                        self.apply(other);
                        break;
                    }
                }
            }
            self.idle.notify_waiters();
        }
        .boxed()
    }

    /// Hand one batch to the executor and settle every operation in it.
    async fn dispatch(&self, batch: Vec<PendingOperation<T>>) {
        let batch_id = Uuid::new_v4();
        let size = batch.len();
        let (thunks, settlements): (Vec<_>, Vec<_>) =
            batch.into_iter().map(PendingOperation::into_parts).unzip();

        debug!(batcher = %self.name, %batch_id, size, "dispatching batch");
        let outcome = AssertUnwindSafe(self.executor.execute(thunks))
            .catch_unwind()
            .await;
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);

        let outcome = match outcome {
            Ok(Ok(results)) if results.len() == size => Ok(results),
            Ok(Ok(results)) => {
                error!(
                    batcher = %self.name,
                    %batch_id,
                    expected = size,
                    actual = results.len(),
                    "executor returned wrong number of results"
                );
                Err(BatchError::ResultCountMismatch {
                    expected: size,
                    actual: results.len(),
                })
            }
            Ok(Err(err)) => {
                error!(batcher = %self.name, %batch_id, size, error = %err, "executor failed");
                Err(BatchError::executor(err))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(batcher = %self.name, %batch_id, size, panic = %message, "executor panicked");
                Err(BatchError::ExecutorPanicked(message))
            }
        };

        let settled = u64::try_from(size).unwrap_or(u64::MAX);
        match outcome {
            Ok(results) => {
                for (settlement, value) in settlements.into_iter().zip(results) {
                    settlement.resolve(value);
                }
                self.counters.settled_ok.fetch_add(settled, Ordering::Relaxed);
                debug!(batcher = %self.name, %batch_id, size, "batch settled");
            }
            Err(err) => {
                for settlement in settlements {
                    settlement.reject(err.clone());
                }
                self.counters.settled_err.fetch_add(settled, Ordering::Relaxed);
            }
        }

        self.state.lock().last_flush_at_ms = Some(now_ms());
    }

    async fn flush(self: &Arc<Self>) {
        loop {
            let idle = self.idle.notified();
            let claimed = {
                let mut state = self.state.lock();
                if state.draining {
                    false
                } else if state.queue.is_empty() {
                    return;
                } else {
                    state.cancel_timer();
                    state.draining = true;
                    true
                }
            };
            if claimed {
                Arc::clone(self).drain(DrainMode::Forced).await;
            } else {
                idle.await;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
