//! Bounded-concurrency scheduler.
//!
//! All admission bookkeeping (`running`, the pending queue, the closed flag)
//! lives behind one `parking_lot::Mutex`. Every decision to start, queue, or
//! reject a task is made inside that critical section; the actual spawning,
//! settlement, and audit recording happen after it is released.
//!
//! Dispatch is iterative. When a task releases its slot, a single loop pops
//! pending envelopes until the ceiling is reached or the queue is empty, so
//! stack depth stays constant no matter how quickly tasks complete.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::envelope::{Dispatch, Envelope, TaskHandle};
use crate::core::queue::PendingQueue;
use crate::core::stats::{SchedulerCounters, SchedulerState, SchedulerStats};
use crate::core::{Operation, SchedulerError, Spawn};
use crate::runtime::TokioSpawner;
use crate::util::serde::{Priority, TaskId};

/// Default scheduler name used in logs and audit events.
pub const DEFAULT_NAME: &str = "default";

/// Mutable admission state. Only touched under `Inner::state`.
struct AdmissionState {
    running: usize,
    pending: PendingQueue,
    closed: bool,
    /// A dispatch pass is in progress.
    dispatching: bool,
}

impl AdmissionState {
    const fn is_idle(&self) -> bool {
        self.running == 0 && self.pending.is_empty()
    }
}

struct Inner<S: Spawn> {
    name: String,
    max_concurrency: usize,
    max_queue_length: Option<usize>,
    task_timeout: Option<Duration>,
    state: Mutex<AdmissionState>,
    counters: SchedulerCounters,
    next_id: AtomicU64,
    idle: Notify,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
    spawner: S,
}

/// What a submission turned into, decided under the lock and acted on after.
enum Admission<T, E> {
    Start(Envelope<T, E>),
    Queued,
    Rejected(Envelope<T, E>, SchedulerError),
}

/// Bounded-concurrency task scheduler.
///
/// Cloning is cheap and every clone drives the same scheduler.
///
/// ```rust,ignore
/// use slotgate::config::SchedulerConfig;
/// use slotgate::core::Scheduler;
/// use slotgate::runtime::TokioSpawner;
///
/// let scheduler = Scheduler::new(SchedulerConfig::new(3), TokioSpawner::current()?)?;
/// let handle = scheduler.submit(async { Ok::<_, String>(42) });
/// assert_eq!(handle.await?, 42);
///
/// scheduler.close();
/// scheduler.drain().await;
/// ```
pub struct Scheduler<S: Spawn = TokioSpawner> {
    inner: Arc<Inner<S>>,
}

impl<S: Spawn> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Spawn> Scheduler<S> {
    /// Create a scheduler from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: SchedulerConfig, spawner: S) -> Result<Self, SchedulerError> {
        Self::from_parts(DEFAULT_NAME.to_string(), config, spawner, None)
    }

    pub(crate) fn from_parts(
        name: String,
        config: SchedulerConfig,
        spawner: S,
        audit: Option<Box<dyn AuditSink>>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        info!(
            scheduler = %name,
            max_concurrency = config.max_concurrency,
            max_queue_length = ?config.max_queue_length,
            task_timeout_ms = ?config.task_timeout_ms,
            queue_policy = ?config.queue_policy,
            "scheduler initialized"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                name,
                max_concurrency: config.max_concurrency,
                max_queue_length: config.max_queue_length,
                task_timeout: config.task_timeout(),
                state: Mutex::new(AdmissionState {
                    running: 0,
                    pending: PendingQueue::new(config.queue_policy),
                    closed: false,
                    dispatching: false,
                }),
                counters: SchedulerCounters::default(),
                next_id: AtomicU64::new(0),
                idle: Notify::new(),
                audit: audit.map(Mutex::new),
                spawner,
            }),
        })
    }

    /// Submit an operation at normal priority.
    ///
    /// Never blocks: the task starts on the spawner if a slot is free, is
    /// queued otherwise, or is rejected. A rejected task's handle is already
    /// settled with [`SchedulerError::Closed`] or [`SchedulerError::QueueFull`].
    pub fn submit<F, T, E>(&self, operation: F) -> TaskHandle<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit_with_priority(Priority::Normal, operation)
    }

    /// Submit an [`Operation`] at normal priority.
    pub fn submit_operation<O: Operation>(&self, operation: O) -> TaskHandle<O::Output, O::Error> {
        self.submit(operation.run())
    }

    /// Submit an operation with an explicit priority. Priority only affects
    /// ordering under [`QueuePolicy::Priority`](crate::config::QueuePolicy::Priority).
    pub fn submit_with_priority<F, T, E>(&self, priority: Priority, operation: F) -> TaskHandle<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let inner = &self.inner;
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (envelope, handle) = Envelope::wrap(id, priority, operation);

        let admission = {
            let mut state = inner.state.lock();
            if state.closed {
                Admission::Rejected(envelope, SchedulerError::Closed)
            } else if state.running < inner.max_concurrency && state.pending.is_empty() {
                state.running += 1;
                let started = envelope.begin();
                debug_assert!(started, "fresh envelope must be pending");
                Admission::Start(envelope)
            } else if let Some(limit) = inner.queue_limit_reached(&mut state) {
                Admission::Rejected(
                    envelope,
                    SchedulerError::QueueFull {
                        max_queue_length: limit,
                    },
                )
            } else {
                state.pending.push(Box::new(envelope));
                Admission::Queued
            }
        };

        match admission {
            Admission::Start(envelope) => {
                inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
                inner.record_audit(id, AuditAction::Start, None);
                debug!("task {} started immediately", id);
                Inner::launch(inner, Box::new(envelope));
            }
            Admission::Queued => {
                inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
                inner.record_audit(id, AuditAction::Enqueue, None);
                debug!("task {} enqueued", id);
            }
            Admission::Rejected(envelope, err) => {
                inner.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(scheduler = %inner.name, task_id = id, error = %err, "task rejected");
                inner.record_audit(id, AuditAction::Reject, Some(err.to_string()));
                let _ = envelope.settle(Err(err.into()));
            }
        }
        handle
    }

    /// Stop accepting submissions. Already accepted tasks still run.
    /// Calling this more than once has no further effect.
    pub fn close(&self) {
        let (newly_closed, idle) = {
            let mut state = self.inner.state.lock();
            let newly_closed = !state.closed;
            state.closed = true;
            (newly_closed, state.is_idle())
        };
        if newly_closed {
            info!(scheduler = %self.inner.name, idle, "scheduler closed");
        }
    }

    /// Future that resolves once nothing is running or pending.
    ///
    /// Does not stop new submissions; call [`close`](Self::close) first for a
    /// graceful shutdown.
    pub fn drain(&self) -> DrainHandle {
        let inner = Arc::clone(&self.inner);
        DrainHandle {
            wait: async move { inner.wait_idle().await }.boxed(),
        }
    }

    /// Close, then wait up to `timeout` for accepted work to finish.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::TimedOut`] if tasks are still running or
    /// pending when the timeout elapses. The scheduler stays closed and the
    /// remaining tasks keep running.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SchedulerError> {
        self.close();
        if tokio::time::timeout(timeout, self.drain()).await.is_err() {
            let stats = self.stats();
            warn!(
                scheduler = %self.inner.name,
                running = stats.running,
                pending = stats.pending,
                "shutdown timed out with work in flight"
            );
            return Err(SchedulerError::TimedOut(timeout));
        }
        info!(scheduler = %self.inner.name, "scheduler drained");
        Ok(())
    }

    /// Scheduler name used in logs and audit events.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Configured concurrency ceiling.
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Tasks currently holding a slot.
    pub fn running(&self) -> usize {
        self.inner.state.lock().running
    }

    /// Tasks waiting for a slot, excluding ones cancelled while queued.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.live_len()
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        let state = self.inner.state.lock();
        match (state.closed, state.is_idle()) {
            (false, _) => SchedulerState::Open,
            (true, false) => SchedulerState::Closed,
            (true, true) => SchedulerState::Drained,
        }
    }

    /// Snapshot of gauges and lifetime counters. Never mutates state.
    pub fn stats(&self) -> SchedulerStats {
        let mut stats = {
            let state = self.inner.state.lock();
            SchedulerStats {
                max_concurrency: self.inner.max_concurrency,
                running: state.running,
                pending: state.pending.live_len(),
                closed: state.closed,
                ..SchedulerStats::default()
            }
        };
        self.inner.counters.fill(&mut stats);
        stats
    }
}

impl<S: Spawn> Inner<S> {
    /// Returns the limit if the queue is full after purging cancelled entries.
    fn queue_limit_reached(&self, state: &mut AdmissionState) -> Option<usize> {
        let limit = self.max_queue_length?;
        if state.pending.len() < limit {
            return None;
        }
        let purged = state.pending.purge_settled();
        if purged > 0 {
            self.counters
                .cancelled
                .fetch_add(purged as u64, Ordering::Relaxed);
        }
        (state.pending.len() >= limit).then_some(limit)
    }

    /// Put a running envelope on the spawner. Its slot is released exactly once,
    /// when the operation finishes or the spawned task is dropped.
    fn launch(this: &Arc<Self>, job: Box<dyn Dispatch>) {
        let slot = SlotGuard {
            inner: Arc::clone(this),
            task_id: job.id(),
        };
        let timeout = this.task_timeout;
        this.spawner.spawn(async move {
            let completion = job.run(timeout).await;
            slot.inner.counters.record_completion(completion);
            debug!(task_id = slot.task_id, ?completion, "task finished");
            drop(slot);
        });
    }

    /// Give back one slot and start as many pending tasks as now fit.
    ///
    /// Only one dispatch pass runs at a time. A release that arrives while a
    /// pass is in progress (on another thread, or nested because the spawner
    /// dropped a future synchronously) just returns its slot; the running pass
    /// re-checks the queue before it finishes.
    fn release(this: &Arc<Self>, task_id: TaskId) {
        let nested = {
            let mut state = this.state.lock();
            debug_assert!(state.running > 0, "slot released twice");
            state.running = state.running.saturating_sub(1);
            std::mem::replace(&mut state.dispatching, true)
        };
        this.record_audit(task_id, AuditAction::Complete, None);
        if !nested {
            Self::dispatch(this);
        }
    }

    /// Dispatch pass. Caller must have set `dispatching`.
    fn dispatch(this: &Arc<Self>) {
        loop {
            let mut ready = Vec::new();
            let mut discarded = Vec::new();
            let idle = {
                let mut state = this.state.lock();
                while state.running < this.max_concurrency {
                    let Some(job) = state.pending.pop() else {
                        break;
                    };
                    if job.begin() {
                        state.running += 1;
                        ready.push(job);
                    } else {
                        state.pending.forget_withdrawn();
                        discarded.push(job.id());
                    }
                }
                if ready.is_empty() {
                    state.dispatching = false;
                }
                state.is_idle()
            };

            if !discarded.is_empty() {
                this.counters
                    .cancelled
                    .fetch_add(discarded.len() as u64, Ordering::Relaxed);
                for id in discarded {
                    debug!(task_id = id, "discarded cancelled task");
                    this.record_audit(id, AuditAction::Discard, None);
                }
            }
            if ready.is_empty() {
                if idle {
                    this.idle.notify_waiters();
                }
                return;
            }
            for job in ready {
                let id = job.id();
                debug!(
                    task_id = id,
                    waited_ms = u64::try_from(job.enqueued_at().elapsed().as_millis()).unwrap_or(u64::MAX),
                    "woke queued task"
                );
                this.record_audit(id, AuditAction::Wake, None);
                Self::launch(this, job);
            }
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a release between the check and the
            // await is not missed.
            notified.as_mut().enable();
            if self.state.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn record_audit(&self, task_id: TaskId, action: AuditAction, detail: Option<String>) {
        if let Some(sink) = &self.audit {
            sink.lock()
                .record(build_audit_event(task_id, self.name.as_str(), action, detail));
        }
    }
}

/// Owns one slot; releases it on drop.
struct SlotGuard<S: Spawn> {
    inner: Arc<Inner<S>>,
    task_id: TaskId,
}

impl<S: Spawn> Drop for SlotGuard<S> {
    fn drop(&mut self) {
        Inner::release(&self.inner, self.task_id);
    }
}

impl<S: Spawn> fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Scheduler")
            .field("name", &self.inner.name)
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("running", &state.running)
            .field("pending", &state.pending.live_len())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Scheduler::drain`].
#[must_use = "a drain handle does nothing unless awaited"]
pub struct DrainHandle {
    wait: BoxFuture<'static, ()>,
}

impl Future for DrainHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.wait.as_mut().poll(cx)
    }
}

impl fmt::Debug for DrainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainHandle").finish_non_exhaustive()
    }
}
