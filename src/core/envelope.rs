//! Task envelopes: a submitted operation bound to exactly one outcome delivery.
//!
//! An [`Envelope`] owns the operation and the write side of a oneshot channel;
//! the caller keeps the matching [`TaskHandle`]. Settlement goes through a
//! per-envelope `parking_lot::Mutex` so that exactly one of {result, error,
//! cancellation} is ever written, no matter which side (scheduler, timeout,
//! caller cancel) gets there first.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::core::{SchedulerError, TaskError};
use crate::util::serde::{Priority, TaskId};

/// Final value delivered to a task handle.
pub type Outcome<T, E> = Result<T, TaskError<E>>;

/// Lifecycle of an envelope. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeState {
    /// Queued, not yet started.
    Pending,
    /// Dispatched and executing.
    Running,
    /// Outcome delivered.
    Settled,
}

/// How a dispatched operation finished, for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Operation returned `Ok`.
    Succeeded,
    /// Operation returned `Err`.
    Failed,
    /// Operation panicked.
    Panicked,
    /// Timeout fired first; the operation has since finished.
    TimedOut,
}

struct Slot<T, E> {
    state: EnvelopeState,
    sender: Option<oneshot::Sender<Outcome<T, E>>>,
    /// Bumped when the envelope is cancelled while pending.
    withdrawn: Option<Arc<AtomicUsize>>,
}

/// State shared between an envelope and its handle.
struct Shared<T, E> {
    id: TaskId,
    slot: Mutex<Slot<T, E>>,
}

impl<T, E> Shared<T, E> {
    fn state(&self) -> EnvelopeState {
        self.slot.lock().state
    }

    fn settle(&self, outcome: Outcome<T, E>) -> Result<(), SchedulerError> {
        let mut slot = self.slot.lock();
        if slot.state == EnvelopeState::Settled {
            error!(task_id = self.id, "attempted to settle task twice");
            return Err(SchedulerError::AlreadySettled(self.id));
        }
        slot.state = EnvelopeState::Settled;
        if let Some(tx) = slot.sender.take() {
            if tx.send(outcome).is_err() {
                debug!(task_id = self.id, "task handle dropped before settlement");
            }
        }
        Ok(())
    }

    fn begin(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.state != EnvelopeState::Pending {
            return false;
        }
        slot.state = EnvelopeState::Running;
        true
    }

    fn cancel(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.state != EnvelopeState::Pending {
            return false;
        }
        slot.state = EnvelopeState::Settled;
        if let Some(counter) = &slot.withdrawn {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(tx) = slot.sender.take() {
            let _ = tx.send(Err(SchedulerError::Cancelled.into()));
        }
        debug!(task_id = self.id, "pending task cancelled");
        true
    }

    fn track_withdrawal(&self, counter: Arc<AtomicUsize>) {
        self.slot.lock().withdrawn = Some(counter);
    }

    fn abandon(&self) {
        let mut slot = self.slot.lock();
        if slot.state == EnvelopeState::Settled {
            return;
        }
        slot.state = EnvelopeState::Settled;
        if let Some(tx) = slot.sender.take() {
            let _ = tx.send(Err(SchedulerError::Cancelled.into()));
        }
        debug!(task_id = self.id, "task dropped without settlement");
    }
}

/// Settles the envelope as cancelled if it is dropped unsettled, e.g. when the
/// runtime shuts down with the task still queued or in flight.
struct SettleOnDrop<T, E>(Arc<Shared<T, E>>);

impl<T, E> Drop for SettleOnDrop<T, E> {
    fn drop(&mut self) {
        self.0.abandon();
    }
}

/// Scheduler-side wrapper around one submitted operation.
pub struct Envelope<T, E> {
    id: TaskId,
    priority: Priority,
    enqueued_at: Instant,
    operation: BoxFuture<'static, Result<T, E>>,
    shared: SettleOnDrop<T, E>,
}

impl<T, E> Envelope<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Bind `operation` to a fresh outcome channel. Pure; never fails.
    pub fn wrap<F>(id: TaskId, priority: Priority, operation: F) -> (Self, TaskHandle<T, E>)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let shared = Arc::new(Shared {
            id,
            slot: Mutex::new(Slot {
                state: EnvelopeState::Pending,
                sender: Some(tx),
                withdrawn: None,
            }),
        });
        let envelope = Self {
            id,
            priority,
            enqueued_at: Instant::now(),
            operation: operation.boxed(),
            shared: SettleOnDrop(Arc::clone(&shared)),
        };
        let handle = TaskHandle {
            id,
            shared,
            receiver: rx,
        };
        (envelope, handle)
    }

    /// Task identifier.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Dispatch priority.
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// When the envelope was created. Observability only.
    pub const fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EnvelopeState {
        self.shared.0.state()
    }

    /// Deliver the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadySettled`] if an outcome was already
    /// delivered; the new outcome is discarded.
    pub fn settle(&self, outcome: Outcome<T, E>) -> Result<(), SchedulerError> {
        self.shared.0.settle(outcome)
    }

    /// Withdraw the envelope if it has not started. See [`TaskHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.shared.0.cancel()
    }

    /// Mark the envelope running. Returns `false` if it was cancelled or
    /// otherwise settled while waiting, in which case it must not run.
    pub fn begin(&self) -> bool {
        self.shared.0.begin()
    }

    /// Drive the operation to completion and settle the outcome.
    ///
    /// With a `timeout`, the handle is settled with [`SchedulerError::TimedOut`]
    /// as soon as the timer fires, but this future only resolves once the
    /// operation itself finishes, so the caller's slot stays occupied until then.
    pub async fn run(self, timeout: Option<Duration>) -> Completion {
        let Self {
            id,
            enqueued_at,
            operation,
            shared: guard,
            ..
        } = self;
        let shared = &guard.0;
        debug!(
            task_id = id,
            queued_ms = u64::try_from(enqueued_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "task started"
        );

        let mut guarded = AssertUnwindSafe(operation).catch_unwind();
        let finished = match timeout {
            None => guarded.await,
            Some(limit) => match tokio::time::timeout(limit, &mut guarded).await {
                Ok(finished) => finished,
                Err(_) => {
                    warn!(task_id = id, ?limit, "task timed out; slot held until it finishes");
                    let _ = shared.settle(Err(SchedulerError::TimedOut(limit).into()));
                    let _ = guarded.await;
                    return Completion::TimedOut;
                }
            },
        };

        let (completion, outcome) = match finished {
            Ok(Ok(value)) => (Completion::Succeeded, Ok(value)),
            Ok(Err(err)) => (Completion::Failed, Err(TaskError::Failed(err))),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(task_id = id, %message, "task panicked");
                (
                    Completion::Panicked,
                    Err(SchedulerError::Panicked(message).into()),
                )
            }
        };
        let _ = shared.settle(outcome);
        completion
    }
}

impl<T, E> fmt::Debug for Envelope<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("state", &self.shared.0.state())
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}

/// Caller-side handle to a submitted task.
///
/// Awaiting the handle yields the operation's result, its error wrapped in
/// [`TaskError::Failed`], or the scheduler's reason for settling it. Dropping
/// the handle does not cancel the task.
#[must_use = "dropping a handle discards the task's outcome"]
pub struct TaskHandle<T, E> {
    id: TaskId,
    shared: Arc<Shared<T, E>>,
    receiver: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    /// Task identifier.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle state of the task.
    pub fn state(&self) -> EnvelopeState {
        self.shared.state()
    }

    /// Whether an outcome has been delivered.
    pub fn is_settled(&self) -> bool {
        self.state() == EnvelopeState::Settled
    }

    /// Withdraw the task.
    ///
    /// A pending task settles with [`SchedulerError::Cancelled`] and never runs;
    /// returns `true`. Cancelling a running or settled task is advisory only and
    /// returns `false`: the operation is not interrupted.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Wait for the outcome. Equivalent to `.await` on the handle.
    pub async fn wait(self) -> Outcome<T, E> {
        self.await
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the envelope was discarded unsettled, e.g. the
        // runtime shut down before dispatch.
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(SchedulerError::Cancelled.into())))
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}

/// Type-erased envelope as held by the pending queue.
pub(crate) trait Dispatch: Send {
    fn id(&self) -> TaskId;
    fn priority(&self) -> Priority;
    fn enqueued_at(&self) -> Instant;
    fn is_settled(&self) -> bool;
    fn begin(&self) -> bool;
    /// Count a later pending-state cancellation in `counter`.
    fn track_withdrawal(&self, counter: Arc<AtomicUsize>);
    fn run(self: Box<Self>, timeout: Option<Duration>) -> BoxFuture<'static, Completion>;
}

impl<T, E> Dispatch for Envelope<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> TaskId {
        self.id
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    fn is_settled(&self) -> bool {
        self.state() == EnvelopeState::Settled
    }

    fn begin(&self) -> bool {
        Envelope::begin(self)
    }

    fn track_withdrawal(&self, counter: Arc<AtomicUsize>) {
        self.shared.0.track_withdrawal(counter);
    }

    fn run(self: Box<Self>, timeout: Option<Duration>) -> BoxFuture<'static, Completion> {
        Envelope::run(*self, timeout).boxed()
    }
}
