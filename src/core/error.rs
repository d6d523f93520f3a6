//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

use crate::util::serde::TaskId;

/// Errors produced by the scheduler itself, as opposed to by a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Submission rejected because the scheduler was closed.
    #[error("scheduler closed")]
    Closed,
    /// Submission rejected because the pending queue is at its limit.
    #[error("queue full: max queue length {max_queue_length} reached")]
    QueueFull {
        /// Configured queue limit.
        max_queue_length: usize,
    },
    /// Task was withdrawn before it started.
    #[error("task cancelled before dispatch")]
    Cancelled,
    /// Task did not settle within its timeout.
    #[error("task timed out after {0:?}")]
    TimedOut(Duration),
    /// Task operation panicked while running.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// An envelope was settled twice. Indicates a bookkeeping defect.
    #[error("task {0} already settled")]
    AlreadySettled(TaskId),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome error delivered to a task handle.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The scheduler settled the task (rejected, cancelled, timed out, panicked).
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// The operation itself returned an error; passed through unmodified.
    #[error("task failed: {0}")]
    Failed(E),
}

impl<E> TaskError<E> {
    /// Scheduler-side error, if this is not a task-defined failure.
    pub const fn scheduler_error(&self) -> Option<&SchedulerError> {
        match self {
            Self::Scheduler(err) => Some(err),
            Self::Failed(_) => None,
        }
    }

    /// Task-defined error, if the operation itself failed.
    pub const fn task_error(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Scheduler(_) => None,
        }
    }

    /// Consume and return the task-defined error, if any.
    pub fn into_task_error(self) -> Option<E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Scheduler(_) => None,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
