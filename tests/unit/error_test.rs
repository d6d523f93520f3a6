//! Tests for error types

use std::time::Duration;

use slotgate::core::{SchedulerError, TaskError};

#[test]
fn test_closed_error() {
    let err = SchedulerError::Closed;
    assert_eq!(format!("{}", err), "scheduler closed");
}

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull {
        max_queue_length: 16,
    };
    assert_eq!(format!("{}", err), "queue full: max queue length 16 reached");
}

#[test]
fn test_cancelled_error() {
    let err = SchedulerError::Cancelled;
    assert_eq!(format!("{}", err), "task cancelled before dispatch");
}

#[test]
fn test_timed_out_error() {
    let err = SchedulerError::TimedOut(Duration::from_millis(250));
    assert_eq!(format!("{}", err), "task timed out after 250ms");
}

#[test]
fn test_already_settled_error() {
    let err = SchedulerError::AlreadySettled(9);
    assert_eq!(format!("{}", err), "task 9 already settled");
}

#[test]
fn test_task_error_display() {
    let err: TaskError<String> = TaskError::Failed("connection reset".to_string());
    assert_eq!(format!("{}", err), "task failed: connection reset");

    let err: TaskError<String> = SchedulerError::Panicked("oops".into()).into();
    assert_eq!(format!("{}", err), "task panicked: oops");
}
