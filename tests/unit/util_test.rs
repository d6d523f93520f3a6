//! Tests for utility functions

use slotgate::util::{init_tracing, init_tracing_with_filter, now_ms, Priority, TaskId};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_priority_serde() {
    let json = serde_json::to_string(&Priority::Critical).unwrap();
    assert_eq!(json, "\"critical\"");
    let back: Priority = serde_json::from_str("\"low\"").unwrap();
    assert_eq!(back, Priority::Low);
}

#[test]
fn test_now_ms_is_positive() {
    assert!(now_ms() > 0);
}

#[test]
fn test_task_id() {
    let id: TaskId = 12345;
    assert_eq!(id, 12345);
}

#[test]
fn test_tracing_init_is_repeatable() {
    init_tracing_with_filter("slotgate=debug");
    init_tracing();
    tracing::debug!("subscriber installed once");
}
