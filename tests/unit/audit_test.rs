//! Tests for audit sink

use slotgate::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(1, "uploads", AuditAction::Enqueue, Some("row 3".to_string()));

    sink.record(event);
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].task_id, 1);
    assert_eq!(events[0].scheduler, "uploads");
    assert_eq!(events[0].action, AuditAction::Enqueue);
    assert_eq!(events[0].detail.as_deref(), Some("row 3"));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(1, "uploads", AuditAction::Start, None));
    sink.record(build_audit_event(2, "uploads", AuditAction::Start, None));
    sink.record(build_audit_event(3, "uploads", AuditAction::Start, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].task_id, 2); // First one popped
    assert_eq!(events[1].task_id, 3);
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(7, "uploads", AuditAction::Complete, None);

    assert_eq!(event.task_id, 7);
    assert_eq!(event.action.to_string(), "complete");
    assert!(!event.event_id.is_empty());
    assert!(event.created_at_ms > 0);
}
