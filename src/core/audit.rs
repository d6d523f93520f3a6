//! Task lifecycle audit trail.
//!
//! When a sink is attached, the scheduler records one event per lifecycle
//! transition. Events are informational only; nothing reads them back to make
//! scheduling decisions.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::clock::now_ms;
use crate::util::serde::TaskId;

/// Lifecycle transition recorded in an [`AuditEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Submission accepted and dispatched immediately.
    Start,
    /// Submission accepted and queued.
    Enqueue,
    /// Queued task dispatched after a slot freed.
    Wake,
    /// Dispatched task released its slot.
    Complete,
    /// Submission rejected (closed or queue full).
    Reject,
    /// Cancelled task removed from the queue without running.
    Discard,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Enqueue => "enqueue",
            Self::Wake => "wake",
            Self::Complete => "complete",
            Self::Reject => "reject",
            Self::Discard => "discard",
        };
        f.write_str(name)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related task identifier.
    pub task_id: TaskId,
    /// Scheduler name, for hosts that run several.
    pub scheduler: String,
    /// Transition recorded.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink keeping the most recent events.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Build an audit event stamped with a fresh id and the current time.
pub fn build_audit_event(
    task_id: TaskId,
    scheduler: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4().to_string(),
        task_id,
        scheduler: scheduler.into(),
        action,
        created_at_ms: now_ms(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ids_are_unique() {
        let a = build_audit_event(1, "ingest", AuditAction::Start, None);
        let b = build_audit_event(1, "ingest", AuditAction::Start, None);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_zero_capacity_sink_records_nothing() {
        let mut sink = InMemoryAuditSink::new(0);
        sink.record(build_audit_event(1, "ingest", AuditAction::Reject, None));
        assert!(sink.events().is_empty());
    }
}
