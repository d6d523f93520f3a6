//! Core scheduling abstractions and admission accounting.

pub mod audit;
pub mod envelope;
pub mod error;
pub mod operation;
pub(crate) mod queue;
pub mod scheduler;
pub mod spawn;
pub mod stats;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use envelope::{Completion, Envelope, EnvelopeState, Outcome, TaskHandle};
pub use error::{AppResult, SchedulerError, TaskError};
pub use operation::Operation;
pub use scheduler::{DrainHandle, Scheduler, DEFAULT_NAME};
pub use spawn::Spawn;
pub use stats::{SchedulerState, SchedulerStats};
