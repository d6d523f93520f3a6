//! Configuration models for the scheduler.

pub mod scheduler;

pub use scheduler::{QueuePolicy, SchedulerConfig};
