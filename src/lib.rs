//! # Slotgate
//!
//! A bounded-concurrency scheduler for async work: at most `max_concurrency`
//! submitted tasks run at once, everything else waits in a FIFO queue, and
//! every submitter gets a handle that resolves with its own task's outcome.
//!
//! ## Core Problem Solved
//!
//! Services that fan out one unit of work per inbound item (an uploaded row,
//! a consumed event) need admission control so a burst does not start
//! thousands of operations against a shared backend at once:
//!
//! - **Hard ceiling**: the running count never exceeds the configured limit
//! - **Non-blocking submit**: callers get a handle immediately, whether the
//!   task started or queued
//! - **Observable outcomes**: queued tasks deliver results just like tasks that
//!   started immediately
//! - **Explicit backpressure**: optional queue limit rejects instead of growing
//! - **Isolation**: a failing or panicking task only affects its own handle
//!
//! ## Key Features
//!
//! - **Iterative dispatch**: completions pull the next queued task in a loop,
//!   never by recursion
//! - **Cancellation**: withdraw a queued task without it ever taking a slot
//! - **Per-task timeouts**: the handle resolves on time while the slot is held
//!   until the operation really finishes
//! - **Graceful shutdown**: `close()` then `drain()`, or `shutdown(timeout)`
//! - **Snapshots**: read-only running/pending gauges and lifetime counters
//!
//! ## Example
//!
//! ```rust,ignore
//! use slotgate::builders::SchedulerBuilder;
//! use std::time::Duration;
//!
//! let scheduler = SchedulerBuilder::new(3)
//!     .max_queue_length(1_000)
//!     .task_timeout(Duration::from_secs(30))
//!     .build_tokio()?;
//!
//! let handles: Vec<_> = rows
//!     .into_iter()
//!     .map(|row| scheduler.submit(async move { store_row(row).await }))
//!     .collect();
//!
//! for handle in handles {
//!     match handle.await {
//!         Ok(id) => tracing::info!(id, "stored"),
//!         Err(err) => tracing::warn!(%err, "row failed"),
//!     }
//! }
//!
//! scheduler.shutdown(Duration::from_secs(10)).await?;
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and admission accounting.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::SchedulerBuilder;
pub use crate::config::{QueuePolicy, SchedulerConfig};
pub use crate::core::{
    Scheduler, SchedulerError, SchedulerState, SchedulerStats, TaskError, TaskHandle,
};
pub use crate::runtime::TokioSpawner;
pub use crate::util::Priority;
