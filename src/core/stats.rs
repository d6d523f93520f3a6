//! Read-only observability snapshots and the counters behind them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::envelope::Completion;

/// Observable lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Accepting submissions.
    Open,
    /// Rejecting submissions; accepted work still dispatches.
    Closed,
    /// Closed with nothing running or pending.
    Drained,
}

/// Point-in-time view of the scheduler for metrics emission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Configured concurrency ceiling.
    pub max_concurrency: usize,
    /// Tasks currently holding a slot.
    pub running: usize,
    /// Tasks waiting for a slot.
    pub pending: usize,
    /// Whether `close()` was called.
    pub closed: bool,
    /// Submissions accepted (started or queued).
    pub submitted: u64,
    /// Submissions rejected as closed or queue full.
    pub rejected: u64,
    /// Tasks whose operation returned `Ok`.
    pub succeeded: u64,
    /// Tasks whose operation returned `Err`.
    pub failed: u64,
    /// Tasks whose operation panicked.
    pub panicked: u64,
    /// Tasks settled by their timeout.
    pub timed_out: u64,
    /// Pending tasks discarded after being cancelled.
    pub cancelled: u64,
}

impl SchedulerStats {
    /// Tasks that held a slot and have released it.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.panicked + self.timed_out
    }
}

/// Lock-free lifetime counters.
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub rejected: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub panicked: AtomicU64,
    pub timed_out: AtomicU64,
    pub cancelled: AtomicU64,
}

impl SchedulerCounters {
    pub(crate) fn record_completion(&self, completion: Completion) {
        let counter = match completion {
            Completion::Succeeded => &self.succeeded,
            Completion::Failed => &self.failed,
            Completion::Panicked => &self.panicked,
            Completion::TimedOut => &self.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fill the counter fields of `stats`.
    pub(crate) fn fill(&self, stats: &mut SchedulerStats) {
        stats.submitted = self.submitted.load(Ordering::Relaxed);
        stats.rejected = self.rejected.load(Ordering::Relaxed);
        stats.succeeded = self.succeeded.load(Ordering::Relaxed);
        stats.failed = self.failed.load(Ordering::Relaxed);
        stats.panicked = self.panicked.load(Ordering::Relaxed);
        stats.timed_out = self.timed_out.load(Ordering::Relaxed);
        stats.cancelled = self.cancelled.load(Ordering::Relaxed);
    }
}
