//! Serializable identifiers shared across the scheduler.

use serde::{Deserialize, Serialize};

/// Identifier assigned to every submitted task, unique per scheduler.
pub type TaskId = u64;

/// Dispatch priority, only consulted under [`QueuePolicy::Priority`].
///
/// [`QueuePolicy::Priority`]: crate::config::QueuePolicy::Priority
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Latency-sensitive work.
    High,
    /// Dispatched ahead of everything else.
    Critical,
}
