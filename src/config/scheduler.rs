//! Scheduler configuration: JSON, environment, and programmatic construction.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable prefix read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "SLOTGATE_";

/// Order in which pending tasks are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Strict submission order.
    #[default]
    Fifo,
    /// Highest [`Priority`](crate::util::Priority) first, FIFO within a priority.
    Priority,
}

impl FromStr for QueuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "priority" => Ok(Self::Priority),
            other => Err(format!("unknown queue policy `{other}`")),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of tasks running at once. Must be positive.
    pub max_concurrency: usize,
    /// Maximum pending tasks before submissions are rejected. Unbounded if `None`.
    #[serde(default)]
    pub max_queue_length: Option<usize>,
    /// Per-task timeout in milliseconds. No timeout if `None`.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
    /// Dispatch order for pending tasks.
    #[serde(default)]
    pub queue_policy: QueuePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().max(1),
            max_queue_length: None,
            task_timeout_ms: None,
            queue_policy: QueuePolicy::Fifo,
        }
    }
}

impl SchedulerConfig {
    /// Config with the given concurrency ceiling and defaults elsewhere.
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            ..Self::default()
        }
    }

    /// Set the queue limit.
    #[must_use]
    pub const fn with_max_queue_length(mut self, max_queue_length: usize) -> Self {
        self.max_queue_length = Some(max_queue_length);
        self
    }

    /// Set the per-task timeout.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set the dispatch order.
    #[must_use]
    pub const fn with_queue_policy(mut self, queue_policy: QueuePolicy) -> Self {
        self.queue_policy = queue_policy;
        self
    }

    /// Per-task timeout as a `Duration`.
    #[must_use]
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".into());
        }
        if self.task_timeout_ms == Some(0) {
            return Err("task_timeout_ms must be greater than 0 when set".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `SLOTGATE_*` environment variables, loading a
    /// `.env` file first if one exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable is present but unparsable, or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. `from_env` delegates
    /// here with the process environment.
    ///
    /// # Errors
    ///
    /// Fails if a value is present but unparsable, or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(raw) = var("MAX_CONCURRENCY") {
            cfg.max_concurrency = raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid {ENV_PREFIX}MAX_CONCURRENCY `{raw}`"))?;
        }
        if let Some(raw) = var("MAX_QUEUE_LENGTH") {
            cfg.max_queue_length = Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("invalid {ENV_PREFIX}MAX_QUEUE_LENGTH `{raw}`"))?,
            );
        }
        if let Some(raw) = var("TASK_TIMEOUT_MS") {
            cfg.task_timeout_ms = Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid {ENV_PREFIX}TASK_TIMEOUT_MS `{raw}`"))?,
            );
        }
        if let Some(raw) = var("QUEUE_POLICY") {
            cfg.queue_policy = raw.parse::<QueuePolicy>().map_err(anyhow::Error::msg)?;
        }

        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_fields() {
        let cfg = SchedulerConfig::from_lookup(lookup(&[
            ("SLOTGATE_MAX_CONCURRENCY", "3"),
            ("SLOTGATE_MAX_QUEUE_LENGTH", "0"),
            ("SLOTGATE_TASK_TIMEOUT_MS", "250"),
            ("SLOTGATE_QUEUE_POLICY", "Priority"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_concurrency, 3);
        assert_eq!(cfg.max_queue_length, Some(0));
        assert_eq!(cfg.task_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.queue_policy, QueuePolicy::Priority);
    }

    #[test]
    fn test_from_lookup_defaults_when_unset() {
        let cfg = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
        assert!(cfg.max_concurrency >= 1);
        assert_eq!(cfg.max_queue_length, None);
        assert_eq!(cfg.queue_policy, QueuePolicy::Fifo);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = SchedulerConfig::from_lookup(lookup(&[("SLOTGATE_MAX_CONCURRENCY", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("SLOTGATE_MAX_CONCURRENCY"));

        assert!(SchedulerConfig::from_lookup(lookup(&[("SLOTGATE_MAX_CONCURRENCY", "0")])).is_err());
        assert!(SchedulerConfig::from_lookup(lookup(&[("SLOTGATE_QUEUE_POLICY", "lifo")])).is_err());
    }
}
