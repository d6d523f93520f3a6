//! Fluent construction of a [`Scheduler`].

use std::time::Duration;

use crate::config::{QueuePolicy, SchedulerConfig};
use crate::core::{AuditSink, Scheduler, SchedulerError, Spawn, DEFAULT_NAME};
use crate::runtime::TokioSpawner;

/// Builder for [`Scheduler`].
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new(3)
///     .name("uploads")
///     .max_queue_length(500)
///     .task_timeout(Duration::from_secs(30))
///     .build_tokio()?;
/// ```
pub struct SchedulerBuilder {
    name: String,
    config: SchedulerConfig,
    audit: Option<Box<dyn AuditSink>>,
}

impl SchedulerBuilder {
    /// Start from a concurrency ceiling and default settings.
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self::from_config(SchedulerConfig::new(max_concurrency))
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: SchedulerConfig) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            config,
            audit: None,
        }
    }

    /// Name used in logs and audit events.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reject submissions once this many tasks are pending.
    #[must_use]
    pub const fn max_queue_length(mut self, max_queue_length: usize) -> Self {
        self.config.max_queue_length = Some(max_queue_length);
        self
    }

    /// Settle each task with a timeout error if it runs longer than `timeout`.
    #[must_use]
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_task_timeout(timeout);
        self
    }

    /// Dispatch order for pending tasks.
    #[must_use]
    pub const fn queue_policy(mut self, queue_policy: QueuePolicy) -> Self {
        self.config.queue_policy = queue_policy;
        self
    }

    /// Record lifecycle events to `sink`.
    #[must_use]
    pub fn audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Box::new(sink));
        self
    }

    /// Configuration the scheduler will be built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Build with a custom spawner.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the configuration is invalid.
    pub fn build<S: Spawn>(self, spawner: S) -> Result<Scheduler<S>, SchedulerError> {
        Scheduler::from_parts(self.name, self.config, spawner, self.audit)
    }

    /// Build on the tokio runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the configuration is
    /// invalid or no tokio runtime is available.
    pub fn build_tokio(self) -> Result<Scheduler<TokioSpawner>, SchedulerError> {
        let spawner = TokioSpawner::current()?;
        self.build(spawner)
    }
}
