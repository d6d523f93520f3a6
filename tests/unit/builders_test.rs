//! Tests for builder modules

use std::time::Duration;

use slotgate::builders::SchedulerBuilder;
use slotgate::config::{QueuePolicy, SchedulerConfig};
use slotgate::core::DEFAULT_NAME;
use slotgate::runtime::TokioSpawner;

#[test]
fn test_scheduler_builder_config() {
    let builder = SchedulerBuilder::new(5)
        .max_queue_length(10)
        .task_timeout(Duration::from_millis(1_500))
        .queue_policy(QueuePolicy::Priority);

    let config = builder.config();
    assert_eq!(config.max_concurrency, 5);
    assert_eq!(config.max_queue_length, Some(10));
    assert_eq!(config.task_timeout_ms, Some(1_500));
    assert_eq!(config.queue_policy, QueuePolicy::Priority);
}

#[tokio::test]
async fn test_scheduler_builder_from_config() {
    let scheduler = SchedulerBuilder::from_config(SchedulerConfig::new(2))
        .build(TokioSpawner::current().unwrap())
        .unwrap();
    assert_eq!(scheduler.name(), DEFAULT_NAME);
    assert_eq!(scheduler.max_concurrency(), 2);
    assert_eq!(scheduler.running(), 0);
}
