//! Tests for configuration validation

use std::time::Duration;

use slotgate::config::{QueuePolicy, SchedulerConfig};

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig {
        max_concurrency: 3,
        max_queue_length: Some(0),
        task_timeout_ms: Some(1_000),
        queue_policy: QueuePolicy::Fifo,
    };
    assert!(valid.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_concurrency() {
    let invalid = SchedulerConfig::new(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_timeout() {
    let invalid = SchedulerConfig {
        task_timeout_ms: Some(0),
        ..SchedulerConfig::new(2)
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_default_uses_cpus() {
    let config = SchedulerConfig::default();
    assert!(config.max_concurrency >= 1);
    assert_eq!(config.max_queue_length, None);
    assert_eq!(config.task_timeout(), None);
}

#[test]
fn test_scheduler_config_fluent_setters() {
    let config = SchedulerConfig::new(4)
        .with_max_queue_length(100)
        .with_task_timeout(Duration::from_secs(2))
        .with_queue_policy(QueuePolicy::Priority);
    assert_eq!(config.max_queue_length, Some(100));
    assert_eq!(config.task_timeout_ms, Some(2_000));
    assert_eq!(config.queue_policy, QueuePolicy::Priority);
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "max_concurrency": 3,
        "max_queue_length": 50,
        "task_timeout_ms": 60000,
        "queue_policy": "priority"
    }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.max_concurrency, 3);
    assert_eq!(config.max_queue_length, Some(50));
    assert_eq!(config.task_timeout(), Some(Duration::from_secs(60)));
    assert_eq!(config.queue_policy, QueuePolicy::Priority);
}

#[test]
fn test_scheduler_config_from_json_optional_fields() {
    let config = SchedulerConfig::from_json_str(r#"{ "max_concurrency": 1 }"#).unwrap();
    assert_eq!(config.max_queue_length, None);
    assert_eq!(config.queue_policy, QueuePolicy::Fifo);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "max_concurrency": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_queue_policy_from_str() {
    assert_eq!("FIFO".parse::<QueuePolicy>(), Ok(QueuePolicy::Fifo));
    assert_eq!(" priority ".parse::<QueuePolicy>(), Ok(QueuePolicy::Priority));
    assert!("random".parse::<QueuePolicy>().is_err());
}
