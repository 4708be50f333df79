//! Tests for configuration validation

use prometheus_batcher::config::{BatcherConfig, PoolConfig};

#[test]
fn test_batcher_config_defaults() {
    let cfg = BatcherConfig::default();
    assert_eq!(cfg.window_ms, 10);
    assert_eq!(cfg.max_batch_size, 100);
    assert_eq!(cfg.max_wait_ms, 50);
    assert!(cfg.max_queue_depth.is_none());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_batcher_config_builders() {
    let cfg = BatcherConfig::new()
        .with_window_ms(5)
        .with_max_batch_size(2)
        .with_max_wait_ms(20)
        .with_max_queue_depth(64);
    assert_eq!(cfg.window().as_millis(), 5);
    assert_eq!(cfg.max_wait().as_millis(), 20);
    assert_eq!(cfg.max_batch_size, 2);
    assert_eq!(cfg.max_queue_depth, Some(64));
}

#[test]
fn test_batcher_config_invalid_batch_size() {
    let invalid = BatcherConfig::new().with_max_batch_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_batcher_config_invalid_queue_depth() {
    let invalid = BatcherConfig::new().with_max_queue_depth(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_domain_fallback() {
    let config = PoolConfig::default()
        .with_domain("products", BatcherConfig::new().with_max_batch_size(5));
    assert_eq!(config.for_domain("products").max_batch_size, 5);
    assert_eq!(config.for_domain("farms").max_batch_size, 100);
    assert!(config.validate().is_ok());
}

#[test]
fn test_pool_config_invalid_domain() {
    let config = PoolConfig::default()
        .with_domain("broken", BatcherConfig::new().with_max_batch_size(0));
    let err = config.validate().unwrap_err();
    assert!(err.contains("broken"));
}

#[test]
fn test_pool_config_from_json() {
    let json = r#"{
        "default": { "window_ms": 20, "max_batch_size": 50, "max_wait_ms": 100 },
        "domains": {
            "orders": { "window_ms": 2, "max_batch_size": 10 }
        }
    }"#;

    let config = PoolConfig::from_json_str(json).unwrap();
    assert_eq!(config.default.window_ms, 20);
    let orders = config.for_domain("orders");
    assert_eq!(orders.window_ms, 2);
    assert_eq!(orders.max_batch_size, 10);
    // Unspecified fields take crate defaults.
    assert_eq!(orders.max_wait_ms, 50);
}

#[test]
fn test_pool_config_from_json_rejects_invalid() {
    assert!(PoolConfig::from_json_str("not json").is_err());
    assert!(PoolConfig::from_json_str(r#"{ "default": { "max_batch_size": 0 } }"#).is_err());
}

#[test]
fn test_batcher_config_from_env() {
    // Prefix is unique to this test so parallel tests do not interfere.
    std::env::set_var("PBTEST_ENV_WINDOW_MS", "7");
    std::env::set_var("PBTEST_ENV_MAX_BATCH_SIZE", "3");
    std::env::set_var("PBTEST_ENV_MAX_QUEUE_DEPTH", "9");

    let cfg = BatcherConfig::from_env("PBTEST_ENV").unwrap();
    assert_eq!(cfg.window_ms, 7);
    assert_eq!(cfg.max_batch_size, 3);
    assert_eq!(cfg.max_wait_ms, 50);
    assert_eq!(cfg.max_queue_depth, Some(9));
}

#[test]
fn test_batcher_config_from_env_rejects_garbage() {
    std::env::set_var("PBTEST_BAD_MAX_WAIT_MS", "soon");
    let err = BatcherConfig::from_env("PBTEST_BAD").unwrap_err();
    assert!(err.contains("PBTEST_BAD_MAX_WAIT_MS"));
}
