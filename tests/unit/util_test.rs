//! Tests for utility functions

use prometheus_batcher::util::{init_tracing, init_tracing_with_default, now_ms, OperationId, Priority};

#[test]
fn test_priority_ordering() {
    assert!(Priority::CRITICAL > Priority::HIGH);
    assert!(Priority::HIGH > Priority::NORMAL);
    assert!(Priority::NORMAL > Priority::LOW);
    assert!(Priority(-1) < Priority::NORMAL);
}

#[test]
fn test_priority_from_i32() {
    let p: Priority = 42.into();
    assert_eq!(p.value(), 42);
    assert_eq!(p.to_string(), "42");
}

#[test]
fn test_priority_serializes_as_integer() {
    assert_eq!(serde_json::to_string(&Priority(-3)).unwrap(), "-3");
    let parsed: Priority = serde_json::from_str("7").unwrap();
    assert_eq!(parsed, Priority(7));
}

#[test]
fn test_operation_id_unique() {
    assert_ne!(OperationId::new(), OperationId::new());
}

#[test]
fn test_now_ms_is_positive() {
    assert!(now_ms() > 0);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with_default("prometheus_batcher=debug");
    init_tracing();
    tracing::info!("subscriber installed");
}
