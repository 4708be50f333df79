//! Tests for error types

use std::sync::Arc;

use prometheus_batcher::core::BatchError;

#[test]
fn test_queue_full_error() {
    let err = BatchError::QueueFull("test_domain".to_string());
    assert_eq!(format!("{}", err), "queue full: test_domain");
}

#[test]
fn test_closed_error() {
    assert_eq!(format!("{}", BatchError::Closed), "batcher closed");
}

#[test]
fn test_result_count_mismatch_error() {
    let err = BatchError::ResultCountMismatch {
        expected: 3,
        actual: 2,
    };
    assert_eq!(format!("{}", err), "executor returned 2 results for a batch of 3");
    assert!(err.is_executor_failure());
}

#[test]
fn test_executor_error_shares_source() {
    let err = BatchError::executor(anyhow::anyhow!("connection reset"));
    assert_eq!(format!("{}", err), "executor failed: connection reset");

    let copy = err.clone();
    match (&err, &copy) {
        (BatchError::Executor(a), BatchError::Executor(b)) => assert!(Arc::ptr_eq(a, b)),
        _ => panic!("expected executor errors"),
    }
}

#[test]
fn test_admission_errors_are_not_executor_failures() {
    assert!(!BatchError::Closed.is_executor_failure());
    assert!(!BatchError::QueueFull("x".into()).is_executor_failure());
    assert!(BatchError::ExecutorPanicked("boom".into()).is_executor_failure());
}
