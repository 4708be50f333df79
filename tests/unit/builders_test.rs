//! Tests for builder modules

use prometheus_batcher::builders::PoolBuilder;
use prometheus_batcher::config::{BatcherConfig, PoolConfig};
use prometheus_batcher::core::{run_sequential, BatchError, Thunk};
use prometheus_batcher::util::Priority;

fn doubling(thunks: Vec<Thunk<u32>>) -> impl std::future::Future<Output = anyhow::Result<Vec<u32>>> {
    async move { Ok(run_sequential(thunks).await.into_iter().map(|v| v * 2).collect()) }
}

#[test]
fn test_pool_builder_keeps_config() {
    let config = PoolConfig::default().with_domain("pool1", BatcherConfig::new().with_max_batch_size(5));
    let builder = PoolBuilder::<u32>::new(config);
    assert_eq!(builder.config().for_domain("pool1").max_batch_size, 5);
}

#[tokio::test]
async fn test_pool_builder_default_priority() {
    let exec = |thunks: Vec<Thunk<u32>>| async move { Ok::<_, anyhow::Error>(run_sequential(thunks).await) };

    let plain = PoolBuilder::<u32>::new(PoolConfig::default())
        .with_executor(exec)
        .build()
        .unwrap();
    assert_eq!(plain.default_priority(), Priority::NORMAL);

    let urgent = PoolBuilder::<u32>::new(PoolConfig::default())
        .with_executor(exec)
        .with_default_priority(Priority::HIGH)
        .build()
        .unwrap();
    assert_eq!(urgent.default_priority(), Priority::HIGH);
}

#[tokio::test]
async fn test_pool_builder_requires_executor() {
    let result = PoolBuilder::<u32>::new(PoolConfig::default()).build();
    assert!(matches!(result, Err(BatchError::InvalidConfig(_))));
}

#[test]
fn test_pool_builder_from_invalid_json() {
    let result = PoolBuilder::<u32>::from_json_str(r#"{ "default": { "max_batch_size": 0 } }"#);
    assert!(matches!(result, Err(BatchError::InvalidConfig(msg)) if msg.starts_with("config invalid")));
}

#[tokio::test(start_paused = true)]
async fn test_pool_builder_registers_domain_executors() {
    let pool = PoolBuilder::<u32>::from_json_str(r#"{ "domains": { "double": { "window_ms": 1 } } }"#)
        .unwrap()
        .with_executor(|thunks: Vec<Thunk<u32>>| async move {
            Ok::<_, anyhow::Error>(run_sequential(thunks).await)
        })
        .with_domain_executor("double", doubling)
        .build()
        .unwrap();

    assert_eq!(pool.domains(), vec!["double".to_string()]);
    assert_eq!(pool.batcher("double").unwrap().config().window_ms, 1);

    let doubled = pool.batch("double", || async { 21 });
    let plain = pool.batch("plain", || async { 21 });
    assert_eq!(doubled.await.unwrap(), 42);
    assert_eq!(plain.await.unwrap(), 21);
}
