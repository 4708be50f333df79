//! Tests for tokio spawner utilities

use futures::FutureExt;
use prometheus_batcher::core::BatchError;
use prometheus_batcher::runtime::{Spawn, TokioSpawner};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::current().expect("inside a runtime");

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(
        async move {
            tx.send(123).unwrap();
        }
        .boxed(),
    );

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_tokio_spawner_outside_runtime() {
    assert!(matches!(TokioSpawner::current(), Err(BatchError::NoRuntime)));
}

#[test]
fn test_tokio_spawner_from_handle() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let spawner = TokioSpawner::new(runtime.handle().clone());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(
        async move {
            let _ = tx.send("done");
        }
        .boxed(),
    );
    assert_eq!(runtime.block_on(rx).unwrap(), "done");
}
