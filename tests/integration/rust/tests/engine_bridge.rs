//! Engine/bridge boundary integration tests
//!
//! Stands in for real native operations with threads driving promises, and
//! verifies cancellation, handle hygiene, and the event-thread policy across
//! the boundary.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bridge_types::{ErrorCode, FutureError, NativeError};
use future_bridge::{blocking, ManagedFuture};
use native_engine::{AsyncApi, InProcessEngine};

/// Stand-in for a native operation: resolves to `value` after `delay`.
fn native_operation(
    engine: &Arc<InProcessEngine>,
    delay: Duration,
    value: i64,
) -> ManagedFuture<i64> {
    let promise = engine.promise_create();
    let handle = engine.promise_get_future(promise);

    let worker = engine.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        worker.promise_set_value(promise, value as u64);
        worker.promise_destroy(promise);
    });

    let api: Arc<dyn AsyncApi> = engine.clone();
    ManagedFuture::from_handle(api, handle)
}

/// Stand-in for a native operation canceled mid-flight.
fn canceled_operation(engine: &Arc<InProcessEngine>) -> ManagedFuture<i64> {
    let promise = engine.promise_create();
    let handle = engine.promise_get_future(promise);

    let worker = engine.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        worker.promise_set_error(
            promise,
            NativeError {
                code: ErrorCode::OperationCanceled,
                message: "operation canceled".to_string(),
            },
        );
        worker.promise_destroy(promise);
    });

    let api: Arc<dyn AsyncApi> = engine.clone();
    ManagedFuture::from_handle(api, handle)
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached within timeout");
}

/// Test: two staged native operations compose through adoption
#[test]
fn test_staged_operations_compose() {
    let engine = Arc::new(InProcessEngine::new());

    let first = native_operation(&engine, Duration::from_millis(30), 10);
    let stage = engine.clone();
    let total = first
        .and_then_unwrap(move |value| {
            Ok(native_operation(&stage, Duration::from_millis(30), value + 1))
        })
        .expect("attach failed");

    assert_eq!(total.get().expect("pipeline failed"), 11);
}

/// Test: cancellation stays distinguishable through a chain
#[test]
fn test_cancellation_surfaces_through_the_chain() {
    let engine = Arc::new(InProcessEngine::new());

    let chained = canceled_operation(&engine)
        .and_then(|value| Ok(value + 1))
        .expect("attach failed");

    let err = chained.get().expect_err("canceled operation must fail");
    assert!(err.cause().is_canceled());
}

/// Test: a whole pipeline releases every future handle
#[test]
fn test_pipeline_releases_all_handles() {
    let engine = Arc::new(InProcessEngine::new());
    {
        let result = native_operation(&engine, Duration::from_millis(10), 4)
            .and_then(|value| Ok(value * 2))
            .expect("attach failed");
        assert_eq!(result.get().expect("pipeline failed"), 8);
    }
    wait_until(|| engine.handle_count() == 0);
}

/// Test: an event thread consumes results without ever parking
#[test]
fn test_event_thread_stays_nonblocking() {
    let engine = Arc::new(InProcessEngine::new());
    let future = native_operation(&engine, Duration::from_millis(30), 9);

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        blocking::forbid_blocking();

        // Direct waiting is rejected on this thread.
        let denied = future.get().expect_err("blocking must be refused");
        assert!(matches!(
            denied.cause(),
            bridge_types::BridgeError::BlockingDisallowed
        ));

        // A continuation delivers the value instead.
        let _done = future
            .then(move |f| {
                let value = f.get().map_err(FutureError::into_cause)?;
                sender.send(value).ok();
                Ok(())
            })
            .expect("attach failed");
    });

    assert_eq!(receiver.recv_timeout(Duration::from_secs(5)).unwrap(), 9);
}
