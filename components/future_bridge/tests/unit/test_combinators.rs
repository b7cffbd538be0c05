//! Unit tests for the continuation combinators

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bridge_types::{BridgeError, ErrorCode, FutureError, NativeDecode, NativeError};
use future_bridge::ManagedFuture;
use native_engine::{AsyncApi, InProcessEngine, PromiseHandle};

fn pending<T: NativeDecode>(engine: &Arc<InProcessEngine>) -> (PromiseHandle, ManagedFuture<T>) {
    let promise = engine.promise_create();
    let handle = engine.promise_get_future(promise);
    let api: Arc<dyn AsyncApi> = engine.clone();
    (promise, ManagedFuture::from_handle(api, handle))
}

mod then_tests {
    use super::*;

    #[test]
    fn test_then_maps_the_outcome() {
        let engine = Arc::new(InProcessEngine::new());
        let (promise, future) = pending::<i64>(&engine);

        let doubled = future
            .then(|f| Ok(f.get().map_err(FutureError::into_cause)? * 2))
            .unwrap();

        engine.promise_set_value(promise, 21);
        assert_eq!(doubled.get().unwrap(), 42);
    }

    #[test]
    fn test_then_returns_before_the_antecedent_resolves() {
        let engine = Arc::new(InProcessEngine::new());
        let (_promise, future) = pending::<i64>(&engine);

        let derived = future.then(|_| Ok(())).unwrap();
        assert!(!derived.is_ready());
    }

    #[test]
    fn test_then_runs_on_errored_futures_too() {
        let engine = Arc::new(InProcessEngine::new());
        let (promise, future) = pending::<i64>(&engine);
        engine.promise_set_error(promise, NativeError::internal("broken"));

        let observed = future
            .then(|f| Ok(f.get_error().is_some()))
            .unwrap();
        assert!(observed.get().unwrap());
    }

    #[test]
    fn test_callback_error_keeps_its_message() {
        let failed: ManagedFuture<i64> = ManagedFuture::ready()
            .then(|_| Err(BridgeError::message("Error")))
            .unwrap();

        let err = failed.get().unwrap_err();
        let cause = err.cause().continuation_cause().unwrap();
        assert_eq!(cause.to_string(), "Error");
    }

    #[test]
    fn test_callback_panic_becomes_an_error() {
        let failed: ManagedFuture<i64> = ManagedFuture::ready()
            .then(|_| -> Result<i64, BridgeError> { panic!("kaboom") })
            .unwrap();

        let err = failed.get().unwrap_err();
        let cause = err.cause().continuation_cause().unwrap();
        assert!(cause.to_string().contains("kaboom"));
    }

    #[test]
    fn test_blocking_inside_a_continuation_does_not_starve() {
        let engine = Arc::new(InProcessEngine::new());
        let (outer_promise, outer) = pending::<i64>(&engine);
        let (inner_promise, inner) = pending::<i64>(&engine);

        let inner_chain = inner
            .then(|f| f.get().map_err(FutureError::into_cause))
            .unwrap();
        let outer_chain = outer
            .then(move |_| inner_chain.get().map_err(FutureError::into_cause))
            .unwrap();

        // The outer continuation blocks on the inner chain; the inner chain
        // resolves only afterwards, so a worker must be free to run it.
        engine.promise_set_value(outer_promise, 0);
        thread::sleep(Duration::from_millis(25));
        engine.promise_set_value(inner_promise, 9);

        assert_eq!(outer_chain.get().unwrap(), 9);
    }
}

mod then_unwrap_tests {
    use super::*;

    #[test]
    fn test_adopts_the_inner_outcome() {
        let engine = Arc::new(InProcessEngine::new());
        let (inner_promise, inner) = pending::<i64>(&engine);
        let api: Arc<dyn AsyncApi> = engine.clone();

        let chained = ManagedFuture::ready_on(api)
            .then_unwrap(move |_| Ok(inner))
            .unwrap();

        // The derived future must track the inner one, not the callback's
        // return.
        thread::sleep(Duration::from_millis(25));
        assert!(!chained.is_ready());

        engine.promise_set_value(inner_promise, 21);
        assert_eq!(chained.get().unwrap(), 21);
    }

    #[test]
    fn test_inner_error_becomes_the_outcome() {
        let engine = Arc::new(InProcessEngine::new());
        let (inner_promise, inner) = pending::<i64>(&engine);
        let api: Arc<dyn AsyncApi> = engine.clone();
        engine.promise_set_error(
            inner_promise,
            NativeError {
                code: ErrorCode::NotFound,
                message: "missing".to_string(),
            },
        );

        let chained = ManagedFuture::ready_on(api)
            .then_unwrap(move |_| Ok(inner))
            .unwrap();

        let err = chained.get().unwrap_err();
        match err.cause() {
            BridgeError::Native(native) => assert_eq!(native.code, ErrorCode::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_callback_error_short_circuits_adoption() {
        let chained: ManagedFuture<i64> = ManagedFuture::ready()
            .then_unwrap(|_| Err(BridgeError::message("no inner")))
            .unwrap();

        let err = chained.get().unwrap_err();
        assert_eq!(
            err.cause().continuation_cause().unwrap().to_string(),
            "no inner"
        );
    }

    #[test]
    fn test_already_attached_inner_is_rejected() {
        let engine = Arc::new(InProcessEngine::new());
        let (_inner_promise, inner) = pending::<i64>(&engine);
        let api: Arc<dyn AsyncApi> = engine.clone();

        let _claimed = inner.then(|_| Ok(())).unwrap();

        let chained = ManagedFuture::ready_on(api)
            .then_unwrap(move |_| Ok(inner))
            .unwrap();

        chained.block().unwrap();
        assert!(matches!(
            chained.get_error(),
            Some(BridgeError::AlreadyAttachedInner)
        ));
    }
}

mod and_then_tests {
    use super::*;

    #[test]
    fn test_maps_the_value() {
        let engine = Arc::new(InProcessEngine::new());
        let (promise, future) = pending::<i64>(&engine);

        let bumped = future.and_then(|value| Ok(value + 1)).unwrap();
        engine.promise_set_value(promise, 20);
        assert_eq!(bumped.get().unwrap(), 21);
    }

    #[test]
    fn test_skipped_on_error_and_error_forwarded_unchanged() {
        let engine = Arc::new(InProcessEngine::new());
        let (promise, future) = pending::<i64>(&engine);
        engine.promise_set_error(
            promise,
            NativeError {
                code: ErrorCode::NetworkError,
                message: "offline".to_string(),
            },
        );

        let invoked = Arc::new(AtomicBool::new(false));
        let witness = invoked.clone();
        let chained = future
            .and_then(move |value| {
                witness.store(true, Ordering::SeqCst);
                Ok(value + 1)
            })
            .unwrap();

        let err = chained.get().unwrap_err();
        assert!(!invoked.load(Ordering::SeqCst));
        match err.cause() {
            BridgeError::Native(native) => {
                assert_eq!(native.code, ErrorCode::NetworkError);
                assert_eq!(native.message, "offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unwrap_variant_adopts_on_success_only() {
        let engine = Arc::new(InProcessEngine::new());
        let (outer_promise, outer) = pending::<i64>(&engine);
        let (inner_promise, inner) = pending::<i64>(&engine);
        engine.promise_set_value(inner_promise, 30);

        let chained = outer
            .and_then_unwrap(move |value| {
                assert_eq!(value, 3);
                Ok(inner)
            })
            .unwrap();

        engine.promise_set_value(outer_promise, 3);
        assert_eq!(chained.get().unwrap(), 30);
    }

    #[test]
    fn test_unwrap_variant_forwards_errors() {
        let engine = Arc::new(InProcessEngine::new());
        let (outer_promise, outer) = pending::<i64>(&engine);
        let (_inner_promise, inner) = pending::<i64>(&engine);
        engine.promise_set_error(outer_promise, NativeError::internal("broken"));

        let chained = outer.and_then_unwrap(move |_| Ok(inner)).unwrap();

        let err = chained.get().unwrap_err();
        assert!(matches!(err.cause(), BridgeError::Native(_)));
    }
}

mod or_else_tests {
    use super::*;

    #[test]
    fn test_recovers_from_an_error() {
        let engine = Arc::new(InProcessEngine::new());
        let (promise, future) = pending::<i64>(&engine);
        engine.promise_set_error(promise, NativeError::internal("broken"));

        let recovered = future.or_else(|_| Ok(5)).unwrap();
        assert_eq!(recovered.get().unwrap(), 5);
    }

    #[test]
    fn test_skipped_on_success() {
        let engine = Arc::new(InProcessEngine::new());
        let (promise, future) = pending::<i64>(&engine);
        engine.promise_set_value(promise, 8);

        let invoked = Arc::new(AtomicBool::new(false));
        let witness = invoked.clone();
        let passed = future
            .or_else(move |_| {
                witness.store(true, Ordering::SeqCst);
                Ok(0)
            })
            .unwrap();

        assert_eq!(passed.get().unwrap(), 8);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[test]
    fn test_handler_sees_the_original_error() {
        let engine = Arc::new(InProcessEngine::new());
        let (promise, future) = pending::<i64>(&engine);
        engine.promise_set_error(
            promise,
            NativeError {
                code: ErrorCode::Expired,
                message: "stale".to_string(),
            },
        );

        let inspected = future
            .or_else(|err| match err {
                BridgeError::Native(native) if native.code == ErrorCode::Expired => Ok(1),
                _ => Err(BridgeError::message("unexpected error")),
            })
            .unwrap();
        assert_eq!(inspected.get().unwrap(), 1);
    }
}
