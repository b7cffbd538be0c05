//! Contract consumed from the native async primitive.
//!
//! One method per native entry point. All methods are callable from any
//! thread; the engine serializes internally. Handles are opaque integers
//! with manual lifetime: each future handle must be destroyed exactly once,
//! including the intermediate handles returned by [`AsyncApi::future_then`].

use bridge_types::{NativeError, RawValue};

/// Opaque identifier of a native single-assignment future.
pub type FutureHandle = u64;

/// Opaque identifier of a native write-once promise.
pub type PromiseHandle = u64;

/// One-shot continuation registered against a future handle.
///
/// Invoked exactly once, asynchronously, on an unspecified thread, after the
/// future becomes ready. The continuation receives no payload; the value or
/// error must be re-fetched from the original handle.
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Operations required from the native async primitive.
///
/// Object-safe so the bridge can hold the engine behind `Arc<dyn AsyncApi>`
/// and tests can substitute their own implementation.
pub trait AsyncApi: Send + Sync {
    /// Non-blocking readiness poll.
    fn future_is_ready(&self, future: FutureHandle) -> bool;

    /// Blocks the calling thread until the future is ready.
    fn future_wait(&self, future: FutureHandle);

    /// Whether the future holds an error. Valid only once ready.
    fn future_has_error(&self, future: FutureHandle) -> bool;

    /// The error of a ready future, if any.
    fn future_get_error(&self, future: FutureHandle) -> Option<NativeError>;

    /// Raw value of a ready, error-free future.
    ///
    /// The payload is interpreted by the decoder the caller declared; the
    /// engine attaches no type information.
    fn future_get_value(&self, future: FutureHandle) -> RawValue;

    /// Registers a one-shot continuation fired on readiness.
    ///
    /// Returns a completion handle representing the continuation's own
    /// completion; the caller owns it and must destroy it.
    fn future_then(&self, future: FutureHandle, continuation: Continuation) -> FutureHandle;

    /// Releases the native resources behind a handle. Exactly once per handle.
    fn future_destroy(&self, future: FutureHandle);

    /// Creates a fresh pending promise.
    fn promise_create(&self) -> PromiseHandle;

    /// The future produced by a promise.
    fn promise_get_future(&self, promise: PromiseHandle) -> FutureHandle;

    /// Fulfills the promise with a raw value. Exactly once per promise.
    fn promise_set_value(&self, promise: PromiseHandle, value: RawValue);

    /// Releases the promise. Futures obtained from it stay valid.
    fn promise_destroy(&self, promise: PromiseHandle);
}
