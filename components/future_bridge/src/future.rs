//! Typed futures over native single-assignment handles.
//!
//! A [`ManagedFuture`] is a typed facade over a shared, type-erased core.
//! Root cores wrap a handle produced by a native operation together with the
//! decoder chosen at construction; derived cores are minted by combinators
//! and hold a result slot plus a handle used purely as a readiness signal.
//!
//! Every combinator is built on the `then` primitive: attaching registers
//! one native continuation, and the continuation body runs on the
//! [scheduler](crate::scheduler), never on the engine's notifying thread.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use bridge_types::{BridgeError, FutureError, NativeDecode, NativeError, RawValue};
use native_engine::{default_engine, AsyncApi, Continuation, FutureHandle, PromiseHandle};

use crate::blocking;
use crate::handle::OwnedHandle;
use crate::keep_alive;
use crate::scheduler;

/// Outcome of a continuation body: stored once, cloned out on read so
/// aggregation does not consume element results.
type Outcome = Result<Arc<dyn Any + Send + Sync>, BridgeError>;

/// Erased decoder fixed when a root future is constructed.
type DecodeFn = fn(RawValue) -> Arc<dyn Any + Send + Sync>;

enum Kind {
    /// Wraps a handle produced by a native operation; the value is decoded
    /// from the raw payload.
    Root { decode: DecodeFn },
    /// Minted by a combinator; the handle is only a readiness signal and
    /// the outcome lives in the slot.
    Derived,
}

/// Type-erased shared state of one future.
pub(crate) struct FutureCore {
    api: Arc<dyn AsyncApi>,
    handle: OwnedHandle,
    kind: Kind,
    /// Set once a continuation is attached; at most one attach per core.
    attached: Mutex<bool>,
    /// Continuation result, for derived cores.
    slot: Mutex<Option<Outcome>>,
}

impl FutureCore {
    fn is_ready(&self) -> bool {
        match self.kind {
            Kind::Root { .. } => self.api.future_is_ready(self.handle.raw()),
            Kind::Derived => self.slot.lock().is_some(),
        }
    }

    fn stored_error(&self) -> Option<BridgeError> {
        match self.kind {
            Kind::Root { .. } => {
                let handle = self.handle.raw();
                if !self.api.future_is_ready(handle) || !self.api.future_has_error(handle) {
                    return None;
                }
                self.api.future_get_error(handle).map(BridgeError::from)
            }
            Kind::Derived => match &*self.slot.lock() {
                Some(Err(err)) => Some(err.clone()),
                _ => None,
            },
        }
    }

    /// Outcome of a ready core. Only called once readiness is established.
    fn outcome(&self) -> Outcome {
        match self.kind {
            Kind::Root { decode } => {
                let handle = self.handle.raw();
                if self.api.future_has_error(handle) {
                    let err = self
                        .api
                        .future_get_error(handle)
                        .unwrap_or_else(|| NativeError::internal("native error unavailable"));
                    Err(BridgeError::from(err))
                } else {
                    Ok(decode(self.api.future_get_value(handle)))
                }
            }
            Kind::Derived => match &*self.slot.lock() {
                Some(outcome) => outcome.clone(),
                None => {
                    log::error!("derived future signalled ready with an empty result slot");
                    Err(BridgeError::Native(NativeError::internal(
                        "continuation result slot is empty",
                    )))
                }
            },
        }
    }

    /// Claims the single attach slot for a combinator.
    fn claim_attach(&self) -> Result<(), BridgeError> {
        let mut attached = self.attached.lock();
        if *attached {
            return Err(BridgeError::ReentrantAttach);
        }
        *attached = true;
        Ok(())
    }

    /// Claims the attach slot on behalf of an adopting outer future.
    fn claim_adoption(&self) -> Result<(), BridgeError> {
        let mut attached = self.attached.lock();
        if *attached {
            return Err(BridgeError::AlreadyAttachedInner);
        }
        *attached = true;
        Ok(())
    }

    fn store(&self, outcome: Outcome) {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            log::error!("continuation result slot written twice");
            return;
        }
        *slot = Some(outcome);
    }

    fn wait(&self) -> Result<(), BridgeError> {
        if !blocking::blocking_allowed() {
            return Err(BridgeError::BlockingDisallowed);
        }
        self.api.future_wait(self.handle.raw());
        Ok(())
    }
}

/// A typed, chainable future over a native async operation.
///
/// Clones share the same underlying state, including the single
/// continuation slot: only one `then`-family attach succeeds per future,
/// regardless of which clone performs it.
pub struct ManagedFuture<T> {
    pub(crate) core: Arc<FutureCore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ManagedFuture<T> {
    fn clone(&self) -> Self {
        ManagedFuture {
            core: self.core.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ManagedFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedFuture")
            .field("handle", &self.core.handle)
            .field("ready", &self.core.is_ready())
            .finish()
    }
}

impl ManagedFuture<()> {
    /// An immediately-ready unit future on the default engine.
    pub fn ready() -> Self {
        Self::ready_on(default_engine())
    }

    /// An immediately-ready unit future on `api`.
    pub fn ready_on(api: Arc<dyn AsyncApi>) -> Self {
        let promise = api.promise_create();
        let handle = api.promise_get_future(promise);
        api.promise_set_value(promise, 0);
        api.promise_destroy(promise);
        Self::from_handle(api, handle)
    }
}

impl<T: Send + Sync + 'static> ManagedFuture<T> {
    /// Wraps a handle returned by a native operation.
    ///
    /// Takes ownership of `handle`; it is destroyed when the last clone of
    /// the future drops. The decoder for `T` is fixed here — the raw
    /// payload carries no type information of its own.
    pub fn from_handle(api: Arc<dyn AsyncApi>, handle: FutureHandle) -> Self
    where
        T: NativeDecode,
    {
        let core = FutureCore {
            api: api.clone(),
            handle: OwnedHandle::new(api, handle),
            kind: Kind::Root {
                decode: decode_erased::<T>,
            },
            attached: Mutex::new(false),
            slot: Mutex::new(None),
        };
        ManagedFuture {
            core: Arc::new(core),
            _marker: PhantomData,
        }
    }

    fn derived(api: Arc<dyn AsyncApi>, handle: FutureHandle) -> Self {
        let core = FutureCore {
            api: api.clone(),
            handle: OwnedHandle::new(api, handle),
            kind: Kind::Derived,
            attached: Mutex::new(false),
            slot: Mutex::new(None),
        };
        ManagedFuture {
            core: Arc::new(core),
            _marker: PhantomData,
        }
    }

    pub(crate) fn api(&self) -> Arc<dyn AsyncApi> {
        self.core.api.clone()
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        self.core.is_ready()
    }

    /// Blocks until the future is ready without decoding a value.
    ///
    /// Fails fast with `BlockingDisallowed` on a thread where blocking is
    /// [forbidden](crate::blocking::forbid_blocking).
    pub fn block(&self) -> Result<(), BridgeError> {
        self.core.wait()
    }

    /// The stored error, if the future resolved to one. Non-blocking;
    /// returns `None` while the future is pending.
    pub fn get_error(&self) -> Option<BridgeError> {
        self.core.stored_error()
    }

    /// Blocks until ready and returns the value.
    ///
    /// An error outcome is wrapped in a [`FutureError`] envelope that
    /// preserves the original cause. Fails fast without blocking on a
    /// thread where blocking is forbidden.
    pub fn get(&self) -> Result<T, FutureError>
    where
        T: Clone,
    {
        self.core.wait().map_err(FutureError::new)?;
        let value = self.core.outcome().map_err(FutureError::new)?;
        match value.downcast::<T>() {
            Ok(typed) => Ok((*typed).clone()),
            Err(_) => {
                log::error!("future resolved to a value of an unexpected type");
                Err(FutureError::new(BridgeError::Native(NativeError::internal(
                    "future value has an unexpected type",
                ))))
            }
        }
    }

    /// Runs `callback` when this future is ready.
    ///
    /// The callback receives the ready future and its return value becomes
    /// the derived future's value; an error return becomes the derived
    /// future's error. Composition is non-blocking: the derived future is
    /// returned immediately.
    ///
    /// Fails synchronously with `ReentrantAttach` if a continuation is
    /// already attached to this future.
    pub fn then<U, F>(&self, callback: F) -> Result<ManagedFuture<U>, BridgeError>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&ManagedFuture<T>) -> Result<U, BridgeError> + Send + 'static,
    {
        self.core.claim_attach()?;

        let api = self.core.api.clone();
        let token = keep_alive::registry().pin(self.core.clone());

        let promise = api.promise_create();
        let derived = ManagedFuture::<U>::derived(api.clone(), api.promise_get_future(promise));

        let antecedent = self.clone();
        let result_core = derived.core.clone();
        let body_api = api.clone();
        let continuation: Continuation = Box::new(move || {
            scheduler::shared().execute(move || {
                let outcome = run_erased(move || callback(&antecedent));
                result_core.store(outcome);
                keep_alive::registry().unpin(token);
                body_api.promise_set_value(promise, 0);
                body_api.promise_destroy(promise);
            });
        });

        let completion = api.future_then(self.core.handle.raw(), continuation);
        api.future_destroy(completion);
        Ok(derived)
    }

    /// Runs `callback` when this future is ready and adopts the future it
    /// returns: the derived future resolves to the inner future's eventual
    /// outcome, never an intermediate state.
    ///
    /// The inner future is consumed by the adoption. It must not already
    /// have a continuation attached, and attaching one afterwards fails.
    pub fn then_unwrap<U, F>(&self, callback: F) -> Result<ManagedFuture<U>, BridgeError>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&ManagedFuture<T>) -> Result<ManagedFuture<U>, BridgeError> + Send + 'static,
    {
        self.core.claim_attach()?;

        let api = self.core.api.clone();
        let token = keep_alive::registry().pin(self.core.clone());

        let promise = api.promise_create();
        let derived = ManagedFuture::<U>::derived(api.clone(), api.promise_get_future(promise));

        let antecedent = self.clone();
        let result_core = derived.core.clone();
        let body_api = api.clone();
        let continuation: Continuation = Box::new(move || {
            scheduler::shared().execute(move || {
                let adoption = run_adoption(callback, &antecedent, &result_core, &body_api, promise);
                if let Err(err) = adoption {
                    result_core.store(Err(err));
                    body_api.promise_set_value(promise, 0);
                    body_api.promise_destroy(promise);
                }
                keep_alive::registry().unpin(token);
            });
        });

        let completion = api.future_then(self.core.handle.raw(), continuation);
        api.future_destroy(completion);
        Ok(derived)
    }

    /// Runs `callback` with the value when this future succeeds; forwards
    /// the error unchanged, without invoking `callback`, otherwise.
    pub fn and_then<U, F>(&self, callback: F) -> Result<ManagedFuture<U>, BridgeError>
    where
        T: Clone,
        U: Send + Sync + 'static,
        F: FnOnce(T) -> Result<U, BridgeError> + Send + 'static,
    {
        self.then(move |antecedent| {
            if let Some(err) = antecedent.get_error() {
                return Err(err);
            }
            let value = antecedent.get().map_err(FutureError::into_cause)?;
            callback(value)
        })
    }

    /// Success-path variant of [`then_unwrap`](Self::then_unwrap): on error
    /// the callback is not invoked and the error is forwarded unchanged.
    pub fn and_then_unwrap<U, F>(&self, callback: F) -> Result<ManagedFuture<U>, BridgeError>
    where
        T: Clone,
        U: Send + Sync + 'static,
        F: FnOnce(T) -> Result<ManagedFuture<U>, BridgeError> + Send + 'static,
    {
        self.then_unwrap(move |antecedent| {
            if let Some(err) = antecedent.get_error() {
                return Err(err);
            }
            let value = antecedent.get().map_err(FutureError::into_cause)?;
            callback(value)
        })
    }

    /// Recovers from an error: on failure `callback` receives the error and
    /// its return value becomes the derived future's success value; on
    /// success the original value is forwarded untouched.
    pub fn or_else<F>(&self, callback: F) -> Result<ManagedFuture<T>, BridgeError>
    where
        T: Clone,
        F: FnOnce(&BridgeError) -> Result<T, BridgeError> + Send + 'static,
    {
        self.then(move |antecedent| match antecedent.get_error() {
            Some(err) => callback(&err),
            None => antecedent.get().map_err(FutureError::into_cause),
        })
    }

    /// Type-erased view sharing this future's state.
    ///
    /// The view shares the single continuation slot with `self`; it exists
    /// so futures of different value types can be aggregated with
    /// [`all_of`](crate::all_of). Reading a value through the erased view
    /// is an error — use the typed handle for that.
    pub fn erase(&self) -> ManagedFuture<()> {
        ManagedFuture {
            core: self.core.clone(),
            _marker: PhantomData,
        }
    }
}

fn decode_erased<T: NativeDecode>(raw: RawValue) -> Arc<dyn Any + Send + Sync> {
    Arc::new(T::decode(raw))
}

/// Runs a continuation body, capturing panics as continuation errors and
/// erasing the value type.
fn run_erased<U, F>(body: F) -> Outcome
where
    U: Send + Sync + 'static,
    F: FnOnce() -> Result<U, BridgeError>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Ok(Arc::new(value)),
        Ok(Err(err)) => Err(err),
        Err(payload) => Err(BridgeError::message(panic_text(payload))),
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "continuation panicked".to_string()
    }
}

/// Runs the unwrap callback and wires the inner future into the outer slot.
///
/// On success the outer promise is signalled later, by the secondary
/// continuation attached to the inner handle; an error return means nothing
/// was wired and the caller stores the error directly.
fn run_adoption<T, U, F>(
    callback: F,
    antecedent: &ManagedFuture<T>,
    outer: &Arc<FutureCore>,
    api: &Arc<dyn AsyncApi>,
    outer_promise: PromiseHandle,
) -> Result<(), BridgeError>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: FnOnce(&ManagedFuture<T>) -> Result<ManagedFuture<U>, BridgeError>,
{
    let inner = match panic::catch_unwind(AssertUnwindSafe(move || callback(antecedent))) {
        Ok(result) => result?,
        Err(payload) => return Err(BridgeError::message(panic_text(payload))),
    };
    inner.core.claim_adoption()?;

    let inner_token = keep_alive::registry().pin(inner.core.clone());
    let inner_core = inner.core.clone();
    let outer_core = outer.clone();
    let copy_api = api.clone();
    let secondary: Continuation = Box::new(move || {
        // Copy step only: no user code runs here and nothing blocks.
        outer_core.store(inner_core.outcome());
        keep_alive::registry().unpin(inner_token);
        copy_api.promise_set_value(outer_promise, 0);
        copy_api.promise_destroy(outer_promise);
    });
    let completion = api.future_then(inner.core.handle.raw(), secondary);
    api.future_destroy(completion);
    Ok(())
}
