//! Boundary to the native asynchronous-operation primitive.
//!
//! The external cryptographic engine exposes single-assignment result
//! containers ("futures") and write-once slots that produce them
//! ("promises"). This crate defines that contract as the [`AsyncApi`] trait
//! and provides [`InProcessEngine`], an in-process implementation of it.
//!
//! The in-process engine backs every test in the workspace and stands in for
//! the vendor library so the workspace is self-contained. It reproduces the
//! delivery model of the real engine: readiness callbacks fire exactly once,
//! asynchronously, on threads the bridge does not control.
//!
//! # Examples
//!
//! ```
//! use native_engine::{AsyncApi, InProcessEngine};
//!
//! let engine = InProcessEngine::new();
//! let promise = engine.promise_create();
//! let future = engine.promise_get_future(promise);
//! assert!(!engine.future_is_ready(future));
//!
//! engine.promise_set_value(promise, 42);
//! engine.promise_destroy(promise);
//! assert!(engine.future_is_ready(future));
//! assert_eq!(engine.future_get_value(future), 42);
//! engine.future_destroy(future);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod engine;

pub use api::{AsyncApi, Continuation, FutureHandle, PromiseHandle};
pub use engine::{default_engine, InProcessEngine};
