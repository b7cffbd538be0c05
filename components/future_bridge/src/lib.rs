//! Future/promise bridge over the native async primitive.
//!
//! This crate wraps the engine's single-assignment handles in
//! [`ManagedFuture`], a typed, chainable future value:
//! - [`ManagedFuture`] - typed future with `then`, `and_then`, unwrap
//!   variants, `or_else`
//! - [`all_of`] - ordered aggregation of independent futures
//! - [`scheduler`] - shared worker pool running continuation bodies off the
//!   native notifying threads
//! - [`keep_alive`] - registry pinning futures targeted by pending native
//!   callbacks
//! - [`blocking`] - per-thread policy that turns forbidden blocking into a
//!   fast failure
//!
//! # Examples
//!
//! ```
//! use future_bridge::ManagedFuture;
//!
//! let answer = ManagedFuture::ready()
//!     .then(|_| Ok(6 * 7))
//!     .unwrap();
//! assert_eq!(answer.get().unwrap(), 42);
//! ```
//!
//! ## Chaining
//!
//! ```
//! use future_bridge::ManagedFuture;
//!
//! let rounded = ManagedFuture::ready()
//!     .then(|_| Ok(170.37))
//!     .unwrap()
//!     .then(|tenths| Ok((tenths.get().map_err(|e| e.into_cause())? / 10.0) as i64))
//!     .unwrap();
//! assert_eq!(rounded.get().unwrap(), 17);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod all_of;
pub mod blocking;
pub mod completion;
pub mod future;
pub mod handle;
pub mod keep_alive;
pub mod scheduler;

pub use all_of::all_of;
pub use completion::CompletionHandler;
pub use future::ManagedFuture;
pub use handle::OwnedHandle;
