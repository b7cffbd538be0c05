//! Core types for the native future bridge.
//!
//! This crate provides the foundational types shared by the bridge
//! components: the error taxonomy and the raw-value decoders.
//!
//! # Overview
//!
//! - [`BridgeError`] - Unified error delivered through the future result channel
//! - [`FutureError`] - Envelope returned by a failed `get()`
//! - [`NativeError`] / [`ErrorCode`] - Errors surfaced verbatim from the engine
//! - [`RawValue`] / [`NativeDecode`] - Raw native payloads and their decoders
//!
//! # Examples
//!
//! ```
//! use bridge_types::{BridgeError, ErrorCode, NativeError};
//!
//! // Native errors carry a code and a message
//! let native = NativeError {
//!     code: ErrorCode::NotFound,
//!     message: "resource not found".to_string(),
//! };
//!
//! // Canceled operations become a distinct error kind
//! let canceled = NativeError {
//!     code: ErrorCode::OperationCanceled,
//!     message: "operation canceled".to_string(),
//! };
//! assert!(matches!(BridgeError::from(native), BridgeError::Native(_)));
//! assert!(matches!(BridgeError::from(canceled), BridgeError::Canceled(_)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{BridgeError, ContinuationMessage, ErrorCode, FutureError, NativeError};
pub use value::{NativeDecode, RawPointer, RawValue};
