//! Error taxonomy for the future bridge.
//!
//! Native engine errors and errors raised inside user continuations travel
//! through the same result channel, so callers cannot distinguish the origin
//! by type alone. `get()` wraps whichever one is present in a [`FutureError`]
//! envelope that keeps the original cause reachable for diagnostics.

use std::sync::Arc;

use thiserror::Error;

/// Error codes reported by the native engine.
///
/// These correspond to the engine's error table and are surfaced verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// An argument did not satisfy the operation's preconditions
    InvalidArgument,
    /// Unexpected failure inside the engine
    InternalError,
    /// A network operation failed
    NetworkError,
    /// The operation was attempted in an invalid state
    PreconditionFailed,
    /// The underlying operation was canceled
    OperationCanceled,
    /// The operation is not allowed for this caller
    OperationForbidden,
    /// A payload could not be decrypted
    DecryptionFailed,
    /// A group exceeded the engine's size limit
    GroupTooBig,
    /// The requested resource does not exist
    NotFound,
    /// The resource already exists
    AlreadyExists,
    /// Authentication material was rejected
    InvalidCredentials,
    /// Too many attempts; the engine is throttling
    TooManyAttempts,
    /// Credential or session material expired
    Expired,
    /// The device was revoked
    DeviceRevoked,
}

/// A raw error reported by the native engine for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("native error {code:?}: {message}")]
pub struct NativeError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable message from the engine
    pub message: String,
}

impl NativeError {
    /// Creates an internal-error value for states the bridge treats as bugs.
    pub fn internal(message: impl Into<String>) -> Self {
        NativeError {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }
}

/// A plain-text error raised inside a user continuation.
///
/// Continuations that have no richer error type to report can use this to
/// carry a message through the result channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ContinuationMessage(pub String);

/// Unified error delivered through the future result channel.
///
/// Cloneable so a stored error can be observed repeatedly (`get_error`
/// followed by `get`, or aggregation reading element outcomes).
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The native engine reported a failure.
    #[error(transparent)]
    Native(NativeError),

    /// The underlying operation was canceled externally.
    #[error("operation canceled: {0}")]
    Canceled(NativeError),

    /// A user continuation raised an error.
    #[error("continuation raised: {0}")]
    Callback(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A second continuation was attached to the same future instance.
    #[error("cannot attach multiple continuations to the same future")]
    ReentrantAttach,

    /// An adopted inner future already had a continuation attached.
    #[error("inner future already has a continuation attached")]
    AlreadyAttachedInner,

    /// `get`/`block` was called on a thread where blocking is forbidden.
    #[error("blocking on a future is forbidden on this thread")]
    BlockingDisallowed,
}

impl BridgeError {
    /// Wraps an arbitrary error raised inside a user continuation.
    pub fn callback<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BridgeError::Callback(Arc::new(cause))
    }

    /// Wraps a plain message raised inside a user continuation.
    pub fn message(text: impl Into<String>) -> Self {
        BridgeError::Callback(Arc::new(ContinuationMessage(text.into())))
    }

    /// The original error raised inside a continuation, if any.
    pub fn continuation_cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            BridgeError::Callback(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Whether this error reports an externally canceled operation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, BridgeError::Canceled(_))
    }
}

impl From<NativeError> for BridgeError {
    fn from(err: NativeError) -> Self {
        if err.code == ErrorCode::OperationCanceled {
            BridgeError::Canceled(err)
        } else {
            BridgeError::Native(err)
        }
    }
}

/// Envelope returned by `get()` when a future resolved to an error.
///
/// Preserves the stored error as its cause so both the failure point and the
/// original failure stay visible.
#[derive(Debug, Clone, Error)]
#[error("future is in an error state")]
pub struct FutureError {
    #[source]
    cause: BridgeError,
}

impl FutureError {
    /// Wraps a stored error.
    pub fn new(cause: BridgeError) -> Self {
        FutureError { cause }
    }

    /// The stored error that made the future fail.
    pub fn cause(&self) -> &BridgeError {
        &self.cause
    }

    /// Unwraps the envelope, returning the stored error.
    pub fn into_cause(self) -> BridgeError {
        self.cause
    }
}

impl From<BridgeError> for FutureError {
    fn from(cause: BridgeError) -> Self {
        FutureError::new(cause)
    }
}
