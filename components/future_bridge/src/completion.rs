//! Push-style completion callbacks.
//!
//! Some call sites want to hand off a future and be told how it ended
//! rather than chain on it. [`CompletionHandler`] is that observer shape,
//! and [`ManagedFuture::notify`] wires one up through an ordinary
//! continuation.

use bridge_types::{BridgeError, FutureError};

use crate::future::ManagedFuture;

/// Observer told exactly once how a future settled.
///
/// The attachment is opaque caller context carried to whichever callback
/// fires.
pub trait CompletionHandler<V, A>: Send {
    /// Called with the value when the future succeeds.
    fn completed(self, value: V, attachment: A);

    /// Called with the error when the future fails.
    fn failed(self, error: BridgeError, attachment: A);
}

impl<T: Clone + Send + Sync + 'static> ManagedFuture<T> {
    /// Delivers this future's outcome to `handler`, off the caller's
    /// thread, exactly once.
    ///
    /// Claims the continuation slot like any other attach. The returned
    /// future resolves after the handler has run.
    pub fn notify<H, A>(&self, handler: H, attachment: A) -> Result<ManagedFuture<()>, BridgeError>
    where
        H: CompletionHandler<T, A> + 'static,
        A: Send + 'static,
    {
        self.then(move |antecedent| {
            match antecedent.get_error() {
                Some(err) => handler.failed(err, attachment),
                None => {
                    let value = antecedent.get().map_err(FutureError::into_cause)?;
                    handler.completed(value, attachment);
                }
            }
            Ok(())
        })
    }
}
