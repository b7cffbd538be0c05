//! Ordered aggregation of independent futures.

use std::sync::Arc;

use parking_lot::Mutex;

use bridge_types::BridgeError;

use crate::future::ManagedFuture;

/// Resolves once every future in `futures` has settled.
///
/// The aggregate succeeds when all elements succeed. When one or more fail
/// it fails with the error of the earliest element in slice order, not the
/// first to fail in time. Elements keep their own outcomes and stay readable
/// after the aggregate resolves.
///
/// Aggregation adopts each element, claiming its continuation slot; the
/// elements must not have continuations attached, before or after. Mixed
/// value types are aggregated through [`erase`](ManagedFuture::erase).
///
/// An empty slice yields an already-ready future.
pub fn all_of(futures: &[ManagedFuture<()>]) -> Result<ManagedFuture<()>, BridgeError> {
    let api = match futures.first() {
        Some(first) => first.api(),
        None => return Ok(ManagedFuture::ready()),
    };

    // Each chain step adopts one element, so the callback of step i + 1
    // observes element i's outcome. Recording along the chain makes the
    // first recorded error the first in slice order.
    let first_error: Arc<Mutex<Option<BridgeError>>> = Arc::new(Mutex::new(None));
    let mut chain = ManagedFuture::ready_on(api);
    for element in futures {
        let element = element.clone();
        let seen = first_error.clone();
        chain = chain.then_unwrap(move |previous| {
            if let Some(err) = previous.get_error() {
                seen.lock().get_or_insert(err);
            }
            Ok(element)
        })?;
    }

    let seen = first_error;
    chain.then(move |last| {
        if let Some(err) = last.get_error() {
            seen.lock().get_or_insert(err);
        }
        match seen.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    })
}
