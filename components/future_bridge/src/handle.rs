//! RAII ownership of native future handles.
//!
//! Native handles are released manually and exactly once. Owning them in a
//! droppable type removes the release from every control-flow path.

use std::fmt;
use std::sync::Arc;

use native_engine::{AsyncApi, FutureHandle};

/// Owns a native future handle and destroys it exactly once on drop.
pub struct OwnedHandle {
    api: Arc<dyn AsyncApi>,
    handle: FutureHandle,
}

impl OwnedHandle {
    /// Takes ownership of `handle`.
    pub fn new(api: Arc<dyn AsyncApi>, handle: FutureHandle) -> Self {
        OwnedHandle { api, handle }
    }

    /// The raw handle, still owned by `self`.
    pub fn raw(&self) -> FutureHandle {
        self.handle
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.api.future_destroy(self.handle);
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedHandle").field(&self.handle).finish()
    }
}
