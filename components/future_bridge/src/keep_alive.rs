//! Keep-alive bookkeeping for futures targeted by pending native callbacks.
//!
//! Once a continuation is registered, the native side can reach back into
//! the bridge at any time, but it holds no strong reference the allocator
//! can see. Entries here substitute for that reference: a future is pinned
//! before the native side could possibly fire its callback and unpinned only
//! after the callback has recorded its result.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// Token identifying one pinned entry.
pub type PinToken = u64;

/// Strong-reference registry for callback targets.
pub struct KeepAliveRegistry {
    entries: Mutex<HashMap<PinToken, Arc<dyn Any + Send + Sync>>>,
    next_token: AtomicU64,
}

impl KeepAliveRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        KeepAliveRegistry {
            entries: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Pins `entry` until the matching [`unpin`](Self::unpin).
    pub fn pin(&self, entry: Arc<dyn Any + Send + Sync>) -> PinToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().insert(token, entry);
        log::trace!("pinned keep-alive entry {token}");
        token
    }

    /// Releases the entry behind `token`.
    pub fn unpin(&self, token: PinToken) {
        if self.entries.lock().remove(&token).is_none() {
            log::warn!("unpin of unknown keep-alive token {token}");
        } else {
            log::trace!("unpinned keep-alive entry {token}");
        }
    }

    /// Number of pinned entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are pinned.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for KeepAliveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide registry used by all futures.
pub fn registry() -> &'static KeepAliveRegistry {
    static REGISTRY: OnceLock<KeepAliveRegistry> = OnceLock::new();
    REGISTRY.get_or_init(KeepAliveRegistry::new)
}
