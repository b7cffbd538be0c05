//! Per-thread blocking policy.
//!
//! Event and UI threads must not park on a future. Marking such a thread
//! makes `get` and `block` fail fast with `BlockingDisallowed` instead of
//! hanging; the policy is advisory and per-thread.

use std::cell::Cell;

thread_local! {
    static BLOCKING_FORBIDDEN: Cell<bool> = Cell::new(false);
}

/// Forbids blocking future operations on the current thread.
pub fn forbid_blocking() {
    BLOCKING_FORBIDDEN.with(|flag| flag.set(true));
}

/// Re-allows blocking future operations on the current thread.
pub fn allow_blocking() {
    BLOCKING_FORBIDDEN.with(|flag| flag.set(false));
}

/// Whether the current thread may block on a future.
pub fn blocking_allowed() -> bool {
    BLOCKING_FORBIDDEN.with(|flag| !flag.get())
}
