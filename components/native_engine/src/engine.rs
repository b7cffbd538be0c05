//! In-process implementation of the native async primitive.
//!
//! Futures and promises are integer handles into a table of shared
//! single-assignment cells. Continuations are delivered on freshly spawned
//! threads, reproducing the foreign-thread delivery of the real engine: the
//! bridge must never assume a continuation runs on a thread it knows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use parking_lot::{Condvar, Mutex};

use bridge_types::{NativeError, RawValue};

use crate::api::{AsyncApi, Continuation, FutureHandle, PromiseHandle};

/// A continuation waiting on a cell, paired with the cell that reports its
/// own completion back to the registrant.
struct PendingContinuation {
    continuation: Continuation,
    completion: Arc<Cell>,
}

struct CellState {
    ready: bool,
    value: RawValue,
    error: Option<NativeError>,
    continuations: Vec<PendingContinuation>,
}

/// One single-assignment result cell.
///
/// Transitions pending -> ready exactly once and never reverts.
struct Cell {
    state: Mutex<CellState>,
    ready_cv: Condvar,
}

impl Cell {
    fn new_pending() -> Arc<Cell> {
        Arc::new(Cell {
            state: Mutex::new(CellState {
                ready: false,
                value: 0,
                error: None,
                continuations: Vec::new(),
            }),
            ready_cv: Condvar::new(),
        })
    }

    /// Assigns the cell's result and releases waiters and continuations.
    /// A second assignment is ignored.
    fn settle(&self, value: RawValue, error: Option<NativeError>) {
        let pending = {
            let mut state = self.state.lock();
            if state.ready {
                log::warn!("ignoring second assignment to a ready cell");
                return;
            }
            state.ready = true;
            state.value = value;
            state.error = error;
            self.ready_cv.notify_all();
            std::mem::take(&mut state.continuations)
        };
        for entry in pending {
            fire(entry);
        }
    }
}

/// Runs one continuation on its own thread and settles its completion cell.
fn fire(entry: PendingContinuation) {
    thread::spawn(move || {
        (entry.continuation)();
        entry.completion.settle(0, None);
    });
}

/// In-process native engine.
///
/// Implements the [`AsyncApi`] contract over a table of cells. Misuse of the
/// contract (unknown handles, reads before readiness) is logged rather than
/// escalated, matching the leniency of the native library.
pub struct InProcessEngine {
    futures: Mutex<HashMap<FutureHandle, Arc<Cell>>>,
    promises: Mutex<HashMap<PromiseHandle, Arc<Cell>>>,
    next_handle: AtomicU64,
}

impl InProcessEngine {
    /// Creates an engine with no live handles.
    pub fn new() -> Self {
        InProcessEngine {
            futures: Mutex::new(HashMap::new()),
            promises: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn allocate_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn future_cell(&self, handle: FutureHandle) -> Option<Arc<Cell>> {
        let cell = self.futures.lock().get(&handle).cloned();
        if cell.is_none() {
            log::warn!("operation on unknown future handle {handle}");
        }
        cell
    }

    fn promise_cell(&self, handle: PromiseHandle) -> Option<Arc<Cell>> {
        let cell = self.promises.lock().get(&handle).cloned();
        if cell.is_none() {
            log::warn!("operation on unknown promise handle {handle}");
        }
        cell
    }

    /// Fails the promise with a native error.
    ///
    /// The consumed contract has no error assignment; the real engine fails
    /// futures from inside its own operations. This hook lets tests and
    /// external-operation stand-ins produce native failures, including
    /// canceled operations.
    pub fn promise_set_error(&self, promise: PromiseHandle, error: NativeError) {
        if let Some(cell) = self.promise_cell(promise) {
            cell.settle(0, Some(error));
        }
    }

    /// Number of live future handles, for leak checks.
    pub fn handle_count(&self) -> usize {
        self.futures.lock().len()
    }
}

impl Default for InProcessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncApi for InProcessEngine {
    fn future_is_ready(&self, future: FutureHandle) -> bool {
        match self.future_cell(future) {
            Some(cell) => cell.state.lock().ready,
            None => false,
        }
    }

    fn future_wait(&self, future: FutureHandle) {
        if let Some(cell) = self.future_cell(future) {
            let mut state = cell.state.lock();
            while !state.ready {
                cell.ready_cv.wait(&mut state);
            }
        }
    }

    fn future_has_error(&self, future: FutureHandle) -> bool {
        match self.future_cell(future) {
            Some(cell) => {
                let state = cell.state.lock();
                state.ready && state.error.is_some()
            }
            None => false,
        }
    }

    fn future_get_error(&self, future: FutureHandle) -> Option<NativeError> {
        let cell = self.future_cell(future)?;
        let state = cell.state.lock();
        if !state.ready {
            return None;
        }
        state.error.clone()
    }

    fn future_get_value(&self, future: FutureHandle) -> RawValue {
        match self.future_cell(future) {
            Some(cell) => {
                let state = cell.state.lock();
                if !state.ready {
                    log::warn!("value read from pending future handle {future}");
                    return 0;
                }
                state.value
            }
            None => 0,
        }
    }

    fn future_then(&self, future: FutureHandle, continuation: Continuation) -> FutureHandle {
        let completion = Cell::new_pending();
        let completion_handle = self.allocate_handle();
        self.futures
            .lock()
            .insert(completion_handle, completion.clone());

        if let Some(cell) = self.future_cell(future) {
            let entry = PendingContinuation {
                continuation,
                completion,
            };
            let immediate = {
                let mut state = cell.state.lock();
                if state.ready {
                    Some(entry)
                } else {
                    state.continuations.push(entry);
                    None
                }
            };
            // Already-ready futures still deliver asynchronously.
            if let Some(entry) = immediate {
                fire(entry);
            }
        }
        completion_handle
    }

    fn future_destroy(&self, future: FutureHandle) {
        if self.futures.lock().remove(&future).is_none() {
            log::warn!("destroy of unknown future handle {future}");
        }
    }

    fn promise_create(&self) -> PromiseHandle {
        let handle = self.allocate_handle();
        self.promises.lock().insert(handle, Cell::new_pending());
        handle
    }

    fn promise_get_future(&self, promise: PromiseHandle) -> FutureHandle {
        let cell = match self.promise_cell(promise) {
            Some(cell) => cell,
            None => Cell::new_pending(),
        };
        let handle = self.allocate_handle();
        self.futures.lock().insert(handle, cell);
        handle
    }

    fn promise_set_value(&self, promise: PromiseHandle, value: RawValue) {
        if let Some(cell) = self.promise_cell(promise) {
            cell.settle(value, None);
        }
    }

    fn promise_destroy(&self, promise: PromiseHandle) {
        if self.promises.lock().remove(&promise).is_none() {
            log::warn!("destroy of unknown promise handle {promise}");
        }
    }
}

/// Process-wide engine used when no explicit engine is supplied.
pub fn default_engine() -> Arc<InProcessEngine> {
    static ENGINE: OnceLock<Arc<InProcessEngine>> = OnceLock::new();
    ENGINE.get_or_init(|| Arc::new(InProcessEngine::new())).clone()
}
