//! Shared continuation scheduler.
//!
//! The engine signals readiness on threads outside the bridge's control.
//! Running a user callback there would block the engine, and a callback that
//! itself waits on another future could deadlock it. Every continuation body
//! therefore runs here instead.
//!
//! The pool is cached and unbounded: a job arriving while no worker is idle
//! grows the pool, so a body blocked in `get()` can never starve the jobs it
//! is waiting for. Idle workers retire after a timeout.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

struct PoolState {
    queue: VecDeque<Job>,
    idle: usize,
    workers: usize,
}

struct PoolShared {
    state: Mutex<PoolState>,
    work_cv: Condvar,
}

/// Cached worker pool executing continuation bodies.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<PoolShared>,
}

impl Scheduler {
    /// Creates an empty pool; workers are spawned on demand.
    pub fn new() -> Self {
        Scheduler {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    idle: 0,
                    workers: 0,
                }),
                work_cv: Condvar::new(),
            }),
        }
    }

    /// Queues `job`, growing the pool if every worker is busy.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let grow = {
            let mut state = self.shared.state.lock();
            state.queue.push_back(Box::new(job));
            // A notified worker stays counted as idle until its wait
            // returns, so an idle worker may already be claimed by an
            // earlier job. Grow on demand exceeding idle capacity, not on
            // the mere absence of idle workers.
            if state.queue.len() > state.idle {
                state.workers += 1;
                true
            } else {
                self.shared.work_cv.notify_one();
                false
            }
        };
        if grow {
            let shared = self.shared.clone();
            thread::spawn(move || worker_loop(shared));
            log::debug!("scheduler grew by one worker");
        }
    }

    /// Number of live workers.
    pub fn worker_count(&self) -> usize {
        self.shared.state.lock().workers
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if let Some(job) = state.queue.pop_front() {
                    break job;
                }
                state.idle += 1;
                let timed_out = shared
                    .work_cv
                    .wait_for(&mut state, IDLE_TIMEOUT)
                    .timed_out();
                state.idle -= 1;
                if timed_out && state.queue.is_empty() {
                    state.workers -= 1;
                    log::debug!("idle scheduler worker retired");
                    return;
                }
            }
        };
        job();
    }
}

/// Process-wide scheduler shared by every future chain.
pub fn shared() -> &'static Scheduler {
    static SHARED: OnceLock<Scheduler> = OnceLock::new();
    SHARED.get_or_init(Scheduler::new)
}
