//! Debounced action scheduler.
//!
//! Coalesces bursts of requests per key: each `schedule` call for a key
//! replaces the pending action and pushes its deadline out by the configured
//! delay, so only the last action of a burst runs, once.
//!
//! ```text
//! schedule(k) ──► pending[k] = (now + delay, action)
//!                     │
//!   timer thread ─────┴─► deadline passed && k not running
//!                              │
//!                              ▼
//!                      worker pool ──► action(k) ──► running.remove(k)
//! ```
//!
//! Actions for the same key never overlap: a due entry whose key is still
//! running waits until that run finishes. Actions for different keys run
//! concurrently on the worker pool.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Result, RuntimeError};

/// Default quiet period before a scheduled action runs.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// Upper bound on worker threads.
const MAX_WORKERS: usize = 4;

type Action<K> = Box<dyn FnOnce(&K) + Send + 'static>;

// =============================================================================
// Scheduler
// =============================================================================

/// Per-key debouncer backed by a timer thread and a small worker pool.
///
/// Dropping the scheduler disposes it.
pub struct DebouncedScheduler<K> {
    shared: Arc<Shared<K>>,
}

struct Shared<K> {
    state: Mutex<State<K>>,
    wake: Condvar,
    delay: Duration,
}

struct State<K> {
    pending: FxHashMap<K, Entry<K>>,
    running: FxHashSet<K>,
    disposed: bool,
}

struct Entry<K> {
    deadline: Instant,
    action: Action<K>,
}

impl<K> DebouncedScheduler<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                pending: FxHashMap::default(),
                running: FxHashSet::default(),
                disposed: false,
            }),
            wake: Condvar::new(),
            delay,
        });

        let (jobs_tx, jobs_rx) = channel::unbounded();

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .clamp(2, MAX_WORKERS);
        for _ in 0..workers {
            let shared = Arc::clone(&shared);
            let jobs_rx = jobs_rx.clone();
            thread::spawn(move || shared.run_worker(jobs_rx));
        }

        let timer = Arc::clone(&shared);
        thread::spawn(move || timer.run_timer(jobs_tx));

        Self { shared }
    }

    /// Schedule `action` to run for `key` after the quiet period.
    ///
    /// Replaces any action still pending for `key` and restarts its timer.
    /// Fails with [`RuntimeError::Disposed`] once the scheduler is disposed.
    pub fn schedule<F>(&self, key: K, action: F) -> Result<()>
    where
        F: FnOnce(&K) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.disposed {
            return Err(RuntimeError::Disposed("scheduler"));
        }
        state.pending.insert(
            key,
            Entry {
                deadline: Instant::now() + self.shared.delay,
                action: Box::new(action),
            },
        );
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Cancel every pending action and stop accepting new ones.
    ///
    /// Actions already running are allowed to finish. Idempotent.
    pub fn dispose(&self) {
        let mut state = self.shared.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.pending.clear();
        self.shared.wake.notify_all();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    /// Number of keys with an action waiting for its deadline.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Whether an action for `key` is currently executing.
    pub fn is_running(&self, key: &K) -> bool {
        self.shared.state.lock().running.contains(key)
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay
    }
}

impl<K> Default for DebouncedScheduler<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl<K> Drop for DebouncedScheduler<K> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.disposed = true;
        state.pending.clear();
        self.shared.wake.notify_all();
    }
}

// =============================================================================
// Threads
// =============================================================================

impl<K> Shared<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Hand due entries to the workers, then sleep until the next deadline.
    fn run_timer(&self, jobs: Sender<(K, Action<K>)>) {
        let mut state = self.state.lock();
        loop {
            if state.disposed {
                break;
            }

            let now = Instant::now();
            let due: Vec<K> = state
                .pending
                .iter()
                .filter(|(key, entry)| entry.deadline <= now && !state.running.contains(*key))
                .map(|(key, _)| key.clone())
                .collect();

            for key in due {
                if let Some(entry) = state.pending.remove(&key) {
                    state.running.insert(key.clone());
                    if jobs.send((key, entry.action)).is_err() {
                        return;
                    }
                }
            }

            // Keys still running are woken by their worker, not by a deadline
            let next = state
                .pending
                .iter()
                .filter(|(key, _)| !state.running.contains(*key))
                .map(|(_, entry)| entry.deadline)
                .min();

            match next {
                Some(deadline) => {
                    self.wake.wait_until(&mut state, deadline);
                }
                None => self.wake.wait(&mut state),
            }
        }
        // Dropping `jobs` here lets the workers drain and exit
    }

    fn run_worker(&self, jobs: Receiver<(K, Action<K>)>) {
        for (key, action) in jobs.iter() {
            // Queued but not yet started when disposal happened
            if !self.state.lock().disposed
                && panic::catch_unwind(AssertUnwindSafe(|| action(&key))).is_err()
            {
                crate::log!("error"; "scheduled action panicked");
            }

            let mut state = self.state.lock();
            state.running.remove(&key);
            self.wake.notify_all();
        }
    }
}

#[cfg(test)]
mod tests;
