use super::entry::{ARMED, CANCELLED, FIRED, TimerEntry};
use crate::error::{Error, Result};

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BinaryHeap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cancelled entries are purged from the heap once they make up at least
/// half of it and number more than this.
const PURGE_THRESHOLD: usize = 64;

static GLOBAL: OnceLock<Arc<Timer>> = OnceLock::new();

/// A one-shot timer service backed by a single thread.
///
/// Callbacks run on the timer thread, in deadline order. They should be
/// short; anything heavier belongs on a pool.
pub struct Timer {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    state: Mutex<State>,

    /// Wakes the timer thread when an earlier deadline arrives or on
    /// shutdown.
    condvar: Condvar,
}

struct State {
    heap: BinaryHeap<TimerEntry>,

    /// Next scheduling sequence number.
    seq: u64,

    /// Approximate number of cancelled entries still in the heap.
    cancelled: usize,

    shutdown: bool,
}

impl Timer {
    /// Starts a timer service with its own thread.
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                seq: 0,
                cancelled: 0,
                shutdown: false,
            }),
            condvar: Condvar::new(),
        });

        let runner = shared.clone();
        let thread = thread::Builder::new()
            .name("ordo-timer".to_string())
            .spawn(move || runner.run())
            .map_err(Error::flatten)?;

        Ok(Self {
            shared,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Returns the process-wide timer, starting it on first use.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to spawn the timer thread.
    pub fn global() -> Arc<Timer> {
        GLOBAL
            .get_or_init(|| Arc::new(Timer::new().expect("failed to start the global timer")))
            .clone()
    }

    /// Runs `callback` on the timer thread once `delay` has elapsed.
    ///
    /// Dropping or cancelling the returned handle before the deadline
    /// prevents the callback from running. A `delay` too large to be
    /// represented as an [`Instant`] never elapses: the callback is dropped
    /// right away and never runs.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(ARMED));

        let Some(deadline) = Instant::now().checked_add(delay) else {
            debug!(?delay, "timer delay out of range, never firing");

            // Not in the heap, so cancelling it must not count as stale.
            return TimerHandle {
                state,
                shared: Weak::new(),
                detached: false,
            };
        };

        let mut guard = self.shared.state.lock();

        if guard.cancelled > PURGE_THRESHOLD && guard.cancelled * 2 >= guard.heap.len() {
            guard.heap.retain(|entry| !entry.is_cancelled());
            guard.cancelled = 0;
        }

        let seq = guard.seq;
        guard.seq += 1;

        let earliest = guard
            .heap
            .peek()
            .map_or(true, |head| deadline < head.deadline);

        guard.heap.push(TimerEntry {
            deadline,
            seq,
            callback: Box::new(callback),
            state: state.clone(),
        });
        drop(guard);

        if earliest {
            self.shared.condvar.notify_one();
        }

        TimerHandle {
            state,
            shared: Arc::downgrade(&self.shared),
            detached: false,
        }
    }

    /// Number of entries waiting in the heap, cancelled ones included.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().heap.len()
    }
}

impl Shared {
    fn run(&self) {
        debug!("timer thread started");

        let mut state = self.state.lock();

        loop {
            if state.shutdown {
                break;
            }

            let Some(head) = state.heap.peek() else {
                self.condvar.wait(&mut state);
                continue;
            };

            if head.is_cancelled() {
                let stale = state.heap.pop();
                state.cancelled = state.cancelled.saturating_sub(1);

                // A callback may own values that touch the timer on drop.
                MutexGuard::unlocked(&mut state, || drop(stale));
                continue;
            }

            let deadline = head.deadline;
            if deadline > Instant::now() {
                let _ = self.condvar.wait_until(&mut state, deadline);
                continue;
            }

            let Some(entry) = state.heap.pop() else {
                continue;
            };

            if !entry.claim() {
                state.cancelled = state.cancelled.saturating_sub(1);
                MutexGuard::unlocked(&mut state, || drop(entry));
                continue;
            }

            // Callbacks may schedule or cancel timers themselves.
            drop(state);

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(entry.callback)) {
                let error = Error::from_panic(payload);
                warn!(%error, "timer callback panicked");
            }

            state = self.state.lock();
        }

        debug!("timer thread stopped");
    }

    fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.condvar.notify_all();
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for Timer {
    /// Stops the timer thread; entries that have not fired are dropped.
    fn drop(&mut self) {
        self.shared.shutdown();

        if let Some(handle) = self.thread.get_mut().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Handle to a scheduled timer entry.
///
/// Dropping the handle cancels the entry, like calling
/// [`cancel`](Self::cancel). Use [`detach`](Self::detach) to let it fire
/// without keeping the handle.
#[must_use = "dropping a TimerHandle cancels the timer"]
pub struct TimerHandle {
    state: Arc<AtomicU8>,
    shared: Weak<Shared>,

    /// Set by `detach`; skips cancellation on drop.
    detached: bool,
}

impl TimerHandle {
    /// Cancels the entry.
    ///
    /// Returns `true` if the callback had not started and never will.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(ARMED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if cancelled {
            if let Some(shared) = self.shared.upgrade() {
                shared.state.lock().cancelled += 1;
            }
        }

        cancelled
    }

    /// Returns `true` once the timer thread has claimed the entry.
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// Releases the handle without cancelling the entry.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if !self.detached {
            self.cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish()
    }
}
