use crate::executor::Job;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Global job queue of a thread pool.
///
/// Jobs are pushed at the back and taken from the front. Idle workers park
/// on a condition variable until a job arrives or the pool shuts down.
pub(crate) struct Injector {
    state: Mutex<State>,

    /// Wakes parked workers.
    condvar: Condvar,
}

struct State {
    queue: VecDeque<Job>,

    /// Set once; no job is accepted afterwards.
    shutdown: bool,
}

impl Injector {
    /// Creates a new empty injector.
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Pushes a job and wakes one parked worker.
    ///
    /// Returns the job back if the injector has shut down.
    pub(crate) fn push(&self, job: Job) -> Result<(), Job> {
        let mut state = self.state.lock();

        if state.shutdown {
            return Err(job);
        }

        state.queue.push_back(job);
        drop(state);

        self.condvar.notify_one();
        Ok(())
    }

    /// Takes the next job, parking until one is available.
    ///
    /// Jobs queued before shutdown are still handed out; `None` is
    /// returned only once the injector is shut down and empty.
    pub(crate) fn pop(&self) -> Option<Job> {
        let mut state = self.state.lock();

        loop {
            if let Some(job) = state.queue.pop_front() {
                return Some(job);
            }

            if state.shutdown {
                return None;
            }

            self.condvar.wait(&mut state);
        }
    }

    /// Signals shutdown and wakes all parked workers.
    pub(crate) fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.condvar.notify_all();
    }

    /// Number of jobs waiting for a worker.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().queue.len()
    }
}
