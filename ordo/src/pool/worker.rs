use super::injector::Injector;
use crate::error::Error;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// A thread of a [`ThreadPool`](super::ThreadPool).
///
/// The worker takes jobs from the injector in FIFO order and runs them
/// until the injector shuts down and drains. A panicking job is caught and
/// logged; the worker keeps going.
pub(crate) struct Worker {
    /// Index of the worker within its pool.
    id: usize,

    /// Queue shared by all workers of the pool.
    injector: Arc<Injector>,
}

impl Worker {
    pub(crate) fn new(id: usize, injector: Arc<Injector>) -> Self {
        Self { id, injector }
    }

    /// Runs the worker loop on the current thread.
    pub(crate) fn run(self) {
        debug!(worker = self.id, "pool worker started");

        while let Some(job) = self.injector.pop() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                let error = Error::from_panic(payload);
                warn!(worker = self.id, %error, "pool job panicked");
            }
        }

        debug!(worker = self.id, "pool worker stopped");
    }
}
