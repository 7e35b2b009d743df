//! Bounded-concurrency schedulers.
//!
//! A scheduler accepts [`WorkItem`]s, keeps them in a FIFO queue, and
//! decides how many workers drain that queue at the same time. The workers
//! are jobs on a [`ThreadPool`](crate::ThreadPool); a scheduler never owns
//! threads of its own.
//!
//! Two policies are provided:
//! - [`SingleWorkerScheduler`]: at most one unit runs at any instant, always
//!   on a pool thread,
//! - [`BoundedWorkerScheduler`]: at most `max_workers` units run at once,
//!   and a worker waiting on a still-queued unit may run it inline.
//!
//! Every unit receives a [`WorkerContext`] describing the worker running
//! it. Waiting through the context is what enables inline promotion.

mod bounded;
mod context;
mod single;
mod work;

pub use bounded::BoundedWorkerScheduler;
pub use context::WorkerContext;
pub use single::SingleWorkerScheduler;
pub use work::{Task, WorkItem};

use crate::error::{BoxError, Error};
use crate::executor::Executor;
use crate::promise;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchedulerId(u64);

impl SchedulerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SchedulerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scheduler#{}", self.0)
    }
}

/// A policy deciding how queued work items reach pool threads.
pub trait Scheduler: Executor {
    /// Identity of this scheduler instance.
    fn id(&self) -> SchedulerId;

    /// Queues `item` for execution.
    fn submit(&self, item: Arc<WorkItem>);

    /// Removes `item` from the queue if no worker has claimed it yet, and
    /// drops its callable without running it.
    ///
    /// Returns `true` if the item was removed. A [`Task`] backed by it then
    /// settles as cancelled.
    fn try_remove(&self, item: &WorkItem) -> bool;

    /// Attempts to run a queued `item` right now on the worker described by
    /// `ctx`, instead of waiting for its turn.
    ///
    /// Returns `true` if the item ran.
    fn try_execute_inline(&self, item: &WorkItem, ctx: &WorkerContext<'_>) -> bool;

    /// Snapshot of the items queued but not yet started, oldest first.
    fn scheduled(&self) -> Vec<Arc<WorkItem>>;

    /// Upper bound on units of this scheduler running at the same time.
    fn max_concurrency(&self) -> usize;
}

/// Convenience methods available on every [`Scheduler`].
pub trait SchedulerExt: Scheduler {
    /// Submits `f` and returns a [`Task`] settled with its outcome.
    ///
    /// `Ok` succeeds the task's promise; `Err` fails it with the flattened
    /// error (returning [`Error::Cancelled`] cancels it). A panic inside `f`
    /// fails the promise with [`Error::Panicked`] and leaves the worker
    /// running.
    fn spawn<T, E, F>(&self, f: F) -> Task<T>
    where
        T: Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(&WorkerContext<'_>) -> Result<T, E> + Send + 'static,
    {
        let (resolver, promise) = promise::pair();

        let item = WorkItem::new(move |ctx| {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| f(ctx))) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(Error::flatten(err)),
                Err(payload) => Err(Error::from_panic(payload)),
            };
            resolver.settle(outcome);
        });

        self.submit(item.clone());

        Task::new(item, promise, self.id())
    }
}

impl<S: Scheduler + ?Sized> SchedulerExt for S {}
