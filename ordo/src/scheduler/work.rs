use super::{SchedulerId, WorkerContext};
use crate::error::{Error, Result};
use crate::promise::{Promise, Status};

use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

type Callable = Box<dyn FnOnce(&WorkerContext<'_>) + Send>;

/// A callable waiting in a scheduler queue.
///
/// Items are shared as `Arc<WorkItem>` so that a specific item can be
/// located and removed from a queue by identity. The callable itself runs
/// at most once, on whichever worker takes the item out of the queue.
///
/// An item dropped without running drops its callable, and with it any
/// [`Resolver`](crate::Resolver) it captured, which cancels the promise.
pub struct WorkItem {
    /// Process-unique identifier, for diagnostics.
    id: u64,

    /// Taken on execution.
    callable: Mutex<Option<Callable>>,
}

impl WorkItem {
    /// Wraps `f` into a work item ready to be submitted.
    pub fn new<F>(f: F) -> Arc<Self>
    where
        F: FnOnce(&WorkerContext<'_>) + Send + 'static,
    {
        static NEXT: AtomicU64 = AtomicU64::new(1);

        Arc::new(Self {
            id: NEXT.fetch_add(1, Ordering::Relaxed),
            callable: Mutex::new(Some(Box::new(f))),
        })
    }

    /// Process-unique identifier of the item.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` once the item has been taken for execution.
    pub fn is_started(&self) -> bool {
        self.callable.lock().is_none()
    }

    /// Drops the callable without running it.
    ///
    /// Used when no worker will ever pick the item up. Returns `false` if
    /// the item already ran.
    pub(crate) fn discard(&self) -> bool {
        self.callable.lock().take().is_some()
    }

    /// Runs the callable on the worker described by `ctx`.
    ///
    /// A panic escaping the callable is caught and logged so that it never
    /// takes the worker down. Returns `false` if the item already ran.
    pub(crate) fn run(&self, ctx: &WorkerContext<'_>) -> bool {
        let Some(callable) = self.callable.lock().take() else {
            return false;
        };

        trace!(item = self.id, worker = ctx.worker(), "running work item");

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callable(ctx))) {
            let error = Error::from_panic(payload);
            warn!(item = self.id, %error, "work item panicked");
        }

        true
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("started", &self.is_started())
            .finish()
    }
}

/// Handle to a unit submitted through
/// [`SchedulerExt::spawn`](super::SchedulerExt::spawn).
///
/// Combines the promise of the unit with the identity of its queued item,
/// which is what [`WorkerContext::wait`] needs for inline promotion.
pub struct Task<T> {
    item: Arc<WorkItem>,
    promise: Promise<T>,
    scheduler: SchedulerId,
}

impl<T> Task<T> {
    pub(crate) fn new(item: Arc<WorkItem>, promise: Promise<T>, scheduler: SchedulerId) -> Self {
        Self {
            item,
            promise,
            scheduler,
        }
    }

    /// The queued item backing this task.
    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// Scheduler the task was submitted to.
    pub fn scheduler_id(&self) -> SchedulerId {
        self.scheduler
    }

    /// Promise settled with the unit's outcome.
    pub fn promise(&self) -> &Promise<T> {
        &self.promise
    }

    /// Consumes the task, keeping only its promise.
    pub fn into_promise(self) -> Promise<T> {
        self.promise
    }

    /// Current state of the task's promise.
    pub fn status(&self) -> Status {
        self.promise.status()
    }

    /// Returns `true` once the unit ran to completion or was cancelled.
    pub fn is_settled(&self) -> bool {
        self.promise.is_settled()
    }
}

impl<T: Clone> Task<T> {
    /// Blocks the current thread until the unit settles.
    ///
    /// From inside a unit of the same scheduler, prefer
    /// [`WorkerContext::wait`].
    pub fn wait(&self) -> Result<T> {
        self.promise.wait()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("item", &self.item.id)
            .field("scheduler", &self.scheduler)
            .field("status", &self.promise.status())
            .finish()
    }
}
