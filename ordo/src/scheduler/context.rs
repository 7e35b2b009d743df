use super::{Scheduler, SchedulerId, Task};
use crate::error::Result;

use std::fmt;

/// Describes the worker executing a unit of work.
///
/// Schedulers pass a context to every unit they run. A unit that needs the
/// result of another unit of the same scheduler should wait through
/// [`WorkerContext::wait`]: if the awaited unit is still queued, it runs
/// right here instead of holding this worker idle.
pub struct WorkerContext<'a> {
    /// Scheduler owning the worker.
    scheduler: &'a dyn Scheduler,

    /// Index of the worker within its scheduler.
    worker: usize,
}

impl<'a> WorkerContext<'a> {
    pub(crate) fn new(scheduler: &'a dyn Scheduler, worker: usize) -> Self {
        Self { scheduler, worker }
    }

    /// Identity of the scheduler running the current unit.
    pub fn scheduler_id(&self) -> SchedulerId {
        self.scheduler.id()
    }

    /// Index of the worker running the current unit.
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Blocks until `task` settles and returns its outcome.
    ///
    /// If `task` belongs to the same scheduler and is still queued, the
    /// scheduler may dequeue it and run it on this worker first. Whether it
    /// does is the scheduler's policy: a [`SingleWorkerScheduler`] never
    /// does, so waiting there on a later unit of the same scheduler
    /// deadlocks.
    ///
    /// [`SingleWorkerScheduler`]: super::SingleWorkerScheduler
    pub fn wait<T: Clone>(&self, task: &Task<T>) -> Result<T> {
        if task.scheduler_id() == self.scheduler.id() && !task.is_settled() {
            let _ = self.scheduler.try_execute_inline(task.item(), self);
        }

        task.wait()
    }
}

impl fmt::Debug for WorkerContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("scheduler", &self.scheduler.id())
            .field("worker", &self.worker)
            .finish()
    }
}
