use super::{Scheduler, SchedulerId, WorkItem, WorkerContext};
use crate::executor::{Executor, Job};
use crate::pool::ThreadPool;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Scheduler running at most one unit at any instant, always on a pool
/// thread.
///
/// Submissions go into one FIFO queue. The first submission after the
/// scheduler went idle spawns a single drain job on the pool; the drain job
/// runs items one after the other and exits as soon as it finds the queue
/// empty. Items are therefore started in submission order and never
/// overlap.
///
/// Inline execution is never permitted: a unit can never run on the thread
/// of a caller or of another unit waiting on it.
///
/// Cloning the scheduler yields another handle to the same queue.
#[derive(Clone)]
pub struct SingleWorkerScheduler {
    shared: Arc<Shared>,
}

struct Shared {
    id: SchedulerId,
    state: Mutex<State>,
    pool: Arc<ThreadPool>,
}

struct State {
    /// Items waiting for the drain job.
    queue: VecDeque<Arc<WorkItem>>,

    /// Whether a drain job currently exists.
    ///
    /// Only ever flipped under the same lock as `queue`, so a submission
    /// either sees the running drain job or starts exactly one new one.
    draining: bool,
}

impl SingleWorkerScheduler {
    /// Creates a scheduler draining on the global pool.
    pub fn new() -> Self {
        Self::with_pool(ThreadPool::global())
    }

    /// Creates a scheduler draining on `pool`.
    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: SchedulerId::next(),
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    draining: false,
                }),
                pool,
            }),
        }
    }

    /// Number of items queued but not yet started.
    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Returns `true` if no item is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs queued items until the queue is observed empty.
    fn drain(&self) {
        debug!(scheduler = %self.shared.id, "drain job started");

        let ctx = WorkerContext::new(self, 0);

        loop {
            let item = {
                let mut state = self.shared.state.lock();
                match state.queue.pop_front() {
                    Some(item) => item,
                    None => {
                        state.draining = false;
                        break;
                    }
                }
            };

            item.run(&ctx);
        }

        debug!(scheduler = %self.shared.id, "drain job exited");
    }

    fn start_drain(&self) {
        let this = self.clone();

        if self.shared.pool.try_execute(Box::new(move || this.drain())) {
            return;
        }

        // The pool is gone; nothing would ever run these items.
        let abandoned = {
            let mut state = self.shared.state.lock();
            state.draining = false;
            state.queue.drain(..).collect::<Vec<_>>()
        };

        for item in &abandoned {
            item.discard();
        }

        warn!(
            scheduler = %self.shared.id,
            abandoned = abandoned.len(),
            "thread pool rejected the drain job, dropping queued items"
        );
    }
}

impl Scheduler for SingleWorkerScheduler {
    fn id(&self) -> SchedulerId {
        self.shared.id
    }

    fn submit(&self, item: Arc<WorkItem>) {
        trace!(scheduler = %self.shared.id, item = item.id(), "work item queued");

        let start = {
            let mut state = self.shared.state.lock();
            state.queue.push_back(item);

            !std::mem::replace(&mut state.draining, true)
        };

        if start {
            self.start_drain();
        }
    }

    fn try_remove(&self, item: &WorkItem) -> bool {
        let removed = {
            let mut state = self.shared.state.lock();
            let index = state
                .queue
                .iter()
                .position(|queued| std::ptr::eq(&**queued, item));
            index.and_then(|index| state.queue.remove(index))
        };

        // Outside the lock: cancelling the promise runs its continuations.
        removed.is_some_and(|item| item.discard())
    }

    /// Always refuses: this scheduler's units only run on its drain job.
    fn try_execute_inline(&self, _item: &WorkItem, _ctx: &WorkerContext<'_>) -> bool {
        false
    }

    fn scheduled(&self) -> Vec<Arc<WorkItem>> {
        self.shared.state.lock().queue.iter().cloned().collect()
    }

    fn max_concurrency(&self) -> usize {
        1
    }
}

impl Executor for SingleWorkerScheduler {
    fn execute(&self, job: Job) {
        self.submit(WorkItem::new(move |_| job()));
    }
}

impl Default for SingleWorkerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SingleWorkerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();

        f.debug_struct("SingleWorkerScheduler")
            .field("id", &self.shared.id)
            .field("queued", &state.queue.len())
            .field("draining", &state.draining)
            .finish()
    }
}
