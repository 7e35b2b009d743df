use super::{Scheduler, SchedulerId, WorkItem, WorkerContext};
use crate::error::{Error, Result};
use crate::executor::{Executor, Job};
use crate::pool::ThreadPool;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace, warn};

/// Scheduler running up to `max_workers` units at the same time.
///
/// Each submission appends to a FIFO queue and, while fewer than
/// `max_workers` workers exist, spawns one more worker on the pool. A
/// worker drains the queue and terminates as soon as it finds it empty;
/// idle workers never linger.
///
/// Items start in submission order, but with several workers they can
/// finish in any order.
///
/// # Inline promotion
///
/// A unit running on one of this scheduler's workers that waits, through
/// [`WorkerContext::wait`], on another unit of the same scheduler that is
/// still queued removes that unit from the queue and runs it immediately on
/// the current worker. This lets a worker blocked on a dependency make
/// progress instead of holding a slot idle. It deliberately lets the
/// awaited item jump ahead of earlier ones, so it is limited to waits
/// issued from worker context, and to items no other worker has claimed.
#[derive(Clone)]
pub struct BoundedWorkerScheduler {
    shared: Arc<Shared>,
}

struct Shared {
    id: SchedulerId,
    max_workers: usize,
    state: Mutex<State>,
    pool: Arc<ThreadPool>,

    /// Source of worker indices, for diagnostics.
    next_worker: AtomicUsize,
}

struct State {
    /// Items waiting for a worker.
    queue: VecDeque<Arc<WorkItem>>,

    /// Workers currently alive; never exceeds `max_workers`.
    active: usize,
}

impl BoundedWorkerScheduler {
    /// Creates a scheduler with up to `max_workers` workers on the global
    /// pool.
    ///
    /// `max_workers` must be at least 2; use a
    /// [`SingleWorkerScheduler`](super::SingleWorkerScheduler) for strictly
    /// sequential execution.
    pub fn new(max_workers: usize) -> Result<Self> {
        Self::with_pool(max_workers, ThreadPool::global())
    }

    /// Creates a scheduler with up to `max_workers` workers on `pool`.
    pub fn with_pool(max_workers: usize, pool: Arc<ThreadPool>) -> Result<Self> {
        if max_workers < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "max_workers must be >= 2 (got {max_workers}); use SingleWorkerScheduler for sequential execution"
            )));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                id: SchedulerId::next(),
                max_workers,
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    active: 0,
                }),
                pool,
                next_worker: AtomicUsize::new(0),
            }),
        })
    }

    /// Number of workers currently alive.
    pub fn active_workers(&self) -> usize {
        self.shared.state.lock().active
    }

    /// Number of items queued but not yet started.
    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Returns `true` if no item is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes `item` out of the queue if no worker has claimed it yet.
    fn unqueue(&self, item: &WorkItem) -> Option<Arc<WorkItem>> {
        let mut state = self.shared.state.lock();
        let index = state
            .queue
            .iter()
            .position(|queued| std::ptr::eq(&**queued, item))?;

        state.queue.remove(index)
    }

    /// Worker loop: pop or exit, run outside the lock, repeat.
    fn work(&self, worker: usize) {
        debug!(scheduler = %self.shared.id, worker, "worker started");

        let ctx = WorkerContext::new(self, worker);

        loop {
            let item = {
                let mut state = self.shared.state.lock();
                match state.queue.pop_front() {
                    Some(item) => item,
                    None => {
                        state.active -= 1;
                        break;
                    }
                }
            };

            item.run(&ctx);
        }

        debug!(scheduler = %self.shared.id, worker, "worker exited");
    }

    fn start_worker(&self) {
        let worker = self.shared.next_worker.fetch_add(1, Ordering::Relaxed);
        let this = self.clone();

        if self.shared.pool.try_execute(Box::new(move || this.work(worker))) {
            return;
        }

        let abandoned = {
            let mut state = self.shared.state.lock();
            state.active -= 1;

            if state.active == 0 {
                state.queue.drain(..).collect::<Vec<_>>()
            } else {
                Vec::new()
            }
        };

        for item in &abandoned {
            item.discard();
        }

        warn!(
            scheduler = %self.shared.id,
            abandoned = abandoned.len(),
            "thread pool rejected a worker"
        );
    }
}

impl Scheduler for BoundedWorkerScheduler {
    fn id(&self) -> SchedulerId {
        self.shared.id
    }

    fn submit(&self, item: Arc<WorkItem>) {
        trace!(scheduler = %self.shared.id, item = item.id(), "work item queued");

        let spawn = {
            let mut state = self.shared.state.lock();
            state.queue.push_back(item);

            if state.active < self.shared.max_workers {
                state.active += 1;
                true
            } else {
                false
            }
        };

        if spawn {
            self.start_worker();
        }
    }

    fn try_remove(&self, item: &WorkItem) -> bool {
        // Outside the lock: cancelling the promise runs its continuations.
        self.unqueue(item).is_some_and(|item| item.discard())
    }

    fn try_execute_inline(&self, item: &WorkItem, ctx: &WorkerContext<'_>) -> bool {
        if ctx.scheduler_id() != self.shared.id {
            return false;
        }

        // Losing this race means another worker already claimed the item.
        let Some(item) = self.unqueue(item) else {
            return false;
        };

        trace!(scheduler = %self.shared.id, item = item.id(), worker = ctx.worker(), "running item inline");

        item.run(ctx)
    }

    fn scheduled(&self) -> Vec<Arc<WorkItem>> {
        self.shared.state.lock().queue.iter().cloned().collect()
    }

    fn max_concurrency(&self) -> usize {
        self.shared.max_workers
    }
}

impl Executor for BoundedWorkerScheduler {
    fn execute(&self, job: Job) {
        self.submit(WorkItem::new(move |_| job()));
    }
}

impl fmt::Debug for BoundedWorkerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();

        f.debug_struct("BoundedWorkerScheduler")
            .field("id", &self.shared.id)
            .field("max_workers", &self.shared.max_workers)
            .field("active", &state.active)
            .field("queued", &state.queue.len())
            .finish()
    }
}
