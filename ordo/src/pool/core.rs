use super::PoolBuilder;
use super::injector::Injector;
use super::worker::Worker;
use crate::error::{Error, Result};
use crate::executor::{Executor, Job};

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// The lazily started process-wide pool.
static GLOBAL: OnceLock<Arc<ThreadPool>> = OnceLock::new();

/// A fixed-size pool of OS threads draining one FIFO job queue.
///
/// The pool is the ambient executor of the crate: schedulers spawn their
/// drain jobs on it, and [`AsyncQueue`](crate::AsyncQueue) runs units on
/// it unless told otherwise.
///
/// Dropping a pool stops accepting jobs, lets the threads finish what was
/// already queued, and joins them.
pub struct ThreadPool {
    /// Queue shared by all workers.
    injector: Arc<Injector>,

    /// Join handles for worker threads.
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Number of threads the pool was started with.
    size: usize,
}

impl ThreadPool {
    /// Returns a builder for a new pool.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Returns the process-wide pool, starting it on first use.
    ///
    /// The global pool uses the default [`PoolBuilder`] configuration and
    /// lives until the process exits.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to spawn its threads.
    pub fn global() -> Arc<ThreadPool> {
        GLOBAL
            .get_or_init(|| {
                let pool = PoolBuilder::new()
                    .thread_name("ordo-global")
                    .build()
                    .expect("failed to start the global thread pool");
                Arc::new(pool)
            })
            .clone()
    }

    /// Spawns `threads` workers named `<name>-<index>`.
    pub(crate) fn start(threads: usize, name: &str) -> Result<Self> {
        let injector = Arc::new(Injector::new());
        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = Worker::new(id, injector.clone());

            let spawned = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    injector.shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(Error::flatten(err));
                }
            }
        }

        debug!(threads, name, "thread pool started");

        Ok(Self {
            injector,
            handles: Mutex::new(handles),
            size: threads,
        })
    }

    /// Queues `f` to run on one of the pool threads.
    ///
    /// Jobs submitted after [`shutdown`](Self::shutdown) are dropped
    /// without running.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute(Box::new(f));
    }

    /// Number of threads in the pool.
    pub fn worker_threads(&self) -> usize {
        self.size
    }

    /// Number of jobs waiting for a free thread.
    pub fn queued(&self) -> usize {
        self.injector.len()
    }

    /// Stops accepting new jobs.
    ///
    /// Threads finish the jobs already queued and then exit. This does not
    /// wait for them; dropping the pool does.
    pub fn shutdown(&self) {
        self.injector.shutdown();
    }
}

impl ThreadPool {
    /// Queues `job`, reporting whether the pool accepted it.
    ///
    /// A rejected job is dropped without running.
    pub(crate) fn try_execute(&self, job: Job) -> bool {
        match self.injector.push(job) {
            Ok(()) => true,
            Err(job) => {
                debug!("job submitted to a stopped thread pool was dropped");
                drop(job);
                false
            }
        }
    }
}

impl Executor for ThreadPool {
    fn execute(&self, job: Job) {
        let _ = self.try_execute(job);
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("worker_threads", &self.size)
            .field("queued", &self.queued())
            .finish()
    }
}

impl Drop for ThreadPool {
    /// Shuts the pool down and joins its threads.
    ///
    /// A pool dropped from one of its own threads skips joining that
    /// thread.
    fn drop(&mut self) {
        self.shutdown();

        let current = thread::current().id();
        for handle in self.handles.get_mut().drain(..) {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        debug!(threads = self.size, "thread pool stopped");
    }
}
