use super::ThreadPool;
use crate::error::{Error, Result};

use std::thread;

/// Smallest size of a pool built with the default configuration.
const MIN_DEFAULT_THREADS: usize = 4;

/// Builder for configuring and starting a [`ThreadPool`].
///
/// # Examples
///
/// ```rust
/// use ordo::PoolBuilder;
///
/// let pool = PoolBuilder::new()
///     .worker_threads(2)
///     .thread_name("io-callbacks")
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.worker_threads(), 2);
/// ```
pub struct PoolBuilder {
    /// Number of worker threads in the pool.
    worker_threads: usize,

    /// Prefix of the OS thread names.
    thread_name: String,
}

impl PoolBuilder {
    /// Creates a new `PoolBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is the number of available
    /// logical CPUs, but never less than four, so that a handful of blocked
    /// units cannot starve the pool on small machines.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .max(MIN_DEFAULT_THREADS);

        Self {
            worker_threads,
            thread_name: "ordo-worker".to_string(),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// Zero is rejected by [`build`](Self::build).
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    /// Sets the prefix of the worker thread names.
    ///
    /// Threads are named `<prefix>-<index>`.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Starts the pool with the configured options.
    pub fn build(self) -> Result<ThreadPool> {
        if self.worker_threads == 0 {
            return Err(Error::InvalidConfiguration(
                "worker_threads must be > 0".to_string(),
            ));
        }

        ThreadPool::start(self.worker_threads, &self.thread_name)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
