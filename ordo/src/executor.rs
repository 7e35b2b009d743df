//! The seam between work producers and whatever runs the work.

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs jobs, eventually, on some thread.
///
/// Implemented by [`ThreadPool`](crate::ThreadPool) and by both schedulers,
/// which lets an [`AsyncQueue`](crate::AsyncQueue) run its units on any of
/// them.
pub trait Executor: Send + Sync {
    /// Queues `job` for execution.
    ///
    /// Must not run `job` on the calling thread before returning.
    fn execute(&self, job: Job);
}
