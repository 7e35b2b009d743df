//! Strictly sequential execution of heterogeneous work.
//!
//! An [`AsyncQueue`] runs the callables submitted to it one at a time, in
//! submission order, on any [`Executor`]. Each submission gets its own
//! [`Promise`] carrying the callable's outcome. A failing or cancelled unit
//! does not break the chain: the next unit starts once the previous one is
//! over, whatever its outcome.

use crate::cancel::CancellationToken;
use crate::error::{BoxError, Error, Result};
use crate::executor::Executor;
use crate::pool::ThreadPool;
use crate::promise::{self, Promise};

use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// A queue serializing the execution of submitted callables.
///
/// For any two submissions A and B, with A enqueued before B, A's callable
/// has returned before B's callable starts, even when both run on a
/// multi-threaded executor.
///
/// Every callable receives a [`CancellationToken`] that fires when either
/// the token passed at submission or the queue itself (on
/// [`dispose`](Self::dispose)) is cancelled. A unit whose token fired before
/// it started is settled as cancelled without running.
///
/// # Examples
///
/// ```rust
/// use ordo::AsyncQueue;
///
/// let queue = AsyncQueue::new();
///
/// let first = queue.enqueue(|_| 1).unwrap();
/// let second = queue.enqueue(|_| "two").unwrap();
///
/// assert_eq!(first.wait().unwrap(), 1);
/// assert_eq!(second.wait().unwrap(), "two");
/// ```
pub struct AsyncQueue {
    chain: Mutex<Chain>,

    /// Cancelled on disposal; linked into every unit's token.
    lifetime: CancellationToken,

    /// Executor used when a submission does not name one.
    executor: Arc<dyn Executor>,

    /// Units enqueued and not yet settled.
    pending: Arc<AtomicUsize>,
}

/// The serialization state.
struct Chain {
    /// Settles once everything enqueued so far is over.
    tail: Promise<()>,

    /// Set by `dispose`; rejects further submissions.
    disposed: bool,
}

impl AsyncQueue {
    /// Creates a queue running its units on the global pool.
    pub fn new() -> Self {
        Self::with_executor(ThreadPool::global())
    }

    /// Creates a queue running its units on `executor` by default.
    ///
    /// Any scheduler can be used: the queue still guarantees that only one
    /// of its units runs at a time.
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            chain: Mutex::new(Chain {
                tail: Promise::ready(()),
                disposed: false,
            }),
            lifetime: CancellationToken::new(),
            executor,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueues an infallible callable.
    ///
    /// Fails with [`Error::AlreadyDisposed`] after [`dispose`](Self::dispose).
    pub fn enqueue<T, F>(&self, f: F) -> Result<Promise<T>>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        self.push(
            &CancellationToken::none(),
            self.executor.clone(),
            move |token| Ok::<_, Error>(f(token)),
        )
    }

    /// Enqueues a fallible callable.
    ///
    /// An `Err` fails the returned promise with the flattened error;
    /// returning [`Error::Cancelled`] cancels it instead.
    pub fn enqueue_fallible<T, E, F>(&self, f: F) -> Result<Promise<T>>
    where
        T: Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
    {
        self.push(&CancellationToken::none(), self.executor.clone(), f)
    }

    /// Enqueues a fallible callable with its own cancellation token and,
    /// optionally, its own executor.
    ///
    /// Cancelling `token` only affects this unit: if it has not started it
    /// is settled as cancelled when its turn comes, and units queued after
    /// it keep their place.
    pub fn enqueue_with<T, E, F>(
        &self,
        token: &CancellationToken,
        executor: Option<Arc<dyn Executor>>,
        f: F,
    ) -> Result<Promise<T>>
    where
        T: Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
    {
        let executor = executor.unwrap_or_else(|| self.executor.clone());
        self.push(token, executor, f)
    }

    fn push<T, E, F>(
        &self,
        token: &CancellationToken,
        executor: Arc<dyn Executor>,
        f: F,
    ) -> Result<Promise<T>>
    where
        T: Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
    {
        let (outer, promise) = promise::pair::<T>();
        let (done, finished) = promise::pair::<()>();

        let previous = {
            let mut chain = self.chain.lock();

            if chain.disposed {
                return Err(Error::AlreadyDisposed("AsyncQueue"));
            }

            mem::replace(&mut chain.tail, finished)
        };

        let token = CancellationToken::linked(&[&self.lifetime, token]);
        let pending = PendingGuard::new(&self.pending);

        let unit = move || {
            let outcome = if token.is_cancelled() {
                Err(Error::Cancelled)
            } else {
                match panic::catch_unwind(AssertUnwindSafe(|| f(&token))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(Error::flatten(err)),
                    Err(payload) => Err(Error::from_panic(payload)),
                }
            };

            trace!(cancelled = token.is_cancelled(), "queued unit finished");

            outer.settle(outcome);
            drop(pending);

            // Releases the next unit.
            done.succeed(());
        };

        // Dispatching through the executor, rather than running the unit on
        // the thread that settled `previous`, keeps long chains from
        // recursing.
        previous.on_settled(move |_| executor.execute(Box::new(unit)));

        Ok(promise)
    }

    /// Disposes the queue.
    ///
    /// Cancels the token of every unit, running or waiting, and rejects
    /// further submissions. Units that have not started yet settle as
    /// cancelled in their turn. Returns immediately without waiting for
    /// the running unit.
    pub fn dispose(&self) {
        {
            let mut chain = self.chain.lock();
            if mem::replace(&mut chain.disposed, true) {
                return;
            }
        }

        debug!(pending = self.pending(), "async queue disposed");

        self.lifetime.cancel();
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.chain.lock().disposed
    }

    /// Number of units enqueued and not yet settled.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// A promise settling once every unit enqueued so far is over.
    ///
    /// Only its settlement matters; it may settle as cancelled if the
    /// last unit never reached an executor.
    pub fn idle(&self) -> Promise<()> {
        self.chain.lock().tail.clone()
    }
}

/// Counts a unit as pending until it is dropped, run or not.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter.clone())
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Default for AsyncQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncQueue {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncQueue")
            .field("pending", &self.pending())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
