use super::{Shared, Status};
use crate::error::{Error, Result};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Read side of a single-assignment result.
///
/// Cloning a `Promise` is cheap; all clones observe the same outcome.
/// Dropping a promise has no effect on the work producing it.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Returns a promise that already succeeded with `value`.
    pub fn ready(value: T) -> Self {
        Self::new(Arc::new(Shared::settled_with(Ok(value))))
    }

    /// Returns a promise that already failed with `error`.
    pub fn failed(error: Error) -> Self {
        Self::new(Arc::new(Shared::settled_with(Err(error))))
    }

    /// Returns a promise that is already cancelled.
    pub fn cancelled() -> Self {
        Self::failed(Error::Cancelled)
    }

    /// Current state of the promise.
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// Returns `true` once the promise reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.status().is_terminal()
    }

    /// Registers a continuation that runs once the promise settles.
    ///
    /// The continuation runs on the thread that settles the promise, or
    /// immediately on the calling thread if the promise has already
    /// settled. It receives the terminal status, not the value; keep a
    /// clone of the promise around to read the value.
    pub fn on_settled<F>(&self, continuation: F)
    where
        F: FnOnce(Status) + Send + 'static,
    {
        self.shared.on_settled(Box::new(continuation));
    }
}

impl<T: Clone> Promise<T> {
    /// Returns the outcome if the promise has settled.
    pub fn try_result(&self) -> Option<Result<T>> {
        self.shared.get()
    }

    /// Blocks the current thread until the promise settles.
    pub fn wait(&self) -> Result<T> {
        match self.shared.wait(None) {
            Some(outcome) => outcome,
            None => unreachable!("wait without deadline cannot time out"),
        }
    }

    /// Blocks the current thread until the promise settles or `timeout`
    /// elapses.
    ///
    /// Returns [`Error::Timeout`] if the promise is still pending after
    /// `timeout`. The promise itself is left untouched and may still settle
    /// later. A `timeout` beyond the range of [`Instant`] waits forever.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T> {
        let deadline = Instant::now().checked_add(timeout);

        self.shared.wait(deadline).unwrap_or_else(|| {
            Err(Error::Timeout(format!(
                "promise did not settle within {timeout:?}"
            )))
        })
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &self.status())
            .finish()
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T>;

    /// Polls the promise.
    ///
    /// The waker is registered under the same lock that guards settlement,
    /// so a settlement racing with this poll is never missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.shared.register(cx.waker()) {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}
