use super::{Promise, Shared, Status};
use crate::error::{Error, Result};

use std::fmt;
use std::sync::Arc;

/// Write side of a single-assignment result.
///
/// The first settling call wins; later calls return `false` and leave the
/// outcome unchanged. Dropping a resolver whose promise is still pending
/// cancels it, so observers never wait on work that has been abandoned.
pub struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Resolver<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Settles the promise with `value`.
    pub fn succeed(&self, value: T) -> bool {
        self.shared.settle(Ok(value))
    }

    /// Settles the promise with `error`.
    ///
    /// Failing with [`Error::Cancelled`] is the same as calling
    /// [`cancel`](Self::cancel).
    pub fn fail(&self, error: Error) -> bool {
        self.shared.settle(Err(error))
    }

    /// Settles the promise as cancelled.
    pub fn cancel(&self) -> bool {
        self.shared.settle(Err(Error::Cancelled))
    }

    /// Settles the promise with an outcome produced elsewhere, typically
    /// the outcome of another promise.
    pub fn settle(&self, outcome: Result<T>) -> bool {
        self.shared.settle(outcome)
    }

    /// Returns `true` once the promise reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.shared.status().is_terminal()
    }

    /// Returns a promise observing this resolver.
    pub fn promise(&self) -> Promise<T> {
        Promise::new(self.shared.clone())
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if self.shared.status() == Status::Pending {
            let _ = self.shared.settle(Err(Error::Cancelled));
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("status", &self.shared.status())
            .finish()
    }
}
