//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a signal that can be triggered once and
//! observed any number of times. Running units of work poll it and stop on
//! their own; nothing is interrupted forcibly.
//!
//! Tokens can be combined: [`CancellationToken::linked`] produces a child
//! that is cancelled as soon as any of its parents is. This is how an
//! [`AsyncQueue`](crate::AsyncQueue) merges its own lifetime with the token
//! supplied for a single submission.

use crate::error::{Error, Result};
use crate::utils::Slab;

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

type Callback = Box<dyn FnOnce() + Send>;

/// A cloneable, trigger-once cancellation signal.
///
/// All clones share the same state: cancelling one cancels all of them.
#[derive(Clone, Default)]
pub struct CancellationToken {
    /// `None` for a token that can never be cancelled.
    inner: Option<Arc<Inner>>,
}

struct Inner {
    /// Set exactly once, before the callbacks are drained.
    cancelled: AtomicBool,

    /// Callbacks waiting for cancellation, keyed for O(1) unregistration.
    callbacks: Mutex<Slab<Callback>>,

    /// Registrations this token holds on its parents.
    ///
    /// Dropping the token's state drops these, which unhooks the token from
    /// long-lived parents.
    links: Mutex<Vec<Registration>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            callbacks: Mutex::new(Slab::new(0)),
            links: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        let callbacks = self.callbacks.lock().drain();
        for callback in callbacks {
            callback();
        }

        self.links.lock().clear();
    }
}

impl CancellationToken {
    /// Creates a new, not yet cancelled token.
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(Inner::new())),
        }
    }

    /// Returns a token that is never cancelled.
    ///
    /// Calling [`cancel`](Self::cancel) on it has no effect.
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// Creates a token that is cancelled as soon as any of `parents` is.
    ///
    /// If a parent is already cancelled the returned token starts out
    /// cancelled. The child can also be cancelled on its own without
    /// affecting the parents.
    pub fn linked(parents: &[&CancellationToken]) -> Self {
        let child = Self::new();

        let Some(inner) = child.inner.as_ref() else {
            return child;
        };

        for parent in parents {
            let weak = Arc::downgrade(inner);
            let registration = parent.on_cancel(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.cancel();
                }
            });

            if !registration.is_empty() {
                inner.links.lock().push(registration);
            }
        }

        child
    }

    /// Shorthand for `CancellationToken::linked(&[self])`.
    pub fn child_token(&self) -> Self {
        Self::linked(&[self])
    }

    /// Triggers the token.
    ///
    /// Registered callbacks run on the calling thread, once. Cancelling an
    /// already cancelled token is a no-op.
    pub fn cancel(&self) {
        if let Some(inner) = &self.inner {
            inner.cancel();
        }
    }

    /// Returns `true` once the token has been triggered.
    pub fn is_cancelled(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.cancelled.load(Ordering::Acquire))
    }

    /// Returns `true` if the token can ever be cancelled.
    pub fn can_be_cancelled(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns [`Error::Cancelled`] if the token has been triggered.
    ///
    /// Intended for polling from inside a unit of work:
    ///
    /// ```rust,ignore
    /// for chunk in chunks {
    ///     token.error_if_cancelled()?;
    ///     process(chunk);
    /// }
    /// ```
    pub fn error_if_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Registers `callback` to run when the token is cancelled.
    ///
    /// If the token is already cancelled the callback runs immediately on
    /// the calling thread. Dropping the returned [`Registration`] before
    /// cancellation unregisters the callback.
    pub fn on_cancel<F>(&self, callback: F) -> Registration
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(inner) = &self.inner else {
            return Registration::empty();
        };

        let mut callbacks = inner.callbacks.lock();

        // Checked under the lock: `cancel` sets the flag before draining.
        if inner.cancelled.load(Ordering::Acquire) {
            drop(callbacks);
            callback();
            return Registration::empty();
        }

        let key = callbacks.insert(Box::new(callback));

        Registration {
            inner: Arc::downgrade(inner),
            key,
        }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.callbacks.lock().len())
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Handle to a callback registered with [`CancellationToken::on_cancel`].
///
/// Dropping it unregisters the callback if it has not run yet.
#[must_use = "dropping a Registration unregisters its callback"]
pub struct Registration {
    inner: Weak<Inner>,
    key: usize,
}

impl Registration {
    fn empty() -> Self {
        Self {
            inner: Weak::new(),
            key: usize::MAX,
        }
    }

    /// Returns `true` if nothing is registered behind this handle, either
    /// because the token could not be cancelled or because the callback
    /// already ran.
    pub fn is_empty(&self) -> bool {
        self.key == usize::MAX
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let _ = inner.callbacks.lock().try_remove(self.key);
        }
    }
}
