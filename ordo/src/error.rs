use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error produced by a unit of work.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the primitives in this crate.
///
/// Structural errors (bad configuration, duplicate identifiers, use after
/// disposal) are returned synchronously by the call that caused them.
/// Errors produced by a unit of work only ever show up as the terminal
/// state of the [`Promise`](crate::Promise) it settles.
///
/// `Error` is `Clone` so that every observer of a failed promise can get
/// its own copy of the failure.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A required input was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A component was constructed with unusable parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A request identifier is already pending in a correlator.
    #[error("request {0} has already been registered")]
    DuplicateRequest(String),

    /// The component was used after it had been disposed.
    #[error("{0} has already been disposed")]
    AlreadyDisposed(&'static str),

    /// A deadline elapsed before the operation settled.
    #[error("{0}")]
    Timeout(String),

    /// Cooperative cancellation was observed.
    #[error("operation was cancelled")]
    Cancelled,

    /// A unit of work panicked while executing.
    #[error("unit of work panicked: {0}")]
    Panicked(String),

    /// The error a unit of work returned, propagated as is.
    #[error(transparent)]
    Failed(Arc<dyn StdError + Send + Sync + 'static>),
}

impl Error {
    /// Converts the error returned by a unit of work into an `Error`.
    ///
    /// Errors that already are an `Error` are unwrapped instead of being
    /// nested inside [`Error::Failed`], so a failure travelling through
    /// several queues keeps a single layer.
    pub fn flatten(err: impl Into<BoxError>) -> Self {
        match err.into().downcast::<Error>() {
            Ok(err) => *err,
            Err(other) => Error::Failed(Arc::from(other)),
        }
    }

    /// Builds an [`Error::Panicked`] from a panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Error::Panicked(message)
    }

    /// Returns `true` for [`Error::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns `true` for [`Error::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
