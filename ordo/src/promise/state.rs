use crate::error::Error;

/// Observable state of a [`Promise`](super::Promise).
///
/// Every state but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No outcome yet.
    Pending,

    /// The producer supplied a value.
    Succeeded,

    /// The producer supplied an error other than cancellation.
    Failed,

    /// The work was cancelled before producing an outcome.
    Cancelled,
}

impl Status {
    /// Classifies a terminal outcome.
    pub(crate) fn of<T>(outcome: &Result<T, Error>) -> Self {
        match outcome {
            Ok(_) => Status::Succeeded,
            Err(Error::Cancelled) => Status::Cancelled,
            Err(_) => Status::Failed,
        }
    }

    /// Returns `true` for every state except [`Status::Pending`].
    pub fn is_terminal(self) -> bool {
        self != Status::Pending
    }
}
