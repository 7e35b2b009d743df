use super::Status;
use crate::error::Error;

use parking_lot::{Condvar, Mutex};
use std::mem;
use std::task::Waker;
use std::time::Instant;

/// Continuation run once the promise settles.
pub(crate) type Continuation = Box<dyn FnOnce(Status) + Send>;

/// State shared between a resolver and its promises.
pub(crate) struct Shared<T> {
    /// Current state; moves from `Pending` to `Settled` exactly once.
    state: Mutex<State<T>>,

    /// Signalled when the state settles, for blocking waiters.
    settled: Condvar,
}

pub(crate) enum State<T> {
    Pending {
        /// Wakers of tasks awaiting the promise.
        wakers: Vec<Waker>,

        /// Continuations registered through `on_settled`.
        continuations: Vec<Continuation>,
    },
    Settled(Result<T, Error>),
}

impl<T> Shared<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending {
                wakers: Vec::new(),
                continuations: Vec::new(),
            }),
            settled: Condvar::new(),
        }
    }

    pub(crate) fn settled_with(outcome: Result<T, Error>) -> Self {
        Self {
            state: Mutex::new(State::Settled(outcome)),
            settled: Condvar::new(),
        }
    }

    /// Moves the state out of `Pending`.
    ///
    /// Returns `false` if the promise was already settled, in which case
    /// `outcome` is dropped. Wakers and continuations run on the calling
    /// thread after the lock has been released.
    pub(crate) fn settle(&self, outcome: Result<T, Error>) -> bool {
        let status = Status::of(&outcome);

        let mut state = self.state.lock();

        let (wakers, continuations) = match &mut *state {
            State::Pending {
                wakers,
                continuations,
            } => (mem::take(wakers), mem::take(continuations)),
            State::Settled(_) => return false,
        };

        *state = State::Settled(outcome);
        drop(state);

        self.settled.notify_all();

        for waker in wakers {
            waker.wake();
        }

        for continuation in continuations {
            continuation(status);
        }

        true
    }

    pub(crate) fn status(&self) -> Status {
        match &*self.state.lock() {
            State::Pending { .. } => Status::Pending,
            State::Settled(outcome) => Status::of(outcome),
        }
    }

    /// Runs `continuation` once settled, immediately if already so.
    pub(crate) fn on_settled(&self, continuation: Continuation) {
        let mut state = self.state.lock();

        match &mut *state {
            State::Pending { continuations, .. } => continuations.push(continuation),
            State::Settled(outcome) => {
                let status = Status::of(outcome);
                drop(state);
                continuation(status);
            }
        }
    }

    /// Registers `waker` unless the promise already settled.
    pub(crate) fn register(&self, waker: &Waker) -> Option<Result<T, Error>>
    where
        T: Clone,
    {
        let mut state = self.state.lock();

        match &mut *state {
            State::Settled(outcome) => Some(outcome.clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(waker)) {
                    wakers.push(waker.clone());
                }
                None
            }
        }
    }

    pub(crate) fn get(&self) -> Option<Result<T, Error>>
    where
        T: Clone,
    {
        match &*self.state.lock() {
            State::Settled(outcome) => Some(outcome.clone()),
            State::Pending { .. } => None,
        }
    }

    /// Blocks until settled, or until `deadline` if one is given.
    ///
    /// Returns `None` if the deadline passed first.
    pub(crate) fn wait(&self, deadline: Option<Instant>) -> Option<Result<T, Error>>
    where
        T: Clone,
    {
        let mut state = self.state.lock();

        loop {
            if let State::Settled(outcome) = &*state {
                return Some(outcome.clone());
            }

            match deadline {
                None => self.settled.wait(&mut state),
                Some(deadline) => {
                    if self.settled.wait_until(&mut state, deadline).timed_out() {
                        if let State::Settled(outcome) = &*state {
                            return Some(outcome.clone());
                        }
                        return None;
                    }
                }
            }
        }
    }
}
