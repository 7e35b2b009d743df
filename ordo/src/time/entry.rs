use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::time::Instant;

/// The entry is waiting for its deadline.
pub(crate) const ARMED: u8 = 0;

/// The timer thread claimed the entry and runs (or ran) its callback.
pub(crate) const FIRED: u8 = 1;

/// The entry was cancelled before it fired.
pub(crate) const CANCELLED: u8 = 2;

/// An entry in the timer queue.
///
/// Entries live in a `BinaryHeap` ordered so that the earliest deadline is
/// popped first; entries with equal deadlines fire in scheduling order.
pub(crate) struct TimerEntry {
    /// The time at which the callback should run.
    pub(crate) deadline: Instant,

    /// Scheduling order, to break ties between equal deadlines.
    pub(crate) seq: u64,

    /// Callback to run at the deadline.
    pub(crate) callback: Box<dyn FnOnce() + Send>,

    /// Lifecycle shared with the entry's handle.
    pub(crate) state: Arc<AtomicU8>,
}

impl TimerEntry {
    /// Claims the entry for firing; fails if it was cancelled.
    pub(crate) fn claim(&self) -> bool {
        self.state
            .compare_exchange(ARMED, FIRED, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.load(AtomicOrdering::Acquire) == CANCELLED
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed so that a `BinaryHeap<TimerEntry>` behaves as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
