//! One-shot timers.
//!
//! A [`Timer`] owns one background thread that fires callbacks at their
//! deadlines. It is the timer facility of the
//! [`RequestCorrelator`](crate::RequestCorrelator), independent of any
//! scheduler or pool, so an expiry still fires while every worker is busy.

mod entry;
mod timer;

pub use timer::{Timer, TimerHandle};
