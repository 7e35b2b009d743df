//! # Ordo
//!
//! **Ordo** is a small set of thread-based execution primitives for Rust, built as the
//! coordination layer underneath request/response and pipeline code in the **Nebula**
//! ecosystem.
//!
//! Rather than a full async runtime, Ordo provides the pieces that decide *when* and *how
//! many* units of work run, and how their outcomes reach the code waiting for them:
//!
//! - **Schedulers** bounding how many units run at once on a shared thread pool, with
//!   inline promotion of queued work for a worker that waits on it
//! - An **async queue** running heterogeneous callables strictly one after another
//! - A **request correlator** matching out-of-band replies to pending requests, with
//!   per-request timeouts
//! - **Ring buffers**, locked or lock-free, that overwrite their oldest item when full
//! - **Promises** and **cancellation tokens** tying all of the above together
//!
//! ## Quick Start
//!
//! ```rust
//! use ordo::{BoundedWorkerScheduler, Error, SchedulerExt};
//!
//! let scheduler = BoundedWorkerScheduler::new(4).unwrap();
//!
//! let task = scheduler.spawn(|_| Ok::<_, Error>(6 * 7));
//!
//! assert_eq!(task.wait().unwrap(), 42);
//! ```
//!
//! ## Modules
//!
//! - [`promise`] — Single-assignment results shared between producers and observers
//! - [`scheduler`] — Single and bounded worker schedulers
//! - [`time`] — One-shot timers
//! - [`buffer`] — Locked and lock-free ring buffers
//!
//! ## Logging
//!
//! Ordo emits [`tracing`](https://docs.rs/tracing) events and never installs a subscriber.
//! Worker and pool lifecycle is logged at `debug`, per-item execution at `trace`, caught
//! panics and late replies at `warn`.
//!
//! ## Getting Started
//!
//! Add Ordo to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! ordo = { git = "https://github.com/Nebula-ecosystem/Ordo", package = "ordo" }
//! ```

mod cancel;
mod correlator;
mod error;
mod executor;
mod pool;
mod queue;
mod utils;

pub mod buffer;
pub mod promise;
pub mod scheduler;
pub mod time;

pub use buffer::{RingBuffer, SpscRing};
pub use cancel::{CancellationToken, Registration};
pub use correlator::RequestCorrelator;
pub use error::{BoxError, Error, Result};
pub use executor::{Executor, Job};
pub use pool::{PoolBuilder, ThreadPool};
pub use promise::{Promise, Resolver, Status};
pub use queue::AsyncQueue;
pub use scheduler::{
    BoundedWorkerScheduler, Scheduler, SchedulerExt, SchedulerId, SingleWorkerScheduler, Task,
    WorkItem, WorkerContext,
};
pub use time::{Timer, TimerHandle};
