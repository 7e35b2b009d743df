//! The ambient thread pool.
//!
//! Schedulers in this crate do not own threads. They decide how many of
//! their units may run at once and hand drain jobs to a [`ThreadPool`],
//! which owns the OS threads.
//!
//! It is composed of:
//! - [`injector`]: the global FIFO the pool threads pull jobs from,
//! - [`worker`]: the loop each pool thread runs,
//! - [`builder`]: configuration of a pool before it starts.

pub(crate) mod builder;
pub(crate) mod core;
pub(crate) mod injector;
pub(crate) mod worker;

pub use builder::PoolBuilder;
pub use core::ThreadPool;
