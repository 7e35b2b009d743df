//! Single-assignment results.
//!
//! A [`Promise`] is the read side of a result that is produced exactly once
//! by its [`Resolver`]. It ends in one of three terminal states: succeeded,
//! failed or cancelled. Once settled the state never changes again, and any
//! number of cloned promises can observe it:
//!
//! - by blocking the current thread ([`Promise::wait`],
//!   [`Promise::wait_timeout`]),
//! - by awaiting it (`Promise<T>` implements [`Future`](std::future::Future)),
//! - by registering a continuation ([`Promise::on_settled`]).
//!
//! Schedulers, the async queue and the request correlator all hand out
//! promises; the combinator layer built on top of this crate consumes them.

mod handle;
mod resolver;
mod shared;
mod state;

pub use handle::Promise;
pub use resolver::Resolver;
pub use state::Status;

use shared::Shared;

use std::sync::Arc;

/// Creates a connected resolver/promise pair.
///
/// # Examples
///
/// ```rust
/// let (resolver, promise) = ordo::promise::pair();
///
/// assert!(resolver.succeed(7));
/// assert!(!resolver.succeed(8));
/// assert_eq!(promise.wait().unwrap(), 7);
/// ```
pub fn pair<T>() -> (Resolver<T>, Promise<T>) {
    let shared = Arc::new(Shared::new());

    (Resolver::new(shared.clone()), Promise::new(shared))
}
