//! Internal storage helpers.
//!
//! [`Slab`] provides indexed storage with reuse of freed slots. It backs
//! the callback registrations of cancellation tokens, where a registration
//! must be removable by key without scanning.

mod slab;

pub(crate) use slab::Slab;
