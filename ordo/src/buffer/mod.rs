//! Fixed-capacity ring buffers that overwrite their oldest item when full.
//!
//! - [`RingBuffer`] guards its storage with a lock and accepts any number
//!   of producers and consumers,
//! - [`SpscRing`] is lock-free but restricted to exactly one producer and
//!   one consumer, which its split handles enforce.

mod ring;
mod spsc;

pub use ring::RingBuffer;
pub use spsc::{Consumer, Producer, SpscRing};
