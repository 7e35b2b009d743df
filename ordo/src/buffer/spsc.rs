use crate::error::{Error, Result};

use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A lock-free single-producer single-consumer ring.
///
/// The ring is only usable through the [`Producer`] and [`Consumer`]
/// returned by [`split`](Self::split). Both handles take `&mut self`, so at
/// most one thread pushes and at most one thread pops at any time. The
/// algorithm gives no guarantee whatsoever for several concurrent
/// producers or consumers; the handle types keep safe code from getting
/// there.
///
/// When the ring is full, [`Producer::push`] evicts the oldest item itself
/// rather than waiting for the consumer, and counts it as dropped.
///
/// # Examples
///
/// ```rust
/// use ordo::SpscRing;
///
/// let (mut tx, mut rx) = SpscRing::with_capacity(4).unwrap().split();
///
/// std::thread::spawn(move || {
///     for i in 0..4 {
///         tx.push(i);
///     }
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(rx.pop(), Some(0));
/// ```
pub struct SpscRing<T> {
    ring: Arc<Ring<T>>,
}

struct Ring<T> {
    /// Position of the oldest unclaimed item. Advanced by the consumer, and
    /// by the producer when it evicts.
    head: CachePadded<AtomicUsize>,

    /// Position of the next write. Only the producer stores it.
    tail: CachePadded<AtomicUsize>,

    /// Items evicted by the producer.
    dropped: AtomicUsize,

    slots: Box<[Slot<T>]>,
    mask: usize,
}

struct Slot<T> {
    /// Equal to the position awaiting a write into this slot when it is
    /// free, or that position plus one once the write is published.
    stamp: AtomicUsize,

    value: UnsafeCell<MaybeUninit<T>>,
}

// Slot values are handed over through the stamps; the claim on `head`
// decides which side reads an item.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> SpscRing<T> {
    /// Creates a ring of `capacity` slots.
    ///
    /// `capacity` must be a non-zero power of two.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(Error::InvalidConfiguration(format!(
                "spsc ring capacity must be a non-zero power of two, got {capacity}"
            )));
        }

        let slots = (0..capacity)
            .map(|position| Slot {
                stamp: AtomicUsize::new(position),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Ok(Self {
            ring: Arc::new(Ring {
                head: CachePadded::new(AtomicUsize::new(0)),
                tail: CachePadded::new(AtomicUsize::new(0)),
                dropped: AtomicUsize::new(0),
                slots,
                mask: capacity - 1,
            }),
        })
    }

    /// Splits the ring into its two endpoints.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        (
            Producer {
                ring: self.ring.clone(),
            },
            Consumer { ring: self.ring },
        )
    }
}

impl<T> Ring<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.capacity())
    }

    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    fn push(&self, value: T) -> Option<T> {
        let position = self.tail.load(Ordering::Relaxed);
        let slot = &self.slots[position & self.mask];
        let oldest = position.wrapping_sub(self.capacity());
        let backoff = Backoff::new();

        loop {
            if slot.stamp.load(Ordering::Acquire) == position {
                // SAFETY: the slot is free and only the producer writes.
                unsafe { (*slot.value.get()).write(value) };
                self.publish(slot, position);
                return None;
            }

            // Full: the slot still holds `oldest`. Claiming it through
            // `head` keeps the consumer from reading it concurrently.
            if self
                .head
                .compare_exchange(
                    oldest,
                    oldest.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                // SAFETY: the claim on `head` made the producer the only
                // owner of the published item, and so of the slot.
                let evicted = unsafe {
                    let cell = &mut *slot.value.get();
                    let evicted = cell.assume_init_read();
                    cell.write(value);
                    evicted
                };
                self.publish(slot, position);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Some(evicted);
            }

            // The consumer claimed `oldest` first and is still reading it.
            backoff.snooze();
        }
    }

    fn publish(&self, slot: &Slot<T>, position: usize) {
        slot.stamp.store(position.wrapping_add(1), Ordering::Release);
        self.tail.store(position.wrapping_add(1), Ordering::Release);
    }

    fn pop(&self) -> Option<T> {
        let backoff = Backoff::new();

        loop {
            let position = self.head.load(Ordering::Acquire);
            let slot = &self.slots[position & self.mask];
            let stamp = slot.stamp.load(Ordering::Acquire);
            let lag = stamp.wrapping_sub(position.wrapping_add(1)) as isize;

            if lag < 0 {
                return None;
            }

            if lag == 0
                && self
                    .head
                    .compare_exchange(
                        position,
                        position.wrapping_add(1),
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                // SAFETY: the item was published and the claim on `head`
                // made the consumer its only owner.
                let value = unsafe { (*slot.value.get()).assume_init_read() };
                slot.stamp
                    .store(position.wrapping_add(self.capacity()), Ordering::Release);
                return Some(value);
            }

            // The producer evicted the item at `position`.
            backoff.spin();
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let mut position = head;

        while position != tail {
            let slot = &mut self.slots[position & self.mask];
            if *slot.stamp.get_mut() == position.wrapping_add(1) {
                // SAFETY: published and never claimed.
                unsafe { slot.value.get_mut().assume_init_drop() };
            }
            position = position.wrapping_add(1);
        }
    }
}

/// Writing endpoint of an [`SpscRing`].
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Producer<T> {
    /// Appends `value`, evicting the oldest item if the ring is full.
    ///
    /// Returns the evicted item. Never blocks on an idle consumer; it only
    /// spins while the consumer is in the middle of reading the slot it
    /// needs.
    pub fn push(&mut self, value: T) -> Option<T> {
        self.ring.push(value)
    }

    /// Number of items evicted since the ring was created.
    pub fn dropped(&self) -> usize {
        self.ring.dropped.load(Ordering::Relaxed)
    }

    /// Number of items waiting to be popped. Only a hint while the
    /// consumer is active.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if no item is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the next [`push`](Self::push) evicts an item,
    /// unless the consumer pops first.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Fixed number of slots.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Reading endpoint of an [`SpscRing`].
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Removes the oldest item, or returns `None` if the ring is empty.
    pub fn pop(&mut self) -> Option<T> {
        self.ring.pop()
    }

    /// Number of items the producer evicted before they could be read.
    pub fn dropped(&self) -> usize {
        self.ring.dropped.load(Ordering::Relaxed)
    }

    /// Number of items waiting to be popped. Only a hint while the
    /// producer is active.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if nothing is left to pop.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if every slot holds an unread item.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Fixed number of slots.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T> Iterator for Consumer<T> {
    type Item = T;

    /// Pops until the ring is empty; a later call may yield again.
    fn next(&mut self) -> Option<T> {
        self.pop()
    }
}

impl<T> fmt::Debug for SpscRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscRing")
            .field("capacity", &self.ring.capacity())
            .finish()
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}
