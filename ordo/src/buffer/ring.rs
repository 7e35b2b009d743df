use crate::error::{Error, Result};

use parking_lot::Mutex;
use std::fmt;

/// A locked circular buffer.
///
/// [`enqueue`](Self::enqueue) never blocks and never fails: once the buffer
/// is full, every new item replaces the oldest unread one.
///
/// # Examples
///
/// ```rust
/// use ordo::RingBuffer;
///
/// let ring = RingBuffer::with_capacity(2).unwrap();
/// ring.enqueue(1);
/// ring.enqueue(2);
/// ring.enqueue(3);
///
/// assert_eq!(ring.snapshot(), vec![2, 3]);
/// assert_eq!(ring.dequeue(), Some(2));
/// ```
pub struct RingBuffer<T> {
    inner: Mutex<Slots<T>>,
}

struct Slots<T> {
    buf: Box<[Option<T>]>,

    /// Index of the oldest item.
    head: usize,

    len: usize,
}

impl<T> Slots<T> {
    fn index(&self, offset: usize) -> usize {
        (self.head + offset) % self.buf.len()
    }
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` items.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "ring buffer capacity must be greater than zero".to_string(),
            ));
        }

        let buf = (0..capacity).map(|_| None).collect();

        Ok(Self {
            inner: Mutex::new(Slots {
                buf,
                head: 0,
                len: 0,
            }),
        })
    }

    /// Appends `item`.
    ///
    /// Returns the item it overwrote if the buffer was full.
    pub fn enqueue(&self, item: T) -> Option<T> {
        let mut slots = self.inner.lock();
        let capacity = slots.buf.len();

        if slots.len == capacity {
            let head = slots.head;
            let evicted = slots.buf[head].replace(item);
            slots.head = (head + 1) % capacity;
            return evicted;
        }

        let tail = slots.index(slots.len);
        slots.buf[tail] = Some(item);
        slots.len += 1;

        None
    }

    /// Removes and returns the oldest item.
    pub fn dequeue(&self) -> Option<T> {
        let mut slots = self.inner.lock();

        if slots.len == 0 {
            return None;
        }

        let head = slots.head;
        let item = slots.buf[head].take();
        slots.head = (head + 1) % slots.buf.len();
        slots.len -= 1;

        item
    }

    /// Removes every item, oldest first.
    pub fn drain(&self) -> Vec<T> {
        let mut slots = self.inner.lock();
        let len = slots.len;

        let items = (0..len)
            .filter_map(|offset| {
                let index = slots.index(offset);
                slots.buf[index].take()
            })
            .collect();

        slots.head = 0;
        slots.len = 0;

        items
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// Returns `true` if the buffer holds no item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the next [`enqueue`](Self::enqueue) overwrites
    /// the oldest item.
    pub fn is_full(&self) -> bool {
        let slots = self.inner.lock();
        slots.len == slots.buf.len()
    }

    /// Fixed number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.lock().buf.len()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the buffered items, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        let slots = self.inner.lock();

        (0..slots.len)
            .filter_map(|offset| slots.buf[slots.index(offset)].clone())
            .collect()
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.lock();
        f.debug_struct("RingBuffer")
            .field("len", &slots.len)
            .field("capacity", &slots.buf.len())
            .finish()
    }
}
