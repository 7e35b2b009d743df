/// A simple slab of reusable slots.
///
/// A `Slab` stores values in a contiguous vector and hands out stable
/// indices. Freed indices are recycled by later insertions, so an index is
/// only meaningful until the value behind it has been removed.
pub(crate) struct Slab<T> {
    /// Storage for items; `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab with room for `size` items.
    pub(crate) fn new(size: usize) -> Self {
        Self {
            items: Vec::with_capacity(size),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns its index.
    ///
    /// A free slot is reused when available; otherwise the slab grows.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            self.items[index] = Some(item);
            return index;
        }

        self.items.push(Some(item));
        self.items.len() - 1
    }

    /// Removes and returns the value stored at `index`, if any.
    ///
    /// Removing an index twice, or an index that was never handed out,
    /// returns `None`.
    pub(crate) fn try_remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        self.len -= 1;

        Some(item)
    }

    /// Removes every stored value, in index order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        self.free.clear();
        self.len = 0;

        self.items.drain(..).flatten().collect()
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
