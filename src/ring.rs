use std::mem::MaybeUninit;

/// Fixed-capacity FIFO keeping its values in place. Storage is one
/// allocation made up front; a capacity of 0 is legal and such a buffer
/// accepts nothing.
pub(crate) struct RingBuffer<T> {
    slots: Box<[MaybeUninit<T>]>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let slots: Box<[MaybeUninit<T>]> =
            std::iter::repeat_with(MaybeUninit::uninit).take(capacity).collect();
        Self { slots, head: 0, len: 0 }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Append at the tail. The buffer must not be full.
    pub(crate) fn push(&mut self, value: T) {
        assert!(!self.is_full(), "push on full ring buffer");
        let idx = self.wrap(self.head + self.len);
        self.slots[idx] = MaybeUninit::new(value);
        self.len += 1;
    }

    /// Take the oldest value, or None when empty.
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let idx = self.head;
        self.head = self.wrap(self.head + 1);
        self.len -= 1;
        let slot = std::mem::replace(&mut self.slots[idx], MaybeUninit::uninit());
        // The slot was written by `push` and is read exactly once.
        Some(unsafe { slot.assume_init() })
    }

    #[inline]
    fn wrap(&self, idx: usize) -> usize {
        let cap = self.slots.len();
        if idx >= cap {
            idx - cap
        } else {
            idx
        }
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
