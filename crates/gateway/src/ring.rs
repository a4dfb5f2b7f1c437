//! Fixed-capacity circular byte buffer used as each serial endpoint's TX queue.
//!
//! One byte of capacity is always held in reserve so `head == tail` is
//! unambiguously "empty"; a full ring therefore holds `capacity - 1` bytes.

pub struct RingBuffer {
    buf: Vec<u8>,
    head: usize,
    tail: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring buffer needs room for at least one byte plus the reserved slot");
        RingBuffer {
            buf: vec![0u8; capacity],
            head: 0,
            tail: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes currently queued.
    pub fn used(&self) -> usize {
        (self.head + self.capacity() - self.tail) % self.capacity()
    }

    /// Bytes that can still be enqueued before the ring is full.
    pub fn free(&self) -> usize {
        self.capacity() - 1 - self.used()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Appends `data` to the ring. Fails atomically (no bytes written) if
    /// `data` does not fit in the remaining free space.
    pub fn enqueue(&mut self, data: &[u8]) -> bool {
        if data.len() > self.free() {
            return false;
        }
        let cap = self.capacity();
        for &byte in data {
            self.buf[self.head] = byte;
            self.head = (self.head + 1) % cap;
        }
        true
    }

    /// Returns the largest contiguous readable run starting at `tail`,
    /// without physically wrapping past the end of the backing array.
    pub fn readable_run(&self) -> &[u8] {
        if self.is_empty() {
            return &[];
        }
        if self.tail < self.head {
            &self.buf[self.tail..self.head]
        } else {
            &self.buf[self.tail..]
        }
    }

    /// Advances `tail` past `n` bytes that a writer has successfully consumed.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.used());
        self.tail = (self.tail + n) % self.capacity();
    }
}
