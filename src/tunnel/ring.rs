//! Bounded circular byte buffer absorbing chunk payloads until they are read.
//!
//! The buffer keeps independent read and write cursors modulo its capacity.
//! Equal cursors mean empty, so one slot always stays unused and at most
//! `capacity - 1` bytes can be stored. Writes are all-or-nothing.

use std::num::NonZeroUsize;

use super::OverflowError;

/// Fixed-capacity FIFO of bytes.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    read: usize,
    write: usize,
}

impl RingBuffer {
    /// Create a buffer with `capacity` slots, storing at most `capacity - 1`
    /// bytes. Capacities below two are raised to two.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            storage: vec![0_u8; capacity.get().max(2)].into_boxed_slice(),
            read: 0,
            write: 0,
        }
    }

    /// Total slots, including the one kept free.
    #[must_use]
    pub fn capacity(&self) -> usize { self.storage.len() }

    /// Largest number of bytes the buffer can hold.
    #[must_use]
    pub fn usable_capacity(&self) -> usize { self.capacity() - 1 }

    /// Bytes currently stored.
    #[must_use]
    pub fn len(&self) -> usize { (self.write + self.capacity() - self.read) % self.capacity() }

    /// Whether no bytes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.read == self.write }

    /// Bytes that can still be pushed.
    #[must_use]
    pub fn available(&self) -> usize { self.usable_capacity() - self.len() }

    /// Append `bytes`, or store nothing if they do not all fit.
    ///
    /// # Errors
    ///
    /// Returns [`OverflowError`] when `bytes` exceeds [`Self::available`].
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), OverflowError> {
        let available = self.available();
        if bytes.len() > available {
            return Err(OverflowError {
                attempted: bytes.len(),
                available,
            });
        }

        let capacity = self.capacity();
        let head = bytes.len().min(capacity - self.write);
        let (first, second) = bytes.split_at(head);
        self.storage[self.write..self.write + head].copy_from_slice(first);
        self.storage[..second.len()].copy_from_slice(second);
        self.write = (self.write + bytes.len()) % capacity;
        Ok(())
    }

    /// Move up to `buf.len()` bytes into `buf` in FIFO order.
    ///
    /// Returns the number of bytes copied, zero when empty.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.len());
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let head = count.min(capacity - self.read);
        buf[..head].copy_from_slice(&self.storage[self.read..self.read + head]);
        buf[head..count].copy_from_slice(&self.storage[..count - head]);
        self.read = (self.read + count) % capacity;
        count
    }

    /// Drop all stored bytes and rewind both cursors.
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }
}
