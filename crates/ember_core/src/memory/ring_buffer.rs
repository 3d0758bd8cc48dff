//! # Ring Buffer
//!
//! Fixed-capacity FIFO byte buffer used to carry opcode payloads from the
//! update thread to the render thread.
//!
//! The buffer never grows. A write that does not fit returns a short count
//! and the caller decides what to drop. Typed reads trust the caller to read
//! back exactly the sequence of types that was written.

use bytemuck::Pod;

/// A fixed-capacity circular byte buffer.
///
/// # Thread Safety
///
/// This buffer is NOT thread-safe. It lives inside a render state buffer,
/// which is owned by exactly one thread at a time.
///
/// # Example
///
/// ```rust,ignore
/// let mut ring = RingBuffer::new(64);
///
/// ring.write_value(&42_u64);
/// ring.write_value(&-1_i32);
///
/// assert_eq!(ring.read_value::<u64>(), Some(42));
/// assert_eq!(ring.read_value::<i32>(), Some(-1));
/// ```
pub struct RingBuffer {
    /// The backing storage, allocated once.
    storage: Box<[u8]>,
    /// Index of the next byte to read.
    head: usize,
    /// Number of unread bytes.
    len: usize,
}

impl RingBuffer {
    /// Creates a ring buffer with `capacity` bytes of backing storage.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the number of unread bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there is nothing left to read.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bytes that can still be written.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Appends `bytes` and returns how many were actually written.
    ///
    /// A return value smaller than `bytes.len()` means the buffer overflowed;
    /// the tail of the input was discarded.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.remaining());
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let first = count.min(capacity - tail);

        self.storage[tail..tail + first].copy_from_slice(&bytes[..first]);
        self.storage[..count - first].copy_from_slice(&bytes[first..count]);

        self.len += count;
        count
    }

    /// Consumes up to `out.len()` bytes in FIFO order, returning the count read.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.len);
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = count.min(capacity - self.head);

        out[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        out[first..count].copy_from_slice(&self.storage[..count - first]);

        self.head = (self.head + count) % capacity;
        self.len -= count;
        count
    }

    /// Writes the raw bytes of a plain-old-data value.
    ///
    /// Returns false if the value did not fit completely.
    pub fn write_value<T: Pod>(&mut self, value: &T) -> bool {
        let bytes = bytemuck::bytes_of(value);
        self.write(bytes) == bytes.len()
    }

    /// Reads the next `size_of::<T>()` bytes back as a `T`.
    ///
    /// Returns `None` without consuming anything if fewer bytes are available.
    pub fn read_value<T: Pod>(&mut self) -> Option<T> {
        let mut value = T::zeroed();
        let bytes = bytemuck::bytes_of_mut(&mut value);
        if bytes.len() > self.len {
            return None;
        }
        self.read(bytes);
        Some(value)
    }

    /// Discards every unread byte. The backing storage is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("head", &self.head)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_round_trip() {
        let mut ring = RingBuffer::new(32);
        let payload = [1u8, 2, 3, 4, 5, 6, 7];

        assert_eq!(ring.write(&payload), payload.len());
        assert_eq!(ring.len(), payload.len());

        let mut out = [0u8; 7];
        assert_eq!(ring.read(&mut out), 7);
        assert_eq!(out, payload);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_ring_wraps_around() {
        let mut ring = RingBuffer::new(8);
        let mut scratch = [0u8; 6];

        ring.write(&[9; 6]);
        ring.read(&mut scratch);

        // head is now at 6, this write wraps past the end
        let payload = [1u8, 2, 3, 4, 5];
        assert_eq!(ring.write(&payload), 5);

        let mut out = [0u8; 5];
        assert_eq!(ring.read(&mut out), 5);
        assert_eq!(out, payload);
    }

    #[test]
    fn test_ring_overflow_short_count() {
        let mut ring = RingBuffer::new(4);
        assert_eq!(ring.write(&[1, 2, 3]), 3);

        // only one byte left
        assert_eq!(ring.write(&[4, 5, 6]), 1);
        assert_eq!(ring.remaining(), 0);
        assert_eq!(ring.write(&[7]), 0);

        let mut out = [0u8; 8];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_ring_typed_values() {
        let mut ring = RingBuffer::new(64);

        assert!(ring.write_value(&0xDEAD_BEEF_u64));
        assert!(ring.write_value(&-7_i32));
        assert!(ring.write_value(&1.5_f64));
        assert!(ring.write_value(&200_u8));

        assert_eq!(ring.read_value::<u64>(), Some(0xDEAD_BEEF));
        assert_eq!(ring.read_value::<i32>(), Some(-7));
        assert_eq!(ring.read_value::<f64>(), Some(1.5));
        assert_eq!(ring.read_value::<u8>(), Some(200));
        assert_eq!(ring.read_value::<u8>(), None);
    }

    #[test]
    fn test_ring_underflow_consumes_nothing() {
        let mut ring = RingBuffer::new(16);
        ring.write_value(&3_u16);

        assert_eq!(ring.read_value::<u64>(), None);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.read_value::<u16>(), Some(3));
    }

    #[test]
    fn test_ring_partial_value_rejected() {
        let mut ring = RingBuffer::new(6);
        assert!(!ring.write_value(&1_u64));
        assert_eq!(ring.len(), 6);
    }

    #[test]
    fn test_ring_clear() {
        let mut ring = RingBuffer::new(16);
        ring.write(&[1; 10]);
        ring.clear();

        assert!(ring.is_empty());
        assert_eq!(ring.remaining(), 16);
    }
}
