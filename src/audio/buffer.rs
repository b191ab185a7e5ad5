//! Linear staging buffer for PCM samples and compressed frames
//!
//! Data is appended at the tail and consumed from the head. Consumed data
//! is dropped with [`StagingBuffer::shift`], which moves the unread
//! remainder back to offset 0. Capacity is fixed at construction and the
//! filled length never exceeds it.

use std::mem;

/// Fixed-capacity linear buffer with explicit compaction
///
/// The element is the golden unit (`i16` samples for PCM, `u8` for
/// compressed data); byte counts are derived from it.
pub struct StagingBuffer<T> {
    data: Vec<T>,
    /// Write cursor, equal to the number of filled elements
    tail: usize,
}

/// PCM staging buffer (signed 16-bit samples)
pub type PcmBuffer = StagingBuffer<i16>;

/// Compressed data staging buffer
pub type DataBuffer = StagingBuffer<u8>;

impl<T: Copy + Default> StagingBuffer<T> {
    /// Create a new buffer holding at most `capacity` elements
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
            tail: 0,
        }
    }

    /// Total capacity in elements
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Free space at the tail, in elements
    pub fn len_in(&self) -> usize {
        self.data.len() - self.tail
    }

    /// Filled space at the head, in elements
    pub fn len_out(&self) -> usize {
        self.tail
    }

    /// Free space at the tail, in bytes
    pub fn blen_in(&self) -> usize {
        self.len_in() * mem::size_of::<T>()
    }

    /// Filled space at the head, in bytes
    pub fn blen_out(&self) -> usize {
        self.len_out() * mem::size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.tail == 0
    }

    pub fn is_full(&self) -> bool {
        self.tail == self.data.len()
    }

    /// Filled region
    pub fn data(&self) -> &[T] {
        &self.data[..self.tail]
    }

    /// Filled region, mutable (e.g. for in-place volume scaling)
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data[..self.tail]
    }

    /// Writable free region at the tail
    ///
    /// Anything written here becomes visible only after [`seek`](Self::seek).
    pub fn tail_mut(&mut self) -> &mut [T] {
        &mut self.data[self.tail..]
    }

    /// Commit `n` elements written into the tail region
    ///
    /// The commit is capped to the free space; the number of elements
    /// actually committed is returned.
    pub fn seek(&mut self, n: usize) -> usize {
        let free = self.len_in();
        let n = if n > free {
            tracing::warn!("Staging buffer overrun: {} > {} free", n, free);
            free
        } else {
            n
        };
        self.tail += n;
        n
    }

    /// Append a slice, accepting at most the free space
    ///
    /// Returns the number of elements accepted.
    pub fn write_slice(&mut self, src: &[T]) -> usize {
        let n = src.len().min(self.len_in());
        self.data[self.tail..self.tail + n].copy_from_slice(&src[..n]);
        self.tail += n;
        n
    }

    /// Drop `n` elements from the head and move the rest to offset 0
    pub fn shift(&mut self, n: usize) {
        let n = n.min(self.tail);
        self.data.copy_within(n..self.tail, 0);
        self.tail -= n;
    }

    /// Drop everything
    pub fn rewind(&mut self) {
        self.tail = 0;
    }
}
