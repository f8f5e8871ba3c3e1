//! Fixed-capacity circular sample queue.
//!
//! The STFT pipeline stages input samples and delivers reconstructed output
//! through these FIFOs. The backing store is heap-allocated once at
//! construction and never reallocates; all per-sample operations are O(1)
//! and allocation-free.
//!
//! # Semantics
//!
//! - [`push`](RingBuffer::push) on a full buffer overwrites the oldest
//!   sample. This is intentional, not an error: the transform pipeline
//!   sizes its FIFOs so steady-state occupancy never reaches capacity, and
//!   dropping the oldest sample is the correct degradation if it ever does.
//! - [`pop`](RingBuffer::pop) on an empty buffer returns the zero value.
//!   The pipeline relies on this during the initial latency period, before
//!   the first analysis frame has produced output.
//! - [`get`](RingBuffer::get) indexes from the oldest sample. Out-of-range
//!   indices are a caller contract violation, checked only by
//!   `debug_assert!`.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Fixed-capacity circular FIFO over a pre-allocated backing store.
///
/// # Example
///
/// ```rust
/// use espectro_core::RingBuffer;
///
/// let mut fifo = RingBuffer::new(4);
/// fifo.push(1.0);
/// fifo.push(2.0);
/// assert_eq!(fifo.len(), 2);
/// assert_eq!(fifo.get(0), 1.0);
/// assert_eq!(fifo.pop(), 1.0);
/// assert_eq!(fifo.pop(), 2.0);
/// assert_eq!(fifo.pop(), 0.0); // empty: defined zero value
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    write_index: usize,
    read_index: usize,
    count: usize,
}

impl RingBuffer {
    /// Creates a ring buffer holding up to `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buffer: vec![0.0; capacity],
            write_index: 0,
            read_index: 0,
            count: 0,
        }
    }

    /// Appends a sample, overwriting the oldest one when full.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % self.buffer.len();

        if self.count < self.buffer.len() {
            self.count += 1;
        } else {
            // Full: the oldest sample was just overwritten.
            self.read_index = (self.read_index + 1) % self.buffer.len();
        }
    }

    /// Removes and returns the oldest sample, or 0.0 when empty.
    #[inline]
    pub fn pop(&mut self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }

        let sample = self.buffer[self.read_index];
        self.read_index = (self.read_index + 1) % self.buffer.len();
        self.count -= 1;
        sample
    }

    /// Returns the `index`-th sample counting from the oldest.
    ///
    /// Bounds are checked only in debug builds; callers must respect
    /// [`len`](Self::len).
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        debug_assert!(index < self.count, "RingBuffer index out of range");
        self.buffer[(self.read_index + index) % self.buffer.len()]
    }

    /// Copies the oldest `dest.len()` samples into `dest` without consuming.
    ///
    /// The transform pipeline reads a full analysis frame this way while the
    /// FIFO retains the overlap for the next hop.
    ///
    /// Requires `dest.len() <= len()` (debug-asserted).
    pub fn peek_front(&self, dest: &mut [f32]) {
        debug_assert!(dest.len() <= self.count, "peek_front past valid samples");
        for (i, slot) in dest.iter_mut().enumerate() {
            *slot = self.buffer[(self.read_index + i) % self.buffer.len()];
        }
    }

    /// Discards the oldest `n` samples (or everything, if fewer are held).
    pub fn discard(&mut self, n: usize) {
        let n = n.min(self.count);
        self.read_index = (self.read_index + n) % self.buffer.len();
        self.count -= n;
    }

    /// Number of valid samples currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the buffer holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of samples the buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Drops all held samples and rewinds the cursors.
    pub fn clear(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.count = 0;
    }
}

impl core::ops::Index<usize> for RingBuffer {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        debug_assert!(index < self.count, "RingBuffer index out of range");
        &self.buffer[(self.read_index + index) % self.buffer.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_fifo_order() {
        let mut fifo = RingBuffer::new(8);
        for i in 0..5 {
            fifo.push(i as f32);
        }
        assert_eq!(fifo.len(), 5);
        for i in 0..5 {
            assert_eq!(fifo.pop(), i as f32);
        }
        assert!(fifo.is_empty());
    }

    #[test]
    fn pop_empty_returns_zero() {
        let mut fifo = RingBuffer::new(4);
        assert_eq!(fifo.pop(), 0.0);
        fifo.push(1.0);
        assert_eq!(fifo.pop(), 1.0);
        assert_eq!(fifo.pop(), 0.0);
    }

    #[test]
    fn overwrite_on_full_drops_oldest() {
        let mut fifo = RingBuffer::new(3);
        fifo.push(1.0);
        fifo.push(2.0);
        fifo.push(3.0);
        fifo.push(4.0); // overwrites 1.0
        assert_eq!(fifo.len(), 3);
        assert_eq!(fifo.pop(), 2.0);
        assert_eq!(fifo.pop(), 3.0);
        assert_eq!(fifo.pop(), 4.0);
    }

    #[test]
    fn indexed_peek_counts_from_oldest() {
        let mut fifo = RingBuffer::new(4);
        fifo.push(10.0);
        fifo.push(20.0);
        fifo.push(30.0);
        fifo.pop();
        fifo.push(40.0);
        assert_eq!(fifo.get(0), 20.0);
        assert_eq!(fifo[1], 30.0);
        assert_eq!(fifo[2], 40.0);
    }

    #[test]
    fn peek_front_does_not_consume() {
        let mut fifo = RingBuffer::new(8);
        for i in 0..6 {
            fifo.push(i as f32);
        }
        let mut frame = [0.0f32; 4];
        fifo.peek_front(&mut frame);
        assert_eq!(frame, [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(fifo.len(), 6);
        assert_eq!(fifo.pop(), 0.0);
    }

    #[test]
    fn discard_advances_read_cursor() {
        let mut fifo = RingBuffer::new(8);
        for i in 0..6 {
            fifo.push(i as f32);
        }
        fifo.discard(4);
        assert_eq!(fifo.len(), 2);
        assert_eq!(fifo.pop(), 4.0);
    }

    #[test]
    fn discard_more_than_held_empties() {
        let mut fifo = RingBuffer::new(4);
        fifo.push(1.0);
        fifo.discard(10);
        assert!(fifo.is_empty());
        assert_eq!(fifo.pop(), 0.0);
    }

    #[test]
    fn clear_resets_state() {
        let mut fifo = RingBuffer::new(4);
        fifo.push(1.0);
        fifo.push(2.0);
        fifo.clear();
        assert!(fifo.is_empty());
        assert_eq!(fifo.pop(), 0.0);
        fifo.push(5.0);
        assert_eq!(fifo.get(0), 5.0);
    }

    proptest::proptest! {
        /// Any interleaving of pushes and pops below capacity preserves
        /// FIFO order against a model deque.
        #[test]
        fn fifo_matches_model(ops in proptest::collection::vec((proptest::prelude::any::<bool>(), -1.0f32..1.0), 1..200)) {
            let mut fifo = RingBuffer::new(64);
            let mut model = std::collections::VecDeque::new();
            for (is_push, value) in ops {
                if is_push && model.len() < 64 {
                    fifo.push(value);
                    model.push_back(value);
                } else {
                    let expected = model.pop_front().unwrap_or(0.0);
                    proptest::prop_assert_eq!(fifo.pop(), expected);
                }
                proptest::prop_assert_eq!(fifo.len(), model.len());
            }
        }
    }

    #[test]
    fn wraparound_many_cycles() {
        let mut fifo = RingBuffer::new(7);
        for i in 0..1000 {
            fifo.push(i as f32);
            if i >= 3 {
                let expected = fifo.get(0);
                assert_eq!(fifo.pop(), expected);
            }
        }
        // Occupancy settles at the push/pop imbalance.
        assert_eq!(fifo.len(), 4);
    }
}
