//! Exact sliding-window symbol histogram.
//!
//! A [`Histogram`] keeps the last `capacity` symbols in a ring buffer next to
//! a 256-entry count vector. Every `add` is O(1): the symbol leaving the
//! window is decremented, the arriving one incremented.
//!
//! # Invariant
//!
//! After `n` additions the count vector equals the multiset of the last
//! `min(n, capacity)` symbols, so `total() == min(n, capacity)`.

use crate::error::{CoreError, CoreResult};
use crate::ALPHABET_SIZE;

/// Fixed-capacity circular frequency counter over a window of symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u32; ALPHABET_SIZE],
    buffer: Vec<u8>,
    index: usize,
    len: usize,
}

impl Histogram {
    /// Create an empty histogram with the given window capacity.
    ///
    /// Capacities come from validated configuration; a zero capacity is
    /// raised to 1. Use [`try_new`](Self::try_new) for unchecked input.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "histogram capacity must be positive");
        Self {
            counts: [0; ALPHABET_SIZE],
            buffer: vec![0; capacity.max(1)],
            index: 0,
            len: 0,
        }
    }

    /// Like [`new`](Self::new), rejecting a zero capacity.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `capacity == 0`.
    pub fn try_new(capacity: usize) -> CoreResult<Self> {
        if capacity == 0 {
            return Err(CoreError::invalid_input(
                "capacity",
                "histogram capacity must be positive",
            ));
        }
        Ok(Self::new(capacity))
    }

    /// Window capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of symbols currently inside the window.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True until the first symbol is added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Per-symbol counts over the current window.
    #[inline]
    pub fn counts(&self) -> &[u32; ALPHABET_SIZE] {
        &self.counts
    }

    /// Sum of all counts; always `min(adds, capacity)`.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Slide the window forward by one symbol.
    pub fn add(&mut self, symbol: u8) {
        let next = (self.index + 1) % self.buffer.len();
        if self.len == self.buffer.len() {
            let evicted = self.buffer[next] as usize;
            // the evicted slot always holds a counted symbol once the window is full
            debug_assert!(self.counts[evicted] > 0);
            self.counts[evicted] = self.counts[evicted].saturating_sub(1);
        } else {
            self.len += 1;
        }
        self.buffer[next] = symbol;
        self.counts[symbol as usize] += 1;
        self.index = next;
    }

    /// Write the window as a probability distribution into `row`.
    ///
    /// An empty window yields an all-zero row instead of dividing by zero.
    /// Returns `false` in that degenerate case.
    pub fn normalize_into(&self, row: &mut [f32]) -> bool {
        debug_assert_eq!(row.len(), ALPHABET_SIZE);
        let total = self.total();
        if total == 0 {
            row.iter_mut().for_each(|v| *v = 0.0);
            return false;
        }
        let total = total as f32;
        for (out, &count) in row.iter_mut().zip(self.counts.iter()) {
            *out = count as f32 / total;
        }
        true
    }
}
