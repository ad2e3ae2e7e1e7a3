//! Bucket membership lists backed by one entry arena.
//!
//! Every bucket is a singly linked list threaded through `nodes` by index.
//! New members are prepended, so walking a bucket yields its entries in
//! reverse insertion order.

use crate::format::Entry;

#[derive(Debug, Clone)]
struct Node {
    entry: Entry,
    next: Option<usize>,
}

/// Arena of entries plus per-bucket list heads and counts.
#[derive(Debug, Clone)]
pub struct MembershipArena {
    nodes: Vec<Node>,
    heads: Vec<Option<usize>>,
    counts: Vec<u64>,
}

impl MembershipArena {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            nodes: Vec::new(),
            heads: vec![None; bucket_count],
            counts: vec![0; bucket_count],
        }
    }

    /// Prepend `entry` to `bucket`'s list.
    ///
    /// # Panics
    ///
    /// Panics if `bucket >= bucket_count`.
    pub fn insert(&mut self, bucket: usize, entry: Entry) {
        let id = self.nodes.len();
        self.nodes.push(Node {
            entry,
            next: self.heads[bucket],
        });
        self.heads[bucket] = Some(id);
        self.counts[bucket] += 1;
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    /// Total entries across all buckets.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Members of `bucket`, most recently inserted first.
    pub fn members(&self, bucket: usize) -> Members<'_> {
        Members {
            arena: self,
            cursor: self.heads[bucket],
        }
    }
}

/// Iterator over one bucket's list.
pub struct Members<'a> {
    arena: &'a MembershipArena,
    cursor: Option<usize>,
}

impl<'a> Iterator for Members<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.arena.nodes[self.cursor?];
        self.cursor = node.next;
        Some(&node.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histoseq_core::zero_vector;

    fn entry(position: u64) -> Entry {
        Entry {
            vector: zero_vector(),
            symbol: position as u8,
            position,
        }
    }

    #[test]
    fn test_prepend_order_and_counts() {
        let mut arena = MembershipArena::new(3);
        arena.insert(1, entry(10));
        arena.insert(2, entry(11));
        arena.insert(1, entry(12));
        arena.insert(1, entry(13));

        let bucket1: Vec<u64> = arena.members(1).map(|e| e.position).collect();
        assert_eq!(bucket1, vec![13, 12, 10]);
        assert_eq!(arena.counts(), &[0, 3, 1]);
        assert_eq!(arena.members(0).count(), 0);
        assert_eq!(arena.len(), 4);
    }
}
