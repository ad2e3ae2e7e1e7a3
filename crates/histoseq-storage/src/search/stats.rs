//! Per-query search statistics.

/// Counters for one sharded search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Buckets with at least one entry, ranked against the query.
    pub buckets_ranked: usize,
    /// Buckets with zero entries, never dispatched.
    pub skipped_empty_buckets: usize,
    /// Buckets whose body segment was read.
    pub buckets_scanned: usize,
    /// Entries decoded and scored across all shards.
    pub entries_scored: u64,
    /// Candidates returned after the merge.
    pub candidates: usize,
    /// Wall time of the search in microseconds.
    pub latency_us: u64,
}
