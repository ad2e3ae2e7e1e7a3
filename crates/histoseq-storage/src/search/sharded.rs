//! Sharded bucket search.
//!
//! # Algorithm
//!
//! 1. Rank every bucket with a nonzero count by cosine similarity between
//!    its centroid and the query (header only, no I/O). Empty buckets are
//!    skipped and the next-best bucket takes their place.
//! 2. Dispatch the top `K` buckets, bucket `i` to shard handle `i`. Each
//!    worker seeks to the bucket's body segment, reads the whole slab,
//!    scores every entry and returns the best `min(top_n, count)` sorted
//!    by descending similarity.
//! 3. Merge worker results as they arrive on the channel and re-sort the
//!    merged list globally.
//!
//! Workers only read. Each holds its own file handle, so there is no
//! contention beyond collecting results.

use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use histoseq_core::config::SearchConfig;
use histoseq_core::similarity::cosine_similarity;
use histoseq_core::types::{sort_candidates, Candidate, FeatureVector};

use crate::error::{StorageError, StorageResult};
use crate::format::{self, Entry, ENTRY_SIZE};
use crate::store::{Segment, VectorIndex};

use super::interrupt::{any_raised, InterruptOnDrop};
use super::stats::SearchStats;

/// Merged candidates of one search plus its counters.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub candidates: Vec<Candidate>,
    pub stats: SearchStats,
}

struct ShardScan {
    top: Vec<Candidate>,
    scored: u64,
}

/// Parallel searcher over `K` independent read handles.
#[derive(Debug)]
pub struct ShardedSearcher {
    index: Arc<VectorIndex>,
    path: String,
    shards: Vec<Arc<Mutex<File>>>,
    per_bucket_top_n: usize,
}

impl ShardedSearcher {
    /// Open `config.shard_count` read handles onto the index file.
    ///
    /// # Errors
    ///
    /// `Io` if any handle cannot be opened.
    pub fn open(index: Arc<VectorIndex>, config: &SearchConfig) -> StorageResult<Self> {
        let path = index.path().display().to_string();
        let shards = (0..config.shard_count.max(1))
            .map(|_| {
                File::open(index.path())
                    .map(|f| Arc::new(Mutex::new(f)))
                    .map_err(|e| StorageError::io(&path, 0, e))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        debug!(path = %path, shards = shards.len(), "shard handles opened");
        Ok(Self {
            index,
            path,
            shards,
            per_bucket_top_n: config.per_bucket_top_n.max(1),
        })
    }

    #[inline]
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Non-empty buckets ordered by centroid similarity to `query`,
    /// descending, ties by bucket index.
    pub fn rank_buckets(&self, query: &FeatureVector) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self
            .index
            .centroids()
            .iter()
            .enumerate()
            .filter(|(bucket, _)| self.index.count(*bucket) > 0)
            .map(|(bucket, centroid)| (bucket, cosine_similarity(query, centroid)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Search without an external interrupt.
    pub async fn search(&self, query: &FeatureVector) -> StorageResult<SearchOutcome> {
        self.search_with_interrupt(query, &Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Search, stopping early with `Cancelled` once `interrupt` is raised.
    ///
    /// Dropping the returned future also stops in-flight shard workers.
    ///
    /// # Errors
    ///
    /// - `CorruptIndex` if a bucket slab is shorter than its header claims
    /// - `Io` on seek/read failure
    /// - `Cancelled` if `interrupt` was raised
    /// - `WorkerFailed` if a shard worker exited without reporting
    #[tracing::instrument(skip(self, query, interrupt), fields(shards = self.shards.len()))]
    pub async fn search_with_interrupt(
        &self,
        query: &FeatureVector,
        interrupt: &Arc<AtomicBool>,
    ) -> StorageResult<SearchOutcome> {
        let started = Instant::now();
        if interrupt.load(Ordering::Relaxed) {
            return Err(StorageError::Cancelled);
        }

        let ranked = self.rank_buckets(query);
        let skipped_empty_buckets = self.index.bucket_count() - ranked.len();
        let segments: Vec<Segment> = ranked
            .iter()
            .take(self.shards.len())
            .map(|&(bucket, _)| self.index.segment(bucket))
            .collect();

        let guard = InterruptOnDrop::new();
        let (tx, mut rx) = mpsc::channel(segments.len().max(1));
        for (shard, segment) in segments.iter().copied().enumerate() {
            let tx = tx.clone();
            let file = Arc::clone(&self.shards[shard]);
            let path = self.path.clone();
            let flags = [guard.flag(), Arc::clone(interrupt)];
            let query = *query;
            let top_n = self.per_bucket_top_n;
            tokio::task::spawn_blocking(move || {
                let result = scan_segment(&file, &path, segment, &query, top_n, &flags);
                // receiver is gone only when the search was abandoned
                let _ = tx.blocking_send((segment.bucket, result));
            });
        }
        drop(tx);

        let mut candidates = Vec::new();
        let mut received = 0usize;
        let mut entries_scored = 0u64;
        while let Some((bucket, result)) = rx.recv().await {
            received += 1;
            let scan = match result {
                Ok(scan) => scan,
                Err(err) => {
                    warn!(bucket, error = %err, "shard scan failed");
                    return Err(err);
                }
            };
            entries_scored += scan.scored;
            candidates.extend(scan.top);
        }
        if interrupt.load(Ordering::Relaxed) {
            return Err(StorageError::Cancelled);
        }
        if received < segments.len() {
            return Err(StorageError::WorkerFailed(format!(
                "{} of {} shard workers exited without reporting",
                segments.len() - received,
                segments.len()
            )));
        }

        sort_candidates(&mut candidates);
        let stats = SearchStats {
            buckets_ranked: ranked.len(),
            skipped_empty_buckets,
            buckets_scanned: segments.len(),
            entries_scored,
            candidates: candidates.len(),
            latency_us: started.elapsed().as_micros() as u64,
        };
        debug!(
            buckets_scanned = stats.buckets_scanned,
            skipped_empty_buckets = stats.skipped_empty_buckets,
            entries_scored = stats.entries_scored,
            candidates = stats.candidates,
            latency_us = stats.latency_us,
            "sharded search complete"
        );
        Ok(SearchOutcome { candidates, stats })
    }
}

/// Read one bucket slab and keep its best `top_n` entries.
fn scan_segment(
    file: &Mutex<File>,
    path: &str,
    segment: Segment,
    query: &FeatureVector,
    top_n: usize,
    flags: &[Arc<AtomicBool>],
) -> StorageResult<ShardScan> {
    if any_raised(flags) {
        return Err(StorageError::Cancelled);
    }
    let slab = {
        let mut handle = file.lock();
        format::read_slab(&mut *handle, path, segment.offset, segment.count)?
    };

    let mut top = Vec::with_capacity(segment.count as usize);
    for raw in slab.chunks_exact(ENTRY_SIZE) {
        if any_raised(flags) {
            return Err(StorageError::Cancelled);
        }
        let entry = Entry::decode(raw);
        let similarity = cosine_similarity(query, &entry.vector);
        top.push(entry.to_candidate(similarity));
    }
    let scored = top.len() as u64;
    sort_candidates(&mut top);
    top.truncate(top_n.min(segment.count as usize));
    Ok(ShardScan { top, scored })
}
