//! Candidate retrieval seam.
//!
//! The generation loop only needs "ranked candidates for this query
//! vector". [`ShardedSearcher`] provides them from a bucketed index file;
//! [`FlatSource`] from an in-memory exhaustive store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use histoseq_core::config::SearchConfig;
use histoseq_core::types::{Candidate, FeatureVector};
use histoseq_storage::{FlatStore, ShardedSearcher, StorageError, StorageResult};

/// Supplies candidates sorted best-first.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Retrieve candidates for `query`, honoring `interrupt`.
    async fn candidates(
        &self,
        query: &FeatureVector,
        interrupt: &Arc<AtomicBool>,
    ) -> StorageResult<Vec<Candidate>>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl CandidateSource for ShardedSearcher {
    async fn candidates(
        &self,
        query: &FeatureVector,
        interrupt: &Arc<AtomicBool>,
    ) -> StorageResult<Vec<Candidate>> {
        Ok(self.search_with_interrupt(query, interrupt).await?.candidates)
    }

    fn name(&self) -> &'static str {
        "sharded"
    }
}

/// Exhaustive search over a [`FlatStore`].
#[derive(Debug, Clone)]
pub struct FlatSource {
    store: Arc<FlatStore>,
    k: usize,
}

impl FlatSource {
    pub fn new(store: Arc<FlatStore>, k: usize) -> Self {
        Self { store, k: k.max(1) }
    }

    /// Return as many candidates as a sharded search could:
    /// `shard_count × per_bucket_top_n`.
    pub fn from_config(store: Arc<FlatStore>, config: &SearchConfig) -> Self {
        Self::new(store, config.shard_count * config.per_bucket_top_n)
    }
}

#[async_trait]
impl CandidateSource for FlatSource {
    async fn candidates(
        &self,
        query: &FeatureVector,
        interrupt: &Arc<AtomicBool>,
    ) -> StorageResult<Vec<Candidate>> {
        if interrupt.load(Ordering::Relaxed) {
            return Err(StorageError::Cancelled);
        }
        let store = Arc::clone(&self.store);
        let query = *query;
        let k = self.k;
        tokio::task::spawn_blocking(move || store.nearest(&query, k))
            .await
            .map_err(|e| StorageError::WorkerFailed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}
