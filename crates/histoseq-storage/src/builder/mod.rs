//! Vector index construction.
//!
//! [`IndexBuilder::build`] walks a corpus, classifies every position into
//! its nearest centroid bucket and returns a [`BuiltIndex`] held in memory.
//! [`BuiltIndex::write`] persists it in the layout described in
//! [`crate::format`].
//!
//! Bucket *assignment* is deterministic for a given corpus, centroid table
//! and configuration. Order inside a bucket follows the order in which
//! worker batches complete and may differ between builds.

mod arena;
mod pipeline;
pub(crate) mod writer;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use histoseq_core::config::MixerConfig;
use histoseq_core::types::FeatureVector;
use histoseq_core::{CoreError, FeatureExtractor, HistoseqConfig};

use crate::error::{StorageError, StorageResult};
use crate::format::Entry;

pub use arena::{Members, MembershipArena};
pub use pipeline::nearest_centroid;

/// Builds bucketed indexes from a corpus.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    mixer: MixerConfig,
    extractor: FeatureExtractor,
    batch_size: usize,
    workers: usize,
}

impl IndexBuilder {
    pub fn new(
        mixer: MixerConfig,
        extractor: FeatureExtractor,
        batch_size: usize,
        workers: usize,
    ) -> Self {
        Self {
            mixer,
            extractor,
            batch_size,
            workers,
        }
    }

    pub fn from_config(config: &HistoseqConfig) -> Self {
        Self::new(
            config.mixer.clone(),
            FeatureExtractor::new(config.features.mode),
            config.index.build_batch_size,
            config.index.workers(),
        )
    }

    /// Classify every corpus position into one of `centroids`.
    ///
    /// # Errors
    ///
    /// - `Core(InvalidInput)` if `centroids` is empty
    /// - `WorkerFailed` if a classification worker panicked
    #[tracing::instrument(skip(self, corpus, centroids), fields(corpus_len = corpus.len(), buckets = centroids.len(), mode = self.extractor.mode().as_str()))]
    pub async fn build(
        &self,
        corpus: &[u8],
        centroids: Vec<FeatureVector>,
    ) -> StorageResult<BuiltIndex> {
        if centroids.is_empty() {
            return Err(CoreError::invalid_input("centroids", "at least one centroid is required").into());
        }
        let started = Instant::now();
        let centroids = Arc::new(centroids);
        let arena = pipeline::classify_corpus(
            corpus,
            Arc::clone(&centroids),
            self.extractor,
            &self.mixer,
            self.batch_size,
            self.workers,
        )
        .await?;

        let centroids = Arc::try_unwrap(centroids).unwrap_or_else(|shared| (*shared).clone());
        let built = BuiltIndex { centroids, arena };
        info!(
            entries = built.len(),
            non_empty_buckets = built.non_empty_buckets(),
            largest_bucket = built.largest_bucket(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index build complete"
        );
        Ok(built)
    }
}

/// A classified corpus that has not been written yet.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    centroids: Vec<FeatureVector>,
    arena: MembershipArena,
}

impl BuiltIndex {
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.centroids.len()
    }

    #[inline]
    pub fn centroids(&self) -> &[FeatureVector] {
        &self.centroids
    }

    #[inline]
    pub fn counts(&self) -> &[u64] {
        self.arena.counts()
    }

    /// Total entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Entries of `bucket`, most recently drained first.
    pub fn members(&self, bucket: usize) -> impl Iterator<Item = &Entry> {
        self.arena.members(bucket)
    }

    pub fn non_empty_buckets(&self) -> usize {
        self.counts().iter().filter(|&&c| c > 0).count()
    }

    pub fn largest_bucket(&self) -> u64 {
        self.counts().iter().copied().max().unwrap_or(0)
    }

    /// Write header and body to `path`, replacing any existing file.
    #[tracing::instrument(skip(self), fields(buckets = self.bucket_count(), entries = self.len()))]
    pub fn write(&self, path: &Path) -> StorageResult<IndexSummary> {
        let bytes = writer::write_index(path, &self.centroids, &self.arena)?;
        info!(path = %path.display(), bytes, "index written");
        Ok(IndexSummary {
            path: path.to_path_buf(),
            buckets: self.bucket_count(),
            entries: self.len() as u64,
            non_empty_buckets: self.non_empty_buckets(),
            largest_bucket: self.largest_bucket(),
            bytes,
        })
    }
}

/// What a finished build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub path: PathBuf,
    pub buckets: usize,
    pub entries: u64,
    pub non_empty_buckets: usize,
    pub largest_bucket: u64,
    pub bytes: u64,
}

/// Build an index over `corpus` and write it to `path`.
///
/// The bucket count is `centroids.len()`; readers must load the file with
/// the same count.
pub async fn build_index(
    corpus: &[u8],
    centroids: Vec<FeatureVector>,
    config: &HistoseqConfig,
    path: impl Into<PathBuf>,
) -> StorageResult<IndexSummary> {
    let path = path.into();
    let built = IndexBuilder::from_config(config).build(corpus, centroids).await?;
    tokio::task::spawn_blocking(move || built.write(&path))
        .await
        .map_err(|e| StorageError::WorkerFailed(e.to_string()))?
}
