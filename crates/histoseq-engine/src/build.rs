//! Offline index build wiring.

use std::path::Path;

use tracing::info;

use histoseq_core::{CentroidSource, CoreError, CorpusStatistics, FeatureExtractor, HistoseqConfig};
use histoseq_storage::{build_index, IndexSummary};

use crate::error::EngineResult;

/// Build an index over `corpus` with centroids from `centroids` and write it
/// to `config.index.path`.
///
/// Corpus statistics are only computed when the centroid source reads them.
///
/// # Errors
///
/// - `Core` if the config is invalid or the source returns the wrong
///   number of centroids
/// - `Storage` on build or write failure
#[tracing::instrument(skip(corpus, centroids, config), fields(corpus_len = corpus.len(), buckets = config.index.buckets()))]
pub async fn build_from_corpus(
    corpus: &[u8],
    centroids: &dyn CentroidSource,
    config: &HistoseqConfig,
) -> EngineResult<IndexSummary> {
    config.validate()?;
    let buckets = config.index.buckets();
    let stats = if centroids.needs_statistics() {
        CorpusStatistics::accumulate(corpus, &FeatureExtractor::new(config.features.mode), &config.mixer)
    } else {
        CorpusStatistics::empty()
    };

    let table = centroids.centroids(&stats, buckets)?;
    if table.len() != buckets {
        return Err(CoreError::invalid_input(
            "centroids",
            format!("source returned {} centroids for {} buckets", table.len(), buckets),
        )
        .into());
    }

    let summary = build_index(corpus, table, config, Path::new(&config.index.path)).await?;
    info!(
        path = %summary.path.display(),
        entries = summary.entries,
        non_empty_buckets = summary.non_empty_buckets,
        largest_bucket = summary.largest_bucket,
        "index ready"
    );
    Ok(summary)
}
