//! Concurrent embed-and-classify pipeline.
//!
//! # Algorithm
//!
//! The mixer walk is inherently sequential. One blocking walker snapshots
//! the mixer's histogram matrix for every corpus position (after one
//! leading sentinel), groups the snapshots into batches and hands them to
//! the driving task over a bounded channel. The driver sends each batch to
//! a blocking worker that runs the attention step and finds the nearest
//! centroid for every position. At most `workers` batches are in flight.
//!
//! Completed batches are drained in arrival order by the driving task,
//! which is the only writer of the membership arena.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use histoseq_core::config::MixerConfig;
use histoseq_core::similarity::cosine_similarity;
use histoseq_core::types::FeatureVector;
use histoseq_core::{ContextMixer, FeatureExtractor, FeatureMatrix};

use crate::error::{StorageError, StorageResult};
use crate::format::Entry;

use super::arena::MembershipArena;

/// Progress is reported this many times over a build.
const PROGRESS_STEPS: usize = 10;

struct Job {
    matrix: FeatureMatrix,
    symbol: u8,
    position: u64,
}

struct Batch {
    index: usize,
    jobs: Vec<Job>,
}

type Classified = Vec<(usize, Entry)>;

/// Index of the centroid with the highest cosine similarity to `vector`.
///
/// Ties go to the lowest index. Returns 0 for an empty centroid table.
pub fn nearest_centroid(vector: &[f32], centroids: &[FeatureVector]) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let score = cosine_similarity(vector, c);
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best
}

fn classify_batch(
    jobs: Vec<Job>,
    centroids: &[FeatureVector],
    extractor: FeatureExtractor,
) -> Classified {
    jobs.into_iter()
        .map(|job| {
            let vector = extractor.extract_matrix(&job.matrix);
            let bucket = nearest_centroid(&vector, centroids);
            (
                bucket,
                Entry {
                    vector,
                    symbol: job.symbol,
                    position: job.position,
                },
            )
        })
        .collect()
}

/// Sequential mixer walk, run on a blocking thread. Stops early once the
/// receiver is gone.
fn walk_corpus(
    corpus: &[u8],
    mixer_config: &MixerConfig,
    batch_size: usize,
    tx: mpsc::Sender<Batch>,
) {
    let mut mixer = ContextMixer::new(mixer_config);
    mixer.add(0);
    for (index, chunk) in corpus.chunks(batch_size).enumerate() {
        let base = index * batch_size;
        let jobs = chunk
            .iter()
            .enumerate()
            .map(|(offset, &symbol)| {
                let job = Job {
                    matrix: mixer.feature_matrix(),
                    symbol,
                    position: (base + offset) as u64,
                };
                mixer.add(symbol);
                job
            })
            .collect();
        if tx.blocking_send(Batch { index, jobs }).is_err() {
            debug!(batch = index, "walk stopped, driver gone");
            return;
        }
    }
}

struct Drain {
    arena: MembershipArena,
    processed: usize,
    total: usize,
    next_report: usize,
    step: usize,
    started: Instant,
}

impl Drain {
    fn new(bucket_count: usize, total: usize) -> Self {
        let step = (total / PROGRESS_STEPS).max(1);
        Self {
            arena: MembershipArena::new(bucket_count),
            processed: 0,
            total,
            next_report: step,
            step,
            started: Instant::now(),
        }
    }

    async fn one(&mut self, tasks: &mut JoinSet<Classified>) -> StorageResult<()> {
        let Some(joined) = tasks.join_next().await else {
            return Ok(());
        };
        let items = joined.map_err(|e| StorageError::WorkerFailed(e.to_string()))?;
        self.processed += items.len();
        for (bucket, entry) in items {
            self.arena.insert(bucket, entry);
        }
        if self.processed >= self.next_report {
            info!(
                processed = self.processed,
                total = self.total,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "index build progress"
            );
            while self.next_report <= self.processed {
                self.next_report += self.step;
            }
        }
        Ok(())
    }
}

/// Classify every position of `corpus` into a bucket of `centroids`.
pub(crate) async fn classify_corpus(
    corpus: &[u8],
    centroids: Arc<Vec<FeatureVector>>,
    extractor: FeatureExtractor,
    mixer_config: &MixerConfig,
    batch_size: usize,
    workers: usize,
) -> StorageResult<MembershipArena> {
    let batch_size = batch_size.max(1);
    let workers = workers.max(1);

    let mut tasks = JoinSet::new();
    let mut drain = Drain::new(centroids.len(), corpus.len());

    let (tx, mut rx) = mpsc::channel(workers);
    let owned: Arc<[u8]> = Arc::from(corpus);
    let mixer_config = mixer_config.clone();
    let walker =
        tokio::task::spawn_blocking(move || walk_corpus(&owned, &mixer_config, batch_size, tx));

    while let Some(Batch { index, jobs }) = rx.recv().await {
        while tasks.len() >= workers {
            drain.one(&mut tasks).await?;
        }
        let centroids = Arc::clone(&centroids);
        tasks.spawn_blocking(move || classify_batch(jobs, &centroids, extractor));
        debug!(batch = index, in_flight = tasks.len(), "batch dispatched");
    }
    walker
        .await
        .map_err(|e| StorageError::WorkerFailed(e.to_string()))?;

    while !tasks.is_empty() {
        drain.one(&mut tasks).await?;
    }
    Ok(drain.arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use histoseq_core::{zero_vector, FeatureMode};

    fn axis(i: usize) -> FeatureVector {
        let mut v = zero_vector();
        v[i] = 1.0;
        v
    }

    #[test]
    fn test_nearest_centroid_by_cosine() {
        let centroids = vec![axis(0), axis(1), axis(2)];
        let mut v = zero_vector();
        v[1] = 10.0;
        v[2] = 3.0;
        assert_eq!(nearest_centroid(&v, &centroids), 1);
    }

    #[test]
    fn test_nearest_centroid_tie_goes_to_lowest() {
        let centroids = vec![axis(3), axis(0), axis(0)];
        assert_eq!(nearest_centroid(&axis(0), &centroids), 1);
        assert_eq!(nearest_centroid(&zero_vector(), &centroids), 0);
    }

    #[test]
    fn test_walk_batches_positions_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        walk_corpus(b"abcdefg", &MixerConfig::default(), 3, tx);

        let mut sizes = Vec::new();
        let mut positions = Vec::new();
        while let Ok(batch) = rx.try_recv() {
            assert_eq!(batch.index, sizes.len());
            sizes.push(batch.jobs.len());
            positions.extend(batch.jobs.iter().map(|j| j.position));
        }
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(positions, (0..7).collect::<Vec<u64>>());
    }

    #[test]
    fn test_walk_stops_when_driver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // returns after the first failed send
        walk_corpus(&[b'x'; 64], &MixerConfig::default(), 1, tx);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_classify_on_single_threaded_runtime() {
        let corpus = b"the walk runs off the runtime thread";
        let arena = classify_corpus(
            corpus,
            Arc::new(vec![axis(b't' as usize), axis(b' ' as usize)]),
            FeatureExtractor::new(FeatureMode::Entropy),
            &MixerConfig::default(),
            2,
            1,
        )
        .await
        .unwrap();
        assert_eq!(arena.len(), corpus.len());
    }

    #[tokio::test]
    async fn test_classify_assigns_every_position_once() {
        let corpus = b"the cat sat on the mat";
        let centroids = Arc::new(vec![axis(b't' as usize), axis(b'a' as usize), axis(b' ' as usize)]);
        let arena = classify_corpus(
            corpus,
            centroids,
            FeatureExtractor::new(FeatureMode::Attention),
            &MixerConfig::default(),
            4,
            3,
        )
        .await
        .unwrap();

        assert_eq!(arena.len(), corpus.len());
        let mut positions: Vec<u64> = (0..arena.bucket_count())
            .flat_map(|b| arena.members(b).map(|e| e.position).collect::<Vec<_>>())
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, (0..corpus.len() as u64).collect::<Vec<_>>());
        for b in 0..arena.bucket_count() {
            for e in arena.members(b) {
                assert_eq!(e.symbol, corpus[e.position as usize]);
            }
        }
    }

    #[tokio::test]
    async fn test_entry_vectors_match_sequential_walk() {
        let corpus = b"abcabc";
        let extractor = FeatureExtractor::new(FeatureMode::Rank);
        let config = MixerConfig::default();
        let arena = classify_corpus(corpus, Arc::new(vec![axis(0)]), extractor, &config, 2, 2)
            .await
            .unwrap();

        let mut mixer = ContextMixer::new(&config);
        mixer.add(0);
        let mut expected = Vec::new();
        for &b in corpus.iter() {
            expected.push(extractor.extract(&mixer));
            mixer.add(b);
        }
        for e in arena.members(0) {
            assert_eq!(e.vector, expected[e.position as usize]);
        }
    }
}
