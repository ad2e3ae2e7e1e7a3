//! The generation loop.
//!
//! # Algorithm
//!
//! For each step:
//!
//! 1. Take the query vector of the live mixer.
//! 2. Retrieve ranked candidates from the [`CandidateSource`].
//! 3. Select one with the [`DiffusionSampler`], using the recent query
//!    vectors as context nodes.
//! 4. Feed the chosen symbol back into the mixer and the UTF-8 assembler.
//!
//! Steps repeat until `count` output units are complete. The returned text
//! is the query followed by every emitted unit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use histoseq_core::config::MixerConfig;
use histoseq_core::{DiffusionSampler, FeatureExtractor, HistoseqConfig};
use histoseq_storage::{ShardedSearcher, StorageError, VectorIndex};

use crate::error::EngineResult;
use crate::query_state::{GeneratedUnit, QueryState};
use crate::source::CandidateSource;

/// Result of one `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    /// Query bytes followed by the generated bytes.
    pub text: Vec<u8>,
    /// Generated units in order, each tagged with its corpus position.
    pub units: Vec<GeneratedUnit>,
    query_len: usize,
}

impl GenerationOutput {
    /// Bytes after the query.
    #[inline]
    pub fn generated(&self) -> &[u8] {
        &self.text[self.query_len..]
    }
}

/// Retrieval-augmented byte generator.
pub struct Generator {
    source: Arc<dyn CandidateSource>,
    mixer: MixerConfig,
    extractor: FeatureExtractor,
    sampler: DiffusionSampler,
    query_window: usize,
    seed: Option<u64>,
    default_count: usize,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("source", &self.source.name())
            .field("mode", &self.extractor.mode())
            .field("sampler", &self.sampler)
            .field("query_window", &self.query_window)
            .field("seed", &self.seed)
            .finish()
    }
}

impl Generator {
    /// Create a generator over any candidate source.
    ///
    /// # Errors
    ///
    /// `Core(ConfigError)` if `config` fails validation.
    pub fn new(config: &HistoseqConfig, source: Arc<dyn CandidateSource>) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            mixer: config.mixer.clone(),
            extractor: FeatureExtractor::new(config.features.mode),
            sampler: DiffusionSampler::from_config(&config.sampler),
            query_window: config.sampler.query_window,
            seed: config.sampler.seed,
            default_count: config.generation.count,
        })
    }

    /// Load the index header at `config.index.path` and search it with
    /// `config.search.shard_count` handles.
    pub fn open(config: &HistoseqConfig) -> EngineResult<Self> {
        config.validate()?;
        let index = Arc::new(VectorIndex::load(&config.index.path, config.index.buckets())?);
        let searcher = ShardedSearcher::open(index, &config.search)?;
        Self::new(config, Arc::new(searcher))
    }

    /// Units produced when the caller has no count of its own.
    #[inline]
    pub fn default_count(&self) -> usize {
        self.default_count
    }

    /// Prime with `query` and generate `count` units.
    pub async fn generate(&self, query: &[u8], count: usize) -> EngineResult<GenerationOutput> {
        self.generate_with_interrupt(query, count, &Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Like [`generate`](Self::generate), aborting with a cancelled error
    /// once `interrupt` is raised.
    ///
    /// Stops early, returning what it has, if the source yields no
    /// candidates (an empty index).
    #[tracing::instrument(skip(self, query, interrupt), fields(query_len = query.len(), source = self.source.name()))]
    pub async fn generate_with_interrupt(
        &self,
        query: &[u8],
        count: usize,
        interrupt: &Arc<AtomicBool>,
    ) -> EngineResult<GenerationOutput> {
        let started = Instant::now();
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut state = QueryState::new(&self.mixer, self.extractor, self.query_window);
        state.prime(query);

        let mut units: Vec<GeneratedUnit> = Vec::with_capacity(count);
        let mut steps = 0usize;
        while units.len() < count {
            if interrupt.load(Ordering::Relaxed) {
                return Err(StorageError::Cancelled.into());
            }
            let query_vector = *state.current();
            let candidates = self.source.candidates(&query_vector, interrupt).await?;
            let Some(chosen) = self
                .sampler
                .select(state.context(), &candidates, &mut rng)
                .and_then(|i| candidates.get(i))
            else {
                warn!(step = steps, units = units.len(), "no candidates, stopping early");
                break;
            };
            trace!(
                step = steps,
                symbol = chosen.symbol,
                position = chosen.position,
                similarity = chosen.similarity,
                "candidate selected"
            );
            units.extend(state.emit(chosen.symbol, chosen.position));
            steps += 1;
        }
        units.truncate(count);

        let mut text = Vec::with_capacity(query.len() + units.len());
        text.extend_from_slice(query);
        for unit in &units {
            text.extend_from_slice(&unit.bytes);
        }
        if !state.pending().is_empty() {
            debug!(pending = state.pending().len(), "incomplete code point dropped");
        }
        info!(
            steps,
            units = units.len(),
            latency_us = started.elapsed().as_micros() as u64,
            "generation complete"
        );
        Ok(GenerationOutput {
            text,
            units,
            query_len: query.len(),
        })
    }
}
