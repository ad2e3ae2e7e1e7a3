//! Configuration sub-structures.

use serde::{Deserialize, Serialize};

use crate::features::FeatureMode;
use crate::mixer::MixerVariant;
use crate::sampler::{SamplerStrategy, SelectionRule};

/// Buckets per unit of `model_size`.
pub const BUCKETS_PER_MODEL_UNIT: usize = 1024;

/// Context mixer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MixerConfig {
    /// Flat bank or one bank per previous symbol.
    pub variant: MixerVariant,
    /// Markov order; the mixer keeps `order + 1` recent symbols.
    pub order: usize,
    /// Histogram window capacities, one histogram per entry.
    pub scales: Vec<usize>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            variant: MixerVariant::Flat,
            order: 7,
            scales: vec![1, 2, 4, 8, 16, 32, 64, 128],
        }
    }
}

/// Feature extraction configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Extraction mode. An index must be queried with the mode it was built with.
    pub mode: FeatureMode,
}

/// Vector index build configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Bucket count is `model_size * 1024` unless `bucket_count` overrides it.
    pub model_size: usize,
    /// Explicit bucket count, mainly for small test fixtures.
    pub bucket_count: Option<usize>,
    /// Location of the persisted index file.
    pub path: String,
    /// Corpus positions handled by one embed-and-classify task.
    pub build_batch_size: usize,
    /// Concurrent build tasks in flight; 0 means one per CPU.
    pub build_workers: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            model_size: 1,
            bucket_count: None,
            path: "./data/histoseq.idx".to_string(),
            build_batch_size: 256,
            build_workers: 0,
        }
    }
}

impl IndexConfig {
    /// Effective number of buckets.
    pub fn buckets(&self) -> usize {
        self.bucket_count
            .unwrap_or(self.model_size * BUCKETS_PER_MODEL_UNIT)
    }

    /// Effective number of build workers.
    pub fn workers(&self) -> usize {
        if self.build_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.build_workers
        }
    }
}

/// Sharded search configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Independent read handles, and therefore buckets scanned per query.
    pub shard_count: usize,
    /// Entries kept from each scanned bucket.
    pub per_bucket_top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            shard_count: 4,
            per_bucket_top_n: 64,
        }
    }
}

/// Diffusion sampler configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    /// PageRank damping factor in (0, 1].
    pub damping: f64,
    /// L1 convergence tolerance for the power iteration.
    pub tolerance: f64,
    /// Iteration cap for the power iteration.
    pub max_iterations: usize,
    /// Top merged candidates admitted to the diffusion graph.
    pub candidate_pool: usize,
    /// Recent query vectors kept as context nodes.
    pub query_window: usize,
    pub selection: SelectionRule,
    pub strategy: SamplerStrategy,
    /// Fixed RNG seed; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            damping: 1.0,
            tolerance: 1e-3,
            max_iterations: 1000,
            candidate_pool: 16,
            query_window: 8,
            selection: SelectionRule::InverseCdf,
            strategy: SamplerStrategy::Diffusion,
            seed: None,
        }
    }
}

/// Generation loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Output units produced when the caller does not specify a count.
    pub count: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { count: 128 }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            include_location: false,
        }
    }
}
