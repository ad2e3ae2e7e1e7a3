//! Histogram context mixing and retrieval primitives for histoseq.
//!
//! This crate holds everything that does not touch the persisted index: the
//! sliding-window statistics that describe recent input, the feature vectors
//! derived from them, and the diffusion sampler that weighs retrieved
//! candidates.
//!
//! # Architecture
//!
//! - **histogram**: exact sliding-window byte frequency counter
//! - **mixer**: multi-scale histogram banks plus Markov context
//! - **features**: attention-mix, entropy-mix and rank-mix extraction
//! - **similarity**: cosine and vector helpers
//! - **diffusion**: PageRank over cosine-similarity graphs
//! - **sampler**: candidate selection by diffusion or greedy ranking
//! - **centroids**: corpus statistics and the bucket centroid seam
//! - **config**: `HistoseqConfig` and its sections
//! - **error**: `CoreError` and `CoreResult`
//!
//! # Example
//!
//! ```
//! use histoseq_core::config::MixerConfig;
//! use histoseq_core::{ContextMixer, FeatureExtractor, FeatureMode, FEATURE_DIM};
//!
//! let mut mixer = ContextMixer::new(&MixerConfig::default());
//! mixer.prime(b"hello");
//! let v = FeatureExtractor::new(FeatureMode::Entropy).extract(&mixer);
//! assert_eq!(v.len(), FEATURE_DIM);
//! ```

pub mod centroids;
pub mod config;
pub mod diffusion;
pub mod error;
pub mod features;
pub mod histogram;
pub mod mixer;
pub mod sampler;
pub mod similarity;
pub mod types;

/// Number of distinct symbols (bytes).
pub const ALPHABET_SIZE: usize = 256;

/// Width of every feature vector and centroid.
pub const FEATURE_DIM: usize = 256;

// Re-exports for convenience
pub use centroids::{
    CentroidSource, CorpusStatistics, FixedCentroids, GaussianCentroids, GaussianFactor,
};
pub use config::HistoseqConfig;
pub use diffusion::{DiffusionParams, SimilarityGraph, Stationary};
pub use error::{CoreError, CoreResult};
pub use features::{FeatureExtractor, FeatureMatrix, FeatureMode};
pub use histogram::Histogram;
pub use mixer::{ContextMixer, MixerVariant};
pub use sampler::{DiffusionSampler, SamplerStrategy, SelectionRule};
pub use similarity::cosine_similarity;
pub use types::{sort_candidates, zero_vector, Candidate, FeatureVector};
