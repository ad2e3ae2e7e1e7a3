//! Feature extraction modes built on the shared attention primitive.

use serde::{Deserialize, Serialize};

use crate::diffusion::{DiffusionParams, SimilarityGraph};
use crate::mixer::ContextMixer;
use crate::types::FeatureVector;

use super::attention::{Attention, Summary};
use super::FeatureMatrix;

/// Diffusion constants used by rank-mix.
pub const RANK_MIX_PARAMS: DiffusionParams = DiffusionParams {
    damping: 1.0,
    tolerance: 1e-3,
    max_iterations: 1000,
};

/// Which summary of the attended histogram rows becomes the feature vector.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMode {
    /// Sum of attended rows, unnormalized.
    #[default]
    Attention,
    /// Sum of attended rows, L2-normalized.
    Entropy,
    /// Attended rows reweighted by their PageRank over the row graph, L2-normalized.
    Rank,
}

impl FeatureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureMode::Attention => "attention",
            FeatureMode::Entropy => "entropy",
            FeatureMode::Rank => "rank",
        }
    }
}

/// Turns a mixer's histogram bank into one 256-wide feature vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureExtractor {
    mode: FeatureMode,
}

impl FeatureExtractor {
    pub fn new(mode: FeatureMode) -> Self {
        Self { mode }
    }

    #[inline]
    pub fn mode(&self) -> FeatureMode {
        self.mode
    }

    /// Extract from the mixer's active bank.
    pub fn extract(&self, mixer: &ContextMixer) -> FeatureVector {
        self.extract_matrix(&mixer.feature_matrix())
    }

    /// Extract from an already normalized histogram matrix.
    pub fn extract_matrix(&self, matrix: &FeatureMatrix) -> FeatureVector {
        let attention = Attention::compute(matrix);
        let summary = match self.mode {
            FeatureMode::Attention => Summary::Sum,
            FeatureMode::Entropy => Summary::NormalizedSum,
            FeatureMode::Rank => Summary::Weighted(row_ranks(matrix)),
        };
        attention.summarize(&summary)
    }

    /// Per-row Shannon entropy of the attended matrix (entropy-mix summary).
    pub fn entropies(&self, matrix: &FeatureMatrix) -> Vec<f32> {
        Attention::compute(matrix).row_entropies()
    }
}

/// Stationary importance of each histogram row over the row cosine graph.
fn row_ranks(matrix: &FeatureMatrix) -> Vec<f64> {
    let rows: Vec<&[f32]> = matrix.iter_rows().collect();
    SimilarityGraph::from_vectors(&rows).stationary_distribution(&RANK_MIX_PARAMS)
}
