//! Diffusion-based candidate sampler.
//!
//! # Algorithm
//!
//! 1. Keep the best `candidate_pool` retrieved candidates (input is sorted
//!    best-first).
//! 2. Build the complete cosine graph over the recent query vectors plus
//!    those candidates and diffuse (see [`crate::diffusion`]).
//! 3. Restrict the stationary distribution to the candidate nodes and
//!    renormalize.
//! 4. Draw `u ~ U[0, 1)` and pick a candidate with [`SelectionRule`].
//!
//! [`SamplerStrategy::Greedy`] skips diffusion and returns the single most
//! similar candidate.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::SamplerConfig;
use crate::diffusion::{DiffusionParams, SimilarityGraph};
use crate::types::{Candidate, FeatureVector};

/// How a uniform draw maps onto the cumulative weights.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Standard inverse CDF: first `i` with `u < Σ_{k<=i} w_k`.
    #[default]
    InverseCdf,
    /// Compare before accumulating: first `i` with `u < Σ_{k<i} w_k`,
    /// falling back to the last candidate. Never selects index 0: slot `k`
    /// receives `w_{k-1}` and the last slot also keeps its own weight.
    PrecedingCumulative,
}

/// Candidate selection strategy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SamplerStrategy {
    #[default]
    Diffusion,
    Greedy,
}

/// Pick an index from normalized `weights` for a draw `u` in [0, 1).
///
/// Returns `None` for an empty weight list.
pub fn select_index(weights: &[f64], u: f64, rule: SelectionRule) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let last = weights.len() - 1;
    let mut cumulative = 0.0;
    match rule {
        SelectionRule::InverseCdf => {
            for (i, &w) in weights.iter().enumerate() {
                cumulative += w;
                if u < cumulative {
                    return Some(i);
                }
            }
        }
        SelectionRule::PrecedingCumulative => {
            for (i, &w) in weights.iter().enumerate() {
                if u < cumulative {
                    return Some(i);
                }
                cumulative += w;
            }
        }
    }
    Some(last)
}

/// Weights retrieved candidates by diffusion and samples one.
#[derive(Debug, Clone)]
pub struct DiffusionSampler {
    params: DiffusionParams,
    candidate_pool: usize,
    selection: SelectionRule,
    strategy: SamplerStrategy,
}

impl DiffusionSampler {
    pub fn from_config(config: &SamplerConfig) -> Self {
        Self {
            params: DiffusionParams::from(config),
            candidate_pool: config.candidate_pool,
            selection: config.selection,
            strategy: config.strategy,
        }
    }

    #[inline]
    pub fn candidate_pool(&self) -> usize {
        self.candidate_pool
    }

    #[inline]
    pub fn strategy(&self) -> SamplerStrategy {
        self.strategy
    }

    /// Stationary weights of the pooled candidates, normalized to sum 1.
    ///
    /// `candidates` must be sorted best-first; only the first
    /// `candidate_pool` take part. The returned vector is aligned with that
    /// prefix.
    pub fn weights(&self, context: &[FeatureVector], candidates: &[Candidate]) -> Vec<f64> {
        let pool = &candidates[..candidates.len().min(self.candidate_pool)];
        if pool.is_empty() {
            return Vec::new();
        }

        let mut nodes: Vec<&[f32]> = Vec::with_capacity(context.len() + pool.len());
        nodes.extend(context.iter().map(|v| &v[..]));
        nodes.extend(pool.iter().map(|c| &c.vector[..]));

        let rank = SimilarityGraph::from_vectors(&nodes).stationary_distribution(&self.params);
        let mut weights = rank[context.len()..].to_vec();
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter_mut().for_each(|w| *w /= total);
        } else {
            let uniform = 1.0 / weights.len() as f64;
            weights.iter_mut().for_each(|w| *w = uniform);
        }
        weights
    }

    /// Choose one candidate; returns its index into `candidates`.
    pub fn select<R: Rng + ?Sized>(
        &self,
        context: &[FeatureVector],
        candidates: &[Candidate],
        rng: &mut R,
    ) -> Option<usize> {
        match self.strategy {
            SamplerStrategy::Greedy => candidates
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| b.rank_cmp(a))
                .map(|(i, _)| i),
            SamplerStrategy::Diffusion => {
                let weights = self.weights(context, candidates);
                let u: f64 = rng.gen();
                let chosen = select_index(&weights, u, self.selection);
                trace!(pool = weights.len(), draw = u, ?chosen, "diffusion sample");
                chosen
            }
        }
    }
}
