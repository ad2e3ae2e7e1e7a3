//! PageRank-style diffusion over cosine-similarity graphs.
//!
//! Used twice: by rank-mix to weight histogram rows, and by the sampler to
//! weight retrieved candidates against recent query vectors.
//!
//! # Algorithm
//!
//! Nodes are vectors; the graph is complete and directed with edge weight
//! `w_ij = max(0, cos(v_i, v_j))` for `i != j`. Power iteration from the
//! uniform distribution:
//!
//! ```text
//! r'_j = (1 - d)/n + d * ( Σ_i r_i * w_ij / out_i  +  D/n )
//! ```
//!
//! where `out_i = Σ_j w_ij` and `D` is the rank mass on nodes with no
//! outgoing weight (spread uniformly). Iteration stops once
//! `Σ_j |r'_j - r_j| < tolerance` or after `max_iterations` rounds.
//!
//! With `d = 1` a bipartite graph (a hub with mutually orthogonal leaves,
//! say) makes the walk periodic and the iterates alternate forever. When
//! the budget runs out the last two iterates are averaged, which is the
//! stationary distribution for period two and independent of the parity
//! of `max_iterations`.

use tracing::{debug, trace};

use crate::config::SamplerConfig;
use crate::similarity::cosine_similarity;

/// Damping and convergence parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionParams {
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            damping: 1.0,
            tolerance: 1e-3,
            max_iterations: 1000,
        }
    }
}

impl From<&SamplerConfig> for DiffusionParams {
    fn from(config: &SamplerConfig) -> Self {
        Self {
            damping: config.damping,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
        }
    }
}

/// Outcome of one diffusion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Stationary {
    /// Rank per node, summing to 1.
    pub distribution: Vec<f64>,
    /// Power-iteration rounds performed.
    pub iterations: usize,
    /// Whether the L1 delta fell below the tolerance.
    pub converged: bool,
}

/// Dense weighted adjacency over a set of vectors.
#[derive(Debug, Clone)]
pub struct SimilarityGraph {
    n: usize,
    weights: Vec<f64>,
}

impl SimilarityGraph {
    /// Build the complete cosine graph over `nodes`.
    pub fn from_vectors<V: AsRef<[f32]>>(nodes: &[V]) -> Self {
        let n = nodes.len();
        let mut weights = vec![0.0f64; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let w = cosine_similarity(nodes[i].as_ref(), nodes[j].as_ref()).max(0.0) as f64;
                weights[i * n + j] = w;
                weights[j * n + i] = w;
            }
        }
        Self { n, weights }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn weight(&self, from: usize, to: usize) -> f64 {
        self.weights[from * self.n + to]
    }

    /// Stationary distribution of the damped random walk. Sums to 1.
    pub fn stationary_distribution(&self, params: &DiffusionParams) -> Vec<f64> {
        self.diffuse(params).distribution
    }

    /// Like [`stationary_distribution`](Self::stationary_distribution),
    /// reporting whether the tolerance was met.
    pub fn diffuse(&self, params: &DiffusionParams) -> Stationary {
        let n = self.n;
        if n == 0 {
            return Stationary {
                distribution: Vec::new(),
                iterations: 0,
                converged: true,
            };
        }
        let uniform = 1.0 / n as f64;
        let out: Vec<f64> = self
            .weights
            .chunks_exact(n)
            .map(|row| row.iter().sum())
            .collect();

        let mut rank = vec![uniform; n];
        let mut next = vec![0.0f64; n];
        let mut iterations = 0;
        let mut converged = false;
        let mut last_delta = f64::NAN;
        for iteration in 0..params.max_iterations {
            iterations = iteration + 1;
            let dangling: f64 = rank
                .iter()
                .zip(&out)
                .filter(|(_, &o)| o <= 0.0)
                .map(|(&r, _)| r)
                .sum();
            let base = (1.0 - params.damping) * uniform + params.damping * dangling * uniform;
            next.iter_mut().for_each(|v| *v = base);

            for i in 0..n {
                if out[i] <= 0.0 {
                    continue;
                }
                let share = params.damping * rank[i] / out[i];
                let row = &self.weights[i * n..(i + 1) * n];
                for (v, &w) in next.iter_mut().zip(row) {
                    *v += share * w;
                }
            }

            let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
            std::mem::swap(&mut rank, &mut next);
            last_delta = delta;
            if delta < params.tolerance {
                trace!(iteration, delta, nodes = n, "diffusion converged");
                converged = true;
                break;
            }
        }

        if !converged && iterations > 0 {
            // `next` holds the previous iterate after the final swap
            for (r, p) in rank.iter_mut().zip(&next) {
                *r = 0.5 * (*r + p);
            }
            debug!(
                iterations,
                delta = last_delta,
                tolerance = params.tolerance,
                nodes = n,
                "diffusion did not converge, averaging last two iterates"
            );
        }

        let total: f64 = rank.iter().sum();
        if total > 0.0 {
            rank.iter_mut().for_each(|r| *r /= total);
        }
        Stationary {
            distribution: rank,
            iterations,
            converged,
        }
    }
}

/// Convenience wrapper: build the graph over `nodes` and diffuse.
pub fn stationary_distribution<V: AsRef<[f32]>>(nodes: &[V], params: &DiffusionParams) -> Vec<f64> {
    SimilarityGraph::from_vectors(nodes).stationary_distribution(params)
}
