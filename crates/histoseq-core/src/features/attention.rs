//! Projection-free self-attention over histogram rows.
//!
//! # Algorithm
//!
//! For an input matrix `X` with rows `x_0..x_{n-1}` (each a 256-wide
//! distribution):
//!
//! ```text
//! s_ij  = <x_i, x_j>
//! w_ij  = exp(s_ij - m_i) / Σ_k exp(s_ik - m_i),   m_i = max_k(s_ik) * SOFTMAX_SHIFT
//! a_i   = Σ_j w_ij x_j                              (values = Xᵀ, weighted by w_i)
//! ```
//!
//! The three extraction modes differ only in how the attended rows `a_i`
//! are summarised, see [`Summary`].

use crate::similarity::{normalize_in_place, shannon_entropy};
use crate::types::{zero_vector, FeatureVector};
use crate::FEATURE_DIM;

use super::FeatureMatrix;

/// Fraction of the row maximum subtracted before exponentiating.
pub const SOFTMAX_SHIFT: f64 = 1.0 - 1e-300;

/// How attended rows collapse into one feature vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    /// Plain sum over query rows, unnormalized.
    Sum,
    /// Plain sum over query rows, L2-normalized.
    NormalizedSum,
    /// Sum over query rows weighted by `weights[i]`, L2-normalized.
    Weighted(Vec<f64>),
}

/// Attention weights and attended rows for one input matrix.
#[derive(Debug, Clone)]
pub struct Attention {
    weights: Vec<f64>,
    attended: FeatureMatrix,
}

impl Attention {
    /// Run self-attention over the rows of `input`.
    pub fn compute(input: &FeatureMatrix) -> Self {
        let n = input.rows();
        let mut weights = vec![0.0f64; n * n];
        let mut attended = FeatureMatrix::zeros(n);

        let mut scores = vec![0.0f64; n];
        for i in 0..n {
            let query = input.row(i);
            for (j, score) in scores.iter_mut().enumerate() {
                *score = query
                    .iter()
                    .zip(input.row(j))
                    .map(|(&q, &k)| q as f64 * k as f64)
                    .sum();
            }
            softmax(&mut scores);
            weights[i * n..(i + 1) * n].copy_from_slice(&scores);

            let out = attended.row_mut(i);
            for (j, &w) in scores.iter().enumerate() {
                if w == 0.0 {
                    continue;
                }
                for (o, &v) in out.iter_mut().zip(input.row(j)) {
                    *o += (w * v as f64) as f32;
                }
            }
        }

        Self { weights, attended }
    }

    /// Softmax weights, row `i` holds query `i`'s distribution over keys.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Attended rows `a_i`.
    #[inline]
    pub fn attended(&self) -> &FeatureMatrix {
        &self.attended
    }

    /// Shannon entropy of each attended row.
    pub fn row_entropies(&self) -> Vec<f32> {
        self.attended.iter_rows().map(shannon_entropy).collect()
    }

    /// Collapse the attended rows into one vector.
    pub fn summarize(&self, summary: &Summary) -> FeatureVector {
        let mut output = zero_vector();
        match summary {
            Summary::Sum | Summary::NormalizedSum => {
                for row in self.attended.iter_rows() {
                    for (o, &v) in output.iter_mut().zip(row) {
                        *o += v;
                    }
                }
            }
            Summary::Weighted(row_weights) => {
                debug_assert_eq!(row_weights.len(), self.attended.rows());
                for (row, &w) in self.attended.iter_rows().zip(row_weights) {
                    for (o, &v) in output.iter_mut().zip(row) {
                        *o += (w * v as f64) as f32;
                    }
                }
            }
        }
        if !matches!(summary, Summary::Sum) {
            normalize_in_place(&mut output);
        }
        debug_assert_eq!(output.len(), FEATURE_DIM);
        output
    }
}

/// In-place numerically stabilised softmax.
fn softmax(values: &mut [f64]) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let shift = max * SOFTMAX_SHIFT;
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - shift).exp();
        sum += *v;
    }
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}
