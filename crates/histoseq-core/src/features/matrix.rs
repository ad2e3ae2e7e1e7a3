//! Row-major histogram matrix.

use crate::FEATURE_DIM;

/// Row-major matrix of normalized histogram rows (one row per histogram,
/// `FEATURE_DIM` columns).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// All-zero matrix with `rows` rows.
    pub fn zeros(rows: usize) -> Self {
        Self {
            rows,
            data: vec![0.0; rows * FEATURE_DIM],
        }
    }

    /// Build from explicit rows.
    ///
    /// # Panics (debug only)
    ///
    /// Debug assertions verify every row has `FEATURE_DIM` entries.
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * FEATURE_DIM);
        for row in rows {
            debug_assert_eq!(row.len(), FEATURE_DIM);
            data.extend_from_slice(row);
        }
        Self {
            rows: rows.len(),
            data,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * FEATURE_DIM..(i + 1) * FEATURE_DIM]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.data[i * FEATURE_DIM..(i + 1) * FEATURE_DIM]
    }

    /// Iterate rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(FEATURE_DIM)
    }

    /// True when every entry is zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }
}
