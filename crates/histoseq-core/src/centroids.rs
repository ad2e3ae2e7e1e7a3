//! Corpus statistics and the bucket centroid seam.
//!
//! The index builder partitions feature space around one centroid per
//! bucket. Where those centroids come from is pluggable through
//! [`CentroidSource`]: a source receives the empirical mean and covariance
//! of the corpus features and returns `count` vectors.
//!
//! Two sources ship with the crate:
//!
//! - [`FixedCentroids`] hands back caller-provided vectors.
//! - [`GaussianCentroids`] draws `x = A·z + μ` with `z ~ N(0, I)`, where the
//!   factor `A` is supplied by the caller, isotropic, or taken from the
//!   covariance diagonal.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::config::MixerConfig;
use crate::error::{CoreError, CoreResult};
use crate::features::FeatureExtractor;
use crate::mixer::ContextMixer;
use crate::types::{zero_vector, FeatureVector};
use crate::FEATURE_DIM;

/// Mean and covariance of the feature vectors of one corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusStatistics {
    /// Number of feature vectors accumulated.
    pub samples: u64,
    /// Per-dimension mean, `FEATURE_DIM` entries.
    pub mean: Vec<f64>,
    /// Row-major `FEATURE_DIM × FEATURE_DIM` covariance, divided by `samples`.
    pub covariance: Vec<f64>,
}

impl CorpusStatistics {
    /// Statistics of an empty corpus: zero mean, zero covariance.
    pub fn empty() -> Self {
        Self {
            samples: 0,
            mean: vec![0.0; FEATURE_DIM],
            covariance: vec![0.0; FEATURE_DIM * FEATURE_DIM],
        }
    }

    /// Walk `corpus` the way the index build does (one leading sentinel,
    /// then one feature vector per position before absorbing its byte) and
    /// accumulate mean and covariance.
    #[tracing::instrument(skip(corpus, mixer_config), fields(corpus_len = corpus.len(), mode = extractor.mode().as_str()))]
    pub fn accumulate(
        corpus: &[u8],
        extractor: &FeatureExtractor,
        mixer_config: &MixerConfig,
    ) -> Self {
        let mut mixer = ContextMixer::new(mixer_config);
        mixer.add(0);

        let mut sum = vec![0.0f64; FEATURE_DIM];
        let mut outer = vec![0.0f64; FEATURE_DIM * FEATURE_DIM];
        for &symbol in corpus {
            let v = extractor.extract(&mixer);
            for i in 0..FEATURE_DIM {
                let vi = v[i] as f64;
                sum[i] += vi;
                if vi == 0.0 {
                    continue;
                }
                let row = &mut outer[i * FEATURE_DIM..(i + 1) * FEATURE_DIM];
                for (o, &vj) in row.iter_mut().zip(v.iter()) {
                    *o += vi * vj as f64;
                }
            }
            mixer.add(symbol);
        }

        if corpus.is_empty() {
            return Self::empty();
        }
        let n = corpus.len() as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let mut covariance = outer;
        for i in 0..FEATURE_DIM {
            for j in 0..FEATURE_DIM {
                covariance[i * FEATURE_DIM + j] = covariance[i * FEATURE_DIM + j] / n - mean[i] * mean[j];
            }
        }
        debug!(samples = corpus.len(), "corpus statistics accumulated");
        Self {
            samples: corpus.len() as u64,
            mean,
            covariance,
        }
    }

    /// Variance of dimension `i`.
    #[inline]
    pub fn variance(&self, i: usize) -> f64 {
        self.covariance[i * FEATURE_DIM + i]
    }
}

/// Supplies bucket centroids for an index build.
pub trait CentroidSource: Send + Sync {
    /// Produce exactly `count` centroids.
    fn centroids(&self, stats: &CorpusStatistics, count: usize) -> CoreResult<Vec<FeatureVector>>;

    /// Whether `centroids` reads `stats`. Sources that ignore them let the
    /// caller skip the statistics pass over the corpus.
    fn needs_statistics(&self) -> bool {
        true
    }
}

/// Caller-provided centroid table.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedCentroids(pub Vec<FeatureVector>);

impl CentroidSource for FixedCentroids {
    fn centroids(&self, _stats: &CorpusStatistics, count: usize) -> CoreResult<Vec<FeatureVector>> {
        if self.0.len() != count {
            return Err(CoreError::invalid_input(
                "centroids",
                format!("expected {} fixed centroids, have {}", count, self.0.len()),
            ));
        }
        Ok(self.0.clone())
    }

    fn needs_statistics(&self) -> bool {
        false
    }
}

/// Linear map applied to standard normal draws.
#[derive(Debug, Clone, PartialEq)]
pub enum GaussianFactor {
    /// Row-major `FEATURE_DIM × FEATURE_DIM` matrix `A`.
    Matrix(Vec<f64>),
    /// `A = scale · I`.
    Isotropic(f64),
    /// `A = diag(sqrt(variance_i))` taken from the corpus statistics.
    Diagonal,
}

/// Draws centroids from `N(μ, A·Aᵀ)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianCentroids {
    factor: GaussianFactor,
    seed: u64,
}

impl GaussianCentroids {
    /// Use an explicit factor matrix.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `factor` is not `FEATURE_DIM²` long.
    pub fn new(factor: Vec<f64>, seed: u64) -> CoreResult<Self> {
        if factor.len() != FEATURE_DIM * FEATURE_DIM {
            return Err(CoreError::DimensionMismatch {
                expected: FEATURE_DIM * FEATURE_DIM,
                actual: factor.len(),
            });
        }
        Ok(Self {
            factor: GaussianFactor::Matrix(factor),
            seed,
        })
    }

    pub fn isotropic(scale: f64, seed: u64) -> Self {
        Self {
            factor: GaussianFactor::Isotropic(scale),
            seed,
        }
    }

    pub fn diagonal(seed: u64) -> Self {
        Self {
            factor: GaussianFactor::Diagonal,
            seed,
        }
    }

    #[inline]
    pub fn factor(&self) -> &GaussianFactor {
        &self.factor
    }
}

impl CentroidSource for GaussianCentroids {
    fn centroids(&self, stats: &CorpusStatistics, count: usize) -> CoreResult<Vec<FeatureVector>> {
        if stats.mean.len() != FEATURE_DIM {
            return Err(CoreError::DimensionMismatch {
                expected: FEATURE_DIM,
                actual: stats.mean.len(),
            });
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut z = vec![0.0f64; FEATURE_DIM];
        let mut out = Vec::with_capacity(count);

        for _ in 0..count {
            for zi in z.iter_mut() {
                *zi = StandardNormal.sample(&mut rng);
            }
            let mut centroid = zero_vector();
            for (i, c) in centroid.iter_mut().enumerate() {
                let offset = match &self.factor {
                    GaussianFactor::Matrix(a) => a[i * FEATURE_DIM..(i + 1) * FEATURE_DIM]
                        .iter()
                        .zip(&z)
                        .map(|(a, z)| a * z)
                        .sum::<f64>(),
                    GaussianFactor::Isotropic(scale) => scale * z[i],
                    GaussianFactor::Diagonal => stats.variance(i).max(0.0).sqrt() * z[i],
                };
                *c = (offset + stats.mean[i]) as f32;
            }
            out.push(centroid);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureMode;

    #[test]
    fn test_empty_corpus_statistics() {
        let stats = CorpusStatistics::accumulate(
            b"",
            &FeatureExtractor::new(FeatureMode::Attention),
            &MixerConfig::default(),
        );
        assert_eq!(stats, CorpusStatistics::empty());
    }

    #[test]
    fn test_statistics_mean_matches_direct_average() {
        let corpus = b"abcabcab";
        let extractor = FeatureExtractor::new(FeatureMode::Entropy);
        let stats = CorpusStatistics::accumulate(corpus, &extractor, &MixerConfig::default());
        assert_eq!(stats.samples, corpus.len() as u64);

        let mut mixer = ContextMixer::new(&MixerConfig::default());
        mixer.add(0);
        let mut expected = vec![0.0f64; FEATURE_DIM];
        for &b in corpus.iter() {
            let v = extractor.extract(&mixer);
            for (e, &x) in expected.iter_mut().zip(v.iter()) {
                *e += x as f64 / corpus.len() as f64;
            }
            mixer.add(b);
        }
        for (got, want) in stats.mean.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9);
        }
        // covariance is symmetric with non-negative diagonal
        for i in 0..FEATURE_DIM {
            assert!(stats.variance(i) >= -1e-9);
            for j in 0..FEATURE_DIM {
                let a = stats.covariance[i * FEATURE_DIM + j];
                let b = stats.covariance[j * FEATURE_DIM + i];
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_fixed_centroids_count_must_match() {
        let fixed = FixedCentroids(vec![zero_vector(); 3]);
        let stats = CorpusStatistics::empty();
        assert_eq!(fixed.centroids(&stats, 3).map(|c| c.len()).ok(), Some(3));
        assert!(matches!(
            fixed.centroids(&stats, 4),
            Err(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_gaussian_rejects_wrong_factor_size() {
        assert!(matches!(
            GaussianCentroids::new(vec![1.0; 10], 0),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_gaussian_centroids_are_seeded() {
        let stats = CorpusStatistics::empty();
        let a = GaussianCentroids::isotropic(1.0, 9).centroids(&stats, 5).unwrap();
        let b = GaussianCentroids::isotropic(1.0, 9).centroids(&stats, 5).unwrap();
        let c = GaussianCentroids::isotropic(1.0, 10).centroids(&stats, 5).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn test_zero_factor_reproduces_mean() {
        let mut stats = CorpusStatistics::empty();
        stats.mean[7] = 0.5;
        let centroids = GaussianCentroids::new(vec![0.0; FEATURE_DIM * FEATURE_DIM], 1)
            .unwrap()
            .centroids(&stats, 2)
            .unwrap();
        for c in centroids {
            assert_eq!(c[7], 0.5);
            assert_eq!(c[0], 0.0);
        }
    }

    #[test]
    fn test_diagonal_factor_with_zero_variance_is_mean() {
        let mut stats = CorpusStatistics::empty();
        stats.mean[3] = 0.25;
        let centroids = GaussianCentroids::diagonal(4).centroids(&stats, 3).unwrap();
        assert!(centroids.iter().all(|c| c[3] == 0.25 && c[4] == 0.0));
    }

    #[test]
    fn test_isotropic_sample_spread() {
        let stats = CorpusStatistics::empty();
        let centroids = GaussianCentroids::isotropic(2.0, 3).centroids(&stats, 64).unwrap();
        let values: Vec<f64> = centroids.iter().flat_map(|c| c.iter().map(|&x| x as f64)).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 4.0).abs() < 0.2, "variance {var}");
    }
}
