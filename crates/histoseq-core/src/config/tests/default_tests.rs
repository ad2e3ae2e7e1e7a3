//! Tests for default configuration values.

use crate::config::{HistoseqConfig, IndexConfig, SamplerConfig, SearchConfig};
use crate::features::FeatureMode;
use crate::mixer::MixerVariant;
use crate::sampler::{SamplerStrategy, SelectionRule};

#[test]
fn test_default_config() {
    let config = HistoseqConfig::default();
    assert_eq!(config.mixer.variant, MixerVariant::Flat);
    assert_eq!(config.mixer.order, 7);
    assert_eq!(config.mixer.scales, vec![1, 2, 4, 8, 16, 32, 64, 128]);
    assert_eq!(config.features.mode, FeatureMode::Attention);
    assert_eq!(config.generation.count, 128);
    assert!(config.validate().is_ok());
}

#[test]
fn test_bucket_count_follows_model_size() {
    let mut index = IndexConfig::default();
    assert_eq!(index.buckets(), 1024);

    index.model_size = 8;
    assert_eq!(index.buckets(), 8 * 1024);

    index.bucket_count = Some(4);
    assert_eq!(index.buckets(), 4, "explicit bucket_count wins");
}

#[test]
fn test_workers_zero_means_cpu_count() {
    let index = IndexConfig::default();
    assert!(index.workers() >= 1);

    let pinned = IndexConfig {
        build_workers: 3,
        ..IndexConfig::default()
    };
    assert_eq!(pinned.workers(), 3);
}

#[test]
fn test_sampler_defaults_match_diffusion_constants() {
    let sampler = SamplerConfig::default();
    assert_eq!(sampler.damping, 1.0);
    assert_eq!(sampler.tolerance, 1e-3);
    assert_eq!(sampler.selection, SelectionRule::InverseCdf);
    assert_eq!(sampler.strategy, SamplerStrategy::Diffusion);
    assert!(sampler.seed.is_none());
}

#[test]
fn test_search_defaults() {
    let search = SearchConfig::default();
    assert_eq!(search.shard_count, 4);
    assert_eq!(search.per_bucket_top_n, 64);
}
