//! Serialization and deserialization tests for configuration.

use std::io::Write;

use crate::config::HistoseqConfig;
use crate::features::FeatureMode;
use crate::mixer::MixerVariant;
use crate::sampler::SelectionRule;

#[test]
fn test_config_toml_round_trip() {
    let config = HistoseqConfig::default();
    let toml_str = toml::to_string(&config).expect("Config must serialize to TOML");
    let deserialized: HistoseqConfig =
        toml::from_str(&toml_str).expect("Config must deserialize from TOML");
    assert_eq!(deserialized, config);
}

#[test]
fn test_config_json_round_trip() {
    let mut config = HistoseqConfig::default();
    config.sampler.seed = Some(42);
    let json_str = serde_json::to_string(&config).expect("Config must serialize to JSON");
    let deserialized: HistoseqConfig =
        serde_json::from_str(&json_str).expect("Config must deserialize from JSON");
    assert_eq!(deserialized, config);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let toml_str = r#"
        [mixer]
        variant = "previous_symbol"

        [features]
        mode = "rank"

        [index]
        bucket_count = 4

        [sampler]
        selection = "preceding_cumulative"
        seed = 9
    "#;
    let config: HistoseqConfig = toml::from_str(toml_str).expect("partial TOML must parse");
    assert_eq!(config.mixer.variant, MixerVariant::PreviousSymbol);
    assert_eq!(config.mixer.order, 7);
    assert_eq!(config.features.mode, FeatureMode::Rank);
    assert_eq!(config.index.buckets(), 4);
    assert_eq!(config.sampler.selection, SelectionRule::PrecedingCumulative);
    assert_eq!(config.sampler.seed, Some(9));
    assert_eq!(config.search.shard_count, 4);
}

#[test]
fn test_from_file_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[search]\nshard_count = 0").expect("write");

    let err = HistoseqConfig::from_file(file.path()).expect_err("shard_count = 0 must fail");
    assert!(err.to_string().contains("search.shard_count"));
}

#[test]
fn test_from_file_missing_path() {
    let err = HistoseqConfig::from_file(std::path::Path::new("/nonexistent/histoseq.toml"))
        .expect_err("missing file must fail");
    assert!(err.to_string().contains("Failed to read config file"));
}
