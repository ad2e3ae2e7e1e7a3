//! Configuration management for histoseq.
//!
//! All knobs that the build command and the query front ends used to read
//! from process-wide flags live in one [`HistoseqConfig`] value that is passed
//! explicitly into index builds and generators.

mod sub_configs;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use sub_configs::{
    FeatureConfig, GenerationConfig, IndexConfig, LoggingConfig, MixerConfig, SamplerConfig,
    SearchConfig, BUCKETS_PER_MODEL_UNIT,
};

/// Environment variable selecting the environment-specific config file.
pub const ENV_SELECTOR: &str = "HISTOSEQ_ENV";

/// Prefix for environment variable overrides (`HISTOSEQ__SEARCH__SHARD_COUNT=8`).
pub const ENV_PREFIX: &str = "HISTOSEQ";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HistoseqConfig {
    pub mixer: MixerConfig,
    pub features: FeatureConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub sampler: SamplerConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

impl HistoseqConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{HISTOSEQ_ENV}.toml (environment-specific)
    /// 3. Environment variables with HISTOSEQ__ prefix
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: HistoseqConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: HistoseqConfig = toml::from_str(&content)
            .map_err(|e| CoreError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> CoreResult<()> {
        if self.mixer.scales.is_empty() {
            return Err(CoreError::ConfigError(
                "mixer.scales must name at least one histogram".into(),
            ));
        }
        if self.mixer.scales.iter().any(|&s| s == 0) {
            return Err(CoreError::ConfigError(
                "mixer.scales entries must be greater than 0".into(),
            ));
        }
        if self.mixer.order == 0 {
            return Err(CoreError::ConfigError(
                "mixer.order must be greater than 0".into(),
            ));
        }

        if self.index.buckets() == 0 {
            return Err(CoreError::ConfigError(
                "index.model_size (or index.bucket_count) must be greater than 0".into(),
            ));
        }
        if self.index.build_batch_size == 0 {
            return Err(CoreError::ConfigError(
                "index.build_batch_size must be greater than 0".into(),
            ));
        }

        if self.search.shard_count == 0 {
            return Err(CoreError::ConfigError(
                "search.shard_count must be greater than 0".into(),
            ));
        }
        if self.search.per_bucket_top_n == 0 {
            return Err(CoreError::ConfigError(
                "search.per_bucket_top_n must be greater than 0".into(),
            ));
        }

        let sampler = &self.sampler;
        if !(sampler.damping > 0.0 && sampler.damping <= 1.0) {
            return Err(CoreError::ConfigError(format!(
                "sampler.damping must be in (0, 1], got {}",
                sampler.damping
            )));
        }
        if !(sampler.tolerance > 0.0) {
            return Err(CoreError::ConfigError(format!(
                "sampler.tolerance must be positive, got {}",
                sampler.tolerance
            )));
        }
        if sampler.max_iterations == 0 {
            return Err(CoreError::ConfigError(
                "sampler.max_iterations must be greater than 0".into(),
            ));
        }
        if sampler.candidate_pool == 0 {
            return Err(CoreError::ConfigError(
                "sampler.candidate_pool must be greater than 0".into(),
            ));
        }
        if sampler.query_window == 0 {
            return Err(CoreError::ConfigError(
                "sampler.query_window must be greater than 0".into(),
            ));
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            other => {
                return Err(CoreError::ConfigError(format!(
                    "logging.format must be one of pretty|compact|json, got {}",
                    other
                )))
            }
        }

        Ok(())
    }
}
