//! Tracing subscriber setup for front ends.

use tracing_subscriber::EnvFilter;

use histoseq_core::config::LoggingConfig;

use crate::error::{EngineError, EngineResult};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Output goes to stderr
/// so stdout stays free for generated text. Returns `false` if a global
/// subscriber was already installed, which is not an error.
pub fn init_tracing(config: &LoggingConfig) -> EngineResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| EngineError::Logging(format!("invalid level '{}': {}", config.level, e)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        "pretty" => builder.pretty().try_init(),
        other => {
            return Err(EngineError::Logging(format!(
                "unknown logging.format '{}'",
                other
            )))
        }
    };
    Ok(installed.is_ok())
}
