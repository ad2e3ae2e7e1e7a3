//! Retrieval-augmented byte generation for histoseq.
//!
//! # Architecture
//!
//! - **generator**: the generation loop and its output
//! - **query_state**: live mixer, query-vector window and UTF-8 reassembly
//! - **source**: `CandidateSource` over sharded or flat indexes
//! - **build**: corpus-to-index wiring with a pluggable centroid source
//! - **logging**: tracing subscriber setup
//! - **error**: `EngineError` and `EngineResult`
//!
//! # Example
//!
//! ```no_run
//! use histoseq_core::HistoseqConfig;
//! use histoseq_engine::Generator;
//!
//! # async fn run() -> histoseq_engine::EngineResult<()> {
//! let config = HistoseqConfig::load()?;
//! let generator = Generator::open(&config)?;
//! let output = generator.generate(b"Once upon a time", 64).await?;
//! println!("{}", String::from_utf8_lossy(&output.text));
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod error;
pub mod generator;
pub mod logging;
pub mod query_state;
pub mod source;

// Re-exports for convenience
pub use build::build_from_corpus;
pub use error::{EngineError, EngineResult};
pub use generator::{GenerationOutput, Generator};
pub use logging::init_tracing;
pub use query_state::{GeneratedUnit, QueryState, Utf8Assembler};
pub use source::{CandidateSource, FlatSource};
