//! Persisted vector index for histoseq.
//!
//! # Architecture
//!
//! - **format**: fixed-width header line and entry records
//! - **builder**: concurrent corpus classification, membership arena, writer
//! - **store**: header loader with prefix sums over bucket counts
//! - **search**: sharded parallel bucket scan with request-scoped cancellation
//! - **flat**: exact brute-force store without buckets
//! - **error**: `StorageError` and `StorageResult`
//!
//! The index is written once and read-only afterwards. Any number of
//! searchers may share one file.

pub mod builder;
pub mod error;
pub mod flat;
pub mod format;
pub mod search;
pub mod store;

// Re-exports for convenience
pub use builder::{build_index, nearest_centroid, BuiltIndex, IndexBuilder, IndexSummary};
pub use error::{StorageError, StorageResult};
pub use flat::FlatStore;
pub use format::{Entry, ENTRY_SIZE, HEADER_LINE_SIZE};
pub use search::{InterruptOnDrop, SearchOutcome, SearchStats, ShardedSearcher};
pub use store::{Segment, VectorIndex};
