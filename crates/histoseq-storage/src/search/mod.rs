//! Query-time search over a persisted index.

mod interrupt;
mod sharded;
mod stats;

pub use interrupt::InterruptOnDrop;
pub use sharded::{SearchOutcome, ShardedSearcher};
pub use stats::SearchStats;
