//! Feature extraction.
//!
//! All three modes share one preprocessing path: the mixer's active bank is
//! turned into a [`FeatureMatrix`] of normalized histogram rows, run through
//! projection-free self-attention ([`Attention`]), and collapsed by a
//! mode-specific [`Summary`].
//!
//! | Mode        | Summary                                             | Normalized |
//! |-------------|-----------------------------------------------------|------------|
//! | `Attention` | Σ over query rows                                   | no         |
//! | `Entropy`   | Σ over query rows                                   | L2         |
//! | `Rank`      | Σ over query rows weighted by row-graph PageRank    | L2         |

mod attention;
mod extractor;
mod matrix;

pub use attention::{Attention, Summary, SOFTMAX_SHIFT};
pub use extractor::{FeatureExtractor, FeatureMode, RANK_MIX_PARAMS};
pub use matrix::FeatureMatrix;
