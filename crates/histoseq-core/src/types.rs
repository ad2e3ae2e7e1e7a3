//! Shared domain types.

use crate::FEATURE_DIM;

/// 256-float retrieval key summarising a mixer state.
pub type FeatureVector = [f32; FEATURE_DIM];

/// Zero-initialised feature vector.
#[inline]
pub fn zero_vector() -> FeatureVector {
    [0.0; FEATURE_DIM]
}

/// One retrieved corpus position, scored against a query vector.
///
/// Produced by the searchers, ranked by `similarity` (descending) and
/// consumed by the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Feature vector stored for the corpus position.
    pub vector: FeatureVector,
    /// Byte emitted at that position.
    pub symbol: u8,
    /// Ordinal position in the training corpus.
    pub position: u64,
    /// Cosine similarity to the query vector.
    pub similarity: f32,
}

impl Candidate {
    /// Order by descending similarity, then ascending corpus position.
    ///
    /// Gives a total order so merged shard results sort deterministically.
    #[inline]
    pub fn rank_cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .similarity
            .total_cmp(&self.similarity)
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Sort candidates best-first using [`Candidate::rank_cmp`].
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(Candidate::rank_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(position: u64, similarity: f32) -> Candidate {
        Candidate {
            vector: zero_vector(),
            symbol: b'x',
            position,
            similarity,
        }
    }

    #[test]
    fn test_sort_descending_with_position_tiebreak() {
        let mut list = vec![
            candidate(5, 0.2),
            candidate(3, 0.9),
            candidate(1, 0.9),
            candidate(0, -0.4),
        ];
        sort_candidates(&mut list);
        let order: Vec<u64> = list.iter().map(|c| c.position).collect();
        assert_eq!(order, vec![1, 3, 5, 0]);
    }
}
