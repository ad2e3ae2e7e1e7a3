//! Vector math shared by extraction, search and sampling.

/// Dot product of two equal-length slices.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

/// Euclidean norm.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|&x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity clamped to [-1, 1].
///
/// Returns 0.0 when either vector has (near) zero norm or lengths differ.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom < f32::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
///
/// Returns the norm before scaling.
pub fn normalize_in_place(v: &mut [f32]) -> f32 {
    let norm = l2_norm(v);
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

/// Shannon entropy `-Σ p·ln(p)` of a distribution, skipping zero entries.
pub fn shannon_entropy(p: &[f32]) -> f32 {
    p.iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| -(x as f64) * (x as f64).ln())
        .sum::<f64>() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_vector(rng: &mut ChaCha8Rng, dim: usize) -> Vec<f32> {
        (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    #[test]
    fn test_cosine_identical_is_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let a = random_vector(&mut rng, 256);
            assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cosine_symmetric_and_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            let a = random_vector(&mut rng, 256);
            let b = random_vector(&mut rng, 256);
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            assert_eq!(ab, ba);
            assert!((-1.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn test_cosine_opposite_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0; 4], &[1.0, 2.0, 3.0, 4.0]), 0.0);
    }

    #[test]
    fn test_normalize_in_place() {
        let mut v = vec![3.0f32, 4.0];
        let norm = normalize_in_place(&mut v);
        assert!((norm - 5.0).abs() < 1e-6);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0f32; 3];
        assert_eq!(normalize_in_place(&mut zero), 0.0);
        assert!(zero.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_entropy_uniform() {
        let p = [0.25f32; 4];
        assert!((shannon_entropy(&p) - 4.0f32.ln()).abs() < 1e-6);
        assert_eq!(shannon_entropy(&[1.0, 0.0, 0.0]), 0.0);
    }
}
