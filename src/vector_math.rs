use std::cmp::Ordering;

/// Cosine similarity in `[-1, 1]`; 0 for empty, mismatched or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Sorts `(item, score)` pairs best first. NaN scores sink to the end.
pub fn sort_descending<T>(scored: &mut [(T, f32)]) {
    scored.sort_by(|left, right| match (left.1.is_nan(), right.1.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_or_degenerate_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
        assert!(approx_eq(cosine_similarity(&[], &[]), 0.0));
        assert!(approx_eq(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0));
        assert!(approx_eq(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0));
    }

    #[test]
    fn sort_descending_puts_best_first() {
        let mut scored = vec![("b", 0.2), ("nan", f32::NAN), ("a", 0.9), ("c", -0.4)];
        sort_descending(&mut scored);
        let order: Vec<&str> = scored.iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["a", "b", "c", "nan"]);
    }
}
