//! Scoring Engine
//!
//! Pure functions that turn raw relationship sets or vector pairs into a
//! single score, and merge weighted subscores into one ranked score.

use recommender_core::{
    DegenerateVectorWarning, EntityId, RecommendResult, VectorSide, WeightVector,
};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Named subscores of one candidate before weighting
pub type Subscores = BTreeMap<String, f64>;

/// Weighted sum over keys present in both mappings
///
/// Keys present on only one side contribute zero. Fails before summing when
/// `weights` has no strictly positive entry.
pub fn combine(subscores: &Subscores, weights: &WeightVector) -> RecommendResult<f64> {
    weights.validate()?;

    Ok(weights
        .iter()
        .filter_map(|(name, weight)| subscores.get(name).map(|value| weight * value))
        .sum())
}

/// Cosine of two vectors with a recoverable degenerate case
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityOutcome {
    pub score: f64,
    pub warning: Option<DegenerateVectorWarning>,
}

impl SimilarityOutcome {
    pub fn is_degenerate(&self) -> bool {
        self.warning.is_some()
    }
}

/// Vectors of different length passed to [`cosine_similarity`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionMismatch {
    pub left: usize,
    pub right: usize,
}

impl fmt::Display for DimensionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vector dimensions differ: {} vs {}", self.left, self.right)
    }
}

impl std::error::Error for DimensionMismatch {}

/// Standard cosine similarity in [-1, 1]
///
/// A zero-magnitude vector carries no direction: the score is 0 and a
/// [`DegenerateVectorWarning`] is attached instead of failing. Components
/// are expected to be finite; the embedding cache rejects any that are not.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<SimilarityOutcome, DimensionMismatch> {
    if a.len() != b.len() {
        return Err(DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let side = match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => Some(VectorSide::Both),
        (true, false) => Some(VectorSide::Left),
        (false, true) => Some(VectorSide::Right),
        (false, false) => None,
    };
    if let Some(side) = side {
        return Ok(SimilarityOutcome {
            score: 0.0,
            warning: Some(DegenerateVectorWarning { side }),
        });
    }

    let score = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    Ok(SimilarityOutcome {
        score,
        warning: None,
    })
}

/// Jaccard-style overlap |a ∩ b| / max(1, |a ∪ b|), bounded in [0, 1]
pub fn overlap(a: &HashSet<EntityId>, b: &HashSet<EntityId>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|id| large.contains(*id)).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use recommender_core::RecommendError;

    fn set(ids: &[&str]) -> HashSet<EntityId> {
        ids.iter().map(|id| EntityId::from(*id)).collect()
    }

    fn subscores(pairs: &[(&str, f64)]) -> Subscores {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_combine_weighted_sum() {
        let weights = WeightVector::new().with("follows", 0.5).with("interests", 0.25);
        let score = combine(&subscores(&[("follows", 0.4), ("interests", 0.8)]), &weights).unwrap();
        assert!((score - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_combine_ignores_unmatched_keys() {
        let weights = WeightVector::new().with("follows", 1.0).with("members", 3.0);
        let score = combine(&subscores(&[("follows", 0.5), ("likes", 10.0)]), &weights).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_combine_rejects_degenerate_weights() {
        let weights = WeightVector::new().with("follows", 0.0);
        let err = combine(&subscores(&[("follows", 1.0)]), &weights).unwrap_err();
        assert!(matches!(err, RecommendError::Configuration { .. }));
    }

    #[test]
    fn test_cosine_basic_cases() {
        let v = [1.0f32, 2.0, 3.0];
        let neg = [-1.0f32, -2.0, -3.0];
        let orth = [2.0f32, -1.0, 0.0];

        assert!((cosine_similarity(&v, &v).unwrap().score - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&v, &neg).unwrap().score + 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&v, &orth).unwrap().score.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector_is_degenerate() {
        let outcome = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(
            outcome.warning,
            Some(DegenerateVectorWarning { side: VectorSide::Left })
        );

        let both = cosine_similarity(&[0.0], &[0.0]).unwrap();
        assert_eq!(both.warning.map(|w| w.side), Some(VectorSide::Both));
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, DimensionMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_overlap() {
        assert!((overlap(&set(&["a", "b"]), &set(&["a"])) - 0.5).abs() < 1e-12);
        assert!((overlap(&set(&["a", "b"]), &set(&["a", "b"])) - 1.0).abs() < 1e-12);
        assert_eq!(overlap(&set(&["a", "b"]), &set(&[])), 0.0);
        assert_eq!(overlap(&set(&[]), &set(&[])), 0.0);
        assert!((overlap(&set(&["a", "b", "c"]), &set(&["c", "d"])) - 0.25).abs() < 1e-12);
    }
}
