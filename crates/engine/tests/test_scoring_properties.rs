//! Property-based тесты Scoring Engine

use engine::scoring::{combine, cosine_similarity, overlap, Subscores};
use proptest::prelude::*;
use recommender_core::{EntityId, RankedResult, WeightVector};
use std::collections::HashSet;

const NAMES: [&str; 4] = ["follows", "interests", "engagement", "similarity"];

fn subscores_strategy() -> impl Strategy<Value = Subscores> {
    prop::collection::vec(0.0f64..=1.0, NAMES.len()).prop_map(|values| {
        NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    })
}

fn weights_strategy() -> impl Strategy<Value = WeightVector> {
    prop::collection::vec(0.0f64..=5.0, NAMES.len())
        .prop_map(|values| {
            NAMES
                .iter()
                .zip(values)
                .map(|(name, value)| (*name, value))
                .collect::<WeightVector>()
        })
        .prop_filter("needs a positive weight", |w| w.iter().any(|(_, v)| v > 0.0))
}

fn vector_strategy(dimension: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-10.0f32..10.0, dimension)
        .prop_filter("non-zero vector", |v| v.iter().any(|x| x.abs() > 1e-3))
}

fn id_set() -> impl Strategy<Value = HashSet<EntityId>> {
    prop::collection::hash_set("[a-f]", 0..6)
        .prop_map(|ids| ids.into_iter().map(EntityId::from).collect())
}

proptest! {
    #[test]
    fn combine_scales_linearly(subscores in subscores_strategy(), weights in weights_strategy(), factor in 0.1f64..10.0) {
        let scaled: WeightVector = weights.iter().map(|(name, w)| (name, w * factor)).collect();

        let base = combine(&subscores, &weights).unwrap();
        let result = combine(&subscores, &scaled).unwrap();
        prop_assert!((result - base * factor).abs() < 1e-9 * (1.0 + result.abs()));
    }

    #[test]
    fn combine_is_monotone_in_subscores(
        subscores in subscores_strategy(),
        weights in weights_strategy(),
        index in 0usize..NAMES.len(),
        bump in 0.0f64..1.0,
    ) {
        let mut raised = subscores.clone();
        if let Some(value) = raised.get_mut(NAMES[index]) {
            *value += bump;
        }

        prop_assert!(combine(&raised, &weights).unwrap() >= combine(&subscores, &weights).unwrap());
    }

    #[test]
    fn combine_is_linear_in_each_subscore(
        subscores in subscores_strategy(),
        weights in weights_strategy(),
        index in 0usize..NAMES.len(),
        delta in 0.0f64..1.0,
    ) {
        let name = NAMES[index];
        let mut shifted = subscores.clone();
        if let Some(value) = shifted.get_mut(name) {
            *value += delta;
        }

        let gain = combine(&shifted, &weights).unwrap() - combine(&subscores, &weights).unwrap();
        let expected = weights.get(name).unwrap_or(0.0) * delta;
        prop_assert!((gain - expected).abs() < 1e-9);
    }

    #[test]
    fn cosine_is_symmetric_and_bounded(a in vector_strategy(8), b in vector_strategy(8)) {
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();

        prop_assert!((ab.score - ba.score).abs() < 1e-12);
        prop_assert!((-1.0..=1.0).contains(&ab.score));
        prop_assert!(!ab.is_degenerate());
    }

    #[test]
    fn cosine_of_vector_with_itself_and_negation(v in vector_strategy(16)) {
        let negated: Vec<f32> = v.iter().map(|x| -x).collect();

        prop_assert!((cosine_similarity(&v, &v).unwrap().score - 1.0).abs() < 1e-9);
        prop_assert!((cosine_similarity(&v, &negated).unwrap().score + 1.0).abs() < 1e-9);
    }

    #[test]
    fn overlap_is_symmetric_and_bounded(a in id_set(), b in id_set()) {
        let ab = overlap(&a, &b);

        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(ab, overlap(&b, &a));
        if !a.is_empty() {
            prop_assert_eq!(overlap(&a, &a), 1.0);
        }
    }

    #[test]
    fn ranking_is_ordered_and_truncated(
        scores in prop::collection::vec(("[a-z]{1,3}", 0u8..5), 0..30),
        offset in 0usize..5,
        top_k in 0usize..10,
    ) {
        let mut seen = HashSet::new();
        let scores: Vec<(EntityId, f64)> = scores
            .into_iter()
            .filter(|(id, _)| seen.insert(id.clone()))
            .map(|(id, score)| (EntityId::from(id), f64::from(score) / 4.0))
            .collect();
        let total = scores.len();

        let ranked = RankedResult::rank(scores, offset, top_k);

        prop_assert_eq!(ranked.len(), total.saturating_sub(offset).min(top_k));
        for pair in ranked.items().windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            prop_assert!(
                left.score > right.score || (left.score == right.score && left.id < right.id)
            );
        }
    }
}
