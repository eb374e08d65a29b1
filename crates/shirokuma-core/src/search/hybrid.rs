//! Fusion algorithms for combining independently-scored candidate lists
//! (§4.7.3). Used both for the `hybrid` related-items strategy (3-way:
//! keywords, concepts, embedding) and for ad-hoc combinations of any number
//! of scored lists.

use std::collections::HashMap;

/// Reciprocal Rank Fusion across any number of scored lists. Each list's
/// `(id, score)` pairs are consumed by rank only, not by their score value:
/// `score(d) = sum_i 1 / (k + rank_i(d))` over every list containing `d`.
pub fn reciprocal_rank_fusion(lists: &[&[(i64, f32)]], k: f32) -> Vec<(i64, f32)> {
    let mut scores: HashMap<i64, f32> = HashMap::new();
    for list in lists {
        for (rank, (id, _)) in list.iter().enumerate() {
            *scores.entry(*id).or_default() += 1.0 / (k + rank as f32);
        }
    }
    let mut results: Vec<(i64, f32)> = scores.into_iter().collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Weighted linear combination of any number of scored lists, each already
/// normalized to `[0, 1]` by its caller. Missing sub-signals contribute 0
/// for a given id, matching §4.7.3's hybrid-strategy fusion rule.
pub fn linear_combination(lists: &[(&[(i64, f32)], f32)]) -> Vec<(i64, f32)> {
    let mut scores: HashMap<i64, f32> = HashMap::new();
    for (list, weight) in lists {
        for (id, score) in list.iter() {
            *scores.entry(*id).or_default() += score * weight;
        }
    }

    let max_score = scores.values().cloned().fold(0.0_f32, f32::max).max(1e-6);
    let mut results: Vec<(i64, f32)> = scores
        .into_iter()
        .map(|(id, s)| (id, (s / max_score).clamp(0.0, 1.0)))
        .collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Weights for the three `hybrid` related-items sub-strategies (§4.7.3).
#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    pub keywords: f32,
    pub concepts: f32,
    pub embedding: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            keywords: 0.3,
            concepts: 0.1,
            embedding: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_rewards_items_appearing_in_multiple_lists() {
        let keyword: &[(i64, f32)] = &[(1, 0.9), (2, 0.8), (3, 0.7)];
        let semantic: &[(i64, f32)] = &[(2, 0.95), (1, 0.85), (4, 0.75)];

        let results = reciprocal_rank_fusion(&[keyword, semantic], 60.0);

        assert!(results.iter().any(|(id, _)| *id == 1));
        assert!(results.iter().any(|(id, _)| *id == 2));
        for w in results.windows(2) {
            assert!(w[0].1 >= w[1].1);
        }
    }

    #[test]
    fn rrf_handles_an_empty_list() {
        let empty: &[(i64, f32)] = &[];
        let other: &[(i64, f32)] = &[(1, 0.9)];
        let results = reciprocal_rank_fusion(&[empty, other], 60.0);
        assert_eq!(results, vec![(1, 1.0 / 60.0)]);
    }

    #[test]
    fn linear_combination_stays_within_unit_bounds() {
        let keywords: &[(i64, f32)] = &[(1, 1.0), (2, 0.5)];
        let concepts: &[(i64, f32)] = &[(2, 1.0)];
        let embedding: &[(i64, f32)] = &[(1, 0.8), (3, 0.9)];

        let weights = HybridWeights::default();
        let results = linear_combination(&[
            (keywords, weights.keywords),
            (concepts, weights.concepts),
            (embedding, weights.embedding),
        ]);

        for (_, score) in &results {
            assert!(*score >= 0.0 && *score <= 1.0);
        }
    }

    #[test]
    fn linear_combination_missing_signal_contributes_zero() {
        let keywords: &[(i64, f32)] = &[(1, 1.0)];
        let concepts: &[(i64, f32)] = &[];
        let results = linear_combination(&[(keywords, 0.5), (concepts, 0.5)]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
    }
}
