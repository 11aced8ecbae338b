//! Reciprocal Rank Fusion
//!
//! Combines the ranked lists of the retrieval paths:
//! RRF(d) = sum over lists of 1 / (k + rank(d)), rank 1-indexed, absent
//! lists contributing nothing. Ties break on how many lists contain the
//! unit, then id ascending.

use std::collections::HashMap;

use crate::constants::RRF_K;
use crate::types::UnitId;

/// Fuse ranked lists into a single (id, rrf_score) ranking
pub fn fuse(lists: &[Vec<(UnitId, f32)>]) -> Vec<(UnitId, f32)> {
    let mut scores: HashMap<UnitId, (f32, usize)> = HashMap::new();

    for list in lists {
        for (rank, (id, _)) in list.iter().enumerate() {
            let contribution = 1.0 / (RRF_K + (rank + 1) as f32);
            let entry = scores.entry(*id).or_insert((0.0, 0));
            entry.0 += contribution;
            entry.1 += 1;
        }
    }

    let mut fused: Vec<(UnitId, f32, usize)> = scores
        .into_iter()
        .map(|(id, (score, list_count))| (id, score, list_count))
        .collect();

    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    fused.into_iter().map(|(id, score, _)| (id, score)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> UnitId {
        UnitId::new()
    }

    #[test]
    fn test_single_list_first_rank_scores_one_over_sixty_one() {
        let d = id();
        let list_a = vec![(d, 0.9)];
        let list_b: Vec<(UnitId, f32)> = Vec::new();

        let fused = fuse(&[list_a, list_b]);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-6);
    }

    #[test]
    fn test_agreement_across_lists_outranks_single_list_top() {
        let shared = id();
        let solo = id();
        // shared is rank 2 in both lists; solo is rank 1 in one list
        let list_a = vec![(solo, 0.99), (shared, 0.9)];
        let list_b = vec![(id(), 0.8), (shared, 0.7)];

        let fused = fuse(&[list_a, list_b]);
        // 2/62 > 1/61
        assert_eq!(fused[0].0, shared);
    }

    #[test]
    fn test_tie_broken_by_list_membership_then_id() {
        let mut a = id();
        let mut b = id();
        if b < a {
            std::mem::swap(&mut a, &mut b);
        }

        // Same total score: a at rank 1 once; b at rank 1 once. Both in one
        // list. Tie falls through to id ascending.
        let fused = fuse(&[vec![(a, 0.5)], vec![(b, 0.5)]]);
        assert_eq!(fused[0].0, a);
        assert_eq!(fused[1].0, b);
    }

    #[test]
    fn test_empty_input() {
        assert!(fuse(&[]).is_empty());
        assert!(fuse(&[Vec::new(), Vec::new()]).is_empty());
    }

    #[test]
    fn test_ranks_are_one_indexed() {
        let first = id();
        let second = id();
        let fused = fuse(&[vec![(first, 0.9), (second, 0.8)]]);
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-6);
        assert!((fused[1].1 - 1.0 / 62.0).abs() < 1e-6);
    }
}
