//! Reciprocal Rank Fusion over opaque ranked lists.
//!
//! Fusion consumes only rank positions, never the scores that produced
//! them, which is what lets a probabilistic BM25 score and a cosine
//! similarity combine without normalization. Each list contributes
//! `1 / (k + rank)` for every item it ranks (1-based); an item absent from
//! a list gets exactly 0 from it, not a penalty. The function is symmetric
//! in its input lists.

use std::collections::BTreeMap;

/// Merge ranked id lists into `(id, fused_score)` pairs, best first.
///
/// # Parameters
///
/// - `lists` — any number of ranked id sequences, best first. The fuser
///   knows nothing about the backend that produced each list.
/// - `k` — RRF constant (typically 60). Larger values flatten the decay
///   of contribution with rank.
///
/// # Ordering
///
/// Sorted by fused score descending; exact ties order by id ascending,
/// so fusion output is reproducible regardless of input list order.
///
/// # Example
///
/// ```
/// use sift_search::fusion::rrf_fuse;
///
/// let dense = vec!["d1", "d2"];
/// let sparse = vec!["d2", "d3"];
/// let fused = rrf_fuse(&[&dense, &sparse], 60);
/// assert_eq!(fused[0].0, "d2"); // ranked in both lists
/// ```
#[must_use]
pub fn rrf_fuse(lists: &[&[&str]], k: usize) -> Vec<(String, f32)> {
    let mut scores: BTreeMap<String, f32> = BTreeMap::new();

    for list in lists {
        for (idx, item_id) in list.iter().enumerate() {
            let rank = idx + 1; // 1-indexed
            let contribution = 1.0 / (k as f32 + rank as f32);
            scores
                .entry((*item_id).to_string())
                .and_modify(|s| *s += contribution)
                .or_insert(contribution);
        }
    }

    let mut result: Vec<_> = scores.into_iter().collect();
    result.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    result
}

/// 1-based rank of `item_id` in a ranked list, if present.
#[must_use]
pub fn find_rank(list: &[&str], item_id: &str) -> Option<usize> {
    list.iter().position(|id| *id == item_id).map(|idx| idx + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fuse_empty_lists() {
        let result = rrf_fuse(&[&[], &[]], 60);
        assert!(result.is_empty());
    }

    #[test]
    fn fuse_no_lists() {
        let result = rrf_fuse(&[], 60);
        assert!(result.is_empty());
    }

    #[test]
    fn single_item_in_both_lists_accumulates() {
        let a = vec!["d1"];
        let b = vec!["d1"];
        let result = rrf_fuse(&[&a, &b], 60);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "d1");
        // 1/(60+1) + 1/(60+1)
        let expected = 2.0 / 61.0;
        assert!((result[0].1 - expected).abs() < 1e-6);
    }

    #[test]
    fn cross_validated_item_beats_single_signal_item() {
        // d1 is ranked 1st in both lists; d2 is 1st in one list only.
        let a = vec!["d1", "d2"];
        let b = vec!["d1"];
        let both = rrf_fuse(&[&a, &b], 60);

        let single = rrf_fuse(&[&["d2"], &[]], 60);

        let d1_score = both.iter().find(|(id, _)| id == "d1").map(|(_, s)| *s);
        let d2_alone = single[0].1;
        assert!(d1_score.expect("d1 fused") > d2_alone);
    }

    #[test]
    fn absent_list_contributes_exactly_zero() {
        let a = vec!["d1"];
        let with_empty = rrf_fuse(&[&a, &[]], 60);
        let alone = rrf_fuse(&[&a], 60);
        assert_eq!(with_empty, alone);
    }

    #[test]
    fn fusion_is_symmetric() {
        let a = vec!["d1", "d2", "d3"];
        let b = vec!["d3", "d4"];
        assert_eq!(rrf_fuse(&[&a, &b], 60), rrf_fuse(&[&b, &a], 60));
    }

    #[test]
    fn disjoint_lists_tie_and_order_by_id() {
        let a = vec!["delta"];
        let b = vec!["alpha"];
        let result = rrf_fuse(&[&a, &b], 60);

        assert_eq!(result.len(), 2);
        assert!((result[0].1 - result[1].1).abs() < 1e-9);
        assert_eq!(result[0].0, "alpha");
        assert_eq!(result[1].0, "delta");
    }

    #[test]
    fn smaller_k_steepens_rank_decay() {
        let a = vec!["d1"];
        let k10 = rrf_fuse(&[&a], 10);
        let k60 = rrf_fuse(&[&a], 60);
        assert!(k10[0].1 > k60[0].1);
    }

    #[test]
    fn find_rank_is_one_based() {
        let list = vec!["d1", "d2"];
        assert_eq!(find_rank(&list, "d1"), Some(1));
        assert_eq!(find_rank(&list, "d2"), Some(2));
        assert_eq!(find_rank(&list, "d3"), None);
    }

    fn id_list() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec("[a-d][0-9]", 0..8).prop_map(|ids| {
            let mut seen = std::collections::HashSet::new();
            ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
        })
    }

    proptest! {
        #[test]
        fn symmetry_holds_for_arbitrary_lists(a in id_list(), b in id_list()) {
            let a_refs: Vec<&str> = a.iter().map(String::as_str).collect();
            let b_refs: Vec<&str> = b.iter().map(String::as_str).collect();
            prop_assert_eq!(rrf_fuse(&[&a_refs, &b_refs], 60), rrf_fuse(&[&b_refs, &a_refs], 60));
        }

        #[test]
        fn every_ranked_item_scores_positive(a in id_list(), b in id_list()) {
            let a_refs: Vec<&str> = a.iter().map(String::as_str).collect();
            let b_refs: Vec<&str> = b.iter().map(String::as_str).collect();
            let fused = rrf_fuse(&[&a_refs, &b_refs], 60);

            let expected: std::collections::HashSet<&str> =
                a_refs.iter().chain(b_refs.iter()).copied().collect();
            prop_assert_eq!(fused.len(), expected.len());
            for (_, score) in &fused {
                prop_assert!(*score > 0.0);
            }
        }
    }
}
