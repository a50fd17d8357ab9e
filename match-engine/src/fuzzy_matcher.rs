//! Fuzzy scoring and the three-way classification.
//!
//! Pure functions: candidate sets come in, an outcome comes out. The
//! pipeline owns all I/O. Ties keep candidate insertion order (the sort
//! is stable), and `verified_match` items never reach these functions.

use catalog_db::MatchStatus;
use catalog_db::repo::products::ProductCandidate;
use fuzzy_text::token_set_ratio;
use uuid::Uuid;

use crate::types::{MatchCandidate, MatchConfig, MatchOutcome};

/// Scores `item_name` against every candidate and keeps the top
/// `max_candidates`, sorted by score descending.
pub fn score_candidates(
    item_name: &str,
    candidates: &[ProductCandidate],
    max_candidates: usize,
) -> Vec<MatchCandidate> {
    let mut scored: Vec<MatchCandidate> = candidates
        .iter()
        .map(|candidate| MatchCandidate {
            product_id: candidate.id,
            product_name: candidate.name.clone(),
            score: token_set_ratio(item_name, &candidate.name),
            category_id: candidate.category_id,
            reasoning: None,
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(max_candidates);
    scored
}

/// Classifies a scored candidate list for one supplier item.
///
/// - top score ≥ auto threshold → `auto_matched` with the best match
/// - potential ≤ top score < auto → `potential_match`, link deferred
/// - otherwise → `unmatched`, candidates kept for diagnostics
pub fn classify(
    supplier_item_id: Uuid,
    scored: Vec<MatchCandidate>,
    config: &MatchConfig,
) -> MatchOutcome {
    let top_score = scored.first().map(|c| c.score);

    let match_status = match top_score {
        Some(score) if score >= config.auto_threshold => MatchStatus::AutoMatched,
        Some(score) if score >= config.potential_threshold => MatchStatus::PotentialMatch,
        _ => MatchStatus::Unmatched,
    };

    let best_match = match match_status {
        MatchStatus::AutoMatched => scored.first().cloned(),
        _ => None,
    };

    MatchOutcome {
        supplier_item_id,
        match_status,
        best_match,
        candidates: scored,
        match_score: top_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> ProductCandidate {
        ProductCandidate {
            id: Uuid::new_v4(),
            name: name.into(),
            category_id: None,
        }
    }

    fn config() -> MatchConfig {
        MatchConfig::default()
    }

    #[test]
    fn exact_name_auto_matches() {
        let candidates = vec![
            candidate("Samsung Galaxy A54 5G 128GB Black"),
            candidate("Samsung Galaxy S23 Ultra"),
        ];
        let scored = score_candidates("Samsung Galaxy A54 5G 128GB Black", &candidates, 10);
        let outcome = classify(Uuid::new_v4(), scored, &config());

        assert_eq!(outcome.match_status, MatchStatus::AutoMatched);
        let best = outcome.best_match.unwrap();
        assert_eq!(best.product_id, candidates[0].id);
        assert!(outcome.match_score.unwrap() >= 95.0);
    }

    #[test]
    fn ambiguous_name_goes_to_review() {
        let candidates = vec![
            candidate("Samsung Galaxy A54 5G 128GB Black"),
            candidate("Samsung Galaxy A54 5G 256GB Black"),
        ];
        let scored = score_candidates("Samsung Galaxy A54 128GB", &candidates, 10);
        let outcome = classify(Uuid::new_v4(), scored, &config());

        assert_eq!(outcome.match_status, MatchStatus::PotentialMatch);
        assert!(outcome.best_match.is_none());
        let score = outcome.match_score.unwrap();
        assert!((70.0..95.0).contains(&score), "got {score}");
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[test]
    fn unrelated_name_stays_unmatched() {
        let candidates = vec![candidate("Samsung Galaxy A54 5G")];
        let scored = score_candidates("Bosch Hammer Drill 750W", &candidates, 10);
        let outcome = classify(Uuid::new_v4(), scored, &config());

        assert_eq!(outcome.match_status, MatchStatus::Unmatched);
        assert!(outcome.best_match.is_none());
        assert!(outcome.match_score.unwrap() < 70.0);
    }

    #[test]
    fn empty_candidate_set_is_unmatched_without_score() {
        let outcome = classify(Uuid::new_v4(), Vec::new(), &config());
        assert_eq!(outcome.match_status, MatchStatus::Unmatched);
        assert!(outcome.match_score.is_none());
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn candidates_are_sorted_and_truncated() {
        let candidates = vec![
            candidate("totally unrelated thing"),
            candidate("Mountain Bike X 29"),
            candidate("Mountain Bike X"),
        ];
        let scored = score_candidates("Mountain Bike X", &candidates, 2);
        assert_eq!(scored.len(), 2);
        assert!(scored[0].score >= scored[1].score);
        assert_eq!(scored[0].product_name, "Mountain Bike X");
    }

    #[test]
    fn ties_keep_insertion_order() {
        let first = candidate("Galaxy A54");
        let second = candidate("Galaxy A54");
        let ids = (first.id, second.id);
        let scored = score_candidates("Galaxy A54", &[first, second], 10);
        assert_eq!(scored[0].product_id, ids.0);
        assert_eq!(scored[1].product_id, ids.1);
    }
}
