//! Token-set fuzzy scoring shared by the category normalizer and the
//! product matcher.
//!
//! Both inputs are tokenized into sorted, deduplicated word sets and
//! compared by normalized edit distance. Word order and repeated words
//! therefore do not hurt the score (`"Galaxy A54 Samsung 128GB"` vs
//! `"Samsung Galaxy A54 128GB"` → 100), while missing qualifiers pull it
//! down smoothly: a name that omits `5G` and a colour scores in the 70s
//! against its fuller variant, which is exactly the review band.

use std::collections::BTreeSet;

use strsim::normalized_levenshtein;

/// Lower-cases and collapses all whitespace runs into single spaces.
///
/// This is the canonical normalization for dedup keys and cache lookups;
/// every scoring entry point applies it internally as well.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token-set similarity between two strings, in `[0.0, 100.0]`.
///
/// Both inputs are normalized first. Two empty strings score 100 (they are
/// identical); one empty side scores 0. Identical token sets score 100
/// regardless of order or repetition.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    if a == b {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let tokens_a: BTreeSet<&str> = a.split(' ').collect();
    let tokens_b: BTreeSet<&str> = b.split(' ').collect();
    if tokens_a == tokens_b {
        return 100.0;
    }

    let sorted_a = tokens_a.into_iter().collect::<Vec<_>>().join(" ");
    let sorted_b = tokens_b.into_iter().collect::<Vec<_>>().join(" ");

    (normalized_levenshtein(&sorted_a, &sorted_b) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_name("  Mountain   Bike\tX "), "mountain bike x");
    }

    #[test]
    fn identical_names_score_100() {
        assert_eq!(token_set_ratio("Samsung Galaxy A54", "Samsung Galaxy A54"), 100.0);
    }

    #[test]
    fn word_order_is_ignored() {
        let score = token_set_ratio("Galaxy A54 Samsung 128GB", "Samsung Galaxy A54 128GB");
        assert_eq!(score, 100.0);
    }

    #[test]
    fn missing_qualifiers_land_in_the_review_band() {
        let score = token_set_ratio("Samsung Galaxy A54 128GB", "Samsung Galaxy A54 5G 128GB Black");
        assert!((70.0..95.0).contains(&score), "got {score}");
    }

    #[test]
    fn unrelated_names_score_low() {
        let score = token_set_ratio("Bosch Hammer Drill 750W", "Samsung Galaxy A54 5G");
        assert!(score < 70.0, "got {score}");
    }

    #[test]
    fn empty_versus_nonempty_scores_zero() {
        assert_eq!(token_set_ratio("", "Samsung"), 0.0);
        assert_eq!(token_set_ratio("", ""), 100.0);
    }
}
