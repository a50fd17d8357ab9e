//! Shared types for matching.

use catalog_db::MatchStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One scored candidate product for a supplier item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub product_id: Uuid,
    pub product_name: String,
    /// Fuzzy score in [0, 100].
    pub score: f64,
    pub category_id: Option<Uuid>,
    /// Reranker justification, persisted onto review rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Classification of one supplier item against its candidate set.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub supplier_item_id: Uuid,
    pub match_status: MatchStatus,
    pub best_match: Option<MatchCandidate>,
    pub candidates: Vec<MatchCandidate>,
    pub match_score: Option<f64>,
}

/// Batch counters, mirrored into logs and job metadata.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MatchStats {
    pub processed: u64,
    pub auto_matched: u64,
    pub sent_to_review: u64,
    pub unmatched: u64,
    pub skipped_verified: u64,
    pub errors: u64,
}

/// Matching thresholds and knobs.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Fuzzy score at or above which a match links automatically.
    pub auto_threshold: f64,
    /// Fuzzy score at or above which a match goes to human review.
    pub potential_threshold: f64,
    /// Candidates kept per item.
    pub max_candidates: usize,
    /// Vector neighbours fetched as the candidate pre-filter.
    pub vector_top_k: u32,
    /// Whether the LLM reranker runs over vector-nearest candidates.
    pub use_llm_rerank: bool,
    /// Rerank confidence at or above which a match links automatically.
    pub rerank_auto_confidence: f64,
    /// Rerank confidence at or above which a match goes to review.
    pub rerank_review_confidence: f64,
    /// Review entries expire after this many days.
    pub review_ttl_days: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            auto_threshold: 95.0,
            potential_threshold: 70.0,
            max_candidates: 10,
            vector_top_k: 10,
            use_llm_rerank: false,
            rerank_auto_confidence: 0.9,
            rerank_review_confidence: 0.7,
            review_ttl_days: 14,
        }
    }
}

impl MatchConfig {
    /// Reads the confidence thresholds from the environment
    /// (`MATCH_CONFIDENCE_AUTO_THRESHOLD`, `MATCH_CONFIDENCE_REVIEW_THRESHOLD`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rerank_auto_confidence: env_f64(
                "MATCH_CONFIDENCE_AUTO_THRESHOLD",
                defaults.rerank_auto_confidence,
            ),
            rerank_review_confidence: env_f64(
                "MATCH_CONFIDENCE_REVIEW_THRESHOLD",
                defaults.rerank_review_confidence,
            ),
            use_llm_rerank: std::env::var("MATCH_USE_LLM_RERANK")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.use_llm_rerank),
            ..defaults
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
