//! LLM reranking over vector-nearest candidates.
//!
//! The model sees the item name plus the candidate list and answers with
//! `(product_id, confidence, reasoning)` picks. Confidence partitions
//! into the same three classes as fuzzy scoring (defaults 0.9 / 0.7).
//! Every failure path (transport, unparsable JSON, hallucinated ids)
//! falls back to the fuzzy outcome that was computed anyway.

use catalog_db::MatchStatus;
use llm_service::LlmServiceProfiles;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{MatchCandidate, MatchConfig, MatchOutcome};

#[derive(Debug, Deserialize)]
struct RerankResponse {
    #[serde(default)]
    matches: Vec<RerankPick>,
}

#[derive(Debug, Deserialize)]
struct RerankPick {
    product_id: Uuid,
    /// Confidence in [0, 1].
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Asks the rerank profile to choose among `candidates` for `item_name`.
///
/// Returns `None` when the model fails or answers uselessly; the caller
/// then keeps the fuzzy outcome.
pub async fn rerank(
    profiles: &LlmServiceProfiles,
    supplier_item_id: Uuid,
    item_name: &str,
    candidates: &[MatchCandidate],
    config: &MatchConfig,
) -> Option<MatchOutcome> {
    if candidates.is_empty() {
        return None;
    }

    let prompt = rerank_prompt(item_name, candidates);
    let raw = match profiles.rerank_json(&prompt).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(%supplier_item_id, error = %err, "rerank call failed; falling back to fuzzy");
            return None;
        }
    };

    let response = parse_rerank(&raw)?;

    // Keep only picks that reference real candidates, best first.
    let mut picks: Vec<(RerankPick, MatchCandidate)> = response
        .matches
        .into_iter()
        .filter_map(|pick| {
            candidates
                .iter()
                .find(|c| c.product_id == pick.product_id)
                .cloned()
                .map(|c| (pick, c))
        })
        .collect();
    picks.sort_by(|a, b| {
        b.0.confidence
            .partial_cmp(&a.0.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (top, top_candidate) = picks.first()?;
    let confidence = top.confidence.clamp(0.0, 1.0);

    let match_status = if confidence >= config.rerank_auto_confidence {
        MatchStatus::AutoMatched
    } else if confidence >= config.rerank_review_confidence {
        MatchStatus::PotentialMatch
    } else {
        MatchStatus::Unmatched
    };

    debug!(
        %supplier_item_id,
        product_id = %top_candidate.product_id,
        confidence,
        status = ?match_status,
        "rerank classified"
    );

    let reranked: Vec<MatchCandidate> = picks
        .iter()
        .map(|(pick, candidate)| MatchCandidate {
            score: (pick.confidence.clamp(0.0, 1.0) * 100.0).round(),
            reasoning: (!pick.reasoning.is_empty()).then(|| pick.reasoning.clone()),
            ..candidate.clone()
        })
        .collect();

    let best = reranked.first().cloned();
    Some(MatchOutcome {
        supplier_item_id,
        match_status,
        best_match: (match_status == MatchStatus::AutoMatched).then(|| best.clone()).flatten(),
        match_score: best.as_ref().map(|b| b.score),
        candidates: reranked,
    })
}

fn rerank_prompt(item_name: &str, candidates: &[MatchCandidate]) -> String {
    let mut listing = String::new();
    for candidate in candidates {
        listing.push_str(&format!(
            "- {}: \"{}\"\n",
            candidate.product_id, candidate.product_name
        ));
    }

    format!(
        r#"A supplier submitted this product row:

"{item_name}"

Candidate catalogue products:
{listing}
Which candidates (if any) denote the same physical product? Respond with ONLY JSON:

{{
  "matches": [
    {{"product_id": "<uuid from the list>", "confidence": 0.0, "reasoning": "one sentence"}}
  ]
}}

Confidence is your probability that the supplier row and the candidate are
the same product (same model, capacity, color). Omit candidates that are
clearly different products."#
    )
}

fn parse_rerank(raw: &str) -> Option<RerankResponse> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    serde_json::from_str(&raw[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_rerank_payload() {
        let id = Uuid::new_v4();
        let raw = format!(
            "```json\n{{\"matches\": [{{\"product_id\": \"{id}\", \"confidence\": 0.92, \"reasoning\": \"same model\"}}]}}\n```"
        );
        let parsed = parse_rerank(&raw).unwrap();
        assert_eq!(parsed.matches.len(), 1);
        assert_eq!(parsed.matches[0].product_id, id);
    }

    #[test]
    fn unparsable_payload_is_none() {
        assert!(parse_rerank("no json").is_none());
    }
}
