//! Batch matching pipeline.
//!
//! Per item: build a candidate set (category block when the item carries
//! one, else all live products; vector-nearest pre-filter feeds the
//! optional reranker), score, classify, and persist the outcome. The
//! expensive LLM/embedding calls happen before any database write.

use std::collections::HashMap;
use std::sync::Arc;

use catalog_db::repo::{products, review_queue, supplier_items};
use catalog_db::{Characteristics, Db, MatchStatus, SupplierItem};
use catalog_db::repo::products::ProductCandidate;
use llm_service::LlmServiceProfiles;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vector_store::{ItemEmbedder, ItemText, VectorIndex};

use crate::aggregation::AggregationEngine;
use crate::errors::MatchError;
use crate::fuzzy_matcher::{classify, score_candidates};
use crate::reranker::rerank;
use crate::types::{MatchConfig, MatchOutcome, MatchStats};

pub struct MatchEngine {
    db: Db,
    profiles: Arc<LlmServiceProfiles>,
    embedder: Arc<ItemEmbedder>,
    index: Arc<dyn VectorIndex>,
    aggregation: AggregationEngine,
    config: MatchConfig,
}

impl MatchEngine {
    pub fn new(
        db: Db,
        profiles: Arc<LlmServiceProfiles>,
        embedder: Arc<ItemEmbedder>,
        index: Arc<dyn VectorIndex>,
        config: MatchConfig,
    ) -> Self {
        let aggregation = AggregationEngine::new(db.clone());
        Self {
            db,
            profiles,
            embedder,
            index,
            aggregation,
            config,
        }
    }

    /// The aggregation engine this matcher recomputes through.
    pub fn aggregation(&self) -> &AggregationEngine {
        &self.aggregation
    }

    /// Matches up to `limit` unmatched items, optionally per supplier.
    pub async fn match_unmatched(
        &self,
        supplier_id: Option<Uuid>,
        limit: i64,
    ) -> Result<MatchStats, MatchError> {
        let items = supplier_items::list_unmatched(&self.db, supplier_id, limit).await?;
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let (_, stats) = self.match_batch(&ids).await?;
        Ok(stats)
    }

    /// Matches the given supplier items and writes every outcome.
    ///
    /// Per-item failures are counted and skipped; the batch always runs to
    /// the end, then aggregates are recomputed for the auto-linked
    /// products in one pass.
    pub async fn match_batch(
        &self,
        item_ids: &[Uuid],
    ) -> Result<(Vec<MatchOutcome>, MatchStats), MatchError> {
        let items = supplier_items::get_many(&self.db, item_ids).await?;
        let mut stats = MatchStats::default();
        let mut outcomes = Vec::with_capacity(items.len());
        let mut touched_products: Vec<Uuid> = Vec::new();

        // Candidate sets are cached per category key for the batch.
        let mut candidate_cache: HashMap<Option<Uuid>, Vec<ProductCandidate>> = HashMap::new();

        for item in items {
            if item.match_status == MatchStatus::VerifiedMatch {
                stats.skipped_verified += 1;
                continue;
            }

            match self.match_one(&item, &mut candidate_cache).await {
                Ok(outcome) => {
                    stats.processed += 1;
                    match outcome.match_status {
                        MatchStatus::AutoMatched => {
                            stats.auto_matched += 1;
                            if let Some(best) = &outcome.best_match {
                                touched_products.push(best.product_id);
                            }
                            if let Some(previous) = item.product_id {
                                touched_products.push(previous);
                            }
                        }
                        MatchStatus::PotentialMatch => stats.sent_to_review += 1,
                        _ => stats.unmatched += 1,
                    }
                    outcomes.push(outcome);
                }
                Err(err) => {
                    stats.errors += 1;
                    warn!(item_id = %item.id, error = %err, "matching failed for item");
                }
            }
        }

        if !touched_products.is_empty() {
            self.aggregation
                .recompute_batch(touched_products, "auto_match")
                .await;
        }

        info!(
            processed = stats.processed,
            auto = stats.auto_matched,
            review = stats.sent_to_review,
            unmatched = stats.unmatched,
            skipped_verified = stats.skipped_verified,
            errors = stats.errors,
            "match batch complete"
        );
        Ok((outcomes, stats))
    }

    async fn match_one(
        &self,
        item: &SupplierItem,
        candidate_cache: &mut HashMap<Option<Uuid>, Vec<ProductCandidate>>,
    ) -> Result<MatchOutcome, MatchError> {
        let candidates = self.candidate_set(item, candidate_cache).await?;
        let scored = score_candidates(&item.name, &candidates, self.config.max_candidates);
        let mut outcome = classify(item.id, scored, &self.config);

        if self.config.use_llm_rerank && !outcome.candidates.is_empty() {
            if let Some(reranked) = rerank(
                &self.profiles,
                item.id,
                &item.name,
                &outcome.candidates,
                &self.config,
            )
            .await
            {
                outcome = reranked;
            }
        }

        self.persist_outcome(&outcome).await?;
        Ok(outcome)
    }

    /// Candidate pre-filter: the item's category block when it has one
    /// and the block is non-empty; vector neighbours' products next; the
    /// whole live catalogue as the last resort.
    async fn candidate_set(
        &self,
        item: &SupplierItem,
        cache: &mut HashMap<Option<Uuid>, Vec<ProductCandidate>>,
    ) -> Result<Vec<ProductCandidate>, MatchError> {
        let category_id = Characteristics(&item.characteristics)
            .str_value("_category_id")
            .and_then(|s| Uuid::parse_str(s).ok());

        if let Some(category_id) = category_id {
            let block = self.cached_candidates(Some(category_id), cache).await?;
            if !block.is_empty() {
                return Ok(block);
            }
        }

        if let Some(neighbors) = self.vector_candidates(item).await {
            if !neighbors.is_empty() {
                return Ok(neighbors);
            }
        }

        self.cached_candidates(None, cache).await
    }

    async fn cached_candidates(
        &self,
        category_id: Option<Uuid>,
        cache: &mut HashMap<Option<Uuid>, Vec<ProductCandidate>>,
    ) -> Result<Vec<ProductCandidate>, MatchError> {
        if let Some(cached) = cache.get(&category_id) {
            return Ok(cached.clone());
        }
        let loaded = products::list_candidates(&self.db, category_id).await?;
        cache.insert(category_id, loaded.clone());
        Ok(loaded)
    }

    /// Products linked by the item's vector neighbours. Best-effort: any
    /// embedding/search failure just disables the pre-filter.
    async fn vector_candidates(&self, item: &SupplierItem) -> Option<Vec<ProductCandidate>> {
        let text = ItemText {
            name: &item.name,
            ..Default::default()
        };
        let query = match self
            .embedder
            .embed_text(&vector_store::build_item_text(&text))
            .await
        {
            Ok(query) => query,
            Err(err) => {
                debug!(item_id = %item.id, error = %err, "vector pre-filter unavailable");
                return None;
            }
        };

        let neighbors = match self
            .index
            .search_top_k(
                query,
                self.embedder.model_name(),
                self.config.vector_top_k,
                Some(item.id),
            )
            .await
        {
            Ok(neighbors) => neighbors,
            Err(err) => {
                debug!(item_id = %item.id, error = %err, "vector search failed");
                return None;
            }
        };

        let mut seen = std::collections::HashSet::new();
        let product_ids: Vec<Uuid> = neighbors
            .iter()
            .filter_map(|n| n.product_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if product_ids.is_empty() {
            return None;
        }

        match products::get_candidates_by_ids(&self.db, &product_ids).await {
            Ok(candidates) => Some(candidates),
            Err(err) => {
                debug!(item_id = %item.id, error = %err, "neighbor product fetch failed");
                None
            }
        }
    }

    /// Writes one outcome: the item row always, a review entry for the
    /// potential class.
    async fn persist_outcome(&self, outcome: &MatchOutcome) -> Result<(), MatchError> {
        let score = outcome.match_score.and_then(decimal_score);
        let candidates_json = if outcome.candidates.is_empty() {
            None
        } else {
            Some(serde_json::to_value(&outcome.candidates)?)
        };

        match (outcome.match_status, &outcome.best_match) {
            (MatchStatus::AutoMatched, Some(best)) => {
                supplier_items::set_match_outcome(
                    &self.db,
                    outcome.supplier_item_id,
                    MatchStatus::AutoMatched,
                    Some(best.product_id),
                    score,
                    candidates_json,
                )
                .await?;
            }
            (MatchStatus::PotentialMatch, _) => {
                supplier_items::set_match_outcome(
                    &self.db,
                    outcome.supplier_item_id,
                    MatchStatus::PotentialMatch,
                    None,
                    score,
                    candidates_json.clone(),
                )
                .await?;
                review_queue::upsert_pending(
                    &self.db,
                    outcome.supplier_item_id,
                    candidates_json.unwrap_or_else(|| serde_json::Value::Array(Vec::new())),
                    self.config.review_ttl_days,
                )
                .await?;
            }
            _ => {
                supplier_items::set_match_outcome(
                    &self.db,
                    outcome.supplier_item_id,
                    MatchStatus::Unmatched,
                    None,
                    score,
                    candidates_json,
                )
                .await?;
            }
        }
        Ok(())
    }
}

fn decimal_score(score: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(score).map(|d| d.round_dp(2))
}
