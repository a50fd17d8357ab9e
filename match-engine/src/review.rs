//! Review-queue lifecycle glue.
//!
//! The repository owns the transactional transitions; this layer adds the
//! follow-ups: aggregate recomputes after an approval (for both the new
//! and any previously linked product) and the expiry sweep that hands
//! back supplier items for a fresh matching attempt.

use catalog_db::Db;
use catalog_db::repo::review_queue::{self, ReviewQueueStats};
use tracing::info;
use uuid::Uuid;

use crate::aggregation::AggregationEngine;
use crate::errors::MatchError;

pub struct ReviewService {
    db: Db,
    aggregation: AggregationEngine,
}

impl ReviewService {
    pub fn new(db: Db) -> Self {
        let aggregation = AggregationEngine::new(db.clone());
        Self { db, aggregation }
    }

    /// Approves a pending entry, links the item as `verified_match`, and
    /// refreshes aggregates for the chosen product (and the previous one,
    /// when the item was re-linked).
    pub async fn approve(
        &self,
        review_id: Uuid,
        reviewer_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), MatchError> {
        let outcome = review_queue::approve(&self.db, review_id, reviewer_id, product_id).await?;

        let mut affected = vec![outcome.product_id];
        if let Some(previous) = outcome.previous_product_id {
            if previous != outcome.product_id {
                affected.push(previous);
            }
        }
        self.aggregation
            .recompute_batch(affected, "manual_link")
            .await;

        info!(
            review_id = %review_id,
            supplier_item_id = %outcome.supplier_item_id,
            product_id = %product_id,
            "review approved"
        );
        Ok(())
    }

    /// Rejects a pending entry; the supplier item returns to `unmatched`.
    pub async fn reject(&self, review_id: Uuid, reviewer_id: Uuid) -> Result<Uuid, MatchError> {
        let supplier_item_id = review_queue::reject(&self.db, review_id, reviewer_id).await?;
        info!(review_id = %review_id, supplier_item_id = %supplier_item_id, "review rejected");
        Ok(supplier_item_id)
    }

    /// Parks an entry until a category is assigned.
    pub async fn mark_needs_category(
        &self,
        review_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<(), MatchError> {
        review_queue::mark_needs_category(&self.db, review_id, reviewer_id).await?;
        Ok(())
    }

    /// Returns a parked entry to the pending pool.
    pub async fn reopen(&self, review_id: Uuid) -> Result<(), MatchError> {
        review_queue::reopen(&self.db, review_id).await?;
        Ok(())
    }

    /// Daily sweep: expires stale pending entries. The returned supplier
    /// item ids are to be re-enqueued for matching by the caller.
    pub async fn expire_stale(&self) -> Result<Vec<Uuid>, MatchError> {
        let expired = review_queue::expire_stale(&self.db).await?;
        if !expired.is_empty() {
            info!(count = expired.len(), "review entries expired");
        }
        Ok(expired)
    }

    /// Backlog counts for the admin dashboard.
    pub async fn stats(&self, supplier_id: Option<Uuid>) -> Result<ReviewQueueStats, MatchError> {
        Ok(review_queue::stats(&self.db, supplier_id).await?)
    }
}
