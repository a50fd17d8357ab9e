//! Aggregate recomputation for products.
//!
//! Thin policy layer over the single-UPDATE SQL in `catalog-db`: batches
//! deduplicate their product ids, failures are logged per product and do
//! not stop the batch. Triggered by auto-matching, manual link/unlink,
//! price changes, and the nightly sweep.

use std::collections::HashSet;

use catalog_db::Db;
use catalog_db::repo::products::{self, AggregateResult};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AggregationEngine {
    db: Db,
}

impl AggregationEngine {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Recomputes one product; `trigger` names the causing event in logs.
    pub async fn recompute(
        &self,
        product_id: Uuid,
        trigger: &str,
    ) -> Result<AggregateResult, catalog_db::DbError> {
        let result = products::recompute_aggregates(&self.db, product_id).await?;
        info!(
            product_id = %product_id,
            min_price = ?result.min_price,
            availability = result.availability,
            trigger,
            "product aggregates updated"
        );
        Ok(result)
    }

    /// Nightly sweep: recomputes every product that currently has linked
    /// matched items.
    pub async fn recompute_all_linked(&self) -> Result<usize, catalog_db::DbError> {
        let product_ids = products::list_ids_with_linked_items(&self.db).await?;
        let count = product_ids.len();
        self.recompute_batch(product_ids, "nightly_sweep").await;
        Ok(count)
    }

    /// Recomputes a set of products, deduplicated, best-effort per product.
    pub async fn recompute_batch(
        &self,
        product_ids: impl IntoIterator<Item = Uuid>,
        trigger: &str,
    ) -> Vec<AggregateResult> {
        let unique: HashSet<Uuid> = product_ids.into_iter().collect();
        let mut results = Vec::with_capacity(unique.len());

        for product_id in unique {
            match self.recompute(product_id, trigger).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(product_id = %product_id, error = %err, trigger, "aggregate recompute failed");
                }
            }
        }

        info!(count = results.len(), trigger, "aggregate batch complete");
        results
    }
}
