//! Match review queue: one active entry per supplier item, upsert on
//! `(supplier_item_id)`, admin transitions, and the daily expiry sweep.

use chrono::{Duration, Utc};
use futures::FutureExt;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::DbError;
use crate::models::{MatchStatus, ReviewEntry, ReviewStatus};
use crate::pool::Db;

/// Counts for the admin backlog dashboard. Only `pending` counts toward
/// the live backlog.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReviewQueueStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub expired: i64,
    pub needs_category: i64,
}

/// Outcome of an approve transition, used to drive aggregate recomputes.
#[derive(Debug, Clone)]
pub struct ApproveOutcome {
    pub supplier_item_id: Uuid,
    pub product_id: Uuid,
    pub previous_product_id: Option<Uuid>,
}

/// Creates or replaces the entry for a supplier item with a fresh pending
/// state and a new expiry window.
pub async fn upsert_pending(
    db: &Db,
    supplier_item_id: Uuid,
    candidate_products: Value,
    ttl_days: i64,
) -> Result<Uuid, DbError> {
    let expires_at = Utc::now() + Duration::days(ttl_days);
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO match_review_queue
            (supplier_item_id, candidate_products, status, expires_at)
        VALUES ($1, $2, 'pending', $3)
        ON CONFLICT (supplier_item_id) DO UPDATE SET
            candidate_products = EXCLUDED.candidate_products,
            status = 'pending',
            reviewed_by = NULL,
            reviewed_at = NULL,
            created_at = now(),
            expires_at = EXCLUDED.expires_at
        RETURNING id
        "#,
    )
    .bind(supplier_item_id)
    .bind(candidate_products)
    .bind(expires_at)
    .fetch_one(db.pool())
    .await?;
    Ok(id)
}

pub async fn get(db: &Db, id: Uuid) -> Result<Option<ReviewEntry>, DbError> {
    let row = sqlx::query_as::<_, ReviewEntry>("SELECT * FROM match_review_queue WHERE id = $1")
        .bind(id)
        .fetch_optional(db.pool())
        .await?;
    Ok(row)
}

/// Approves an entry: stamps the reviewer, links the supplier item to the
/// chosen product as `verified_match`, and reports the previous link so
/// the old product's aggregates can be refreshed too.
pub async fn approve(
    db: &Db,
    review_id: Uuid,
    reviewer_id: Uuid,
    product_id: Uuid,
) -> Result<ApproveOutcome, DbError> {
    db.with_tx(move |conn| {
        async move {
            let row: Option<(Uuid,)> = sqlx::query_as(
                r#"
                UPDATE match_review_queue
                SET status = 'approved', reviewed_by = $2, reviewed_at = now()
                WHERE id = $1 AND status IN ('pending', 'needs_category')
                RETURNING supplier_item_id
                "#,
            )
            .bind(review_id)
            .bind(reviewer_id)
            .fetch_optional(&mut *conn)
            .await?;

            let (supplier_item_id,) =
                row.ok_or_else(|| DbError::not_found("review entry", review_id))?;

            let (previous_product_id,): (Option<Uuid>,) = sqlx::query_as(
                r#"
                UPDATE supplier_items si
                SET product_id = $2, match_status = $3, updated_at = now()
                FROM (SELECT product_id FROM supplier_items WHERE id = $1 FOR UPDATE) prev
                WHERE si.id = $1
                RETURNING prev.product_id
                "#,
            )
            .bind(supplier_item_id)
            .bind(product_id)
            .bind(MatchStatus::VerifiedMatch)
            .fetch_one(&mut *conn)
            .await?;

            Ok(ApproveOutcome {
                supplier_item_id,
                product_id,
                previous_product_id,
            })
        }
        .boxed()
    })
    .await
}

/// Rejects an entry; the supplier item drops back to `unmatched` with its
/// link cleared. Creating a fresh draft product is a separate admin step.
pub async fn reject(db: &Db, review_id: Uuid, reviewer_id: Uuid) -> Result<Uuid, DbError> {
    db.with_tx(move |conn| {
        async move {
            let row: Option<(Uuid,)> = sqlx::query_as(
                r#"
                UPDATE match_review_queue
                SET status = 'rejected', reviewed_by = $2, reviewed_at = now()
                WHERE id = $1 AND status IN ('pending', 'needs_category')
                RETURNING supplier_item_id
                "#,
            )
            .bind(review_id)
            .bind(reviewer_id)
            .fetch_optional(&mut *conn)
            .await?;

            let (supplier_item_id,) =
                row.ok_or_else(|| DbError::not_found("review entry", review_id))?;

            sqlx::query(
                r#"
                UPDATE supplier_items
                SET product_id = NULL, match_status = 'unmatched', updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(supplier_item_id)
            .execute(&mut *conn)
            .await?;

            Ok(supplier_item_id)
        }
        .boxed()
    })
    .await
}

/// Parks an entry until a category is assigned.
pub async fn mark_needs_category(db: &Db, review_id: Uuid, reviewer_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE match_review_queue
        SET status = 'needs_category', reviewed_by = $2, reviewed_at = now()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(review_id)
    .bind(reviewer_id)
    .execute(db.pool())
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("review entry", review_id));
    }
    Ok(())
}

/// Returns a parked entry to the pending pool after categorization.
pub async fn reopen(db: &Db, review_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE match_review_queue
        SET status = 'pending', reviewed_by = NULL, reviewed_at = NULL
        WHERE id = $1 AND status = 'needs_category'
        "#,
    )
    .bind(review_id)
    .execute(db.pool())
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("review entry", review_id));
    }
    Ok(())
}

/// Expires stale pending entries and returns the affected supplier items
/// so a fresh matching attempt can be enqueued for each.
pub async fn expire_stale(db: &Db) -> Result<Vec<Uuid>, DbError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE match_review_queue
        SET status = 'expired'
        WHERE status = 'pending' AND expires_at < now()
        RETURNING supplier_item_id
        "#,
    )
    .fetch_all(db.pool())
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Status breakdown, optionally narrowed to one supplier.
pub async fn stats(db: &Db, supplier_id: Option<Uuid>) -> Result<ReviewQueueStats, DbError> {
    let rows: Vec<(ReviewStatus, i64)> = match supplier_id {
        Some(supplier_id) => {
            sqlx::query_as(
                r#"
                SELECT q.status, COUNT(*) FROM match_review_queue q
                JOIN supplier_items si ON si.id = q.supplier_item_id
                WHERE si.supplier_id = $1
                GROUP BY q.status
                "#,
            )
            .bind(supplier_id)
            .fetch_all(db.pool())
            .await?
        }
        None => {
            sqlx::query_as("SELECT status, COUNT(*) FROM match_review_queue GROUP BY status")
                .fetch_all(db.pool())
                .await?
        }
    };

    let mut stats = ReviewQueueStats::default();
    for (status, count) in rows {
        stats.total += count;
        match status {
            ReviewStatus::Pending => stats.pending = count,
            ReviewStatus::Approved => stats.approved = count,
            ReviewStatus::Rejected => stats.rejected = count,
            ReviewStatus::Expired => stats.expired = count,
            ReviewStatus::NeedsCategory => stats.needs_category = count,
        }
    }
    Ok(stats)
}
