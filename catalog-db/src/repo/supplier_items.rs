//! Supplier-item rows: idempotent upsert keyed by `(supplier_id,
//! supplier_sku)`, match-outcome writes, and fetch helpers.

use futures::FutureExt;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::DbError;
use crate::models::{MatchStatus, SupplierItem};
use crate::pool::Db;

/// Insert payload produced by the ETL normalizing phase.
#[derive(Debug, Clone)]
pub struct NewSupplierItem {
    pub supplier_id: Uuid,
    pub supplier_sku: String,
    pub name: String,
    pub current_price: Decimal,
    pub characteristics: Value,
}

/// What an upsert did. `product_id` is the item's existing link, so a
/// price change can fan out into an aggregate recompute.
#[derive(Debug, Clone, Copy)]
pub struct UpsertOutcome {
    pub id: Uuid,
    pub created: bool,
    pub price_changed: bool,
    pub product_id: Option<Uuid>,
}

/// Upserts one item. Re-submitting the same file updates prices in place
/// and never duplicates rows; a price change on an existing item appends a
/// `price_history` row in the same transaction, so history stays causally
/// ordered with the update.
pub async fn upsert_extracted(db: &Db, item: &NewSupplierItem) -> Result<UpsertOutcome, DbError> {
    let item = item.clone();
    db.with_tx(move |conn| {
        async move {
            let existing: Option<(Uuid, Decimal, Option<Uuid>)> = sqlx::query_as(
                r#"
                SELECT id, current_price, product_id FROM supplier_items
                WHERE supplier_id = $1 AND supplier_sku = $2
                FOR UPDATE
                "#,
            )
            .bind(item.supplier_id)
            .bind(&item.supplier_sku)
            .fetch_optional(&mut *conn)
            .await?;

            match existing {
                Some((id, old_price, product_id)) => {
                    sqlx::query(
                        r#"
                        UPDATE supplier_items
                        SET name = $2, current_price = $3, characteristics = $4,
                            updated_at = now()
                        WHERE id = $1
                        "#,
                    )
                    .bind(id)
                    .bind(&item.name)
                    .bind(item.current_price)
                    .bind(&item.characteristics)
                    .execute(&mut *conn)
                    .await?;

                    let price_changed = old_price != item.current_price;
                    if price_changed {
                        sqlx::query(
                            "INSERT INTO price_history (supplier_item_id, price) VALUES ($1, $2)",
                        )
                        .bind(id)
                        .bind(item.current_price)
                        .execute(&mut *conn)
                        .await?;
                    }

                    Ok(UpsertOutcome {
                        id,
                        created: false,
                        price_changed,
                        product_id,
                    })
                }
                None => {
                    let (id,): (Uuid,) = sqlx::query_as(
                        r#"
                        INSERT INTO supplier_items
                            (supplier_id, supplier_sku, name, current_price, characteristics)
                        VALUES ($1, $2, $3, $4, $5)
                        RETURNING id
                        "#,
                    )
                    .bind(item.supplier_id)
                    .bind(&item.supplier_sku)
                    .bind(&item.name)
                    .bind(item.current_price)
                    .bind(&item.characteristics)
                    .fetch_one(&mut *conn)
                    .await?;

                    Ok(UpsertOutcome {
                        id,
                        created: true,
                        price_changed: false,
                        product_id: None,
                    })
                }
            }
        }
        .boxed()
    })
    .await
}

/// Writes one match outcome. The score/candidates columns are set exactly
/// when the matcher produced them; manual flows clear them elsewhere.
pub async fn set_match_outcome(
    db: &Db,
    item_id: Uuid,
    status: MatchStatus,
    product_id: Option<Uuid>,
    match_score: Option<Decimal>,
    match_candidates: Option<Value>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE supplier_items
        SET match_status = $2, product_id = $3, match_score = $4,
            match_candidates = $5, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(item_id)
    .bind(status)
    .bind(product_id)
    .bind(match_score)
    .bind(match_candidates)
    .execute(db.pool())
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("supplier_item", item_id));
    }
    Ok(())
}

pub async fn get(db: &Db, id: Uuid) -> Result<Option<SupplierItem>, DbError> {
    let row = sqlx::query_as::<_, SupplierItem>("SELECT * FROM supplier_items WHERE id = $1")
        .bind(id)
        .fetch_optional(db.pool())
        .await?;
    Ok(row)
}

pub async fn get_many(db: &Db, ids: &[Uuid]) -> Result<Vec<SupplierItem>, DbError> {
    let rows = sqlx::query_as::<_, SupplierItem>(
        "SELECT * FROM supplier_items WHERE id = ANY($1) ORDER BY created_at",
    )
    .bind(ids)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Unmatched items for batch matching, newest first. Verified and
/// already-matched items are excluded by definition.
pub async fn list_unmatched(
    db: &Db,
    supplier_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<SupplierItem>, DbError> {
    let rows = match supplier_id {
        Some(supplier_id) => {
            sqlx::query_as::<_, SupplierItem>(
                r#"
                SELECT * FROM supplier_items
                WHERE match_status = 'unmatched' AND supplier_id = $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(supplier_id)
            .bind(limit)
            .fetch_all(db.pool())
            .await?
        }
        None => {
            sqlx::query_as::<_, SupplierItem>(
                r#"
                SELECT * FROM supplier_items
                WHERE match_status = 'unmatched'
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(db.pool())
            .await?
        }
    };
    Ok(rows)
}
