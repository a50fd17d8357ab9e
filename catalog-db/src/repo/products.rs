//! Product rows and the aggregate recomputation SQL.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::DbError;
use crate::models::Product;
use crate::pool::Db;

/// Slim candidate row handed to the matcher.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductCandidate {
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
}

/// Result of one aggregate recomputation.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub product_id: Uuid,
    pub min_price: Option<Decimal>,
    pub availability: bool,
}

pub async fn get(db: &Db, id: Uuid) -> Result<Option<Product>, DbError> {
    let row = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(db.pool())
        .await?;
    Ok(row)
}

/// Candidate set for matching: non-archived products, optionally narrowed
/// to one category (the blocking strategy).
pub async fn list_candidates(
    db: &Db,
    category_id: Option<Uuid>,
) -> Result<Vec<ProductCandidate>, DbError> {
    let rows = match category_id {
        Some(category_id) => {
            sqlx::query_as::<_, ProductCandidate>(
                r#"
                SELECT id, name, category_id FROM products
                WHERE status <> 'archived' AND category_id = $1
                ORDER BY created_at
                "#,
            )
            .bind(category_id)
            .fetch_all(db.pool())
            .await?
        }
        None => {
            sqlx::query_as::<_, ProductCandidate>(
                r#"
                SELECT id, name, category_id FROM products
                WHERE status <> 'archived'
                ORDER BY created_at
                "#,
            )
            .fetch_all(db.pool())
            .await?
        }
    };
    Ok(rows)
}

pub async fn get_candidates_by_ids(
    db: &Db,
    ids: &[Uuid],
) -> Result<Vec<ProductCandidate>, DbError> {
    let rows = sqlx::query_as::<_, ProductCandidate>(
        "SELECT id, name, category_id FROM products WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Creates a draft product, typically after a rejected review when the
/// reviewer asks for a fresh canonical entry.
pub async fn create_draft(
    db: &Db,
    internal_sku: &str,
    name: &str,
    category_id: Option<Uuid>,
) -> Result<Product, DbError> {
    let row = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (internal_sku, name, category_id, status)
        VALUES ($1, $2, $3, 'draft')
        RETURNING *
        "#,
    )
    .bind(internal_sku)
    .bind(name)
    .bind(category_id)
    .fetch_one(db.pool())
    .await?;
    Ok(row)
}

/// Products that currently have at least one matched linked item; the
/// nightly sweep recomputes exactly this set.
pub async fn list_ids_with_linked_items(db: &Db) -> Result<Vec<Uuid>, DbError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT product_id FROM supplier_items
        WHERE product_id IS NOT NULL
          AND match_status IN ('auto_matched', 'verified_match')
        "#,
    )
    .fetch_all(db.pool())
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Recomputes `min_price` and `availability` for one product in a single
/// UPDATE with correlated sub-selects, so the write is atomic.
///
/// `min_price` is the minimum `current_price` over linked items with
/// `match_status ∈ {auto_matched, verified_match}`; `availability` ORs the
/// tolerant `in_stock` parse over the same set (JSON `true`, `"true"`,
/// `"yes"`, `"1"` case-insensitive).
pub async fn recompute_aggregates(db: &Db, product_id: Uuid) -> Result<AggregateResult, DbError> {
    let row: Option<(Option<Decimal>, bool)> = sqlx::query_as(
        r#"
        UPDATE products p SET
            min_price = (
                SELECT MIN(si.current_price)
                FROM supplier_items si
                WHERE si.product_id = p.id
                  AND si.match_status IN ('auto_matched', 'verified_match')
            ),
            availability = COALESCE((
                SELECT bool_or(
                    CASE
                        WHEN jsonb_typeof(si.characteristics -> 'in_stock') = 'boolean'
                            THEN (si.characteristics ->> 'in_stock')::boolean
                        ELSE lower(COALESCE(si.characteristics ->> 'in_stock', ''))
                            IN ('true', 'yes', '1')
                    END)
                FROM supplier_items si
                WHERE si.product_id = p.id
                  AND si.match_status IN ('auto_matched', 'verified_match')
            ), false),
            updated_at = now()
        WHERE p.id = $1
        RETURNING p.min_price, p.availability
        "#,
    )
    .bind(product_id)
    .fetch_optional(db.pool())
    .await?;

    let (min_price, availability) =
        row.ok_or_else(|| DbError::not_found("product", product_id))?;

    Ok(AggregateResult {
        product_id,
        min_price,
        availability,
    })
}
