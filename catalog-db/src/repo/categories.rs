//! Category forest access. Creation is upsert-shaped so concurrent jobs
//! normalizing the same path converge on one row.

use uuid::Uuid;

use crate::errors::DbError;
use crate::models::Category;
use crate::pool::Db;

/// Loads the entire category forest in one round-trip; the normalizer
/// builds its in-memory cache from this.
pub async fn load_all(db: &Db) -> Result<Vec<Category>, DbError> {
    let rows = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE is_active ORDER BY created_at",
    )
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Creates a category under `parent_id`, flagged for review, recording the
/// supplier that introduced it. Conflicting concurrent creates return the
/// existing row.
pub async fn create_needs_review(
    db: &Db,
    name: &str,
    parent_id: Option<Uuid>,
    supplier_id: Option<Uuid>,
) -> Result<Category, DbError> {
    let row = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name, parent_id, needs_review, introduced_by_supplier_id)
        VALUES ($1, $2, true, $3)
        ON CONFLICT (name, parent_id) DO UPDATE SET name = EXCLUDED.name
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(parent_id)
    .bind(supplier_id)
    .fetch_one(db.pool())
    .await?;
    Ok(row)
}

/// Admin approval clears the governance flag.
pub async fn approve(db: &Db, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE categories SET needs_review = false WHERE id = $1")
        .bind(id)
        .execute(db.pool())
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("category", id));
    }
    Ok(())
}
