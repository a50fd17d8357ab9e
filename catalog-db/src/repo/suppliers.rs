//! Supplier rows. Created by onboarding, never mutated by ingestion.

use serde_json::Value;
use uuid::Uuid;

use crate::errors::DbError;
use crate::models::Supplier;
use crate::pool::Db;

pub async fn get(db: &Db, id: Uuid) -> Result<Option<Supplier>, DbError> {
    let row = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
        .bind(id)
        .fetch_optional(db.pool())
        .await?;
    Ok(row)
}

/// All registered suppliers in onboarding order; the master sync walks this.
pub async fn list_all(db: &Db) -> Result<Vec<Supplier>, DbError> {
    let rows = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY created_at")
        .fetch_all(db.pool())
        .await?;
    Ok(rows)
}

pub async fn create(
    db: &Db,
    name: &str,
    source_type: &str,
    metadata: Value,
) -> Result<Supplier, DbError> {
    let row = sqlx::query_as::<_, Supplier>(
        r#"
        INSERT INTO suppliers (name, source_type, supplier_metadata)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(source_type)
    .bind(metadata)
    .fetch_one(db.pool())
    .await?;
    Ok(row)
}
