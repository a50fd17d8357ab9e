//! Append-only diagnostic log, bounded by the aged cleanup task.

use tracing::debug;

use crate::errors::DbError;
use crate::models::NewParsingLog;
use crate::pool::Db;

pub async fn insert(db: &Db, log: &NewParsingLog) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO parsing_logs
            (task_id, supplier_id, error_type, message, row_number, row_data)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&log.task_id)
    .bind(log.supplier_id)
    .bind(&log.error_type)
    .bind(&log.message)
    .bind(log.row_number)
    .bind(&log.row_data)
    .execute(db.pool())
    .await?;
    Ok(())
}

/// Deletes rows older than `days`; returns the number removed.
pub async fn cleanup_older_than(db: &Db, days: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM parsing_logs WHERE created_at < now() - make_interval(days => $1::int)",
    )
    .bind(days as i32)
    .execute(db.pool())
    .await?;

    let removed = result.rows_affected();
    debug!(removed, days, "parsing logs cleanup");
    Ok(removed)
}
