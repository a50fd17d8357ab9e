//! Error types used across the persistence layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
