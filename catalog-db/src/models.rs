//! Typed row models and enums mirroring the relational schema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of a canonical product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "product_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

/// Match state of a supplier item.
///
/// Transitions: `unmatched → auto_matched` (score ≥ auto threshold),
/// `unmatched → potential_match` (review band), review approval promotes
/// to `verified_match`. Verified items are never re-scored automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Unmatched,
    AutoMatched,
    PotentialMatch,
    VerifiedMatch,
}

/// State of a review-queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    NeedsCategory,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub source_type: String,
    pub supplier_metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub needs_review: bool,
    pub introduced_by_supplier_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub internal_sku: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub status: ProductStatus,
    pub min_price: Option<Decimal>,
    pub availability: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierItem {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub product_id: Option<Uuid>,
    pub supplier_sku: String,
    pub name: String,
    pub current_price: Decimal,
    pub characteristics: Value,
    pub match_status: MatchStatus,
    pub match_score: Option<Decimal>,
    pub match_candidates: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewEntry {
    pub id: Uuid,
    pub supplier_item_id: Uuid,
    pub candidate_products: Value,
    pub status: ReviewStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Structured diagnostic row appended by every pipeline stage.
///
/// `error_type` carries both failure classes (`validation`, `parsing`,
/// `embedding`, `matching`, `database`, `network`, `unknown`) and plain
/// levels (`INFO`, `WARNING`, `ERROR`); there is no separate severity
/// column.
#[derive(Debug, Clone, Serialize)]
pub struct NewParsingLog {
    pub task_id: String,
    pub supplier_id: Option<Uuid>,
    pub error_type: String,
    pub message: String,
    pub row_number: Option<i32>,
    pub row_data: Value,
}
