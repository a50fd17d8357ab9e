//! Persistence layer for the supplier catalogue.
//!
//! Owns the relational schema (migrations under `migrations/`), the
//! connection pool, typed row models, and per-table repositories. All SQL
//! lives here; policy (matching thresholds, phase machines) lives in the
//! crates above.
//!
//! Invariants enforced by the schema rather than code:
//! - `(supplier_id, supplier_sku)`, `(supplier_item_id, model_name)`,
//!   `(supplier_item_id)` on the review queue, `(name, parent_id)` on
//!   categories — coordination happens through idempotent upserts.
//! - prices and match scores are range-checked.

pub mod characteristics;
pub mod errors;
pub mod models;
pub mod pool;
pub mod repo;

pub use characteristics::Characteristics;
pub use errors::DbError;
pub use models::*;
pub use pool::{Db, DbConfig};
