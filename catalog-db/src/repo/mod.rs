//! Per-table repositories. SQL stays here; policy lives upstream.

pub mod categories;
pub mod parsing_logs;
pub mod products;
pub mod review_queue;
pub mod supplier_items;
pub mod suppliers;
