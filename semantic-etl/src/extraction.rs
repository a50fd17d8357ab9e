//! Typed records produced by LLM extraction.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use fuzzy_text::normalize_name;

/// Hard cap on product names after whitespace collapsing.
pub const MAX_NAME_LENGTH: usize = 500;

/// One product row extracted from a supplier file.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedProduct {
    /// Product name, whitespace-collapsed, 1..=500 chars.
    pub name: String,
    pub description: Option<String>,
    /// Retail/recommended price (required, ≥ 0, two decimals).
    pub price_rrc: Decimal,
    /// Wholesale price (optional, ≥ 0).
    pub price_opt: Option<Decimal>,
    /// Category hierarchy, root first, e.g. `["Electronics", "Laptops"]`.
    pub category_path: Vec<String>,
    pub brand: Option<String>,
    pub unit: Option<String>,
    /// Original row data kept for traceability.
    pub raw_data: Value,
}

impl ExtractedProduct {
    /// Within-file dedup key: the normalized name. Price participates via
    /// the tolerance rule, not the key itself.
    pub fn dedup_key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// A row-attributable extraction failure.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionError {
    pub chunk_id: Option<usize>,
    /// 1-indexed row in the source sheet, when known.
    pub row_number: Option<u32>,
    /// `validation` | `parsing` | `llm_error` | `timeout`.
    pub error_type: String,
    pub message: String,
    pub raw_data: Option<Value>,
}

/// Products and errors from a single Markdown chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkExtraction {
    pub chunk_id: usize,
    pub products: Vec<ExtractedProduct>,
    pub errors: Vec<ExtractionError>,
    pub processing_time_ms: u128,
}

/// Terminal quality classification of one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// 100% of rows extracted.
    Success,
    /// 80–99%.
    CompletedWithErrors,
    /// Below 80%.
    Failed,
}

/// Aggregated result for one sheet (or one whole file).
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub products: Vec<ExtractedProduct>,
    pub sheet_name: String,
    /// Rows processed, excluding the header.
    pub total_rows: u64,
    pub successful_extractions: u64,
    pub failed_extractions: u64,
    pub duplicates_removed: u64,
    pub extraction_errors: Vec<ExtractionError>,
}

impl ExtractionResult {
    /// Percentage of rows that produced a product, in [0, 100].
    pub fn success_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        (self.successful_extractions as f64 / self.total_rows as f64) * 100.0
    }

    /// Status mapping: 100% → success, ≥80% → completed_with_errors,
    /// otherwise failed. The orchestrator special-cases genuinely empty
    /// files before consulting this.
    pub fn status(&self) -> ExtractionStatus {
        let rate = self.success_rate();
        if rate >= 100.0 {
            ExtractionStatus::Success
        } else if rate >= 80.0 {
            ExtractionStatus::CompletedWithErrors
        } else {
            ExtractionStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(name: &str) -> ExtractedProduct {
        ExtractedProduct {
            name: name.into(),
            description: None,
            price_rrc: Decimal::new(10000, 2),
            price_opt: None,
            category_path: vec![],
            brand: None,
            unit: None,
            raw_data: Value::Null,
        }
    }

    #[test]
    fn dedup_key_is_the_normalized_name() {
        assert_eq!(product("  Mountain  BIKE X ").dedup_key(), "mountain bike x");
    }

    #[test]
    fn status_bands() {
        let mut result = ExtractionResult {
            total_rows: 100,
            successful_extractions: 100,
            ..Default::default()
        };
        assert_eq!(result.status(), ExtractionStatus::Success);

        result.successful_extractions = 85;
        assert_eq!(result.status(), ExtractionStatus::CompletedWithErrors);

        result.successful_extractions = 79;
        assert_eq!(result.status(), ExtractionStatus::Failed);
    }

    #[test]
    fn exactly_eighty_percent_is_completed_with_errors() {
        let result = ExtractionResult {
            total_rows: 10,
            successful_extractions: 8,
            ..Default::default()
        };
        assert_eq!(result.status(), ExtractionStatus::CompletedWithErrors);
    }

    #[test]
    fn zero_rows_reads_as_zero_rate() {
        let result = ExtractionResult::default();
        assert_eq!(result.success_rate(), 0.0);
    }
}
