//! Structured LLM extraction over Markdown chunks.
//!
//! The model is asked for a JSON object (`{"products": [...]}`). Because
//! small local models routinely wrap JSON in code fences or prose and
//! localize field names, parsing is two-stage: strict `serde_json` first,
//! then a fallback that strips fences, locates the outermost JSON value,
//! and resolves synonym field names (`"название"` → name, `"цена"` →
//! price). The fallback is part of the contract, not a nicety.

use std::collections::HashSet;
use std::time::Instant;

use llm_service::LlmServiceProfiles;
use serde_json::{Map, Value, json};
use sheet_render::MarkdownChunk;
use tracing::{debug, info, warn};

use crate::extraction::{
    ChunkExtraction, ExtractedProduct, ExtractionError, ExtractionResult, MAX_NAME_LENGTH,
};
use crate::composite::{parse_category_hierarchy, parse_composite_name};
use crate::price::clean_price_amount;
use crate::prompts::extraction_prompt;

/// Retries per chunk on transient provider errors (attempts = retries + 1).
const MAX_CHUNK_RETRIES: usize = 2;

/// Synonym tables for LLM field names, localized headers included.
const NAME_KEYS: &[&str] = &["name", "product_name", "title", "название", "наименование"];
const DESCRIPTION_KEYS: &[&str] = &["description", "specs", "описание"];
const PRICE_RRC_KEYS: &[&str] = &["price_rrc", "price", "retail_price", "цена", "ррц"];
const PRICE_OPT_KEYS: &[&str] = &["price_opt", "wholesale_price", "опт", "цена_опт"];
const CATEGORY_KEYS: &[&str] = &["category_path", "category", "категория"];
const BRAND_KEYS: &[&str] = &["brand", "manufacturer", "бренд", "производитель"];
const UNIT_KEYS: &[&str] = &["unit", "measure", "ед", "единица"];

pub struct LlmExtractor<'a> {
    profiles: &'a LlmServiceProfiles,
}

impl<'a> LlmExtractor<'a> {
    pub fn new(profiles: &'a LlmServiceProfiles) -> Self {
        Self { profiles }
    }

    /// Extracts all chunks of one sheet and aggregates the result,
    /// deduplicating the chunk-overlap seams on (normalized name, price).
    pub async fn extract_sheet(
        &self,
        chunks: &[MarkdownChunk],
        sheet_name: &str,
    ) -> ExtractionResult {
        let total_rows = chunks.first().map(|c| c.total_rows as u64).unwrap_or(0);
        let mut result = ExtractionResult {
            sheet_name: sheet_name.to_string(),
            total_rows,
            ..Default::default()
        };

        let mut seen: HashSet<(String, String)> = HashSet::new();

        for chunk in chunks {
            let extraction = self.extract_chunk(chunk, sheet_name).await;

            result.failed_extractions += extraction
                .errors
                .iter()
                .filter(|e| e.error_type == "validation")
                .count() as u64;
            result.extraction_errors.extend(extraction.errors);

            for product in extraction.products {
                let key = (product.dedup_key(), product.price_rrc.to_string());
                if seen.insert(key) {
                    result.products.push(product);
                } else {
                    result.duplicates_removed += 1;
                }
            }
        }

        result.successful_extractions = result.products.len() as u64;

        info!(
            sheet = sheet_name,
            products = result.successful_extractions,
            failed = result.failed_extractions,
            overlap_duplicates = result.duplicates_removed,
            "sheet extraction complete"
        );
        result
    }

    /// One chunk: prompt, call with retries, parse, validate rows.
    ///
    /// A chunk that exhausts its retries reports a single `llm_error` and
    /// extraction continues with the next chunk.
    pub async fn extract_chunk(&self, chunk: &MarkdownChunk, sheet_name: &str) -> ChunkExtraction {
        let started = Instant::now();
        let prompt = extraction_prompt(chunk, sheet_name);

        let mut extraction = ChunkExtraction {
            chunk_id: chunk.chunk_id,
            ..Default::default()
        };

        let raw = {
            let mut attempt = 0usize;
            loop {
                match self.profiles.extract_json(&prompt).await {
                    Ok(raw) => break Some(raw),
                    Err(err) if err.is_transient() && attempt < MAX_CHUNK_RETRIES => {
                        attempt += 1;
                        warn!(
                            chunk_id = chunk.chunk_id,
                            attempt,
                            error = %err,
                            "transient LLM failure; retrying chunk"
                        );
                    }
                    Err(err) => {
                        extraction.errors.push(ExtractionError {
                            chunk_id: Some(chunk.chunk_id),
                            row_number: None,
                            error_type: "llm_error".into(),
                            message: err.to_string(),
                            raw_data: None,
                        });
                        break None;
                    }
                }
            }
        };

        if let Some(raw) = raw {
            match parse_llm_payload(&raw) {
                Some(rows) => {
                    for row in rows {
                        match validate_product(&row, chunk.chunk_id) {
                            Ok(product) => extraction.products.push(product),
                            Err(error) => extraction.errors.push(error),
                        }
                    }
                }
                None => {
                    extraction.errors.push(ExtractionError {
                        chunk_id: Some(chunk.chunk_id),
                        row_number: None,
                        error_type: "parsing".into(),
                        message: "no JSON payload found in completion".into(),
                        raw_data: Some(json!({ "completion": truncate(&raw, 500) })),
                    });
                }
            }
        }

        extraction.processing_time_ms = started.elapsed().as_millis();
        debug!(
            chunk_id = chunk.chunk_id,
            products = extraction.products.len(),
            errors = extraction.errors.len(),
            ms = extraction.processing_time_ms,
            "chunk extracted"
        );
        extraction
    }
}

/// Locates the products array inside a raw completion.
///
/// Accepts `{"products": [...]}` or a bare array, with or without code
/// fences and surrounding prose.
pub fn parse_llm_payload(raw: &str) -> Option<Vec<Value>> {
    let candidate = strip_code_fences(raw);

    let value: Value = serde_json::from_str(candidate.trim())
        .ok()
        .or_else(|| extract_outer_json(&candidate))?;

    match value {
        Value::Object(map) => match map.get("products") {
            Some(Value::Array(products)) => Some(products.clone()),
            _ => None,
        },
        Value::Array(products) => Some(products),
        _ => None,
    }
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }
    // Keep whatever sits between the first pair of fences.
    let mut parts = trimmed.splitn(3, "```");
    let _before = parts.next();
    let fenced = parts.next().unwrap_or_default();
    let fenced = fenced
        .trim_start_matches("json")
        .trim_start_matches("JSON")
        .trim();
    fenced.to_string()
}

/// Finds the outermost `{...}` or `[...]` in free text and parses it.
fn extract_outer_json(text: &str) -> Option<Value> {
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if end > start {
                if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Validates one raw row into an [`ExtractedProduct`].
pub fn validate_product(row: &Value, chunk_id: usize) -> Result<ExtractedProduct, ExtractionError> {
    let Some(map) = row.as_object() else {
        return Err(validation_error(chunk_id, "row is not an object", row));
    };

    let mut name = lookup_str(map, NAME_KEYS)
        .map(collapse_whitespace)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| validation_error(chunk_id, "missing required field: name", row))?;

    let mut description = lookup_str(map, DESCRIPTION_KEYS)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut category_path = lookup_value(map, CATEGORY_KEYS)
        .map(category_path_from_value)
        .unwrap_or_default();

    // Some suppliers pack "Category | Name | Specs" into the name cell;
    // unpack it when nothing else claims those fields.
    if name.contains('|') {
        let composite = parse_composite_name(&name);
        if composite.was_parsed && !composite.name.is_empty() {
            name = collapse_whitespace(&composite.name);
            if category_path.is_empty() {
                category_path = composite.category_path;
            }
            if description.is_none() {
                description = composite.description;
            }
        }
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(validation_error(
            chunk_id,
            "name longer than 500 characters",
            row,
        ));
    }

    let price_rrc = lookup_value(map, PRICE_RRC_KEYS)
        .and_then(price_from_value)
        .ok_or_else(|| validation_error(chunk_id, "missing or invalid price_rrc", row))?;

    let price_opt = lookup_value(map, PRICE_OPT_KEYS).and_then(price_from_value);

    Ok(ExtractedProduct {
        name,
        description,
        price_rrc,
        price_opt,
        category_path,
        brand: lookup_str(map, BRAND_KEYS)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        unit: lookup_str(map, UNIT_KEYS)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        raw_data: row.clone(),
    })
}

fn validation_error(chunk_id: usize, message: &str, row: &Value) -> ExtractionError {
    ExtractionError {
        chunk_id: Some(chunk_id),
        row_number: None,
        error_type: "validation".into(),
        message: message.to_string(),
        raw_data: Some(row.clone()),
    }
}

fn lookup_value<'v>(map: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    for key in keys {
        if let Some(value) = map.get(*key) {
            if !value.is_null() {
                return Some(value);
            }
        }
    }
    // Case-insensitive second pass for capitalized localized headers.
    for (k, value) in map {
        if keys.contains(&k.to_lowercase().as_str()) && !value.is_null() {
            return Some(value);
        }
    }
    None
}

fn lookup_str<'v>(map: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v str> {
    lookup_value(map, keys).and_then(Value::as_str)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prices arrive as strings ("1 234,56 руб.") or plain numbers; both are
/// routed through the cleaner so the rules stay identical.
fn price_from_value(value: &Value) -> Option<rust_decimal::Decimal> {
    match value {
        Value::String(s) => clean_price_amount(s),
        Value::Number(n) => clean_price_amount(&n.to_string()),
        _ => None,
    }
}

fn category_path_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => parse_category_hierarchy(s),
        _ => Vec::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_object_payload() {
        let rows = parse_llm_payload(r#"{"products": [{"name": "A", "price_rrc": "10"}]}"#)
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn bare_array_payload() {
        let rows = parse_llm_payload(r#"[{"name": "A", "price_rrc": "10"}]"#).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn fenced_payload_with_prose() {
        let raw = "Here is the extraction:\n```json\n{\"products\": [{\"name\": \"A\", \"price_rrc\": 10}]}\n```\nDone.";
        let rows = parse_llm_payload(raw).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn leading_and_trailing_prose_without_fences() {
        let raw = "Sure! {\"products\": [{\"name\": \"A\", \"price_rrc\": \"10\"}]} hope that helps";
        let rows = parse_llm_payload(raw).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn garbage_payload_is_none() {
        assert!(parse_llm_payload("no json here").is_none());
        assert!(parse_llm_payload(r#"{"items": []}"#).is_none());
    }

    #[test]
    fn validates_a_complete_row() {
        let row = serde_json::json!({
            "name": "  Mountain   Bike X ",
            "description": "29 inch",
            "price_rrc": "1 234,56",
            "price_opt": "1000",
            "category_path": "Electronics/Bikes",
            "brand": "Shtenli",
        });
        let product = validate_product(&row, 0).unwrap();
        assert_eq!(product.name, "Mountain Bike X");
        assert_eq!(product.price_rrc, "1234.56".parse().unwrap());
        assert_eq!(product.price_opt, Some("1000".parse().unwrap()));
        assert_eq!(product.category_path, vec!["Electronics", "Bikes"]);
        assert_eq!(product.brand.as_deref(), Some("Shtenli"));
    }

    #[test]
    fn synonym_field_names_resolve() {
        let row = serde_json::json!({
            "название": "Велосипед",
            "цена": "1500 руб",
        });
        let product = validate_product(&row, 0).unwrap();
        assert_eq!(product.name, "Велосипед");
        assert_eq!(product.price_rrc, "1500".parse().unwrap());
    }

    #[test]
    fn composite_name_cell_is_unpacked() {
        let row = serde_json::json!({
            "name": "Electric Bicycle | Shtenli Model Gt11 | Li-ion 48V 15Ah",
            "price_rrc": "2500",
        });
        let product = validate_product(&row, 0).unwrap();
        assert_eq!(product.name, "Shtenli Model Gt11");
        assert_eq!(product.category_path, vec!["Electric Bicycle"]);
        assert_eq!(product.description.as_deref(), Some("Li-ion 48V 15Ah"));
    }

    #[test]
    fn missing_name_is_a_validation_error() {
        let row = serde_json::json!({"price_rrc": "10"});
        let err = validate_product(&row, 3).unwrap_err();
        assert_eq!(err.error_type, "validation");
        assert_eq!(err.chunk_id, Some(3));
    }

    #[test]
    fn invalid_price_is_a_validation_error() {
        let row = serde_json::json!({"name": "A", "price_rrc": "call us"});
        let err = validate_product(&row, 0).unwrap_err();
        assert!(err.message.contains("price_rrc"));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let row = serde_json::json!({"name": "x".repeat(501), "price_rrc": "10"});
        assert!(validate_product(&row, 0).is_err());
    }

    #[test]
    fn numeric_price_works() {
        let row = serde_json::json!({"name": "A", "price_rrc": 99.99});
        let product = validate_product(&row, 0).unwrap();
        assert_eq!(product.price_rrc, "99.99".parse().unwrap());
    }

    #[test]
    fn category_array_is_cleaned() {
        let row = serde_json::json!({
            "name": "A",
            "price_rrc": 1,
            "category_path": [" Electronics ", "", "Bikes"],
        });
        let product = validate_product(&row, 0).unwrap();
        assert_eq!(product.category_path, vec!["Electronics", "Bikes"]);
    }
}
