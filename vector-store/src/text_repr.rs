//! Text representation of a supplier item for the embedding model.
//!
//! Fields are concatenated in semantic order — name, description, brand,
//! category, SKU, remaining characteristics — separated by `" | "`, then
//! truncated at a word boundary to the model's input budget.

use serde_json::Value;

/// Field separator between parts of the representation.
const SEPARATOR: &str = " | ";
/// Input budget of the embedding model (nomic-embed-text class).
pub const MAX_TEXT_LENGTH: usize = 8192;

/// Borrowed view over the fields that feed the representation.
#[derive(Debug, Clone, Default)]
pub struct ItemText<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub category: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub characteristics: Option<&'a Value>,
}

/// Builds the embedding text for one item. Returns an empty string when
/// nothing usable is present (the embedder treats that as an error).
pub fn build_item_text(item: &ItemText<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    let name = item.name.trim();
    if !name.is_empty() {
        parts.push(name.to_string());
    }
    for field in [item.description, item.brand, item.category] {
        if let Some(value) = field {
            let value = value.trim();
            if !value.is_empty() {
                parts.push(value.to_string());
            }
        }
    }
    if let Some(sku) = item.sku {
        let sku = sku.trim();
        if !sku.is_empty() {
            parts.push(format!("SKU: {sku}"));
        }
    }
    if let Some(characteristics) = item.characteristics {
        let formatted = format_characteristics(characteristics);
        if !formatted.is_empty() {
            parts.push(formatted);
        }
    }

    truncate_on_word_boundary(parts.join(SEPARATOR), MAX_TEXT_LENGTH)
}

/// Formats characteristics as `"key: value, key: value"`, skipping
/// internal keys (leading `_`), nulls, and blank values.
fn format_characteristics(characteristics: &Value) -> String {
    let Some(map) = characteristics.as_object() else {
        return String::new();
    };

    let mut pairs: Vec<String> = Vec::new();
    for (key, value) in map {
        if key.starts_with('_') || value.is_null() {
            continue;
        }
        let rendered = match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        if rendered.is_empty() {
            continue;
        }
        pairs.push(format!("{key}: {rendered}"));
    }
    pairs.join(", ")
}

fn truncate_on_word_boundary(text: String, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text;
    }

    let budget = max_length.saturating_sub(3);
    let hard_cut: String = text.chars().take(budget).collect();
    let cut = hard_cut.rfind(' ').unwrap_or(budget.min(hard_cut.len()));
    let mut truncated = hard_cut[..cut].trim_end().to_string();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_fields_in_semantic_order() {
        let characteristics = json!({"color": "red", "_source_type": "excel", "unit": "pcs"});
        let text = build_item_text(&ItemText {
            name: "AA Battery",
            description: Some("long life"),
            brand: Some("Duracell"),
            category: Some("Batteries"),
            sku: Some("DUR-AA-4"),
            characteristics: Some(&characteristics),
        });
        assert!(text.starts_with("AA Battery | long life | Duracell | Batteries | SKU: DUR-AA-4 | "));
        assert!(text.contains("color: red"));
        assert!(text.contains("unit: pcs"));
        assert!(!text.contains("_source_type"));
    }

    #[test]
    fn blank_fields_are_skipped() {
        let text = build_item_text(&ItemText {
            name: "Bike",
            description: Some("   "),
            brand: None,
            category: None,
            sku: None,
            characteristics: None,
        });
        assert_eq!(text, "Bike");
    }

    #[test]
    fn empty_item_yields_empty_text() {
        let text = build_item_text(&ItemText {
            name: "  ",
            ..Default::default()
        });
        assert!(text.is_empty());
    }

    #[test]
    fn long_text_truncates_on_a_word_boundary() {
        let description = "word ".repeat(3000);
        let text = build_item_text(&ItemText {
            name: "Product",
            description: Some(&description),
            ..Default::default()
        });
        assert!(text.chars().count() <= MAX_TEXT_LENGTH);
        assert!(text.ends_with("..."));
        assert!(!text.trim_end_matches("...").ends_with("wor"));
    }
}
