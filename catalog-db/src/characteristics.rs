//! Tolerant accessors over the free-form `characteristics` JSONB column.
//!
//! Supplier files encode stock flags every way imaginable (`true`, `"Yes"`,
//! `"1"`, `"В наличии"`). Aggregation and matching must agree on one
//! parsing rule, so it lives here instead of being re-coerced at call
//! sites.

use serde_json::Value;

/// Read-only view over a characteristics map.
pub struct Characteristics<'a>(pub &'a Value);

impl<'a> Characteristics<'a> {
    /// Tolerant boolean: JSON `true`, or the strings `"true"`, `"yes"`,
    /// `"1"` (case-insensitive) count as `true`; anything else — including
    /// a missing key — is `false`.
    pub fn bool_tolerant(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => parse_bool_str(s),
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    /// String value, trimmed; `None` when missing, empty, or not a string.
    pub fn str_value(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) => {
                let s = s.trim();
                (!s.is_empty()).then_some(s)
            }
            _ => None,
        }
    }
}

/// The canonical truthy-string rule shared with the aggregation SQL.
pub fn parse_bool_str(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tolerant_bool_accepts_known_truthy_forms() {
        let v = json!({"a": true, "b": "TRUE", "c": "Yes", "d": "1", "e": 1});
        let c = Characteristics(&v);
        for key in ["a", "b", "c", "d", "e"] {
            assert!(c.bool_tolerant(key), "key {key}");
        }
    }

    #[test]
    fn everything_else_is_false() {
        let v = json!({"a": false, "b": "no", "c": "0", "d": null, "e": 2, "f": "в наличии"});
        let c = Characteristics(&v);
        for key in ["a", "b", "c", "d", "e", "f", "missing"] {
            assert!(!c.bool_tolerant(key), "key {key}");
        }
    }

    #[test]
    fn str_value_trims_and_drops_empty() {
        let v = json!({"brand": "  Bosch ", "empty": "   ", "num": 5});
        let c = Characteristics(&v);
        assert_eq!(c.str_value("brand"), Some("Bosch"));
        assert_eq!(c.str_value("empty"), None);
        assert_eq!(c.str_value("num"), None);
    }
}
