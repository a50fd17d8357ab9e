//! Composite product-name splitting.
//!
//! Some suppliers encode several fields in one cell:
//! `"Electric Bicycle | Shtenli Model Gt11 | Li-ion 48V 15Ah"` — category,
//! name, then specification segments. The first segment may itself be a
//! `/`- or `>`-separated hierarchy.

/// Parsed components of a composite product cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeName {
    /// Hierarchical category path, root first.
    pub category_path: Vec<String>,
    pub name: String,
    /// Remaining segments joined with spaces.
    pub description: Option<String>,
    /// Whether the delimiter was actually present.
    pub was_parsed: bool,
}

/// Splits a category string on `/` or `>` (first separator found wins),
/// trimming parts and dropping empties.
pub fn parse_category_hierarchy(category: &str) -> Vec<String> {
    let category = category.trim();
    if category.is_empty() {
        return Vec::new();
    }

    for separator in ['/', '>'] {
        if category.contains(separator) {
            return category
                .split(separator)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
    vec![category.to_string()]
}

/// Splits a pipe-delimited composite cell into category / name /
/// description. A cell without the delimiter becomes the name verbatim;
/// a cell that parses to nothing useful falls back the same way.
pub fn parse_composite_name(value: &str) -> CompositeName {
    let original = value.trim();
    if original.is_empty() {
        return CompositeName::default();
    }

    if !original.contains('|') {
        return CompositeName {
            name: original.to_string(),
            ..Default::default()
        };
    }

    let segments: Vec<&str> = original.split('|').map(str::trim).collect();

    let category_path = segments
        .first()
        .filter(|s| !s.is_empty())
        .map(|s| parse_category_hierarchy(s))
        .unwrap_or_default();

    let mut name = segments
        .get(1)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default();

    let description_parts: Vec<&str> = segments
        .iter()
        .skip(2)
        .copied()
        .filter(|s| !s.is_empty())
        .collect();
    let description = (!description_parts.is_empty()).then(|| description_parts.join(" "));

    // "Name only" cells like "Name | " keep the first non-empty segment.
    if name.is_empty() && category_path.is_empty() {
        if let Some(first) = segments.iter().find(|s| !s.is_empty()) {
            name = first.to_string();
        }
    }

    if name.is_empty() && category_path.is_empty() && description.is_none() {
        // "|||" and friends: fall back to the raw value as the name.
        return CompositeName {
            name: original.to_string(),
            ..Default::default()
        };
    }

    CompositeName {
        category_path,
        name,
        description,
        was_parsed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_composite_splits_into_three_parts() {
        let parsed =
            parse_composite_name("Electric Bicycle | Shtenli Model Gt11 | Li-ion 48V 15Ah");
        assert_eq!(parsed.category_path, vec!["Electric Bicycle"]);
        assert_eq!(parsed.name, "Shtenli Model Gt11");
        assert_eq!(parsed.description.as_deref(), Some("Li-ion 48V 15Ah"));
        assert!(parsed.was_parsed);
    }

    #[test]
    fn first_segment_may_be_hierarchical() {
        let parsed = parse_composite_name("Electronics/Bikes | Mountain Pro | 27.5 inch | Shimano");
        assert_eq!(parsed.category_path, vec!["Electronics", "Bikes"]);
        assert_eq!(parsed.name, "Mountain Pro");
        assert_eq!(parsed.description.as_deref(), Some("27.5 inch Shimano"));
    }

    #[test]
    fn plain_cell_is_just_a_name() {
        let parsed = parse_composite_name("Simple Product Name");
        assert_eq!(parsed.name, "Simple Product Name");
        assert!(!parsed.was_parsed);
        assert!(parsed.category_path.is_empty());
    }

    #[test]
    fn empty_first_segment_keeps_the_name() {
        let parsed = parse_composite_name(" | Name Only");
        assert!(parsed.category_path.is_empty());
        assert_eq!(parsed.name, "Name Only");
    }

    #[test]
    fn category_only_keeps_an_empty_name() {
        let parsed = parse_composite_name("Category Only | ");
        assert_eq!(parsed.category_path, vec!["Category Only"]);
        assert_eq!(parsed.name, "");
        assert!(parsed.was_parsed);
    }

    #[test]
    fn hierarchy_separators() {
        assert_eq!(
            parse_category_hierarchy("Electronics/Bikes/Adult"),
            vec!["Electronics", "Bikes", "Adult"]
        );
        assert_eq!(
            parse_category_hierarchy("Electronics > Bikes > Adult"),
            vec!["Electronics", "Bikes", "Adult"]
        );
        assert_eq!(parse_category_hierarchy("Simple"), vec!["Simple"]);
        assert_eq!(
            parse_category_hierarchy("  Spaced / Category  "),
            vec!["Spaced", "Category"]
        );
        assert!(parse_category_hierarchy("  ").is_empty());
    }
}
