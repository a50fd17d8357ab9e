//! Sheet selection for multi-sheet workbooks.
//!
//! Strategy, in order:
//! 1. **Priority pass** — an exact (case-insensitive) hit on the priority
//!    name list selects that single sheet, exclusively.
//! 2. **Heuristics** — drop empty/small sheets and known metadata names;
//!    keep sheets with product keywords or substantial data.
//! 3. **LLM pass** — only for ambiguous multi-candidate cases, and only
//!    when the caller asked for it; any model failure falls back to the
//!    heuristic result.

use std::sync::Arc;

use llm_service::LlmServiceProfiles;
use serde::Deserialize;
use sheet_render::SheetInfo;
use tracing::{debug, info, warn};

use crate::prompts::sheet_analysis_prompt;

/// Priority names: if one of these exists, process it exclusively.
/// Earlier entries win.
const PRIORITY_SHEET_NAMES: &[&str] = &[
    "upload to site",
    "загрузка на сайт",
    "products",
    "товары",
    "catalog",
    "каталог",
    "export",
    "экспорт",
    "price list",
    "прайс-лист",
    "прайс",
];

/// Metadata sheets skipped on exact match.
const SKIP_SHEET_NAMES: &[&str] = &[
    "instructions",
    "инструкции",
    "settings",
    "настройки",
    "config",
    "configuration",
    "конфигурация",
    "template",
    "шаблон",
    "example",
    "пример",
    "readme",
    "info",
    "help",
    "справка",
    "about",
    "notes",
    "заметки",
    "summary",
    "итого",
    "totals",
    "sheet1",
    "лист1",
];

/// Substring patterns that mark a sheet as metadata.
const SKIP_PATTERNS: &[&str] = &["readme", "info", "help", "note", "config", "setting"];

/// Keywords suggesting product data in a sheet name.
const PRODUCT_KEYWORDS: &[&str] = &[
    "product",
    "товар",
    "item",
    "артикул",
    "sku",
    "price",
    "цена",
    "catalog",
    "каталог",
    "stock",
    "склад",
    "inventory",
];

/// Sheets with at least this many rows count as "substantial" even
/// without a product keyword in the name.
const SUBSTANTIAL_ROWS: usize = 10;

/// Result of the selection process. `selected` and `skipped` always
/// partition the input names.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub selected_sheets: Vec<String>,
    pub skipped_sheets: Vec<String>,
    pub reasoning: String,
    pub used_llm: bool,
    pub priority_sheet_found: bool,
}

#[derive(Debug, Deserialize)]
struct SheetAnalysisResponse {
    #[serde(default)]
    selected_sheets: Vec<String>,
    #[serde(default)]
    skipped_sheets: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

pub struct SheetSelector {
    profiles: Option<Arc<LlmServiceProfiles>>,
    min_rows: usize,
}

impl SheetSelector {
    /// `profiles = None` disables the LLM pass entirely.
    pub fn new(profiles: Option<Arc<LlmServiceProfiles>>) -> Self {
        Self {
            profiles,
            min_rows: 2,
        }
    }

    /// Selects which sheets to process. `use_llm` additionally gates the
    /// model call; priority and single-candidate cases never reach it.
    pub async fn select(&self, sheets: &[SheetInfo], use_llm: bool) -> SelectionResult {
        if sheets.is_empty() {
            return SelectionResult {
                reasoning: "No sheets in file".into(),
                ..Default::default()
            };
        }

        debug!(count = sheets.len(), "analyzing sheets for selection");

        if let Some(priority) = self.find_priority_sheet(sheets) {
            info!(selected = ?priority.selected_sheets, "priority sheet found");
            return priority;
        }

        let (candidates, skipped) = self.filter_by_heuristics(sheets);

        if candidates.len() <= 1 || !use_llm {
            let result = SelectionResult {
                selected_sheets: candidates.iter().map(|s| s.name.clone()).collect(),
                skipped_sheets: skipped.iter().map(|s| s.name.clone()).collect(),
                reasoning: "Selected based on heuristic rules".into(),
                used_llm: false,
                priority_sheet_found: false,
            };
            info!(selected = result.selected_sheets.len(), "sheets selected via heuristics");
            return result;
        }

        match &self.profiles {
            Some(profiles) => {
                self.select_with_llm(profiles, sheets, &candidates, &skipped)
                    .await
            }
            None => SelectionResult {
                selected_sheets: candidates.iter().map(|s| s.name.clone()).collect(),
                skipped_sheets: skipped.iter().map(|s| s.name.clone()).collect(),
                reasoning: "Multiple candidate sheets found; processing all".into(),
                used_llm: false,
                priority_sheet_found: false,
            },
        }
    }

    /// Priority check: exact normalized match, list order wins over sheet
    /// order, result is exclusive.
    fn find_priority_sheet(&self, sheets: &[SheetInfo]) -> Option<SelectionResult> {
        for priority_name in PRIORITY_SHEET_NAMES {
            if let Some(hit) = sheets.iter().find(|s| normalize(&s.name) == *priority_name) {
                let skipped = sheets
                    .iter()
                    .filter(|s| s.name != hit.name)
                    .map(|s| s.name.clone())
                    .collect();
                return Some(SelectionResult {
                    selected_sheets: vec![hit.name.clone()],
                    skipped_sheets: skipped,
                    reasoning: format!(
                        "Priority sheet '{}' found - processing exclusively",
                        hit.name
                    ),
                    used_llm: false,
                    priority_sheet_found: true,
                });
            }
        }
        None
    }

    fn filter_by_heuristics<'a>(
        &self,
        sheets: &'a [SheetInfo],
    ) -> (Vec<&'a SheetInfo>, Vec<&'a SheetInfo>) {
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();

        for sheet in sheets {
            let name = normalize(&sheet.name);

            if sheet.is_empty || sheet.row_count < self.min_rows {
                debug!(sheet = %sheet.name, "skipping empty/small sheet");
                skipped.push(sheet);
                continue;
            }
            if is_metadata_sheet(&name) {
                debug!(sheet = %sheet.name, "skipping metadata sheet");
                skipped.push(sheet);
                continue;
            }
            if has_product_keywords(&name) || sheet.row_count >= SUBSTANTIAL_ROWS {
                candidates.push(sheet);
            } else {
                skipped.push(sheet);
            }
        }

        (candidates, skipped)
    }

    async fn select_with_llm(
        &self,
        profiles: &LlmServiceProfiles,
        sheets: &[SheetInfo],
        candidates: &[&SheetInfo],
        skipped: &[&SheetInfo],
    ) -> SelectionResult {
        let heuristic = SelectionResult {
            selected_sheets: candidates.iter().map(|s| s.name.clone()).collect(),
            skipped_sheets: skipped.iter().map(|s| s.name.clone()).collect(),
            reasoning: "Selected based on heuristic rules".into(),
            used_llm: false,
            priority_sheet_found: false,
        };

        let prompt = sheet_analysis_prompt(sheets);
        let raw = match profiles.rerank_json(&prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "LLM sheet selection failed; using heuristics");
                return SelectionResult {
                    reasoning: format!("LLM analysis failed ({err}), using heuristics"),
                    ..heuristic
                };
            }
        };

        match parse_analysis(&raw) {
            Some(response) => {
                let mut result = SelectionResult {
                    selected_sheets: response.selected_sheets,
                    skipped_sheets: response.skipped_sheets,
                    reasoning: response.reasoning,
                    used_llm: true,
                    priority_sheet_found: false,
                };
                repartition(&mut result, sheets);
                info!(selected = result.selected_sheets.len(), "sheets selected via LLM");
                result
            }
            None => {
                warn!("could not parse LLM sheet analysis; using heuristics");
                SelectionResult {
                    reasoning: "LLM response unparsable, using heuristics".into(),
                    ..heuristic
                }
            }
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn is_metadata_sheet(normalized: &str) -> bool {
    SKIP_SHEET_NAMES.contains(&normalized)
        || SKIP_PATTERNS.iter().any(|p| normalized.contains(p))
}

fn has_product_keywords(normalized: &str) -> bool {
    PRODUCT_KEYWORDS.iter().any(|k| normalized.contains(k))
}

fn parse_analysis(raw: &str) -> Option<SheetAnalysisResponse> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Forces the LLM answer into a partition of the input: names it ignored
/// are skipped, names it invented are dropped.
fn repartition(result: &mut SelectionResult, sheets: &[SheetInfo]) {
    let known: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    result.selected_sheets.retain(|n| known.contains(&n.as_str()));
    result.skipped_sheets.retain(|n| {
        known.contains(&n.as_str()) && !result.selected_sheets.contains(n)
    });
    for sheet in sheets {
        if !result.selected_sheets.contains(&sheet.name)
            && !result.skipped_sheets.contains(&sheet.name)
        {
            result.skipped_sheets.push(sheet.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, rows: usize) -> SheetInfo {
        SheetInfo {
            name: name.into(),
            row_count: rows,
            col_count: 3,
            is_empty: rows == 0,
        }
    }

    fn select(sheets: &[SheetInfo]) -> SelectionResult {
        let selector = SheetSelector::new(None);
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(selector.select(sheets, false))
    }

    #[test]
    fn priority_sheet_wins_exclusively() {
        let sheets = vec![
            sheet("Instructions", 20),
            sheet("Products", 100),
            sheet("Pricing", 50),
            sheet("Config", 5),
            sheet("Upload to site", 80),
        ];
        let result = select(&sheets);
        assert!(result.priority_sheet_found);
        assert_eq!(result.selected_sheets, vec!["Upload to site"]);
        assert_eq!(result.skipped_sheets.len(), 4);
        assert!(!result.used_llm);
    }

    #[test]
    fn priority_list_order_beats_sheet_order() {
        // "Catalog" appears first in the workbook but "Products" ranks
        // higher in the priority list.
        let sheets = vec![sheet("Catalog", 30), sheet("Products", 30)];
        let result = select(&sheets);
        assert_eq!(result.selected_sheets, vec!["Products"]);
    }

    #[test]
    fn priority_match_is_case_insensitive() {
        let sheets = vec![sheet("  PRICE LIST ", 30), sheet("Other Data", 30)];
        let result = select(&sheets);
        assert!(result.priority_sheet_found);
        assert_eq!(result.selected_sheets, vec!["  PRICE LIST "]);
    }

    #[test]
    fn heuristics_drop_empty_small_and_metadata() {
        let sheets = vec![
            sheet("Empty", 0),
            sheet("Tiny", 1),
            sheet("readme first", 40),
            sheet("Spring assortment", 40),
        ];
        let result = select(&sheets);
        assert_eq!(result.selected_sheets, vec!["Spring assortment"]);
        assert_eq!(result.skipped_sheets.len(), 3);
    }

    #[test]
    fn keyword_sheets_survive_even_when_small() {
        let sheets = vec![sheet("цена опт", 4), sheet("misc", 4)];
        let result = select(&sheets);
        assert_eq!(result.selected_sheets, vec!["цена опт"]);
        assert_eq!(result.skipped_sheets, vec!["misc"]);
    }

    #[test]
    fn output_partitions_the_input() {
        let sheets = vec![
            sheet("Data A", 30),
            sheet("Data B", 30),
            sheet("help", 30),
        ];
        let result = select(&sheets);
        let mut all: Vec<String> = result
            .selected_sheets
            .iter()
            .chain(result.skipped_sheets.iter())
            .cloned()
            .collect();
        all.sort();
        let mut input: Vec<String> = sheets.iter().map(|s| s.name.clone()).collect();
        input.sort();
        assert_eq!(all, input);
    }

    #[test]
    fn no_sheets_yields_empty_result() {
        let result = select(&[]);
        assert!(result.selected_sheets.is_empty());
        assert_eq!(result.reasoning, "No sheets in file");
    }

    #[test]
    fn repartition_fixes_hallucinated_names() {
        let sheets = vec![sheet("A", 30), sheet("B", 30), sheet("C", 30)];
        let mut result = SelectionResult {
            selected_sheets: vec!["A".into(), "Ghost".into()],
            skipped_sheets: vec!["B".into()],
            ..Default::default()
        };
        repartition(&mut result, &sheets);
        assert_eq!(result.selected_sheets, vec!["A"]);
        assert_eq!(result.skipped_sheets, vec!["B", "C"]);
    }
}
