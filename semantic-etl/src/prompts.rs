//! Prompt templates for extraction and sheet analysis.
//!
//! Kept in one place so prompt tweaks never touch pipeline logic. All
//! prompts demand a single JSON object; the callers still run the
//! fenced/prose fallback parser because small local models drift.

use sheet_render::{MarkdownChunk, SheetInfo};

/// Prompt for extracting products from one Markdown chunk.
pub fn extraction_prompt(chunk: &MarkdownChunk, sheet_name: &str) -> String {
    format!(
        r#"You are a data extraction engine for supplier price lists.

The table below is rows {start}..{end} of sheet "{sheet}" ({total} data rows in total).
Extract every product row into JSON. Respond with ONLY a JSON object of this shape:

{{
  "products": [
    {{
      "name": "product name (required)",
      "description": "specifications or null",
      "price_rrc": "retail price as written in the table (required)",
      "price_opt": "wholesale price or null",
      "category_path": ["root category", "subcategory"],
      "brand": "brand or null",
      "unit": "unit of measure or null"
    }}
  ],
  "parsing_notes": "short note about ambiguities, or null"
}}

Rules:
- One entry per product row. Skip header, separator, section and total rows.
- Keep prices exactly as written (currency symbols and separators included).
- category_path is ordered root-first; use [] when the table has no category column.
- Do not invent values; use null for anything missing.

Table:
{markdown}"#,
        start = chunk.start_row,
        end = chunk.end_row,
        sheet = sheet_name,
        total = chunk.total_rows,
        markdown = chunk.markdown,
    )
}

/// Prompt asking the model to choose product sheets among candidates.
pub fn sheet_analysis_prompt(sheets: &[SheetInfo]) -> String {
    let mut listing = String::new();
    for sheet in sheets {
        listing.push_str(&format!(
            "- \"{}\": {} rows, {} columns{}\n",
            sheet.name,
            sheet.row_count,
            sheet.col_count,
            if sheet.is_empty { ", empty" } else { "" }
        ));
    }

    format!(
        r#"A supplier workbook contains these sheets:

{listing}
Decide which sheets contain product price data and which are metadata
(instructions, settings, templates, summaries). Respond with ONLY JSON:

{{
  "selected_sheets": ["..."],
  "skipped_sheets": ["..."],
  "reasoning": "one short sentence"
}}

Every sheet name must appear in exactly one of the two lists."#
    )
}
