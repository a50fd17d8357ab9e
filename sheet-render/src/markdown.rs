//! Markdown-table rendering of a [`SheetGrid`].
//!
//! The first non-empty row becomes the header; every other row is emitted
//! as a body row. Cells are normalized so the table survives an LLM prompt:
//! embedded pipes are escaped, long cells truncated, numbers printed in
//! natural form.

use crate::workbook::{CellValue, SheetGrid};

/// Rendering knobs. Defaults match what the extraction prompt expects.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Cells longer than this are truncated with a trailing `...`.
    pub max_column_width: usize,
    /// Rows whose cells are all empty are dropped.
    pub skip_empty_rows: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            max_column_width: 50,
            skip_empty_rows: true,
        }
    }
}

/// Renders a sheet as one Markdown table (`| h1 | h2 |` + separator + body).
///
/// Ragged rows are padded to the widest row so the output is rectangular.
/// An empty sheet renders to an empty string.
pub fn render_markdown(grid: &SheetGrid, opts: &MarkdownOptions) -> String {
    let width = grid.col_count();
    if width == 0 {
        return String::new();
    }

    let mut rows = grid
        .rows
        .iter()
        .filter(|row| !opts.skip_empty_rows || row.iter().any(|c| !c.is_empty()))
        .map(|row| {
            let mut cells: Vec<String> = row
                .iter()
                .map(|c| format_cell(c, opts.max_column_width))
                .collect();
            cells.resize(width, String::new());
            cells
        });

    let Some(header) = rows.next() else {
        return String::new();
    };

    let mut out = String::new();
    push_row(&mut out, &header);
    push_row(&mut out, &vec!["---".to_string(); width]);
    for row in rows {
        push_row(&mut out, &row);
    }
    out
}

fn push_row(out: &mut String, cells: &[String]) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(cell);
        out.push_str(" |");
    }
    out.push('\n');
}

/// Formats one cell:
/// - `Empty` → empty string
/// - booleans preserved as `true`/`false`
/// - floats emitted in natural form (`100.5`, `100` for whole values)
/// - `|` escaped as `\|`, newlines collapsed to spaces
/// - longer than `max_width` → truncated with trailing `...`
pub fn format_cell(value: &CellValue, max_width: usize) -> String {
    let raw = match value {
        CellValue::Empty => return String::new(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => s.trim().to_string(),
    };

    let flat = raw
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|");

    if flat.chars().count() > max_width {
        let keep = max_width.saturating_sub(3);
        let mut truncated: String = flat.chars().take(keep).collect();
        truncated.push_str("...");
        truncated
    } else {
        flat
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn grid(rows: Vec<Vec<CellValue>>) -> SheetGrid {
        SheetGrid {
            name: "Products".into(),
            rows,
        }
    }

    #[test]
    fn renders_header_separator_and_body() {
        let g = grid(vec![
            vec![text("Name"), text("Price")],
            vec![text("Bike"), CellValue::Number(1000.0)],
        ]);
        let md = render_markdown(&g, &MarkdownOptions::default());
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| Name | Price |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| Bike | 1000 |");
    }

    #[test]
    fn pads_ragged_rows() {
        let g = grid(vec![
            vec![text("Name"), text("Price"), text("Stock")],
            vec![text("Bike")],
        ]);
        let md = render_markdown(&g, &MarkdownOptions::default());
        assert!(md.lines().nth(2).unwrap().matches('|').count() == 4);
    }

    #[test]
    fn skips_fully_empty_rows() {
        let g = grid(vec![
            vec![text("Name")],
            vec![CellValue::Empty],
            vec![text("Bike")],
        ]);
        let md = render_markdown(&g, &MarkdownOptions::default());
        assert_eq!(md.lines().count(), 3);
    }

    #[test]
    fn escapes_pipes_and_collapses_newlines() {
        let out = format_cell(&text("a|b\nc"), 50);
        assert_eq!(out, "a\\|b c");
    }

    #[test]
    fn truncates_long_cells_with_ellipsis() {
        let long = "x".repeat(60);
        let out = format_cell(&text(&long), 50);
        assert_eq!(out.chars().count(), 50);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn bools_and_floats_render_naturally() {
        assert_eq!(format_cell(&CellValue::Bool(true), 50), "true");
        assert_eq!(format_cell(&CellValue::Number(100.5), 50), "100.5");
        assert_eq!(format_cell(&CellValue::Number(100.0), 50), "100");
        assert_eq!(format_cell(&CellValue::Empty, 50), "");
    }

    #[test]
    fn empty_sheet_renders_empty() {
        let g = grid(vec![]);
        assert_eq!(render_markdown(&g, &MarkdownOptions::default()), "");
    }
}
