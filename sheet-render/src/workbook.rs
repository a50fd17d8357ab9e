//! Workbook loading: calamine for spreadsheets, the csv crate for CSV.
//!
//! All formats converge on [`SheetGrid`] — a named rectangular grid of
//! [`CellValue`]s with merged regions already filled down. A CSV file
//! becomes a single-sheet workbook named after the file stem.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, Xlsx, open_workbook, open_workbook_auto};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::RenderError;

/// One cell after type normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Text(format!("{e:?}")),
        }
    }
}

/// A named sheet as a row-major grid. Rows may be ragged at this level;
/// the Markdown renderer pads to the widest row.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetGrid {
    /// Number of columns in the widest row.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// True when every cell of every row is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(CellValue::is_empty))
    }

    /// Introspection record consumed by the sheet selector.
    pub fn info(&self) -> SheetInfo {
        SheetInfo {
            name: self.name.clone(),
            row_count: self.rows.len(),
            col_count: self.col_count(),
            is_empty: self.is_empty(),
        }
    }
}

/// Per-sheet metadata used for sheet selection.
#[derive(Debug, Clone, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub row_count: usize,
    pub col_count: usize,
    pub is_empty: bool,
}

/// A loaded price-list file: one or more sheets, fill-down applied.
#[derive(Debug)]
pub struct Workbook {
    pub sheets: Vec<SheetGrid>,
}

impl Workbook {
    /// Opens a file, dispatching on the extension.
    ///
    /// # Errors
    /// - missing file → [`RenderError::FileMissing`]
    /// - `.pdf` or unknown extension → [`RenderError::UnsupportedFormat`]
    /// - corrupt workbook → [`RenderError::Workbook`]
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        if !path.exists() {
            return Err(RenderError::FileMissing(path.to_path_buf()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Self::open_csv(path),
            "xlsx" | "xlsm" => Self::open_xlsx(path),
            "xls" | "ods" => Self::open_spreadsheet_auto(path),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Returns one sheet by name, or fails with [`RenderError::SheetNotFound`].
    pub fn sheet<'a>(&'a self, path: &Path, name: &str) -> Result<&'a SheetGrid, RenderError> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RenderError::SheetNotFound {
                file: path.to_path_buf(),
                sheet: name.to_string(),
            })
    }

    /// Introspection for every sheet, in workbook order.
    pub fn sheet_infos(&self) -> Vec<SheetInfo> {
        self.sheets.iter().map(SheetGrid::info).collect()
    }

    /// xlsx/xlsm path: merged regions are available and honored.
    fn open_xlsx(path: &Path) -> Result<Self, RenderError> {
        let mut workbook =
            open_workbook::<Xlsx<BufReader<File>>, _>(path)
                .map_err(|e| RenderError::Workbook(e.to_string()))?;

        if let Err(e) = workbook.load_merged_regions() {
            // Fill-down degrades gracefully: the table is still usable.
            warn!(file = %path.display(), error = %e, "failed to load merged regions");
        }

        let names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| RenderError::Workbook(e.to_string()))?;

            let regions: Vec<MergedRegion> = workbook
                .merged_regions()
                .iter()
                .filter(|(sheet, _, _)| sheet == &name)
                .map(|(_, _, dims)| MergedRegion {
                    start: dims.start,
                    end: dims.end,
                })
                .collect();

            sheets.push(grid_from_range(&name, &range, &regions));
        }

        debug!(file = %path.display(), sheets = sheets.len(), "xlsx workbook loaded");
        Ok(Self { sheets })
    }

    /// xls/ods path: no merged-region metadata, plain conversion.
    fn open_spreadsheet_auto(path: &Path) -> Result<Self, RenderError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| RenderError::Workbook(e.to_string()))?;

        let names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| RenderError::Workbook(e.to_string()))?;
            sheets.push(grid_from_range(&name, &range, &[]));
        }

        debug!(file = %path.display(), sheets = sheets.len(), "workbook loaded");
        Ok(Self { sheets })
    }

    fn open_csv(path: &Path) -> Result<Self, RenderError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.trim().is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        let name = sheet_name_for_csv(path);
        debug!(file = %path.display(), rows = rows.len(), "csv loaded");
        Ok(Self {
            sheets: vec![SheetGrid { name, rows }],
        })
    }
}

fn sheet_name_for_csv(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("csv")
        .to_string()
}

/// Absolute cell rectangle of one merged range (inclusive bounds).
#[derive(Debug, Clone, Copy)]
pub(crate) struct MergedRegion {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

/// Converts a calamine range into a grid, filling merged regions forward.
///
/// Merged-region coordinates are absolute; the range may not start at A1,
/// so positions are shifted by the range origin before fill.
fn grid_from_range(name: &str, range: &Range<Data>, regions: &[MergedRegion]) -> SheetGrid {
    let mut rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(CellValue::from).collect())
        .collect();

    if !regions.is_empty() {
        let (origin_row, origin_col) = range.start().unwrap_or((0, 0));
        fill_merged_regions(&mut rows, regions, origin_row, origin_col);
    }

    SheetGrid {
        name: name.to_string(),
        rows,
    }
}

/// Copies the leading cell of each merged range into every covered cell.
pub(crate) fn fill_merged_regions(
    rows: &mut [Vec<CellValue>],
    regions: &[MergedRegion],
    origin_row: u32,
    origin_col: u32,
) {
    for region in regions {
        let top = region.start.0.saturating_sub(origin_row) as usize;
        let left = region.start.1.saturating_sub(origin_col) as usize;
        let bottom = region.end.0.saturating_sub(origin_row) as usize;
        let right = region.end.1.saturating_sub(origin_col) as usize;

        let lead = match rows.get(top).and_then(|r| r.get(left)) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => continue,
        };

        for r in top..=bottom {
            let Some(row) = rows.get_mut(r) else { break };
            for c in left..=right {
                if let Some(cell) = row.get_mut(c) {
                    if cell.is_empty() {
                        *cell = lead.clone();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn fill_down_covers_the_whole_region() {
        let mut rows = vec![
            vec![text("Electronics"), text("Laptop A")],
            vec![CellValue::Empty, text("Laptop B")],
            vec![CellValue::Empty, text("Laptop C")],
        ];
        let regions = [MergedRegion {
            start: (0, 0),
            end: (2, 0),
        }];

        fill_merged_regions(&mut rows, &regions, 0, 0);

        assert_eq!(rows[1][0], text("Electronics"));
        assert_eq!(rows[2][0], text("Electronics"));
        // Untouched column keeps its own values.
        assert_eq!(rows[2][1], text("Laptop C"));
    }

    #[test]
    fn fill_down_respects_range_origin() {
        // Sheet data starts at B2 (absolute row 1, col 1).
        let mut rows = vec![vec![text("Group")], vec![CellValue::Empty]];
        let regions = [MergedRegion {
            start: (1, 1),
            end: (2, 1),
        }];

        fill_merged_regions(&mut rows, &regions, 1, 1);
        assert_eq!(rows[1][0], text("Group"));
    }

    #[test]
    fn empty_lead_cell_is_ignored() {
        let mut rows = vec![vec![CellValue::Empty], vec![text("kept")]];
        let regions = [MergedRegion {
            start: (0, 0),
            end: (1, 0),
        }];

        fill_merged_regions(&mut rows, &regions, 0, 0);
        assert_eq!(rows[1][0], text("kept"));
    }

    #[test]
    fn sheet_info_reports_shape() {
        let grid = SheetGrid {
            name: "Products".into(),
            rows: vec![
                vec![text("Name"), text("Price")],
                vec![text("Bike"), CellValue::Number(100.0), text("extra")],
            ],
        };
        let info = grid.info();
        assert_eq!(info.row_count, 2);
        assert_eq!(info.col_count, 3);
        assert!(!info.is_empty);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = Workbook::open(Path::new("/nonexistent/file.xlsx")).unwrap_err();
        assert!(matches!(err, RenderError::FileMissing(_)));
    }
}
