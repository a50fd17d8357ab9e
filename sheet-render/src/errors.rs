//! Error types for workbook reading and rendering.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// Input file does not exist or is not readable.
    #[error("file not found: {0}")]
    FileMissing(PathBuf),

    /// Requested worksheet name is absent from the workbook.
    #[error("sheet '{sheet}' not found in {file}")]
    SheetNotFound { file: PathBuf, sheet: String },

    /// Extension the pipeline cannot render (PDF price lists included:
    /// no table structure is recoverable here, the job must fail).
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Workbook is structurally unreadable (corrupt archive, bad XML).
    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
