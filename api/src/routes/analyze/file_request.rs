use serde::Deserialize;
use uuid::Uuid;

/// Body of `POST /analyze/file`.
#[derive(Debug, Deserialize)]
pub struct FileAnalysisRequest {
    /// Local path (absolute or `file://`) on the shared volume.
    pub file_url: String,
    pub supplier_id: Uuid,
    /// `pdf` | `excel` | `csv`.
    pub file_type: String,
    #[serde(default = "default_true")]
    pub use_semantic_etl: bool,
    /// Force one worksheet instead of running sheet selection.
    #[serde(default)]
    pub priority_sheet: Option<String>,
}

fn default_true() -> bool {
    true
}

impl FileAnalysisRequest {
    pub fn file_type_is_known(&self) -> bool {
        matches!(self.file_type.as_str(), "pdf" | "excel" | "csv")
    }
}
