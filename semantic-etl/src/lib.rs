//! Semantic ETL: turns one uploaded price-list file into normalized,
//! embedded supplier items.
//!
//! Stages, driven by [`orchestrator::SemanticEtl`]:
//!
//! 1. **Analyzing** — introspect sheets, pick the ones holding products
//!    ([`sheet_selector`]).
//! 2. **Extracting** — render each sheet to Markdown, drive a structured
//!    LLM call per overlapping chunk ([`extractor`]), clean prices
//!    ([`price`]) and composite names ([`composite`]).
//! 3. **Dedup** — within-file duplicate removal with price tolerance
//!    ([`dedup`]).
//! 4. **Normalizing** — fuzzy-match category paths level by level
//!    ([`category_normalizer`]), upsert supplier items, embed each one.
//!
//! Job phase/progress/metrics updates flow into the job registry after
//! every stage; per-row failures become parsing-log entries and the
//! pipeline continues.

pub mod category_normalizer;
pub mod composite;
pub mod dedup;
pub mod errors;
pub mod extraction;
pub mod extractor;
pub mod orchestrator;
pub mod price;
pub mod prompts;
pub mod sheet_selector;

pub use errors::EtlError;
pub use extraction::{
    ChunkExtraction, ExtractedProduct, ExtractionError, ExtractionResult, ExtractionStatus,
};
pub use orchestrator::{EtlConfig, EtlOutcome, SemanticEtl};
pub use sheet_selector::{SelectionResult, SheetSelector};
