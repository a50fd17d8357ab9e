//! Rendering of supplier price-list files into Markdown tables.
//!
//! Pipeline position: the first stage of the semantic ETL, with no
//! knowledge of products or LLMs. It opens a workbook (xlsx /
//! xls / ods via calamine) or a CSV file, applies merged-cell fill-down so
//! downstream code always sees a rectangular table, renders each sheet as
//! a single Markdown table, and cuts the table into overlapping row chunks
//! sized for an LLM context window.
//!
//! Sheet introspection ([`SheetInfo`]) feeds the sheet selector.

pub mod chunker;
pub mod errors;
pub mod markdown;
pub mod workbook;

pub use chunker::{ChunkOptions, MarkdownChunk, chunk_markdown};
pub use errors::RenderError;
pub use markdown::{MarkdownOptions, render_markdown};
pub use workbook::{CellValue, SheetGrid, SheetInfo, Workbook};
