//! Embedding generation and vector search for supplier items.
//!
//! The index is a trait so the matcher can be exercised against an
//! in-memory fake; production backs it with the `product_embeddings`
//! table and its IVF cosine index. Embedding dimension is fixed at
//! startup (`EMBEDDING_DIMENSIONS`) and a mismatching response is fatal
//! for the item being ingested.

pub mod embedder;
pub mod errors;
pub mod index;
pub mod pg_index;
pub mod text_repr;

pub use embedder::ItemEmbedder;
pub use errors::VectorError;
pub use index::{Neighbor, VectorIndex};
pub use pg_index::PgVectorIndex;
pub use text_repr::{ItemText, build_item_text};
