//! The vector index seam.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::VectorError;

/// One nearest-neighbour hit, ordered by ascending cosine distance.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub supplier_item_id: Uuid,
    pub item_name: String,
    /// Product the neighbouring item is linked to, when any.
    pub product_id: Option<Uuid>,
    /// Cosine distance (`1 - cosine_similarity`), ascending = closer.
    pub distance: f32,
}

impl Neighbor {
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Storage-and-search seam for item embeddings.
///
/// Backed by `product_embeddings` in production; tests swap in an
/// in-memory fake. Upsert is idempotent on `(supplier_item_id, model)`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(
        &self,
        supplier_item_id: Uuid,
        model_name: &str,
        embedding: Vec<f32>,
    ) -> Result<(), VectorError>;

    async fn search_top_k(
        &self,
        query: Vec<f32>,
        model_name: &str,
        top_k: u32,
        exclude_item_id: Option<Uuid>,
    ) -> Result<Vec<Neighbor>, VectorError>;

    async fn delete(&self, supplier_item_id: Uuid) -> Result<(), VectorError>;
}
