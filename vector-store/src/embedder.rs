//! Per-item embedding generation with dimension validation.
//!
//! Items are embedded serially (ordered updates, predictable progress);
//! transient provider failures get one retry, then the error is returned
//! for the caller to absorb as a warning.

use std::sync::Arc;

use llm_service::LlmServiceProfiles;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::VectorError;
use crate::index::VectorIndex;
use crate::text_repr::{ItemText, build_item_text};

/// Attempts per item: the first call plus one retry on transient errors.
const EMBED_ATTEMPTS: usize = 2;

pub struct ItemEmbedder {
    profiles: Arc<LlmServiceProfiles>,
    index: Arc<dyn VectorIndex>,
    model_name: String,
    dimensions: usize,
}

impl ItemEmbedder {
    pub fn new(
        profiles: Arc<LlmServiceProfiles>,
        index: Arc<dyn VectorIndex>,
        dimensions: usize,
    ) -> Self {
        let model_name = profiles.profiles().2.model.clone();
        Self {
            profiles,
            index,
            model_name,
            dimensions,
        }
    }

    /// The embedding model identifier used as the index key.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Embeds one item's text representation and upserts the vector.
    ///
    /// # Errors
    /// - [`VectorError::EmptyText`] when the representation is empty
    /// - [`VectorError::DimensionMismatch`] on a wrong-sized response
    /// - [`VectorError::Provider`] after the retry budget is exhausted
    pub async fn embed_item(
        &self,
        supplier_item_id: Uuid,
        item: &ItemText<'_>,
    ) -> Result<(), VectorError> {
        let text = build_item_text(item);
        if text.is_empty() {
            return Err(VectorError::EmptyText);
        }

        let vector = self.embed_text(&text).await?;
        self.index
            .upsert(supplier_item_id, &self.model_name, vector)
            .await?;

        debug!(%supplier_item_id, "item embedded");
        Ok(())
    }

    /// Embeds free text (used for query-side search), with the same
    /// dimension validation as ingest.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let mut last_err: Option<llm_service::LlmError> = None;

        for attempt in 1..=EMBED_ATTEMPTS {
            match self.profiles.embed(text).await {
                Ok(vector) => {
                    if vector.len() != self.dimensions {
                        return Err(VectorError::DimensionMismatch {
                            got: vector.len(),
                            want: self.dimensions,
                        });
                    }
                    return Ok(vector);
                }
                Err(err) if err.is_transient() && attempt < EMBED_ATTEMPTS => {
                    warn!(attempt, error = %err, "transient embedding failure; retrying");
                    last_err = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(last_err
            .map(VectorError::Provider)
            .unwrap_or(VectorError::EmptyText))
    }
}
