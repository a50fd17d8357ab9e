//! pgvector-backed implementation of [`VectorIndex`].
//!
//! All vector SQL is concentrated here: upsert on `(supplier_item_id,
//! model_name)` and cosine-distance search (`<=>`) served by the IVF
//! index created in the migrations.

use async_trait::async_trait;
use catalog_db::Db;
use pgvector::Vector;
use tracing::debug;
use uuid::Uuid;

use crate::errors::VectorError;
use crate::index::{Neighbor, VectorIndex};

#[derive(Clone)]
pub struct PgVectorIndex {
    db: Db,
}

impl PgVectorIndex {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VectorIndex for PgVectorIndex {
    async fn upsert(
        &self,
        supplier_item_id: Uuid,
        model_name: &str,
        embedding: Vec<f32>,
    ) -> Result<(), VectorError> {
        sqlx::query(
            r#"
            INSERT INTO product_embeddings (supplier_item_id, model_name, embedding)
            VALUES ($1, $2, $3)
            ON CONFLICT (supplier_item_id, model_name)
            DO UPDATE SET embedding = EXCLUDED.embedding, updated_at = now()
            "#,
        )
        .bind(supplier_item_id)
        .bind(model_name)
        .bind(Vector::from(embedding))
        .execute(self.db.pool())
        .await?;

        debug!(%supplier_item_id, model_name, "embedding upserted");
        Ok(())
    }

    async fn search_top_k(
        &self,
        query: Vec<f32>,
        model_name: &str,
        top_k: u32,
        exclude_item_id: Option<Uuid>,
    ) -> Result<Vec<Neighbor>, VectorError> {
        let rows: Vec<(Uuid, String, Option<Uuid>, f64)> = sqlx::query_as(
            r#"
            SELECT pe.supplier_item_id, si.name, si.product_id,
                   (pe.embedding <=> $1)::float8 AS distance
            FROM product_embeddings pe
            JOIN supplier_items si ON si.id = pe.supplier_item_id
            WHERE pe.model_name = $2
              AND ($3::uuid IS NULL OR pe.supplier_item_id <> $3)
            ORDER BY pe.embedding <=> $1
            LIMIT $4
            "#,
        )
        .bind(Vector::from(query))
        .bind(model_name)
        .bind(exclude_item_id)
        .bind(top_k as i64)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(supplier_item_id, item_name, product_id, distance)| Neighbor {
                supplier_item_id,
                item_name,
                product_id,
                distance: distance as f32,
            })
            .collect())
    }

    async fn delete(&self, supplier_item_id: Uuid) -> Result<(), VectorError> {
        sqlx::query("DELETE FROM product_embeddings WHERE supplier_item_id = $1")
            .bind(supplier_item_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
