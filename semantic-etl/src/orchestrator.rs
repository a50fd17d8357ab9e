//! The semantic ETL orchestrator: one call per uploaded file.
//!
//! Drives `analyzing → extracting → normalizing → complete` with job
//! registry updates after each phase. Per-row failures become parsing-log
//! rows and extraction errors; only structural failures (unreadable file,
//! database loss) abort the job.

use std::path::Path;
use std::sync::Arc;

use catalog_db::repo::{parsing_logs, products, supplier_items};
use catalog_db::{Db, NewParsingLog};
use job_state::{JobPhase, JobRegistry, JobStatus, ParsingMetrics};
use llm_service::LlmServiceProfiles;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sheet_render::{ChunkOptions, MarkdownOptions, Workbook, chunk_markdown, render_markdown};
use tracing::{info, warn};
use uuid::Uuid;
use vector_store::{ItemEmbedder, ItemText};

use crate::category_normalizer::CategoryNormalizer;
use crate::dedup::Deduplicator;
use crate::errors::EtlError;
use crate::extraction::{ExtractedProduct, ExtractionResult, ExtractionStatus};
use crate::extractor::LlmExtractor;
use crate::sheet_selector::SheetSelector;

/// Raw-data keys that may carry a supplier-provided SKU.
const SKU_KEYS: &[&str] = &["sku", "артикул", "article", "code"];

/// Knobs for one ETL run, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Relative dedup price tolerance (`DEDUP_PRICE_TOLERANCE`, default 0.01).
    pub dedup_tolerance: Decimal,
    /// Category similarity threshold (`CATEGORY_SIMILARITY_THRESHOLD`, default 85).
    pub category_threshold: f64,
    /// Whether ambiguous multi-sheet files may consult the LLM.
    pub use_llm_sheet_selection: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            chunk_overlap: 5,
            dedup_tolerance: Decimal::new(1, 2),
            category_threshold: 85.0,
            use_llm_sheet_selection: true,
        }
    }
}

impl EtlConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dedup_tolerance: std::env::var("DEDUP_PRICE_TOLERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dedup_tolerance),
            category_threshold: std::env::var("CATEGORY_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.category_threshold),
            ..defaults
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct EtlOutcome {
    pub result: ExtractionResult,
    pub item_ids: Vec<Uuid>,
    pub metrics: ParsingMetrics,
    pub status: JobStatus,
}

pub struct SemanticEtl {
    db: Db,
    registry: JobRegistry,
    profiles: Arc<LlmServiceProfiles>,
    embedder: Arc<ItemEmbedder>,
    config: EtlConfig,
}

impl SemanticEtl {
    pub fn new(
        db: Db,
        registry: JobRegistry,
        profiles: Arc<LlmServiceProfiles>,
        embedder: Arc<ItemEmbedder>,
        config: EtlConfig,
    ) -> Self {
        Self {
            db,
            registry,
            profiles,
            embedder,
            config,
        }
    }

    /// Runs the full pipeline for one file, keeping the job record in
    /// sync. Any structural error marks the job failed before returning.
    ///
    /// `priority_sheet` forces a single worksheet and bypasses selection.
    pub async fn parse_file(
        &self,
        file_path: &Path,
        supplier_id: Uuid,
        job_id: Uuid,
        priority_sheet: Option<&str>,
    ) -> Result<EtlOutcome, EtlError> {
        match self.run(file_path, supplier_id, job_id, priority_sheet).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "semantic ETL failed");
                if let Err(state_err) = self.registry.mark_failed(job_id, err.to_string()).await {
                    warn!(job_id = %job_id, error = %state_err, "failed to record job failure");
                }
                let _ = parsing_logs::insert(
                    &self.db,
                    &NewParsingLog {
                        task_id: job_id.to_string(),
                        supplier_id: Some(supplier_id),
                        error_type: "parsing".into(),
                        message: err.to_string(),
                        row_number: None,
                        row_data: Value::Null,
                    },
                )
                .await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        file_path: &Path,
        supplier_id: Uuid,
        job_id: Uuid,
        priority_sheet: Option<&str>,
    ) -> Result<EtlOutcome, EtlError> {
        info!(job_id = %job_id, file = %file_path.display(), "semantic ETL started");
        self.registry.mark_started(job_id).await?;

        /* ---------------- Phase: analyzing ---------------- */

        self.registry
            .update_phase(job_id, JobPhase::Analyzing, Some(5))
            .await?;

        let workbook = Workbook::open(file_path)?;
        let infos = workbook.sheet_infos();

        let selection = match priority_sheet {
            Some(wanted) => {
                // Caller-forced worksheet: validated against the workbook,
                // no selection heuristics involved.
                let hit = infos
                    .iter()
                    .find(|s| s.name.trim().eq_ignore_ascii_case(wanted.trim()))
                    .ok_or_else(|| {
                        EtlError::Parsing(format!("requested sheet '{wanted}' not found"))
                    })?;
                crate::sheet_selector::SelectionResult {
                    selected_sheets: vec![hit.name.clone()],
                    skipped_sheets: infos
                        .iter()
                        .filter(|s| s.name != hit.name)
                        .map(|s| s.name.clone())
                        .collect(),
                    reasoning: format!("Sheet '{}' requested by caller", hit.name),
                    used_llm: false,
                    priority_sheet_found: true,
                }
            }
            None => {
                let selector = SheetSelector::new(Some(self.profiles.clone()));
                selector
                    .select(&infos, self.config.use_llm_sheet_selection)
                    .await
            }
        };

        info!(
            job_id = %job_id,
            selected = ?selection.selected_sheets,
            skipped = selection.skipped_sheets.len(),
            used_llm = selection.used_llm,
            "sheet selection done"
        );

        if selection.selected_sheets.is_empty() {
            // Nothing to process: the job completes cleanly with zeros.
            let metrics = ParsingMetrics::default();
            self.registry
                .mark_completed(job_id, JobStatus::Completed, Some(metrics.clone()))
                .await?;
            return Ok(EtlOutcome {
                result: ExtractionResult::default(),
                item_ids: Vec::new(),
                metrics,
                status: JobStatus::Completed,
            });
        }

        /* ---------------- Phase: extracting ---------------- */

        self.registry
            .update_phase(job_id, JobPhase::Extracting, Some(15))
            .await?;

        let extractor = LlmExtractor::new(&self.profiles);
        let md_opts = MarkdownOptions::default();
        let chunk_opts = ChunkOptions {
            chunk_size: self.config.chunk_size,
            overlap: self.config.chunk_overlap,
        };

        let mut merged = ExtractionResult {
            sheet_name: selection.selected_sheets.join(", "),
            ..Default::default()
        };

        for sheet_name in &selection.selected_sheets {
            let grid = workbook.sheet(file_path, sheet_name)?;
            let markdown = render_markdown(grid, &md_opts);
            let chunks = chunk_markdown(&markdown, chunk_opts);
            let sheet_result = extractor.extract_sheet(&chunks, sheet_name).await;

            merged.total_rows += sheet_result.total_rows;
            merged.failed_extractions += sheet_result.failed_extractions;
            merged.duplicates_removed += sheet_result.duplicates_removed;
            merged.extraction_errors.extend(sheet_result.extraction_errors);
            merged.products.extend(sheet_result.products);
        }

        // Within-file dedup; with several sheets this doubles as the
        // cross-sheet pass, same rules.
        let dedup = Deduplicator::new(self.config.dedup_tolerance);
        let (unique, dedup_stats, _groups) = dedup.deduplicate(std::mem::take(&mut merged.products));
        merged.products = unique;
        merged.duplicates_removed += dedup_stats.duplicates_removed;
        merged.successful_extractions = merged.products.len() as u64;

        self.record_extraction_errors(job_id, supplier_id, &merged).await;

        /* ---------------- Phase: normalizing ---------------- */

        self.registry
            .update_phase(job_id, JobPhase::Normalizing, Some(60))
            .await?;

        let mut normalizer = CategoryNormalizer::load(
            self.db.clone(),
            supplier_id,
            self.config.category_threshold,
        )
        .await?;

        let source_type = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_lowercase();

        let total_items = merged.products.len() as u64;
        let mut item_ids = Vec::with_capacity(merged.products.len());
        let mut item_skus = Vec::with_capacity(merged.products.len());
        let mut repriced_products: Vec<Uuid> = Vec::new();

        for (idx, product) in merged.products.iter().enumerate() {
            let (_levels, leaf_id) = normalizer.normalize_path(&product.category_path).await?;

            let supplier_sku = supplier_sku_for(product, supplier_id, idx);
            let new_item = supplier_items::NewSupplierItem {
                supplier_id,
                supplier_sku: supplier_sku.clone(),
                name: product.name.clone(),
                current_price: product.price_rrc,
                characteristics: build_characteristics(product, leaf_id, &source_type),
            };

            let outcome = supplier_items::upsert_extracted(&self.db, &new_item).await?;
            item_ids.push(outcome.id);
            item_skus.push(supplier_sku);
            if outcome.price_changed {
                if let Some(product_id) = outcome.product_id {
                    repriced_products.push(product_id);
                }
            }

            let processed = (idx + 1) as u64;
            if processed % 10 == 0 || processed == total_items {
                self.registry
                    .update_progress(job_id, processed, Some(total_items))
                    .await?;
            }
        }
        normalizer.log_summary();

        // Price changes on already-linked items invalidate their
        // products' aggregates right away.
        repriced_products.sort();
        repriced_products.dedup();
        for product_id in &repriced_products {
            match products::recompute_aggregates(&self.db, *product_id).await {
                Ok(result) => info!(
                    product_id = %product_id,
                    min_price = ?result.min_price,
                    availability = result.availability,
                    trigger = "price_change",
                    "product aggregates updated"
                ),
                Err(err) => {
                    warn!(product_id = %product_id, error = %err, "aggregate recompute failed")
                }
            }
        }

        // Embeddings are issued serially per item; individual failures
        // are absorbed as warnings and the item simply has no vector.
        let mut embedded = 0u64;
        for ((item_id, sku), product) in item_ids.iter().zip(&item_skus).zip(&merged.products) {
            let category = product.category_path.join("/");
            let item_text = ItemText {
                name: &product.name,
                description: product.description.as_deref(),
                brand: product.brand.as_deref(),
                category: (!category.is_empty()).then_some(category.as_str()),
                sku: Some(sku.as_str()),
                characteristics: None,
            };
            match self.embedder.embed_item(*item_id, &item_text).await {
                Ok(()) => embedded += 1,
                Err(err) => {
                    warn!(item_id = %item_id, error = %err, "embedding failed; continuing");
                    let _ = parsing_logs::insert(
                        &self.db,
                        &NewParsingLog {
                            task_id: job_id.to_string(),
                            supplier_id: Some(supplier_id),
                            error_type: "embedding".into(),
                            message: err.to_string(),
                            row_number: None,
                            row_data: json!({ "supplier_item_id": item_id.to_string() }),
                        },
                    )
                    .await;
                }
            }
        }

        /* ---------------- Phase: complete ---------------- */

        let stats = normalizer.stats();
        let metrics = ParsingMetrics {
            total_rows: merged.total_rows,
            parsed_rows: merged.successful_extractions,
            success_rate: merged.success_rate(),
            duplicates_removed: merged.duplicates_removed,
            categories_matched: stats.matched,
            categories_created: stats.created,
            review_queue_count: stats.review_queue,
            average_similarity: stats.mean_similarity(),
        };

        let status = if merged.total_rows == 0 {
            JobStatus::Completed
        } else {
            match merged.status() {
                ExtractionStatus::Success => JobStatus::Completed,
                ExtractionStatus::CompletedWithErrors => JobStatus::CompletedWithErrors,
                ExtractionStatus::Failed => JobStatus::Failed,
            }
        };

        if status == JobStatus::Failed {
            self.registry
                .update_metrics(job_id, metrics.clone())
                .await?;
            self.registry
                .mark_failed(
                    job_id,
                    format!(
                        "extraction success rate {:.1}% below threshold",
                        merged.success_rate()
                    ),
                )
                .await?;
        } else {
            self.registry
                .mark_completed(job_id, status, Some(metrics.clone()))
                .await?;
        }

        info!(
            job_id = %job_id,
            items = item_ids.len(),
            embedded,
            status = ?status,
            success_rate = format!("{:.1}", metrics.success_rate),
            "semantic ETL finished"
        );

        Ok(EtlOutcome {
            result: merged,
            item_ids,
            metrics,
            status,
        })
    }

    /// Mirrors row-level extraction errors into parsing logs and the
    /// job's bounded error list.
    async fn record_extraction_errors(
        &self,
        job_id: Uuid,
        supplier_id: Uuid,
        result: &ExtractionResult,
    ) {
        for error in &result.extraction_errors {
            let _ = parsing_logs::insert(
                &self.db,
                &NewParsingLog {
                    task_id: job_id.to_string(),
                    supplier_id: Some(supplier_id),
                    error_type: error.error_type.clone(),
                    message: error.message.clone(),
                    row_number: error.row_number.map(|n| n as i32),
                    row_data: error.raw_data.clone().unwrap_or(Value::Null),
                },
            )
            .await;
        }

        for error in result.extraction_errors.iter().take(10) {
            let _ = self
                .registry
                .append_error(job_id, error.message.clone())
                .await;
        }
    }
}

/// Supplier SKU: the file's own article number when present, otherwise a
/// deterministic `ML-{supplier}-{idx}-{hash}` so re-submitting the same
/// file updates rather than duplicates.
fn supplier_sku_for(product: &ExtractedProduct, supplier_id: Uuid, idx: usize) -> String {
    if let Some(map) = product.raw_data.as_object() {
        for key in SKU_KEYS {
            if let Some(sku) = map.get(*key).and_then(Value::as_str) {
                let sku = sku.trim();
                if !sku.is_empty() {
                    return sku.to_string();
                }
            }
        }
    }

    let digest = blake3::hash(product.dedup_key().as_bytes());
    let hash8 = &digest.to_hex()[..8];
    format!("ML-{supplier_id}-{idx}-{hash8}")
}

fn build_characteristics(
    product: &ExtractedProduct,
    leaf_category_id: Option<Uuid>,
    source_type: &str,
) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(description) = &product.description {
        map.insert("description".into(), json!(description));
    }
    if let Some(brand) = &product.brand {
        map.insert("brand".into(), json!(brand));
    }
    if let Some(unit) = &product.unit {
        map.insert("unit".into(), json!(unit));
    }
    if let Some(price_opt) = product.price_opt {
        map.insert("price_opt".into(), json!(price_opt.to_string()));
    }
    if !product.category_path.is_empty() {
        map.insert("category".into(), json!(product.category_path.join("/")));
    }
    if let Some(leaf) = leaf_category_id {
        map.insert("_category_id".into(), json!(leaf.to_string()));
    }
    map.insert("_source_type".into(), json!(source_type));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, raw: Value) -> ExtractedProduct {
        ExtractedProduct {
            name: name.into(),
            description: Some("desc".into()),
            price_rrc: "99.90".parse().unwrap(),
            price_opt: Some("80".parse().unwrap()),
            category_path: vec!["Electronics".into(), "Bikes".into()],
            brand: Some("Shtenli".into()),
            unit: None,
            raw_data: raw,
        }
    }

    #[test]
    fn supplier_sku_prefers_the_file_article() {
        let p = product("Bike", json!({"sku": " AB-123 "}));
        let sku = supplier_sku_for(&p, Uuid::nil(), 0);
        assert_eq!(sku, "AB-123");
    }

    #[test]
    fn generated_sku_is_deterministic() {
        let supplier = Uuid::new_v4();
        let p = product("Bike", Value::Null);
        let a = supplier_sku_for(&p, supplier, 3);
        let b = supplier_sku_for(&p, supplier, 3);
        assert_eq!(a, b);
        assert!(a.starts_with(&format!("ML-{supplier}-3-")));
    }

    #[test]
    fn generated_sku_ignores_name_case_and_spacing() {
        let supplier = Uuid::new_v4();
        let a = supplier_sku_for(&product("Mountain  Bike", Value::Null), supplier, 0);
        let b = supplier_sku_for(&product("mountain bike", Value::Null), supplier, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn characteristics_capture_the_usual_fields() {
        let p = product("Bike", Value::Null);
        let leaf = Uuid::new_v4();
        let c = build_characteristics(&p, Some(leaf), "xlsx");
        assert_eq!(c["description"], "desc");
        assert_eq!(c["brand"], "Shtenli");
        assert_eq!(c["category"], "Electronics/Bikes");
        assert_eq!(c["_category_id"], leaf.to_string());
        assert_eq!(c["_source_type"], "xlsx");
        assert_eq!(c["price_opt"], "80");
    }
}
