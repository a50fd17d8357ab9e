//! Category-path normalization with governance.
//!
//! Walks an extracted `[root, …, leaf]` path parent-first. Each level is
//! fuzzy-matched against the existing children of the current parent; a
//! miss creates a new category flagged `needs_review` with the supplier
//! recorded as its introducer. One load-all call warms the cache up
//! front, so a file with thousands of rows costs a handful of inserts and
//! zero per-row selects.

use std::collections::HashMap;

use catalog_db::{Db, repo::categories};
use fuzzy_text::{normalize_name, token_set_ratio};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::EtlError;

/// What happened at one level of the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryAction {
    Matched,
    Created,
    Skipped,
}

/// Per-level outcome of path normalization.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryMatchResult {
    pub extracted_name: String,
    pub matched_id: Option<Uuid>,
    pub matched_name: Option<String>,
    /// Fuzzy similarity of the best candidate, 0–100.
    pub similarity_score: f64,
    pub action: CategoryAction,
    pub needs_review: bool,
    pub parent_id: Option<Uuid>,
    pub created_category_id: Option<Uuid>,
}

impl CategoryMatchResult {
    /// The id this level resolved to, matched or created.
    pub fn final_category_id(&self) -> Option<Uuid> {
        match self.action {
            CategoryAction::Matched => self.matched_id,
            CategoryAction::Created => self.created_category_id,
            CategoryAction::Skipped => None,
        }
    }
}

/// Run counters, logged at finish and folded into the job metrics.
#[derive(Debug, Clone, Default)]
pub struct NormalizerStats {
    pub matched: u64,
    pub created: u64,
    pub skipped: u64,
    pub review_queue: u64,
    similarity_sum: f64,
    similarity_count: u64,
}

impl NormalizerStats {
    pub fn mean_similarity(&self) -> f64 {
        if self.similarity_count == 0 {
            0.0
        } else {
            self.similarity_sum / self.similarity_count as f64
        }
    }
}

/// In-memory view of the category forest, keyed by parent.
///
/// Pure and synchronous so the scoring logic is testable without a
/// database; the normalizer keeps it in lockstep with its inserts.
#[derive(Debug, Default)]
pub struct CategoryCache {
    /// parent id → [(category id, display name, normalized name)]
    children: HashMap<Option<Uuid>, Vec<(Uuid, String, String)>>,
}

impl CategoryCache {
    pub fn from_categories(rows: impl IntoIterator<Item = (Uuid, String, Option<Uuid>)>) -> Self {
        let mut cache = Self::default();
        for (id, name, parent_id) in rows {
            cache.insert(id, name, parent_id);
        }
        cache
    }

    pub fn insert(&mut self, id: Uuid, name: String, parent_id: Option<Uuid>) {
        let normalized = normalize_name(&name);
        self.children
            .entry(parent_id)
            .or_default()
            .push((id, name, normalized));
    }

    /// Best fuzzy candidate among the children of `parent_id`.
    pub fn best_match(&self, parent_id: Option<Uuid>, name: &str) -> Option<(Uuid, String, f64)> {
        let candidates = self.children.get(&parent_id)?;
        let mut best: Option<(Uuid, String, f64)> = None;
        for (id, display, normalized) in candidates {
            let score = token_set_ratio(name, normalized);
            match &best {
                Some((_, _, best_score)) if *best_score >= score => {}
                _ => best = Some((*id, display.clone(), score)),
            }
        }
        best
    }
}

pub struct CategoryNormalizer {
    db: Db,
    supplier_id: Uuid,
    /// Similarity threshold in [0, 100]; default 85.
    threshold: f64,
    cache: CategoryCache,
    stats: NormalizerStats,
}

impl CategoryNormalizer {
    /// Loads the whole category forest and builds the cache.
    pub async fn load(db: Db, supplier_id: Uuid, threshold: f64) -> Result<Self, EtlError> {
        let rows = categories::load_all(&db).await?;
        let cache =
            CategoryCache::from_categories(rows.into_iter().map(|c| (c.id, c.name, c.parent_id)));

        Ok(Self {
            db,
            supplier_id,
            threshold,
            cache,
            stats: NormalizerStats::default(),
        })
    }

    /// Normalizes one path level by level; returns per-level results and
    /// the leaf id. An empty path yields `([], None)`.
    ///
    /// With an unchanged cache the same path always resolves identically,
    /// so re-running a file cannot fork the hierarchy.
    pub async fn normalize_path(
        &mut self,
        path: &[String],
    ) -> Result<(Vec<CategoryMatchResult>, Option<Uuid>), EtlError> {
        let mut results = Vec::with_capacity(path.len());
        let mut parent_id: Option<Uuid> = None;

        for raw_name in path {
            let name = raw_name.trim();
            if name.is_empty() {
                self.stats.skipped += 1;
                results.push(CategoryMatchResult {
                    extracted_name: raw_name.clone(),
                    matched_id: None,
                    matched_name: None,
                    similarity_score: 0.0,
                    action: CategoryAction::Skipped,
                    needs_review: false,
                    parent_id,
                    created_category_id: None,
                });
                continue;
            }

            let best = self.cache.best_match(parent_id, name);
            match best {
                Some((id, matched_name, score)) if score >= self.threshold => {
                    self.stats.matched += 1;
                    self.stats.similarity_sum += score;
                    self.stats.similarity_count += 1;
                    debug!(level = %name, matched = %matched_name, score, "category matched");

                    results.push(CategoryMatchResult {
                        extracted_name: name.to_string(),
                        matched_id: Some(id),
                        matched_name: Some(matched_name),
                        similarity_score: score,
                        action: CategoryAction::Matched,
                        needs_review: false,
                        parent_id,
                        created_category_id: None,
                    });
                    parent_id = Some(id);
                }
                best => {
                    let score = best.map(|(_, _, s)| s).unwrap_or(0.0);
                    let created = categories::create_needs_review(
                        &self.db,
                        name,
                        parent_id,
                        Some(self.supplier_id),
                    )
                    .await?;
                    self.cache
                        .insert(created.id, created.name.clone(), parent_id);
                    self.stats.created += 1;
                    self.stats.review_queue += 1;
                    debug!(level = %name, id = %created.id, "category created (needs review)");

                    results.push(CategoryMatchResult {
                        extracted_name: name.to_string(),
                        matched_id: None,
                        matched_name: None,
                        similarity_score: score,
                        action: CategoryAction::Created,
                        needs_review: true,
                        parent_id,
                        created_category_id: Some(created.id),
                    });
                    parent_id = Some(created.id);
                }
            }
        }

        Ok((results, parent_id))
    }

    pub fn stats(&self) -> &NormalizerStats {
        &self.stats
    }

    /// Logs the run summary; called once per file.
    pub fn log_summary(&self) {
        info!(
            matched = self.stats.matched,
            created = self.stats.created,
            skipped = self.stats.skipped,
            review_queue = self.stats.review_queue,
            mean_similarity = format!("{:.1}", self.stats.mean_similarity()),
            "category normalization summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(entries: &[(&str, Option<Uuid>)]) -> (CategoryCache, Vec<Uuid>) {
        let mut cache = CategoryCache::default();
        let mut ids = Vec::new();
        for (name, parent) in entries {
            let id = Uuid::new_v4();
            cache.insert(id, name.to_string(), *parent);
            ids.push(id);
        }
        (cache, ids)
    }

    #[test]
    fn exact_name_scores_100() {
        let (cache, ids) = cache_with(&[("Electronics", None), ("Furniture", None)]);
        let (id, name, score) = cache.best_match(None, "Electronics").unwrap();
        assert_eq!(id, ids[0]);
        assert_eq!(name, "Electronics");
        assert_eq!(score, 100.0);
    }

    #[test]
    fn lookup_is_scoped_to_the_parent() {
        let parent = Uuid::new_v4();
        let (cache, ids) = cache_with(&[("Laptops", Some(parent)), ("Laptops", None)]);
        let (id, _, _) = cache.best_match(Some(parent), "Laptops").unwrap();
        assert_eq!(id, ids[0]);
    }

    #[test]
    fn no_children_means_no_match() {
        let (cache, _) = cache_with(&[("Electronics", None)]);
        assert!(cache.best_match(Some(Uuid::new_v4()), "Electronics").is_none());
    }

    #[test]
    fn near_duplicate_scores_above_threshold() {
        let (cache, _) = cache_with(&[("Electric Bicycles", None)]);
        let (_, _, score) = cache.best_match(None, "electric bicycle").unwrap();
        assert!(score >= 85.0, "got {score}");
    }

    #[test]
    fn unrelated_name_scores_low() {
        let (cache, _) = cache_with(&[("Electronics", None)]);
        let (_, _, score) = cache.best_match(None, "Garden Tools").unwrap();
        assert!(score < 85.0, "got {score}");
    }
}
