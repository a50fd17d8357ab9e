//! Within-file deduplication of extracted products.
//!
//! Key: normalized name. Two prices "match" iff
//! `|a − b| ≤ tolerance × max(a, b)`; zero never matches nonzero. First
//! occurrence wins; a same-name row at a genuinely different price stays
//! in the output under a synthetic variant key.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::extraction::ExtractedProduct;

/// Statistics from one deduplication pass.
#[derive(Debug, Clone, Default)]
pub struct DedupStats {
    pub total_products: u64,
    pub unique_products: u64,
    pub duplicates_removed: u64,
    pub duplicate_groups: u64,
}

/// One group of rows collapsed into a single kept product.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub key: String,
    pub kept_name: String,
    pub removed_count: u64,
}

pub struct Deduplicator {
    /// Relative tolerance, e.g. 0.01 for 1%.
    tolerance: Decimal,
}

impl Deduplicator {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    /// Removes duplicates, preserving input order of the kept rows.
    ///
    /// Running the pass twice is a no-op: the output contains one row per
    /// (name, price-cluster) and re-clustering it removes nothing.
    pub fn deduplicate(
        &self,
        products: Vec<ExtractedProduct>,
    ) -> (Vec<ExtractedProduct>, DedupStats, Vec<DuplicateGroup>) {
        if products.is_empty() {
            return (Vec::new(), DedupStats::default(), Vec::new());
        }

        let mut stats = DedupStats {
            total_products: products.len() as u64,
            ..Default::default()
        };

        // key → price of the kept row under that key
        let mut seen: HashMap<String, Decimal> = HashMap::new();
        let mut groups: HashMap<String, DuplicateGroup> = HashMap::new();
        let mut unique: Vec<ExtractedProduct> = Vec::new();

        for product in products {
            let key = product.dedup_key();
            let price = product.price_rrc;

            match seen.get(&key) {
                None => {
                    seen.insert(key, price);
                    unique.push(product);
                }
                Some(&existing_price) if self.prices_match(price, existing_price) => {
                    stats.duplicates_removed += 1;
                    groups
                        .entry(key.clone())
                        .or_insert_with(|| DuplicateGroup {
                            key,
                            kept_name: product.name.clone(),
                            removed_count: 0,
                        })
                        .removed_count += 1;
                    debug!(name = %product.name, %price, %existing_price, "duplicate removed");
                }
                Some(&existing_price) => {
                    // Same name, different price: keep as a variant.
                    let variant_key = format!("{key}__price_{price}");
                    if let Some(&variant_price) = seen.get(&variant_key) {
                        if self.prices_match(price, variant_price) {
                            stats.duplicates_removed += 1;
                            continue;
                        }
                    }
                    debug!(name = %product.name, %price, %existing_price, "price variant kept");
                    seen.insert(variant_key, price);
                    unique.push(product);
                }
            }
        }

        stats.unique_products = unique.len() as u64;
        stats.duplicate_groups = groups.len() as u64;

        info!(
            total = stats.total_products,
            unique = stats.unique_products,
            removed = stats.duplicates_removed,
            "deduplication complete"
        );

        (unique, stats, groups.into_values().collect())
    }

    /// Tolerance check against the larger of the two prices.
    fn prices_match(&self, a: Decimal, b: Decimal) -> bool {
        if a.is_zero() && b.is_zero() {
            return true;
        }
        if a.is_zero() || b.is_zero() {
            return false;
        }
        let base = a.max(b);
        (a - b).abs() <= base * self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn product(name: &str, price: &str) -> ExtractedProduct {
        ExtractedProduct {
            name: name.into(),
            description: None,
            price_rrc: price.parse().unwrap(),
            price_opt: None,
            category_path: vec![],
            brand: None,
            unit: None,
            raw_data: Value::Null,
        }
    }

    fn dedup(products: Vec<ExtractedProduct>) -> (Vec<ExtractedProduct>, DedupStats) {
        let (unique, stats, _) = Deduplicator::new("0.01".parse().unwrap()).deduplicate(products);
        (unique, stats)
    }

    #[test]
    fn within_tolerance_is_a_duplicate() {
        let (unique, stats) = dedup(vec![
            product("Mountain Bike X", "1000.00"),
            product("Mountain Bike X", "1005.00"),
        ]);
        assert_eq!(unique.len(), 1);
        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(unique[0].price_rrc, "1000.00".parse().unwrap());
    }

    #[test]
    fn outside_tolerance_keeps_both_as_variants() {
        let (unique, stats) = dedup(vec![
            product("Mountain Bike X", "1000.00"),
            product("Mountain Bike X", "1100.00"),
        ]);
        assert_eq!(unique.len(), 2);
        assert_eq!(stats.duplicates_removed, 0);
    }

    #[test]
    fn name_normalization_feeds_the_key() {
        let (unique, stats) = dedup(vec![
            product("Mountain  Bike X", "500"),
            product("mountain bike x", "500"),
        ]);
        assert_eq!(unique.len(), 1);
        assert_eq!(stats.duplicates_removed, 1);
    }

    #[test]
    fn zero_never_matches_nonzero() {
        let (unique, _) = dedup(vec![
            product("Freebie", "0"),
            product("Freebie", "10.00"),
        ]);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn zero_matches_zero() {
        let (unique, stats) = dedup(vec![product("Freebie", "0"), product("Freebie", "0")]);
        assert_eq!(unique.len(), 1);
        assert_eq!(stats.duplicates_removed, 1);
    }

    #[test]
    fn first_occurrence_wins() {
        let (unique, _) = dedup(vec![
            product("Bike", "100.00"),
            product("Bike", "100.50"),
            product("Bike", "99.80"),
        ]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].price_rrc, "100.00".parse().unwrap());
    }

    #[test]
    fn dedup_is_idempotent() {
        let input = vec![
            product("A", "10.00"),
            product("A", "10.05"),
            product("A", "20.00"),
            product("B", "5.00"),
        ];
        let (once, stats_once) = dedup(input);
        let (twice, stats_twice) = dedup(once.clone());
        assert_eq!(once.len(), twice.len());
        assert_eq!(stats_once.duplicates_removed, 1);
        assert_eq!(stats_twice.duplicates_removed, 0);
    }

    #[test]
    fn empty_input() {
        let (unique, stats) = dedup(vec![]);
        assert!(unique.is_empty());
        assert_eq!(stats.total_products, 0);
    }
}
