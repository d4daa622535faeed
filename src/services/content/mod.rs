/// Content Filter
///
/// Builds a product-product cosine similarity matrix over the standardized
/// feature matrix, and derives urgency- and discount-ranked catalog
/// subsets. All derived attributes are projected once at construction
/// against the snapshot instant and stay fixed for the lifetime of the
/// filter.
use crate::models::{DerivedAttrs, Product};
use crate::services::features::build_feature_matrix;
use crate::utils::row_cosine_similarity;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Stock depth above which the urgency ranking grants a flat bonus.
const STOCK_DEPTH_BONUS_THRESHOLD: u32 = 10;

const URGENCY_WEIGHT: f64 = 0.5;
const DISCOUNT_WEIGHT: f64 = 0.3;
const STOCK_WEIGHT: f64 = 0.2;

pub struct ContentFilter {
    products: Vec<Product>,
    derived: Vec<DerivedAttrs>,
    index: HashMap<String, usize>,
    similarity: Array2<f64>,
}

impl ContentFilter {
    pub fn new(catalog: &[Product], now: DateTime<Utc>) -> Self {
        let derived: Vec<DerivedAttrs> = catalog.iter().map(|p| p.derived_at(now)).collect();
        let features = build_feature_matrix(catalog, &derived);
        let similarity = row_cosine_similarity(features.view());

        let index = catalog
            .iter()
            .enumerate()
            .map(|(i, p)| (p.product_id.clone(), i))
            .collect();

        info!(products = catalog.len(), "Content filter built");

        Self {
            products: catalog.to_vec(),
            derived,
            index,
            similarity,
        }
    }

    /// Top-k products most similar to the given one. The product itself is
    /// never part of the result; an unknown id yields an empty list.
    pub fn similar_products(&self, product_id: &str, k: usize) -> Vec<String> {
        let Some(&idx) = self.index.get(product_id) else {
            return Vec::new();
        };

        let row = self.similarity.row(idx);
        let mut ranked: Vec<(usize, f64)> = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(i, score)| (i, *score))
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        ranked
            .into_iter()
            .take(k)
            .map(|(i, _)| self.products[i].product_id.clone())
            .collect()
    }

    /// Top-k in-stock products expiring within `threshold_days`, scored by
    /// urgency, markdown depth, and a flat bonus for healthy stock levels.
    /// An empty `categories` slice means no category restriction.
    pub fn by_category_urgency(
        &self,
        categories: &[String],
        k: usize,
        threshold_days: i64,
    ) -> Vec<String> {
        let restrict: Option<HashSet<&str>> = if categories.is_empty() {
            None
        } else {
            Some(categories.iter().map(String::as_str).collect())
        };

        let mut ranked: Vec<(usize, f64)> = self
            .products
            .iter()
            .zip(&self.derived)
            .enumerate()
            .filter(|(_, (product, attrs))| {
                attrs.days_to_expiry <= threshold_days
                    && product.stock > 0
                    && restrict
                        .as_ref()
                        .map_or(true, |set| set.contains(product.category.as_str()))
            })
            .map(|(i, (product, attrs))| {
                let stock_bonus = if product.stock > STOCK_DEPTH_BONUS_THRESHOLD {
                    1.0
                } else {
                    0.0
                };
                let combined = attrs.urgency_score * URGENCY_WEIGHT
                    + attrs.discount * DISCOUNT_WEIGHT
                    + stock_bonus * STOCK_WEIGHT;
                (i, combined)
            })
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        ranked
            .into_iter()
            .take(k)
            .map(|(i, _)| self.products[i].product_id.clone())
            .collect()
    }

    /// Top-k in-stock marked-down products, deepest markdown first,
    /// optionally restricted to the given categories.
    pub fn discounted_items(&self, categories: &[String], k: usize) -> Vec<String> {
        let restrict: Option<HashSet<&str>> = if categories.is_empty() {
            None
        } else {
            Some(categories.iter().map(String::as_str).collect())
        };

        let mut ranked: Vec<(usize, f64)> = self
            .products
            .iter()
            .zip(&self.derived)
            .enumerate()
            .filter(|(_, (product, attrs))| {
                attrs.discount > 0.0
                    && product.stock > 0
                    && restrict
                        .as_ref()
                        .map_or(true, |set| set.contains(product.category.as_str()))
            })
            .map(|(i, (_, attrs))| (i, attrs.discount))
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        ranked
            .into_iter()
            .take(k)
            .map(|(i, _)| self.products[i].product_id.clone())
            .collect()
    }

    /// Whole catalog ordered by urgency descending, ignoring stock and
    /// expiry windows. Last-resort ordering for cold-start fallbacks.
    pub fn all_by_urgency(&self, k: usize) -> Vec<String> {
        let mut ranked: Vec<(usize, f64)> = self
            .derived
            .iter()
            .enumerate()
            .map(|(i, attrs)| (i, attrs.urgency_score))
            .collect();

        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        ranked
            .into_iter()
            .take(k)
            .map(|(i, _)| self.products[i].product_id.clone())
            .collect()
    }

    pub fn product(&self, product_id: &str) -> Option<(&Product, &DerivedAttrs)> {
        self.index
            .get(product_id)
            .map(|&i| (&self.products[i], &self.derived[i]))
    }

    pub fn catalog(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn product(id: &str, category: &str, price: f64, stock: u32, days: i64) -> Product {
        Product {
            product_id: id.to_string(),
            name: id.to_string(),
            category: category.to_string(),
            price,
            stock,
            expiry_date: Utc::now() + Duration::days(days),
        }
    }

    #[test]
    fn test_similar_products_excludes_self() {
        let now = Utc::now();
        let catalog = vec![
            product("a", "X", 10.0, 5, 10),
            product("b", "X", 11.0, 6, 11),
            product("c", "Y", 40.0, 50, 90),
        ];
        let filter = ContentFilter::new(&catalog, now);

        for id in ["a", "b", "c"] {
            let similar = filter.similar_products(id, 10);
            assert!(!similar.contains(&id.to_string()), "{id} recommended itself");
        }
    }

    #[test]
    fn test_similar_products_unknown_id() {
        let filter = ContentFilter::new(&[product("a", "X", 10.0, 5, 10)], Utc::now());
        assert!(filter.similar_products("missing", 5).is_empty());
    }

    #[test]
    fn test_by_category_urgency_scenario() {
        // A: urgent and discounted; B: fresh but deep stock; C: out of stock
        let now = Utc::now();
        let catalog = vec![
            product("A", "X", 10.0, 5, 3),
            product("B", "X", 10.0, 50, 27),
            product("C", "Y", 10.0, 0, 15),
        ];
        let filter = ContentFilter::new(&catalog, now);

        let ranked = filter.by_category_urgency(&["X".to_string()], 2, 30);
        assert_eq!(ranked, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_by_category_urgency_filters_stock_and_window() {
        let now = Utc::now();
        let catalog = vec![
            product("in", "X", 10.0, 5, 10),
            product("empty", "X", 10.0, 0, 5),
            product("fresh", "X", 10.0, 5, 120),
        ];
        let filter = ContentFilter::new(&catalog, now);

        let ranked = filter.by_category_urgency(&[], 10, 14);
        assert_eq!(ranked, vec!["in".to_string()]);
    }

    #[test]
    fn test_by_category_urgency_empty_filter_result() {
        let now = Utc::now();
        let catalog = vec![product("fresh", "X", 10.0, 5, 120)];
        let filter = ContentFilter::new(&catalog, now);
        assert!(filter.by_category_urgency(&[], 10, 14).is_empty());
    }

    #[test]
    fn test_discounted_items_ranked_by_markdown_depth() {
        let now = Utc::now();
        let catalog = vec![
            product("ten_pct", "X", 10.0, 5, 25),
            product("forty_pct", "X", 10.0, 5, 2),
            product("twenty_pct", "Y", 10.0, 5, 12),
            product("full_price", "X", 10.0, 5, 90),
            product("sold_out", "X", 10.0, 0, 2),
        ];
        let filter = ContentFilter::new(&catalog, now);

        let ranked = filter.discounted_items(&[], 10);
        assert_eq!(
            ranked,
            vec![
                "forty_pct".to_string(),
                "twenty_pct".to_string(),
                "ten_pct".to_string()
            ]
        );

        let x_only = filter.discounted_items(&["X".to_string()], 10);
        assert_eq!(x_only, vec!["forty_pct".to_string(), "ten_pct".to_string()]);
    }

    #[test]
    fn test_empty_catalog() {
        let filter = ContentFilter::new(&[], Utc::now());
        assert!(filter.is_empty());
        assert!(filter.similar_products("a", 5).is_empty());
        assert!(filter.by_category_urgency(&[], 5, 14).is_empty());
        assert!(filter.discounted_items(&[], 5).is_empty());
        assert!(filter.all_by_urgency(5).is_empty());
    }
}
