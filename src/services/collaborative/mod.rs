/// Collaborative Filter
///
/// Algorithm:
/// 1. Encode user/product identifiers to dense matrix indices
/// 2. Build the weighted user-product interaction matrix (summed signed
///    action weights per cell)
/// 3. Compute item-item similarity over matrix columns and user-user
///    similarity over matrix rows (cosine)
///
/// Unknown users and an empty interaction log resolve to empty results,
/// never errors; callers treat an empty list as "no signal".
use crate::config::ActionWeights;
use crate::models::{Interaction, Product};
use crate::utils::row_cosine_similarity;
use ndarray::Array2;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub struct CollaborativeFilter {
    users: Vec<String>,
    user_index: HashMap<String, usize>,
    products: Vec<String>,
    product_index: HashMap<String, usize>,
    /// users x products, cell = summed interaction weight
    matrix: Array2<f64>,
    /// products x products
    item_similarity: Array2<f64>,
    /// users x users
    user_similarity: Array2<f64>,
    /// Neighborhood size for user-based recommendations
    similar_user_count: usize,
    interactions: Vec<Interaction>,
}

impl CollaborativeFilter {
    pub fn new(
        interactions: &[Interaction],
        weights: &ActionWeights,
        similar_user_count: usize,
    ) -> Self {
        let mut users: Vec<String> = Vec::new();
        let mut user_index: HashMap<String, usize> = HashMap::new();
        let mut products: Vec<String> = Vec::new();
        let mut product_index: HashMap<String, usize> = HashMap::new();

        // Dense indices in order of first appearance
        for interaction in interactions {
            if !user_index.contains_key(&interaction.user_id) {
                user_index.insert(interaction.user_id.clone(), users.len());
                users.push(interaction.user_id.clone());
            }
            if !product_index.contains_key(&interaction.product_id) {
                product_index.insert(interaction.product_id.clone(), products.len());
                products.push(interaction.product_id.clone());
            }
        }

        let mut matrix = Array2::zeros((users.len(), products.len()));
        for interaction in interactions {
            let u = user_index[&interaction.user_id];
            let p = product_index[&interaction.product_id];
            matrix[[u, p]] += weights.weight(interaction.action_type);
        }

        let item_similarity = row_cosine_similarity(matrix.t());
        let user_similarity = row_cosine_similarity(matrix.view());

        info!(
            users = users.len(),
            products = products.len(),
            interactions = interactions.len(),
            "Collaborative filter built"
        );

        Self {
            users,
            user_index,
            products,
            product_index,
            matrix,
            item_similarity,
            user_similarity,
            similar_user_count,
            interactions: interactions.to_vec(),
        }
    }

    /// Item-based recommendations: score every untouched product by the
    /// similarity-weighted sum of the user's existing interaction weights.
    ///
    /// Products the user has any recorded weight for (positive or
    /// negative) are excluded. Only positively scored products are
    /// returned, so the result may be shorter than `k`.
    pub fn recommend_item_based(&self, user_id: &str, k: usize) -> Vec<String> {
        let Some(&user_idx) = self.user_index.get(user_id) else {
            debug!(user_id, "Item-based: unknown user, returning empty");
            return Vec::new();
        };

        let user_row = self.matrix.row(user_idx);
        let scores = self.item_similarity.dot(&user_row);

        let mut ranked: Vec<(usize, f64)> = scores
            .iter()
            .enumerate()
            .filter(|(p, _)| user_row[*p].abs() < f64::EPSILON)
            .filter(|(_, score)| **score > 0.0)
            .map(|(p, score)| (p, *score))
            .collect();

        // Stable sort keeps original column order on ties
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        ranked
            .into_iter()
            .take(k)
            .map(|(p, _)| self.products[p].clone())
            .collect()
    }

    /// User-based recommendations: collect products that the most similar
    /// users interacted with positively and the target user has not
    /// touched, following neighbor rank then column order.
    pub fn recommend_user_based(&self, user_id: &str, k: usize) -> Vec<String> {
        let Some(&user_idx) = self.user_index.get(user_id) else {
            debug!(user_id, "User-based: unknown user, returning empty");
            return Vec::new();
        };

        let similarities = self.user_similarity.row(user_idx);
        let mut neighbors: Vec<usize> = (0..self.users.len()).filter(|&u| u != user_idx).collect();
        neighbors.sort_by(|&a, &b| {
            similarities[b]
                .partial_cmp(&similarities[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let user_row = self.matrix.row(user_idx);
        let mut seen: HashSet<usize> = HashSet::new();
        let mut recommended: Vec<String> = Vec::new();

        for &neighbor in neighbors.iter().take(self.similar_user_count) {
            let neighbor_row = self.matrix.row(neighbor);
            for p in 0..self.products.len() {
                if neighbor_row[p] > 0.0
                    && user_row[p].abs() < f64::EPSILON
                    && seen.insert(p)
                {
                    recommended.push(self.products[p].clone());
                    if recommended.len() == k {
                        return recommended;
                    }
                }
            }
        }

        recommended
    }

    /// Categories the user has shown purchase intent for, most frequent
    /// first. Frequency counts distinct products, joined through the
    /// catalog; ties fall back to catalog enumeration order.
    pub fn category_preferences(&self, user_id: &str, catalog: &[Product]) -> Vec<String> {
        if !self.user_index.contains_key(user_id) {
            return Vec::new();
        }

        let mut category_rank: HashMap<&str, usize> = HashMap::new();
        let mut category_of: HashMap<&str, &str> = HashMap::new();
        for product in catalog {
            let next = category_rank.len();
            category_rank.entry(product.category.as_str()).or_insert(next);
            category_of.insert(product.product_id.as_str(), product.category.as_str());
        }

        let mut counted_products: HashSet<&str> = HashSet::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for interaction in &self.interactions {
            if interaction.user_id != user_id || !interaction.action_type.is_positive() {
                continue;
            }
            if !counted_products.insert(interaction.product_id.as_str()) {
                continue;
            }
            if let Some(&category) = category_of.get(interaction.product_id.as_str()) {
                *counts.entry(category).or_insert(0) += 1;
            }
        }

        let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
        ordered.sort_by_key(|&(category, count)| (std::cmp::Reverse(count), category_rank[category]));
        ordered.into_iter().map(|(c, _)| c.to_string()).collect()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}
