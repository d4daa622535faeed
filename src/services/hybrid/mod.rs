/// Hybrid Combiner
///
/// Fuses collaborative and content-based signals into one ranked list
/// under additive contribution weights:
/// 1. Union of item-based and user-based collaborative picks, each
///    contributing the `collab` weight once
/// 2. Urgent items from the user's preferred categories contributing the
///    `content` weight (only when preferences exist)
/// 3. Urgent items over the same preference list contributing the
///    `urgency` weight on top of any prior contribution
///
/// Cold-start users with no accumulated score fall back to the globally
/// most-urgent items at a flat score; the fallback is only empty when the
/// catalog itself is.
use crate::config::Config;
use crate::models::{Interaction, Product, Recommendation};
use crate::services::collaborative::CollaborativeFilter;
use crate::services::content::ContentFilter;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Flat score assigned to cold-start fallback items.
const FALLBACK_SCORE: f64 = 1.0;

/// Score accumulator that remembers insertion order, so ties in the final
/// ranking resolve to whichever product entered the map first.
struct ScoreMap {
    order: Vec<String>,
    scores: HashMap<String, f64>,
}

impl ScoreMap {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            scores: HashMap::new(),
        }
    }

    fn add(&mut self, product_id: &str, weight: f64) {
        match self.scores.get_mut(product_id) {
            Some(score) => *score += weight,
            None => {
                self.order.push(product_id.to_string());
                self.scores.insert(product_id.to_string(), weight);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn into_ranked(self) -> Vec<(String, f64)> {
        let ScoreMap { order, scores } = self;
        let mut ranked: Vec<(String, f64)> = order
            .into_iter()
            .map(|id| {
                let score = scores[&id];
                (id, score)
            })
            .collect();
        // Stable sort: ties keep insertion order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// One immutable snapshot of the full recommendation pipeline.
///
/// Holds no live connection or lock; absorbing new interactions means
/// constructing a fresh instance from fresh tables.
pub struct HybridRecommender {
    collaborative: CollaborativeFilter,
    content: ContentFilter,
    config: Config,
    built_at: DateTime<Utc>,
}

impl HybridRecommender {
    /// Build from a snapshot of the catalog and interaction log, projected
    /// at the current instant.
    pub fn new(catalog: &[Product], interactions: &[Interaction], config: Config) -> Self {
        Self::at_time(catalog, interactions, config, Utc::now())
    }

    /// Build with an explicit snapshot instant. Derived product attributes
    /// (urgency, discount) are projected against `now` and stay fixed for
    /// the lifetime of this instance.
    pub fn at_time(
        catalog: &[Product],
        interactions: &[Interaction],
        config: Config,
        now: DateTime<Utc>,
    ) -> Self {
        let collaborative = CollaborativeFilter::new(
            interactions,
            &config.actions,
            config.recall.similar_user_count,
        );
        let content = ContentFilter::new(catalog, now);

        info!(
            products = catalog.len(),
            interactions = interactions.len(),
            "Hybrid recommender built"
        );

        Self {
            collaborative,
            content,
            config,
            built_at: now,
        }
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Categories the user has shown purchase intent for, most frequent
    /// first.
    pub fn category_preferences(&self, user_id: &str) -> Vec<String> {
        self.collaborative
            .category_preferences(user_id, self.content.catalog())
    }

    /// Produce the fused top-k ranked list for a user.
    pub fn recommend(&self, user_id: &str, k: usize) -> Vec<Recommendation> {
        let weights = &self.config.hybrid;
        let threshold = self.config.recall.urgency_threshold_days;
        let mut scores = ScoreMap::new();

        // 1. Collaborative contributions, deduplicated across both lists
        let item_based = self.collaborative.recommend_item_based(user_id, k);
        let user_based = self.collaborative.recommend_user_based(user_id, k);
        let mut collab_seen: HashSet<&str> = HashSet::new();
        for product_id in item_based.iter().chain(user_based.iter()) {
            if collab_seen.insert(product_id) {
                scores.add(product_id, weights.collab);
            }
        }

        // 2 + 3. Urgency-ranked items over the preference list; the content
        // contribution only applies when preferences exist, the urgency
        // contribution always does
        let preferences = self.category_preferences(user_id);
        let urgent = self.content.by_category_urgency(&preferences, k, threshold);
        if !preferences.is_empty() {
            for product_id in &urgent {
                scores.add(product_id, weights.content);
            }
        }
        for product_id in &urgent {
            scores.add(product_id, weights.urgency);
        }

        debug!(
            user_id,
            collab = collab_seen.len(),
            urgent = urgent.len(),
            preferred_categories = preferences.len(),
            "Hybrid signals collected"
        );

        // Cold start: no signal at all, surface the most urgent stock
        if scores.is_empty() {
            for product_id in self.content.by_category_urgency(&[], k, threshold) {
                scores.add(&product_id, FALLBACK_SCORE);
            }
        }
        if scores.is_empty() {
            for product_id in self.content.all_by_urgency(k) {
                scores.add(&product_id, FALLBACK_SCORE);
            }
        }

        let recommendations: Vec<Recommendation> = scores
            .into_ranked()
            .into_iter()
            .take(k)
            .filter_map(|(product_id, score)| {
                self.content
                    .product(&product_id)
                    .map(|(product, derived)| Recommendation {
                        product: product.clone(),
                        derived: *derived,
                        recommendation_score: score,
                    })
            })
            .collect();

        info!(
            user_id,
            count = recommendations.len(),
            "Hybrid recommendation complete"
        );

        recommendations
    }
}
