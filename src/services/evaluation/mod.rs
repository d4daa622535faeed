/// Evaluator
///
/// Offline ranking-quality harness. Splits the interaction log into train
/// and test sets, rebuilds the hybrid recommender on train data only, and
/// measures precision/recall/F1, catalog coverage, and novelty against
/// the held-out positive interactions. Never part of the live ranking
/// path.
use crate::config::Config;
use crate::models::{Interaction, Product};
use crate::services::hybrid::HybridRecommender;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Per-user ranking metrics for one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct UserEvaluation {
    pub user_id: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub novelty: f64,
}

/// Aggregate evaluation output, produced once per run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub avg_precision: f64,
    pub avg_recall: f64,
    pub avg_f1: f64,
    pub avg_novelty: f64,
    pub coverage: f64,
    pub num_users_evaluated: usize,
    pub per_user: Vec<UserEvaluation>,
}

impl EvaluationReport {
    fn empty() -> Self {
        Self {
            avg_precision: 0.0,
            avg_recall: 0.0,
            avg_f1: 0.0,
            avg_novelty: 0.0,
            coverage: 0.0,
            num_users_evaluated: 0,
            per_user: Vec::new(),
        }
    }
}

/// Precision@K: overlap between the returned recommendations and the
/// ground-truth set, divided by the number of distinct items actually
/// recommended (not literally k, so a short list still gets meaningful
/// precision). 0 when nothing was recommended.
pub fn precision_at_k(recommended: &[String], ground_truth: &HashSet<String>, k: usize) -> f64 {
    let top_k: HashSet<&String> = recommended.iter().take(k).collect();
    if top_k.is_empty() {
        return 0.0;
    }
    let hits = top_k
        .iter()
        .filter(|id| ground_truth.contains(id.as_str()))
        .count();
    hits as f64 / top_k.len() as f64
}

/// Recall@K: overlap divided by the ground-truth set size. 0 when there
/// is no ground truth.
pub fn recall_at_k(recommended: &[String], ground_truth: &HashSet<String>, k: usize) -> f64 {
    if ground_truth.is_empty() {
        return 0.0;
    }
    let top_k: HashSet<&String> = recommended.iter().take(k).collect();
    let hits = top_k
        .iter()
        .filter(|id| ground_truth.contains(id.as_str()))
        .count();
    hits as f64 / ground_truth.len() as f64
}

/// Harmonic mean of precision and recall; 0 when both are 0.
pub fn f1_at_k(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Mean of 1 - popularity share per recommended item. Items never seen in
/// the reference log are maximally novel (1.0). 0 for an empty list.
pub fn novelty(
    recommended: &[String],
    popularity: &HashMap<String, usize>,
    total_interactions: usize,
) -> f64 {
    if recommended.is_empty() {
        return 0.0;
    }
    let sum: f64 = recommended
        .iter()
        .map(|id| {
            let share = if total_interactions == 0 {
                0.0
            } else {
                popularity.get(id).copied().unwrap_or(0) as f64 / total_interactions as f64
            };
            1.0 - share
        })
        .sum();
    sum / recommended.len() as f64
}

pub struct Evaluator {
    catalog: Vec<Product>,
    interactions: Vec<Interaction>,
    config: Config,
}

impl Evaluator {
    pub fn new(catalog: Vec<Product>, interactions: Vec<Interaction>, config: Config) -> Self {
        Self {
            catalog,
            interactions,
            config,
        }
    }

    /// Partition the interaction log into (train, test) with a seeded
    /// uniform random sample of `test_ratio`, preserving log order within
    /// each side.
    ///
    /// Known limitation: this is a size-based sample, not a temporal
    /// split, so future interactions can leak into the training
    /// similarity matrices. Kept deliberately to match the measured
    /// system's semantics.
    pub fn split(&self) -> (Vec<Interaction>, Vec<Interaction>) {
        let n = self.interactions.len();
        let test_len = (n as f64 * self.config.evaluation.test_ratio).round() as usize;

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.evaluation.seed);
        indices.shuffle(&mut rng);

        let test_indices: HashSet<usize> = indices.into_iter().take(test_len).collect();

        let mut train = Vec::with_capacity(n - test_len);
        let mut test = Vec::with_capacity(test_len);
        for (i, interaction) in self.interactions.iter().enumerate() {
            if test_indices.contains(&i) {
                test.push(interaction.clone());
            } else {
                train.push(interaction.clone());
            }
        }
        (train, test)
    }

    /// Run the full offline evaluation at top-`k`, projecting product
    /// attributes at the current instant.
    pub fn evaluate(&self, k: usize) -> EvaluationReport {
        self.evaluate_at(k, Utc::now())
    }

    /// Run the full offline evaluation with an explicit snapshot instant.
    pub fn evaluate_at(&self, k: usize, now: DateTime<Utc>) -> EvaluationReport {
        let (train, test) = self.split();
        let engine = HybridRecommender::at_time(&self.catalog, &train, self.config.clone(), now);

        // Popularity shares for novelty come from the train log
        let mut popularity: HashMap<String, usize> = HashMap::new();
        for interaction in &train {
            *popularity.entry(interaction.product_id.clone()).or_insert(0) += 1;
        }

        // Held-out positive interactions per user
        let mut ground_truth: HashMap<&str, HashSet<String>> = HashMap::new();
        for interaction in &test {
            if interaction.action_type.is_positive() {
                ground_truth
                    .entry(interaction.user_id.as_str())
                    .or_default()
                    .insert(interaction.product_id.clone());
            }
        }

        // First N unique users encountered in the train log
        let mut evaluated_users: Vec<&str> = Vec::new();
        let mut seen_users: HashSet<&str> = HashSet::new();
        for interaction in &train {
            if seen_users.insert(interaction.user_id.as_str()) {
                evaluated_users.push(interaction.user_id.as_str());
                if evaluated_users.len() == self.config.evaluation.max_users {
                    break;
                }
            }
        }

        let mut per_user: Vec<UserEvaluation> = Vec::new();
        let mut surfaced: HashSet<String> = HashSet::new();

        for user_id in evaluated_users {
            let Some(truth) = ground_truth.get(user_id) else {
                debug!(user_id, "No held-out ground truth, skipping user");
                continue;
            };

            let recommended: Vec<String> = engine
                .recommend(user_id, k)
                .into_iter()
                .map(|rec| rec.product.product_id)
                .collect();
            surfaced.extend(recommended.iter().cloned());

            let precision = precision_at_k(&recommended, truth, k);
            let recall = recall_at_k(&recommended, truth, k);
            per_user.push(UserEvaluation {
                user_id: user_id.to_string(),
                precision,
                recall,
                f1: f1_at_k(precision, recall),
                novelty: novelty(&recommended, &popularity, train.len()),
            });
        }

        if per_user.is_empty() {
            return EvaluationReport::empty();
        }

        let n = per_user.len() as f64;
        let coverage = if self.catalog.is_empty() {
            0.0
        } else {
            surfaced.len() as f64 / self.catalog.len() as f64
        };

        let report = EvaluationReport {
            avg_precision: per_user.iter().map(|u| u.precision).sum::<f64>() / n,
            avg_recall: per_user.iter().map(|u| u.recall).sum::<f64>() / n,
            avg_f1: per_user.iter().map(|u| u.f1).sum::<f64>() / n,
            avg_novelty: per_user.iter().map(|u| u.novelty).sum::<f64>() / n,
            coverage,
            num_users_evaluated: per_user.len(),
            per_user,
        };

        info!(
            users = report.num_users_evaluated,
            avg_precision = report.avg_precision,
            avg_recall = report.avg_recall,
            coverage = report.coverage,
            "Evaluation complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionType;
    use chrono::Duration;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn id_set(raw: &[&str]) -> HashSet<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_precision_counts_distinct_recommended() {
        let recs = ids(&["a", "b", "c", "d"]);
        let truth = id_set(&["b", "d", "x"]);
        // 2 hits out of 4 recommended
        assert!((precision_at_k(&recs, &truth, 4) - 0.5).abs() < 1e-9);
        // Short list divides by its own length, not k
        let short = ids(&["b"]);
        assert!((precision_at_k(&short, &truth, 5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_precision_and_recall_empty_denominators() {
        let truth = id_set(&["a"]);
        assert_eq!(precision_at_k(&[], &truth, 5), 0.0);
        assert_eq!(recall_at_k(&ids(&["a"]), &HashSet::new(), 5), 0.0);
    }

    #[test]
    fn test_recall_divides_by_ground_truth() {
        let recs = ids(&["a", "b"]);
        let truth = id_set(&["a", "c", "d", "e"]);
        assert!((recall_at_k(&recs, &truth, 5) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_stay_in_unit_interval() {
        let recs = ids(&["a", "b", "c"]);
        let truth = id_set(&["a", "b"]);
        let p = precision_at_k(&recs, &truth, 3);
        let r = recall_at_k(&recs, &truth, 3);
        assert!((0.0..=1.0).contains(&p));
        assert!((0.0..=1.0).contains(&r));
        assert!((0.0..=1.0).contains(&f1_at_k(p, r)));
    }

    #[test]
    fn test_f1_zero_exactly_when_both_zero() {
        assert_eq!(f1_at_k(0.0, 0.0), 0.0);
        assert!(f1_at_k(0.5, 0.0) == 0.0);
        assert!(f1_at_k(0.5, 0.5) > 0.0);
    }

    #[test]
    fn test_novelty_unseen_items_are_maximally_novel() {
        let popularity = HashMap::from([("hot".to_string(), 50usize)]);
        let n = novelty(&ids(&["never_seen"]), &popularity, 100);
        assert!((n - 1.0).abs() < 1e-9);

        let hot = novelty(&ids(&["hot"]), &popularity, 100);
        assert!((hot - 0.5).abs() < 1e-9);
    }

    fn sample_catalog() -> Vec<Product> {
        let now = Utc::now();
        (0..8)
            .map(|i| Product {
                product_id: format!("p{i}"),
                name: format!("Item {i}"),
                category: if i % 2 == 0 { "Skincare" } else { "Health" }.to_string(),
                price: 10.0 + i as f64,
                stock: 20,
                expiry_date: now + Duration::days(3 + i * 2),
            })
            .collect()
    }

    fn sample_log() -> Vec<Interaction> {
        let now = Utc::now();
        let mut log = Vec::new();
        for u in 0..4 {
            for p in 0..6 {
                log.push(Interaction {
                    user_id: format!("staff_{u}"),
                    product_id: format!("p{}", (u + p) % 8),
                    action_type: if p % 3 == 0 {
                        ActionType::Bought
                    } else {
                        ActionType::Viewed
                    },
                    timestamp: now,
                    quantity: None,
                });
            }
        }
        log
    }

    #[test]
    fn test_split_is_reproducible_and_partitions() {
        let evaluator = Evaluator::new(sample_catalog(), sample_log(), Config::default());
        let (train_a, test_a) = evaluator.split();
        let (train_b, test_b) = evaluator.split();

        assert_eq!(train_a.len(), train_b.len());
        assert_eq!(test_a.len(), test_b.len());
        assert_eq!(train_a.len() + test_a.len(), sample_log().len());

        let expected_test = (sample_log().len() as f64 * 0.2).round() as usize;
        assert_eq!(test_a.len(), expected_test);
    }

    #[test]
    fn test_evaluate_produces_bounded_metrics() {
        let evaluator = Evaluator::new(sample_catalog(), sample_log(), Config::default());
        let report = evaluator.evaluate_at(5, Utc::now());

        assert!((0.0..=1.0).contains(&report.avg_precision));
        assert!((0.0..=1.0).contains(&report.avg_recall));
        assert!((0.0..=1.0).contains(&report.avg_f1));
        assert!((0.0..=1.0).contains(&report.coverage));
        assert!(report.num_users_evaluated <= 10);
        assert_eq!(report.num_users_evaluated, report.per_user.len());
    }

    #[test]
    fn test_evaluate_empty_log_yields_empty_report() {
        let evaluator = Evaluator::new(sample_catalog(), Vec::new(), Config::default());
        let report = evaluator.evaluate_at(5, Utc::now());
        assert_eq!(report.num_users_evaluated, 0);
        assert_eq!(report.avg_precision, 0.0);
        assert_eq!(report.coverage, 0.0);
    }
}
