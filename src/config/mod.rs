use crate::error::{RankingError, Result};
use crate::models::ActionType;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub hybrid: HybridWeights,
    pub actions: ActionWeights,
    pub recall: RecallConfig,
    pub evaluation: EvaluationConfig,
}

/// Additive contribution multipliers for each recommendation source.
///
/// These are not a probability mixture; they do not need to sum to 1.
#[derive(Debug, Clone, Deserialize)]
pub struct HybridWeights {
    pub collab: f64,
    pub content: f64,
    pub urgency: f64,
}

/// Signed weight contributed by each interaction kind to the user-product
/// matrix. Every [`ActionType`] has an explicit entry, so an unexpected
/// action can never be silently mis-weighted at lookup time.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionWeights {
    pub viewed: f64,
    pub added: f64,
    pub skipped: f64,
    pub bought: f64,
    pub favorited: f64,
    pub shared: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecallConfig {
    /// Items within this many days of expiry count as urgent.
    pub urgency_threshold_days: i64,
    /// Neighborhood size for user-based collaborative filtering.
    pub similar_user_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Fraction of the interaction log held out as the test set.
    pub test_ratio: f64,
    /// Seed for the reproducible split.
    pub seed: u64,
    /// Cap on the number of users evaluated per run.
    pub max_users: usize,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            collab: 0.4,
            content: 0.3,
            urgency: 0.3,
        }
    }
}

impl Default for ActionWeights {
    fn default() -> Self {
        Self {
            viewed: 1.0,
            added: 2.0,
            skipped: -0.5,
            bought: 3.0,
            favorited: 0.0,
            shared: 0.0,
        }
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            urgency_threshold_days: 14,
            similar_user_count: 5,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            max_users: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hybrid: HybridWeights::default(),
            actions: ActionWeights::default(),
            recall: RecallConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl ActionWeights {
    pub fn weight(&self, action: ActionType) -> f64 {
        match action {
            ActionType::Viewed => self.viewed,
            ActionType::Added => self.added,
            ActionType::Skipped => self.skipped,
            ActionType::Bought => self.bought,
            ActionType::Favorited => self.favorited,
            ActionType::Shared => self.shared,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| RankingError::InvalidEnvValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            hybrid: HybridWeights {
                collab: env_parse("HYBRID_COLLAB_WEIGHT", defaults.hybrid.collab)?,
                content: env_parse("HYBRID_CONTENT_WEIGHT", defaults.hybrid.content)?,
                urgency: env_parse("HYBRID_URGENCY_WEIGHT", defaults.hybrid.urgency)?,
            },
            actions: ActionWeights {
                viewed: env_parse("ACTION_WEIGHT_VIEWED", defaults.actions.viewed)?,
                added: env_parse("ACTION_WEIGHT_ADDED", defaults.actions.added)?,
                skipped: env_parse("ACTION_WEIGHT_SKIPPED", defaults.actions.skipped)?,
                bought: env_parse("ACTION_WEIGHT_BOUGHT", defaults.actions.bought)?,
                favorited: env_parse("ACTION_WEIGHT_FAVORITED", defaults.actions.favorited)?,
                shared: env_parse("ACTION_WEIGHT_SHARED", defaults.actions.shared)?,
            },
            recall: RecallConfig {
                urgency_threshold_days: env_parse(
                    "URGENCY_THRESHOLD_DAYS",
                    defaults.recall.urgency_threshold_days,
                )?,
                similar_user_count: env_parse(
                    "SIMILAR_USER_COUNT",
                    defaults.recall.similar_user_count,
                )?,
            },
            evaluation: EvaluationConfig {
                test_ratio: env_parse("EVAL_TEST_RATIO", defaults.evaluation.test_ratio)?,
                seed: env_parse("EVAL_SEED", defaults.evaluation.seed)?,
                max_users: env_parse("EVAL_MAX_USERS", defaults.evaluation.max_users)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would poison ranking arithmetic.
    pub fn validate(&self) -> Result<()> {
        let hybrid = [
            ("hybrid.collab", self.hybrid.collab),
            ("hybrid.content", self.hybrid.content),
            ("hybrid.urgency", self.hybrid.urgency),
        ];
        for (name, value) in hybrid {
            if !value.is_finite() || value < 0.0 {
                return Err(RankingError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        for action in [
            ActionType::Viewed,
            ActionType::Added,
            ActionType::Skipped,
            ActionType::Bought,
            ActionType::Favorited,
            ActionType::Shared,
        ] {
            let w = self.actions.weight(action);
            if !w.is_finite() {
                return Err(RankingError::InvalidConfig(format!(
                    "action weight for '{}' must be finite, got {w}",
                    action.as_str()
                )));
            }
        }

        if self.recall.similar_user_count == 0 {
            return Err(RankingError::InvalidConfig(
                "recall.similar_user_count must be at least 1".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.evaluation.test_ratio) {
            return Err(RankingError::InvalidConfig(format!(
                "evaluation.test_ratio must be in [0, 1), got {}",
                self.evaluation.test_ratio
            )));
        }

        if self.evaluation.max_users == 0 {
            return Err(RankingError::InvalidConfig(
                "evaluation.max_users must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
