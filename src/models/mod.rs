use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog row supplied by the collaborator layer.
///
/// The engine treats products as immutable input for the duration of one
/// computation pass. Time-dependent fields (urgency, discount) are never
/// stored on the product itself; they are projected from `expiry_date`
/// against an explicit snapshot instant via [`Product::derived_at`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: u32,
    pub expiry_date: DateTime<Utc>,
}

impl Product {
    /// Project the time-dependent attributes at the given instant.
    pub fn derived_at(&self, now: DateTime<Utc>) -> DerivedAttrs {
        let days_to_expiry = (self.expiry_date - now).num_days();
        let discount = discount_tier(days_to_expiry);
        DerivedAttrs {
            days_to_expiry,
            urgency_score: urgency_score(days_to_expiry),
            discount,
            discounted_price: self.price * (1.0 - discount),
        }
    }
}

/// Time-dependent projection of a product, computed at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedAttrs {
    /// Negative once the product is past its expiry date.
    pub days_to_expiry: i64,
    /// In [0, 1]; higher as expiry approaches.
    pub urgency_score: f64,
    /// Markdown fraction in {0, 0.1, 0.2, 0.3, 0.4}.
    pub discount: f64,
    pub discounted_price: f64,
}

/// Urgency ramps up linearly over the last 30 days before expiry.
pub fn urgency_score(days_to_expiry: i64) -> f64 {
    ((30.0 - days_to_expiry as f64) / 30.0).clamp(0.0, 1.0)
}

/// Markdown tier as a step function of days to expiry.
///
/// Expired items (negative days) fall into the deepest tier.
pub fn discount_tier(days_to_expiry: i64) -> f64 {
    if days_to_expiry <= 3 {
        0.4
    } else if days_to_expiry <= 7 {
        0.3
    } else if days_to_expiry <= 14 {
        0.2
    } else if days_to_expiry <= 30 {
        0.1
    } else {
        0.0
    }
}

/// One append-only event from the interaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub product_id: String,
    pub action_type: ActionType,
    pub timestamp: DateTime<Utc>,
    /// Only meaningful for `Bought`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Viewed,
    Added,
    Skipped,
    Bought,
    Favorited,
    Shared,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Viewed => "viewed",
            ActionType::Added => "added",
            ActionType::Skipped => "skipped",
            ActionType::Bought => "bought",
            ActionType::Favorited => "favorited",
            ActionType::Shared => "shared",
        }
    }

    /// Actions that express clear positive intent, used for category
    /// preferences and evaluation ground truth.
    pub fn is_positive(&self) -> bool {
        matches!(self, ActionType::Added | ActionType::Bought)
    }
}

/// One row of the final ranked output: the full catalog row, its
/// projection at snapshot time, and the accumulated hybrid score.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub product: Product,
    #[serde(flatten)]
    pub derived: DerivedAttrs,
    pub recommendation_score: f64,
}
