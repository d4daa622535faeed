pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{RankingError, Result};
pub use models::{ActionType, Interaction, Product, Recommendation};
pub use services::{CollaborativeFilter, ContentFilter, EvaluationReport, Evaluator, HybridRecommender};
