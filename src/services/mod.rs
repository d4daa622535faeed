pub mod collaborative;
pub mod content;
pub mod evaluation;
pub mod features;
pub mod hybrid;

pub use collaborative::CollaborativeFilter;
pub use content::ContentFilter;
pub use evaluation::{EvaluationReport, Evaluator, UserEvaluation};
pub use hybrid::HybridRecommender;
