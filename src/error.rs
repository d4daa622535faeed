use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid environment value for {key}: {message}")]
    InvalidEnvValue { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, RankingError>;
