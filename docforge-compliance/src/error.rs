use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("no documents to assess")]
    NoDocuments,

    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("invalid status thresholds: {0}")]
    InvalidThresholds(String),

    #[error("invalid matching pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ComplianceError>;
