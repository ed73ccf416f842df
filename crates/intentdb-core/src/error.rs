use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding provider failed: {0}")]
    Provider(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Search cancelled")]
    Cancelled,

    #[error("Query must not be empty")]
    EmptyQuery,
}

pub type Result<T> = std::result::Result<T, Error>;
