use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Collection '{0}' does not exist")]
    NotFound(String),

    #[error("Collection '{0}' returned no documents to sample")]
    Empty(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience Result type using our Error
pub type Result<T> = std::result::Result<T, Error>;
