//! Error types for the mercury service

/// Errors that can occur in the mercury service
#[derive(Debug, thiserror::Error)]
pub enum MercuryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid status payload: {0}")]
    Payload(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

/// Result type alias for mercury operations
pub type Result<T> = std::result::Result<T, MercuryError>;
