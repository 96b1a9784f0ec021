use thiserror::Error;

/// Main error type for the reconciliation pipeline
#[derive(Error, Debug)]
pub enum CarryError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Venue API error: {0}")]
    VenueApi(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Crypto/signing errors
    #[error("Signature error: {0}")]
    Signature(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for CarryError
pub type Result<T> = std::result::Result<T, CarryError>;
