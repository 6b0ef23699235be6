//! Error types for Countersign

use hyper::StatusCode;

use crate::compositor::CompositeError;

/// Main error type for Countersign operations
#[derive(Debug, thiserror::Error)]
pub enum CountersignError {
    /// The bearer token resolves to no quote. Reported as not-found so an
    /// unknown token and an unknown quote look the same to the caller.
    #[error("Not found")]
    Unauthorized,

    #[error("Original document missing for quote {0}")]
    MissingOriginal(String),

    #[error("Invalid signature image: {0}")]
    InvalidImage(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CountersignError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::NOT_FOUND,
            Self::MissingOriginal(_) => StatusCode::BAD_REQUEST,
            Self::InvalidImage(_) => StatusCode::BAD_REQUEST,
            Self::InvalidDocument(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl From<CompositeError> for CountersignError {
    fn from(err: CompositeError) -> Self {
        match err {
            CompositeError::InvalidDocument(msg) => Self::InvalidDocument(msg),
            CompositeError::InvalidImage(msg) => Self::InvalidImage(msg),
            CompositeError::Render(msg) => Self::Internal(format!("PDF render failed: {}", msg)),
        }
    }
}

impl From<std::io::Error> for CountersignError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<hyper::Error> for CountersignError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for CountersignError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Result type alias for Countersign operations
pub type Result<T> = std::result::Result<T, CountersignError>;
