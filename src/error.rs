//! Error types for the document cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache, serializer and HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Payload, key or TTL failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Integrity verification failed (tampered or corrupted payload)
    #[error("Integrity check failed: {0}")]
    Security(String),

    /// Payload exceeds the allowed size, before or after decompression
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Call rejected because the named circuit breaker is open
    #[error("Circuit breaker '{0}' is open")]
    CircuitOpen(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Content Error Enum ==
/// Errors raised by the fetch and parse collaborators.
#[derive(Error, Debug)]
pub enum ContentError {
    /// Upstream returned an unexpected response
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Raw content could not be split into metadata and body
    #[error("Parse failed: {0}")]
    Parse(String),

    /// Frontmatter is not a valid YAML mapping
    #[error("Parse failed: invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Validation(_) => StatusCode::BAD_REQUEST,
            CacheError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Security(_) | CacheError::Config(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
