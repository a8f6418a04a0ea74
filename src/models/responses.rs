//! Response DTOs for the document API
//!
//! Defines the structure of outgoing HTTP response bodies. Documents, stats,
//! health and diagnostics serialize their domain types directly.

use serde::Serialize;

use crate::content::DocumentType;

/// Response body for `POST /documents/:doc_type/sync`
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub doc_type: DocumentType,
    /// Files present in the submitted listing
    pub listed: usize,
    /// Cached documents dropped as stale
    pub invalidated: usize,
}

impl SyncResponse {
    pub fn new(doc_type: DocumentType, listed: usize, invalidated: usize) -> Self {
        Self {
            doc_type,
            listed,
            invalidated,
        }
    }
}

/// Response body for `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Entries held before the clear
    pub cleared: usize,
}

impl ClearResponse {
    pub fn new(cleared: usize) -> Self {
        Self {
            message: format!("Cleared {} cache entries", cleared),
            cleared,
        }
    }
}

/// Response body for `POST /health/reset`
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub message: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl ResetResponse {
    pub fn health_reset() -> Self {
        Self {
            message: "Health counters reset".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
