//! Request DTOs for the document API
//!
//! Defines the structure of incoming query strings and request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::MAX_TTL_SECS;
use crate::content::RemoteFile;

/// Query string for `GET /documents/:doc_type/:filename`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentQuery {
    /// TTL override in seconds for a freshly fetched document
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl DocumentQuery {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match self.ttl {
            Some(ttl) if ttl > MAX_TTL_SECS => {
                Some(format!("TTL exceeds maximum of {} seconds", MAX_TTL_SECS))
            }
            _ => None,
        }
    }

    pub fn ttl_override(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

/// Request body for `POST /documents/:doc_type/sync`
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    /// Remote directory listing with blob SHAs
    pub files: Vec<RemoteFile>,
}
