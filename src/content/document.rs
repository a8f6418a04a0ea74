//! Governance document types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{validate_key, JsonValue};
use crate::error::{CacheError, Result};

/// Frontmatter fields of a document.
pub type Metadata = serde_json::Map<String, JsonValue>;

// == Document Type ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Risk,
    Mitigation,
    Framework,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::Risk,
        DocumentType::Mitigation,
        DocumentType::Framework,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Risk => "risk",
            DocumentType::Mitigation => "mitigation",
            DocumentType::Framework => "framework",
        }
    }

    /// Directory holding this type in the content repository.
    pub fn directory(&self) -> &'static str {
        match self {
            DocumentType::Risk => "risks",
            DocumentType::Mitigation => "mitigations",
            DocumentType::Framework => "frameworks",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = CacheError;

    /// Accepts singular or plural names, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|t| lower == t.as_str() || lower == t.directory())
            .ok_or_else(|| CacheError::Validation(format!("unknown document type '{}'", s)))
    }
}

// == Document ==
/// A parsed governance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub metadata: Metadata,
    /// Body without frontmatter
    pub content: String,
    /// Raw text as fetched
    pub full_text: String,
}

// == Remote Listing ==
/// One file of a remote directory listing.
///
/// Matches the `name`/`sha` fields of a GitHub contents response; other
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub sha: String,
}

/// Rejects empty, hidden or path-traversing filenames.
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.starts_with('.') {
        return Err(CacheError::Validation(format!(
            "filename '{}' must not start with '.'",
            filename
        )));
    }
    validate_key(filename)
}

pub(crate) fn cache_key(doc_type: DocumentType, filename: &str) -> String {
    format!("document:{}:{}", doc_type, filename)
}
