//! Content Module
//!
//! Document retrieval behind a cache and two circuit breakers.
//!
//! # Components
//! - `document` - Document model and key naming
//! - `fetch` - Fetch collaborator and its HTTP implementation
//! - `parse` - Frontmatter parser
//! - `health` - Request counters and health classification
//! - `service` - The orchestrating `ContentService`

pub mod document;
pub mod fetch;
pub mod health;
pub mod mock;
pub mod parse;
pub mod service;

pub use document::{validate_filename, Document, DocumentType, Metadata, RemoteFile};
pub use fetch::{ContentFetcher, HttpFetcher};
pub use health::{
    CounterSnapshot, HealthStatus, RequestCounters, ServiceDiagnostics, ServiceHealth,
};
pub use mock::MockFetcher;
pub use parse::{DocumentParser, FrontmatterParser};
pub use service::ContentService;
