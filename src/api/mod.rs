//! API Module
//!
//! HTTP handlers and routing for the document service REST API.
//!
//! # Endpoints
//! - `GET /documents/:doc_type/:filename` - Retrieve a document
//! - `POST /sync/:doc_type` - Reconcile the cache with a remote listing
//! - `DELETE /cache` - Clear the cache
//! - `GET /stats` - Cache statistics
//! - `GET /health` / `POST /health/reset` - Service health
//! - `GET /diagnostics` - Full diagnostics bundle

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
