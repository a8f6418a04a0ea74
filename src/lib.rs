//! Frameworks Cache - signed document cache for governance content
//!
//! Fetches risk, mitigation and framework documents, caches them in an
//! HMAC-signed TTL/LRU store and shields both the upstream and the cache
//! behind circuit breakers.

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod models;
pub mod resilience;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use content::ContentService;
pub use tasks::spawn_cleanup_task;
