//! Cache Module
//!
//! Bounded in-memory caching with TTL expiration, LRU eviction and
//! HMAC-signed payloads.

mod entry;
mod lru;
mod serializer;
mod stats;
mod store;
mod ttl_cache;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{CacheEntry, EntryInfo};
pub use lru::LruTracker;
pub use serializer::{
    validate_key, EntryMetadata, EntryType, JsonValue, SecretKey, SecureCacheEntry,
    SecureSerializer, DEFAULT_COMPRESSION_THRESHOLD, MAX_DATA_SIZE, MAX_KEY_LENGTH, MAX_TTL_SECS,
    MIN_SECRET_LENGTH,
};
pub use stats::CacheStats;
pub use store::{CacheSettings, CacheStore};
pub use ttl_cache::TtlCache;
