//! Shared TTL Cache Handle
//!
//! Task-safe handle over a [`CacheStore`]. Every operation runs inside a
//! single lock guard with no await point, so callers that are cancelled
//! mid-flight never observe or leave a partial write.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::serializer::{JsonValue, SecretKey};
use crate::cache::{CacheSettings, CacheStats, CacheStore, EntryInfo};
use crate::error::Result;

// == TTL Cache ==
/// Cloneable, task-safe cache handle. Clones share the same store.
#[derive(Debug, Clone)]
pub struct TtlCache {
    store: Arc<RwLock<CacheStore>>,
}

impl TtlCache {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    pub fn from_settings(settings: &CacheSettings, secret: SecretKey) -> Self {
        Self::new(CacheStore::from_settings(settings, secret))
    }

    /// Reads a value; write lock because reads update recency and counters.
    pub async fn get(&self, key: &str) -> Option<JsonValue> {
        self.store.write().await.get(key)
    }

    pub async fn set(&self, key: &str, value: &JsonValue, ttl: Option<Duration>) -> Result<()> {
        self.store.write().await.set(key, value, ttl)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.store.read().await.exists(key)
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn reset_stats(&self) {
        self.store.write().await.reset_stats();
    }

    pub async fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        self.store.read().await.entry_info(key)
    }

    /// Keys from least to most recently used.
    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}
