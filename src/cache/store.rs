//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration and signed payload serialization.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::serializer::{JsonValue, SecretKey, SecureSerializer};
use crate::cache::{CacheEntry, CacheStats, EntryInfo, LruTracker};
use crate::error::{CacheError, Result};

// == Cache Settings ==
/// Construction parameters for a cache store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Maximum number of entries (at least 1)
    pub max_entries: usize,
    /// TTL applied when `set` is called without one; None = no TTL expiry
    pub default_ttl: Option<Duration>,
    /// Gzip payloads at or above `compression_threshold` bytes
    pub compression: bool,
    pub compression_threshold: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Some(Duration::from_secs(3600)),
            compression: true,
            compression_threshold: crate::cache::serializer::DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

// == Cache Store ==
/// Cache storage with LRU eviction and TTL support.
///
/// Not synchronized; share it through [`crate::cache::TtlCache`].
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    serializer: SecureSerializer,
    max_entries: usize,
    default_ttl: Option<Duration>,
    /// Running sum of key and payload bytes
    memory_usage: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new store with the given capacity, default TTL and serializer.
    pub fn new(
        max_entries: usize,
        default_ttl: Option<Duration>,
        serializer: SecureSerializer,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            serializer,
            max_entries: max_entries.max(1),
            default_ttl,
            memory_usage: 0,
        }
    }

    /// Creates a store from settings, signing payloads with `secret`.
    pub fn from_settings(settings: &CacheSettings, secret: SecretKey) -> Self {
        let serializer = SecureSerializer::new(secret)
            .with_compression(settings.compression, settings.compression_threshold);
        Self::new(settings.max_entries, settings.default_ttl, serializer)
    }

    // == Set ==
    /// Stores a value with optional TTL.
    ///
    /// The value is serialized before anything is touched, so a failed `set`
    /// leaves the store unchanged. Replacing an existing key never evicts.
    pub fn set(&mut self, key: &str, value: &JsonValue, ttl: Option<Duration>) -> Result<()> {
        let effective_ttl = ttl.or(self.default_ttl);
        let payload = self.serializer.serialize(key, value, effective_ttl)?;

        if self.remove_entry(key).is_none() && self.entries.len() >= self.max_entries {
            self.evict_oldest()?;
        }

        let entry = CacheEntry::new(payload, effective_ttl);
        self.memory_usage += key.len() + entry.size();
        self.entries.insert(key.to_string(), entry);
        self.lru.touch(key);
        self.stats.record_set();

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries and entries that fail verification are removed and
    /// counted as misses.
    pub fn get(&mut self, key: &str) -> Option<JsonValue> {
        let Some(entry) = self.entries.get(key) else {
            debug!(key, "cache miss");
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired() {
            debug!(key, "cache entry expired");
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        match self.serializer.deserialize(&entry.payload) {
            Ok(value) => {
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.touch();
                }
                self.lru.touch(key);
                self.stats.record_hit();
                Some(value)
            }
            Err(err) => {
                match &err {
                    CacheError::Security(_) => {
                        warn!(key, error = %err, "dropping cache entry that failed integrity check")
                    }
                    _ => warn!(key, error = %err, "dropping unreadable cache entry"),
                }
                self.remove_entry(key);
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry, returning whether it existed.
    ///
    /// Only removals of existing keys are counted.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.remove_entry(key).is_some() {
            self.stats.record_delete();
            true
        } else {
            false
        }
    }

    // == Exists ==
    /// Checks for a live entry without touching recency or counters.
    pub fn exists(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Clear ==
    /// Removes every entry. Cumulative counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.memory_usage = 0;
        self.stats.record_clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Stats ==
    /// Returns a point-in-time statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len(), self.memory_usage)
    }

    /// Zeroes all cumulative counters.
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::new();
    }

    // == Entry Info ==
    /// Diagnostic view of an entry, expired or not.
    pub fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        self.entries.get(key).map(|entry| entry.info(key))
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lru.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) -> Result<()> {
        let evicted = self
            .lru
            .pop_oldest()
            .ok_or_else(|| CacheError::Internal("cache is full but has no entries".to_string()))?;

        self.remove_entry(&evicted);
        self.stats.record_eviction();
        debug!(key = %evicted, "evicted least recently used entry");
        Ok(())
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.memory_usage = self.memory_usage.saturating_sub(key.len() + entry.size());
        Some(entry)
    }
}
