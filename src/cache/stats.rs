//! Cache Statistics Module
//!
//! Tracks cache usage counters and derived metrics.

use serde::Serialize;

// == Cache Stats ==
/// Usage counters owned by a single cache instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Successful reads
    pub hits: u64,
    /// Reads of absent, expired or unreadable entries
    pub misses: u64,
    /// Completed writes
    pub sets: u64,
    /// Entries removed through `delete`
    pub deletes: u64,
    /// Calls to `clear`
    pub clears: u64,
    /// Entries evicted by the LRU policy
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries
    pub current_size: usize,
    /// Sum of key and stored payload sizes in bytes
    pub memory_usage_bytes: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_clear(&mut self) {
        self.clears += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Snapshot ==
    /// Returns a copy with the size gauges and derived hit rate filled in.
    pub fn snapshot(&self, current_size: usize, memory_usage_bytes: usize) -> Self {
        let mut stats = self.clone();
        stats.current_size = current_size;
        stats.memory_usage_bytes = memory_usage_bytes;
        stats.hit_rate = self.hit_rate();
        stats
    }
}
