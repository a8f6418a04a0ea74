//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access tracking.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Entry ==
/// A single cache entry holding a signed payload and its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized, signed (and possibly compressed) payload
    pub payload: Vec<u8>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read (Unix milliseconds)
    pub accessed_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no TTL expiry
    pub expires_at: Option<u64>,
    /// Number of successful reads
    pub access_count: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// A zero TTL produces an entry that is already expired.
    pub fn new(payload: Vec<u8>, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl.as_millis() as u64));

        Self {
            payload,
            created_at: now,
            accessed_at: now,
            expires_at,
            access_count: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against an explicit timestamp (Unix milliseconds).
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self) {
        self.accessed_at = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the entry has expired.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Size of the stored payload in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    // == Info ==
    /// Builds a read-only diagnostic view of this entry.
    pub fn info(&self, key: &str) -> EntryInfo {
        EntryInfo {
            key: key.to_string(),
            created_at: to_datetime(self.created_at),
            accessed_at: to_datetime(self.accessed_at),
            expires_at: self.expires_at.map(to_datetime),
            access_count: self.access_count,
            ttl_remaining_ms: self.ttl_remaining_ms(),
            is_expired: self.is_expired(),
            size_bytes: self.size(),
        }
    }
}

// == Entry Info ==
/// Diagnostic snapshot of a cache entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_count: u64,
    /// None when the entry has no TTL
    pub ttl_remaining_ms: Option<u64>,
    pub is_expired: bool,
    pub size_bytes: usize,
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_default()
}
