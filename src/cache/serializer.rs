//! Secure Serializer Module
//!
//! Turns JSON values into tamper-evident byte blobs and back. Payloads are
//! plain JSON documents carrying an HMAC-SHA256 tag, optionally gzip
//! compressed. Nothing but JSON is ever decoded.

use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CacheError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Closed set of values that may be cached.
pub type JsonValue = serde_json::Value;

// == Limits ==
/// Maximum canonical JSON size of cached data in bytes
pub const MAX_DATA_SIZE: usize = 10_000_000;

/// Maximum key length in characters
pub const MAX_KEY_LENGTH: usize = 255;

/// Maximum TTL carried on the wire (30 days)
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Minimum secret key length in characters
pub const MIN_SECRET_LENGTH: usize = 32;

/// Payloads at least this large are compressed when compression is enabled
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;

const MAX_COMPRESSION_RATIO: usize = 100;
const MIN_DECOMPRESSED_ALLOWANCE: usize = 64 * 1024;
const MAX_DECOMPRESSED_SIZE: usize = MAX_DATA_SIZE + 64 * 1024;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// == Secret Key ==
/// HMAC key material, validated to be at least 32 characters.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let len = key.chars().count();
        if len < MIN_SECRET_LENGTH {
            return Err(CacheError::Config(format!(
                "secret key must be at least {} characters, got {}",
                MIN_SECRET_LENGTH, len
            )));
        }
        Ok(Self(key))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

// == Wire Format ==
/// JSON shape of the cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl EntryType {
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => EntryType::Null,
            JsonValue::Bool(_) => EntryType::Boolean,
            JsonValue::Number(_) => EntryType::Number,
            JsonValue::String(_) => EntryType::String,
            JsonValue::Array(_) => EntryType::Array,
            JsonValue::Object(_) => EntryType::Object,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub entry_type: EntryType,
    pub created_at: DateTime<Utc>,
    /// Canonical JSON size of `data` in bytes
    pub data_size: usize,
    pub compression_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_hash: Option<String>,
}

/// Document written to the underlying byte store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureCacheEntry {
    pub key: String,
    pub data: JsonValue,
    pub metadata: EntryMetadata,
    /// Whole seconds, 0 when the entry has no TTL
    pub ttl: u64,
    /// Unix seconds with sub-second precision
    pub created_timestamp: f64,
}

// == Secure Serializer ==
#[derive(Debug, Clone)]
pub struct SecureSerializer {
    secret: SecretKey,
    compression: bool,
    compression_threshold: usize,
}

impl SecureSerializer {
    /// Creates a serializer that never compresses.
    pub fn new(secret: SecretKey) -> Self {
        Self {
            secret,
            compression: false,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }

    /// Enables gzip for payloads of at least `threshold` bytes.
    pub fn with_compression(mut self, enabled: bool, threshold: usize) -> Self {
        self.compression = enabled;
        self.compression_threshold = threshold;
        self
    }

    pub fn compression_enabled(&self) -> bool {
        self.compression
    }

    // == Serialize ==
    /// Signs `data` under `key` and encodes it as a cache blob.
    pub fn serialize(&self, key: &str, data: &JsonValue, ttl: Option<Duration>) -> Result<Vec<u8>> {
        validate_key(key)?;
        let ttl_secs = wire_ttl(ttl)?;

        let canonical = canonical_json(data)?;
        if canonical.len() > MAX_DATA_SIZE {
            return Err(CacheError::PayloadTooLarge {
                size: canonical.len(),
                limit: MAX_DATA_SIZE,
            });
        }

        let now = Utc::now();
        let created_timestamp = now.timestamp_micros() as f64 / 1_000_000.0;
        let compress = self.compression && canonical.len() >= self.compression_threshold;
        let integrity_hash = self.sign(key, &canonical, ttl_secs, created_timestamp)?;

        let entry = SecureCacheEntry {
            key: key.to_string(),
            data: data.clone(),
            metadata: EntryMetadata {
                entry_type: EntryType::of(data),
                created_at: now,
                data_size: canonical.len(),
                compression_used: compress,
                integrity_hash: Some(integrity_hash),
            },
            ttl: ttl_secs,
            created_timestamp,
        };

        let json = encode_entry(&entry)?;
        if !compress {
            return Ok(json);
        }

        let compressed = gzip(&json)?;
        if json.len() <= decompression_limit(compressed.len()) {
            return Ok(compressed);
        }

        // Too compressible for the read-side bomb guard; store it plain.
        let mut entry = entry;
        entry.metadata.compression_used = false;
        encode_entry(&entry)
    }

    // == Deserialize ==
    /// Verifies a cache blob and returns only its data.
    pub fn deserialize(&self, blob: &[u8]) -> Result<JsonValue> {
        self.open(blob).map(|entry| entry.data)
    }

    /// Verifies a cache blob and returns the full wire entry.
    pub fn open(&self, blob: &[u8]) -> Result<SecureCacheEntry> {
        if blob.len() > MAX_DECOMPRESSED_SIZE {
            return Err(CacheError::PayloadTooLarge {
                size: blob.len(),
                limit: MAX_DECOMPRESSED_SIZE,
            });
        }

        let bytes: Cow<'_, [u8]> = if blob.starts_with(&GZIP_MAGIC) {
            Cow::Owned(gunzip(blob)?)
        } else {
            Cow::Borrowed(blob)
        };

        let entry: SecureCacheEntry = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::Validation(format!("malformed cache entry: {}", e)))?;

        let canonical = canonical_json(&entry.data)?;
        if canonical.len() > MAX_DATA_SIZE {
            return Err(CacheError::PayloadTooLarge {
                size: canonical.len(),
                limit: MAX_DATA_SIZE,
            });
        }

        let stored = entry
            .metadata
            .integrity_hash
            .as_deref()
            .ok_or_else(|| CacheError::Security(format!("entry '{}' is unsigned", entry.key)))?;
        let expected = self.sign(&entry.key, &canonical, entry.ttl, entry.created_timestamp)?;

        if !bool::from(expected.as_bytes().ct_eq(stored.as_bytes())) {
            return Err(CacheError::Security(format!(
                "integrity hash mismatch for entry '{}'",
                entry.key
            )));
        }

        Ok(entry)
    }

    fn sign(&self, key: &str, canonical: &str, ttl: u64, created_timestamp: f64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| CacheError::Internal(format!("invalid HMAC key: {}", e)))?;
        mac.update(key.as_bytes());
        mac.update(b":");
        mac.update(canonical.as_bytes());
        mac.update(b":");
        mac.update(ttl.to_string().as_bytes());
        mac.update(b":");
        mac.update(created_timestamp.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

// == Validation Helpers ==
/// Checks length and path-traversal rules for cache keys.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::Validation("key cannot be empty".to_string()));
    }
    if key.chars().count() > MAX_KEY_LENGTH {
        return Err(CacheError::Validation(format!(
            "key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        )));
    }
    if key.contains("..") || key.contains(['/', '\\']) || key.chars().any(char::is_control) {
        return Err(CacheError::Validation(format!(
            "key '{}' contains forbidden characters",
            key.escape_debug()
        )));
    }
    Ok(())
}

fn wire_ttl(ttl: Option<Duration>) -> Result<u64> {
    let Some(ttl) = ttl else {
        return Ok(0);
    };
    if ttl > Duration::from_secs(MAX_TTL_SECS) {
        return Err(CacheError::Validation(format!(
            "ttl of {}s exceeds maximum of {}s",
            ttl.as_secs(),
            MAX_TTL_SECS
        )));
    }
    // Sub-second TTLs round up so a short TTL never reads as "no TTL".
    Ok(ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0))
}

/// Sorted-key JSON encoding used for signing.
fn canonical_json(data: &JsonValue) -> Result<String> {
    serde_json::to_string(data)
        .map_err(|e| CacheError::Validation(format!("value is not JSON serializable: {}", e)))
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .map_err(|e| CacheError::Internal(format!("compression failed: {}", e)))
}

fn encode_entry(entry: &SecureCacheEntry) -> Result<Vec<u8>> {
    serde_json::to_vec(entry)
        .map_err(|e| CacheError::Validation(format!("cannot encode cache entry: {}", e)))
}

/// Largest inflated size accepted for a compressed blob of `compressed_len` bytes.
fn decompression_limit(compressed_len: usize) -> usize {
    compressed_len
        .saturating_mul(MAX_COMPRESSION_RATIO)
        .clamp(MIN_DECOMPRESSED_ALLOWANCE, MAX_DECOMPRESSED_SIZE)
}

fn gunzip(blob: &[u8]) -> Result<Vec<u8>> {
    let limit = decompression_limit(blob.len());

    let mut out = Vec::new();
    GzDecoder::new(blob)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Validation(format!("corrupt compressed payload: {}", e)))?;

    if out.len() > limit {
        return Err(CacheError::PayloadTooLarge {
            size: out.len(),
            limit,
        });
    }
    Ok(out)
}
