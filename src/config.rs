//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheSettings, SecretKey, DEFAULT_COMPRESSION_THRESHOLD};
use crate::error::{CacheError, Result};
use crate::resilience::BreakerConfig;

/// Service configuration parameters.
///
/// Everything except the secret key and content base URL has a default.
#[derive(Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL for entries stored without one; `None` keeps them until evicted
    pub default_ttl: Option<Duration>,
    pub compression: bool,
    /// Serialized size in bytes from which payloads are gzipped
    pub compression_threshold: usize,
    pub cleanup_enabled: bool,
    pub cleanup_interval: Duration,
    /// HMAC signing key for cache entries
    pub secret_key: Option<String>,
    pub fetch_breaker: BreakerConfig,
    pub cache_breaker: BreakerConfig,
    /// Base URL documents are fetched from
    pub content_base_url: Option<String>,
    pub fetch_timeout: Duration,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds, `none` to disable (default: 3600)
    /// - `CACHE_COMPRESSION` - Gzip large payloads (default: true)
    /// - `CACHE_COMPRESSION_THRESHOLD` - Bytes before compressing (default: 1024)
    /// - `CACHE_CLEANUP_ENABLED` - Run the background sweep (default: true)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds, at least 1 (default: 60)
    /// - `CACHE_SECRET_KEY` - HMAC key, at least 32 characters (required)
    /// - `FETCH_BREAKER_THRESHOLD` / `FETCH_BREAKER_RECOVERY` (default: 5 / 60s)
    /// - `CACHE_BREAKER_THRESHOLD` / `CACHE_BREAKER_RECOVERY` (default: 3 / 30s)
    /// - `CONTENT_BASE_URL` - Raw content base URL (required by the server)
    /// - `FETCH_TIMEOUT` - Fetch timeout in seconds (default: 10)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_entries: env_or("CACHE_MAX_SIZE", defaults.max_entries),
            default_ttl: match env::var("CACHE_DEFAULT_TTL") {
                Ok(raw) => parse_ttl(&raw).unwrap_or(defaults.default_ttl),
                Err(_) => defaults.default_ttl,
            },
            compression: env_or("CACHE_COMPRESSION", defaults.compression),
            compression_threshold: env_or(
                "CACHE_COMPRESSION_THRESHOLD",
                defaults.compression_threshold,
            ),
            cleanup_enabled: env_or("CACHE_CLEANUP_ENABLED", defaults.cleanup_enabled),
            cleanup_interval: Duration::from_secs(
                env_or::<u64>("CACHE_CLEANUP_INTERVAL", 60).max(1),
            ),
            secret_key: env::var("CACHE_SECRET_KEY").ok(),
            fetch_breaker: BreakerConfig {
                failure_threshold: env_or("FETCH_BREAKER_THRESHOLD", 5),
                recovery_timeout: Duration::from_secs(env_or("FETCH_BREAKER_RECOVERY", 60)),
            },
            cache_breaker: BreakerConfig {
                failure_threshold: env_or("CACHE_BREAKER_THRESHOLD", 3),
                recovery_timeout: Duration::from_secs(env_or("CACHE_BREAKER_RECOVERY", 30)),
            },
            content_base_url: env::var("CONTENT_BASE_URL").ok(),
            fetch_timeout: Duration::from_secs(env_or("FETCH_TIMEOUT", 10)),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            max_entries: self.max_entries,
            default_ttl: self.default_ttl,
            compression: self.compression,
            compression_threshold: self.compression_threshold,
        }
    }

    /// Validated signing key; missing or short keys are configuration errors.
    pub fn secret_key(&self) -> Result<SecretKey> {
        let raw = self
            .secret_key
            .as_deref()
            .ok_or_else(|| CacheError::Config("CACHE_SECRET_KEY is not set".to_string()))?;
        SecretKey::new(raw)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Some(Duration::from_secs(3600)),
            compression: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            cleanup_enabled: true,
            cleanup_interval: Duration::from_secs(60),
            secret_key: None,
            fetch_breaker: BreakerConfig {
                failure_threshold: 5,
                recovery_timeout: Duration::from_secs(60),
            },
            cache_breaker: BreakerConfig {
                failure_threshold: 3,
                recovery_timeout: Duration::from_secs(30),
            },
            content_base_url: None,
            fetch_timeout: Duration::from_secs(10),
            server_port: 3000,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("max_entries", &self.max_entries)
            .field("default_ttl", &self.default_ttl)
            .field("compression", &self.compression)
            .field("compression_threshold", &self.compression_threshold)
            .field("cleanup_enabled", &self.cleanup_enabled)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("fetch_breaker", &self.fetch_breaker)
            .field("cache_breaker", &self.cache_breaker)
            .field("content_base_url", &self.content_base_url)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("server_port", &self.server_port)
            .finish()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses a TTL in (possibly fractional) seconds.
///
/// `none` and `0` mean "no default TTL"; unparseable input yields `None` at
/// the outer level so the caller can fall back.
fn parse_ttl(raw: &str) -> Option<Option<Duration>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    let secs: f64 = raw.parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    if secs == 0.0 {
        return Some(None);
    }
    Some(Some(Duration::from_secs_f64(secs)))
}
