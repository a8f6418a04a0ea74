//! Service health accounting.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::resilience::BreakerSnapshot;

// == Health Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Failing,
    Critical,
}

impl HealthStatus {
    /// Maps a success rate onto the 0.90 / 0.70 / 0.50 bands.
    pub fn from_success_rate(rate: f64) -> Self {
        if rate >= 0.90 {
            HealthStatus::Healthy
        } else if rate >= 0.70 {
            HealthStatus::Degraded
        } else if rate >= 0.50 {
            HealthStatus::Failing
        } else {
            HealthStatus::Critical
        }
    }
}

// == Service Health ==
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Calls rejected by an open breaker since the last reset
    pub circuit_breaker_trips: u64,
    /// 0.0 when no requests have been made
    pub success_rate: f64,
    pub cache_hit_rate: f64,
    pub last_updated: DateTime<Utc>,
}

impl ServiceHealth {
    pub fn new(counters: CounterSnapshot, cache_hit_rate: f64) -> Self {
        let success_rate = if counters.total == 0 {
            0.0
        } else {
            counters.successful as f64 / counters.total as f64
        };

        Self {
            status: HealthStatus::from_success_rate(success_rate),
            total_requests: counters.total,
            successful_requests: counters.successful,
            failed_requests: counters.failed,
            circuit_breaker_trips: counters.breaker_trips,
            success_rate,
            cache_hit_rate,
            last_updated: Utc::now(),
        }
    }
}

// == Diagnostics ==
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDiagnostics {
    pub service_health: ServiceHealth,
    pub cache_statistics: CacheStats,
    /// Breaker snapshots keyed by breaker name
    pub error_boundaries: BTreeMap<String, BreakerSnapshot>,
}

// == Request Counters ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub breaker_trips: u64,
}

/// Lock-free request counters shared by concurrent callers.
#[derive(Debug, Default)]
pub struct RequestCounters {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    breaker_trips: AtomicU64,
}

impl RequestCounters {
    pub fn record_request(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_breaker_trip(&self) {
        self.breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.successful.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.breaker_trips.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.total.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            breaker_trips: self.breaker_trips.load(Ordering::Relaxed),
        }
    }
}
