//! Circuit Breaker
//!
//! Fails fast once a dependency has failed `failure_threshold` times in a
//! row, then lets a single trial call through after `recovery_timeout`.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::CacheError;

// == Configuration ==
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens (at least 1)
    pub failure_threshold: u32,
    /// Time after the last failure before a trial call is allowed
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

// == State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        f.write_str(name)
    }
}

// == Errors ==
/// Outcome of a rejected or failed protected call.
#[derive(Error, Debug)]
pub enum BreakerError<E> {
    /// The breaker rejected the call without running it
    #[error("circuit breaker '{0}' is open")]
    Open(String),

    /// The operation ran and failed
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open(_))
    }
}

impl From<BreakerError<CacheError>> for CacheError {
    fn from(err: BreakerError<CacheError>) -> Self {
        match err {
            BreakerError::Open(name) => CacheError::CircuitOpen(name),
            BreakerError::Inner(inner) => inner,
        }
    }
}

// == Snapshot ==
/// Read-only view of a breaker for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
    pub total_failures: u64,
    pub rejected_calls: u64,
    pub seconds_since_last_failure: Option<f64>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
    total_failures: u64,
    rejected_calls: u64,
}

// == Circuit Breaker ==
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        let config = BreakerConfig {
            failure_threshold: config.failure_threshold.max(1),
            ..config
        };
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                trial_in_flight: false,
                total_failures: 0,
                rejected_calls: 0,
            }),
        }
    }

    // == Call ==
    /// Runs `operation` unless the circuit is open.
    ///
    /// Rejections return [`BreakerError::Open`] without invoking the
    /// operation; operation errors come back unchanged as
    /// [`BreakerError::Inner`] after being counted.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(permit) = self.try_acquire() else {
            return Err(BreakerError::Open(self.name.clone()));
        };

        let result = operation().await;
        permit.settle(result.is_ok());
        result.map_err(BreakerError::Inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: state.state,
            failure_count: state.failure_count,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_secs: self.config.recovery_timeout.as_secs_f64(),
            total_failures: state.total_failures,
            rejected_calls: state.rejected_calls,
            seconds_since_last_failure: state.last_failure.map(|t| t.elapsed().as_secs_f64()),
        }
    }

    /// Forces the breaker back to closed with a zero failure count.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.state = CircuitState::Closed;
        state.failure_count = 0;
        state.last_failure = None;
        state.trial_in_flight = false;
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();
        match state.state {
            CircuitState::Closed => Some(Permit::new(self, false)),
            CircuitState::Open => {
                let recovered = state
                    .last_failure
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout);
                if recovered {
                    info!(breaker = %self.name, "circuit half-open, allowing trial call");
                    state.state = CircuitState::HalfOpen;
                    state.trial_in_flight = true;
                    Some(Permit::new(self, true))
                } else {
                    state.rejected_calls += 1;
                    None
                }
            }
            CircuitState::HalfOpen if !state.trial_in_flight => {
                state.trial_in_flight = true;
                Some(Permit::new(self, true))
            }
            CircuitState::HalfOpen => {
                state.rejected_calls += 1;
                None
            }
        }
    }

    fn record_success(&self, trial: bool) {
        let mut state = self.lock();
        if trial {
            info!(breaker = %self.name, "trial call succeeded, circuit closed");
            state.state = CircuitState::Closed;
            state.failure_count = 0;
            state.trial_in_flight = false;
        } else if state.state == CircuitState::Closed {
            state.failure_count = 0;
        }
    }

    fn record_failure(&self, trial: bool) {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.total_failures += 1;
        state.last_failure = Some(Instant::now());

        if trial {
            warn!(breaker = %self.name, "trial call failed, circuit re-opened");
            state.state = CircuitState::Open;
            state.trial_in_flight = false;
        } else if state.state == CircuitState::Closed
            && state.failure_count >= self.config.failure_threshold
        {
            warn!(
                breaker = %self.name,
                failures = state.failure_count,
                "failure threshold reached, circuit opened"
            );
            state.state = CircuitState::Open;
        }
    }
}

// == Permit ==
/// Admission for one call. A trial permit dropped without settling (the
/// caller was cancelled) hands the trial slot back.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    fn settle(mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.record_success(self.trial);
        } else {
            self.breaker.record_failure(self.trial);
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.lock().trial_in_flight = false;
        }
    }
}
