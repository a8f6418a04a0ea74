//! Resilience Module
//!
//! Failure isolation for calls into flaky dependencies.

mod circuit_breaker;

pub use circuit_breaker::{
    BreakerConfig, BreakerError, BreakerSnapshot, CircuitBreaker, CircuitState,
};
