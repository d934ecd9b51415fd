//! Resilience patterns for leaseguard-runtime.
//!
//! This module provides:
//! - Retry state machine with exponential and flat backoff
//! - Circuit breaker around the oracle endpoint
//! - Per-analysis oracle call budget

mod budget;
mod circuit_breaker;
mod retry;

pub use budget::CallBudget;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{RetryMachine, RetryPolicy, RetryState};
