//! Circuit breaker around the NLI oracle.
//!
//! Off unless enabled in config. When judgments keep exhausting their
//! retries against an overloaded or unreachable endpoint, the circuit opens
//! and remaining pairs are skipped as unknown. Failures that concern a single
//! pair (a rejected request, a malformed body) never reach the breaker.

use parking_lot::RwLock;
use std::time::{Duration, Instant};

use crate::config::duration_str;

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Whether the detector uses a breaker at all
    pub enabled: bool,

    /// Endpoint failures before opening the circuit
    pub failure_threshold: u32,

    /// Time before letting a trial request through
    #[serde(with = "duration_str")]
    pub recovery_timeout: Duration,

    /// Trial successes needed to close the circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("circuit_breaker.failure_threshold must be at least 1".to_string());
        }
        if self.success_threshold == 0 {
            return Err("circuit_breaker.success_threshold must be at least 1".to_string());
        }
        Ok(())
    }
}

/// State of the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation
    Closed { failures: u32 },

    /// All calls bypass the oracle
    Open { opened_at: Instant },

    /// Trial calls allowed
    HalfOpen { successes: u32 },
}

/// Circuit breaker shared by every pair of an analysis (and across analyses
/// made with the same detector).
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed { failures: 0 }),
            config,
        }
    }

    /// Returns true if calls should bypass the oracle.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.write();
        match *state {
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    *state = CircuitState::HalfOpen { successes: 0 };
                    tracing::info!("Circuit transitioning to half-open for recovery test");
                    false
                } else {
                    true
                }
            }
            CircuitState::HalfOpen { .. } | CircuitState::Closed { .. } => false,
        }
    }

    /// Record a successful judgment.
    pub fn record_success(&self) {
        let mut state = self.state.write();
        match *state {
            CircuitState::HalfOpen { successes } => {
                if successes + 1 >= self.config.success_threshold {
                    *state = CircuitState::Closed { failures: 0 };
                    tracing::info!("Circuit closed after successful recovery");
                } else {
                    *state = CircuitState::HalfOpen {
                        successes: successes + 1,
                    };
                }
            }
            CircuitState::Closed { .. } => {
                *state = CircuitState::Closed { failures: 0 };
            }
            CircuitState::Open { .. } => {}
        }
    }

    /// Record an endpoint-level failure.
    pub fn record_failure(&self) {
        let mut state = self.state.write();
        match *state {
            CircuitState::Closed { failures } => {
                if failures + 1 >= self.config.failure_threshold {
                    *state = CircuitState::Open {
                        opened_at: Instant::now(),
                    };
                    tracing::warn!(
                        failures = failures + 1,
                        "Circuit opened after repeated oracle failures"
                    );
                } else {
                    *state = CircuitState::Closed {
                        failures: failures + 1,
                    };
                }
            }
            CircuitState::HalfOpen { .. } => {
                *state = CircuitState::Open {
                    opened_at: Instant::now(),
                };
                tracing::warn!("Circuit reopened after failed recovery attempt");
            }
            CircuitState::Open { .. } => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.read().clone()
    }

    /// Reset to closed.
    pub fn reset(&self) {
        *self.state.write() = CircuitState::Closed { failures: 0 };
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, recovery: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            enabled: true,
            failure_threshold,
            recovery_timeout: recovery,
            success_threshold: 1,
        })
    }

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::default();
        assert!(!cb.is_open());
        assert_eq!(cb.state(), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_circuit_opens_after_failures() {
        let cb = breaker(2, Duration::from_secs(30));

        cb.record_failure();
        assert!(!cb.is_open());

        cb.record_failure();
        assert!(cb.is_open());
    }

    #[test]
    fn test_success_resets_failures() {
        let cb = breaker(3, Duration::from_secs(30));

        cb.record_failure();
        cb.record_failure();
        cb.record_success();

        cb.record_failure();
        cb.record_failure();
        assert!(!cb.is_open());
    }

    #[test]
    fn test_recovery_through_half_open() {
        let cb = breaker(1, Duration::ZERO);

        cb.record_failure();
        assert!(matches!(cb.state(), CircuitState::Open { .. }));

        // Zero recovery timeout: the next check lets a trial through.
        assert!(!cb.is_open());
        assert_eq!(cb.state(), CircuitState::HalfOpen { successes: 0 });

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_failed_trial_reopens() {
        let cb = breaker(1, Duration::ZERO);
        cb.record_failure();
        assert!(!cb.is_open());

        cb.record_failure();
        assert!(matches!(cb.state(), CircuitState::Open { .. }));
    }

    #[test]
    fn test_disabled_by_default() {
        assert!(!CircuitBreakerConfig::default().enabled);
    }

    #[test]
    fn test_config_validation() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());
        let config = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
