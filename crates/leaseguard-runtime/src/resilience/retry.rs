//! Retry state machine for oracle requests.
//!
//! ```text
//!              success
//! Attempting ───────────► Succeeded
//!   │  ▲   │ permanent
//!   │  │   └────────────► FailedPermanent
//!   │  │ resume
//!   │  │
//!   │ Backoff ◄── retryable, attempts left
//!   │
//!   └── retryable, no attempts left ──► ExhaustedRetryable
//! ```
//!
//! Overload failures (429/503) wait `initial, 2×initial, 4×initial, …`;
//! network failures wait a flat `initial`. Waits are capped at `max_wait`.
//! The machine never schedules a wait after the final attempt.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::duration_str;
use crate::providers::FailureClass;

/// Retry limits for one oracle judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total requests per judgment, including the first
    pub max_attempts: u32,

    /// First backoff wait, and the flat wait for network failures
    #[serde(with = "duration_str")]
    pub initial_wait: Duration,

    /// Upper bound on any single wait
    #[serde(with = "duration_str")]
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential wait before the retry following the `n`th overload
    /// failure (0-based).
    pub fn overload_delay(&self, n: u32) -> Duration {
        let factor = 1u32.checked_shl(n).unwrap_or(u32::MAX);
        self.initial_wait.saturating_mul(factor).min(self.max_wait)
    }

    /// Flat wait after a network failure.
    pub fn network_delay(&self) -> Duration {
        self.initial_wait.min(self.max_wait)
    }
}

/// State of one judgment's retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Request number `attempt` (1-based) is in flight
    Attempting { attempt: u32 },

    /// Waiting `delay` after failed attempt `attempt`
    Backoff { attempt: u32, delay: Duration },

    Succeeded { attempt: u32 },

    /// Every attempt failed with a retryable error
    ExhaustedRetryable { attempts: u32 },

    /// Attempt `attempt` failed with a non-retryable error
    FailedPermanent { attempt: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. }
                | RetryState::ExhaustedRetryable { .. }
                | RetryState::FailedPermanent { .. }
        )
    }
}

/// Drives [`RetryState`] transitions from failure classifications.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: RetryState,
    overload_failures: u32,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Attempting { attempt: 1 },
            overload_failures: 0,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Current attempt number (1-based).
    pub fn attempt(&self) -> u32 {
        match self.state {
            RetryState::Attempting { attempt }
            | RetryState::Backoff { attempt, .. }
            | RetryState::Succeeded { attempt }
            | RetryState::FailedPermanent { attempt } => attempt,
            RetryState::ExhaustedRetryable { attempts } => attempts,
        }
    }

    /// The in-flight attempt succeeded.
    pub fn record_success(&mut self) {
        if let RetryState::Attempting { attempt } = self.state {
            self.state = RetryState::Succeeded { attempt };
        }
    }

    /// The in-flight attempt failed.
    ///
    /// Returns the wait before the next attempt, or `None` if the machine
    /// reached a terminal state.
    pub fn record_failure(&mut self, class: FailureClass, retry_after: Option<Duration>) -> Option<Duration> {
        let RetryState::Attempting { attempt } = self.state else {
            return None;
        };

        if class == FailureClass::Permanent {
            self.state = RetryState::FailedPermanent { attempt };
            return None;
        }

        if attempt >= self.policy.max_attempts {
            self.state = RetryState::ExhaustedRetryable { attempts: attempt };
            return None;
        }

        let delay = match class {
            FailureClass::Overloaded => {
                let delay = self.policy.overload_delay(self.overload_failures);
                self.overload_failures += 1;
                match retry_after {
                    Some(hint) => delay.max(hint.min(self.policy.max_wait)),
                    None => delay,
                }
            }
            _ => self.policy.network_delay(),
        };

        self.state = RetryState::Backoff { attempt, delay };
        Some(delay)
    }

    /// Leave backoff and start the next attempt.
    pub fn resume(&mut self) {
        if let RetryState::Backoff { attempt, .. } = self.state {
            self.state = RetryState::Attempting { attempt: attempt + 1 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, initial_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_wait: Duration::from_millis(initial_ms),
            max_wait: Duration::from_secs(60),
        }
    }

    /// Feed `class` failures until the machine stops; collect the waits.
    fn drive(machine: &mut RetryMachine, class: FailureClass) -> Vec<Duration> {
        let mut waits = Vec::new();
        while let Some(delay) = machine.record_failure(class, None) {
            waits.push(delay);
            machine.resume();
        }
        waits
    }

    #[test]
    fn test_starts_attempting() {
        let machine = RetryMachine::new(RetryPolicy::default());
        assert_eq!(machine.state(), RetryState::Attempting { attempt: 1 });
        assert!(!machine.state().is_terminal());
    }

    #[test]
    fn test_overload_backoff_doubles() {
        let mut machine = RetryMachine::new(policy(4, 100));
        let waits = drive(&mut machine, FailureClass::Overloaded);

        assert_eq!(
            waits,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
        assert_eq!(machine.state(), RetryState::ExhaustedRetryable { attempts: 4 });
    }

    #[test]
    fn test_network_wait_is_flat() {
        let mut machine = RetryMachine::new(policy(4, 250));
        let waits = drive(&mut machine, FailureClass::Network);
        assert_eq!(waits, vec![Duration::from_millis(250); 3]);
        assert_eq!(machine.state(), RetryState::ExhaustedRetryable { attempts: 4 });
    }

    #[test]
    fn test_mixed_failures_only_overload_doubles() {
        let mut machine = RetryMachine::new(policy(5, 100));

        assert_eq!(machine.record_failure(FailureClass::Overloaded, None), Some(Duration::from_millis(100)));
        machine.resume();
        assert_eq!(machine.record_failure(FailureClass::Network, None), Some(Duration::from_millis(100)));
        machine.resume();
        assert_eq!(machine.record_failure(FailureClass::Overloaded, None), Some(Duration::from_millis(200)));
        machine.resume();
        assert_eq!(machine.attempt(), 4);
    }

    #[test]
    fn test_permanent_failure_stops_immediately() {
        let mut machine = RetryMachine::new(policy(5, 100));
        assert_eq!(machine.record_failure(FailureClass::Permanent, None), None);
        assert_eq!(machine.state(), RetryState::FailedPermanent { attempt: 1 });
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_single_attempt_policy_never_waits() {
        let mut machine = RetryMachine::new(policy(1, 100));
        assert_eq!(machine.record_failure(FailureClass::Overloaded, None), None);
        assert_eq!(machine.state(), RetryState::ExhaustedRetryable { attempts: 1 });
    }

    #[test]
    fn test_success_after_retry() {
        let mut machine = RetryMachine::new(policy(3, 100));
        machine.record_failure(FailureClass::Network, None);
        machine.resume();
        machine.record_success();
        assert_eq!(machine.state(), RetryState::Succeeded { attempt: 2 });
    }

    #[test]
    fn test_retry_after_raises_wait() {
        let mut machine = RetryMachine::new(policy(3, 100));
        let delay = machine.record_failure(FailureClass::Overloaded, Some(Duration::from_secs(5)));
        assert_eq!(delay, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_wait_capped_at_max() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(3),
        };
        assert_eq!(policy.overload_delay(0), Duration::from_secs(1));
        assert_eq!(policy.overload_delay(1), Duration::from_secs(2));
        assert_eq!(policy.overload_delay(2), Duration::from_secs(3));
        assert_eq!(policy.overload_delay(40), Duration::from_secs(3));
    }

    #[test]
    fn test_failure_outside_attempt_is_ignored() {
        let mut machine = RetryMachine::new(policy(3, 100));
        machine.record_failure(FailureClass::Network, None);
        // Still in backoff: a second failure report changes nothing.
        assert_eq!(machine.record_failure(FailureClass::Network, None), None);
        assert!(matches!(machine.state(), RetryState::Backoff { attempt: 1, .. }));
    }
}
