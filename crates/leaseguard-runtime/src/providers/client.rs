//! Retrying NLI client.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Judgment, NliOracle, NliTransport, OracleError, ZeroShotRequest};
use crate::resilience::{RetryMachine, RetryPolicy, RetryState};

/// Remote judgment client: a transport plus the retry state machine.
///
/// Each `judge` call runs its own [`RetryMachine`], so concurrent pairs never
/// share backoff state.
pub struct JudgmentClient<T: ?Sized> {
    transport: Arc<T>,
    policy: RetryPolicy,
}

impl<T: NliTransport + ?Sized> JudgmentClient<T> {
    pub fn new(transport: Arc<T>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

impl<T: NliTransport + ?Sized> std::fmt::Debug for JudgmentClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgmentClient")
            .field("transport", &self.transport.name())
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl<T: NliTransport + ?Sized> NliOracle for JudgmentClient<T> {
    async fn judge(&self, premise: &str, hypothesis: &str) -> Result<Judgment, OracleError> {
        let request = ZeroShotRequest::for_pair(premise, hypothesis);
        let mut retry = RetryMachine::new(self.policy.clone());

        loop {
            let attempt = retry.attempt();
            let error = match self.transport.send(&request).await {
                Ok(response) => {
                    retry.record_success();
                    // Malformed bodies are never retried.
                    return response.into_judgment().inspect_err(|e| {
                        tracing::warn!(attempt, error = %e, "Oracle returned a malformed response");
                    });
                }
                Err(e) => e,
            };

            match retry.record_failure(error.class(), error.retry_after()) {
                Some(delay) => {
                    tracing::warn!(
                        oracle = self.transport.name(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay = ?delay,
                        error = %error,
                        "Oracle request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry.resume();
                }
                None => {
                    return Err(match retry.state() {
                        RetryState::ExhaustedRetryable { attempts } => {
                            tracing::error!(
                                oracle = self.transport.name(),
                                attempts,
                                error = %error,
                                "Oracle retries exhausted"
                            );
                            OracleError::RetriesExhausted {
                                attempts,
                                last: error.to_string(),
                            }
                        }
                        _ => {
                            tracing::error!(
                                oracle = self.transport.name(),
                                attempt,
                                error = %error,
                                "Oracle request failed permanently"
                            );
                            error
                        }
                    });
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.transport.name()
    }
}
