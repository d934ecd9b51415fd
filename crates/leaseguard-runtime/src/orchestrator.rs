//! Contradiction detector orchestration.
//!
//! The detector:
//! - Normalizes clause inputs once
//! - Enumerates every unordered pair `(i, j)`, `i < j`
//! - Judges pairs with the configured strategy
//! - Fans model-based judgments out over a bounded in-flight window
//! - Emits findings in ascending pair order regardless of completion order
//! - Stops issuing requests on timeout or cancellation and returns what it has
//!
//! No error escapes an analysis. Oracle trouble shows up as fewer findings
//! and a higher `pairs_unknown` count.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

use leaseguard_core::{
    analyze_statistical_report, normalize_clauses, pair_candidates, AnalysisReport,
    AnalysisStats, Clause, ClauseInput, ClausePair, ContradictionFinding, StatisticalDetector,
    StrategyKind,
};

use crate::cache::{JudgmentCache, PairKey};
use crate::config::RuntimeConfig;
use crate::providers::{Judgment, NliOracle, OracleError};
use crate::resilience::{CallBudget, CircuitBreaker, CircuitState};
use crate::RuntimeError;

/// Result of judging one pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Judged(Judgment),
    Unknown(UnknownReason),
}

/// Why a pair has no judgment. None of these mean "not a contradiction".
#[derive(Debug, Clone, PartialEq)]
pub enum UnknownReason {
    OracleFailed(OracleError),
    CircuitOpen,
    BudgetExhausted,
    NoOracle,
}

/// Cooperative cancellation for an in-progress analysis.
///
/// Cloning shares the flag. Cancelling stops new oracle requests; the
/// analysis then returns the findings gathered so far.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { flag: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the flag is set. Never resolves if the sender goes away.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Detects contradictory clause pairs.
///
/// # Architecture
/// - Statistical strategy: one TF-IDF matrix, no I/O
/// - Model-based strategy: bounded fan-out over an [`NliOracle`]
/// - Resilience: per-request retries inside the oracle client, an optional
///   circuit breaker, a per-analysis judgment budget and a judgment cache
pub struct ContradictionDetector {
    config: RuntimeConfig,
    statistical: StatisticalDetector,
    oracle: Option<Arc<dyn NliOracle>>,
    circuit_breaker: Option<CircuitBreaker>,
    cache: Option<JudgmentCache>,
}

impl std::fmt::Debug for ContradictionDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContradictionDetector")
            .field("strategy", &self.config.strategy)
            .field("oracle", &self.oracle.as_ref().map(|o| o.name().to_string()))
            .field("circuit", &self.circuit_state())
            .finish()
    }
}

impl ContradictionDetector {
    /// Create a detector.
    ///
    /// The model-based strategy requires an oracle.
    pub fn new(
        config: RuntimeConfig,
        oracle: Option<Arc<dyn NliOracle>>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        if config.strategy == StrategyKind::ModelBased && oracle.is_none() {
            return Err(RuntimeError::OracleNotConfigured(
                "model-based strategy needs an NLI oracle".to_string(),
            ));
        }

        let statistical = StatisticalDetector::new(config.similarity_threshold)?
            .with_vectorizer(config.vectorizer.clone());

        Ok(Self {
            circuit_breaker: config
                .circuit_breaker
                .enabled
                .then(|| CircuitBreaker::new(config.circuit_breaker.clone())),
            cache: JudgmentCache::from_config(&config.cache),
            statistical,
            oracle,
            config,
        })
    }

    /// Create a detector, building the Hugging Face oracle client from
    /// `config.oracle` when the strategy needs one.
    #[cfg(feature = "huggingface")]
    pub fn from_config(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        use crate::providers::{HuggingFaceTransport, JudgmentClient};

        let oracle: Option<Arc<dyn NliOracle>> = match config.strategy {
            StrategyKind::Statistical => None,
            StrategyKind::ModelBased => {
                let transport = Arc::new(HuggingFaceTransport::from_config(&config.oracle)?);
                Some(Arc::new(JudgmentClient::new(
                    transport,
                    config.oracle.retry.clone(),
                )))
            }
        };

        Self::new(config, oracle)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Breaker state, or `None` when the breaker is disabled.
    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.circuit_breaker.as_ref().map(CircuitBreaker::state)
    }

    /// Clear the circuit breaker and judgment cache.
    pub fn reset(&self) {
        if let Some(breaker) = &self.circuit_breaker {
            breaker.reset();
        }
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// Analyze clauses and return contradiction findings in pair order.
    pub async fn analyze<I, T>(&self, inputs: I) -> Vec<ContradictionFinding>
    where
        I: IntoIterator<Item = T>,
        T: Into<ClauseInput>,
    {
        self.analyze_report(inputs).await.contradictions
    }

    /// Analyze clauses and return the full report.
    pub async fn analyze_report<I, T>(&self, inputs: I) -> AnalysisReport
    where
        I: IntoIterator<Item = T>,
        T: Into<ClauseInput>,
    {
        self.analyze_with_cancel(inputs, &CancelHandle::new()).await
    }

    /// Analyze clauses, stopping early if `cancel` fires.
    pub async fn analyze_with_cancel<I, T>(&self, inputs: I, cancel: &CancelHandle) -> AnalysisReport
    where
        I: IntoIterator<Item = T>,
        T: Into<ClauseInput>,
    {
        let clauses = normalize_clauses(inputs);

        let report = match self.config.strategy {
            StrategyKind::Statistical => analyze_statistical_report(clauses, &self.statistical),
            StrategyKind::ModelBased => self.analyze_model_based(clauses, cancel).await,
        };

        tracing::info!(
            strategy = %report.strategy,
            clauses = report.clauses.len(),
            pairs = report.stats.pairs_considered,
            findings = report.contradictions.len(),
            unknown = report.stats.pairs_unknown,
            not_started = report.stats.pairs_not_started,
            cancelled = report.stats.cancelled,
            "Contradiction analysis complete"
        );

        report
    }

    async fn analyze_model_based(&self, clauses: Vec<Clause>, cancel: &CancelHandle) -> AnalysisReport {
        let pairs: Vec<ClausePair> = pair_candidates(clauses.len()).collect();
        let mut outcomes: Vec<Option<PairOutcome>> = vec![None; pairs.len()];
        let mut cancelled_early = false;

        if !pairs.is_empty() {
            cancelled_early = self.judge_all(&clauses, &pairs, &mut outcomes, cancel).await;
        }

        let threshold = self.config.contradiction_threshold;
        let mut stats = AnalysisStats {
            pairs_considered: pairs.len(),
            cancelled: cancelled_early,
            ..Default::default()
        };
        let mut findings = Vec::new();

        for (pair, outcome) in pairs.iter().zip(outcomes) {
            match outcome {
                Some(PairOutcome::Judged(judgment)) => {
                    stats.pairs_judged += 1;
                    let confidence = judgment.contradiction();
                    if confidence > threshold {
                        findings.push(ContradictionFinding::scored(
                            clauses[pair.first].text.clone(),
                            clauses[pair.second].text.clone(),
                            confidence,
                        ));
                    }
                }
                Some(PairOutcome::Unknown(_)) => stats.pairs_unknown += 1,
                None => stats.pairs_not_started += 1,
            }
        }

        AnalysisReport::new(StrategyKind::ModelBased, clauses, findings, stats)
    }

    /// Judge every pair with at most `concurrency` requests in flight.
    ///
    /// Fills `outcomes` by pair index. Returns true if a timeout or
    /// cancellation cut the run short.
    async fn judge_all(
        &self,
        clauses: &[Clause],
        pairs: &[ClausePair],
        outcomes: &mut [Option<PairOutcome>],
        cancel: &CancelHandle,
    ) -> bool {
        let Some(oracle) = self.oracle.as_deref() else {
            tracing::warn!("No oracle configured, every pair is unknown");
            for outcome in outcomes.iter_mut() {
                *outcome = Some(PairOutcome::Unknown(UnknownReason::NoOracle));
            }
            return false;
        };

        let budget = CallBudget::new(self.config.max_oracle_calls);
        let deadline = self.config.analysis_timeout.map(|t| Instant::now() + t);
        let concurrency = self.config.concurrency.max(1);

        let mut cancel_rx = cancel.subscribe();
        let cancel_wait = cancelled(&mut cancel_rx);
        tokio::pin!(cancel_wait);

        let deadline_wait = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline_wait);

        let budget = &budget;
        let mut in_flight = FuturesUnordered::new();
        let mut next = 0;

        loop {
            while next < pairs.len() && in_flight.len() < concurrency {
                if cancel.is_cancelled() {
                    tracing::warn!(started = next, "Analysis cancelled");
                    return true;
                }
                if deadline.is_some_and(|at| Instant::now() >= at) {
                    tracing::warn!(started = next, "Analysis timed out");
                    return true;
                }

                let index = next;
                let pair = pairs[index];
                next += 1;
                in_flight.push(async move {
                    (index, self.judge_pair(oracle, clauses, pair, budget).await)
                });
            }

            if in_flight.is_empty() {
                return false;
            }

            tokio::select! {
                Some((index, outcome)) = in_flight.next() => {
                    outcomes[index] = Some(outcome);
                }
                _ = &mut cancel_wait => {
                    tracing::warn!(in_flight = in_flight.len(), started = next, "Analysis cancelled");
                    return true;
                }
                _ = &mut deadline_wait => {
                    tracing::warn!(in_flight = in_flight.len(), started = next, "Analysis timed out");
                    return true;
                }
            }
        }
    }

    async fn judge_pair(
        &self,
        oracle: &dyn NliOracle,
        clauses: &[Clause],
        pair: ClausePair,
        budget: &CallBudget,
    ) -> PairOutcome {
        let premise = clauses[pair.first].text.as_str();
        let hypothesis = clauses[pair.second].text.as_str();
        let key = PairKey::new(premise, hypothesis);

        if let Some(cache) = &self.cache {
            if let Some(judgment) = cache.get(&key).await {
                tracing::debug!(%pair, "Judgment served from cache");
                return PairOutcome::Judged(judgment);
            }
        }

        if self.circuit_breaker.as_ref().is_some_and(CircuitBreaker::is_open) {
            tracing::debug!(%pair, "Circuit open, skipping pair");
            return PairOutcome::Unknown(UnknownReason::CircuitOpen);
        }

        if !budget.try_acquire() {
            tracing::debug!(%pair, "Judgment budget spent, skipping pair");
            return PairOutcome::Unknown(UnknownReason::BudgetExhausted);
        }

        match oracle.judge(premise, hypothesis).await {
            Ok(judgment) => {
                if let Some(breaker) = &self.circuit_breaker {
                    breaker.record_success();
                }
                tracing::debug!(%pair, contradiction = judgment.contradiction(), "Pair judged");
                if let Some(cache) = &self.cache {
                    cache.insert(key, judgment.clone()).await;
                }
                PairOutcome::Judged(judgment)
            }
            Err(e) => {
                // Only endpoint-level failures count toward opening the circuit.
                if let Some(breaker) = &self.circuit_breaker {
                    if e.is_endpoint_failure() {
                        breaker.record_failure();
                    }
                }
                tracing::warn!(%pair, oracle = oracle.name(), error = %e, "Pair judgment unknown");
                PairOutcome::Unknown(UnknownReason::OracleFailed(e))
            }
        }
    }
}

/// Builder for ContradictionDetector.
pub struct ContradictionDetectorBuilder {
    config: RuntimeConfig,
    oracle: Option<Arc<dyn NliOracle>>,
}

impl ContradictionDetectorBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            oracle: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn NliOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn build(self) -> Result<ContradictionDetector, RuntimeError> {
        ContradictionDetector::new(self.config, self.oracle)
    }
}

impl Default for ContradictionDetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
