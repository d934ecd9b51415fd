//! # leaseguard-runtime
//!
//! Model-based contradiction detection for Leaseguard.
//!
//! This crate drives a remote natural-language-inference model to judge
//! whether two lease clauses contradict each other, and orchestrates
//! analyses across every clause pair.
//!
//! ## Important
//!
//! The statistical strategy in `leaseguard-core` is fully deterministic and
//! never touches the network. This crate adds:
//! - The [`NliOracle`] seam and a Hugging Face transport
//! - Retries with exponential backoff on overload, flat waits on network errors
//! - Circuit breaking, per-analysis call budgets and judgment caching
//! - Bounded concurrency with ordered results, timeouts and cancellation
//!
//! Oracle failures never abort an analysis. A pair whose judgment fails is
//! "unknown" and is left out of the findings.
//!
//! ## Example
//!
//! ```rust,ignore
//! use leaseguard_runtime::{ContradictionDetector, RuntimeConfig};
//! use leaseguard_core::StrategyKind;
//!
//! let config = RuntimeConfig {
//!     strategy: StrategyKind::ModelBased,
//!     ..Default::default()
//! };
//! let detector = ContradictionDetector::from_config(config)?;
//!
//! let findings = detector
//!     .analyze([
//!         "Tenant may sublet freely.",
//!         "Tenant may not sublet under any circumstance.",
//!     ])
//!     .await;
//! ```

pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod resilience;

use thiserror::Error;

pub use cache::JudgmentCache;
pub use config::{CacheConfig, ConfigError, OracleConfig, RuntimeConfig, DEFAULT_ORACLE_ENDPOINT};
pub use orchestrator::{
    CancelHandle, ContradictionDetector, ContradictionDetectorBuilder, PairOutcome, UnknownReason,
};
pub use providers::{Judgment, JudgmentClient, NliLabel, NliOracle, NliTransport, OracleError};
pub use resilience::{CircuitBreakerConfig, RetryPolicy};

#[cfg(feature = "huggingface")]
pub use providers::HuggingFaceTransport;

/// Errors from building a detector.
///
/// Analyses themselves never fail; see [`ContradictionDetector::analyze`].
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("NLI oracle not configured: {0}")]
    OracleNotConfigured(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Oracle setup failed: {0}")]
    Oracle(#[from] OracleError),
}

impl From<leaseguard_core::DetectorError> for RuntimeError {
    fn from(e: leaseguard_core::DetectorError) -> Self {
        RuntimeError::Config(e.into())
    }
}
