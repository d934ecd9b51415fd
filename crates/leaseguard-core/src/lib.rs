//! # leaseguard-core
//!
//! Deterministic building blocks for lease contradiction detection.
//!
//! This crate never touches the network. It provides:
//! - Clause normalization from heterogeneous upstream shapes
//! - Numbered-clause splitting for plain-text listings
//! - Unordered pair enumeration
//! - TF-IDF similarity scoring
//! - The statistical (low-similarity) contradiction strategy
//!
//! The model-based strategy, which calls a remote NLI oracle, lives in
//! `leaseguard-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use leaseguard_core::analyze_statistical;
//!
//! let findings = analyze_statistical([
//!     "Rent is $1000/month.",
//!     "Tenant may sublet freely.",
//! ]);
//! assert_eq!(findings.len(), 1);
//! assert!(findings[0].confidence.is_none());
//! ```

pub mod clause;
pub mod detector;
pub mod pairs;
pub mod similarity;
pub mod types;

// Re-export main types at crate root
pub use clause::{
    normalize_clauses, parse_clause_json, split_numbered_clauses, Clause, ClauseError,
    ClauseInput, ClauseRecord,
};
pub use detector::{
    validate_threshold, StatisticalDetector, DEFAULT_CONTRADICTION_THRESHOLD,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use pairs::{pair_candidates, pair_count, ClausePair};
pub use similarity::{
    similarity_matrix, SimilarityMatrix, StopWords, TfIdfVectorizer, VectorizerConfig,
};
pub use types::{AnalysisReport, AnalysisStats, ContradictionFinding, StrategyKind};

use thiserror::Error;

/// Errors from detector construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Run the statistical strategy with default settings.
///
/// Inputs are normalized first; fewer than two usable clauses yield an empty
/// result.
pub fn analyze_statistical<I, T>(inputs: I) -> Vec<ContradictionFinding>
where
    I: IntoIterator<Item = T>,
    T: Into<ClauseInput>,
{
    let clauses = normalize_clauses(inputs);
    StatisticalDetector::default().detect(&clauses)
}

/// Run the statistical strategy and wrap the result in a report.
pub fn analyze_statistical_report(
    clauses: Vec<Clause>,
    detector: &StatisticalDetector,
) -> AnalysisReport {
    let (findings, stats) = detector.detect_with_stats(&clauses);
    AnalysisReport::new(StrategyKind::Statistical, clauses, findings, stats)
}
