//! Output types shared by every detection strategy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clause::Clause;

/// Which detection strategy produced a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Low TF-IDF similarity flags a possible contradiction
    #[default]
    Statistical,

    /// High NLI contradiction probability flags a contradiction
    ModelBased,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Statistical => write!(f, "statistical"),
            StrategyKind::ModelBased => write!(f, "model-based"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "statistical" | "similarity" | "tfidf" => Ok(StrategyKind::Statistical),
            "model-based" | "model" | "nli" => Ok(StrategyKind::ModelBased),
            other => Err(format!("unknown strategy '{}'", other)),
        }
    }
}

/// A pair of clauses reported as possibly contradictory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionFinding {
    pub clause_1: String,
    pub clause_2: String,

    /// Oracle contradiction probability; absent on the statistical path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ContradictionFinding {
    /// A finding from the statistical path (membership only).
    pub fn flagged(clause_1: impl Into<String>, clause_2: impl Into<String>) -> Self {
        Self {
            clause_1: clause_1.into(),
            clause_2: clause_2.into(),
            confidence: None,
        }
    }

    /// A finding from the model-based path.
    pub fn scored(clause_1: impl Into<String>, clause_2: impl Into<String>, confidence: f64) -> Self {
        Self {
            clause_1: clause_1.into(),
            clause_2: clause_2.into(),
            confidence: Some(confidence),
        }
    }
}

/// Per-analysis bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// `n*(n-1)/2` for `n` usable clauses
    pub pairs_considered: usize,

    /// Pairs that received a definitive score or judgment
    pub pairs_judged: usize,

    /// Pairs whose judgment is unknown (oracle failure, open circuit, budget)
    pub pairs_unknown: usize,

    /// Pairs never attempted because the analysis was cancelled
    pub pairs_not_started: usize,

    /// Whether a timeout or cancellation cut the analysis short
    pub cancelled: bool,
}

/// Full result of one analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub strategy: StrategyKind,
    pub clauses: Vec<Clause>,
    pub contradictions: Vec<ContradictionFinding>,
    pub stats: AnalysisStats,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn new(
        strategy: StrategyKind,
        clauses: Vec<Clause>,
        contradictions: Vec<ContradictionFinding>,
        stats: AnalysisStats,
    ) -> Self {
        Self {
            strategy,
            clauses,
            contradictions,
            stats,
            analyzed_at: Utc::now(),
        }
    }
}
