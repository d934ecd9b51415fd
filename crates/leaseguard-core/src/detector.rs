//! Statistical contradiction detection.
//!
//! Two clauses with little lexical overlap are flagged for review. This is a
//! coarse signal: it catches clauses on unrelated or conflicting topics and
//! attaches no confidence. The model-based strategy lives in
//! `leaseguard-runtime` because it needs network access.

use crate::clause::Clause;
use crate::pairs::{pair_candidates, pair_count};
use crate::similarity::{TfIdfVectorizer, VectorizerConfig};
use crate::types::{AnalysisStats, ContradictionFinding};
use crate::DetectorError;

/// Default similarity below which a pair is flagged.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Default contradiction probability above which the model path reports a pair.
pub const DEFAULT_CONTRADICTION_THRESHOLD: f64 = 0.8;

/// Check that a threshold lies in `[0, 1]`.
pub fn validate_threshold(name: &'static str, value: f64) -> Result<f64, DetectorError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DetectorError::InvalidThreshold { name, value })
    }
}

/// Flags pairs whose TF-IDF similarity is strictly below a threshold.
#[derive(Debug, Clone)]
pub struct StatisticalDetector {
    threshold: f64,
    vectorizer: TfIdfVectorizer,
}

impl StatisticalDetector {
    pub fn new(threshold: f64) -> Result<Self, DetectorError> {
        Ok(Self {
            threshold: validate_threshold("similarity_threshold", threshold)?,
            vectorizer: TfIdfVectorizer::default(),
        })
    }

    pub fn with_vectorizer(mut self, config: VectorizerConfig) -> Self {
        self.vectorizer = TfIdfVectorizer::new(config);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn detect(&self, clauses: &[Clause]) -> Vec<ContradictionFinding> {
        self.detect_with_stats(clauses).0
    }

    /// Detect and report how many pairs were scored.
    pub fn detect_with_stats(&self, clauses: &[Clause]) -> (Vec<ContradictionFinding>, AnalysisStats) {
        // Clauses built by hand may bypass normalization; matrix indices must
        // line up with exactly the texts it scores.
        let texts: Vec<&str> = clauses
            .iter()
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .collect();
        let Some(matrix) = self.vectorizer.similarity_matrix(&texts) else {
            return (Vec::new(), AnalysisStats::default());
        };

        let findings: Vec<ContradictionFinding> = pair_candidates(matrix.size())
            .filter_map(|pair| {
                let score = matrix.get(pair.first, pair.second)?;
                tracing::trace!(%pair, score, "Scored pair");
                (score < self.threshold)
                    .then(|| ContradictionFinding::flagged(texts[pair.first], texts[pair.second]))
            })
            .collect();

        let considered = pair_count(matrix.size());
        tracing::debug!(
            clauses = matrix.size(),
            pairs = considered,
            flagged = findings.len(),
            threshold = self.threshold,
            "Statistical detection complete"
        );

        let stats = AnalysisStats {
            pairs_considered: considered,
            pairs_judged: considered,
            ..Default::default()
        };
        (findings, stats)
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            vectorizer: TfIdfVectorizer::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::normalize_clauses;

    #[test]
    fn test_threshold_validation() {
        assert!(StatisticalDetector::new(0.0).is_ok());
        assert!(StatisticalDetector::new(1.0).is_ok());
        assert!(StatisticalDetector::new(-0.1).is_err());
        assert!(StatisticalDetector::new(1.5).is_err());
        assert!(StatisticalDetector::new(f64::NAN).is_err());
    }

    #[test]
    fn test_blank_hand_built_clause_skipped() {
        let blank = Clause {
            text: "   ".to_string(),
            classification: None,
        };
        let clauses = vec![
            blank,
            Clause::new("Rent is $1000/month.").unwrap(),
            Clause::new("Rent is $1000/month.").unwrap(),
            Clause::new("Tenant may sublet freely.").unwrap(),
        ];

        let (findings, stats) = StatisticalDetector::default().detect_with_stats(&clauses);

        assert_eq!(stats.pairs_considered, 3);
        assert_eq!(
            findings,
            vec![
                ContradictionFinding::flagged("Rent is $1000/month.", "Tenant may sublet freely."),
                ContradictionFinding::flagged("Rent is $1000/month.", "Tenant may sublet freely."),
            ]
        );
    }

    #[test]
    fn test_low_similarity_pairs_flagged() {
        let clauses = normalize_clauses([
            "Rent is $1000/month.",
            "Rent is $1000/month.",
            "Tenant may sublet freely.",
        ]);
        let findings = StatisticalDetector::default().detect(&clauses);

        // Identical rent clauses are similar; each rent clause vs sublet is not.
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.confidence.is_none()));
        assert_eq!(findings[0].clause_1, "Rent is $1000/month.");
        assert_eq!(findings[0].clause_2, "Tenant may sublet freely.");
    }

    #[test]
    fn test_threshold_is_strict() {
        let clauses = normalize_clauses(["Rent is due.", "Rent is due."]);
        // Similarity is exactly 1.0, which is not below a 1.0 threshold.
        let detector = StatisticalDetector::new(1.0).unwrap();
        assert!(detector.detect(&clauses).is_empty());
    }

    #[test]
    fn test_fewer_than_two_clauses() {
        let detector = StatisticalDetector::default();
        assert!(detector.detect(&[]).is_empty());

        let (findings, stats) = detector.detect_with_stats(&normalize_clauses(["One."]));
        assert!(findings.is_empty());
        assert_eq!(stats.pairs_considered, 0);
    }

    #[test]
    fn test_stats_count_pairs() {
        let clauses = normalize_clauses(["a b", "c d", "e f", "g h"]);
        let (findings, stats) = StatisticalDetector::default().detect_with_stats(&clauses);
        // Single-letter tokens are dropped, so every vector is empty.
        assert_eq!(stats.pairs_considered, 6);
        assert_eq!(stats.pairs_judged, 6);
        assert_eq!(findings.len(), 6);
    }

    #[test]
    fn test_output_follows_enumeration_order() {
        let clauses = normalize_clauses(["alpha beta", "gamma delta", "epsilon zeta"]);
        let findings = StatisticalDetector::default().detect(&clauses);
        let pairs: Vec<_> = findings
            .iter()
            .map(|f| (f.clause_1.as_str(), f.clause_2.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("alpha beta", "gamma delta"),
                ("alpha beta", "epsilon zeta"),
                ("gamma delta", "epsilon zeta"),
            ]
        );
    }
}
