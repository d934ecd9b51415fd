//! Report rendering.

use anyhow::Result;
use clap::ValueEnum;
use leaseguard_core::{AnalysisReport, Clause, SimilarityMatrix};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(report_text(report)?),
    }
}

fn report_text(report: &AnalysisReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let stats = &report.stats;

    writeln!(
        out,
        "Strategy: {}  Clauses: {}  Pairs: {}",
        report.strategy,
        report.clauses.len(),
        stats.pairs_considered
    )?;
    if stats.pairs_unknown > 0 || stats.pairs_not_started > 0 {
        writeln!(
            out,
            "Unjudged pairs: {} unknown, {} not started{}",
            stats.pairs_unknown,
            stats.pairs_not_started,
            if stats.cancelled { " (stopped early)" } else { "" }
        )?;
    }

    if report.contradictions.is_empty() {
        writeln!(out, "No contradictions found.")?;
        return Ok(out);
    }

    writeln!(out, "Contradictions: {}", report.contradictions.len())?;
    for (n, finding) in report.contradictions.iter().enumerate() {
        match finding.confidence {
            Some(confidence) => {
                writeln!(out, "\n{}. confidence {:.3}", n + 1, confidence)?;
            }
            None => {
                writeln!(out, "\n{}. low similarity", n + 1)?;
            }
        }
        writeln!(out, "   - {}", finding.clause_1)?;
        writeln!(out, "   - {}", finding.clause_2)?;
    }
    Ok(out)
}

#[derive(Serialize)]
struct SimilarityOutput<'a> {
    clauses: Vec<&'a str>,
    matrix: Vec<&'a [f64]>,
}

/// Render the similarity matrix alongside the clause texts it indexes.
pub fn render_similarity(clauses: &[Clause], matrix: Option<&SimilarityMatrix>) -> Result<String> {
    let output = SimilarityOutput {
        clauses: clauses.iter().map(|c| c.text.as_str()).collect(),
        matrix: matrix.map(|m| m.rows().collect()).unwrap_or_default(),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaseguard_core::{AnalysisStats, ContradictionFinding, StrategyKind};

    fn report(contradictions: Vec<ContradictionFinding>, stats: AnalysisStats) -> AnalysisReport {
        AnalysisReport::new(StrategyKind::ModelBased, Vec::new(), contradictions, stats)
    }

    #[test]
    fn test_text_lists_findings() {
        let text = report_text(&report(
            vec![ContradictionFinding::scored("May sublet.", "May not sublet.", 0.95)],
            AnalysisStats::default(),
        ))
        .unwrap();

        assert!(text.contains("Contradictions: 1"));
        assert!(text.contains("confidence 0.950"));
        assert!(text.contains("   - May not sublet."));
        assert!(!text.contains("Unjudged"));
    }

    #[test]
    fn test_text_reports_unjudged_pairs() {
        let stats = AnalysisStats {
            pairs_considered: 3,
            pairs_unknown: 1,
            pairs_not_started: 2,
            cancelled: true,
            ..Default::default()
        };
        let text = report_text(&report(Vec::new(), stats)).unwrap();

        assert!(text.contains("1 unknown, 2 not started (stopped early)"));
        assert!(text.contains("No contradictions found."));
    }

    #[test]
    fn test_text_format_through_render() {
        let text = render_report(
            &report(
                vec![ContradictionFinding::flagged("Rent is due.", "No pets.")],
                AnalysisStats::default(),
            ),
            OutputFormat::Text,
        )
        .unwrap();
        assert!(text.starts_with("Strategy: model-based"));
        assert!(text.contains("1. low similarity"));
    }

    #[test]
    fn test_json_report() {
        let json = render_report(&report(Vec::new(), AnalysisStats::default()), OutputFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["strategy"], "model-based");
        assert!(value["contradictions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_similarity_without_matrix() {
        let clauses = vec![Clause::new("Only clause.").unwrap()];
        let json = render_similarity(&clauses, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["clauses"][0], "Only clause.");
        assert!(value["matrix"].as_array().unwrap().is_empty());
    }
}
