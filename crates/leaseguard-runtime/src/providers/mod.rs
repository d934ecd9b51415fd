//! NLI oracle abstractions for leaseguard-runtime.
//!
//! Two seams live here:
//! - [`NliOracle`]: "judge this pair of texts". The detector depends only on
//!   this trait, so tests can swap in a scripted oracle.
//! - [`NliTransport`]: a single request/response round trip. The
//!   [`JudgmentClient`] wraps a transport with the retry state machine.
//!
//! ## Security
//!
//! Oracle credentials go through the [`secrets`] module. See
//! [`ApiCredential`] for the handling rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

mod client;
pub mod secrets;

#[cfg(feature = "huggingface")]
mod huggingface;

pub use client::JudgmentClient;
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "huggingface")]
pub use huggingface::{HuggingFaceTransport, HF_API_TOKEN_ENV};

/// Separator placed between the two texts of a pair.
pub const PAIR_SEPARATOR: &str = "[SEP]";

/// Errors from the NLI oracle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Service unavailable, retry after {retry_after:?}")]
    Unavailable { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Authentication failed")]
    AuthError,

    #[error("Malformed oracle response: {0}")]
    ParseError(String),

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// How the retry state machine should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Rate-limited or unavailable: exponential backoff
    Overloaded,

    /// Connection failure or timeout: flat wait
    Network,

    /// Anything else: stop immediately
    Permanent,
}

impl OracleError {
    /// Classify the error for retry purposes.
    pub fn class(&self) -> FailureClass {
        match self {
            OracleError::RateLimited { .. } | OracleError::Unavailable { .. } => {
                FailureClass::Overloaded
            }
            OracleError::HttpError(_) | OracleError::Timeout(_) => FailureClass::Network,
            OracleError::ApiError { .. }
            | OracleError::AuthError
            | OracleError::ParseError(_)
            | OracleError::NotConfigured(_)
            | OracleError::RetriesExhausted { .. } => FailureClass::Permanent,
        }
    }

    /// True when the error says the endpoint itself is struggling rather than
    /// rejecting one particular pair.
    pub fn is_endpoint_failure(&self) -> bool {
        match self {
            OracleError::RetriesExhausted { .. } => true,
            other => other.class() != FailureClass::Permanent,
        }
    }

    /// Server-suggested wait, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            OracleError::RateLimited { retry_after } | OracleError::Unavailable { retry_after } => {
                *retry_after
            }
            _ => None,
        }
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        match status {
            429 => OracleError::RateLimited { retry_after },
            503 => OracleError::Unavailable { retry_after },
            401 | 403 => OracleError::AuthError,
            _ => OracleError::ApiError {
                status,
                message: message.into(),
            },
        }
    }
}

/// Candidate label for zero-shot NLI classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NliLabel {
    Contradiction,
    Entailment,
    Neutral,
}

impl NliLabel {
    pub const ALL: [NliLabel; 3] = [NliLabel::Contradiction, NliLabel::Entailment, NliLabel::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            NliLabel::Contradiction => "contradiction",
            NliLabel::Entailment => "entailment",
            NliLabel::Neutral => "neutral",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "contradiction" => Some(NliLabel::Contradiction),
            "entailment" => Some(NliLabel::Entailment),
            "neutral" => Some(NliLabel::Neutral),
            _ => None,
        }
    }
}

/// Oracle verdict for one pair: label → probability in `[0, 1]`.
///
/// Probabilities are independent confidence signals and need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    scores: BTreeMap<NliLabel, f64>,
}

impl Judgment {
    /// Build a judgment, validating every score.
    ///
    /// A `contradiction` score is required since it is the only signal the
    /// detector reads.
    pub fn new(scores: impl IntoIterator<Item = (NliLabel, f64)>) -> Result<Self, OracleError> {
        let mut map = BTreeMap::new();
        for (label, score) in scores {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(OracleError::ParseError(format!(
                    "score for '{}' out of range: {}",
                    label.as_str(),
                    score
                )));
            }
            if map.insert(label, score).is_some() {
                return Err(OracleError::ParseError(format!(
                    "duplicate label '{}'",
                    label.as_str()
                )));
            }
        }
        if !map.contains_key(&NliLabel::Contradiction) {
            return Err(OracleError::ParseError(
                "missing 'contradiction' label".to_string(),
            ));
        }
        Ok(Self { scores: map })
    }

    pub fn score(&self, label: NliLabel) -> Option<f64> {
        self.scores.get(&label).copied()
    }

    pub fn contradiction(&self) -> f64 {
        self.score(NliLabel::Contradiction).unwrap_or(0.0)
    }

    /// Label with the highest probability.
    pub fn top_label(&self) -> Option<NliLabel> {
        self.scores
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(label, _)| *label)
    }
}

/// Zero-shot classification request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeroShotRequest {
    pub inputs: String,
    pub parameters: ZeroShotParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeroShotParameters {
    pub candidate_labels: Vec<NliLabel>,
}

impl ZeroShotRequest {
    /// Encode a text pair with the separator and all three candidate labels.
    pub fn for_pair(premise: &str, hypothesis: &str) -> Self {
        Self {
            inputs: format!("{} {} {}", premise, PAIR_SEPARATOR, hypothesis),
            parameters: ZeroShotParameters {
                candidate_labels: NliLabel::ALL.to_vec(),
            },
        }
    }
}

/// Zero-shot classification response body (parallel arrays).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZeroShotResponse {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl ZeroShotResponse {
    /// Convert into a validated judgment.
    pub fn into_judgment(self) -> Result<Judgment, OracleError> {
        if self.labels.len() != self.scores.len() {
            return Err(OracleError::ParseError(format!(
                "{} labels but {} scores",
                self.labels.len(),
                self.scores.len()
            )));
        }

        let pairs = self
            .labels
            .iter()
            .zip(self.scores)
            .map(|(label, score)| {
                NliLabel::parse(label)
                    .map(|l| (l, score))
                    .ok_or_else(|| OracleError::ParseError(format!("unknown label '{}'", label)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Judgment::new(pairs)
    }
}

/// Something that can judge whether two texts contradict each other.
///
/// Implementations must return `Err` for any failure; an error is never a
/// negative judgment.
#[async_trait]
pub trait NliOracle: Send + Sync {
    async fn judge(&self, premise: &str, hypothesis: &str) -> Result<Judgment, OracleError>;

    /// Name for logs.
    fn name(&self) -> &str;
}

/// One request/response exchange with the oracle endpoint. No retries.
#[async_trait]
pub trait NliTransport: Send + Sync {
    async fn send(&self, request: &ZeroShotRequest) -> Result<ZeroShotResponse, OracleError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_failures() {
        let exhausted = OracleError::RetriesExhausted {
            attempts: 3,
            last: "503".to_string(),
        };
        assert!(exhausted.is_endpoint_failure());
        assert!(OracleError::HttpError("refused".into()).is_endpoint_failure());
        assert!(OracleError::Unavailable { retry_after: None }.is_endpoint_failure());

        assert!(!OracleError::from_status(400, "input too long", None).is_endpoint_failure());
        assert!(!OracleError::ParseError("bad body".into()).is_endpoint_failure());
    }

    #[test]
    fn test_request_encoding() {
        let request = ZeroShotRequest::for_pair("Tenant may sublet.", "Subletting is forbidden.");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inputs": "Tenant may sublet. [SEP] Subletting is forbidden.",
                "parameters": {
                    "candidate_labels": ["contradiction", "entailment", "neutral"]
                }
            })
        );
    }

    #[test]
    fn test_response_into_judgment() {
        let response: ZeroShotResponse = serde_json::from_str(
            r#"{"sequence": "x", "labels": ["contradiction", "neutral", "entailment"], "scores": [0.91, 0.06, 0.03]}"#,
        )
        .unwrap();
        let judgment = response.into_judgment().unwrap();
        assert_eq!(judgment.contradiction(), 0.91);
        assert_eq!(judgment.score(NliLabel::Entailment), Some(0.03));
        assert_eq!(judgment.top_label(), Some(NliLabel::Contradiction));
    }

    #[test]
    fn test_response_length_mismatch() {
        let response = ZeroShotResponse {
            labels: vec!["contradiction".into(), "neutral".into()],
            scores: vec![0.5],
        };
        assert!(matches!(response.into_judgment(), Err(OracleError::ParseError(_))));
    }

    #[test]
    fn test_response_unknown_label() {
        let response = ZeroShotResponse {
            labels: vec!["contradiction".into(), "maybe".into()],
            scores: vec![0.5, 0.5],
        };
        assert!(matches!(response.into_judgment(), Err(OracleError::ParseError(_))));
    }

    #[test]
    fn test_judgment_requires_contradiction() {
        let result = Judgment::new([(NliLabel::Neutral, 0.9), (NliLabel::Entailment, 0.1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_judgment_rejects_out_of_range() {
        assert!(Judgment::new([(NliLabel::Contradiction, 1.2)]).is_err());
        assert!(Judgment::new([(NliLabel::Contradiction, f64::NAN)]).is_err());
        assert!(Judgment::new([(NliLabel::Contradiction, 0.4), (NliLabel::Contradiction, 0.5)]).is_err());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(OracleError::from_status(429, "", None).class(), FailureClass::Overloaded);
        assert_eq!(OracleError::from_status(503, "", None).class(), FailureClass::Overloaded);
        assert_eq!(OracleError::from_status(500, "boom", None).class(), FailureClass::Permanent);
        assert_eq!(OracleError::from_status(401, "", None), OracleError::AuthError);
        assert_eq!(OracleError::Timeout(Duration::from_secs(1)).class(), FailureClass::Network);
        assert_eq!(OracleError::HttpError("reset".into()).class(), FailureClass::Network);
    }

    #[test]
    fn test_retry_after_only_on_overload() {
        let wait = Some(Duration::from_secs(7));
        assert_eq!(OracleError::from_status(429, "", wait).retry_after(), wait);
        assert_eq!(OracleError::from_status(500, "", wait).retry_after(), None);
    }
}
