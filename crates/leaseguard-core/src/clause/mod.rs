//! Clause model and input normalization.
//!
//! Upstream extraction hands us clauses in whatever shape it produced: bare
//! strings, `{ "text": ... }` records, or something else entirely. This module
//! turns all of that into a clean `Vec<Clause>` exactly once, at the boundary.

mod splitter;

pub use splitter::split_numbered_clauses;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when reading a clause source.
#[derive(Error, Debug)]
pub enum ClauseError {
    #[error("Failed to read clause source: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse clause JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A single unit of contract text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Trimmed, never empty
    pub text: String,

    /// Favorability label attached by a separate enrichment pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

impl Clause {
    /// Create a clause from raw text.
    ///
    /// Returns `None` when the text is empty after trimming.
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
            classification: None,
        })
    }

    /// Attach a classification label.
    pub fn with_classification(mut self, label: impl Into<String>) -> Self {
        self.classification = Some(label.into());
        self
    }
}

/// A clause record as produced by upstream extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseRecord {
    pub text: String,

    /// Non-string labels are discarded; the text still counts.
    #[serde(default, deserialize_with = "label_or_none")]
    pub classification: Option<String>,
}

fn label_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(label) => Some(label),
        _ => None,
    })
}

/// Anything an upstream clause source may hand us.
///
/// Deserializes untagged, so a JSON array such as
/// `["Rent is due monthly.", {"text": "No pets."}, 42]` yields
/// `Text`, `Record` and `Other` respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseInput {
    Text(String),
    Record(ClauseRecord),
    Other(serde_json::Value),
}

impl ClauseInput {
    /// Normalize into a comparable clause, or `None` if this input carries no
    /// usable text.
    pub fn into_clause(self) -> Option<Clause> {
        match self {
            ClauseInput::Text(text) => Clause::new(text),
            ClauseInput::Record(record) => {
                let clause = Clause::new(record.text)?;
                Some(match record.classification {
                    Some(label) => clause.with_classification(label),
                    None => clause,
                })
            }
            ClauseInput::Other(value) => {
                tracing::debug!(kind = json_kind(&value), "Dropping non-text clause input");
                None
            }
        }
    }
}

impl From<&str> for ClauseInput {
    fn from(text: &str) -> Self {
        ClauseInput::Text(text.to_string())
    }
}

impl From<String> for ClauseInput {
    fn from(text: String) -> Self {
        ClauseInput::Text(text)
    }
}

impl From<Clause> for ClauseInput {
    fn from(clause: Clause) -> Self {
        ClauseInput::Record(ClauseRecord {
            text: clause.text,
            classification: clause.classification,
        })
    }
}

impl From<serde_json::Value> for ClauseInput {
    fn from(value: serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(ClauseInput::Other(value))
    }
}

/// Normalize heterogeneous clause inputs into trimmed, non-empty clauses.
///
/// Order is preserved. Empty, whitespace-only and non-text entries are
/// dropped silently.
pub fn normalize_clauses<I, T>(inputs: I) -> Vec<Clause>
where
    I: IntoIterator<Item = T>,
    T: Into<ClauseInput>,
{
    inputs
        .into_iter()
        .filter_map(|input| input.into().into_clause())
        .collect()
}

/// Parse a JSON clause document.
///
/// Accepts either a bare array of clause inputs or an object with a
/// `clauses` array (the shape of an upload response).
pub fn parse_clause_json(json: &str) -> Result<Vec<Clause>, ClauseError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ClauseDocument {
        List(Vec<ClauseInput>),
        Wrapped { clauses: Vec<ClauseInput> },
    }

    let inputs = match serde_json::from_str::<ClauseDocument>(json)? {
        ClauseDocument::List(inputs) => inputs,
        ClauseDocument::Wrapped { clauses } => clauses,
    };
    Ok(normalize_clauses(inputs))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
