//! Word tokenization for TF-IDF vectorization.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    /// Words of two or more word characters (single letters are dropped).
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\b\w\w+\b").unwrap();

    static ref ENGLISH_STOP_WORDS: HashSet<&'static str> = [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing",
        "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
        "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how",
        "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most",
        "my", "myself", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such",
        "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
        "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
        "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
        "yourselves",
    ]
    .into_iter()
    .collect();
}

/// Stop word policy.
///
/// The English list never contains negations ("not", "no", "nor").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWords {
    #[default]
    None,
    English,
}

impl StopWords {
    fn contains(&self, token: &str) -> bool {
        match self {
            StopWords::None => false,
            StopWords::English => ENGLISH_STOP_WORDS.contains(token),
        }
    }
}

/// Tokenization settings shared by every text in a vectorization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    pub lowercase: bool,
    pub stop_words: StopWords,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            stop_words: StopWords::None,
        }
    }
}

/// Split text into terms according to `config`.
pub fn tokenize(text: &str, config: &VectorizerConfig) -> Vec<String> {
    let source = if config.lowercase {
        std::borrow::Cow::Owned(text.to_lowercase())
    } else {
        std::borrow::Cow::Borrowed(text)
    };

    TOKEN_PATTERN
        .find_iter(&source)
        .map(|m| m.as_str())
        .filter(|token| !config.stop_words.contains(token))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_default() {
        let tokens = tokenize("Rent is $1000/month.", &VectorizerConfig::default());
        assert_eq!(tokens, vec!["rent", "is", "1000", "month"]);
    }

    #[test]
    fn test_single_characters_dropped() {
        let tokens = tokenize("A unit in building B", &VectorizerConfig::default());
        assert_eq!(tokens, vec!["unit", "in", "building"]);
    }

    #[test]
    fn test_case_preserved_when_configured() {
        let config = VectorizerConfig {
            lowercase: false,
            ..Default::default()
        };
        assert_eq!(tokenize("Tenant tenant", &config), vec!["Tenant", "tenant"]);
    }

    #[test]
    fn test_english_stop_words_keep_negation() {
        let config = VectorizerConfig {
            stop_words: StopWords::English,
            ..Default::default()
        };
        let tokens = tokenize("The tenant may not sublet the unit", &config);
        assert_eq!(tokens, vec!["tenant", "may", "not", "sublet", "unit"]);
    }
}
