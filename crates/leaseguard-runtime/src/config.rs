//! Runtime configuration.
//!
//! Every field has a default, so an empty YAML document is a valid config.
//! Durations are written the human way (`"2s"`, `"500ms"`, `"1h"`).

use leaseguard_core::{
    validate_threshold, StrategyKind, VectorizerConfig, DEFAULT_CONTRADICTION_THRESHOLD,
    DEFAULT_SIMILARITY_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Default zero-shot NLI model endpoint.
pub const DEFAULT_ORACLE_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<leaseguard_core::DetectorError> for ConfigError {
    fn from(e: leaseguard_core::DetectorError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

/// Top-level configuration for a contradiction analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Which strategy judges pairs
    pub strategy: StrategyKind,

    /// Statistical path: flag pairs with similarity strictly below this
    pub similarity_threshold: f64,

    /// Model path: report pairs with contradiction probability strictly above this
    pub contradiction_threshold: f64,

    /// Maximum oracle requests in flight (1 = sequential)
    pub concurrency: usize,

    /// Deadline for the whole analysis; partial results are returned when hit
    #[serde(with = "duration_str::option", skip_serializing_if = "Option::is_none")]
    pub analysis_timeout: Option<Duration>,

    /// Cap on pair judgments sent to the oracle per analysis. Each judgment
    /// may issue up to `oracle.retry.max_attempts` HTTP requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_oracle_calls: Option<u32>,

    pub oracle: OracleConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache: CacheConfig,
    pub vectorizer: VectorizerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            contradiction_threshold: DEFAULT_CONTRADICTION_THRESHOLD,
            concurrency: 4,
            analysis_timeout: None,
            max_oracle_calls: None,
            oracle: OracleConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            vectorizer: VectorizerConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as null, not as an empty map.
        let config: RuntimeConfig = if yaml.trim().is_empty() {
            RuntimeConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold("similarity_threshold", self.similarity_threshold)?;
        validate_threshold("contradiction_threshold", self.contradiction_threshold)?;

        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        if matches!(self.analysis_timeout, Some(t) if t.is_zero()) {
            return Err(ConfigError::Invalid("analysis_timeout must be positive".to_string()));
        }

        self.oracle.validate()?;
        self.circuit_breaker
            .validate()
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

/// Remote NLI oracle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: String,

    /// Bearer token; falls back to the `HF_API_TOKEN` environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    pub retry: RetryPolicy,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ORACLE_ENDPOINT.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "oracle.endpoint must start with http:// or https://".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "oracle.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "oracle.request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Judgment cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,

    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Serde adapter writing durations as humantime strings.
///
/// Plain integers are accepted on input and read as seconds.
pub(crate) mod duration_str {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    fn parse<E: de::Error>(raw: Raw) -> Result<Duration, E> {
        match raw {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => humantime::parse_duration(&text).map_err(E::custom),
        }
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<Raw>::deserialize(deserializer)?
                .map(parse::<D::Error>)
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaseguard_core::StopWords;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.strategy, StrategyKind::Statistical);
        assert_eq!(config.similarity_threshold, 0.3);
        assert_eq!(config.contradiction_threshold, 0.8);
        assert_eq!(config.oracle.retry.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(RuntimeConfig::from_yaml("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
strategy: model-based
contradiction_threshold: 0.75
concurrency: 8
analysis_timeout: 2m
max_oracle_calls: 100
oracle:
  endpoint: https://example.test/nli
  api_token: hf_abc
  request_timeout: 10s
  retry:
    max_attempts: 5
    initial_wait: 500ms
circuit_breaker:
  enabled: true
  failure_threshold: 2
  recovery_timeout: 45
cache:
  enabled: false
vectorizer:
  stop_words: english
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.strategy, StrategyKind::ModelBased);
        assert_eq!(config.contradiction_threshold, 0.75);
        assert_eq!(config.similarity_threshold, 0.3);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.analysis_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.max_oracle_calls, Some(100));
        assert_eq!(config.oracle.request_timeout, Duration::from_secs(10));
        assert_eq!(config.oracle.retry.max_attempts, 5);
        assert_eq!(config.oracle.retry.initial_wait, Duration::from_millis(500));
        assert_eq!(config.oracle.retry.max_wait, Duration::from_secs(60));
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.circuit_breaker.recovery_timeout, Duration::from_secs(45));
        assert!(!config.cache.enabled);
        assert_eq!(config.vectorizer.stop_words, StopWords::English);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RuntimeConfig {
            analysis_timeout: Some(Duration::from_secs(90)),
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("1m 30s"));
        assert_eq!(RuntimeConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RuntimeConfig::from_yaml("similarity_threshold: 1.5").is_err());
        assert!(RuntimeConfig::from_yaml("contradiction_threshold: -0.1").is_err());
        assert!(RuntimeConfig::from_yaml("concurrency: 0").is_err());
        assert!(RuntimeConfig::from_yaml("oracle: { retry: { max_attempts: 0 } }").is_err());
        assert!(RuntimeConfig::from_yaml("oracle: { endpoint: localhost }").is_err());
        assert!(RuntimeConfig::from_yaml("analysis_timeout: soon").is_err());
        assert!(RuntimeConfig::from_yaml("strategy: both").is_err());
    }
}
