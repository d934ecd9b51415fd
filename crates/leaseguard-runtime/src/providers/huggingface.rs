//! Hugging Face Inference API transport for zero-shot NLI.
//!
//! ## Security
//!
//! The bearer token is held in an [`ApiCredential`] and only exposed when the
//! request header is set. See the [`secrets`](super::secrets) module.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use std::time::Duration;

use super::{
    secrets::{ApiCredential, CredentialSource},
    NliTransport, OracleError, ZeroShotRequest, ZeroShotResponse,
};
use crate::config::OracleConfig;

/// Environment variable holding the Hugging Face API token.
pub const HF_API_TOKEN_ENV: &str = "HF_API_TOKEN";

/// HTTPS transport to a hosted zero-shot classification model.
pub struct HuggingFaceTransport {
    credential: ApiCredential,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for HuggingFaceTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceTransport")
            .field("credential", &self.credential)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HuggingFaceTransport {
    /// Create a transport with an explicit token and default settings.
    pub fn new(api_token: impl Into<String>) -> Result<Self, OracleError> {
        let defaults = OracleConfig::default();
        Self::with_credential(
            ApiCredential::new(api_token, CredentialSource::Programmatic, "Hugging Face token"),
            defaults.endpoint,
            defaults.request_timeout,
        )
    }

    /// Create from configuration, falling back to `HF_API_TOKEN` for the token.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        config
            .validate()
            .map_err(|e| OracleError::NotConfigured(e.to_string()))?;

        let credential = ApiCredential::from_config_or_env(
            config.api_token.as_deref(),
            HF_API_TOKEN_ENV,
            "Hugging Face token",
        )?;

        Self::with_credential(credential, config.endpoint.clone(), config.request_timeout)
    }

    fn with_credential(
        credential: ApiCredential,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            credential,
            endpoint,
            timeout,
            client,
        })
    }

    /// Point at a different model endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.timeout)
        } else if e.is_decode() {
            OracleError::ParseError(e.to_string())
        } else {
            OracleError::HttpError(e.to_string())
        }
    }
}

/// Successful bodies come back either bare or wrapped in a one-element list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfBody {
    Single(ZeroShotResponse),
    Batch(Vec<ZeroShotResponse>),
}

impl HfBody {
    fn into_response(self) -> Result<ZeroShotResponse, OracleError> {
        match self {
            HfBody::Single(response) => Ok(response),
            HfBody::Batch(batch) => batch
                .into_iter()
                .next()
                .ok_or_else(|| OracleError::ParseError("empty response list".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HfError {
    error: String,
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<HfError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[async_trait]
impl NliTransport for HuggingFaceTransport {
    async fn send(&self, request: &ZeroShotRequest) -> Result<ZeroShotResponse, OracleError> {
        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.credential.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::from_status(
                status.as_u16(),
                error_message(&body),
                retry_after,
            ));
        }

        response
            .json::<HfBody>()
            .await
            .map_err(|e| self.map_send_error(e))?
            .into_response()
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
