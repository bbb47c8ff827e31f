//! Evaluation Service Client
//!
//! HTTP client for callers of the evaluation service. Suggestions are
//! advisory, so `evaluate` degrades to an empty list when the service is
//! missing, slow or failing; `try_evaluate` keeps the error.

use std::time::Duration;

use serde::Serialize;

use crate::constants::{self, EVALUATE_PATH};
use crate::engine::{group_by_service, Engagement, EvaluatedSuggestion, GroupedSuggestions, Rule, Target};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL, e.g. `https://rules.example.test`
    pub base_url: Option<String>,
    /// Bearer credential sent with every request
    pub token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: constants::get_evaluator_url(),
            token: std::env::var("EVALUATOR_TOKEN").ok(),
            timeout_ms: constants::get_client_timeout_ms(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("evaluation service URL not configured")]
    NotConfigured,
    #[error("evaluation request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("evaluation service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Request body accepted by the evaluation endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest<'a> {
    pub rules: &'a [Rule],
    pub engagement: &'a Engagement,
    pub targets: &'a [Target],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_target: Option<&'a Target>,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: String,
}

/// Evaluation service client
pub struct EvaluatorClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl EvaluatorClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { config, http_client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.base_url.is_some()
    }

    /// Evaluate remotely; any failure yields no suggestions
    pub async fn evaluate(&self, request: &EvaluateRequest<'_>) -> Vec<EvaluatedSuggestion> {
        match self.try_evaluate(request).await {
            Ok(suggestions) => suggestions,
            Err(ClientError::Timeout) => {
                tracing::warn!("Rule evaluation timed out; continuing without suggestions");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Rule evaluation unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Evaluate remotely and group the result by service
    pub async fn evaluate_grouped(&self, request: &EvaluateRequest<'_>) -> GroupedSuggestions {
        group_by_service(&self.evaluate(request).await)
    }

    pub async fn try_evaluate(
        &self,
        request: &EvaluateRequest<'_>,
    ) -> Result<Vec<EvaluatedSuggestion>, ClientError> {
        let base_url = self.config.base_url.as_ref().ok_or(ClientError::NotConfigured)?;
        let url = format!("{}{}", base_url.trim_end_matches('/'), EVALUATE_PATH);

        let mut builder = self.http_client.post(&url).json(request);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Vec<EvaluatedSuggestion>>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
