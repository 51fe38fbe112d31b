use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ApiConfig;
use crate::models::Plan;

mod error;
mod retry;

pub use error::ApiError;
pub use retry::RetryConfig;

/// Body of the progress PATCH request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest<'a> {
    pub plan_data: &'a Plan,
}

/// Envelope returned by the progress endpoint
#[derive(Debug, Deserialize)]
pub struct ProgressResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub data: Option<Plan>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ProgressResponse {
    fn failure_message(self, fallback: &str) -> String {
        self.error
            .or(self.message)
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Remote home of a client's plan progress.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Persisted plan, or `None` when nothing has been saved yet
    async fn fetch_plan(&self, plan_id: &str, client_id: &str) -> Result<Option<Plan>, ApiError>;

    /// Replace the persisted plan
    async fn store_plan(&self, plan_id: &str, client_id: &str, plan: &Plan) -> Result<(), ApiError>;
}

/// HTTP client for the plan progress endpoint
pub struct ProgressClient {
    client: Client,
    config: ApiConfig,
    token: Option<String>,
    retry_config: RetryConfig,
}

impl ProgressClient {
    /// Create a new progress client
    pub fn new(config: ApiConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            token: None,
            retry_config: RetryConfig::default(),
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Override the retry policy used for loads
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn progress_url(&self, plan_id: &str, client_id: &str) -> String {
        self.config.progress_url(plan_id, client_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn read_envelope(response: Response) -> Result<ProgressResponse, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProgressResponse>(&body)
                .ok()
                .and_then(|envelope| envelope.error.or(envelope.message))
                .unwrap_or(body);
            return Err(ApiError::from_status(status, message));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<Plan>, ApiError> {
        let response = self.authorize(self.client.get(url)).send().await?;

        let envelope = match Self::read_envelope(response).await {
            Ok(envelope) => envelope,
            Err(ApiError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        if envelope.success {
            Ok(envelope.data)
        } else {
            Err(ApiError::Rejected(
                envelope.failure_message("Failed to load workout progress"),
            ))
        }
    }
}

#[async_trait]
impl ProgressStore for ProgressClient {
    async fn fetch_plan(&self, plan_id: &str, client_id: &str) -> Result<Option<Plan>, ApiError> {
        let url = self.progress_url(plan_id, client_id);

        tracing::debug!("Loading workout progress from {}", url);

        // Loads are idempotent and safe to retry
        self.retry_config.execute(|| self.fetch_once(&url)).await
    }

    async fn store_plan(&self, plan_id: &str, client_id: &str, plan: &Plan) -> Result<(), ApiError> {
        let url = self.progress_url(plan_id, client_id);

        tracing::debug!("Saving workout progress to {}", url);

        let response = self
            .authorize(self.client.patch(&url))
            .json(&SaveProgressRequest { plan_data: plan })
            .send()
            .await?;

        let envelope = Self::read_envelope(response).await?;

        if envelope.success {
            tracing::info!("Saved workout progress for plan {}", plan_id);
            Ok(())
        } else {
            Err(ApiError::Rejected(
                envelope.failure_message("Failed to save workout progress"),
            ))
        }
    }
}
