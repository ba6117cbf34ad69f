//! HTTP client utilities.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;
use crate::utils::{with_retry, RetryConfig};

/// Shared HTTP client with sensible defaults
///
/// Every outbound call is bounded by the configured request timeout; a call
/// that exceeds it fails with [`SourceError::Timeout`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client from the `[http]` configuration section
    pub fn from_config(config: &HttpConfig) -> Result<Self, SourceError> {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| {
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
        });

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        let retry = RetryConfig::default()
            .max_attempts(config.retry_attempts)
            .initial_delay(Duration::from_millis(config.retry_delay_ms));

        Ok(Self {
            client: Arc::new(client),
            retry,
        })
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET a JSON document
    ///
    /// Returns `Ok(None)` on 404 so lookups can tell "not found" apart from
    /// a failed call.
    pub async fn get_json(&self, url: &str) -> Result<Option<Value>, SourceError> {
        with_retry(self.retry, || self.get_json_once(url)).await
    }

    async fn get_json_once(&self, url: &str) -> Result<Option<Value>, SourceError> {
        tracing::trace!(url, "GET");

        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => return Err(SourceError::RateLimit),
            status if !status.is_success() => return Err(SourceError::Http(status.as_u16())),
            _ => {}
        }

        let body = response.text().await?;
        let value = serde_json::from_str(&body)?;
        Ok(Some(value))
    }
}
