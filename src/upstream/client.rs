//! Upstream HTTP caller
//!
//! Sends a request described by a provider descriptor, classifies the
//! outcome, and retries transient overload responses with exponential
//! backoff. Network errors and ordinary HTTP errors fail immediately.

use reqwest::multipart::Form;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    notify::TelegramAlerts,
    routes::metrics,
    upstream::provider::ProviderDescriptor,
};

/// Outcome of a single attempt
enum AttemptError {
    /// HTTP 529 carrying an `overloaded_error` body; eligible for retry
    Overloaded(String),
    /// Anything else; surfaced immediately
    Fatal(AppError),
}

/// HTTP caller shared by every provider
pub struct UpstreamClient {
    client: reqwest::Client,
    alerts: TelegramAlerts,
}

impl UpstreamClient {
    /// Create a new upstream caller
    pub fn new(client: reqwest::Client, alerts: TelegramAlerts) -> Self {
        Self { client, alerts }
    }

    /// POST a JSON body to `path` on the provider
    #[instrument(skip(self, body), fields(provider = %provider.name, path = %path))]
    pub async fn post_json(
        &self,
        provider: &ProviderDescriptor,
        path: &str,
        body: &Value,
    ) -> AppResult<Value> {
        self.send_with_retry(provider, || {
            Ok(self
                .client
                .post(format!("{}{}", provider.base_url, path))
                .headers(provider.headers())
                .json(body))
        })
        .await
    }

    /// POST a multipart form to `path` on the provider.
    ///
    /// Sending consumes a form, so the form is rebuilt from the closure on
    /// every attempt.
    #[instrument(skip(self, form), fields(provider = %provider.name, path = %path))]
    pub async fn post_multipart<F>(
        &self,
        provider: &ProviderDescriptor,
        path: &str,
        form: F,
    ) -> AppResult<Value>
    where
        F: Fn() -> AppResult<Form>,
    {
        self.send_with_retry(provider, || {
            Ok(self
                .client
                .post(format!("{}{}", provider.base_url, path))
                .headers(provider.headers())
                .multipart(form()?))
        })
        .await
    }

    /// Run the retry loop around single attempts.
    ///
    /// Only the overloaded classification retries; everything else
    /// propagates from the first attempt.
    async fn send_with_retry<F>(&self, provider: &ProviderDescriptor, build: F) -> AppResult<Value>
    where
        F: Fn() -> AppResult<reqwest::RequestBuilder>,
    {
        let policy = provider.retry;
        let mut attempt = 1;

        loop {
            match self.send_once(provider, build()?).await {
                Ok(body) => {
                    if attempt > 1 {
                        debug!(attempt = attempt, "Upstream call succeeded after retry");
                    }
                    return Ok(body);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Overloaded(message)) => {
                    if attempt >= policy.max_attempts {
                        error!(attempts = attempt, "Upstream still overloaded, giving up");
                        return Err(AppError::UpstreamOverloaded(message));
                    }

                    let delay = policy.backoff(attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Upstream overloaded, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One attempt: send the request and classify the response
    async fn send_once(
        &self,
        provider: &ProviderDescriptor,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, AttemptError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Failed to send upstream request");
            metrics::record_upstream_attempt(provider.name, "network_error");
            AttemptError::Fatal(AppError::UpstreamNetwork(e.to_string()))
        })?;

        let status = response.status();
        debug!(status = %status, "Upstream response status");

        self.alerts
            .observe_rate_limit_headers(provider.name, response.headers());

        let text = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read upstream response body");
            metrics::record_upstream_attempt(provider.name, "network_error");
            AttemptError::Fatal(AppError::UpstreamNetwork(e.to_string()))
        })?;

        if status.as_u16() == 529 {
            if let Ok(body) = serde_json::from_str::<Value>(&text) {
                if body.pointer("/error/type").and_then(Value::as_str) == Some("overloaded_error") {
                    let message = body
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .unwrap_or("Overloaded")
                        .to_string();
                    metrics::record_upstream_attempt(provider.name, "overloaded");
                    return Err(AttemptError::Overloaded(message));
                }
            }
        }

        if !status.is_success() {
            error!(status = %status, body = %text, "Upstream request failed");
            metrics::record_upstream_attempt(provider.name, "http_error");
            return Err(AttemptError::Fatal(AppError::UpstreamHttp {
                status: status.as_u16(),
                body: text,
            }));
        }

        metrics::record_upstream_attempt(provider.name, "success");

        match serde_json::from_str(&text) {
            Ok(body) => Ok(body),
            Err(e) => {
                error!(error = %e, body = %text, "Failed to parse upstream response");
                Err(AttemptError::Fatal(AppError::Normalization(format!(
                    "Failed to parse upstream response: {}",
                    e
                ))))
            }
        }
    }
}
