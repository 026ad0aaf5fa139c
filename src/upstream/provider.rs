//! Provider descriptors
//!
//! Each upstream provider is described by data: base URL, credential shape,
//! version headers, and retry policy. The caller in `client.rs` consumes
//! these descriptors and contains no provider-specific branches.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::config::Config;

/// Retry schedule for transient overload responses
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff unit; the wait after failed attempt n is `base_delay * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next try once attempt `attempt` (1-based) failed
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Credential shape for a provider
#[derive(Debug, Clone)]
pub enum Credential {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// A provider-specific header carrying the key verbatim
    ApiKeyHeader { header: &'static str, key: String },
}

/// Everything the upstream caller needs to reach one provider
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Short name used in logs and metrics
    pub name: &'static str,
    /// Base URL without a trailing slash
    pub base_url: String,
    pub credential: Credential,
    /// Fixed headers sent with every request (API version pins)
    pub extra_headers: Vec<(&'static str, &'static str)>,
    pub retry: RetryPolicy,
}

impl ProviderDescriptor {
    /// OpenAI descriptor: bearer credential
    pub fn openai(config: &Config) -> Self {
        Self {
            name: "openai",
            base_url: config.openai_base_url.clone(),
            credential: Credential::Bearer(config.openai_api_key.clone()),
            extra_headers: vec![],
            retry: RetryPolicy::default(),
        }
    }

    /// Anthropic descriptor: x-api-key credential plus the pinned API version
    pub fn anthropic(config: &Config) -> Self {
        Self {
            name: "anthropic",
            base_url: config.anthropic_base_url.clone(),
            credential: Credential::ApiKeyHeader {
                header: "x-api-key",
                key: config.anthropic_api_key.clone(),
            },
            extra_headers: vec![("anthropic-version", "2023-06-01")],
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy; tests shrink the backoff to milliseconds
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build headers carrying the provider credential
    ///
    /// Content-Type is left to the request builder so JSON and multipart
    /// bodies each get the right one.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        match &self.credential {
            Credential::Bearer(key) => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", key))
                        .expect("Invalid API key"),
                );
            }
            Credential::ApiKeyHeader { header, key } => {
                headers.insert(
                    *header,
                    HeaderValue::from_str(key).expect("Invalid API key"),
                );
            }
        }

        for (name, value) in &self.extra_headers {
            headers.insert(*name, HeaderValue::from_static(value));
        }

        headers
    }
}
