//! Signed HTTP gateway in front of OpenAI and Anthropic
//!
//! This library provides the core functionality for the gateway server.
//! It verifies request signatures, rate limits clients per IP, relays
//! requests to the AI providers with retry, and normalizes provider
//! responses into the shapes the mobile clients expect.

pub mod config;
pub mod error;
pub mod middleware;
pub mod normalize;
pub mod notify;
pub mod prompts;
pub mod routes;
pub mod upstream;

use std::time::Instant;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::middleware::rate_limiter::RateLimiters;
pub use crate::notify::TelegramAlerts;
pub use crate::upstream::{ProviderDescriptor, RetryPolicy, UpstreamClient};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// HTTP caller with retry shared by every provider
    pub upstream: UpstreamClient,
    pub openai: ProviderDescriptor,
    pub anthropic: ProviderDescriptor,
    /// Per-client request counters for the auth and prompt groups
    pub limiters: RateLimiters,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // Initialize HTTP client with connection pooling
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(std::time::Duration::from_secs(300))
            .build()?;

        let alerts = TelegramAlerts::from_config(http_client.clone(), &config);
        let upstream = UpstreamClient::new(http_client, alerts);

        let openai = ProviderDescriptor::openai(&config);
        let anthropic = ProviderDescriptor::anthropic(&config);
        let limiters = RateLimiters::new(&config);

        Ok(Self {
            config,
            start_time: Instant::now(),
            upstream,
            openai,
            anthropic,
            limiters,
        })
    }

    /// Create application state for testing with mocked upstream servers
    ///
    /// The providers keep their configured base URLs (pointing at wiremock
    /// servers in tests) but run with the given retry policy so backoff
    /// tests stay fast. Telegram alerting is disabled.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config, limiters: RateLimiters, retry: RetryPolicy) -> Self {
        let http_client = reqwest::Client::new();

        let alerts = TelegramAlerts::disabled(http_client.clone());
        let upstream = UpstreamClient::new(http_client, alerts);

        let openai = ProviderDescriptor::openai(&config).with_retry(retry);
        let anthropic = ProviderDescriptor::anthropic(&config).with_retry(retry);

        Self {
            config,
            start_time: Instant::now(),
            upstream,
            openai,
            anthropic,
            limiters,
        }
    }
}
