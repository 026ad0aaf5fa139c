//! Common test utilities for the gateway
//!
//! This module provides the blackbox test harness, shared constants, and
//! signed-request helpers used across the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::{TestResponse, TestServer};
use serde_json::Value;

use gateway::middleware::rate_limiter::{ManualClock, RateLimiters};
use gateway::middleware::signature::sign;
use gateway::{routes, AppState, Config, RetryPolicy};

use crate::mocks::{MockAnthropic, MockOpenAi};

/// Test configuration constants
pub mod constants {
    /// Secret that signs the GET /auth bootstrap request
    pub const TEST_AUTH_SECRET: &str = "test-auth-secret";
    /// Session secret returned by /auth; signs every generation request
    pub const TEST_SESSION_SECRET: &str = "test-session-secret";
    /// Default test API key for OpenAI
    pub const TEST_OPENAI_API_KEY: &str = "test-openai-api-key";
    /// Default test API key for Anthropic
    pub const TEST_ANTHROPIC_API_KEY: &str = "test-anthropic-api-key";
    /// App identifier that unlocks the server-side prompts
    pub const TEST_APP_IDENTIFIER: &str = "wrapfast";
}

/// Create a test config pointing at mock upstream servers
pub fn test_config(openai_url: &str, anthropic_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign port
        openai_base_url: openai_url.to_string(),
        openai_api_key: constants::TEST_OPENAI_API_KEY.to_string(),
        anthropic_base_url: anthropic_url.to_string(),
        anthropic_api_key: constants::TEST_ANTHROPIC_API_KEY.to_string(),
        auth_secret_key: constants::TEST_AUTH_SECRET.to_string(),
        hmac_secret_key: constants::TEST_SESSION_SECRET.to_string(),
        auth_limit: 10,
        prompt_limit: 100,
        vision_max_tokens: 1000,
        anthropic_max_tokens: 1024,
        app_identifier: constants::TEST_APP_IDENTIFIER.to_string(),
        telegram_bot_key: None,
        telegram_channel_id: None,
    }
}

/// Knobs the harness exposes per test
pub struct HarnessOptions {
    /// Request ceiling for the /auth window
    pub auth_limit: u64,
    /// Request ceiling for the shared generation window
    pub prompt_limit: u64,
    /// Base retry backoff in milliseconds (short, so retry tests stay fast)
    pub base_delay_ms: u64,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            auth_limit: 10,
            prompt_limit: 100,
            base_delay_ms: 10,
        }
    }
}

/// Blackbox test harness for the gateway
///
/// Creates a complete test environment with:
/// - Mock OpenAI server (wiremock)
/// - Mock Anthropic server (wiremock)
/// - Real app router with signature and rate limit middleware
/// - A manually advanced clock driving the rate-limit windows
///
/// # Example
///
/// ```ignore
/// let harness = GatewayHarness::start().await;
///
/// harness.openai.mock_chat_completion("Hello!").await;
///
/// let response = harness
///     .post_signed("/chatgpt", &json!({"prompt": "Hi"}))
///     .await;
///
/// response.assert_status_ok();
/// ```
pub struct GatewayHarness {
    pub server: TestServer,
    pub openai: MockOpenAi,
    pub anthropic: MockAnthropic,
    pub clock: Arc<ManualClock>,
}

impl GatewayHarness {
    /// Create a harness with default limits and backoff
    pub async fn start() -> Self {
        Self::start_with(HarnessOptions::default()).await
    }

    /// Create a harness with explicit limits and backoff
    pub async fn start_with(options: HarnessOptions) -> Self {
        // Start mock servers
        let openai = MockOpenAi::start().await;
        let anthropic = MockAnthropic::start().await;

        // Create config pointing to mocks
        let config = test_config(&openai.uri(), &anthropic.uri());

        // Limiters share a manual clock so tests can expire windows
        let clock = Arc::new(ManualClock::new());
        let limiters =
            RateLimiters::with_clock(options.auth_limit, options.prompt_limit, clock.clone());

        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(options.base_delay_ms),
        };

        // Create app state and router
        let state = Arc::new(AppState::new_for_testing(config, limiters, retry));
        let app = routes::create_router(state);

        // Create test server
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            openai,
            anthropic,
            clock,
        }
    }

    /// POST a JSON body to `path`, signed with the session secret
    pub async fn post_signed(&self, path: &str, body: &Value) -> TestResponse {
        let signature = sign(constants::TEST_SESSION_SECRET, path);
        self.server
            .post(path)
            .add_header("x-signature".parse::<axum::http::HeaderName>().unwrap(), signature.parse::<axum::http::HeaderValue>().unwrap())
            .json(body)
            .await
    }

    /// POST a JSON body to `path` with an explicit x-signature value
    pub async fn post_with_signature(
        &self,
        path: &str,
        signature: &str,
        body: &Value,
    ) -> TestResponse {
        self.server
            .post(path)
            .add_header("x-signature".parse::<axum::http::HeaderName>().unwrap(), signature.parse::<axum::http::HeaderValue>().unwrap())
            .json(body)
            .await
    }

    /// GET /auth signed with the bootstrap secret
    pub async fn get_auth(&self) -> TestResponse {
        let signature = sign(constants::TEST_AUTH_SECRET, "/auth");
        self.server
            .get("/auth")
            .add_header("x-signature".parse::<axum::http::HeaderName>().unwrap(), signature.parse::<axum::http::HeaderValue>().unwrap())
            .await
    }
}
