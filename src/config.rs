//! Configuration management for the gateway
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// OpenAI API base URL
    pub openai_base_url: String,
    /// OpenAI API key
    pub openai_api_key: String,

    /// Anthropic API base URL
    pub anthropic_base_url: String,
    /// Anthropic API key
    pub anthropic_api_key: String,

    /// HMAC secret protecting GET /auth
    pub auth_secret_key: String,
    /// HMAC secret for every other signed route; handed out by /auth
    pub hmac_secret_key: String,

    /// Requests allowed per window on /auth
    pub auth_limit: u64,
    /// Requests allowed per window across the generation routes
    pub prompt_limit: u64,

    /// max_tokens for OpenAI vision requests
    pub vision_max_tokens: u32,
    /// max_tokens for Anthropic message requests
    pub anthropic_max_tokens: u32,

    /// X-App-Identifier value that selects the built-in vision prompts
    pub app_identifier: String,

    /// Telegram bot token for operational alerts (sink disabled if unset)
    pub telegram_bot_key: Option<String>,
    /// Telegram chat id the alerts go to
    pub telegram_channel_id: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .context("Invalid PORT")?,

            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?,

            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY")
                .context("ANTHROPIC_API_KEY must be set")?,

            auth_secret_key: env::var("AUTH_SECRET_KEY")
                .context("AUTH_SECRET_KEY must be set")?,
            hmac_secret_key: env::var("HMAC_SECRET_KEY")
                .context("HMAC_SECRET_KEY must be set")?,

            auth_limit: env::var("AUTH_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid AUTH_LIMIT")?,
            prompt_limit: env::var("PROMPT_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid PROMPT_LIMIT")?,

            vision_max_tokens: env::var("VISION_MAX_TOKENS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Invalid VISION_MAX_TOKENS")?,
            anthropic_max_tokens: env::var("ANTHROPIC_MAX_TOKENS")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .context("Invalid ANTHROPIC_MAX_TOKENS")?,

            app_identifier: env::var("APP_IDENTIFIER")
                .unwrap_or_else(|_| "wrapfast".to_string()),

            telegram_bot_key: env::var("TELEGRAM_BOT_KEY").ok(),
            telegram_channel_id: env::var("TELEGRAM_CHANNEL_ID").ok(),
        })
    }
}
