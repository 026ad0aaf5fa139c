//! Operational alerting over Telegram
//!
//! Best-effort notifications to an operator channel. Sends are spawned and
//! never awaited on the request path; a failed delivery is logged and
//! dropped. Without credentials the sink is disabled and `send` is a no-op.

use reqwest::header::HeaderMap;
use tracing::{debug, error, warn};

use crate::config::Config;

/// Where alerts go
#[derive(Debug, Clone)]
struct TelegramTarget {
    bot_key: String,
    channel_id: String,
}

/// Telegram alert sink
#[derive(Clone)]
pub struct TelegramAlerts {
    client: reqwest::Client,
    base_url: String,
    target: Option<TelegramTarget>,
}

impl TelegramAlerts {
    /// Build the sink from configuration; incomplete credentials disable it
    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        let target = match (&config.telegram_bot_key, &config.telegram_channel_id) {
            (Some(bot_key), Some(channel_id)) => Some(TelegramTarget {
                bot_key: bot_key.clone(),
                channel_id: channel_id.clone(),
            }),
            _ => None,
        };

        Self {
            client,
            base_url: "https://api.telegram.org".to_string(),
            target,
        }
    }

    /// A sink that drops every message
    pub fn disabled(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: String::new(),
            target: None,
        }
    }

    /// Point the sink at a different API host
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Send `message` to the configured channel, fire-and-forget
    pub fn send(&self, message: &str) {
        let Some(target) = &self.target else {
            debug!(message = %message, "Telegram sink disabled, dropping alert");
            return;
        };

        let request = self
            .client
            .get(format!("{}/bot{}/sendMessage", self.base_url, target.bot_key))
            .query(&[("chat_id", target.channel_id.as_str()), ("text", message)]);

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) => {
                    debug!(status = %response.status(), "Message sent to Telegram channel");
                }
                Err(e) => {
                    error!(error = %e, "Error sending message to Telegram");
                }
            }
        });
    }

    /// Watch provider rate-limit headers and alert when the key runs dry.
    ///
    /// OpenAI reports `x-ratelimit-remaining-requests` and
    /// `x-ratelimit-reset-requests` on each response; providers without the
    /// headers are ignored.
    pub fn observe_rate_limit_headers(&self, provider: &str, headers: &HeaderMap) {
        let Some(remaining) = headers
            .get("x-ratelimit-remaining-requests")
            .and_then(|h| h.to_str().ok())
        else {
            return;
        };

        let reset = headers
            .get("x-ratelimit-reset-requests")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown");

        debug!(
            provider = provider,
            remaining = remaining,
            reset = reset,
            "Provider rate limit status"
        );

        if let Some(message) = alert_for_remaining(remaining) {
            warn!(provider = provider, remaining = remaining, "Provider API key running low");
            self.send(message);
        }
    }
}

/// Alert text for a remaining-requests reading, if it warrants one
fn alert_for_remaining(remaining: &str) -> Option<&'static str> {
    match remaining.parse::<u64>() {
        Ok(0) => Some("ALERT: OpenAI API Key doesn't have enough requests available."),
        Ok(10) => Some("WARNING: OpenAI API Key has 10 remaining requests."),
        _ => None,
    }
}
