//! Response normalization
//!
//! Maps raw provider JSON into the stable shapes clients consume. Providers
//! sometimes return 2xx bodies carrying an error object instead of content;
//! those surface as `UpstreamContent`.

pub mod skin;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, AppResult};

static LEADING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```json\n?").unwrap());
static TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```$").unwrap());

/// Strip a markdown ```json fence from model output, if present
pub fn strip_markdown_fence(text: &str) -> String {
    let without_leading = LEADING_FENCE.replace(text, "");
    TRAILING_FENCE.replace(&without_leading, "").into_owned()
}

/// Reject a 2xx body that carries a provider error object
fn check_provider_error(body: &Value) -> AppResult<()> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        return Err(AppError::UpstreamContent { code, message });
    }
    Ok(())
}

/// Extract the assistant text from an OpenAI chat completion
pub fn assistant_text(body: &Value) -> AppResult<String> {
    check_provider_error(body)?;

    if let Some(total_tokens) = body.pointer("/usage/total_tokens").and_then(Value::as_u64) {
        debug!(total_tokens = total_tokens, "Upstream reported token usage");
    }

    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AppError::Normalization("Missing assistant message in upstream response".to_string())
        })
}

/// Extract the assistant text from an Anthropic message response
pub fn anthropic_text(body: &Value) -> AppResult<String> {
    body.pointer("/content/0/text")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AppError::Normalization("Missing message content in upstream response".to_string())
        })
}

/// Parse the assistant text of a vision completion as a JSON object,
/// tolerating a markdown fence around it
pub fn vision_json(body: &Value) -> AppResult<Value> {
    let text = assistant_text(body)?;
    let stripped = strip_markdown_fence(&text);

    serde_json::from_str(&stripped).map_err(|e| {
        AppError::Normalization(format!("Failed to parse vision response as JSON: {}", e))
    })
}

/// First generated image URL from an image-generation response
pub fn image_url(body: &Value) -> AppResult<String> {
    check_provider_error(body)?;

    body.pointer("/data/0/url")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AppError::Normalization("Missing image URL in upstream response".to_string())
        })
}

/// First generated image payload, base64-encoded
pub fn image_b64(body: &Value) -> AppResult<String> {
    check_provider_error(body)?;

    body.pointer("/data/0/b64_json")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AppError::Normalization("Missing image data in upstream response".to_string())
        })
}
