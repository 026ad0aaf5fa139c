//! Anthropic messages endpoint
//!
//! One endpoint, two request shapes: `{prompt}` relays a chat message,
//! `{image, language}` asks for an image analysis. Analysis requests
//! whose `language` carries the skin-analysis marker degrade to a
//! default record instead of failing; the consumer renders whatever it
//! receives.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::AppError,
    normalize::{
        self,
        skin::{SkinAnalysis, OVERLOAD_FALLBACK, SERVICE_FALLBACK},
    },
    prompts,
    routes::read_json,
    AppState,
};

const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Anthropic messages request body
#[derive(Debug, Deserialize)]
pub struct AnthropicRequest {
    pub prompt: Option<String>,
    pub image: Option<String>,
    pub language: Option<String>,
}

/// Handle Anthropic messages requests
pub async fn anthropic_messages(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let message_request: AnthropicRequest = read_json(request).await?;

    let prompt = message_request.prompt.filter(|prompt| !prompt.is_empty());
    let image = message_request.image.filter(|image| !image.is_empty());
    let language = message_request
        .language
        .filter(|language| !language.is_empty());

    // A prompt makes this a chat request even when image fields are present
    let (messages, skin) = if let Some(ref prompt) = prompt {
        info!(prompt_chars = %prompt.chars().count(), "Processing message request");

        (json!([{ "role": "user", "content": prompt }]), false)
    } else if let (Some(ref image), Some(ref language)) = (&image, &language) {
        let vision_prompt = prompts::build_vision_prompt(Some(language));

        info!(
            image_chars = %image.len(),
            language = %language,
            "Processing image analysis request"
        );

        let messages = json!([
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": vision_prompt
                    },
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/jpeg",
                            "data": image
                        }
                    }
                ]
            }
        ]);

        (messages, prompts::is_skin_analysis(Some(language)))
    } else {
        return Err(AppError::InvalidInput("Invalid request body".to_string()));
    };

    let payload = json!({
        "model": ANTHROPIC_MODEL,
        "max_tokens": state.config.anthropic_max_tokens,
        "messages": messages
    });

    let result = state
        .upstream
        .post_json(&state.anthropic, "/v1/messages", &payload)
        .await;

    if skin {
        let analysis = match result {
            Ok(body) => match normalize::anthropic_text(&body) {
                Ok(text) => SkinAnalysis::from_provider_text(&text),
                Err(_) => SkinAnalysis::fallback(SERVICE_FALLBACK),
            },
            Err(AppError::UpstreamOverloaded(_)) => SkinAnalysis::fallback(OVERLOAD_FALLBACK),
            Err(_) => SkinAnalysis::fallback(SERVICE_FALLBACK),
        };

        let duration = start_time.elapsed().as_secs_f64();

        info!(
            success = %analysis.success,
            duration_ms = %format!("{:.2}", duration * 1000.0),
            "Skin analysis request completed"
        );

        return Ok((StatusCode::OK, Json(analysis)).into_response());
    }

    let body = result?;
    let text = normalize::anthropic_text(&body)?;

    let response = if prompt.is_some() {
        json!({ "message": text })
    } else {
        serde_json::from_str::<Value>(&text).map_err(|_| {
            AppError::Normalization("An error occurred while parsing Anthropic response".to_string())
        })?
    };

    let duration = start_time.elapsed().as_secs_f64();

    info!(
        duration_ms = %format!("{:.2}", duration * 1000.0),
        "Message request completed"
    );

    Ok((StatusCode::OK, Json(response)).into_response())
}
