//! Vision endpoint
//!
//! Relays a base64 photo to the OpenAI vision model. Requests from the
//! gateway's own app (matched by the `X-App-Identifier` header) get a
//! server-side analysis prompt; anyone else gets an empty one.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::AppError,
    normalize, prompts,
    routes::read_json,
    AppState,
};

/// Vision request body
#[derive(Debug, Deserialize)]
pub struct VisionRequest {
    pub image: Option<String>,
    pub language: Option<String>,
}

/// True when the `X-App-Identifier` header matches the configured app
fn app_matches(headers: &HeaderMap, app_identifier: &str) -> bool {
    headers
        .get("x-app-identifier")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == app_identifier)
}

/// Handle vision requests
pub async fn vision(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let vision_request: VisionRequest = read_json(request).await?;

    let image = vision_request
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing \"image\" in request body".to_string()))?;

    // The server-side prompts are reserved for the gateway's own app
    let prompt = if app_matches(&headers, &state.config.app_identifier) {
        prompts::build_vision_prompt(vision_request.language.as_deref())
    } else {
        String::new()
    };

    info!(
        image_chars = %image.len(),
        language = %vision_request.language.as_deref().unwrap_or("none"),
        "Processing vision request"
    );

    let payload = json!({
        "model": "gpt-4o",
        "messages": [
            {
                "role": "system",
                "content": [
                    {
                        "type": "text",
                        "text": prompt
                    }
                ]
            },
            {
                "role": "user",
                "content": [
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/jpeg;base64,{}", image),
                            "detail": "low"
                        }
                    }
                ]
            }
        ],
        "max_tokens": state.config.vision_max_tokens
    });

    let body = state
        .upstream
        .post_json(&state.openai, "/v1/chat/completions", &payload)
        .await?;

    let analysis = normalize::vision_json(&body)?;

    let duration = start_time.elapsed().as_secs_f64();

    info!(
        duration_ms = %format!("{:.2}", duration * 1000.0),
        "Vision request completed"
    );

    Ok((StatusCode::OK, Json(analysis)).into_response())
}
