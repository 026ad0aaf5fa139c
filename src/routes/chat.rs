//! Chat endpoint
//!
//! Relays a prompt to the OpenAI chat completions API and returns the
//! assistant's reply.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::AppError,
    normalize,
    routes::read_json,
    AppState,
};

/// Chat request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

/// Handle chat requests
pub async fn chatgpt(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let chat_request: ChatRequest = read_json(request).await?;

    info!(
        prompt_chars = %chat_request.prompt.chars().count(),
        "Processing chat request"
    );

    let payload = json!({
        "model": "gpt-4",
        "messages": [
            {
                "role": "system",
                "content": "You are a helpful assistant."
            },
            {
                "role": "user",
                "content": chat_request.prompt
            }
        ]
    });

    let body = state
        .upstream
        .post_json(&state.openai, "/v1/chat/completions", &payload)
        .await?;

    let message = normalize::assistant_text(&body)?;

    let duration = start_time.elapsed().as_secs_f64();

    info!(
        duration_ms = %format!("{:.2}", duration * 1000.0),
        "Chat request completed"
    );

    Ok((StatusCode::OK, Json(json!({ "message": message }))).into_response())
}
