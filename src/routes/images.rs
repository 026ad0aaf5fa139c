//! Image generation endpoints
//!
//! `/dalle` and `/gpt-image` turn a prompt into an image through the
//! OpenAI images API; `/gpt-image-edits` reworks an uploaded image,
//! optionally constrained by a mask.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    normalize,
    routes::read_json,
    AppState,
};

const VALID_SIZES: [&str; 4] = ["1024x1024", "1536x1024", "1024x1536", "auto"];
const VALID_QUALITIES: [&str; 4] = ["high", "medium", "low", "auto"];
const MAX_EDIT_PROMPT_CHARS: usize = 32000;

/// Image generation request body
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
}

/// Image edit request body
#[derive(Debug, Deserialize)]
pub struct ImageEditRequest {
    pub image: Option<String>,
    pub mask: Option<String>,
    pub prompt: Option<String>,
    pub size: Option<String>,
    pub quality: Option<String>,
}

/// Handle DALL-E image generation requests
pub async fn dalle(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let image_request: ImageRequest = read_json(request).await?;

    info!(
        prompt_chars = %image_request.prompt.chars().count(),
        "Processing image generation request"
    );

    let payload = json!({
        "model": "dall-e-3",
        "prompt": image_request.prompt,
        "n": 1,
        "size": "1024x1024"
    });

    let body = state
        .upstream
        .post_json(&state.openai, "/v1/images/generations", &payload)
        .await?;

    let image_url = normalize::image_url(&body)?;

    let duration = start_time.elapsed().as_secs_f64();

    info!(
        duration_ms = %format!("{:.2}", duration * 1000.0),
        "Image generation request completed"
    );

    Ok((StatusCode::OK, Json(json!({ "imageUrl": image_url }))).into_response())
}

/// Handle GPT Image generation requests
pub async fn gpt_image(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let image_request: ImageRequest = read_json(request).await?;

    info!(
        prompt_chars = %image_request.prompt.chars().count(),
        "Processing image generation request"
    );

    let payload = json!({
        "model": "gpt-image-1",
        "prompt": image_request.prompt,
        "size": "auto",
        "quality": "medium"
    });

    let body = state
        .upstream
        .post_json(&state.openai, "/v1/images/generations", &payload)
        .await?;

    let image_base64 = normalize::image_b64(&body)?;

    let duration = start_time.elapsed().as_secs_f64();

    info!(
        duration_ms = %format!("{:.2}", duration * 1000.0),
        "Image generation request completed"
    );

    Ok((StatusCode::OK, Json(json!({ "imageBase64": image_base64 }))).into_response())
}

/// Handle GPT Image edit requests
pub async fn gpt_image_edits(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let edit_request: ImageEditRequest = read_json(request).await?;

    let image = edit_request
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing \"image\" in request body".to_string()))?;

    let prompt = edit_request
        .prompt
        .filter(|prompt| !prompt.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing \"prompt\" in request body".to_string()))?;

    if prompt.chars().count() > MAX_EDIT_PROMPT_CHARS {
        return Err(AppError::InvalidInput(
            "Prompt length must be less than 32000 characters".to_string(),
        ));
    }

    let size = edit_request.size.filter(|size| !size.is_empty());
    if let Some(ref size) = size {
        if !VALID_SIZES.contains(&size.as_str()) {
            return Err(AppError::InvalidInput(
                "Invalid size. Must be one of: 1024x1024, 1536x1024, 1024x1536, auto".to_string(),
            ));
        }
    }

    let quality = edit_request.quality.filter(|quality| !quality.is_empty());
    if let Some(ref quality) = quality {
        if !VALID_QUALITIES.contains(&quality.as_str()) {
            return Err(AppError::InvalidInput(
                "Invalid quality. Must be one of: high, medium, low, auto".to_string(),
            ));
        }
    }

    let image_bytes = BASE64
        .decode(&image)
        .map_err(|e| AppError::InvalidInput(format!("Invalid base64 in \"image\": {}", e)))?;

    let mask_bytes = match edit_request.mask.filter(|mask| !mask.is_empty()) {
        Some(mask) => Some(
            BASE64
                .decode(&mask)
                .map_err(|e| AppError::InvalidInput(format!("Invalid base64 in \"mask\": {}", e)))?,
        ),
        None => None,
    };

    info!(
        prompt_chars = %prompt.chars().count(),
        image_bytes = %image_bytes.len(),
        has_mask = %mask_bytes.is_some(),
        "Processing image edit request"
    );

    // reqwest consumes a form on send, so build a fresh one per attempt
    let build_form = move || -> AppResult<Form> {
        let mut form = Form::new()
            .text("model", "gpt-image-1")
            .text("prompt", prompt.clone())
            .part(
                "image",
                Part::bytes(image_bytes.clone())
                    .file_name("image.png")
                    .mime_str("image/png")
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid mime type: {}", e)))?,
            );

        if let Some(ref mask_bytes) = mask_bytes {
            form = form.part(
                "mask",
                Part::bytes(mask_bytes.clone())
                    .file_name("mask.png")
                    .mime_str("image/png")
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid mime type: {}", e)))?,
            );
        }
        if let Some(ref size) = size {
            form = form.text("size", size.clone());
        }
        if let Some(ref quality) = quality {
            form = form.text("quality", quality.clone());
        }

        Ok(form)
    };

    let body = state
        .upstream
        .post_multipart(&state.openai, "/v1/images/edits", build_form)
        .await?;

    let image_base64 = normalize::image_b64(&body)?;

    let duration = start_time.elapsed().as_secs_f64();

    info!(
        duration_ms = %format!("{:.2}", duration * 1000.0),
        "Image edit request completed"
    );

    Ok((StatusCode::OK, Json(json!({ "imageBase64": image_base64 }))).into_response())
}
