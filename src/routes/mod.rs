//! HTTP routes for the gateway
//!
//! This module defines all HTTP endpoints exposed by the gateway.

pub mod anthropic;
pub mod auth;
pub mod chat;
pub mod health;
pub mod images;
pub mod metrics;
pub mod vision;

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware,
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    middleware::{rate_limiter::rate_limit_middleware, signature::signature_middleware},
    AppState,
};

/// Request body ceiling; base64 images are large
pub(crate) const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Read a request body and deserialize it as JSON
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> AppResult<T> {
    let body_bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read request body: {}", e)))?;

    serde_json::from_slice(&body_bytes)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that require a valid signature and count against a rate limit
    // Middleware is applied in reverse order (last applied runs first)
    // So: rate limiting runs first, then signature verification
    let signed_routes = Router::new()
        .route("/auth", get(auth::issue_session_secret))
        .route("/chatgpt", post(chat::chatgpt))
        .route("/vision", post(vision::vision))
        .route("/dalle", post(images::dalle))
        .route("/gpt-image", post(images::gpt_image))
        .route("/gpt-image-edits", post(images::gpt_image_edits))
        .route("/anthropic-messages", post(anthropic::anthropic_messages))
        // Apply signature verification (runs after rate limiting)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            signature_middleware,
        ))
        // Apply rate limiting (runs first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    // Public routes (health checks, metrics) - no signature required
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        .merge(signed_routes)
        // Global middleware (applied to all routes)
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
