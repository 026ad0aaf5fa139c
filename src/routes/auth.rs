//! Session secret issuance
//!
//! `GET /auth` hands the session signing secret to a client that proved
//! possession of the distribution secret by signing the request with it.
//! The signature middleware has already verified that proof by the time
//! this handler runs.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::AppState;

/// Response carrying the session signing secret
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub value: String,
}

/// Hand out the session signing secret
pub async fn issue_session_secret(State(state): State<Arc<AppState>>) -> Json<AuthResponse> {
    info!("Authorization request received");

    Json(AuthResponse {
        value: state.config.hmac_secret_key.clone(),
    })
}
