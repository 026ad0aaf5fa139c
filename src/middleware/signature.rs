//! Request signature middleware
//!
//! Every signed route requires an `x-signature` header: the hex HMAC-SHA256
//! of the request path+query, keyed by the auth secret for /auth and the
//! session secret everywhere else.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use crate::{error::AppError, routes::metrics, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex signature clients send for `message`.
///
/// This mirrors what the mobile client computes; tests use it to produce
/// valid signatures.
pub fn sign(secret: &str, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex HMAC-SHA256 signature over `message`.
///
/// Comparison is constant time via `verify_slice`; a malformed signature
/// simply fails verification.
pub fn verify(secret: &str, message: &str, signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(message.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Signature verification middleware
///
/// The signature covers the path and query exactly as the client sent them,
/// never the body. /auth bootstraps trust from the pre-shared auth secret;
/// every other route uses the session secret that /auth hands out.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn signature_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let signature = request
        .headers()
        .get("x-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let uri = request.uri();
    let message = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let secret = if uri.path() == "/auth" {
        &state.config.auth_secret_key
    } else {
        &state.config.hmac_secret_key
    };

    if !verify(secret, message, signature) {
        warn!("Request signature verification failed");
        metrics::record_signature_failure();
        return Err(AppError::Unauthorized);
    }

    debug!("Request signature verified");

    Ok(next.run(request).await)
}
