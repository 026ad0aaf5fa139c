//! Rate limiting middleware
//!
//! Implements fixed-window rate limiting with in-memory counters, keyed by
//! client address. Two independent windows exist: one for /auth and one
//! shared across the generation routes. Counters reset lazily when a window
//! elapses, so state decays without a background task.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{config::Config, error::AppError, routes::metrics, AppState};

/// Length of every rate-limit window
pub const WINDOW: Duration = Duration::from_millis(300_000);

/// Time source for the limiter
///
/// Injectable so tests can drive window expiry deterministically instead of
/// sleeping through a five-minute window.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time source used in production
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced time source for tests
#[cfg(any(test, feature = "test-utils"))]
pub struct ManualClock {
    now: std::sync::Mutex<Instant>,
}

#[cfg(any(test, feature = "test-utils"))]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `duration`
    pub fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// Counter state for one client key
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    reset_at: Instant,
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum requests allowed in window
    pub limit: u64,
    /// Remaining requests in current window
    pub remaining: u64,
    /// Current request count
    pub current: u64,
    /// Time until the window resets
    pub reset_in: Duration,
}

impl RateLimitResult {
    /// Create rate limit headers for the response
    pub fn headers(&self) -> Vec<(header::HeaderName, HeaderValue)> {
        let mut headers = vec![
            (
                header::HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from_str(&self.limit.to_string()).unwrap(),
            ),
            (
                header::HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from_str(&self.remaining.to_string()).unwrap(),
            ),
            (
                header::HeaderName::from_static("x-ratelimit-reset"),
                HeaderValue::from_str(&self.reset_in.as_secs().to_string()).unwrap(),
            ),
        ];

        if !self.allowed {
            // Add Retry-After header when rate limited
            let retry_after = self.reset_in.as_secs().max(1);
            headers.push((
                header::RETRY_AFTER,
                HeaderValue::from_str(&retry_after.to_string()).unwrap(),
            ));
        }

        headers
    }
}

/// Fixed-window request counter over client keys
///
/// # Thread Safety
///
/// Uses RwLock for interior mutability; the lock is held only for the map
/// update, never across an await point.
pub struct FixedWindowLimiter {
    max_requests: u64,
    window: Duration,
    store: RwLock<HashMap<String, Window>>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    /// Create a limiter over the standard window with the wall clock
    pub fn new(max_requests: u64) -> Self {
        Self::with_clock(max_requests, Arc::new(SystemClock))
    }

    /// Create a limiter with an injected time source
    pub fn with_clock(max_requests: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window: WINDOW,
            store: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Count one request against `key` and report whether it fits the window.
    ///
    /// The counter for a key is created on first use and reset lazily once
    /// its window has elapsed.
    pub fn check(&self, key: &str) -> RateLimitResult {
        let now = self.clock.now();
        let mut store = self.store.write().unwrap();

        let window = store.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + self.window;
        }

        window.count += 1;

        RateLimitResult {
            allowed: window.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            current: window.count,
            reset_in: window.reset_at.saturating_duration_since(now),
        }
    }
}

/// The two rate-limit groups the gateway distinguishes
pub struct RateLimiters {
    /// Window for GET /auth
    pub auth: FixedWindowLimiter,
    /// Window shared across the generation routes
    pub prompt: FixedWindowLimiter,
}

impl RateLimiters {
    /// Create both limiters from configured ceilings
    pub fn new(config: &Config) -> Self {
        Self {
            auth: FixedWindowLimiter::new(config.auth_limit),
            prompt: FixedWindowLimiter::new(config.prompt_limit),
        }
    }

    /// Create both limiters over an injected time source
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_clock(auth_limit: u64, prompt_limit: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            auth: FixedWindowLimiter::with_clock(auth_limit, clock.clone()),
            prompt: FixedWindowLimiter::with_clock(prompt_limit, clock),
        }
    }
}

/// Client key for the limiter: first hop of x-forwarded-for when present
/// (trusted-proxy deployment), otherwise the socket peer address.
fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|addr| !addr.is_empty());

    if let Some(addr) = forwarded {
        return addr.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Build a 429 Too Many Requests response with rate limit headers
pub fn rate_limit_exceeded_response(result: &RateLimitResult) -> Response {
    let mut response = AppError::RateLimited.into_response();

    let headers = response.headers_mut();
    for (name, value) in result.headers() {
        headers.insert(name, value);
    }

    response
}

/// Rate limiting middleware
///
/// Counts the request against its group window and returns 429 once the
/// ceiling is exceeded. Runs before signature verification, so an over-limit
/// client is rejected without the HMAC work. Adds rate limit headers to all
/// responses.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    let (group, limiter) = if request.uri().path() == "/auth" {
        ("auth", &state.limiters.auth)
    } else {
        ("prompt", &state.limiters.prompt)
    };

    let result = limiter.check(&key);

    if !result.allowed {
        tracing::warn!(
            client = %key,
            group = group,
            limit = result.limit,
            current = result.current,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(group);
        return rate_limit_exceeded_response(&result);
    }

    // Process request
    let mut response = next.run(request).await;

    // Add rate limit headers to successful response
    let headers = response.headers_mut();
    for (name, value) in result.headers() {
        headers.insert(name, value);
    }

    response
}
