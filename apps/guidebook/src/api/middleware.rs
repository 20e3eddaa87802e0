//! # Middleware Module
//!
//! Global request budget for the Guidebook HTTP API.
//!
//! Renders are cheap once cached but a cold render walks every tier of every
//! field, so the whole API shares one token bucket.
//!
//! ## Configuration
//!
//! - `GUIDEBOOK_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Requests per second when nothing is configured.
const DEFAULT_RPS: NonZeroU32 = NonZeroU32::MIN.saturating_add(99);

/// Shared limiter handed to the middleware as state.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Build the limiter. Zero is treated as the default rate; callers disable
/// limiting by not installing the middleware at all.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// `GUIDEBOOK_RATE_LIMIT`, or the default when unset or not a number.
pub fn get_rate_limit_from_env() -> u32 {
    parse_rate_limit(std::env::var("GUIDEBOOK_RATE_LIMIT").ok().as_deref())
}

fn parse_rate_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RPS.get())
}

/// Answer 429 with a `Retry-After` hint once the bucket is empty.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let denied = match limiter.check() {
        Ok(()) => return next.run(request).await,
        Err(denied) => denied,
    };

    let wait = denied.wait_time_from(DefaultClock::default().now());
    let retry_after = wait.as_secs().saturating_add(1);
    tracing::warn!(
        event = "rate_limited",
        path = %request.uri().path(),
        retry_after,
        "Rate limit exceeded"
    );

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse::new("Too Many Requests")),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

// =============================================================================
// TESTS
// =============================================================================
