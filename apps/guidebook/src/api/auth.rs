//! # Authentication Module
//!
//! Optional API key for the Guidebook HTTP API.
//!
//! Rendered guide content is usually public, but the same router also exposes
//! cache and reload controls. Setting `GUIDEBOOK_API_KEY` closes every route
//! except the ones in [`PUBLIC_PATHS`].
//!
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```
//!
//! A bare key without the `Bearer ` scheme is accepted as well.

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

/// Routes that never require a key.
const PUBLIC_PATHS: &[&str] = &["/health"];

/// Read `GUIDEBOOK_API_KEY`. Unset or empty disables authentication.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("GUIDEBOOK_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthFailure {
    MissingCredentials,
    InvalidKey,
}

impl AuthFailure {
    fn reason(self) -> &'static str {
        match self {
            AuthFailure::MissingCredentials => "missing_authorization_header",
            AuthFailure::InvalidKey => "invalid_api_key",
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Unauthorized")),
        )
            .into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            header::HeaderValue::from_static("Bearer"),
        );
        response
    }
}

/// Key carried by the request, with any `Bearer ` scheme removed.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let key = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!key.is_empty()).then_some(key)
}

/// Constant-time equality. Both sides are padded to the longer length so the
/// comparison time does not reveal the expected key's length.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let width = provided.len().max(expected.len());
    let mut lhs = vec![0u8; width];
    let mut rhs = vec![0u8; width];
    lhs[..provided.len()].copy_from_slice(provided);
    rhs[..expected.len()].copy_from_slice(expected);

    let same_bytes: bool = lhs.ct_eq(&rhs).into();
    same_bytes && provided.len() == expected.len()
}

fn check(headers: &HeaderMap, expected: &str) -> Result<(), AuthFailure> {
    let provided = presented_key(headers).ok_or(AuthFailure::MissingCredentials)?;
    if keys_match(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AuthFailure::InvalidKey)
    }
}

/// API key middleware. Installed only when a key is configured, but it
/// re-reads the environment so a cleared key reopens the API.
pub async fn api_key_auth_middleware(request: Request<Body>, next: Next) -> Response {
    let Some(expected) = get_api_key_from_env() else {
        return next.run(request).await;
    };
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    match check(request.headers(), &expected) {
        Ok(()) => next.run(request).await,
        Err(failure) => {
            tracing::warn!(
                event = "auth_failure",
                reason = failure.reason(),
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected request without a valid API key"
            );
            failure.into_response()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = authorization.parse() {
            headers.insert(header::AUTHORIZATION, value);
        }
        headers
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"secret", b"secret"));
        assert!(!keys_match(b"secret", b"secreT"));
        assert!(!keys_match(b"secret", b"secret-longer"));
        assert!(!keys_match(b"", b"secret"));
    }

    #[test]
    fn test_presented_key_accepts_bearer_and_bare() {
        assert_eq!(presented_key(&headers("Bearer abc")), Some("abc"));
        assert_eq!(presented_key(&headers("abc")), Some("abc"));
        assert_eq!(presented_key(&headers("Bearer   ")), None);
        assert_eq!(presented_key(&HeaderMap::new()), None);
    }

    #[test]
    fn test_check_distinguishes_failures() {
        assert_eq!(check(&headers("Bearer k1"), "k1"), Ok(()));
        assert_eq!(
            check(&headers("Bearer k2"), "k1"),
            Err(AuthFailure::InvalidKey)
        );
        assert_eq!(
            check(&HeaderMap::new(), "k1"),
            Err(AuthFailure::MissingCredentials)
        );
    }
}
