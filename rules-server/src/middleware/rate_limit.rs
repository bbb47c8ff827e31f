//! Rate limit middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::{HeaderMap, HeaderName, HeaderValue},
};

use crate::{AppState, AppError};
use crate::limiter::RateDecision;

/// Identity used when no forwarding header is present
const UNKNOWN_CLIENT: &str = "unknown";

/// Requests left in the caller's current window
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Middleware: Enforce the per-client request budget
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_identity(req.headers());

    match state.limiter.check(&client) {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            response
                .headers_mut()
                .insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
            Ok(response)
        }
        RateDecision::Limited { retry_after } => {
            tracing::warn!("Rate limit exceeded for client {}", client);
            Err(AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            })
        }
    }
}

/// First hop of X-Forwarded-For, or a shared bucket when absent
pub fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
