//! Authentication middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Digest};

use crate::{AppState, AppError};
use crate::config::Config;

/// Claims accepted on caller JWTs (notebook backend user/anon tokens)
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,  // User ID
    #[serde(default)]
    pub role: Option<String>, // e.g. "authenticated", "anon"
    pub exp: usize,           // Expiration timestamp
}

/// How the caller proved its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerKind {
    ApiKey,
    Jwt,
}

/// Caller context extracted from the bearer credential
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub caller_id: String,
    pub kind: CallerKind,
    pub role: Option<String>,
}

/// Middleware: Require a recognized caller credential
pub async fn require_caller_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)?;
    let caller = authenticate(&state.config, &token)?;

    tracing::debug!(
        "Caller authenticated: {} ({:?}, role {})",
        caller.caller_id,
        caller.kind,
        caller.role.as_deref().unwrap_or("-")
    );

    // Insert into request extensions
    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

/// Resolve a bearer token to a caller: configured API key first, then JWT
pub fn authenticate(config: &Config, token: &str) -> Result<CallerContext, AppError> {
    let token_hash = hash_token(token);
    if config.api_key_hashes.iter().any(|h| *h == token_hash) {
        return Ok(CallerContext {
            caller_id: format!("key:{}", &token_hash[..12]),
            kind: CallerKind::ApiKey,
            role: None,
        });
    }

    // Anything that is not shaped like a JWT is simply unknown
    if !config.accepts_jwt() || token.split('.').count() != 3 {
        return Err(AppError::Unauthorized);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )?
    .claims;

    let caller_id = claims
        .sub
        .clone()
        .or_else(|| claims.role.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    Ok(CallerContext {
        caller_id,
        kind: CallerKind::Jwt,
        role: claims.role,
    })
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req.headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    Ok(token.to_string())
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

// Implement FromRequestParts for CallerContext
#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<CallerContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

// ============================================================================
// TESTS
// ============================================================================
