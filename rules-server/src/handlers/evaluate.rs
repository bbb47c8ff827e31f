//! Rule evaluation handler

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_LENGTH, HeaderMap},
    Json,
};
use rules_core::engine::{evaluate_all, EvaluatedSuggestion};
use uuid::Uuid;

use crate::{AppState, AppResult, AppError};
use crate::middleware::auth::CallerContext;
use crate::models::EvaluateRequest;

/// Evaluate a rule library against one engagement
pub async fn evaluate(
    State(state): State<AppState>,
    caller: CallerContext,
    headers: HeaderMap,
    body: Body,
) -> AppResult<Json<Vec<EvaluatedSuggestion>>> {
    let request_id = Uuid::new_v4();
    let limit = state.config.max_payload_bytes;

    if declared_length(&headers).is_some_and(|len| len > limit) {
        return Err(AppError::PayloadTooLarge);
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!("Request {} body rejected: {}", request_id, e);
        AppError::PayloadTooLarge
    })?;

    let EvaluateRequest {
        rules,
        engagement,
        targets,
        selected_target,
    } = EvaluateRequest::from_body(&bytes)?;

    let rule_count = rules.len();
    let target_count = targets.len();
    let timeout = Duration::from_millis(state.config.evaluation_timeout_ms);

    // The core is synchronous; keep it off the async workers and bound it
    let task = tokio::task::spawn_blocking(move || {
        evaluate_all(&rules, &engagement, &targets, selected_target.as_ref())
    });

    let suggestions = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(suggestions)) => suggestions,
        Ok(Err(join_error)) => {
            return Err(AppError::InternalError(format!(
                "request {}: evaluation task failed: {}",
                request_id, join_error
            )));
        }
        Err(_) => {
            return Err(AppError::EvaluationUnavailable(format!(
                "request {}: exceeded {} ms",
                request_id, state.config.evaluation_timeout_ms
            )));
        }
    };

    tracing::info!(
        %request_id,
        caller = %caller.caller_id,
        rules = rule_count,
        targets = target_count,
        suggestions = suggestions.len(),
        "Rules evaluated"
    );

    Ok(Json(suggestions))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

// ============================================================================
// TESTS
// ============================================================================
