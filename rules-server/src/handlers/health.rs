//! Health check handler

use axum::Json;
use rules_core::constants::{MAX_RULES, MAX_TARGETS};
use serde::Serialize;

/// Liveness plus the request limits callers must respect
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    max_rules: usize,
    max_targets: usize,
    timestamp: i64,
}

pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "rules-evaluator",
        version: env!("CARGO_PKG_VERSION"),
        max_rules: MAX_RULES,
        max_targets: MAX_TARGETS,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
