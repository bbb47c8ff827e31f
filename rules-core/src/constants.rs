//! Central Limits & Defaults
//!
//! Single source of truth for the evaluation boundary limits and the
//! pattern guard budgets. The server reads its defaults from here.

// ============================================================================
// BOUNDARY LIMITS
// ============================================================================

/// Maximum accepted request body (1 MiB)
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Maximum number of rules per evaluation request
pub const MAX_RULES: usize = 1000;

/// Maximum number of targets per evaluation request
pub const MAX_TARGETS: usize = 1000;

// ============================================================================
// PATTERN GUARD
// ============================================================================

/// Patterns longer than this are never compiled
pub const MAX_PATTERN_LENGTH: usize = 100;

/// Upper bound on a compiled pattern program (bytes)
pub const REGEX_SIZE_LIMIT: usize = 256 * 1024;

/// Upper bound on the lazy DFA cache per pattern (bytes)
pub const REGEX_DFA_SIZE_LIMIT: usize = 512 * 1024;

// ============================================================================
// SERVICE DEFAULTS
// ============================================================================

/// Requests allowed per client per window
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;

/// Rate limit window (seconds)
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Wall-clock budget for one evaluation on the server (milliseconds)
pub const DEFAULT_EVALUATION_TIMEOUT_MS: u64 = 5000;

/// Client-side request timeout (milliseconds)
pub const DEFAULT_CLIENT_TIMEOUT_MS: u64 = 8000;

/// Origins honored by default (local notebook dev servers)
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:3001"];

/// Path of the evaluation endpoint
pub const EVALUATE_PATH: &str = "/api/v1/evaluate";

/// Group key for suggestions without an inferred service
pub const OTHER_SERVICE: &str = "other";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get evaluation service base URL from environment
pub fn get_evaluator_url() -> Option<String> {
    std::env::var("EVALUATOR_URL")
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
}

/// Get client timeout from environment or use default
pub fn get_client_timeout_ms() -> u64 {
    std::env::var("EVALUATOR_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CLIENT_TIMEOUT_MS)
}
