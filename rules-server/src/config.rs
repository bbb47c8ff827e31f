//! Configuration module

use std::env;

use rules_core::constants::{
    DEFAULT_ALLOWED_ORIGINS, DEFAULT_EVALUATION_TIMEOUT_MS, DEFAULT_RATE_LIMIT_MAX,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, MAX_PAYLOAD_BYTES,
};

use crate::middleware::auth::hash_token;

const DEV_JWT_SECRET: &str = "notebook-dev-secret-change-in-production";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// HS256 secret for caller JWTs
    pub jwt_secret: String,

    /// SHA-256 digests of accepted API keys
    pub api_key_hashes: Vec<String>,

    /// CORS allow-list ("*" allows any origin)
    pub allowed_origins: Vec<String>,

    /// Requests per client per window
    pub rate_limit_max: u32,

    /// Rate limit window in seconds
    pub rate_limit_window_secs: u64,

    /// Maximum request body in bytes
    pub max_payload_bytes: usize,

    /// Wall-clock budget for one evaluation
    pub evaluation_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            environment: "development".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            api_key_hashes: Vec::new(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            evaluation_timeout_ms: DEFAULT_EVALUATION_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            port: parsed_var("PORT").unwrap_or(defaults.port),

            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),

            api_key_hashes: Vec::new(),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| parse_list(&origins))
                .unwrap_or(defaults.allowed_origins),

            rate_limit_max: parsed_var("RATE_LIMIT_MAX").unwrap_or(defaults.rate_limit_max),

            rate_limit_window_secs: parsed_var("RATE_LIMIT_WINDOW_SECS")
                .unwrap_or(defaults.rate_limit_window_secs),

            max_payload_bytes: parsed_var("MAX_PAYLOAD_BYTES").unwrap_or(defaults.max_payload_bytes),

            evaluation_timeout_ms: parsed_var("EVALUATION_TIMEOUT_MS")
                .unwrap_or(defaults.evaluation_timeout_ms),
        };

        let keys = env::var("EVALUATOR_API_KEYS").unwrap_or_default();
        parse_list(&keys)
            .iter()
            .fold(config, |config, key| config.with_api_key(key))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// True while the built-in development JWT secret is in use
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// JWTs are only trusted when signed with a deployment-specific secret
    /// or outside production
    pub fn accepts_jwt(&self) -> bool {
        !(self.is_production() && self.uses_dev_secret())
    }

    /// Reject settings the service must not start with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.accepts_jwt() {
            anyhow::bail!("JWT_SECRET must be set when ENVIRONMENT=production");
        }
        if self.rate_limit_max == 0 || self.rate_limit_window_secs == 0 {
            anyhow::bail!("RATE_LIMIT_MAX and RATE_LIMIT_WINDOW_SECS must be positive");
        }
        Ok(())
    }

    /// Register a plaintext API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key_hashes.push(hash_token(key));
        self
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Split a comma-separated env value, dropping blanks
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
