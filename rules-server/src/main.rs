//! Rule Evaluation Service
//!
//! HTTP boundary in front of the notebook's rule engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  RULE EVALUATION SERVICE                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐ │
//! │  │  CORS     │─▶│  Rate     │─▶│  Auth     │─▶│ Payload  │ │
//! │  │  allow-   │  │  limiter  │  │ (API key/ │  │ limits + │ │
//! │  │  list     │  │  (window) │  │   JWT)    │  │ shape    │ │
//! │  └───────────┘  └───────────┘  └───────────┘  └────┬─────┘ │
//! │                                                    ▼       │
//! │                                        ┌──────────────────┐│
//! │                                        │ rules-core       ││
//! │                                        │ (blocking pool,  ││
//! │                                        │  timeout)        ││
//! │                                        └──────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod models;
mod handlers;
mod middleware;
mod limiter;
mod error;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
        HeaderName, HeaderValue, Method,
    },
};
use rules_core::constants::EVALUATE_PATH;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

use crate::limiter::{FixedWindowLimiter, RateLimiter};

/// Preflight cache lifetime
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging
    init_tracing();

    let config = config::Config::from_env();
    config.validate()?;

    tracing::info!("Rule evaluation service starting...");
    tracing::info!(
        "Limits: {} req/{}s per client, {} byte bodies, {} ms evaluation budget",
        config.rate_limit_max,
        config.rate_limit_window_secs,
        config.max_payload_bytes,
        config.evaluation_timeout_ms
    );
    if config.api_key_hashes.is_empty() {
        tracing::info!("No API keys configured; only JWT callers will be accepted");
    }
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using the development secret");
    }

    let port = config.port;

    // Build application state
    let state = AppState::new(config);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rules_server=debug,rules_core=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// State with the in-process fixed-window limiter
    pub fn new(config: config::Config) -> Self {
        let limiter = FixedWindowLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        Self::with_limiter(config, Arc::new(limiter))
    }

    /// State with an externally owned limiter
    pub fn with_limiter(config: config::Config, limiter: Arc<dyn RateLimiter>) -> Self {
        Self { config, limiter }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check));

    // Evaluation routes: rate limit runs first, then caller auth
    let evaluation_routes = Router::new()
        .route(EVALUATE_PATH, post(handlers::evaluate::evaluate))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_caller_auth
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::enforce_rate_limit
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(evaluation_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}

/// CORS restricted to the configured origins ("*" opens it up)
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .expose_headers([RETRY_AFTER, middleware::rate_limit::RATE_LIMIT_REMAINING])
        .max_age(CORS_MAX_AGE)
}
