//! # Guidebook HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /pages` - List declared pages and supported locales
//! - `GET /pages/{key}?lang=` - Render a page context
//! - `GET /pages/{key}/fields/{field}?lang=&trace=` - Resolve one field
//! - `GET /render/{*path}` - Render by public path (`/it/guides/positano-beaches`)
//! - `GET /coverage?lang=` - Localization coverage report
//! - `GET /cache` - Context cache counters
//! - `POST /cache/reset` - Drop every cached context
//! - `POST /reload` - Reload bundles and pages from disk
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `GUIDEBOOK_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `GUIDEBOOK_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `GUIDEBOOK_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use handlers::{
    cache_reset_handler, cache_stats_handler, coverage_handler, field_handler, health_handler,
    page_handler, pages_handler, reload_handler, render_path_handler,
};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    CacheResetResponse, ErrorResponse, FieldQuery, FieldResponse, HealthResponse, LangQuery,
    PageResponse, PageSummary, PagesResponse, ReloadResponse,
};

use crate::catalog::Catalog;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use guidebook_core::{ContextCache, GuideError};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the loaded catalog and the context cache.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RwLock<Catalog>>,
    pub cache: Arc<Mutex<ContextCache>>,
}

impl AppState {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            cache: Arc::new(Mutex::new(ContextCache::new())),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Origins a browser page may call the API from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
    Localhost,
}

/// Development front-ends served from the local machine.
const LOCALHOST_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8080",
];

/// Interpret `GUIDEBOOK_CORS_ORIGINS`: `*`, a comma-separated list, or unset.
/// Entries that are not valid header values are dropped; a list with no
/// usable entry falls back to localhost.
fn parse_cors_origins(raw: Option<&str>) -> CorsOrigins {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return CorsOrigins::Localhost;
    };
    if raw == "*" {
        return CorsOrigins::Any;
    }

    let origins: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsOrigins::Localhost
    } else {
        CorsOrigins::List(origins)
    }
}

fn build_cors_layer() -> CorsLayer {
    let origins = parse_cors_origins(std::env::var("GUIDEBOOK_CORS_ORIGINS").ok().as_deref());
    let allowed = match origins {
        CorsOrigins::Any => {
            tracing::warn!(
                "CORS: Allowing ALL origins (GUIDEBOOK_CORS_ORIGINS=*). This is insecure for production!"
            );
            return CorsLayer::permissive();
        }
        CorsOrigins::List(list) => {
            tracing::info!("CORS: Allowing {} configured origin(s)", list.len());
            list
        }
        CorsOrigins::Localhost => {
            tracing::info!("CORS: Defaulting to localhost origins only");
            LOCALHOST_ORIGINS
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect()
        }
    };

    // The API is read-mostly; POST covers cache reset and reload.
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - global request budget (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - cache reset and reload are publicly accessible. \
             Set GUIDEBOOK_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/pages", get(handlers::pages_handler))
        .route("/pages/{key}", get(handlers::page_handler))
        .route("/pages/{key}/fields/{field}", get(handlers::field_handler))
        .route("/render/{*path}", get(handlers::render_path_handler))
        .route("/coverage", get(handlers::coverage_handler))
        .route("/cache", get(handlers::cache_stats_handler))
        .route("/cache/reset", post(handlers::cache_reset_handler))
        .route("/reload", post(handlers::reload_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, catalog: Catalog) -> Result<(), GuideError> {
    let state = AppState::new(catalog);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GuideError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Guidebook HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GuideError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// =============================================================================
// TESTS
// =============================================================================
