//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        CacheResetResponse, ErrorResponse, FieldQuery, FieldResponse, HealthResponse, LangQuery,
        PageResponse, PageSummary, PagesResponse, ReloadResponse,
    },
};
use crate::catalog::Catalog;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use guidebook_core::{CoverageReport, Field, GuideError, RequestLocale};

/// HTTP status for an engine or catalog error.
fn error_status(err: &GuideError) -> StatusCode {
    match err {
        GuideError::PageNotFound(_) => StatusCode::NOT_FOUND,
        GuideError::UndefinedField { .. }
        | GuideError::InvalidField(_)
        | GuideError::InvalidLocale(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &GuideError) -> Response {
    (error_status(err), Json(ErrorResponse::new(err.to_string()))).into_response()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// PAGES HANDLERS
// =============================================================================

/// List declared pages and supported locales.
pub async fn pages_handler(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.catalog.read().await;
    let response = PagesResponse {
        reference_locale: catalog.locale_resolver().config().reference().to_string(),
        locales: catalog.locales().iter().map(ToString::to_string).collect(),
        pages: catalog.pages().map(PageSummary::from_declaration).collect(),
    };

    (StatusCode::OK, Json(response))
}

/// Render one page for `?lang=`.
pub async fn page_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<LangQuery>,
) -> Response {
    render(&state, &key, &query.request_locale()).await
}

/// Render a page addressed by its public path, `/{lang}/{guides}/{slug}`.
///
/// The locale comes from the first path segment and the page from the last.
pub async fn render_path_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    let Some(slug) = path.rsplit('/').find(|s| !s.trim().is_empty()) else {
        return error_response(&GuideError::PageNotFound(path.clone()));
    };
    let slug = slug.to_string();
    render(&state, &slug, &RequestLocale::from_path(path)).await
}

async fn render(state: &AppState, key: &str, request: &RequestLocale) -> Response {
    let catalog = state.catalog.read().await;
    let page = match catalog.page(key) {
        Ok(page) => page,
        Err(e) => return error_response(&e),
    };

    let context = {
        let mut cache = state.cache.lock().await;
        cache.get_or_assemble(&catalog.assembler(), page, request)
    };
    tracing::debug!(
        page = %page.key(),
        locale = %context.locales().target,
        localized = context.is_localized(),
        "Rendered page"
    );

    let response = PageResponse {
        tiers: context.tiers(),
        context: context.as_ref(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Resolve one field of a page, optionally with its trace.
pub async fn field_handler(
    State(state): State<AppState>,
    Path((key, field)): Path<(String, String)>,
    Query(query): Query<FieldQuery>,
) -> Response {
    let catalog = state.catalog.read().await;
    let page = match catalog.page(&key) {
        Ok(page) => page,
        Err(e) => return error_response(&e),
    };
    let field = match Field::parse(&field) {
        Ok(field) => field,
        Err(e) => return error_response(&e),
    };

    let request = RequestLocale {
        requested: query.lang,
        path: None,
    };
    let assembler = catalog.assembler();
    match assembler.resolve_field(page, &field, &request) {
        Ok(resolution) => {
            let response = FieldResponse {
                page: page.key().to_string(),
                locales: assembler.locales(&request),
                field: resolution.field,
                trace: query.trace.then_some(resolution.trace),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// COVERAGE HANDLER
// =============================================================================

/// Localization coverage for every page, in one locale or all of them.
pub async fn coverage_handler(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
) -> Response {
    let catalog = state.catalog.read().await;
    let locales = match query.lang.as_deref() {
        Some(raw) => match catalog.locale_resolver().normalize(raw) {
            Some(locale) => vec![locale],
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(format!("Unsupported locale: {}", raw))),
                )
                    .into_response();
            }
        },
        None => catalog.locales(),
    };

    let report = CoverageReport::build(&catalog.assembler(), catalog.pages(), &locales);
    (StatusCode::OK, Json(report)).into_response()
}

// =============================================================================
// CACHE HANDLERS
// =============================================================================

/// Current cache counters.
pub async fn cache_stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.cache.lock().await.stats();
    (StatusCode::OK, Json(stats))
}

/// Drop every cached context.
pub async fn cache_reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut cache = state.cache.lock().await;
    let cleared = cache.len();
    cache.reset();
    tracing::info!(event = "cache_reset", cleared, "Context cache reset");

    (
        StatusCode::OK,
        Json(CacheResetResponse {
            cleared,
            stats: cache.stats(),
        }),
    )
}

// =============================================================================
// RELOAD HANDLER
// =============================================================================

/// Reload bundles and pages from disk, then reset the cache.
///
/// On failure the previous catalog stays in place.
pub async fn reload_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.catalog.read().await.config().clone();

    let loaded = match tokio::task::spawn_blocking(move || Catalog::load(config)).await {
        Ok(result) => result,
        Err(e) => Err(GuideError::IoError(format!("Reload task failed: {}", e))),
    };

    match loaded {
        Ok(catalog) => {
            let response = ReloadResponse::success(
                catalog.page_count(),
                catalog.bundles().len(),
                catalog.issues().len(),
            );
            *state.catalog.write().await = catalog;
            state.cache.lock().await.reset();
            tracing::info!(
                event = "catalog_reload",
                pages = response.pages,
                bundles = response.bundles,
                "Catalog reloaded"
            );
            (StatusCode::OK, Json(response))
        }
        Err(e) => {
            tracing::warn!(event = "catalog_reload_failed", "Reload failed: {}", e);
            (
                error_status(&e),
                Json(ReloadResponse::error(format!("Reload failed: {}", e))),
            )
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
