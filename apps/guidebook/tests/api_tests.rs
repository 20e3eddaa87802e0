//! Integration tests for the Guidebook HTTP API.
//!
//! Uses axum-test against a catalog loaded from a tempfile fixture, without
//! starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use guidebook::api::{
    AppState, ErrorResponse, HealthResponse, PagesResponse, ReloadResponse, create_router,
};
use guidebook::catalog::Catalog;
use guidebook::config::GuidebookConfig;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Mutex to serialize tests since some of them modify env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// FIXTURE
// =============================================================================

fn write(dir: &Path, relative: &str, text: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn write_json(dir: &Path, relative: &str, value: &Value) {
    write(dir, relative, &serde_json::to_string_pretty(value).unwrap());
}

const PAGES_TOML: &str = r#"
[[page]]
key = "positanoBeaches"
legacy_keys = ["positanoBeachesOld"]

[[page]]
key = "amalfiFerries"
"#;

fn english_bundle() -> Value {
    json!({
        "labels": {
            "homeBreadcrumb": "Home",
            "guidesBreadcrumb": "Guides",
            "faqsHeading": "FAQs"
        },
        "meta": {
            "positanoBeaches": {
                "title": "Positano Beaches",
                "description": "Where to swim in Positano"
            }
        },
        "content": {
            "positanoBeaches": {
                "intro": ["Positano has two main beaches."],
                "sections": [
                    { "id": "spiaggia-grande", "title": "Spiaggia Grande", "body": ["The main beach."] },
                    { "id": "fornillo", "title": "Fornillo", "body": ["Quieter and greener."] }
                ],
                "faqs": [{ "q": "Is it sandy?", "a": "Mostly pebbles." }]
            },
            "amalfiFerries": {
                "intro": ["Take the early ferry."]
            }
        }
    })
}

fn italian_bundle(ferries_intro: &str) -> Value {
    json!({
        "labels": {
            "homeBreadcrumb": "Home",
            "guidesBreadcrumb": "Guide"
        },
        "content": {
            "positanoBeaches": {
                "intro": ["Positano ha due spiagge principali."],
                "sections": [
                    { "id": "spiaggia-grande", "title": "Spiaggia Grande", "body": ["La spiaggia principale."] }
                ],
                "faqs": [{ "q": "Is it sandy?", "a": "Mostly pebbles." }]
            },
            "amalfiFerries": {
                "intro": [ferries_intro]
            }
        }
    })
}

/// Guard wrapper that holds the mutex, keeps the fixture alive and clears
/// env vars on drop.
struct TestGuard {
    dir: TempDir,
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl TestGuard {
    fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
        unsafe {
            std::env::remove_var("GUIDEBOOK_API_KEY");
            std::env::remove_var("GUIDEBOOK_RATE_LIMIT");
        }
    }
}

fn fixture_config(dir: &Path) -> GuidebookConfig {
    GuidebookConfig {
        supported_locales: vec!["en".to_string(), "it".to_string(), "de".to_string()],
        content_dir: dir.join("locales"),
        pages_file: dir.join("pages.toml"),
        ..GuidebookConfig::default()
    }
}

/// Create a test server over a fresh fixture, optionally with an API key.
fn create_server_with(api_key: Option<&str>) -> (TestServer, TestGuard) {
    let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::remove_var("GUIDEBOOK_RATE_LIMIT");
        match api_key {
            Some(key) => std::env::set_var("GUIDEBOOK_API_KEY", key),
            None => std::env::remove_var("GUIDEBOOK_API_KEY"),
        }
    }

    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "locales/en/guides.json", &english_bundle());
    write_json(
        dir.path(),
        "locales/it/guides.json",
        &italian_bundle("Traduzione in arrivo"),
    );
    write(dir.path(), "pages.toml", PAGES_TOML);

    let catalog = Catalog::load(fixture_config(dir.path())).unwrap();
    let router = create_router(AppState::new(catalog));
    (
        TestServer::new(router).unwrap(),
        TestGuard { dir, _guard: guard },
    )
}

fn create_test_server() -> (TestServer, TestGuard) {
    create_server_with(None)
}

fn labels(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// PAGES ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_pages_listing() {
    let (server, _guard) = create_test_server();

    let response = server.get("/pages").await;

    response.assert_status_ok();
    let pages: PagesResponse = response.json();
    assert_eq!(pages.reference_locale, "en");
    assert_eq!(pages.locales, vec!["de", "en", "it"]);
    let keys: Vec<&str> = pages.pages.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["amalfiFerries", "positanoBeaches"]);
    assert_eq!(pages.pages[1].slug, "positano-beaches");
    assert!(pages.pages[1].fields.contains(&"intro".to_string()));
}

#[tokio::test]
async fn test_render_italian_page() {
    let (server, _guard) = create_test_server();

    let response = server.get("/pages/positanoBeaches?lang=it").await;

    response.assert_status_ok();
    let body: Value = response.json();
    let context = &body["context"];
    assert_eq!(context["locales"]["target"], "it");
    assert_eq!(context["localized"], true);
    assert_eq!(body["tiers"]["intro"], "active_locale_structured");
    assert_eq!(
        context["intro"]["value"][0],
        "Positano ha due spiagge principali."
    );
    assert_eq!(context["intro"]["is_fallback"], false);

    // Identical to English: not reported as Italian content.
    assert_eq!(context["faqs"]["tier"], "fallback_locale_structured");
    assert_eq!(context["faqs"]["is_fallback"], true);

    // One localized section plus the FAQ entry.
    let toc = context["toc"]["value"].as_array().unwrap();
    assert_eq!(toc.len(), 2);
    assert_eq!(toc[1]["href"], "#faqs");

    assert_eq!(context["title"]["value"], "Positano Beaches");
    assert_eq!(
        labels(&context["breadcrumb"]["value"]),
        vec!["Home", "Guide", "Positano Beaches"]
    );
    assert_eq!(
        context["breadcrumb"]["value"][2]["href"],
        "/it/guides/positano-beaches"
    );
}

#[tokio::test]
async fn test_render_reference_locale() {
    let (server, _guard) = create_test_server();

    let response = server.get("/pages/positano-beaches?lang=en").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["context"]["page"], "positanoBeaches");
    assert_eq!(body["tiers"]["faqs"], "active_locale_structured");
    assert_eq!(body["tiers"]["sections"], "active_locale_structured");
    assert_eq!(
        labels(&body["context"]["toc"]["value"]),
        vec!["Spiaggia Grande", "Fornillo", "FAQs"]
    );
}

#[tokio::test]
async fn test_unsupported_lang_falls_back_to_reference() {
    let (server, _guard) = create_test_server();

    let response = server.get("/pages/positanoBeaches?lang=zz").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["context"]["locales"]["target"], "en");
}

#[tokio::test]
async fn test_locale_without_bundles_is_all_fallback() {
    let (server, _guard) = create_test_server();

    let response = server.get("/pages/positanoBeaches?lang=de").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["context"]["locales"]["target"], "de");
    assert_eq!(body["context"]["localized"], false);
    assert_eq!(body["tiers"]["intro"], "fallback_locale_structured");
}

#[tokio::test]
async fn test_unknown_page_is_404() {
    let (server, _guard) = create_test_server();

    let response = server.get("/pages/capriDayTrip").await;

    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("capriDayTrip"));
}

#[tokio::test]
async fn test_render_by_path() {
    let (server, _guard) = create_test_server();

    let response = server.get("/render/it/guides/positano-beaches").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["context"]["locales"]["target"], "it");

    let response = server.get("/render/xx/guides/positano-beaches").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["context"]["locales"]["target"], "en");
}

// =============================================================================
// FIELD ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_field_with_trace() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/pages/amalfiFerries/fields/intro")
        .add_query_param("lang", "it")
        .add_query_param("trace", "true")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["field"]["tier"], "fallback_locale_structured");
    assert_eq!(body["field"]["value"][0], "Take the early ferry.");

    let probes = body["trace"]["probes"].as_array().unwrap();
    assert_eq!(probes[0]["tier"], "active_locale_structured");
    assert_eq!(probes[0]["outcome"]["kind"], "placeholder");
    assert_eq!(probes[0]["outcome"]["reason"], "sentinel");
    assert_eq!(probes.last().unwrap()["outcome"]["kind"], "meaningful");
}

#[tokio::test]
async fn test_field_without_trace() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/pages/positanoBeaches/fields/title")
        .add_query_param("lang", "it")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["locales"]["target"], "it");
    assert_eq!(body["field"]["value"], "Positano Beaches");
    assert!(body.get("trace").is_none());
}

#[tokio::test]
async fn test_field_errors() {
    let (server, _guard) = create_test_server();

    let response = server.get("/pages/positanoBeaches/fields/bad%20name").await;
    response.assert_status_bad_request();

    let response = server.get("/pages/positanoBeaches/fields/undeclared").await;
    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("undeclared"));

    let response = server.get("/pages/nope/fields/intro").await;
    response.assert_status_not_found();
}

// =============================================================================
// COVERAGE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_coverage_all_locales() {
    let (server, _guard) = create_test_server();

    let response = server.get("/coverage").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["locales"]["en"]["pages"], 2);
    assert_eq!(body["locales"]["en"]["localized_pages"], 2);
    assert_eq!(body["locales"]["it"]["localized_pages"], 1);
    assert_eq!(body["locales"]["de"]["localized_pages"], 0);
    assert_eq!(body["pages"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_coverage_single_locale() {
    let (server, _guard) = create_test_server();

    let response = server.get("/coverage?lang=it").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let locales = body["locales"].as_object().unwrap();
    assert_eq!(locales.len(), 1);
    assert!(locales.contains_key("it"));

    let response = server.get("/coverage?lang=zz").await;
    response.assert_status_bad_request();
}

// =============================================================================
// CACHE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_hits_and_reset() {
    let (server, _guard) = create_test_server();

    server.get("/pages/positanoBeaches?lang=it").await.assert_status_ok();
    server.get("/pages/positanoBeaches?lang=it").await.assert_status_ok();
    server.get("/pages/positanoBeaches?lang=en").await.assert_status_ok();

    let stats: Value = server.get("/cache").await.json();
    assert_eq!(stats["entries"], 2);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 2);

    let response = server.post("/cache/reset").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["cleared"], 2);
    assert_eq!(body["stats"]["entries"], 0);
    assert_eq!(body["stats"]["hits"], 0);
}

#[tokio::test]
async fn test_cached_and_fresh_contexts_agree() {
    let (server, _guard) = create_test_server();

    let first: Value = server.get("/pages/positanoBeaches?lang=it").await.json();
    let second: Value = server.get("/pages/positanoBeaches?lang=it").await.json();
    server.post("/cache/reset").await.assert_status_ok();
    let third: Value = server.get("/pages/positanoBeaches?lang=it").await.json();

    assert_eq!(first, second);
    assert_eq!(first, third);
}

// =============================================================================
// RELOAD ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_reload_picks_up_new_content() {
    let (server, guard) = create_test_server();

    let before: Value = server
        .get("/pages/amalfiFerries/fields/intro?lang=it")
        .await
        .json();
    assert_eq!(before["field"]["tier"], "fallback_locale_structured");

    write_json(
        guard.path(),
        "locales/it/guides.json",
        &italian_bundle("Prendete il primo traghetto."),
    );
    let response = server.post("/reload").await;
    response.assert_status_ok();
    let reload: ReloadResponse = response.json();
    assert!(reload.success);
    assert_eq!(reload.pages, 2);
    assert_eq!(reload.bundles, 2);

    let after: Value = server
        .get("/pages/amalfiFerries/fields/intro?lang=it")
        .await
        .json();
    assert_eq!(after["field"]["tier"], "active_locale_structured");
    assert_eq!(after["field"]["value"][0], "Prendete il primo traghetto.");
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_catalog() {
    let (server, guard) = create_test_server();

    write(guard.path(), "pages.toml", "[[page]]\nkey = ");
    let response = server.post("/reload").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let reload: ReloadResponse = response.json();
    assert!(!reload.success);
    assert!(reload.error.is_some());

    server.get("/pages/positanoBeaches").await.assert_status_ok();
}

// =============================================================================
// AUTHENTICATION TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_health_always_allowed() {
    let (server, _guard) = create_server_with(Some("s3cret"));

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let (server, _guard) = create_server_with(Some("s3cret"));

    server.get("/pages").await.assert_status(StatusCode::UNAUTHORIZED);
    server.post("/cache/reset").await.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_wrong_key_rejected() {
    let (server, _guard) = create_server_with(Some("s3cret"));

    let response = server
        .get("/pages")
        .add_header(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer wrong"),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_valid_key_accepted() {
    let (server, _guard) = create_server_with(Some("s3cret"));

    let response = server
        .get("/pages")
        .add_header(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer s3cret"),
        )
        .await;
    response.assert_status_ok();
}
