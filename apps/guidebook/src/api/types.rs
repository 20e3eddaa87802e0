//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use guidebook_core::{
    CacheStats, FieldValue, LocalePair, PageContext, PageDeclaration, RequestLocale,
    ResolutionTrace, ResolvedField, Tier,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `?lang=` on page and coverage endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

impl LangQuery {
    #[must_use]
    pub fn request_locale(&self) -> RequestLocale {
        RequestLocale {
            requested: self.lang.clone(),
            path: None,
        }
    }
}

/// `?lang=&trace=` on the field endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldQuery {
    pub lang: Option<String>,
    #[serde(default)]
    pub trace: bool,
}

// =============================================================================
// PAGES
// =============================================================================

/// One declared page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub key: String,
    pub slug: String,
    pub meta_key: String,
    pub guides_slug: String,
    pub policies: Vec<String>,
    pub fields: Vec<String>,
}

impl PageSummary {
    #[must_use]
    pub fn from_declaration(page: &PageDeclaration) -> Self {
        Self {
            key: page.key().to_string(),
            slug: page.slug().to_string(),
            meta_key: page.meta_key().to_string(),
            guides_slug: page.guides_slug().to_string(),
            policies: page.policy_names().to_vec(),
            fields: page.fields().iter().map(|f| f.name()).collect(),
        }
    }
}

/// Page listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesResponse {
    pub reference_locale: String,
    pub locales: Vec<String>,
    pub pages: Vec<PageSummary>,
}

/// Rendered page context with a per-field tier summary.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse<'a> {
    pub tiers: BTreeMap<String, Tier>,
    pub context: &'a PageContext,
}

/// One field resolved through the cascade.
#[derive(Debug, Clone, Serialize)]
pub struct FieldResponse {
    pub page: String,
    pub locales: LocalePair,
    pub field: ResolvedField<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ResolutionTrace>,
}

// =============================================================================
// CACHE / RELOAD
// =============================================================================

/// Cache reset response.
#[derive(Debug, Clone, Serialize)]
pub struct CacheResetResponse {
    pub cleared: usize,
    pub stats: CacheStats,
}

/// Catalog reload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub pages: usize,
    pub bundles: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

impl ReloadResponse {
    #[must_use]
    pub fn success(pages: usize, bundles: usize, skipped: usize) -> Self {
        Self {
            success: true,
            pages,
            bundles,
            skipped,
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            pages: 0,
            bundles: 0,
            skipped: 0,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Error body for any failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
