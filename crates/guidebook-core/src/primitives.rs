//! # Primitives
//!
//! Fixed constants of the resolution engine: locales, namespaces, well-known
//! keys, sentinel phrases and construction limits.

// =============================================================================
// LOCALES
// =============================================================================

/// Reference locale every other locale falls back to.
pub const REFERENCE_LOCALE: &str = "en";

/// Locales served when no configuration says otherwise.
pub const DEFAULT_SUPPORTED_LOCALES: &[&str] = &["en", "it", "de", "fr", "es"];

// =============================================================================
// NAMESPACES & KEYS
// =============================================================================

/// Leading segment of every page content key.
pub const CONTENT_NAMESPACE: &str = "content";

/// Bundle namespace holding structured guide content.
pub const GUIDES_NAMESPACE: &str = "guides";

/// Bundle namespace holding hand-written fallback copy.
pub const MANUAL_FALLBACK_NAMESPACE: &str = "guidesFallback";

/// Keys tried for the breadcrumb home label.
pub const HOME_LABEL_KEYS: [&str; 2] = ["labels.homeBreadcrumb", "breadcrumbs.home"];

/// Keys tried for the breadcrumb guides-index label.
pub const GUIDES_LABEL_KEYS: [&str; 2] = ["labels.guidesBreadcrumb", "breadcrumbs.guides"];

/// Site-wide FAQ heading key, tried after the page's own `faqsTitle`.
pub const FAQS_HEADING_KEY: &str = "labels.faqsHeading";

/// Page-level FAQ heading suffix (`content.{page}.faqsTitle`).
pub const FAQS_TITLE_SUFFIX: &str = "faqsTitle";

/// Legacy singular FAQ suffix (`content.{page}.faq`).
pub const LEGACY_FAQ_SUFFIX: &str = "faq";

// =============================================================================
// DEFAULTS
// =============================================================================

pub const DEFAULT_HOME_LABEL: &str = "Home";
pub const DEFAULT_GUIDES_LABEL: &str = "Guides";
pub const DEFAULT_FAQS_LABEL: &str = "FAQs";

/// URL segment of the guides index.
pub const DEFAULT_GUIDES_SLUG: &str = "guides";

/// Anchor of the FAQ block.
pub const FAQS_ANCHOR: &str = "#faqs";

/// Prefix of positional section ids (`section-0`, `section-1`, ...).
pub const SECTION_ID_PREFIX: &str = "section-";

// =============================================================================
// SENTINELS
// =============================================================================

/// Phrases that mean "not translated yet". Compared case-insensitively after
/// whitespace normalization.
pub const SENTINEL_PHRASES: &[&str] = &[
    "traduzione in arrivo",
    "translation pending",
    "translation coming soon",
    "missing translation",
];

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum length of a content key.
pub const MAX_KEY_LENGTH: usize = 512;

/// Maximum legacy keys per page.
pub const MAX_LEGACY_KEYS: usize = 8;

/// Maximum custom field builders per page.
pub const MAX_FIELD_BUILDERS: usize = 16;

/// Maximum extra text fields per page.
pub const MAX_EXTRA_FIELDS: usize = 32;

/// Maximum contexts held by the cache before it starts over.
pub const MAX_CACHE_ENTRIES: usize = 4096;
