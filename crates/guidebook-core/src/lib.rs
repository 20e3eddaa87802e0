//! # guidebook-core
//!
//! The deterministic content resolution engine for Guidebook - THE ENGINE.
//!
//! Given a guide page, a requested locale and the loaded translation bundles,
//! this crate decides for every content field which source actually holds
//! usable text, tags the value with the tier it came from, and derives the
//! page's table of contents, breadcrumb, FAQ list and SEO title from those
//! decisions.
//!
//! ## Cascade
//!
//! ```text
//! ActiveLocaleStructured → ActiveLocaleManualFallback
//!   → FallbackLocaleStructured → LegacyKeyVariant → GenericDefault
//! ```
//!
//! Placeholders (blank text, echoed keys, "translation pending" phrases) are
//! never accepted as content, and an active-locale value identical to the
//! reference locale's is never reported as localized.
//!
//! ## Architectural Constraints
//!
//! - Pure: no async, no network, no file I/O; bundles arrive already loaded
//! - Deterministic: `BTreeMap`/`BTreeSet` only, no floats, no randomness
//! - Total: resolution always yields a value; only page construction errors
//! - Quiet: no logging; every resolution carries a `ResolutionTrace`

// =============================================================================
// MODULES
// =============================================================================

pub mod artifacts;
pub mod bundle;
pub mod cache;
pub mod classifier;
pub mod context;
pub mod coverage;
pub mod locale;
pub mod page;
pub mod policy;
pub mod primitives;
pub mod probe;
pub mod resolver;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BreadcrumbItem, CandidateValue, ContentKey, FaqEntry, Field, FieldOrigin, FieldShape,
    FieldValue, GuideError, LocaleTag, PlaceholderReason, ResolvedField, Section, Tier, TocEntry,
    TocItem,
};

// =============================================================================
// RE-EXPORTS: Resolution Engine
// =============================================================================

pub use bundle::{Bundle, BundleSet, ContentHash, LocaleBundleProvider};
pub use classifier::PlaceholderClassifier;
pub use locale::{LocaleConfig, LocalePair, LocaleResolver, RequestLocale};
pub use policy::{
    CascadePlan, EchoHandling, FieldOverride, LocalizationView, Policy, PolicyConflict,
    PolicyRegistry,
};
pub use probe::ContentProbe;
pub use resolver::{
    CascadingResolver, FieldRequest, ProbeOutcome, Resolution, ResolutionTrace, TierProbe,
};

// =============================================================================
// RE-EXPORTS: Pages and Artifacts
// =============================================================================

pub use artifacts::{BreadcrumbBuilder, FaqBuilder, SeoResolver, TocBuilder, TocInputs};
pub use cache::{CacheKey, CacheStats, ContextCache};
pub use context::{ContextAssembler, PageContext, TracedContext};
pub use coverage::{CoverageReport, CoverageStatus, FieldCoverage, LocaleSummary, PageCoverage};
pub use page::{BuilderInputs, FieldBuilder, PageDeclaration, PageDeclarationBuilder, PageSpec};
