//! # Guidebook Core Types
//!
//! Shared type definitions for the resolution engine.
//!
//! This module contains:
//! - Identifiers (`ContentKey`, `LocaleTag`, `Field`)
//! - The cascade vocabulary (`Tier`, `CandidateValue`, `ResolvedField`)
//! - Normalized content shapes (`Section`, `FaqEntry`, `TocEntry`, `TocItem`)
//! - Error types (`GuideError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` where they are used as `BTreeMap`/`BTreeSet` keys
//! - Carry no floating-point data
//! - Compare structurally, so identical inputs produce identical values

use crate::primitives::{CONTENT_NAMESPACE, MAX_KEY_LENGTH, REFERENCE_LOCALE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// CONTENT KEYS
// =============================================================================

/// Logical dotted path into a locale bundle, e.g. `content.positanoBeaches.intro`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    /// Create a key from a dotted path. Surrounding whitespace is dropped.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim();
        if trimmed.len() == path.len() {
            Self(path)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Key of a page content field: `content.{page}.{field}`.
    #[must_use]
    pub fn content(page: &str, field: &str) -> Self {
        Self(format!("{CONTENT_NAMESPACE}.{page}.{field}"))
    }

    /// Get the dotted path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    /// Last dotted segment (`intro` for `content.guide.intro`).
    #[must_use]
    pub fn last_segment(&self) -> &str {
        self.segments().last().unwrap_or("")
    }

    /// Append a segment.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{}", self.0, segment))
        }
    }

    /// The key with its leading `content.` namespace removed, if present.
    #[must_use]
    pub fn without_namespace(&self) -> Option<&str> {
        self.0
            .strip_prefix(CONTENT_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|rest| !rest.is_empty())
    }

    /// Check the key is usable as a lookup path.
    pub fn validate(&self) -> Result<(), GuideError> {
        if self.0.is_empty() || self.0.len() > MAX_KEY_LENGTH {
            return Err(GuideError::InvalidKey(self.0.clone()));
        }
        if self.0.split('.').any(str::is_empty) {
            return Err(GuideError::InvalidKey(self.0.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentKey {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

// =============================================================================
// LOCALE TAGS
// =============================================================================

/// Normalized primary language subtag (`it`, `en`, `de`).
///
/// Parsing trims, lowercases, accepts `_` as a separator and drops any region
/// or script subtags, so `" IT_it "` and `"it-IT"` both become `it`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleTag(String);

impl LocaleTag {
    /// Parse and normalize a raw locale string.
    pub fn parse(raw: &str) -> Result<Self, GuideError> {
        let lowered = raw.trim().to_ascii_lowercase().replace('_', "-");
        let primary = lowered.split('-').next().unwrap_or("");

        let valid = (2..=3).contains(&primary.len())
            && primary.bytes().all(|b| b.is_ascii_lowercase());
        if !valid {
            return Err(GuideError::InvalidLocale(raw.to_string()));
        }

        Ok(Self(primary.to_string()))
    }

    /// The reference locale tag.
    #[must_use]
    pub fn reference() -> Self {
        Self(REFERENCE_LOCALE.to_string())
    }

    /// Get the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocaleTag {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LocaleTag {
    type Error = GuideError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LocaleTag> for String {
    fn from(tag: LocaleTag) -> Self {
        tag.0
    }
}

// =============================================================================
// TIERS
// =============================================================================

/// One step of the fallback cascade.
///
/// Declaration order is cascade order; `Ord` follows it, so a lower tier is
/// always a better (more localized) source than a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Structured content in the target locale.
    ActiveLocaleStructured,
    /// Hand-written fallback copy in the target locale.
    ActiveLocaleManualFallback,
    /// Structured content in the reference locale.
    FallbackLocaleStructured,
    /// Content stored under a retired key.
    LegacyKeyVariant,
    /// Built-in default or nothing at all.
    GenericDefault,
}

impl Tier {
    /// All tiers in cascade order.
    pub const ALL: [Tier; 5] = [
        Tier::ActiveLocaleStructured,
        Tier::ActiveLocaleManualFallback,
        Tier::FallbackLocaleStructured,
        Tier::LegacyKeyVariant,
        Tier::GenericDefault,
    ];

    /// `false` only for `ActiveLocaleStructured`.
    #[must_use]
    pub const fn is_fallback(self) -> bool {
        !matches!(self, Tier::ActiveLocaleStructured)
    }

    /// Whether the tier reads the target locale's bundles.
    #[must_use]
    pub const fn is_active_locale(self) -> bool {
        matches!(
            self,
            Tier::ActiveLocaleStructured | Tier::ActiveLocaleManualFallback
        )
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Tier::ActiveLocaleStructured => "active_locale_structured",
            Tier::ActiveLocaleManualFallback => "active_locale_manual_fallback",
            Tier::FallbackLocaleStructured => "fallback_locale_structured",
            Tier::LegacyKeyVariant => "legacy_key_variant",
            Tier::GenericDefault => "generic_default",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// =============================================================================
// CANDIDATE VALUES
// =============================================================================

/// Why a value was classified as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderReason {
    /// Empty or whitespace-only.
    Blank,
    /// The value repeats its own key (or part of it).
    KeyEcho,
    /// A known "not translated yet" phrase.
    Sentinel,
}

/// Outcome of probing one key in one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateValue<T> {
    /// Nothing at that path, no bundle, or an unusable shape.
    Absent,
    /// Something is there but it is not real content.
    Placeholder(PlaceholderReason),
    /// Usable, normalized content.
    Meaningful(T),
}

impl<T> CandidateValue<T> {
    /// Check whether the candidate carries content.
    #[must_use]
    pub const fn is_meaningful(&self) -> bool {
        matches!(self, CandidateValue::Meaningful(_))
    }

    /// Borrow the content, if any.
    #[must_use]
    pub const fn meaningful(&self) -> Option<&T> {
        match self {
            CandidateValue::Meaningful(value) => Some(value),
            _ => None,
        }
    }

    /// Take the content, if any.
    pub fn into_meaningful(self) -> Option<T> {
        match self {
            CandidateValue::Meaningful(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the content while keeping absent/placeholder tags.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CandidateValue<U> {
        match self {
            CandidateValue::Absent => CandidateValue::Absent,
            CandidateValue::Placeholder(reason) => CandidateValue::Placeholder(reason),
            CandidateValue::Meaningful(value) => CandidateValue::Meaningful(f(value)),
        }
    }
}

// =============================================================================
// CONTENT SHAPES
// =============================================================================

/// One body section of a guide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Section {
    /// Stable anchor id (no leading `#`).
    pub id: String,
    /// Heading; empty when the source had none.
    pub title: String,
    /// Paragraphs.
    pub body: Vec<String>,
}

impl Section {
    /// A section qualifies for a derived ToC entry only with both a title and a body.
    #[must_use]
    pub fn is_navigable(&self) -> bool {
        !self.title.is_empty() && !self.body.is_empty()
    }
}

/// One question with its answer paragraphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answers: Vec<String>,
}

/// Row of an author-supplied table of contents, before href synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TocEntry {
    /// Normalized anchor (`#id`), or `None` when the author left it blank.
    pub href: Option<String>,
    pub label: String,
}

/// Final table-of-contents link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TocItem {
    pub href: String,
    pub label: String,
}

impl TocItem {
    #[must_use]
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
        }
    }
}

/// One level of the Home > Guides > Page trail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreadcrumbItem {
    /// 1-based position.
    pub position: u8,
    pub label: String,
    pub href: String,
    /// Tier the label came from.
    pub tier: Tier,
}

/// Expected shape of a field's bundle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Text,
    Paragraphs,
    Sections,
    Faqs,
    Toc,
}

/// Normalized value of any field shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Paragraphs(Vec<String>),
    Sections(Vec<Section>),
    Faqs(Vec<FaqEntry>),
    Toc(Vec<TocEntry>),
}

impl FieldValue {
    /// The empty value of a shape.
    #[must_use]
    pub fn empty(shape: FieldShape) -> Self {
        match shape {
            FieldShape::Text => FieldValue::Text(String::new()),
            FieldShape::Paragraphs => FieldValue::Paragraphs(Vec::new()),
            FieldShape::Sections => FieldValue::Sections(Vec::new()),
            FieldShape::Faqs => FieldValue::Faqs(Vec::new()),
            FieldShape::Toc => FieldValue::Toc(Vec::new()),
        }
    }

    #[must_use]
    pub const fn shape(&self) -> FieldShape {
        match self {
            FieldValue::Text(_) => FieldShape::Text,
            FieldValue::Paragraphs(_) => FieldShape::Paragraphs,
            FieldValue::Sections(_) => FieldShape::Sections,
            FieldValue::Faqs(_) => FieldShape::Faqs,
            FieldValue::Toc(_) => FieldShape::Toc,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Paragraphs(items) => items.is_empty(),
            FieldValue::Sections(items) => items.is_empty(),
            FieldValue::Faqs(items) => items.is_empty(),
            FieldValue::Toc(items) => items.is_empty(),
        }
    }

    /// Text content; an empty string for any other shape.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Paragraphs(items) => items.into_iter().next().unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Paragraph content; a single text becomes one paragraph.
    #[must_use]
    pub fn into_paragraphs(self) -> Vec<String> {
        match self {
            FieldValue::Paragraphs(items) => items,
            FieldValue::Text(text) if !text.is_empty() => vec![text],
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn into_sections(self) -> Vec<Section> {
        match self {
            FieldValue::Sections(items) => items,
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn into_faqs(self) -> Vec<FaqEntry> {
        match self {
            FieldValue::Faqs(items) => items,
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn into_toc(self) -> Vec<TocEntry> {
        match self {
            FieldValue::Toc(items) => items,
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// FIELDS
// =============================================================================

/// A resolvable field of a guide page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Field {
    Intro,
    Sections,
    Faqs,
    Toc,
    Title,
    Description,
    /// Heading used for the FAQ block and its ToC entry.
    FaqsHeading,
    /// Breadcrumb label of the home level.
    HomeLabel,
    /// Breadcrumb label of the guides index level.
    GuidesLabel,
    /// A page-declared text field at `content.{page}.{name}`.
    Extra(String),
}

impl Field {
    /// Built-in fields in assembly order.
    pub const BUILTIN: [Field; 9] = [
        Field::Intro,
        Field::Sections,
        Field::Faqs,
        Field::Toc,
        Field::Title,
        Field::Description,
        Field::FaqsHeading,
        Field::HomeLabel,
        Field::GuidesLabel,
    ];

    /// Parse a field name. Unknown names become `Extra`.
    pub fn parse(raw: &str) -> Result<Self, GuideError> {
        let name = raw.trim();
        let field = match name {
            "intro" => Field::Intro,
            "sections" => Field::Sections,
            "faqs" => Field::Faqs,
            "toc" => Field::Toc,
            "title" => Field::Title,
            "description" => Field::Description,
            "faqs_heading" => Field::FaqsHeading,
            "home_label" => Field::HomeLabel,
            "guides_label" => Field::GuidesLabel,
            other => {
                let extra = other.strip_prefix("extra.").unwrap_or(other);
                let valid = !extra.is_empty()
                    && extra
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
                if !valid {
                    return Err(GuideError::InvalidField(raw.to_string()));
                }
                Field::Extra(extra.to_string())
            }
        };
        Ok(field)
    }

    /// Stable field name, the inverse of [`Field::parse`].
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Field::Intro => "intro".to_string(),
            Field::Sections => "sections".to_string(),
            Field::Faqs => "faqs".to_string(),
            Field::Toc => "toc".to_string(),
            Field::Title => "title".to_string(),
            Field::Description => "description".to_string(),
            Field::FaqsHeading => "faqs_heading".to_string(),
            Field::HomeLabel => "home_label".to_string(),
            Field::GuidesLabel => "guides_label".to_string(),
            Field::Extra(name) => format!("extra.{name}"),
        }
    }

    /// Shape the field's bundle value is normalized to.
    #[must_use]
    pub const fn shape(&self) -> FieldShape {
        match self {
            Field::Intro => FieldShape::Paragraphs,
            Field::Sections => FieldShape::Sections,
            Field::Faqs => FieldShape::Faqs,
            Field::Toc => FieldShape::Toc,
            Field::Title
            | Field::Description
            | Field::FaqsHeading
            | Field::HomeLabel
            | Field::GuidesLabel
            | Field::Extra(_) => FieldShape::Text,
        }
    }

    /// Page content as opposed to site chrome (breadcrumb and heading labels).
    #[must_use]
    pub const fn is_page_content(&self) -> bool {
        !matches!(
            self,
            Field::FaqsHeading | Field::HomeLabel | Field::GuidesLabel
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl TryFrom<String> for Field {
    type Error = GuideError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        field.name()
    }
}

// =============================================================================
// RESOLVED FIELDS
// =============================================================================

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Found by the cascading resolver.
    Cascade,
    /// Supplied verbatim by the page's policy.
    Override,
    /// Computed by a page-supplied field builder.
    Builder,
}

/// A value tagged with the tier that produced it.
///
/// Fields are private so that `is_fallback` can never disagree with `tier`:
/// it is `false` exactly when `tier == ActiveLocaleStructured`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedField<T> {
    value: T,
    tier: Tier,
    is_fallback: bool,
    origin: FieldOrigin,
}

impl<T> ResolvedField<T> {
    /// Tag a cascade result.
    #[must_use]
    pub fn new(value: T, tier: Tier) -> Self {
        Self {
            value,
            tier,
            is_fallback: tier.is_fallback(),
            origin: FieldOrigin::Cascade,
        }
    }

    /// Replace the origin tag.
    #[must_use]
    pub fn with_origin(mut self, origin: FieldOrigin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    #[must_use]
    pub const fn origin(&self) -> FieldOrigin {
        self.origin
    }

    /// Transform the value, keeping tier and origin.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolvedField<U> {
        ResolvedField {
            value: f(self.value),
            tier: self.tier,
            is_fallback: self.is_fallback,
            origin: self.origin,
        }
    }
}

impl<T: Default> ResolvedField<T> {
    /// Terminal result of an exhausted cascade.
    #[must_use]
    pub fn exhausted() -> Self {
        Self::new(T::default(), Tier::GenericDefault)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Guidebook system.
///
/// - Resolution never returns these; every lookup yields a `ResolvedField`
/// - Page declarations and catalogs fail at construction time
/// - The ENGINE should never panic; all errors must be recoverable
#[derive(Debug, Error)]
pub enum GuideError {
    /// A locale has no resource set for a namespace.
    #[error("Missing bundle: {namespace} for locale {locale}")]
    MissingBundle { locale: String, namespace: String },

    /// A bundle value has an unexpected shape.
    #[error("Malformed entry at {key}: {reason}")]
    MalformedEntry { key: String, reason: String },

    /// A page refers to a field it does not declare.
    #[error("Page {page} references undefined field: {field}")]
    UndefinedField { page: String, field: String },

    /// A page asks for a policy the registry does not know.
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    /// A page declaration breaks its construction contract.
    #[error("Invalid page {page}: {reason}")]
    InvalidPage { page: String, reason: String },

    /// The locale string is not a language tag.
    #[error("Invalid locale: {0:?}")]
    InvalidLocale(String),

    /// The content key is empty, too long, or has empty segments.
    #[error("Invalid content key: {0:?}")]
    InvalidKey(String),

    /// The field name is not recognized.
    #[error("Invalid field name: {0:?}")]
    InvalidField(String),

    /// A page key was not found in the catalog.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// I/O error (file operations).
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================
