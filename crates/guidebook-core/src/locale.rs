//! # Locale Resolver
//!
//! Derives the target locale and the fixed reference locale of a request.
//!
//! ## Priority
//!
//! 1. The explicitly requested locale (query parameter, CLI flag)
//! 2. The first segment of the request path (`/it/guides/...`)
//! 3. The reference locale
//!
//! A source whose tag is malformed or unsupported is skipped, never an error.

use crate::primitives::DEFAULT_SUPPORTED_LOCALES;
use crate::types::{GuideError, LocaleTag};
use serde::Serialize;
use std::collections::BTreeSet;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Supported locales and the reference locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    reference: LocaleTag,
    supported: BTreeSet<LocaleTag>,
}

impl LocaleConfig {
    /// Create a configuration. The reference locale is always supported.
    #[must_use]
    pub fn new(reference: LocaleTag, supported: impl IntoIterator<Item = LocaleTag>) -> Self {
        let mut supported: BTreeSet<LocaleTag> = supported.into_iter().collect();
        supported.insert(reference.clone());
        Self {
            reference,
            supported,
        }
    }

    /// Create a configuration from raw strings.
    pub fn from_strs(reference: &str, supported: &[&str]) -> Result<Self, GuideError> {
        let reference = LocaleTag::parse(reference)?;
        let supported = supported
            .iter()
            .map(|s| LocaleTag::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(reference, supported))
    }

    #[must_use]
    pub fn reference(&self) -> &LocaleTag {
        &self.reference
    }

    /// Supported locales in sorted order.
    pub fn supported(&self) -> impl Iterator<Item = &LocaleTag> {
        self.supported.iter()
    }

    #[must_use]
    pub fn is_supported(&self, tag: &LocaleTag) -> bool {
        self.supported.contains(tag)
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        let supported = DEFAULT_SUPPORTED_LOCALES
            .iter()
            .filter_map(|s| LocaleTag::parse(s).ok());
        Self::new(LocaleTag::reference(), supported)
    }
}

// =============================================================================
// REQUEST & RESULT
// =============================================================================

/// Locale hints carried by a render request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLocale {
    /// Explicitly requested locale.
    pub requested: Option<String>,
    /// Request path; its first segment may be a locale.
    pub path: Option<String>,
}

impl RequestLocale {
    /// Request for an explicit locale.
    #[must_use]
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            requested: Some(lang.into()),
            path: None,
        }
    }

    /// Request identified only by its path.
    #[must_use]
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            requested: None,
            path: Some(path.into()),
        }
    }

    fn path_locale(&self) -> Option<&str> {
        self.path
            .as_deref()
            .and_then(|p| p.split('/').find(|segment| !segment.trim().is_empty()))
    }
}

/// Target locale plus the reference locale it falls back to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LocalePair {
    pub target: LocaleTag,
    pub reference: LocaleTag,
}

impl LocalePair {
    #[must_use]
    pub fn new(target: LocaleTag, reference: LocaleTag) -> Self {
        Self { target, reference }
    }

    /// The target is the reference locale itself.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.target == self.reference
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolves request locale hints against a [`LocaleConfig`].
#[derive(Debug, Clone, Default)]
pub struct LocaleResolver {
    config: LocaleConfig,
}

impl LocaleResolver {
    #[must_use]
    pub fn new(config: LocaleConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &LocaleConfig {
        &self.config
    }

    /// Normalize a raw tag, keeping it only if supported.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Option<LocaleTag> {
        LocaleTag::parse(raw)
            .ok()
            .filter(|tag| self.config.is_supported(tag))
    }

    /// Derive the locale pair for a request.
    #[must_use]
    pub fn resolve(&self, request: &RequestLocale) -> LocalePair {
        let target = request
            .requested
            .as_deref()
            .and_then(|raw| self.normalize(raw))
            .or_else(|| request.path_locale().and_then(|raw| self.normalize(raw)))
            .unwrap_or_else(|| self.config.reference.clone());

        LocalePair::new(target, self.config.reference.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> LocaleResolver {
        LocaleResolver::new(LocaleConfig::from_strs("en", &["en", "it", "de"]).expect("config"))
    }

    #[test]
    fn requested_locale_wins_over_path() {
        let request = RequestLocale {
            requested: Some(" IT ".to_string()),
            path: Some("/de/guides/x".to_string()),
        };
        let pair = resolver().resolve(&request);
        assert_eq!(pair.target.as_str(), "it");
        assert_eq!(pair.reference.as_str(), "en");
        assert!(!pair.is_reference());
    }

    #[test]
    fn path_locale_used_when_nothing_requested() {
        let pair = resolver().resolve(&RequestLocale::from_path("/de/guides/positano"));
        assert_eq!(pair.target.as_str(), "de");
    }

    #[test]
    fn unsupported_locale_falls_through() {
        let request = RequestLocale {
            requested: Some("ja".to_string()),
            path: Some("/it/guides".to_string()),
        };
        assert_eq!(resolver().resolve(&request).target.as_str(), "it");

        let pair = resolver().resolve(&RequestLocale::new("xx-YY"));
        assert_eq!(pair.target.as_str(), "en");
        assert!(pair.is_reference());
    }

    #[test]
    fn reference_always_supported() {
        let config = LocaleConfig::from_strs("en", &["it"]).expect("config");
        assert!(config.is_supported(&LocaleTag::reference()));
        assert_eq!(config.supported().count(), 2);
    }

    #[test]
    fn default_config_supports_builtin_locales() {
        let config = LocaleConfig::default();
        assert_eq!(config.reference().as_str(), "en");
        assert!(config.is_supported(&LocaleTag::parse("fr").expect("locale")));
    }
}
