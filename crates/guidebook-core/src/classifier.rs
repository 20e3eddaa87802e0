//! # Placeholder Classifier
//!
//! Decides whether a candidate string is real content or an untranslated
//! echo. Checks run as an ordered pipeline and the first hit wins:
//!
//! 1. `Blank` - empty or whitespace-only (Unicode spaces, NBSP and BOM count)
//! 2. `KeyEcho` - the key itself, its last segment, the key without its
//!    `content.` namespace, or a dotted sub-key of it
//! 3. `Sentinel` - a known "translation pending" phrase, case-insensitive
//!
//! Arrays and structured items are classified element by element by the
//! content probe; this module only ever sees one string at a time.

use crate::primitives::SENTINEL_PHRASES;
use crate::types::{ContentKey, PlaceholderReason};
use std::collections::BTreeSet;

// =============================================================================
// PIPELINE
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Check {
    Blank,
    KeyEcho,
    Sentinel,
}

const PIPELINE: [Check; 3] = [Check::Blank, Check::KeyEcho, Check::Sentinel];

impl Check {
    const fn reason(self) -> PlaceholderReason {
        match self {
            Check::Blank => PlaceholderReason::Blank,
            Check::KeyEcho => PlaceholderReason::KeyEcho,
            Check::Sentinel => PlaceholderReason::Sentinel,
        }
    }

    fn matches(self, normalized: &str, key: &ContentKey, sentinels: &BTreeSet<String>) -> bool {
        match self {
            Check::Blank => normalized.is_empty(),
            Check::KeyEcho => is_key_echo(normalized, key),
            Check::Sentinel => sentinels.contains(&normalized.to_lowercase()),
        }
    }
}

fn is_key_echo(normalized: &str, key: &ContentKey) -> bool {
    let full = key.as_str();
    if full.is_empty() {
        return false;
    }
    if normalized == full || normalized == key.last_segment() {
        return true;
    }
    if is_sub_key(normalized, full) {
        return true;
    }
    key.without_namespace()
        .is_some_and(|bare| normalized == bare || is_sub_key(normalized, bare))
}

fn is_sub_key(candidate: &str, key: &str) -> bool {
    candidate
        .strip_prefix(key)
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Characters treated as whitespace on top of `char::is_whitespace`.
const fn is_invisible(c: char) -> bool {
    matches!(c, '\u{180e}' | '\u{200b}' | '\u{2060}' | '\u{feff}')
}

/// Collapse every run of Unicode whitespace to one ASCII space and trim.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || is_invisible(c))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Ordered placeholder predicates plus a sentinel phrase set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderClassifier {
    sentinels: BTreeSet<String>,
}

impl Default for PlaceholderClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderClassifier {
    /// Classifier with the built-in sentinel phrases.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sentinels: SENTINEL_PHRASES
                .iter()
                .map(|phrase| normalize_whitespace(phrase).to_lowercase())
                .collect(),
        }
    }

    /// Layer extra sentinel phrases on top of the current set.
    #[must_use]
    pub fn with_sentinels<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sentinels.extend(
            phrases
                .into_iter()
                .map(|phrase| normalize_whitespace(phrase.as_ref()).to_lowercase())
                .filter(|phrase| !phrase.is_empty()),
        );
        self
    }

    /// Normalized sentinel phrases, in order.
    pub fn sentinels(&self) -> impl Iterator<Item = &str> {
        self.sentinels.iter().map(String::as_str)
    }

    /// First matching reason, or `None` when the text is meaningful.
    #[must_use]
    pub fn classify(&self, candidate: &str, key: &ContentKey) -> Option<PlaceholderReason> {
        let normalized = normalize_whitespace(candidate);
        PIPELINE
            .iter()
            .find(|check| check.matches(&normalized, key, &self.sentinels))
            .map(|check| check.reason())
    }

    #[must_use]
    pub fn is_placeholder(&self, candidate: &str, key: &ContentKey) -> bool {
        self.classify(candidate, key).is_some()
    }

    /// The trimmed text when meaningful.
    #[must_use]
    pub fn accept(&self, candidate: &str, key: &ContentKey) -> Option<String> {
        if self.is_placeholder(candidate, key) {
            None
        } else {
            Some(candidate.trim().to_string())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ContentKey {
        ContentKey::new("content.guide.intro")
    }

    #[test]
    fn blank_is_placeholder() {
        let classifier = PlaceholderClassifier::new();
        assert_eq!(classifier.classify("", &key()), Some(PlaceholderReason::Blank));
        assert_eq!(classifier.classify("  ", &key()), Some(PlaceholderReason::Blank));
        assert_eq!(
            classifier.classify("\u{00a0}\u{feff}\t", &key()),
            Some(PlaceholderReason::Blank)
        );
    }

    #[test]
    fn key_echoes_are_placeholders() {
        let classifier = PlaceholderClassifier::new();
        for echo in [
            "content.guide.intro",
            " content.guide.intro ",
            "intro",
            "guide.intro",
            "content.guide.intro.0",
        ] {
            assert_eq!(
                classifier.classify(echo, &key()),
                Some(PlaceholderReason::KeyEcho),
                "{echo:?}"
            );
        }
    }

    #[test]
    fn sentinels_are_case_insensitive() {
        let classifier = PlaceholderClassifier::new();
        assert_eq!(
            classifier.classify("Traduzione  in ARRIVO", &key()),
            Some(PlaceholderReason::Sentinel)
        );
        assert!(classifier.is_placeholder("Translation pending", &key()));
    }

    #[test]
    fn real_content_is_meaningful() {
        let classifier = PlaceholderClassifier::new();
        assert!(!classifier.is_placeholder("Welcome to Positano", &key()));
        assert!(!classifier.is_placeholder("Introduction", &key()));
        assert!(!classifier.is_placeholder("Intro", &key()));
        assert_eq!(
            classifier.accept("  Benvenuti  ", &key()),
            Some("Benvenuti".to_string())
        );
    }

    #[test]
    fn extra_sentinels_layer_on_top() {
        let classifier = PlaceholderClassifier::new().with_sentinels(["breadcrumbs.home", " "]);
        let label_key = ContentKey::new("labels.homeBreadcrumb");
        assert!(classifier.is_placeholder("breadcrumbs.home", &label_key));
        assert!(classifier.is_placeholder("homeBreadcrumb", &label_key));
        assert!(classifier.is_placeholder("traduzione in arrivo", &label_key));
        assert!(!classifier.is_placeholder("Home", &label_key));
    }

    #[test]
    fn whitespace_normalization() {
        assert_eq!(normalize_whitespace("  a \u{2009} b\n\nc "), "a b c");
        assert_eq!(normalize_whitespace("\u{200b}"), "");
    }
}
