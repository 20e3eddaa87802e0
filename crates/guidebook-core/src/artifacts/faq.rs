//! # FAQ Fallback Builder
//!
//! Resolves `content.{page}.faqs`, with the legacy singular `faq` key probed
//! at the same tier before the cascade moves on. Incomplete entries are
//! dropped by the probe; this module collapses duplicates and applies the
//! page's FAQ suppression flag.

use crate::classifier::normalize_whitespace;
use crate::page::PageDeclaration;
use crate::policy::{LocalizationView, Policy};
use crate::primitives::{
    DEFAULT_FAQS_LABEL, FAQS_HEADING_KEY, FAQS_TITLE_SUFFIX, LEGACY_FAQ_SUFFIX,
};
use crate::resolver::FieldRequest;
use crate::types::{ContentKey, FaqEntry, Field, FieldValue, ResolvedField};
use std::collections::BTreeSet;

/// Builds the FAQ list and its heading request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaqBuilder;

impl FaqBuilder {
    /// Current key, then the legacy singular alias, at every tier.
    #[must_use]
    pub fn request(page: &PageDeclaration) -> FieldRequest {
        let legacy = page.legacy_keys().iter().flat_map(|legacy| {
            [
                ContentKey::content(legacy, "faqs"),
                ContentKey::content(legacy, LEGACY_FAQ_SUFFIX),
            ]
        });
        FieldRequest::new(Field::Faqs, page.content_key("faqs"))
            .with_alternate(page.content_key(LEGACY_FAQ_SUFFIX))
            .with_legacy(legacy)
    }

    /// Page `faqsTitle`, then the site-wide heading, then "FAQs".
    #[must_use]
    pub fn heading_request(page: &PageDeclaration) -> FieldRequest {
        FieldRequest::new(Field::FaqsHeading, page.content_key(FAQS_TITLE_SUFFIX))
            .with_alternate(ContentKey::new(FAQS_HEADING_KEY))
            .with_default(FieldValue::Text(DEFAULT_FAQS_LABEL.to_string()))
    }

    /// Turn the resolved field into the final FAQ list.
    #[must_use]
    pub fn finish(
        resolved: ResolvedField<FieldValue>,
        policy: &Policy,
        view: &LocalizationView,
    ) -> ResolvedField<Vec<FaqEntry>> {
        let faqs = resolved.map(|value| {
            Self::dedupe(
                value
                    .into_faqs()
                    .into_iter()
                    .filter(|entry| !entry.question.is_empty() && !entry.answers.is_empty()),
            )
        });

        if policy.suppress_faq_when_unlocalized && !view.is_localized(&faqs, Vec::is_empty) {
            return ResolvedField::exhausted();
        }
        faqs
    }

    /// Keep the first of each (question, answer set) pair, case-insensitively.
    pub fn dedupe(entries: impl IntoIterator<Item = FaqEntry>) -> Vec<FaqEntry> {
        let mut seen: BTreeSet<(String, BTreeSet<String>)> = BTreeSet::new();
        entries
            .into_iter()
            .filter(|entry| {
                let question = normalize_whitespace(&entry.question).to_lowercase();
                let answers = entry
                    .answers
                    .iter()
                    .map(|a| normalize_whitespace(a).to_lowercase())
                    .collect();
                seen.insert((question, answers))
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
