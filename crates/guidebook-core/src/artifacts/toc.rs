//! # Table of Contents Builder
//!
//! Selection order:
//!
//! 1. A page-supplied ToC builder or ToC override: its entries are used as-is
//!    (hrefs still synthesized from section titles), nothing appended. An
//!    override left with no entries for this locale falls through to 3.
//! 2. An explicit ToC from the active locale's structured content, if at
//!    least one entry survives cleaning
//! 3. A ToC derived from the resolved sections, plus a `#faqs` link when the
//!    page has FAQs
//!
//! An explicit ToC borrowed from another locale or tier is ignored: its
//! anchors would point at a different set of sections.

use crate::page::PageDeclaration;
use crate::policy::{LocalizationView, Policy};
use crate::primitives::FAQS_ANCHOR;
use crate::resolver::FieldRequest;
use crate::types::{
    FaqEntry, Field, FieldOrigin, FieldValue, ResolvedField, Section, Tier, TocEntry, TocItem,
};
use std::collections::BTreeSet;

/// Everything the ToC is built from, already resolved.
pub struct TocInputs<'a> {
    /// Explicit author ToC (cascade, override or builder output).
    pub explicit: &'a ResolvedField<FieldValue>,
    pub sections: &'a ResolvedField<Vec<Section>>,
    pub faqs: &'a ResolvedField<Vec<FaqEntry>>,
    /// Label for the appended FAQ link.
    pub faqs_heading: &'a ResolvedField<String>,
}

/// Builds the table of contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TocBuilder;

impl TocBuilder {
    #[must_use]
    pub fn request(page: &PageDeclaration) -> FieldRequest {
        FieldRequest::new(Field::Toc, page.content_key("toc"))
            .with_legacy(page.legacy_content_keys("toc"))
    }

    /// Pick the explicit or derived ToC and apply the page's visibility flag.
    #[must_use]
    pub fn build(
        inputs: &TocInputs<'_>,
        policy: &Policy,
        view: &LocalizationView,
    ) -> ResolvedField<Vec<TocItem>> {
        let toc = Self::select(inputs);
        if policy.hide_toc_when_unlocalized && !view.is_localized(&toc, Vec::is_empty) {
            return ResolvedField::exhausted();
        }
        toc
    }

    fn select(inputs: &TocInputs<'_>) -> ResolvedField<Vec<TocItem>> {
        let explicit = inputs.explicit;
        let entries = match explicit.value() {
            FieldValue::Toc(entries) => entries.as_slice(),
            _ => &[],
        };

        match explicit.origin() {
            FieldOrigin::Builder => {
                let items = Self::from_explicit(entries, inputs.sections.value());
                return ResolvedField::new(items, explicit.tier()).with_origin(FieldOrigin::Builder);
            }
            FieldOrigin::Override => {
                let items = Self::from_explicit(entries, inputs.sections.value());
                if !items.is_empty() {
                    return ResolvedField::new(items, explicit.tier())
                        .with_origin(FieldOrigin::Override);
                }
                return Self::derived(inputs);
            }
            FieldOrigin::Cascade => {}
        }

        if explicit.tier() == Tier::ActiveLocaleStructured {
            let items = Self::from_explicit(entries, inputs.sections.value());
            if !items.is_empty() {
                return ResolvedField::new(items, explicit.tier()).with_origin(explicit.origin());
            }
        }

        Self::derived(inputs)
    }

    fn derived(inputs: &TocInputs<'_>) -> ResolvedField<Vec<TocItem>> {
        let mut items = Self::derive(inputs.sections.value());
        let mut tier = (!items.is_empty()).then_some(inputs.sections.tier());

        if !inputs.faqs.value().is_empty() {
            items.push(TocItem::new(FAQS_ANCHOR, inputs.faqs_heading.value().clone()));
            let faq_tier = inputs.faqs.tier().max(inputs.faqs_heading.tier());
            tier = Some(tier.map_or(faq_tier, |t| t.max(faq_tier)));
        }

        match tier {
            Some(tier) => ResolvedField::new(items, tier),
            None => ResolvedField::exhausted(),
        }
    }

    /// Clean author entries: blank labels were already dropped during normalization;
    /// missing hrefs are matched to a section title, unmatched ones dropped.
    /// The first entry per href wins.
    #[must_use]
    pub fn from_explicit(entries: &[TocEntry], sections: &[Section]) -> Vec<TocItem> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        entries
            .iter()
            .filter_map(|entry| {
                let label = entry.label.trim();
                if label.is_empty() {
                    return None;
                }
                let href = match &entry.href {
                    Some(href) => href.clone(),
                    None => {
                        let wanted = label.to_lowercase();
                        let section = sections
                            .iter()
                            .find(|s| !s.title.is_empty() && s.title.to_lowercase() == wanted)?;
                        format!("#{}", section.id)
                    }
                };
                seen.insert(href.clone()).then(|| TocItem::new(href, label))
            })
            .collect()
    }

    /// One entry per section with both a title and a body.
    #[must_use]
    pub fn derive(sections: &[Section]) -> Vec<TocItem> {
        sections
            .iter()
            .filter(|s| s.is_navigable())
            .map(|s| TocItem::new(format!("#{}", s.id), s.title.clone()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
