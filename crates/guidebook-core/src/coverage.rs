//! # Localization Coverage
//!
//! Renders every page in every requested locale and reports, per field,
//! whether the value is localized, borrowed from a fallback tier, or missing.
//! "Localized" uses each page's own [`LocalizationView`], so a page that does
//! not count manual fallback copy is reported the way it renders.

use crate::bundle::LocaleBundleProvider;
use crate::context::{ContextAssembler, PageContext};
use crate::locale::RequestLocale;
use crate::page::PageDeclaration;
use crate::policy::LocalizationView;
use crate::types::{Field, LocaleTag, Tier};
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a field's value stands for one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Localized,
    Fallback,
    Missing,
}

impl CoverageStatus {
    /// Classify a field from its tier and emptiness.
    #[must_use]
    pub fn of(tier: Tier, is_empty: bool, view: &LocalizationView) -> Self {
        if is_empty {
            CoverageStatus::Missing
        } else if view.counts_as_localized(tier) {
            CoverageStatus::Localized
        } else {
            CoverageStatus::Fallback
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCoverage {
    pub field: String,
    pub status: CoverageStatus,
    pub tier: Tier,
}

/// Coverage of one page in one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCoverage {
    pub page: String,
    pub locale: LocaleTag,
    pub localized: bool,
    pub fields: Vec<FieldCoverage>,
}

impl PageCoverage {
    /// Summarize an assembled context.
    #[must_use]
    pub fn from_context(context: &PageContext, view: &LocalizationView) -> Self {
        let mut rows = vec![
            (Field::Intro.name(), context.intro().tier(), context.intro().value().is_empty()),
            (
                Field::Sections.name(),
                context.sections().tier(),
                context.sections().value().is_empty(),
            ),
            (Field::Faqs.name(), context.faqs().tier(), context.faqs().value().is_empty()),
            (Field::Toc.name(), context.toc().tier(), context.toc().value().is_empty()),
            (Field::Title.name(), context.title().tier(), context.title().value().is_empty()),
            (
                Field::Description.name(),
                context.description().tier(),
                context.description().value().is_empty(),
            ),
        ];
        rows.extend(context.extras().iter().map(|(name, field)| {
            (
                Field::Extra(name.clone()).name(),
                field.tier(),
                field.value().is_empty(),
            )
        }));

        Self {
            page: context.page().to_string(),
            locale: context.locales().target.clone(),
            localized: context.is_localized(),
            fields: rows
                .into_iter()
                .map(|(field, tier, is_empty)| FieldCoverage {
                    status: CoverageStatus::of(tier, is_empty, view),
                    field,
                    tier,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn count(&self, status: CoverageStatus) -> usize {
        self.fields.iter().filter(|f| f.status == status).count()
    }
}

/// Totals for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocaleSummary {
    pub pages: usize,
    pub localized_pages: usize,
    pub localized_fields: usize,
    pub fallback_fields: usize,
    pub missing_fields: usize,
}

/// Coverage of a set of pages across a set of locales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub pages: Vec<PageCoverage>,
    pub locales: BTreeMap<LocaleTag, LocaleSummary>,
}

impl CoverageReport {
    /// Assemble every page for every locale and tally the results.
    ///
    /// Locales the assembler does not support resolve to the reference
    /// locale and are reported under it.
    #[must_use]
    pub fn build<'p, P: LocaleBundleProvider + ?Sized>(
        assembler: &ContextAssembler<'_, P>,
        pages: impl IntoIterator<Item = &'p PageDeclaration>,
        locales: &[LocaleTag],
    ) -> Self {
        let mut report = Self::default();
        for page in pages {
            let view = page.policy().localization_view();
            for locale in locales {
                let context = assembler.assemble(page, &RequestLocale::new(locale.as_str()));
                report.push(PageCoverage::from_context(&context, &view));
            }
        }
        report
    }

    fn push(&mut self, coverage: PageCoverage) {
        let summary = self.locales.entry(coverage.locale.clone()).or_default();
        summary.pages = summary.pages.saturating_add(1);
        if coverage.localized {
            summary.localized_pages = summary.localized_pages.saturating_add(1);
        }
        summary.localized_fields = summary
            .localized_fields
            .saturating_add(coverage.count(CoverageStatus::Localized));
        summary.fallback_fields = summary
            .fallback_fields
            .saturating_add(coverage.count(CoverageStatus::Fallback));
        summary.missing_fields = summary
            .missing_fields
            .saturating_add(coverage.count(CoverageStatus::Missing));
        self.pages.push(coverage);
    }

    /// Page rows for one locale.
    pub fn for_locale<'r>(&'r self, locale: &'r LocaleTag) -> impl Iterator<Item = &'r PageCoverage> {
        self.pages.iter().filter(move |p| &p.locale == locale)
    }
}

// =============================================================================
// TESTS
// =============================================================================
