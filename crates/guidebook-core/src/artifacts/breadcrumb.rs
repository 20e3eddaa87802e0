//! # Breadcrumb Builder
//!
//! Home > Guides > Page, each label resolved through the cascade.
//!
//! Site chrome labels are shared between the `labels.*` and `breadcrumbs.*`
//! namespaces, so a bundle that stores one label's key as another label's
//! value is common. Every breadcrumb key, and its identifier-like last
//! segment, is treated as a sentinel for both labels.

use crate::locale::LocalePair;
use crate::page::PageDeclaration;
use crate::primitives::{
    DEFAULT_GUIDES_LABEL, DEFAULT_HOME_LABEL, GUIDES_LABEL_KEYS, HOME_LABEL_KEYS,
};
use crate::resolver::FieldRequest;
use crate::types::{BreadcrumbItem, ContentKey, Field, FieldValue, ResolvedField, Tier};

/// Builds the breadcrumb trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreadcrumbBuilder;

impl BreadcrumbBuilder {
    /// Home label: `labels.homeBreadcrumb`, `breadcrumbs.home`, then "Home".
    #[must_use]
    pub fn home_request() -> FieldRequest {
        label_request(Field::HomeLabel, HOME_LABEL_KEYS, DEFAULT_HOME_LABEL)
    }

    /// Guides label: `labels.guidesBreadcrumb`, `breadcrumbs.guides`, then "Guides".
    #[must_use]
    pub fn guides_request() -> FieldRequest {
        label_request(Field::GuidesLabel, GUIDES_LABEL_KEYS, DEFAULT_GUIDES_LABEL)
    }

    /// Assemble the trail. The page label is the resolved title.
    ///
    /// The trail reports the least localized tier among its labels.
    #[must_use]
    pub fn build(
        page: &PageDeclaration,
        locales: &LocalePair,
        home: &ResolvedField<String>,
        guides: &ResolvedField<String>,
        title: &ResolvedField<String>,
    ) -> ResolvedField<Vec<BreadcrumbItem>> {
        let lang = locales.target.as_str();
        let (title_label, title_tier) = if title.value().is_empty() {
            (page.key().to_string(), Tier::GenericDefault)
        } else {
            (title.value().clone(), title.tier())
        };

        let items = vec![
            BreadcrumbItem {
                position: 1,
                label: home.value().clone(),
                href: format!("/{lang}"),
                tier: home.tier(),
            },
            BreadcrumbItem {
                position: 2,
                label: guides.value().clone(),
                href: format!("/{lang}/{}", page.guides_slug()),
                tier: guides.tier(),
            },
            BreadcrumbItem {
                position: 3,
                label: title_label,
                href: format!("/{lang}/{}/{}", page.guides_slug(), page.slug()),
                tier: title_tier,
            },
        ];

        let tier = items
            .iter()
            .map(|item| item.tier)
            .max()
            .unwrap_or(Tier::GenericDefault);
        ResolvedField::new(items, tier)
    }
}

fn label_request(field: Field, [primary, alternate]: [&str; 2], default: &str) -> FieldRequest {
    FieldRequest::new(field, ContentKey::new(primary))
        .with_alternate(ContentKey::new(alternate))
        .with_sentinels(label_sentinels())
        .with_default(FieldValue::Text(default.to_string()))
}

fn label_sentinels() -> Vec<String> {
    HOME_LABEL_KEYS
        .iter()
        .chain(GUIDES_LABEL_KEYS.iter())
        .flat_map(|key| {
            let segment = ContentKey::new(*key).last_segment().to_string();
            let identifier = segment.chars().any(char::is_uppercase).then_some(segment);
            std::iter::once((*key).to_string()).chain(identifier)
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
