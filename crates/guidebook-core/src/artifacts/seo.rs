//! # SEO Title Resolver
//!
//! Two candidates compete for the page title:
//!
//! - the localized `content.{page}.seo.title` (with legacy keys)
//! - the generic `meta.{meta_key}.title` (or its `guides.`-prefixed form)
//!
//! The candidate from the more localized tier wins, and on a tie the
//! localized title wins. A page that prefers its localized SEO title takes it
//! whenever it has text, even from a less localized tier than the meta title.
//! When both are empty the raw meta key is used, so a page always has a title.
//!
//! The description follows the same rules without the raw-key fallback.

use crate::bundle::LocaleBundleProvider;
use crate::page::PageDeclaration;
use crate::resolver::{CascadingResolver, FieldRequest, Resolution};
use crate::types::{ContentKey, Field, FieldValue, ResolvedField, Tier};

/// Resolves SEO title and description.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeoResolver;

impl SeoResolver {
    /// `(localized, generic)` requests for `field` (`title` or `description`).
    #[must_use]
    pub fn requests(page: &PageDeclaration, field: &Field) -> (FieldRequest, FieldRequest) {
        let suffix = field.name();
        let seo_suffix = format!("seo.{suffix}");
        let localized = FieldRequest::new(field.clone(), page.content_key(&seo_suffix))
            .with_legacy(page.legacy_content_keys(&seo_suffix));

        let meta = ContentKey::new(format!("meta.{}.{suffix}", page.meta_key()));
        let generic = FieldRequest::new(field.clone(), meta.clone())
            .with_alternate(ContentKey::new(format!("guides.{meta}")));
        (localized, generic)
    }

    /// Resolve the page title.
    #[must_use]
    pub fn title<P: LocaleBundleProvider + ?Sized>(
        resolver: &CascadingResolver<'_, P>,
        page: &PageDeclaration,
    ) -> Resolution {
        let mut resolution = Self::resolve(resolver, page, &Field::Title);
        if resolution.field.value().is_empty() {
            resolution.field = ResolvedField::new(
                FieldValue::Text(page.meta_key().to_string()),
                Tier::GenericDefault,
            );
        }
        resolution
    }

    /// Resolve the page description; empty when neither candidate exists.
    #[must_use]
    pub fn description<P: LocaleBundleProvider + ?Sized>(
        resolver: &CascadingResolver<'_, P>,
        page: &PageDeclaration,
    ) -> Resolution {
        Self::resolve(resolver, page, &Field::Description)
    }

    fn resolve<P: LocaleBundleProvider + ?Sized>(
        resolver: &CascadingResolver<'_, P>,
        page: &PageDeclaration,
        field: &Field,
    ) -> Resolution {
        let (localized, generic) = Self::requests(page, field);
        let policy = page.policy();
        let localized = resolver.resolve_with_policy(&localized, policy);
        let generic = resolver.resolve_with_policy(&generic, policy);

        if policy.prefer_localized_seo_title && !localized.field.value().is_empty() {
            return localized;
        }
        choose([localized, generic])
    }
}

/// Lowest non-empty tier wins; ties go to the earlier candidate.
fn choose([first, second]: [Resolution; 2]) -> Resolution {
    let second_wins = match (first.field.value().is_empty(), second.field.value().is_empty()) {
        (true, false) => true,
        (false, false) => second.field.tier() < first.field.tier(),
        _ => false,
    };
    if second_wins { second } else { first }
}

// =============================================================================
// TESTS
// =============================================================================
