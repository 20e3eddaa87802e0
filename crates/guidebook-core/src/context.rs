//! # Context Assembler
//!
//! Produces the immutable [`PageContext`] a renderer consumes.
//!
//! ## Pipeline
//!
//! ```text
//! RequestLocale → LocalePair
//!   → resolve every declared field (cascade or override)
//!   → run page-supplied field builders, in declaration order
//!   → finish artifacts (FAQ, ToC, breadcrumb) under one LocalizationView
//!   → PageContext
//! ```
//!
//! Assembly never fails. A page that resolves nothing still gets a context
//! with empty fields at `GenericDefault` and a title from its meta key.

use crate::artifacts::{BreadcrumbBuilder, FaqBuilder, SeoResolver, TocBuilder, TocInputs};
use crate::bundle::{ContentHash, LocaleBundleProvider};
use crate::classifier::PlaceholderClassifier;
use crate::locale::{LocalePair, LocaleResolver, RequestLocale};
use crate::page::{BuilderInputs, PageDeclaration};
use crate::resolver::{CascadingResolver, FieldRequest, Resolution, ResolutionTrace};
use crate::types::{
    BreadcrumbItem, FaqEntry, Field, FieldOrigin, FieldValue, GuideError, ResolvedField, Section,
    Tier, TocItem,
};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// PAGE CONTEXT
// =============================================================================

/// Everything a renderer needs for one page in one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageContext {
    page: String,
    slug: String,
    locales: LocalePair,
    localized: bool,
    intro: ResolvedField<Vec<String>>,
    sections: ResolvedField<Vec<Section>>,
    faqs: ResolvedField<Vec<FaqEntry>>,
    faqs_heading: ResolvedField<String>,
    toc: ResolvedField<Vec<TocItem>>,
    title: ResolvedField<String>,
    description: ResolvedField<String>,
    breadcrumb: ResolvedField<Vec<BreadcrumbItem>>,
    extras: BTreeMap<String, ResolvedField<String>>,
}

impl PageContext {
    /// Content key of the page.
    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub const fn locales(&self) -> &LocalePair {
        &self.locales
    }

    /// True when intro, sections or FAQs are localized for the active locale.
    #[must_use]
    pub const fn is_localized(&self) -> bool {
        self.localized
    }

    #[must_use]
    pub const fn intro(&self) -> &ResolvedField<Vec<String>> {
        &self.intro
    }

    #[must_use]
    pub const fn sections(&self) -> &ResolvedField<Vec<Section>> {
        &self.sections
    }

    #[must_use]
    pub const fn faqs(&self) -> &ResolvedField<Vec<FaqEntry>> {
        &self.faqs
    }

    #[must_use]
    pub const fn faqs_heading(&self) -> &ResolvedField<String> {
        &self.faqs_heading
    }

    #[must_use]
    pub const fn toc(&self) -> &ResolvedField<Vec<TocItem>> {
        &self.toc
    }

    #[must_use]
    pub const fn title(&self) -> &ResolvedField<String> {
        &self.title
    }

    #[must_use]
    pub const fn description(&self) -> &ResolvedField<String> {
        &self.description
    }

    #[must_use]
    pub const fn breadcrumb(&self) -> &ResolvedField<Vec<BreadcrumbItem>> {
        &self.breadcrumb
    }

    #[must_use]
    pub const fn extras(&self) -> &BTreeMap<String, ResolvedField<String>> {
        &self.extras
    }

    /// Declared extra text field by name.
    #[must_use]
    pub fn extra(&self, name: &str) -> Option<&ResolvedField<String>> {
        self.extras.get(name)
    }

    /// Tier of every field, including derived artifacts, keyed by field name.
    #[must_use]
    pub fn tiers(&self) -> BTreeMap<String, Tier> {
        let mut out = BTreeMap::from([
            (Field::Intro.name(), self.intro.tier()),
            (Field::Sections.name(), self.sections.tier()),
            (Field::Faqs.name(), self.faqs.tier()),
            (Field::FaqsHeading.name(), self.faqs_heading.tier()),
            (Field::Toc.name(), self.toc.tier()),
            (Field::Title.name(), self.title.tier()),
            (Field::Description.name(), self.description.tier()),
            ("breadcrumb".to_string(), self.breadcrumb.tier()),
        ]);
        out.extend(
            self.extras
                .iter()
                .map(|(name, field)| (Field::Extra(name.clone()).name(), field.tier())),
        );
        out
    }
}

/// A context together with how each field was found.
#[derive(Debug, Clone)]
pub struct TracedContext {
    pub context: PageContext,
    pub traces: BTreeMap<Field, ResolutionTrace>,
}

// =============================================================================
// ASSEMBLER
// =============================================================================

/// Builds page contexts from one bundle provider.
pub struct ContextAssembler<'a, P: LocaleBundleProvider + ?Sized> {
    provider: &'a P,
    locale_resolver: &'a LocaleResolver,
    classifier: PlaceholderClassifier,
}

impl<'a, P: LocaleBundleProvider + ?Sized> ContextAssembler<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, locale_resolver: &'a LocaleResolver) -> Self {
        Self {
            provider,
            locale_resolver,
            classifier: PlaceholderClassifier::new(),
        }
    }

    /// Replace the placeholder classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: PlaceholderClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        self.provider
    }

    #[must_use]
    pub const fn locale_resolver(&self) -> &LocaleResolver {
        self.locale_resolver
    }

    /// Target and reference locale for a request.
    #[must_use]
    pub fn locales(&self, request: &RequestLocale) -> LocalePair {
        self.locale_resolver.resolve(request)
    }

    /// Digest of every input that affects `page` rendered for `locales`.
    #[must_use]
    pub fn content_hash(&self, page: &PageDeclaration, locales: &LocalePair) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(
            self.provider
                .fingerprint(&[&locales.target, &locales.reference])
                .as_bytes(),
        );
        hasher.update(page.fingerprint().as_bytes());
        for sentinel in self.classifier.sentinels() {
            hasher.update(sentinel.as_bytes());
            hasher.update(&[0]);
        }
        ContentHash::from_hasher(&hasher)
    }

    /// Assemble the context for a request.
    #[must_use]
    pub fn assemble(&self, page: &PageDeclaration, request: &RequestLocale) -> PageContext {
        self.assemble_for(page, &self.locales(request))
    }

    /// Assemble for an already resolved locale pair.
    #[must_use]
    pub fn assemble_for(&self, page: &PageDeclaration, locales: &LocalePair) -> PageContext {
        self.assemble_traced_for(page, locales).context
    }

    /// Assemble and keep every field's resolution trace.
    #[must_use]
    pub fn assemble_traced(&self, page: &PageDeclaration, request: &RequestLocale) -> TracedContext {
        self.assemble_traced_for(page, &self.locales(request))
    }

    /// Resolve one declared field through the cascade, before builders and
    /// artifact finishing.
    pub fn resolve_field(
        &self,
        page: &PageDeclaration,
        field: &Field,
        request: &RequestLocale,
    ) -> Result<Resolution, GuideError> {
        if !page.defines(field) {
            return Err(GuideError::UndefinedField {
                page: page.key().to_string(),
                field: field.name(),
            });
        }
        let locales = self.locales(request);
        let resolver = CascadingResolver::new(self.provider, &self.classifier, &locales);
        Ok(resolve_one(&resolver, page, field))
    }

    fn assemble_traced_for(&self, page: &PageDeclaration, locales: &LocalePair) -> TracedContext {
        let resolver = CascadingResolver::new(self.provider, &self.classifier, locales);

        let mut fields: BTreeMap<Field, ResolvedField<FieldValue>> = BTreeMap::new();
        let mut traces: BTreeMap<Field, ResolutionTrace> = BTreeMap::new();
        for field in page.fields() {
            let resolution = resolve_one(&resolver, page, &field);
            fields.insert(field.clone(), resolution.field);
            traces.insert(field, resolution.trace);
        }

        apply_builders(page, locales, &mut fields, &mut traces);

        TracedContext {
            context: finish(page, locales, fields),
            traces,
        }
    }
}

// =============================================================================
// STAGES
// =============================================================================

fn resolve_one<P: LocaleBundleProvider + ?Sized>(
    resolver: &CascadingResolver<'_, P>,
    page: &PageDeclaration,
    field: &Field,
) -> Resolution {
    match field {
        Field::Title => SeoResolver::title(resolver, page),
        Field::Description => SeoResolver::description(resolver, page),
        _ => resolver.resolve_with_policy(&request_for(page, field), page.policy()),
    }
}

fn request_for(page: &PageDeclaration, field: &Field) -> FieldRequest {
    match field {
        Field::Faqs => FaqBuilder::request(page),
        Field::FaqsHeading => FaqBuilder::heading_request(page),
        Field::Toc => TocBuilder::request(page),
        Field::HomeLabel => BreadcrumbBuilder::home_request(),
        Field::GuidesLabel => BreadcrumbBuilder::guides_request(),
        Field::Extra(name) => FieldRequest::new(field.clone(), page.content_key(name))
            .with_legacy(page.legacy_content_keys(name)),
        _ => {
            let suffix = field.name();
            FieldRequest::new(field.clone(), page.content_key(&suffix))
                .with_legacy(page.legacy_content_keys(&suffix))
        }
    }
}

/// Run page builders in order. Each sees the outputs of the ones before it.
///
/// Output that is empty or of the wrong shape keeps the cascade result.
fn apply_builders(
    page: &PageDeclaration,
    locales: &LocalePair,
    fields: &mut BTreeMap<Field, ResolvedField<FieldValue>>,
    traces: &mut BTreeMap<Field, ResolutionTrace>,
) {
    for builder in page.builders() {
        let target = builder.target();
        let Some(value) = builder
            .build(&BuilderInputs::new(fields, locales))
            .filter(|value| !value.is_empty() && value.shape() == target.shape())
        else {
            continue;
        };

        let tier = builder
            .inputs()
            .iter()
            .filter_map(|input| fields.get(input))
            .map(ResolvedField::tier)
            .max()
            .unwrap_or(Tier::GenericDefault);
        fields.insert(
            target.clone(),
            ResolvedField::new(value, tier).with_origin(FieldOrigin::Builder),
        );
        if let Some(trace) = traces.get_mut(&target) {
            trace.origin = FieldOrigin::Builder;
        }
    }
}

fn finish(
    page: &PageDeclaration,
    locales: &LocalePair,
    mut fields: BTreeMap<Field, ResolvedField<FieldValue>>,
) -> PageContext {
    let mut take = |field: Field| {
        let shape = field.shape();
        fields
            .remove(&field)
            .unwrap_or_else(|| ResolvedField::new(FieldValue::empty(shape), Tier::GenericDefault))
    };

    let policy = page.policy();
    let view = policy.localization_view();

    let intro = take(Field::Intro).map(FieldValue::into_paragraphs);
    let sections = take(Field::Sections).map(FieldValue::into_sections);
    let faqs = FaqBuilder::finish(take(Field::Faqs), policy, &view);
    let faqs_heading = take(Field::FaqsHeading).map(FieldValue::into_text);
    let title = take(Field::Title).map(FieldValue::into_text);
    let description = take(Field::Description).map(FieldValue::into_text);
    let home = take(Field::HomeLabel).map(FieldValue::into_text);
    let guides = take(Field::GuidesLabel).map(FieldValue::into_text);
    let explicit_toc = take(Field::Toc);

    let extras = page
        .extra_fields()
        .iter()
        .map(|name| {
            let field = take(Field::Extra(name.clone())).map(FieldValue::into_text);
            (name.clone(), field)
        })
        .collect();

    let toc = TocBuilder::build(
        &TocInputs {
            explicit: &explicit_toc,
            sections: &sections,
            faqs: &faqs,
            faqs_heading: &faqs_heading,
        },
        policy,
        &view,
    );
    let breadcrumb = BreadcrumbBuilder::build(page, locales, &home, &guides, &title);

    let localized = view.is_localized(&intro, Vec::is_empty)
        || view.is_localized(&sections, Vec::is_empty)
        || view.is_localized(&faqs, Vec::is_empty);

    PageContext {
        page: page.key().to_string(),
        slug: page.slug().to_string(),
        locales: locales.clone(),
        localized,
        intro,
        sections,
        faqs,
        faqs_heading,
        toc,
        title,
        description,
        breadcrumb,
        extras,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleSet;
    use crate::locale::LocaleConfig;
    use crate::page::FieldBuilder;
    use crate::policy::PolicyRegistry;
    use crate::primitives::{GUIDES_NAMESPACE, MANUAL_FALLBACK_NAMESPACE};
    use crate::types::LocaleTag;
    use serde_json::json;

    fn it() -> LocaleTag {
        LocaleTag::parse("it").expect("locale")
    }

    fn bundles() -> BundleSet {
        BundleSet::new()
            .with(
                &it(),
                GUIDES_NAMESPACE,
                json!({
                    "content": { "positanoBeaches": {
                        "intro": ["Le spiagge di Positano."],
                        "sections": [
                            { "id": "spiaggia-grande", "title": "Spiaggia Grande", "body": ["La più famosa."] }
                        ]
                    } },
                    "labels": { "guidesBreadcrumb": "Guide" }
                }),
            )
            .with(
                &LocaleTag::reference(),
                GUIDES_NAMESPACE,
                json!({
                    "content": { "positanoBeaches": {
                        "intro": ["Positano's beaches."],
                        "faqs": [{ "q": "Is there sand?", "a": "Mostly pebbles." }],
                        "seo": { "title": "Positano beaches" }
                    } }
                }),
            )
    }

    fn page(policies: &[&str]) -> PageDeclaration {
        PageDeclaration::builder("positanoBeaches")
            .policies(policies.iter().map(|p| p.to_string()))
            .build(&PolicyRegistry::builtin())
            .expect("page")
    }

    #[test]
    fn assembles_mixed_tiers() {
        let set = bundles();
        let locales = LocaleResolver::new(LocaleConfig::default());
        let assembler = ContextAssembler::new(&set, &locales);

        let ctx = assembler.assemble(&page(&[]), &RequestLocale::new("it"));
        assert!(ctx.is_localized());
        assert_eq!(ctx.intro().tier(), Tier::ActiveLocaleStructured);
        assert_eq!(ctx.faqs().tier(), Tier::FallbackLocaleStructured);
        assert_eq!(ctx.title().value(), "Positano beaches");
        assert!(ctx.title().is_fallback());
        assert_eq!(ctx.faqs_heading().value(), "FAQs");

        let hrefs: Vec<&str> = ctx.toc().value().iter().map(|t| t.href.as_str()).collect();
        assert_eq!(hrefs, vec!["#spiaggia-grande", "#faqs"]);

        let labels: Vec<&str> = ctx
            .breadcrumb()
            .value()
            .iter()
            .map(|b| b.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Home", "Guide", "Positano beaches"]);
    }

    #[test]
    fn manual_fallback_localization_is_threaded() {
        let set = BundleSet::new().with(
            &it(),
            MANUAL_FALLBACK_NAMESPACE,
            json!({ "positanoBeaches": { "intro": "Testo manuale." } }),
        );
        let locales = LocaleResolver::new(LocaleConfig::default());
        let assembler = ContextAssembler::new(&set, &locales);
        let request = RequestLocale::new("it");

        let ctx = assembler.assemble(&page(&[]), &request);
        assert_eq!(ctx.intro().tier(), Tier::ActiveLocaleManualFallback);
        assert!(ctx.is_localized());

        let ctx = assembler.assemble(&page(&["whatToPack"]), &request);
        assert_eq!(ctx.intro().tier(), Tier::ActiveLocaleManualFallback);
        assert!(!ctx.is_localized());
    }

    struct ServiceDescription;

    impl FieldBuilder for ServiceDescription {
        fn name(&self) -> &str {
            "serviceDescription"
        }
        fn target(&self) -> Field {
            Field::Description
        }
        fn inputs(&self) -> Vec<Field> {
            vec![Field::Extra("serviceType".to_string()), Field::Title]
        }
        fn build(&self, inputs: &BuilderInputs<'_>) -> Option<FieldValue> {
            let service = inputs.get(&Field::Extra("serviceType".to_string()))?;
            match service.value() {
                FieldValue::Text(text) if !text.is_empty() => {
                    Some(FieldValue::Text(format!("{text} in Positano")))
                }
                _ => None,
            }
        }
    }

    #[test]
    fn builder_output_takes_least_localized_input_tier() {
        let set = BundleSet::new().with(
            &it(),
            GUIDES_NAMESPACE,
            json!({ "content.luggageStorage.serviceType": "Deposito bagagli" }),
        );
        let locales = LocaleResolver::new(LocaleConfig::default());
        let assembler = ContextAssembler::new(&set, &locales);
        let page = PageDeclaration::builder("luggageStorage")
            .extra_field("serviceType")
            .field_builder(ServiceDescription)
            .build(&PolicyRegistry::new())
            .expect("page");

        let traced = assembler.assemble_traced(&page, &RequestLocale::new("it"));
        let description = traced.context.description();
        assert_eq!(description.value(), "Deposito bagagli in Positano");
        assert_eq!(description.origin(), FieldOrigin::Builder);
        // Title fell back to the raw meta key.
        assert_eq!(description.tier(), Tier::GenericDefault);
        assert_eq!(
            traced.traces[&Field::Description].origin,
            FieldOrigin::Builder
        );
        assert_eq!(
            traced.context.extra("serviceType").map(|f| f.tier()),
            Some(Tier::ActiveLocaleStructured)
        );
    }

    #[test]
    fn resolve_field_rejects_undeclared_extra() {
        let set = BundleSet::new();
        let locales = LocaleResolver::new(LocaleConfig::default());
        let assembler = ContextAssembler::new(&set, &locales);
        let err = assembler.resolve_field(
            &page(&[]),
            &Field::Extra("areaServed".to_string()),
            &RequestLocale::new("it"),
        );
        assert!(matches!(err, Err(GuideError::UndefinedField { .. })));
    }

    #[test]
    fn content_hash_tracks_bundles() {
        let set = bundles();
        let locales = LocaleResolver::new(LocaleConfig::default());
        let assembler = ContextAssembler::new(&set, &locales);
        let pair = assembler.locales(&RequestLocale::new("it"));
        let before = assembler.content_hash(&page(&[]), &pair);

        let changed = bundles().with(&it(), MANUAL_FALLBACK_NAMESPACE, json!({ "x": "y" }));
        let assembler = ContextAssembler::new(&changed, &locales);
        assert_ne!(before, assembler.content_hash(&page(&[]), &pair));
    }
}
