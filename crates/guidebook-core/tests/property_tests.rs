//! # Property-Based Tests
//!
//! Invariants of the resolution engine checked with proptest: totality,
//! idempotence, echo rejection and classifier totality.

use guidebook_core::primitives::{GUIDES_NAMESPACE, MANUAL_FALLBACK_NAMESPACE};
use guidebook_core::{
    BundleSet, CascadingResolver, ContentKey, ContextAssembler, Field, FieldRequest, LocaleConfig,
    LocalePair, LocaleResolver, LocaleTag, PageDeclaration, PlaceholderClassifier, Policy,
    PolicyRegistry, RequestLocale, Tier,
};
use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::{Value, json};

fn it() -> LocaleTag {
    LocaleTag::parse("it").expect("locale")
}

/// Strings that cover real copy, blanks, sentinels and key echoes.
fn candidate_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z ]{0,24}",
        Just(String::new()),
        Just("   ".to_string()),
        Just("Traduzione in arrivo".to_string()),
        Just("content.demoGuide.intro".to_string()),
        Just("intro".to_string()),
    ]
}

fn candidate_value() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        candidate_text().prop_map(|s| Some(json!(s))),
        vec(candidate_text(), 0..4).prop_map(|v| Some(json!(v))),
        Just(Some(json!({ "unexpected": true }))),
        Just(Some(json!(42))),
    ]
}

fn intro_bundle(value: Option<Value>) -> Value {
    match value {
        Some(value) => json!({ "content": { "demoGuide": { "intro": value } } }),
        None => json!({}),
    }
}

fn bundles(active: Option<Value>, manual: Option<Value>, reference: Option<Value>) -> BundleSet {
    BundleSet::new()
        .with(&it(), GUIDES_NAMESPACE, intro_bundle(active))
        .with(&it(), MANUAL_FALLBACK_NAMESPACE, intro_bundle(manual))
        .with(&LocaleTag::reference(), GUIDES_NAMESPACE, intro_bundle(reference))
}

fn policy_from_bits(bits: u8) -> Policy {
    Policy {
        stop_at_active_locale: bits & 1 != 0,
        prefer_generic_when_fallback: bits & 2 != 0,
        manual_fallback_not_localized: bits & 4 != 0,
        halt_on_reference_echo: bits & 8 != 0,
        suppress_faq_when_unlocalized: bits & 16 != 0,
        hide_toc_when_unlocalized: bits & 32 != 0,
        ..Policy::default()
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Resolution terminates within one probe per tier and always yields a value.
    #[test]
    fn resolution_is_total(
        active in candidate_value(),
        manual in candidate_value(),
        reference in candidate_value(),
        bits in 0u8..64,
    ) {
        let set = bundles(active, manual, reference);
        let classifier = PlaceholderClassifier::new();
        let locales = LocalePair::new(it(), LocaleTag::reference());
        let resolver = CascadingResolver::new(&set, &classifier, &locales);
        let request = FieldRequest::new(Field::Intro, ContentKey::new("content.demoGuide.intro"));

        let resolution = resolver.resolve_with_policy(&request, &policy_from_bits(bits));
        prop_assert!(resolution.trace.probes.len() <= Tier::ALL.len());
        prop_assert_eq!(
            resolution.field.is_fallback(),
            resolution.field.tier() != Tier::ActiveLocaleStructured
        );
        if resolution.field.value().is_empty() {
            prop_assert_eq!(resolution.field.tier(), Tier::GenericDefault);
        }
    }

    /// Identical inputs give identical results.
    #[test]
    fn resolution_is_idempotent(
        active in candidate_value(),
        reference in candidate_value(),
        bits in 0u8..64,
    ) {
        let set = bundles(active, None, reference);
        let classifier = PlaceholderClassifier::new();
        let locales = LocalePair::new(it(), LocaleTag::reference());
        let resolver = CascadingResolver::new(&set, &classifier, &locales);
        let request = FieldRequest::new(Field::Intro, ContentKey::new("content.demoGuide.intro"));
        let policy = policy_from_bits(bits);

        let first = resolver.resolve_with_policy(&request, &policy);
        let second = resolver.resolve_with_policy(&request, &policy);
        prop_assert_eq!(first, second);
    }

    /// A copy of the reference value is never reported as localized.
    #[test]
    fn echo_is_never_active(paragraphs in vec("[A-Za-z]{1,12}", 1..4), bits in 0u8..64) {
        let value = json!(paragraphs);
        let set = bundles(Some(value.clone()), None, Some(value));
        let classifier = PlaceholderClassifier::new();
        let locales = LocalePair::new(it(), LocaleTag::reference());
        let resolver = CascadingResolver::new(&set, &classifier, &locales);
        let request = FieldRequest::new(Field::Intro, ContentKey::new("content.demoGuide.intro"));

        let resolution = resolver.resolve_with_policy(&request, &policy_from_bits(bits));
        prop_assert_ne!(resolution.field.tier(), Tier::ActiveLocaleStructured);
    }

    /// With stop set, real manual copy always beats an empty result.
    #[test]
    fn stop_never_discards_manual_copy(
        active in candidate_value(),
        reference in candidate_value(),
        manual in "Testo [a-z]{3,10}",
        bits in 0u8..64,
    ) {
        let set = bundles(active, Some(json!(manual)), reference);
        let classifier = PlaceholderClassifier::new();
        let locales = LocalePair::new(it(), LocaleTag::reference());
        let resolver = CascadingResolver::new(&set, &classifier, &locales);
        let request = FieldRequest::new(Field::Intro, ContentKey::new("content.demoGuide.intro"));

        let resolution = resolver.resolve_with_policy(&request, &policy_from_bits(bits | 1));
        prop_assert!(!resolution.field.value().is_empty());
        prop_assert!(resolution.field.tier().is_active_locale());
    }

    /// The classifier answers for any input.
    #[test]
    fn classifier_is_total(text in ".{0,64}", key in "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}") {
        let classifier = PlaceholderClassifier::new();
        let key = ContentKey::new(key);
        let first = classifier.classify(&text, &key);
        prop_assert_eq!(first, classifier.classify(&text, &key));
        prop_assert_eq!(classifier.accept(&text, &key).is_none(), first.is_some());
    }

    /// Whatever the bundles hold, every page context is assembled.
    #[test]
    fn assembly_is_total(
        active in candidate_value(),
        reference in candidate_value(),
        lang in prop_oneof![Just("it"), Just("en"), Just("de"), Just("zz")],
    ) {
        let set = bundles(active, None, reference);
        let locales = LocaleResolver::new(LocaleConfig::default());
        let assembler = ContextAssembler::new(&set, &locales);
        let page = PageDeclaration::builder("demoGuide")
            .build(&PolicyRegistry::builtin())
            .expect("page");

        let ctx = assembler.assemble(&page, &RequestLocale::new(lang));
        prop_assert!(!ctx.title().value().is_empty());
        prop_assert_eq!(ctx.breadcrumb().value().len(), 3);
    }
}
