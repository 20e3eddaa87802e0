//! # Cascading Resolver
//!
//! Drives the probe and classifier across an ordered tier list for one field.
//!
//! ## Tier Sites
//!
//! | Tier | Locale | Namespace | Keys |
//! |------|--------|-----------|------|
//! | `ActiveLocaleStructured` | target | `guides` | request keys |
//! | `ActiveLocaleManualFallback` | target | `guidesFallback` | request keys, with and without `content.` |
//! | `FallbackLocaleStructured` | reference | `guides` | request keys |
//! | `LegacyKeyVariant` | target, then reference | `guides` | legacy keys |
//! | `GenericDefault` | - | - | the request's default |
//!
//! Within a tier, keys are tried in order before the cascade moves on, so a
//! current key always beats its legacy alias at the same tier.
//!
//! ## Reference Echo
//!
//! For a non-reference locale, an active-locale value equal to the reference
//! locale's value is a silent copy. It is never reported as
//! `ActiveLocaleStructured`. The cascade moves on to the next planned tier,
//! so hand-written manual fallback copy still wins. Under
//! [`EchoHandling::Halt`] it stops before the first tier outside the active
//! locale instead of borrowing.
//!
//! Detecting an echo reads the reference value once, even when the plan
//! leaves out `FallbackLocaleStructured`. That read is a comparison, not a
//! tier visit: it is not recorded in the trace, and when the plan does visit
//! the reference tier the same result is reused rather than probed again.
//!
//! Resolution is total. An exhausted cascade returns an empty
//! `GenericDefault` value.

use crate::bundle::LocaleBundleProvider;
use crate::classifier::PlaceholderClassifier;
use crate::locale::LocalePair;
use crate::policy::{CascadePlan, EchoHandling, FieldOverride, Policy};
use crate::primitives::{GUIDES_NAMESPACE, MANUAL_FALLBACK_NAMESPACE};
use crate::probe::ContentProbe;
use crate::types::{
    CandidateValue, ContentKey, Field, FieldOrigin, FieldShape, FieldValue, LocaleTag,
    PlaceholderReason, ResolvedField, Tier,
};
use serde::Serialize;

// =============================================================================
// REQUEST
// =============================================================================

/// What to resolve for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequest {
    pub field: Field,
    pub shape: FieldShape,
    /// Primary key first, then same-tier alternates.
    pub keys: Vec<ContentKey>,
    /// Retired keys probed at `LegacyKeyVariant`.
    pub legacy_keys: Vec<ContentKey>,
    /// Value for the `GenericDefault` tier.
    pub default: Option<FieldValue>,
    /// Sentinels on top of the classifier's own.
    pub sentinels: Vec<String>,
}

impl FieldRequest {
    /// Request `field` at `key`.
    #[must_use]
    pub fn new(field: Field, key: ContentKey) -> Self {
        Self {
            shape: field.shape(),
            field,
            keys: vec![key],
            legacy_keys: Vec::new(),
            default: None,
            sentinels: Vec::new(),
        }
    }

    /// Probe `key` at the same tier after the keys already present.
    #[must_use]
    pub fn with_alternate(mut self, key: ContentKey) -> Self {
        self.keys.push(key);
        self
    }

    #[must_use]
    pub fn with_legacy(mut self, keys: impl IntoIterator<Item = ContentKey>) -> Self {
        self.legacy_keys.extend(keys);
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn with_sentinels(mut self, phrases: impl IntoIterator<Item = String>) -> Self {
        self.sentinels.extend(phrases);
        self
    }

    /// Primary key.
    #[must_use]
    pub fn primary_key(&self) -> Option<&ContentKey> {
        self.keys.first()
    }
}

// =============================================================================
// TRACE
// =============================================================================

/// What one tier produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Absent,
    Placeholder(PlaceholderReason),
    /// Meaningful but identical to the reference locale.
    ReferenceEcho,
    Meaningful,
}

/// One visited tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierProbe {
    pub tier: Tier,
    pub outcome: ProbeOutcome,
    /// Key behind a meaningful or placeholder outcome.
    pub key: Option<ContentKey>,
}

/// Diagnostic record of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionTrace {
    pub field: Field,
    pub origin: FieldOrigin,
    pub probes: Vec<TierProbe>,
    /// The plan halted on a reference echo.
    pub halted: bool,
}

impl ResolutionTrace {
    fn new(field: Field, origin: FieldOrigin) -> Self {
        Self {
            field,
            origin,
            probes: Vec::new(),
            halted: false,
        }
    }

    fn record(&mut self, tier: Tier, outcome: ProbeOutcome, key: Option<ContentKey>) {
        self.probes.push(TierProbe { tier, outcome, key });
    }
}

/// A resolved field together with how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub field: ResolvedField<FieldValue>,
    pub trace: ResolutionTrace,
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Candidate plus the key that produced it.
type Probed = (CandidateValue<FieldValue>, Option<ContentKey>);

/// Resolves fields for one locale pair against one bundle provider.
pub struct CascadingResolver<'a, P: LocaleBundleProvider + ?Sized> {
    provider: &'a P,
    classifier: &'a PlaceholderClassifier,
    locales: &'a LocalePair,
}

impl<'a, P: LocaleBundleProvider + ?Sized> CascadingResolver<'a, P> {
    #[must_use]
    pub const fn new(
        provider: &'a P,
        classifier: &'a PlaceholderClassifier,
        locales: &'a LocalePair,
    ) -> Self {
        Self {
            provider,
            classifier,
            locales,
        }
    }

    #[must_use]
    pub const fn locales(&self) -> &LocalePair {
        self.locales
    }

    /// Resolve under a policy.
    #[must_use]
    pub fn resolve_with_policy(&self, request: &FieldRequest, policy: &Policy) -> Resolution {
        self.resolve(request, &policy.plan(&request.field, self.locales))
    }

    /// Resolve following an explicit plan.
    #[must_use]
    pub fn resolve(&self, request: &FieldRequest, plan: &CascadePlan) -> Resolution {
        let extended;
        let classifier = if request.sentinels.is_empty() {
            self.classifier
        } else {
            extended = self
                .classifier
                .clone()
                .with_sentinels(request.sentinels.iter());
            &extended
        };
        let probe = ContentProbe::new(classifier);

        match plan {
            CascadePlan::Override(value) => self.resolve_override(&probe, request, value),
            CascadePlan::Cascade { tiers, echo } => self.cascade(&probe, request, tiers, *echo),
        }
    }

    fn cascade(
        &self,
        probe: &ContentProbe<'_>,
        request: &FieldRequest,
        tiers: &[Tier],
        echo: EchoHandling,
    ) -> Resolution {
        let mut trace = ResolutionTrace::new(request.field.clone(), FieldOrigin::Cascade);
        let mut reference_memo: Option<Probed> = None;
        let mut active_only = false;

        for &tier in tiers {
            if active_only && !tier.is_active_locale() {
                trace.halted = true;
                return exhausted(request, trace);
            }
            let (candidate, key) = match tier {
                Tier::FallbackLocaleStructured => match reference_memo.take() {
                    Some(memo) => memo,
                    None => self.probe_tier(probe, request, tier),
                },
                _ => self.probe_tier(probe, request, tier),
            };

            match candidate {
                CandidateValue::Meaningful(value) => {
                    if tier == Tier::ActiveLocaleStructured && !self.locales.is_reference() {
                        let reference =
                            self.probe_tier(probe, request, Tier::FallbackLocaleStructured);
                        let is_echo = reference.0.meaningful() == Some(&value);
                        reference_memo = Some(reference);

                        if is_echo {
                            trace.record(tier, ProbeOutcome::ReferenceEcho, key);
                            active_only = echo == EchoHandling::Halt;
                            continue;
                        }
                    }
                    trace.record(tier, ProbeOutcome::Meaningful, key);
                    return Resolution {
                        field: ResolvedField::new(value, tier),
                        trace,
                    };
                }
                CandidateValue::Placeholder(reason) => {
                    trace.record(tier, ProbeOutcome::Placeholder(reason), key);
                }
                CandidateValue::Absent => trace.record(tier, ProbeOutcome::Absent, None),
            }
        }

        exhausted(request, trace)
    }

    fn resolve_override(
        &self,
        probe: &ContentProbe<'_>,
        request: &FieldRequest,
        value: &FieldOverride,
    ) -> Resolution {
        let mut trace = ResolutionTrace::new(request.field.clone(), FieldOrigin::Override);
        let key = request
            .primary_key()
            .cloned()
            .unwrap_or_else(|| ContentKey::new(request.field.name()));

        for (raw, tier) in value.candidates(self.locales) {
            match probe.normalize(raw, &key, request.shape) {
                CandidateValue::Meaningful(normalized) => {
                    trace.record(tier, ProbeOutcome::Meaningful, None);
                    return Resolution {
                        field: ResolvedField::new(normalized, tier)
                            .with_origin(FieldOrigin::Override),
                        trace,
                    };
                }
                CandidateValue::Placeholder(reason) => {
                    trace.record(tier, ProbeOutcome::Placeholder(reason), None);
                }
                CandidateValue::Absent => trace.record(tier, ProbeOutcome::Absent, None),
            }
        }

        let mut resolution = exhausted(request, trace);
        resolution.field = resolution.field.with_origin(FieldOrigin::Override);
        resolution
    }

    fn probe_tier(&self, probe: &ContentProbe<'_>, request: &FieldRequest, tier: Tier) -> Probed {
        let target = &self.locales.target;
        let reference = &self.locales.reference;

        match tier {
            Tier::ActiveLocaleStructured => {
                self.probe_keys(probe, target, GUIDES_NAMESPACE, &request.keys, request.shape)
            }
            Tier::ActiveLocaleManualFallback => {
                let keys: Vec<ContentKey> = request
                    .keys
                    .iter()
                    .flat_map(|key| {
                        let bare = key.without_namespace().map(ContentKey::new);
                        std::iter::once(key.clone()).chain(bare)
                    })
                    .collect();
                self.probe_keys(
                    probe,
                    target,
                    MANUAL_FALLBACK_NAMESPACE,
                    &keys,
                    request.shape,
                )
            }
            Tier::FallbackLocaleStructured => self.probe_keys(
                probe,
                reference,
                GUIDES_NAMESPACE,
                &request.keys,
                request.shape,
            ),
            Tier::LegacyKeyVariant => {
                let active = self.probe_keys(
                    probe,
                    target,
                    GUIDES_NAMESPACE,
                    &request.legacy_keys,
                    request.shape,
                );
                if active.0.is_meaningful() || self.locales.is_reference() {
                    return active;
                }
                let fallback = self.probe_keys(
                    probe,
                    reference,
                    GUIDES_NAMESPACE,
                    &request.legacy_keys,
                    request.shape,
                );
                prefer_informative(active, fallback)
            }
            Tier::GenericDefault => match &request.default {
                Some(value) if !value.is_empty() => (CandidateValue::Meaningful(value.clone()), None),
                _ => (CandidateValue::Absent, None),
            },
        }
    }

    /// First meaningful key wins; otherwise the first placeholder, else absent.
    fn probe_keys(
        &self,
        probe: &ContentProbe<'_>,
        locale: &LocaleTag,
        namespace: &str,
        keys: &[ContentKey],
        shape: FieldShape,
    ) -> Probed {
        let bundle = self.provider.get(locale, namespace);
        let mut best: Probed = (CandidateValue::Absent, None);

        for key in keys {
            let candidate = probe.probe(bundle, key, shape);
            match candidate {
                CandidateValue::Meaningful(_) => return (candidate, Some(key.clone())),
                CandidateValue::Placeholder(_) if !matches!(best.0, CandidateValue::Placeholder(_)) => {
                    best = (candidate, Some(key.clone()));
                }
                _ => {}
            }
        }
        best
    }
}

fn prefer_informative(first: Probed, second: Probed) -> Probed {
    match (&first.0, &second.0) {
        (_, CandidateValue::Meaningful(_)) => second,
        (CandidateValue::Absent, CandidateValue::Placeholder(_)) => second,
        _ => first,
    }
}

fn exhausted(request: &FieldRequest, trace: ResolutionTrace) -> Resolution {
    Resolution {
        field: ResolvedField::new(FieldValue::empty(request.shape), Tier::GenericDefault),
        trace,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleSet;
    use serde_json::json;

    fn locales(target: &str) -> LocalePair {
        LocalePair::new(
            LocaleTag::parse(target).expect("locale"),
            LocaleTag::reference(),
        )
    }

    fn intro_request() -> FieldRequest {
        FieldRequest::new(Field::Intro, ContentKey::new("content.demoGuide.intro"))
    }

    fn bundles(it_intro: serde_json::Value, en_intro: serde_json::Value) -> BundleSet {
        let it = LocaleTag::parse("it").expect("locale");
        BundleSet::new()
            .with(
                &it,
                GUIDES_NAMESPACE,
                json!({ "content": { "demoGuide": { "intro": it_intro } } }),
            )
            .with(
                &LocaleTag::reference(),
                GUIDES_NAMESPACE,
                json!({ "content": { "demoGuide": { "intro": en_intro } } }),
            )
    }

    #[test]
    fn active_locale_wins() {
        let set = bundles(json!(["Benvenuti"]), json!(["Welcome"]));
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let resolution = resolver.resolve_with_policy(&intro_request(), &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::ActiveLocaleStructured);
        assert!(!resolution.field.is_fallback());
        assert_eq!(
            resolution.field.value(),
            &FieldValue::Paragraphs(vec!["Benvenuti".to_string()])
        );
    }

    #[test]
    fn placeholder_falls_to_reference() {
        let set = bundles(json!(["traduzione in arrivo"]), json!(["Welcome"]));
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let resolution = resolver.resolve_with_policy(&intro_request(), &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::FallbackLocaleStructured);
        assert!(resolution.field.is_fallback());
        assert_eq!(
            resolution.trace.probes[0].outcome,
            ProbeOutcome::Placeholder(PlaceholderReason::Sentinel)
        );
        assert_eq!(resolution.trace.probes[1].outcome, ProbeOutcome::Absent);
    }

    #[test]
    fn reference_echo_is_not_localized() {
        let set = bundles(json!(["Welcome"]), json!(["Welcome"]));
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let resolution = resolver.resolve_with_policy(&intro_request(), &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::FallbackLocaleStructured);
        assert_eq!(
            resolution.trace.probes[0].outcome,
            ProbeOutcome::ReferenceEcho
        );

        let halting = Policy {
            halt_on_reference_echo: true,
            ..Policy::default()
        };
        let resolution = resolver.resolve_with_policy(&intro_request(), &halting);
        assert_eq!(resolution.field.tier(), Tier::GenericDefault);
        assert!(resolution.field.value().is_empty());
        assert!(resolution.trace.halted);
    }

    #[test]
    fn reference_locale_never_echoes_itself() {
        let set = bundles(json!(["Benvenuti"]), json!(["Welcome"]));
        let classifier = PlaceholderClassifier::new();
        let pair = locales("en");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let resolution = resolver.resolve_with_policy(&intro_request(), &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::ActiveLocaleStructured);
    }

    #[test]
    fn manual_fallback_accepts_bare_key() {
        let it = LocaleTag::parse("it").expect("locale");
        let set = BundleSet::new().with(
            &it,
            MANUAL_FALLBACK_NAMESPACE,
            json!({ "demoGuide": { "intro": "Testo manuale" } }),
        );
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let resolution = resolver.resolve_with_policy(&intro_request(), &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::ActiveLocaleManualFallback);
        assert_eq!(
            resolution.trace.probes[1].key,
            Some(ContentKey::new("demoGuide.intro"))
        );
    }

    #[test]
    fn echo_moves_on_to_manual_fallback_under_every_policy() {
        let it = LocaleTag::parse("it").expect("locale");
        let set = bundles(json!(["Welcome"]), json!(["Welcome"])).with(
            &it,
            MANUAL_FALLBACK_NAMESPACE,
            json!({ "demoGuide": { "intro": "Testo manuale" } }),
        );
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let policies = [
            Policy::default(),
            Policy {
                stop_at_active_locale: true,
                ..Policy::default()
            },
            Policy {
                halt_on_reference_echo: true,
                ..Policy::default()
            },
        ];
        for policy in &policies {
            let resolution = resolver.resolve_with_policy(&intro_request(), policy);
            assert_eq!(resolution.field.tier(), Tier::ActiveLocaleManualFallback);
            assert_eq!(
                resolution.field.value(),
                &FieldValue::Paragraphs(vec!["Testo manuale".to_string()])
            );
            assert_eq!(resolution.trace.probes[0].outcome, ProbeOutcome::ReferenceEcho);
            assert!(!resolution.trace.halted);
        }
    }

    #[test]
    fn stop_after_echo_exhausts_without_halting() {
        let set = bundles(json!(["Welcome"]), json!(["Welcome"]));
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let stop = Policy {
            stop_at_active_locale: true,
            ..Policy::default()
        };
        let resolution = resolver.resolve_with_policy(&intro_request(), &stop);
        assert_eq!(resolution.field.tier(), Tier::GenericDefault);
        assert!(resolution.field.value().is_empty());
        assert_eq!(resolution.trace.probes.len(), 2);
        assert!(!resolution.trace.halted);
    }

    #[test]
    fn alternates_beat_next_tier() {
        let set = BundleSet::new()
            .with(
                &LocaleTag::parse("it").expect("locale"),
                GUIDES_NAMESPACE,
                json!({ "content.g.faq": [{ "q": "Q?", "a": "A" }] }),
            )
            .with(
                &LocaleTag::reference(),
                GUIDES_NAMESPACE,
                json!({ "content.g.faqs": [{ "q": "EN?", "a": "EN" }] }),
            );
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let request = FieldRequest::new(Field::Faqs, ContentKey::new("content.g.faqs"))
            .with_alternate(ContentKey::new("content.g.faq"));
        let resolution = resolver.resolve_with_policy(&request, &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::ActiveLocaleStructured);
        assert_eq!(
            resolution.field.value(),
            &FieldValue::Faqs(vec![crate::types::FaqEntry {
                question: "Q?".to_string(),
                answers: vec!["A".to_string()]
            }])
        );
    }

    #[test]
    fn legacy_and_default_tiers() {
        let set = BundleSet::new().with(
            &LocaleTag::reference(),
            GUIDES_NAMESPACE,
            json!({ "content.oldKey.title": "Old title" }),
        );
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let request = FieldRequest::new(Field::Title, ContentKey::new("content.newKey.title"))
            .with_legacy([ContentKey::new("content.oldKey.title")]);
        let resolution = resolver.resolve_with_policy(&request, &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::LegacyKeyVariant);

        let request = FieldRequest::new(Field::HomeLabel, ContentKey::new("labels.homeBreadcrumb"))
            .with_default(FieldValue::Text("Home".to_string()));
        let resolution = resolver.resolve_with_policy(&request, &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::GenericDefault);
        assert_eq!(resolution.field.value(), &FieldValue::Text("Home".to_string()));
    }

    #[test]
    fn stop_returns_empty_generic_default() {
        let set = bundles(json!(["  "]), json!(["Welcome"]));
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let policy = Policy {
            stop_at_active_locale: true,
            prefer_generic_when_fallback: true,
            ..Policy::default()
        };
        let resolution = resolver.resolve_with_policy(&intro_request(), &policy);
        assert_eq!(resolution.field.tier(), Tier::GenericDefault);
        assert!(resolution.field.value().is_empty());
        assert_eq!(resolution.trace.probes.len(), 2);
    }

    #[test]
    fn override_bypasses_cascade() {
        let set = bundles(json!(["Benvenuti"]), json!(["Welcome"]));
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let mut policy = Policy::default();
        policy.overrides.insert(
            Field::Intro,
            FieldOverride::fixed(json!(["Generic intro"])),
        );
        let resolution = resolver.resolve_with_policy(&intro_request(), &policy);
        assert_eq!(resolution.field.origin(), FieldOrigin::Override);
        assert_eq!(resolution.field.tier(), Tier::GenericDefault);
        assert_eq!(
            resolution.field.value(),
            &FieldValue::Paragraphs(vec!["Generic intro".to_string()])
        );
    }

    #[test]
    fn label_sentinels_reject_cross_key_echo() {
        let set = BundleSet::new().with(
            &LocaleTag::parse("it").expect("locale"),
            GUIDES_NAMESPACE,
            json!({ "labels": { "homeBreadcrumb": "breadcrumbs.home" } }),
        );
        let classifier = PlaceholderClassifier::new();
        let pair = locales("it");
        let resolver = CascadingResolver::new(&set, &classifier, &pair);

        let request = FieldRequest::new(Field::HomeLabel, ContentKey::new("labels.homeBreadcrumb"))
            .with_sentinels(["breadcrumbs.home".to_string()])
            .with_default(FieldValue::Text("Home".to_string()));
        let resolution = resolver.resolve_with_policy(&request, &Policy::default());
        assert_eq!(resolution.field.tier(), Tier::GenericDefault);
    }
}
