//! # Policy Registry
//!
//! Per-page flags that truncate or modulate the cascade.
//!
//! ## Precedence (highest first)
//!
//! 1. A per-field override bypasses the cascade for that field
//! 2. `stop_at_active_locale` outranks `prefer_generic_when_fallback`
//! 3. `manual_fallback_not_localized` changes what "localized" means for every
//!    consumer; it is read once into a [`LocalizationView`] and threaded to
//!    all builders
//!
//! [`Policy::plan`] is the single place these rules live. It is total: every
//! flag combination yields exactly one [`CascadePlan`]. Unset flags cascade
//! through every tier.

use crate::locale::LocalePair;
use crate::types::{Field, GuideError, LocaleTag, ResolvedField, Tier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// POLICY
// =============================================================================

/// Named overrides for one page. `Default` is the most permissive cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Never borrow content from outside the target locale.
    pub stop_at_active_locale: bool,
    /// Skip the manual-fallback tier once the active locale has no structured content.
    pub prefer_generic_when_fallback: bool,
    /// Manual fallback copy does not count as localized.
    pub manual_fallback_not_localized: bool,
    /// Take a localized `seo.title` whenever it has text, even over a more
    /// localized meta title.
    pub prefer_localized_seo_title: bool,
    /// Stop instead of accepting reference content when the active locale echoes it.
    pub halt_on_reference_echo: bool,
    /// Drop FAQs entirely unless they are localized.
    pub suppress_faq_when_unlocalized: bool,
    /// Drop the table of contents unless the page is localized.
    pub hide_toc_when_unlocalized: bool,
    /// Field values supplied by the page itself.
    pub overrides: BTreeMap<Field, FieldOverride>,
}

/// Page-authored value for one field, by locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOverride {
    pub locales: BTreeMap<LocaleTag, Value>,
    pub default: Option<Value>,
}

impl FieldOverride {
    /// Same value for every locale.
    #[must_use]
    pub fn fixed(value: Value) -> Self {
        Self {
            locales: BTreeMap::new(),
            default: Some(value),
        }
    }

    /// Add a value for one locale.
    #[must_use]
    pub fn with_locale(mut self, locale: LocaleTag, value: Value) -> Self {
        self.locales.insert(locale, value);
        self
    }

    /// Candidates in preference order, each with the tier it stands for.
    #[must_use]
    pub fn candidates(&self, locales: &LocalePair) -> Vec<(&Value, Tier)> {
        let mut out = Vec::with_capacity(3);
        if let Some(value) = self.locales.get(&locales.target) {
            out.push((value, Tier::ActiveLocaleStructured));
        }
        if !locales.is_reference()
            && let Some(value) = self.locales.get(&locales.reference)
        {
            out.push((value, Tier::FallbackLocaleStructured));
        }
        if let Some(value) = &self.default {
            out.push((value, Tier::GenericDefault));
        }
        out
    }
}

/// A flag combination whose outcome is decided by precedence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum PolicyConflict {
    /// `prefer_generic_when_fallback` has no effect next to `stop_at_active_locale`.
    StopOutranksPreferGeneric,
    /// The field's override makes cascade flags irrelevant for it.
    OverrideOutranksFlags(Field),
}

/// How the resolver treats an active-locale value identical to the reference one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EchoHandling {
    /// Keep cascading through the planned tiers. The reference tier, when
    /// planned, reports the shared value honestly.
    Continue,
    /// Finish the remaining active-locale tiers, then stop with an empty
    /// `GenericDefault` result instead of borrowing from another locale.
    Halt,
}

/// Outcome of the precedence function for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadePlan {
    /// Use the page's value, skip the cascade.
    Override(FieldOverride),
    /// Probe these tiers in order.
    Cascade { tiers: Vec<Tier>, echo: EchoHandling },
}

impl CascadePlan {
    /// Every tier, continuing past an echo.
    #[must_use]
    pub fn full(locales: &LocalePair) -> Self {
        Policy::default().plan(&Field::Intro, locales)
    }

    /// Tiers probed by this plan (empty for overrides).
    #[must_use]
    pub fn tiers(&self) -> &[Tier] {
        match self {
            CascadePlan::Override(_) => &[],
            CascadePlan::Cascade { tiers, .. } => tiers,
        }
    }
}

impl Policy {
    /// Check whether any cascade-shaping flag is set.
    #[must_use]
    pub fn has_cascade_flags(&self) -> bool {
        self.stop_at_active_locale
            || self.prefer_generic_when_fallback
            || self.halt_on_reference_echo
    }

    /// Compose two policies: flags are OR-ed, `other`'s overrides win.
    #[must_use]
    pub fn merge(&self, other: &Policy) -> Policy {
        let mut overrides = self.overrides.clone();
        overrides.extend(
            other
                .overrides
                .iter()
                .map(|(field, value)| (field.clone(), value.clone())),
        );

        Policy {
            stop_at_active_locale: self.stop_at_active_locale || other.stop_at_active_locale,
            prefer_generic_when_fallback: self.prefer_generic_when_fallback
                || other.prefer_generic_when_fallback,
            manual_fallback_not_localized: self.manual_fallback_not_localized
                || other.manual_fallback_not_localized,
            prefer_localized_seo_title: self.prefer_localized_seo_title
                || other.prefer_localized_seo_title,
            halt_on_reference_echo: self.halt_on_reference_echo || other.halt_on_reference_echo,
            suppress_faq_when_unlocalized: self.suppress_faq_when_unlocalized
                || other.suppress_faq_when_unlocalized,
            hide_toc_when_unlocalized: self.hide_toc_when_unlocalized
                || other.hide_toc_when_unlocalized,
            overrides,
        }
    }

    /// The precedence function: which tiers to probe for `field`.
    #[must_use]
    pub fn plan(&self, field: &Field, locales: &LocalePair) -> CascadePlan {
        if let Some(value) = self.overrides.get(field) {
            return CascadePlan::Override(value.clone());
        }

        let mut tiers: Vec<Tier> = Tier::ALL.to_vec();
        if locales.is_reference() {
            tiers.retain(|t| *t != Tier::FallbackLocaleStructured);
        }

        if self.stop_at_active_locale && field.is_page_content() {
            tiers.retain(|t| t.is_active_locale());
        } else if self.prefer_generic_when_fallback && !locales.is_reference() {
            tiers.retain(|t| *t != Tier::ActiveLocaleManualFallback);
        }

        // Truncation alone never halts: a stop plan still owes the manual
        // fallback tier its turn after an echo.
        let echo = if self.halt_on_reference_echo {
            EchoHandling::Halt
        } else {
            EchoHandling::Continue
        };

        CascadePlan::Cascade { tiers, echo }
    }

    /// Which tiers count as localized for this page.
    #[must_use]
    pub fn localization_view(&self) -> LocalizationView {
        let mut localized = BTreeSet::from([Tier::ActiveLocaleStructured]);
        if !self.manual_fallback_not_localized {
            localized.insert(Tier::ActiveLocaleManualFallback);
        }
        LocalizationView { localized }
    }

    /// Flag combinations decided by precedence rather than by the flags themselves.
    #[must_use]
    pub fn conflicts(&self) -> Vec<PolicyConflict> {
        let mut out = Vec::new();
        if self.stop_at_active_locale && self.prefer_generic_when_fallback {
            out.push(PolicyConflict::StopOutranksPreferGeneric);
        }
        if self.has_cascade_flags() {
            out.extend(
                self.overrides
                    .keys()
                    .cloned()
                    .map(PolicyConflict::OverrideOutranksFlags),
            );
        }
        out
    }
}

// =============================================================================
// LOCALIZATION VIEW
// =============================================================================

/// What counts as "localized" for one page, shared by every builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizationView {
    localized: BTreeSet<Tier>,
}

impl LocalizationView {
    #[must_use]
    pub fn counts_as_localized(&self, tier: Tier) -> bool {
        self.localized.contains(&tier)
    }

    /// A field is localized when its tier counts and it holds something.
    #[must_use]
    pub fn is_localized<T>(&self, field: &ResolvedField<T>, is_empty: impl Fn(&T) -> bool) -> bool {
        self.counts_as_localized(field.tier()) && !is_empty(field.value())
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Named policy entries pages can refer to.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    entries: BTreeMap<String, Policy>,
}

impl PolicyRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the site's page exceptions.
    ///
    /// Each entry is a standing exception for a specific guide and is kept as
    /// authored.
    #[must_use]
    pub fn builtin() -> Self {
        let manual_not_localized = Policy {
            manual_fallback_not_localized: true,
            ..Policy::default()
        };
        let prefer_generic = Policy {
            prefer_generic_when_fallback: true,
            ..Policy::default()
        };
        let stop = Policy {
            stop_at_active_locale: true,
            ..Policy::default()
        };

        let mut registry = Self::new();
        registry.register("whatToPack", manual_not_localized.clone());
        registry.register("limoncelloCuisine", prefer_generic.clone());
        registry.register("couplesInHostels", manual_not_localized.merge(&stop));
        // Both flags are set on purpose; stop wins.
        registry.register("sevenDayNoCar", stop.merge(&prefer_generic));
        registry.register("capriDayTrip", stop.clone());
        registry.register("itinerariesPillar", manual_not_localized.clone());
        registry.register("topViewpointsAmalfi", manual_not_localized);
        registry.register("historyPositano", prefer_generic.clone());
        registry.register("fiordoDiFuroreBeachGuide", prefer_generic);
        registry.register(
            "localizedSeoTitle",
            Policy {
                prefer_localized_seo_title: true,
                ..Policy::default()
            },
        );
        registry.register(
            "strictLocalization",
            Policy {
                halt_on_reference_echo: true,
                suppress_faq_when_unlocalized: true,
                hide_toc_when_unlocalized: true,
                ..stop
            },
        );
        registry
    }

    /// Add or replace an entry.
    pub fn register(&mut self, name: impl Into<String>, policy: Policy) -> Option<Policy> {
        self.entries.insert(name.into(), policy)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge named entries in order, then the page's inline policy.
    pub fn compose(&self, names: &[String], inline: &Policy) -> Result<Policy, GuideError> {
        let mut composed = Policy::default();
        for name in names {
            let entry = self
                .get(name)
                .ok_or_else(|| GuideError::UnknownPolicy(name.clone()))?;
            composed = composed.merge(entry);
        }
        Ok(composed.merge(inline))
    }
}

// =============================================================================
// TESTS
// =============================================================================
