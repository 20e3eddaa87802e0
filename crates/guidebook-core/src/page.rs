//! # Page Declarations
//!
//! What a guide page tells the engine about itself: its content key, slug,
//! legacy keys, extra text fields, policy, and optional custom field builders.
//!
//! Declarations are validated once, at construction. Anything a page gets
//! wrong (an unknown policy name, a builder reading a field the page never
//! declared) is reported there, so resolution itself can stay total.

use crate::bundle::ContentHash;
use crate::locale::LocalePair;
use crate::policy::{Policy, PolicyConflict, PolicyRegistry};
use crate::primitives::{
    DEFAULT_GUIDES_SLUG, MAX_EXTRA_FIELDS, MAX_FIELD_BUILDERS, MAX_LEGACY_KEYS,
};
use crate::types::{ContentKey, Field, FieldValue, GuideError, ResolvedField};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// CUSTOM FIELD BUILDERS
// =============================================================================

/// Resolved values visible to a custom builder.
pub struct BuilderInputs<'a> {
    fields: &'a BTreeMap<Field, ResolvedField<FieldValue>>,
    locales: &'a LocalePair,
}

impl<'a> BuilderInputs<'a> {
    #[must_use]
    pub const fn new(
        fields: &'a BTreeMap<Field, ResolvedField<FieldValue>>,
        locales: &'a LocalePair,
    ) -> Self {
        Self { fields, locales }
    }

    #[must_use]
    pub fn get(&self, field: &Field) -> Option<&ResolvedField<FieldValue>> {
        self.fields.get(field)
    }

    #[must_use]
    pub const fn locales(&self) -> &LocalePair {
        self.locales
    }
}

/// Page-supplied computation of one field from other resolved fields.
///
/// The output replaces the cascade result for [`FieldBuilder::target`]. It is
/// tagged with the least localized tier among the declared inputs.
pub trait FieldBuilder: Send + Sync {
    /// Identifier used in diagnostics and cache fingerprints.
    fn name(&self) -> &str;

    /// Field the builder produces.
    fn target(&self) -> Field;

    /// Fields the builder reads.
    fn inputs(&self) -> Vec<Field>;

    /// Compute the value, or `None` to keep the cascade result.
    fn build(&self, inputs: &BuilderInputs<'_>) -> Option<FieldValue>;
}

// =============================================================================
// PAGE SPEC (data form)
// =============================================================================

/// Serializable page declaration, as found in a pages manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSpec {
    pub key: String,
    pub slug: Option<String>,
    pub meta_key: Option<String>,
    pub guides_slug: Option<String>,
    pub legacy_keys: Vec<String>,
    pub extra_fields: Vec<String>,
    /// Named registry entries, merged in order.
    pub policies: Vec<String>,
    /// Inline flags and overrides, merged last.
    pub policy: Policy,
}

impl PageSpec {
    /// Validate into a declaration.
    pub fn into_declaration(self, registry: &PolicyRegistry) -> Result<PageDeclaration, GuideError> {
        let mut builder = PageDeclaration::builder(self.key)
            .legacy_keys(self.legacy_keys)
            .extra_fields(self.extra_fields)
            .policies(self.policies)
            .inline_policy(self.policy);
        if let Some(slug) = self.slug {
            builder = builder.slug(slug);
        }
        if let Some(meta_key) = self.meta_key {
            builder = builder.meta_key(meta_key);
        }
        if let Some(guides_slug) = self.guides_slug {
            builder = builder.guides_slug(guides_slug);
        }
        builder.build(registry)
    }
}

// =============================================================================
// PAGE DECLARATION
// =============================================================================

/// A validated guide page.
#[derive(Clone)]
pub struct PageDeclaration {
    key: String,
    slug: String,
    meta_key: String,
    guides_slug: String,
    legacy_keys: Vec<String>,
    extra_fields: Vec<String>,
    policy_names: Vec<String>,
    policy: Policy,
    builders: Vec<Arc<dyn FieldBuilder>>,
    fingerprint: ContentHash,
}

impl fmt::Debug for PageDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageDeclaration")
            .field("key", &self.key)
            .field("slug", &self.slug)
            .field("meta_key", &self.meta_key)
            .field("legacy_keys", &self.legacy_keys)
            .field("extra_fields", &self.extra_fields)
            .field("policy_names", &self.policy_names)
            .field(
                "builders",
                &self.builders.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PageDeclaration {
    /// Start declaring a page with the given content key.
    #[must_use]
    pub fn builder(key: impl Into<String>) -> PageDeclarationBuilder {
        PageDeclarationBuilder::new(key.into())
    }

    /// Content key (`positanoBeaches`).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Key used for `meta.{meta_key}.*` lookups; defaults to the content key.
    #[must_use]
    pub fn meta_key(&self) -> &str {
        &self.meta_key
    }

    #[must_use]
    pub fn guides_slug(&self) -> &str {
        &self.guides_slug
    }

    #[must_use]
    pub fn legacy_keys(&self) -> &[String] {
        &self.legacy_keys
    }

    #[must_use]
    pub fn extra_fields(&self) -> &[String] {
        &self.extra_fields
    }

    #[must_use]
    pub fn policy_names(&self) -> &[String] {
        &self.policy_names
    }

    /// Composed policy (named entries, then inline flags).
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    #[must_use]
    pub fn builders(&self) -> &[Arc<dyn FieldBuilder>] {
        &self.builders
    }

    /// Digest of everything in the declaration that affects rendering.
    #[must_use]
    pub const fn fingerprint(&self) -> ContentHash {
        self.fingerprint
    }

    /// Precedence-decided flag combinations, for diagnostics.
    #[must_use]
    pub fn conflicts(&self) -> Vec<PolicyConflict> {
        self.policy.conflicts()
    }

    /// `content.{key}.{suffix}`.
    #[must_use]
    pub fn content_key(&self, suffix: &str) -> ContentKey {
        ContentKey::content(&self.key, suffix)
    }

    /// `content.{legacy}.{suffix}` for every legacy key.
    #[must_use]
    pub fn legacy_content_keys(&self, suffix: &str) -> Vec<ContentKey> {
        self.legacy_keys
            .iter()
            .map(|legacy| ContentKey::content(legacy, suffix))
            .collect()
    }

    /// Every field this page resolves: built-ins then declared extras.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        Field::BUILTIN
            .into_iter()
            .chain(self.extra_fields.iter().cloned().map(Field::Extra))
            .collect()
    }

    /// Whether the page resolves `field`.
    #[must_use]
    pub fn defines(&self, field: &Field) -> bool {
        match field {
            Field::Extra(name) => self.extra_fields.iter().any(|f| f == name),
            _ => true,
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Collects a page declaration and validates it in [`PageDeclarationBuilder::build`].
pub struct PageDeclarationBuilder {
    key: String,
    slug: Option<String>,
    meta_key: Option<String>,
    guides_slug: Option<String>,
    legacy_keys: Vec<String>,
    extra_fields: Vec<String>,
    policy_names: Vec<String>,
    inline: Policy,
    builders: Vec<Arc<dyn FieldBuilder>>,
}

impl PageDeclarationBuilder {
    fn new(key: String) -> Self {
        Self {
            key,
            slug: None,
            meta_key: None,
            guides_slug: None,
            legacy_keys: Vec::new(),
            extra_fields: Vec::new(),
            policy_names: Vec::new(),
            inline: Policy::default(),
            builders: Vec::new(),
        }
    }

    #[must_use]
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    #[must_use]
    pub fn meta_key(mut self, meta_key: impl Into<String>) -> Self {
        self.meta_key = Some(meta_key.into());
        self
    }

    #[must_use]
    pub fn guides_slug(mut self, guides_slug: impl Into<String>) -> Self {
        self.guides_slug = Some(guides_slug.into());
        self
    }

    #[must_use]
    pub fn legacy_key(mut self, key: impl Into<String>) -> Self {
        self.legacy_keys.push(key.into());
        self
    }

    #[must_use]
    pub fn legacy_keys(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.legacy_keys.extend(keys);
        self
    }

    #[must_use]
    pub fn extra_field(mut self, name: impl Into<String>) -> Self {
        self.extra_fields.push(name.into());
        self
    }

    #[must_use]
    pub fn extra_fields(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.extra_fields.extend(names);
        self
    }

    /// Refer to a named registry entry.
    #[must_use]
    pub fn policy(mut self, name: impl Into<String>) -> Self {
        self.policy_names.push(name.into());
        self
    }

    #[must_use]
    pub fn policies(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.policy_names.extend(names);
        self
    }

    #[must_use]
    pub fn inline_policy(mut self, policy: Policy) -> Self {
        self.inline = policy;
        self
    }

    #[must_use]
    pub fn field_builder(mut self, builder: impl FieldBuilder + 'static) -> Self {
        self.builders.push(Arc::new(builder));
        self
    }

    /// Validate and produce the declaration.
    pub fn build(self, registry: &PolicyRegistry) -> Result<PageDeclaration, GuideError> {
        let key = self.key.trim().to_string();
        let invalid = |reason: &str| GuideError::InvalidPage {
            page: key.clone(),
            reason: reason.to_string(),
        };

        if key.is_empty() {
            return Err(invalid("content key is empty"));
        }
        ContentKey::content(&key, "intro").validate()?;

        let slug = match self.slug {
            Some(slug) => slug.trim().trim_matches('/').to_string(),
            None => kebab_case(&key),
        };
        if slug.is_empty() || slug.contains('/') {
            return Err(invalid("slug must be one non-empty path segment"));
        }
        let guides_slug = self
            .guides_slug
            .map(|s| s.trim().trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GUIDES_SLUG.to_string());
        if guides_slug.is_empty() {
            return Err(invalid("guides slug is empty"));
        }
        let meta_key = self
            .meta_key
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| key.clone());

        if self.legacy_keys.len() > MAX_LEGACY_KEYS {
            return Err(invalid("too many legacy keys"));
        }
        let mut legacy_keys: Vec<String> = Vec::with_capacity(self.legacy_keys.len());
        for legacy in self.legacy_keys {
            let legacy = legacy.trim().to_string();
            ContentKey::content(&legacy, "intro").validate()?;
            if legacy != key && !legacy_keys.contains(&legacy) {
                legacy_keys.push(legacy);
            }
        }

        if self.extra_fields.len() > MAX_EXTRA_FIELDS {
            return Err(invalid("too many extra fields"));
        }
        let mut extra_fields: Vec<String> = Vec::with_capacity(self.extra_fields.len());
        for name in self.extra_fields {
            match Field::parse(&name)? {
                Field::Extra(extra) if !extra_fields.contains(&extra) => extra_fields.push(extra),
                Field::Extra(_) => return Err(invalid("duplicate extra field")),
                builtin => {
                    return Err(GuideError::InvalidPage {
                        page: key.clone(),
                        reason: format!("extra field shadows built-in field {builtin}"),
                    });
                }
            }
        }

        let policy = registry.compose(&self.policy_names, &self.inline)?;

        let declared = |field: &Field| match field {
            Field::Extra(name) => extra_fields.contains(name),
            _ => true,
        };
        let undefined = |field: &Field| GuideError::UndefinedField {
            page: key.clone(),
            field: field.name(),
        };

        if let Some(field) = policy.overrides.keys().find(|f| !declared(f)) {
            return Err(undefined(field));
        }

        if self.builders.len() > MAX_FIELD_BUILDERS {
            return Err(invalid("too many field builders"));
        }
        let mut targets: BTreeSet<Field> = BTreeSet::new();
        for builder in &self.builders {
            let target = builder.target();
            if !declared(&target) {
                return Err(undefined(&target));
            }
            if let Some(input) = builder.inputs().iter().find(|f| !declared(f)) {
                return Err(undefined(input));
            }
            if builder.inputs().contains(&target) {
                return Err(GuideError::InvalidPage {
                    page: key.clone(),
                    reason: format!("builder {} reads its own target", builder.name()),
                });
            }
            if !targets.insert(target.clone()) {
                return Err(GuideError::InvalidPage {
                    page: key.clone(),
                    reason: format!("two builders target {target}"),
                });
            }
        }

        let fingerprint = fingerprint(
            &key,
            &slug,
            &meta_key,
            &guides_slug,
            &legacy_keys,
            &extra_fields,
            &policy,
            &self.builders,
        );

        Ok(PageDeclaration {
            key,
            slug,
            meta_key,
            guides_slug,
            legacy_keys,
            extra_fields,
            policy_names: self.policy_names,
            policy,
            builders: self.builders,
            fingerprint,
        })
    }
}

fn fingerprint(
    key: &str,
    slug: &str,
    meta_key: &str,
    guides_slug: &str,
    legacy_keys: &[String],
    extra_fields: &[String],
    policy: &Policy,
    builders: &[Arc<dyn FieldBuilder>],
) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    for part in [key, slug, meta_key, guides_slug] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    for part in legacy_keys.iter().chain(extra_fields) {
        hasher.update(part.as_bytes());
        hasher.update(&[1]);
    }
    hasher.update(&serde_json::to_vec(policy).unwrap_or_default());
    for builder in builders {
        hasher.update(builder.name().as_bytes());
        hasher.update(builder.target().name().as_bytes());
        hasher.update(&[2]);
    }
    ContentHash::from_hasher(&hasher)
}

/// `positanoBeaches` → `positano-beaches`.
#[must_use]
pub fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len().saturating_add(4));
    let mut previous_lower = false;
    for c in key.chars() {
        if c.is_uppercase() {
            if previous_lower {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            previous_lower = false;
        } else if c.is_alphanumeric() {
            out.push(c);
            previous_lower = true;
        } else {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            previous_lower = false;
        }
    }
    out.trim_end_matches('-').to_string()
}

// =============================================================================
// TESTS
// =============================================================================
