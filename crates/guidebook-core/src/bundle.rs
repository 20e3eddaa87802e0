//! # Locale Bundles
//!
//! Read-only resource sets, one per (locale, namespace).
//!
//! A bundle maps dotted keys to strings, arrays or objects. Authors mix two
//! styles freely, so lookup accepts both:
//!
//! ```text
//! { "content.guide.intro": ["..."] }                 flat
//! { "content": { "guide": { "intro": ["..."] } } }   nested
//! { "content": { "guide.intro": ["..."] } }          mixed
//! ```
//!
//! Lookup never falls back across locales. Every fallback is a tier the
//! cascading resolver probes explicitly.

use crate::primitives::{GUIDES_NAMESPACE, MANUAL_FALLBACK_NAMESPACE};
use crate::types::{ContentKey, GuideError, LocaleTag};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Namespaces the engine reads.
pub const ENGINE_NAMESPACES: [&str; 2] = [GUIDES_NAMESPACE, MANUAL_FALLBACK_NAMESPACE];

// =============================================================================
// CONTENT HASH
// =============================================================================

/// BLAKE3 digest identifying bundle contents.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash raw bytes.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    #[must_use]
    pub fn from_hasher(hasher: &blake3::Hasher) -> Self {
        Self(*hasher.finalize().as_bytes())
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// =============================================================================
// BUNDLE
// =============================================================================

/// One locale's resources for one namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    root: Value,
    hash: ContentHash,
}

impl Bundle {
    /// Wrap a JSON value. Non-object roots are kept but never match a key.
    #[must_use]
    pub fn new(root: Value) -> Self {
        let bytes = serde_json::to_vec(&root).unwrap_or_default();
        Self {
            hash: ContentHash::of(&bytes),
            root,
        }
    }

    /// Parse a bundle from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, GuideError> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| GuideError::SerializationError(format!("Bundle JSON: {}", e)))?;
        if !root.is_object() {
            return Err(GuideError::MalformedEntry {
                key: String::new(),
                reason: "bundle root must be an object".to_string(),
            });
        }
        Ok(Self::new(root))
    }

    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    #[must_use]
    pub const fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Find the value stored under a dotted key.
    ///
    /// At every level the longest matching flat prefix wins, so a flat
    /// `"a.b.c"` entry shadows a nested `a → b → c` path.
    #[must_use]
    pub fn lookup(&self, key: &ContentKey) -> Option<&Value> {
        let segments: Vec<&str> = key.as_str().split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        find_path(&self.root, &segments)
    }
}

fn find_path<'a>(node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    if segments.is_empty() {
        return Some(node);
    }
    let map = node.as_object()?;

    for split in (1..=segments.len()).rev() {
        let candidate = segments[..split].join(".");
        if let Some(child) = map.get(&candidate)
            && let Some(found) = find_path(child, &segments[split..])
        {
            return Some(found);
        }
    }
    None
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Source of already-loaded bundles.
///
/// Implementations must be read-only for the duration of a render; loading
/// and reloading happen outside the engine.
pub trait LocaleBundleProvider {
    /// The bundle for a locale and namespace, if one exists.
    fn get(&self, locale: &LocaleTag, namespace: &str) -> Option<&Bundle>;

    /// Digest over every engine namespace of the given locales.
    ///
    /// Missing bundles contribute a fixed marker, so adding or removing a
    /// bundle changes the digest too.
    fn fingerprint(&self, locales: &[&LocaleTag]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        for locale in locales {
            for namespace in ENGINE_NAMESPACES {
                hasher.update(locale.as_str().as_bytes());
                hasher.update(b"/");
                hasher.update(namespace.as_bytes());
                match self.get(locale, namespace) {
                    Some(bundle) => hasher.update(bundle.hash().as_bytes()),
                    None => hasher.update(&[0u8; 32]),
                };
            }
        }
        ContentHash::from_hasher(&hasher)
    }
}

/// In-memory provider backed by a `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct BundleSet {
    bundles: BTreeMap<(LocaleTag, String), Bundle>,
}

impl BundleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a bundle, returning the previous one.
    pub fn insert(
        &mut self,
        locale: LocaleTag,
        namespace: impl Into<String>,
        bundle: Bundle,
    ) -> Option<Bundle> {
        self.bundles.insert((locale, namespace.into()), bundle)
    }

    /// Builder-style [`BundleSet::insert`] taking raw JSON.
    #[must_use]
    pub fn with(mut self, locale: &LocaleTag, namespace: &str, root: Value) -> Self {
        self.insert(locale.clone(), namespace, Bundle::new(root));
        self
    }

    pub fn remove(&mut self, locale: &LocaleTag, namespace: &str) -> Option<Bundle> {
        self.bundles.remove(&(locale.clone(), namespace.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// (locale, namespace) pairs in sorted order.
    pub fn entries(&self) -> impl Iterator<Item = (&LocaleTag, &str)> {
        self.bundles
            .keys()
            .map(|(locale, namespace)| (locale, namespace.as_str()))
    }
}

impl LocaleBundleProvider for BundleSet {
    fn get(&self, locale: &LocaleTag, namespace: &str) -> Option<&Bundle> {
        self.bundles.get(&(locale.clone(), namespace.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
