//! # Catalog
//!
//! Everything a render needs, loaded from disk once:
//!
//! - locale bundles from `{content_dir}/{locale}/{namespace}.json` for every
//!   supported locale and engine namespace
//! - page declarations from the pages manifest (`[[page]]` tables), plus
//!   optional site-specific `[policies.<name>]` entries layered over the
//!   built-in registry
//!
//! Missing or malformed bundle files are skipped with a warning and recorded
//! as [`CatalogIssue`]s; the engine treats the missing content as absent.
//! An invalid page declaration fails the whole load.

use crate::config::GuidebookConfig;
use guidebook_core::bundle::ENGINE_NAMESPACES;
use guidebook_core::{
    Bundle, BundleSet, ContextAssembler, GuideError, LocaleResolver, LocaleTag, PageDeclaration,
    PageSpec, Policy, PolicyRegistry,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Maximum size of one bundle file (16 MB).
const MAX_BUNDLE_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum size of the pages manifest (4 MB).
const MAX_MANIFEST_FILE_SIZE: u64 = 4 * 1024 * 1024;

// =============================================================================
// MANIFEST
// =============================================================================

/// On-disk pages manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PagesManifest {
    /// Site-specific named policies.
    pub policies: BTreeMap<String, Policy>,
    #[serde(rename = "page")]
    pub pages: Vec<PageSpec>,
}

impl PagesManifest {
    pub fn from_toml_str(text: &str) -> Result<Self, GuideError> {
        toml::from_str(text).map_err(|e| GuideError::ConfigError(format!("Pages manifest: {}", e)))
    }
}

/// A bundle file that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIssue {
    pub locale: String,
    pub namespace: String,
    pub path: String,
    pub reason: String,
}

// =============================================================================
// CATALOG
// =============================================================================

/// Loaded bundles, policies and pages.
#[derive(Debug)]
pub struct Catalog {
    config: GuidebookConfig,
    locale_resolver: LocaleResolver,
    bundles: BundleSet,
    registry: PolicyRegistry,
    pages: BTreeMap<String, PageDeclaration>,
    issues: Vec<CatalogIssue>,
}

impl Catalog {
    /// Load bundles and pages as described by `config`.
    pub fn load(config: GuidebookConfig) -> Result<Self, GuideError> {
        let locale_config = config.locale_config()?;
        let mut bundles = BundleSet::new();
        let mut issues = Vec::new();

        for locale in locale_config.supported() {
            for namespace in ENGINE_NAMESPACES {
                let path = bundle_path(&config.content_dir, locale, namespace);
                match read_bundle(&path, locale, namespace) {
                    Ok(bundle) => {
                        tracing::debug!(
                            locale = %locale,
                            namespace,
                            path = %path.display(),
                            "Loaded bundle"
                        );
                        bundles.insert(locale.clone(), namespace, bundle);
                    }
                    Err(e) => {
                        tracing::warn!(
                            event = "bundle_skipped",
                            locale = %locale,
                            namespace,
                            path = %path.display(),
                            "Skipping bundle: {}",
                            e
                        );
                        issues.push(CatalogIssue {
                            locale: locale.to_string(),
                            namespace: namespace.to_string(),
                            path: path.display().to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let manifest = read_manifest(&config.pages_file)?;
        let mut catalog = Self::new(config, bundles, manifest)?;
        catalog.issues = issues;

        tracing::info!(
            pages = catalog.pages.len(),
            bundles = catalog.bundles.len(),
            skipped = catalog.issues.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from already-loaded parts.
    pub fn new(
        config: GuidebookConfig,
        bundles: BundleSet,
        manifest: PagesManifest,
    ) -> Result<Self, GuideError> {
        let locale_resolver = LocaleResolver::new(config.locale_config()?);

        let mut registry = PolicyRegistry::builtin();
        for (name, policy) in manifest.policies {
            if registry.register(name.clone(), policy).is_some() {
                tracing::info!(policy = %name, "Manifest policy replaces built-in entry");
            }
        }

        let mut pages = BTreeMap::new();
        for mut spec in manifest.pages {
            if spec.guides_slug.is_none() {
                spec.guides_slug = Some(config.guides_slug.clone());
            }
            let declaration = spec.into_declaration(&registry)?;
            let key = declaration.key().to_string();
            if pages.insert(key.clone(), declaration).is_some() {
                return Err(GuideError::InvalidPage {
                    page: key,
                    reason: "declared more than once".to_string(),
                });
            }
        }

        Ok(Self {
            config,
            locale_resolver,
            bundles,
            registry,
            pages,
            issues: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &GuidebookConfig {
        &self.config
    }

    #[must_use]
    pub fn locale_resolver(&self) -> &LocaleResolver {
        &self.locale_resolver
    }

    #[must_use]
    pub fn bundles(&self) -> &BundleSet {
        &self.bundles
    }

    #[must_use]
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Bundle files skipped during load.
    #[must_use]
    pub fn issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    /// Pages in key order.
    pub fn pages(&self) -> impl Iterator<Item = &PageDeclaration> {
        self.pages.values()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Find a page by content key, then by slug.
    pub fn page(&self, key_or_slug: &str) -> Result<&PageDeclaration, GuideError> {
        self.pages
            .get(key_or_slug)
            .or_else(|| self.pages.values().find(|p| p.slug() == key_or_slug))
            .ok_or_else(|| GuideError::PageNotFound(key_or_slug.to_string()))
    }

    /// Supported locales in sorted order.
    #[must_use]
    pub fn locales(&self) -> Vec<LocaleTag> {
        self.locale_resolver.config().supported().cloned().collect()
    }

    /// An assembler over this catalog's bundles.
    #[must_use]
    pub fn assembler(&self) -> ContextAssembler<'_, BundleSet> {
        ContextAssembler::new(&self.bundles, &self.locale_resolver)
    }
}

// =============================================================================
// FILE HELPERS
// =============================================================================

fn bundle_path(content_dir: &Path, locale: &LocaleTag, namespace: &str) -> PathBuf {
    content_dir
        .join(locale.as_str())
        .join(format!("{}.json", namespace))
}

fn read_bounded(path: &Path, max_size: u64) -> Result<String, GuideError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| GuideError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(GuideError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(GuideError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    std::fs::read_to_string(path)
        .map_err(|e| GuideError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

fn read_bundle(path: &Path, locale: &LocaleTag, namespace: &str) -> Result<Bundle, GuideError> {
    if !path.exists() {
        return Err(GuideError::MissingBundle {
            locale: locale.to_string(),
            namespace: namespace.to_string(),
        });
    }
    let text = read_bounded(path, MAX_BUNDLE_FILE_SIZE)?;
    Bundle::from_json_str(&text)
}

fn read_manifest(path: &Path) -> Result<PagesManifest, GuideError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Pages manifest not found, catalog has no pages");
        return Ok(PagesManifest::default());
    }
    let text = read_bounded(path, MAX_MANIFEST_FILE_SIZE)?;
    PagesManifest::from_toml_str(&text)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use guidebook_core::LocaleBundleProvider;
    use guidebook_core::primitives::GUIDES_NAMESPACE;

    fn write(dir: &Path, relative: &str, text: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, text).expect("write");
    }

    fn config_for(dir: &Path) -> GuidebookConfig {
        GuidebookConfig {
            supported_locales: vec!["en".to_string(), "it".to_string()],
            content_dir: dir.join("locales"),
            pages_file: dir.join("pages.toml"),
            ..GuidebookConfig::default()
        }
    }

    #[test]
    fn test_load_skips_missing_and_malformed_bundles() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "locales/en/guides.json", r#"{"content":{}}"#);
        write(dir.path(), "locales/it/guides.json", "{ not json");
        write(
            dir.path(),
            "pages.toml",
            r#"
            [[page]]
            key = "positanoBeaches"
            "#,
        );

        let catalog = Catalog::load(config_for(dir.path())).expect("load");
        assert_eq!(catalog.bundles().len(), 1);
        assert!(
            catalog
                .bundles()
                .get(&LocaleTag::reference(), GUIDES_NAMESPACE)
                .is_some()
        );
        // it/guides malformed, en+it guidesFallback missing
        assert_eq!(catalog.issues().len(), 3);
        let missing = catalog
            .issues()
            .iter()
            .filter(|issue| issue.namespace == "guidesFallback")
            .count();
        assert_eq!(missing, 2);
        assert!(
            catalog
                .issues()
                .iter()
                .any(|issue| issue.locale == "it" && issue.namespace == GUIDES_NAMESPACE)
        );
        assert_eq!(catalog.page_count(), 1);
    }

    #[test]
    fn test_page_lookup_by_key_and_slug() {
        let manifest = PagesManifest::from_toml_str(
            r#"
            [[page]]
            key = "positanoBeaches"
            "#,
        )
        .expect("manifest");
        let catalog =
            Catalog::new(GuidebookConfig::default(), BundleSet::new(), manifest).expect("catalog");

        assert!(catalog.page("positanoBeaches").is_ok());
        assert_eq!(
            catalog.page("positano-beaches").map(|p| p.key().to_string()).ok(),
            Some("positanoBeaches".to_string())
        );
        assert!(matches!(
            catalog.page("capri"),
            Err(GuideError::PageNotFound(_))
        ));
    }

    #[test]
    fn test_manifest_policies_and_site_guides_slug() {
        let manifest = PagesManifest::from_toml_str(
            r#"
            [policies.strictSite]
            stop_at_active_locale = true

            [[page]]
            key = "capriDayTrip"
            policies = ["strictSite"]

            [[page]]
            key = "amalfiFerries"
            guides_slug = "travel"
            "#,
        )
        .expect("manifest");
        let config = GuidebookConfig {
            guides_slug: "guide".to_string(),
            ..GuidebookConfig::default()
        };
        let catalog = Catalog::new(config, BundleSet::new(), manifest).expect("catalog");

        let capri = catalog.page("capriDayTrip").expect("page");
        assert!(capri.policy().stop_at_active_locale);
        assert_eq!(capri.guides_slug(), "guide");
        assert_eq!(
            catalog.page("amalfiFerries").expect("page").guides_slug(),
            "travel"
        );
    }

    #[test]
    fn test_duplicate_and_invalid_pages_fail() {
        let duplicate = PagesManifest::from_toml_str(
            r#"
            [[page]]
            key = "capri"
            [[page]]
            key = "capri"
            "#,
        )
        .expect("manifest");
        assert!(matches!(
            Catalog::new(GuidebookConfig::default(), BundleSet::new(), duplicate),
            Err(GuideError::InvalidPage { .. })
        ));

        let unknown = PagesManifest::from_toml_str(
            r#"
            [[page]]
            key = "capri"
            policies = ["noSuchPolicy"]
            "#,
        )
        .expect("manifest");
        assert!(matches!(
            Catalog::new(GuidebookConfig::default(), BundleSet::new(), unknown),
            Err(GuideError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = Catalog::load(config_for(dir.path())).expect("load");
        assert_eq!(catalog.page_count(), 0);
        assert_eq!(catalog.issues().len(), 4);
    }
}
