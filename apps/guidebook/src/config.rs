//! # Configuration
//!
//! `guidebook.toml` plus environment overrides.
//!
//! ## File
//!
//! ```toml
//! reference_locale = "en"
//! supported_locales = ["en", "it", "de", "fr", "es"]
//! content_dir = "locales"          # {content_dir}/{locale}/{namespace}.json
//! pages_file = "pages.toml"
//! guides_slug = "guides"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! Every key is optional. A missing file means defaults; a file that does
//! not parse is an error. Relative paths are taken relative to the file.
//!
//! ## Environment Variables
//!
//! - `GUIDEBOOK_CONTENT_DIR`: overrides `content_dir`
//! - `GUIDEBOOK_PAGES_FILE`: overrides `pages_file`
//! - `GUIDEBOOK_REFERENCE_LOCALE`: overrides `reference_locale`

use guidebook_core::primitives::{DEFAULT_GUIDES_SLUG, DEFAULT_SUPPORTED_LOCALES, REFERENCE_LOCALE};
use guidebook_core::{GuideError, LocaleConfig, LocaleTag};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "guidebook.toml";

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// CONFIG TYPES
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidebookConfig {
    pub reference_locale: String,
    pub supported_locales: Vec<String>,
    pub content_dir: PathBuf,
    pub pages_file: PathBuf,
    /// Site-wide guides path segment; pages may still set their own.
    pub guides_slug: String,
    pub server: ServerConfig,
}

impl Default for GuidebookConfig {
    fn default() -> Self {
        Self {
            reference_locale: REFERENCE_LOCALE.to_string(),
            supported_locales: DEFAULT_SUPPORTED_LOCALES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            content_dir: PathBuf::from("locales"),
            pages_file: PathBuf::from("pages.toml"),
            guides_slug: DEFAULT_GUIDES_SLUG.to_string(),
            server: ServerConfig::default(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl GuidebookConfig {
    /// Load from a TOML file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, GuideError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from a TOML file only. A missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self, GuideError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| GuideError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(GuideError::ConfigError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| GuideError::IoError(format!("Cannot read config: {}", e)))?;
        let mut config = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            config.content_dir = relative_to(base, &config.content_dir);
            config.pages_file = relative_to(base, &config.pages_file);
        }
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, GuideError> {
        toml::from_str(text).map_err(|e| GuideError::ConfigError(e.to_string()))
    }

    /// Apply `GUIDEBOOK_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup("GUIDEBOOK_CONTENT_DIR") {
            self.content_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("GUIDEBOOK_PAGES_FILE") {
            self.pages_file = PathBuf::from(file);
        }
        if let Some(locale) = lookup("GUIDEBOOK_REFERENCE_LOCALE") {
            self.reference_locale = locale;
        }
    }

    /// Validated locale configuration.
    pub fn locale_config(&self) -> Result<LocaleConfig, GuideError> {
        let reference = LocaleTag::parse(&self.reference_locale)?;
        let supported = self
            .supported_locales
            .iter()
            .map(|s| LocaleTag::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LocaleConfig::new(reference, supported))
    }

    /// `host:port` for the HTTP listener.
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// =============================================================================
// TESTS
// =============================================================================
