//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default resource directory, relative to the working directory.
pub const DEFAULT_ARB_DIR: &str = "l10n";
/// Default resource file extension.
pub const DEFAULT_FILE_EXTENSION: &str = "arb";
/// Default fallback locale.
pub const DEFAULT_FALLBACK_LOCALE: &str = "en";
/// Default number of compiled patterns kept per formatter.
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 256;

/// Localisation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// Directory holding the resource bundles.
    pub arb_dir: PathBuf,
    /// Extension (without dot) of resource bundle files.
    pub file_extension: String,
    /// Locale to start in. Detected from the system when `None` and
    /// `auto_detect_locale` is set.
    pub default_locale: Option<String>,
    /// Locale every lookup ends at.
    pub fallback_locale: String,
    /// Explicit locale list. Empty means discover from `arb_dir`.
    pub supported_locales: Vec<String>,
    /// Watch `arb_dir` and reload bundles on change.
    pub hot_reload: bool,
    /// Fall back to the system locale when no default is configured.
    pub auto_detect_locale: bool,
    /// Compiled pattern cache bound.
    pub pattern_cache_capacity: usize,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            arb_dir: PathBuf::from(DEFAULT_ARB_DIR),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            default_locale: None,
            fallback_locale: DEFAULT_FALLBACK_LOCALE.to_string(),
            supported_locales: Vec::new(),
            hot_reload: false,
            auto_detect_locale: true,
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
        }
    }
}

impl LocalizationConfig {
    /// Defaults pointed at `arb_dir`.
    pub fn for_dir(arb_dir: impl Into<PathBuf>) -> Self {
        Self {
            arb_dir: arb_dir.into(),
            ..Self::default()
        }
    }

    /// Set the starting locale.
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    /// Set the fallback locale.
    pub fn with_fallback_locale(mut self, locale: impl Into<String>) -> Self {
        self.fallback_locale = locale.into();
        self
    }

    /// Pin the supported locale list instead of discovering it.
    pub fn with_supported_locales<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_locales = locales.into_iter().map(Into::into).collect();
        self
    }

    /// Toggle hot reload.
    pub fn with_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    /// Toggle system locale detection.
    pub fn with_auto_detect(mut self, enabled: bool) -> Self {
        self.auto_detect_locale = enabled;
        self
    }

    /// Set the compiled pattern cache bound.
    pub fn with_pattern_cache_capacity(mut self, capacity: usize) -> Self {
        self.pattern_cache_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LocalizationConfig::default();
        assert_eq!(config.arb_dir, PathBuf::from("l10n"));
        assert_eq!(config.file_extension, "arb");
        assert_eq!(config.default_locale, None);
        assert_eq!(config.fallback_locale, "en");
        assert!(config.supported_locales.is_empty());
        assert!(!config.hot_reload);
        assert!(config.auto_detect_locale);
        assert_eq!(config.pattern_cache_capacity, 256);
    }

    #[test]
    fn test_builder_methods() {
        let config = LocalizationConfig::for_dir("/srv/l10n")
            .with_default_locale("es")
            .with_fallback_locale("en-GB")
            .with_supported_locales(["en-GB", "es"])
            .with_hot_reload(true)
            .with_auto_detect(false)
            .with_pattern_cache_capacity(16);

        assert_eq!(config.arb_dir, PathBuf::from("/srv/l10n"));
        assert_eq!(config.default_locale.as_deref(), Some("es"));
        assert_eq!(config.fallback_locale, "en-GB");
        assert_eq!(config.supported_locales, vec!["en-GB", "es"]);
        assert!(config.hot_reload);
        assert!(!config.auto_detect_locale);
        assert_eq!(config.pattern_cache_capacity, 16);
    }

    #[test]
    fn test_partial_json_merges_with_defaults() {
        let json = r#"{ "arb_dir": "locales", "hot_reload": true }"#;
        let config: LocalizationConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.arb_dir, PathBuf::from("locales"));
        assert!(config.hot_reload);
        assert_eq!(config.fallback_locale, "en");
        assert_eq!(config.pattern_cache_capacity, 256);
    }

    #[test]
    fn test_serializes_all_fields() {
        let json = serde_json::to_value(LocalizationConfig::default()).unwrap();
        for field in [
            "arb_dir",
            "file_extension",
            "default_locale",
            "fallback_locale",
            "supported_locales",
            "hot_reload",
            "auto_detect_locale",
            "pattern_cache_capacity",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
