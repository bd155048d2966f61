//! Error types for localisation.

use std::path::PathBuf;
use thiserror::Error;

/// Localisation errors.
#[derive(Debug, Error)]
pub enum I18nError {
    /// A resource document is malformed.
    #[error("failed to parse resource bundle '{source_id}': {message}")]
    Parse { source_id: String, message: String },

    /// No resource file resolves for the requested locale.
    #[error("locale '{locale}' not found, available locales: [{}]", available.join(", "))]
    LocaleNotFound {
        locale: String,
        available: Vec<String>,
    },

    /// The key is absent across the whole fallback chain.
    #[error("translation key '{key}' not found for locale '{locale}'")]
    TranslationKey { key: String, locale: String },

    /// A pattern references missing or mistyped arguments.
    #[error("cannot format '{pattern}': {message}")]
    Format { pattern: String, message: String },

    /// An operation would break a locale-set invariant.
    #[error("invariant violated: {message}")]
    Invariant { message: String },

    /// The resource directory could not be read.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file watcher could not be set up.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// The localisation configuration is invalid.
    #[error(transparent)]
    Config(#[from] lokal_common_config::ConfigError),
}

impl I18nError {
    pub(crate) fn parse(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn format(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for localisation operations.
pub type Result<T> = std::result::Result<T, I18nError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = I18nError::parse("app_en.arb", "not an object");
        assert_eq!(
            error.to_string(),
            "failed to parse resource bundle 'app_en.arb': not an object"
        );

        let error = I18nError::LocaleNotFound {
            locale: "de".to_string(),
            available: vec!["en".to_string(), "es".to_string()],
        };
        assert_eq!(error.to_string(), "locale 'de' not found, available locales: [en, es]");

        let error = I18nError::TranslationKey {
            key: "title".to_string(),
            locale: "en".to_string(),
        };
        assert_eq!(error.to_string(), "translation key 'title' not found for locale 'en'");

        let error = I18nError::format("Hi {name}", "missing value for placeholder 'name'");
        assert_eq!(
            error.to_string(),
            "cannot format 'Hi {name}': missing value for placeholder 'name'"
        );
    }
}
