//! Configuration loading and validation.

use crate::env::{vars, EnvError, Environment};
use crate::types::LocalizationConfig;
use std::path::PathBuf;
use thiserror::Error;

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

impl LocalizationConfig {
    /// Defaults overlaid with `LOKAL_*` environment variables.
    ///
    /// `.env` files are loaded first, so they participate in the overlay.
    pub fn from_env() -> Result<Self, ConfigError> {
        Environment::init()?;
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config block handed over by the host.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::ParseError {
            line: e.line(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay any `LOKAL_*` variables present in the environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(dir) = Environment::get(vars::LOKAL_ARB_DIR) {
            self.arb_dir = PathBuf::from(dir);
        }
        if let Some(ext) = Environment::get(vars::LOKAL_FILE_EXTENSION) {
            self.file_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(locale) = Environment::get(vars::LOKAL_DEFAULT_LOCALE) {
            self.default_locale = Some(locale);
        }
        if let Some(locale) = Environment::get(vars::LOKAL_FALLBACK_LOCALE) {
            self.fallback_locale = locale;
        }
        if let Some(locales) = Environment::get_list(vars::LOKAL_SUPPORTED_LOCALES) {
            self.supported_locales = locales;
        }
        if let Some(enabled) = Environment::get_bool(vars::LOKAL_HOT_RELOAD) {
            self.hot_reload = enabled;
        }
        if let Some(enabled) = Environment::get_bool(vars::LOKAL_AUTO_DETECT_LOCALE) {
            self.auto_detect_locale = enabled;
        }
        if let Some(capacity) = Environment::get_int(vars::LOKAL_PATTERN_CACHE_CAPACITY)? {
            self.pattern_cache_capacity = capacity;
        }
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arb_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "arb_dir must not be empty".to_string(),
            });
        }

        if self.file_extension.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "file_extension must not be empty".to_string(),
            });
        }

        if self.fallback_locale.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "fallback_locale must not be empty".to_string(),
            });
        }

        if self.pattern_cache_capacity == 0 {
            return Err(ConfigError::ValidationError {
                message: "pattern_cache_capacity must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
