//! Environment variable handling.

use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    pub const LOKAL_ARB_DIR: &str = "LOKAL_ARB_DIR";
    pub const LOKAL_FILE_EXTENSION: &str = "LOKAL_FILE_EXTENSION";
    pub const LOKAL_DEFAULT_LOCALE: &str = "LOKAL_DEFAULT_LOCALE";
    pub const LOKAL_FALLBACK_LOCALE: &str = "LOKAL_FALLBACK_LOCALE";
    pub const LOKAL_SUPPORTED_LOCALES: &str = "LOKAL_SUPPORTED_LOCALES";
    pub const LOKAL_HOT_RELOAD: &str = "LOKAL_HOT_RELOAD";
    pub const LOKAL_AUTO_DETECT_LOCALE: &str = "LOKAL_AUTO_DETECT_LOCALE";
    pub const LOKAL_PATTERN_CACHE_CAPACITY: &str = "LOKAL_PATTERN_CACHE_CAPACITY";

    /// Every variable the config overlay reads.
    pub const ALL: [&str; 8] = [
        LOKAL_ARB_DIR,
        LOKAL_FILE_EXTENSION,
        LOKAL_DEFAULT_LOCALE,
        LOKAL_FALLBACK_LOCALE,
        LOKAL_SUPPORTED_LOCALES,
        LOKAL_HOT_RELOAD,
        LOKAL_AUTO_DETECT_LOCALE,
        LOKAL_PATTERN_CACHE_CAPACITY,
    ];
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from .env files.
    ///
    /// Missing files are fine; `.env.local` overrides `.env`.
    pub fn init() -> Result<Self, EnvError> {
        for file in [".env", ".env.local"] {
            match dotenvy::from_filename(file) {
                Ok(_) => {}
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self { _guard: () })
    }

    /// Get an optional string variable. Blank values count as unset.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get a boolean variable.
    pub fn get_bool(var: &str) -> Option<bool> {
        Self::get(var).map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match Self::get(var) {
            Some(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: "expected integer".to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Get a comma separated list, trimming and dropping empty items.
    pub fn get_list(var: &str) -> Option<Vec<String>> {
        Self::get(var).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_parsing() {
        env::set_var("LOKAL_TEST_BOOL", "true");
        assert_eq!(Environment::get_bool("LOKAL_TEST_BOOL"), Some(true));
        env::set_var("LOKAL_TEST_BOOL", "1");
        assert_eq!(Environment::get_bool("LOKAL_TEST_BOOL"), Some(true));
        env::set_var("LOKAL_TEST_BOOL", "false");
        assert_eq!(Environment::get_bool("LOKAL_TEST_BOOL"), Some(false));
        env::remove_var("LOKAL_TEST_BOOL");
        assert_eq!(Environment::get_bool("LOKAL_TEST_BOOL"), None);
    }

    #[test]
    fn test_integer_parsing() {
        env::set_var("LOKAL_TEST_INT", "42");
        let val: Result<Option<usize>, _> = Environment::get_int("LOKAL_TEST_INT");
        assert_eq!(val.unwrap(), Some(42));

        env::set_var("LOKAL_TEST_INT", "invalid");
        let val: Result<Option<usize>, _> = Environment::get_int("LOKAL_TEST_INT");
        assert!(val.is_err());

        env::remove_var("LOKAL_TEST_INT");
        let val: Result<Option<usize>, _> = Environment::get_int("LOKAL_TEST_INT");
        assert_eq!(val.unwrap(), None);
    }

    #[test]
    fn test_list_parsing() {
        env::set_var("LOKAL_TEST_LIST", " en, es-ES ,, fr ");
        assert_eq!(
            Environment::get_list("LOKAL_TEST_LIST"),
            Some(vec!["en".to_string(), "es-ES".to_string(), "fr".to_string()])
        );
        env::remove_var("LOKAL_TEST_LIST");
        assert_eq!(Environment::get_list("LOKAL_TEST_LIST"), None);
    }

    #[test]
    fn test_blank_counts_as_unset() {
        env::set_var("LOKAL_TEST_BLANK", "   ");
        assert_eq!(Environment::get("LOKAL_TEST_BLANK"), None);
        env::remove_var("LOKAL_TEST_BLANK");
    }
}
