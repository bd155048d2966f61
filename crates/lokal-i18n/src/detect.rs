//! System locale detection.

use crate::locale::LocaleTag;
use std::env;

/// Explicit override read before the POSIX variables.
pub const LOKAL_LOCALE: &str = "LOKAL_LOCALE";

/// Variables consulted, highest priority first.
pub const LOCALE_VARS: [&str; 4] = [LOKAL_LOCALE, "LC_ALL", "LC_MESSAGES", "LANG"];

/// Detect the system locale.
pub fn detect_system_locale() -> Option<LocaleTag> {
    // Priority: explicit env var > LC_ALL > LC_MESSAGES > LANG > system
    for var in LOCALE_VARS {
        if let Some(locale) = from_env(var) {
            return Some(locale);
        }
    }

    #[cfg(target_os = "macos")]
    if let Some(locale) = detect_macos() {
        return Some(locale);
    }

    None
}

/// Parse a POSIX locale value such as `de_DE.UTF-8@euro`.
pub fn parse_posix_locale(value: &str) -> Option<LocaleTag> {
    let value = value.trim();
    let value = value.split('@').next().unwrap_or(value);
    let value = value.split('.').next().unwrap_or(value);

    if value.is_empty() || value == "C" || value == "POSIX" {
        return None;
    }
    LocaleTag::parse(value)
}

fn from_env(var: &str) -> Option<LocaleTag> {
    env::var(var).ok().and_then(|v| parse_posix_locale(&v))
}

/// Detect locale on macOS using defaults.
#[cfg(target_os = "macos")]
fn detect_macos() -> Option<LocaleTag> {
    use std::process::Command;

    let output = Command::new("defaults")
        .args(["read", "-g", "AppleLocale"])
        .output()
        .ok()?;

    if output.status.success() {
        let locale = String::from_utf8_lossy(&output.stdout);
        return parse_posix_locale(&locale);
    }

    None
}
