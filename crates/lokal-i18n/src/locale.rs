//! Locale tags, supported-locale sets and fallback resolution.

use crate::error::{I18nError, Result};
use std::borrow::Borrow;
use std::fmt;

const SEPARATOR: char = '-';
const DEFAULT_FALLBACK: &str = "en";

/// A normalized locale identifier such as `en` or `en-US`.
///
/// The language subtag is lowercase, the second subtag uppercase, and
/// subtags are joined with `-`. `_` is accepted as a separator on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleTag(String);

impl LocaleTag {
    /// Normalize a raw tag. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let mut subtags = raw
            .split(['-', '_'])
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let language = subtags.next()?.to_lowercase();
        let mut normalized = language;
        if let Some(region) = subtags.next() {
            normalized.push(SEPARATOR);
            normalized.push_str(&region.to_uppercase());
        }
        for rest in subtags {
            normalized.push(SEPARATOR);
            normalized.push_str(rest);
        }
        Some(Self(normalized))
    }

    /// Normalized form, e.g. `en-US`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Language subtag.
    pub fn language(&self) -> &str {
        self.0.split(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Region subtag, if any.
    pub fn region(&self) -> Option<&str> {
        self.0.split(SEPARATOR).nth(1)
    }

    /// The language-only form of this tag.
    pub fn language_tag(&self) -> LocaleTag {
        Self(self.language().to_string())
    }

    /// Whether a region subtag is present.
    pub fn has_region(&self) -> bool {
        self.region().is_some()
    }

    /// The tag with `_` as separator, as used in resource file names.
    pub fn to_underscored(&self) -> String {
        self.0.replace(SEPARATOR, "_")
    }
}

impl fmt::Display for LocaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocaleTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LocaleTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Split a tag into language and optional region.
pub fn parse_locale(tag: &str) -> (String, Option<String>) {
    match LocaleTag::parse(tag) {
        Some(tag) => (
            tag.language().to_string(),
            tag.region().map(String::from),
        ),
        None => (String::new(), None),
    }
}

/// Ordered set of supported locales with a fixed fallback.
#[derive(Debug, Clone)]
pub struct LocaleManager {
    supported: Vec<LocaleTag>,
    fallback: LocaleTag,
}

impl LocaleManager {
    /// Build a manager. The fallback is always part of the supported set.
    pub fn new<I, S>(supported: I, fallback: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fallback = LocaleTag::parse(fallback)
            .unwrap_or_else(|| LocaleTag(DEFAULT_FALLBACK.to_string()));

        let mut manager = Self {
            supported: Vec::new(),
            fallback: fallback.clone(),
        };
        for tag in supported {
            manager.add_locale(tag.as_ref());
        }
        if !manager.supported.contains(&fallback) {
            manager.supported.push(fallback);
        }
        manager
    }

    /// Supported locales in insertion order.
    pub fn supported_locales(&self) -> &[LocaleTag] {
        &self.supported
    }

    /// The locale every chain ends at.
    pub fn fallback_locale(&self) -> &LocaleTag {
        &self.fallback
    }

    /// Normalize a tag; blank input yields the fallback's language.
    pub fn normalize(&self, tag: &str) -> LocaleTag {
        LocaleTag::parse(tag).unwrap_or_else(|| self.fallback.language_tag())
    }

    /// Whether `tag`, once normalized, is supported.
    pub fn is_supported(&self, tag: &str) -> bool {
        let tag = self.normalize(tag);
        self.supported.contains(&tag)
    }

    /// Map a requested tag onto the supported set.
    pub fn resolve(&self, tag: &str) -> LocaleTag {
        let tag = self.normalize(tag);
        if self.supported.contains(&tag) {
            return tag;
        }

        let language = tag.language_tag();
        if self.supported.contains(&language) {
            return language;
        }

        self.supported
            .iter()
            .find(|candidate| candidate.language() == tag.language())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Locales to try for `tag`, most specific first, ending at the
    /// fallback. Never contains duplicates.
    pub fn fallback_chain(&self, tag: &str) -> Vec<LocaleTag> {
        let tag = self.normalize(tag);
        let mut chain: Vec<LocaleTag> = Vec::new();
        let mut push = |candidate: &LocaleTag| {
            if !chain.contains(candidate) {
                chain.push(candidate.clone());
            }
        };

        if self.supported.contains(&tag) {
            push(&tag);
        }

        let language = tag.language_tag();
        if self.supported.contains(&language) {
            push(&language);
        }

        for candidate in &self.supported {
            if candidate.language() == tag.language() {
                push(candidate);
            }
        }

        // The fallback closes the chain even if it also appeared earlier.
        chain.retain(|candidate| *candidate != self.fallback);
        chain.push(self.fallback.clone());
        chain
    }

    /// Best match for `tag` among an arbitrary candidate list.
    pub fn closest_match<S: AsRef<str>>(&self, tag: &str, available: &[S]) -> LocaleTag {
        let tag = self.normalize(tag);
        let available: Vec<LocaleTag> = available
            .iter()
            .filter_map(|candidate| LocaleTag::parse(candidate.as_ref()))
            .collect();

        if available.contains(&tag) {
            return tag;
        }

        if let Some(region) = tag.region() {
            if let Some(found) = available
                .iter()
                .find(|c| c.language() == tag.language() && c.region() == Some(region))
            {
                return found.clone();
            }
        }

        let language = tag.language_tag();
        if available.contains(&language) {
            return language;
        }

        if let Some(found) = available.iter().find(|c| c.language() == tag.language()) {
            return found.clone();
        }

        if available.contains(&self.fallback) {
            return self.fallback.clone();
        }

        available
            .into_iter()
            .next()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Add a locale; returns its normalized form. Adding twice is a no-op.
    pub fn add_locale(&mut self, tag: &str) -> LocaleTag {
        let tag = self.normalize(tag);
        if !self.supported.contains(&tag) {
            self.supported.push(tag.clone());
        }
        tag
    }

    /// Remove a locale. Returns whether it was present.
    pub fn remove_locale(&mut self, tag: &str) -> Result<bool> {
        let tag = self.normalize(tag);
        if tag == self.fallback {
            return Err(I18nError::Invariant {
                message: format!("cannot remove fallback locale '{tag}'"),
            });
        }
        let before = self.supported.len();
        self.supported.retain(|candidate| *candidate != tag);
        Ok(self.supported.len() != before)
    }
}
