//! ARB resource bundle parsing.
//!
//! A bundle is a JSON object. Keys starting with `@@` carry bundle-wide
//! metadata (`@@locale`, `@@last_modified`), keys starting with `@` carry
//! metadata for the entry named by the rest of the key, and every other key
//! is a translation whose value must be a string.

use crate::error::{I18nError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

const BUNDLE_MARKER: &str = "@@";
const ENTRY_MARKER: char = '@';
const LOCALE_KEY: &str = "@@locale";
const LAST_MODIFIED_KEY: &str = "@@last_modified";

/// Declared placeholder in entry metadata.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PlaceholderSpec {
    /// Type hint such as `String`, `int` or `num`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub example: Option<Value>,
}

/// Kind tag of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EntryKind {
    #[default]
    Text,
    Plural,
    Select,
    Other(String),
}

impl EntryKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "plural" => Self::Plural,
            "select" => Self::Select,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Typed view used to validate the shape of an `@key` object.
#[derive(Deserialize)]
struct MetadataShape {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    placeholders: BTreeMap<String, PlaceholderSpec>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Metadata attached to one entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryMetadata {
    description: Option<String>,
    placeholders: BTreeMap<String, PlaceholderSpec>,
    kind: EntryKind,
    raw: Map<String, Value>,
}

impl EntryMetadata {
    fn from_object(key: &str, raw: Map<String, Value>, source_id: &str) -> Result<Self> {
        let shape: MetadataShape = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| I18nError::parse(source_id, format!("invalid metadata for '{key}': {e}")))?;

        Ok(Self {
            description: shape.description,
            placeholders: shape.placeholders,
            kind: shape.kind.as_deref().map(EntryKind::from_tag).unwrap_or_default(),
            raw,
        })
    }

    /// Translator-facing description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared placeholders by name.
    pub fn placeholders(&self) -> &BTreeMap<String, PlaceholderSpec> {
        &self.placeholders
    }

    /// Declared entry kind; `Text` when absent.
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// The metadata object exactly as it appeared in the document.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

/// One translation entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    key: String,
    value: String,
    metadata: Option<EntryMetadata>,
}

static EMPTY_PLACEHOLDERS: BTreeMap<String, PlaceholderSpec> = BTreeMap::new();

impl ResourceEntry {
    /// Entry without metadata.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            metadata: None,
        }
    }

    /// The translation key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw pattern string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Metadata from the matching `@key` object, if any.
    pub fn metadata(&self) -> Option<&EntryMetadata> {
        self.metadata.as_ref()
    }

    /// Shorthand for the metadata description.
    pub fn description(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(EntryMetadata::description)
    }

    /// Declared placeholders; empty without metadata.
    pub fn placeholders(&self) -> &BTreeMap<String, PlaceholderSpec> {
        self.metadata
            .as_ref()
            .map_or(&EMPTY_PLACEHOLDERS, EntryMetadata::placeholders)
    }

    /// Entry kind; `Text` without metadata.
    pub fn kind(&self) -> EntryKind {
        self.metadata
            .as_ref()
            .map(|m| m.kind.clone())
            .unwrap_or_default()
    }
}

/// Non-fatal findings from [`ResourceBundle::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    NoEntries,
    MissingLocale,
    EmptyValue { key: String },
    UndeclaredPlaceholders { key: String, names: Vec<String> },
    UnusedPlaceholders { key: String, names: Vec<String> },
    OrphanMetadata { key: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEntries => f.write_str("no translation entries found"),
            Self::MissingLocale => f.write_str("missing @@locale field"),
            Self::EmptyValue { key } => write!(f, "empty translation value for key '{key}'"),
            Self::UndeclaredPlaceholders { key, names } => write!(
                f,
                "key '{key}': placeholders [{}] used in value but not defined in metadata",
                names.join(", ")
            ),
            Self::UnusedPlaceholders { key, names } => write!(
                f,
                "key '{key}': placeholders [{}] defined in metadata but not used in value",
                names.join(", ")
            ),
            Self::OrphanMetadata { key } => {
                write!(f, "metadata '@{key}' has no matching translation entry")
            }
        }
    }
}

/// A parsed resource document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBundle {
    source: String,
    locale: Option<String>,
    last_modified: Option<String>,
    globals: Map<String, Value>,
    entries: HashMap<String, ResourceEntry>,
    /// `@key` metadata with no matching entry, kept so it survives a rewrite.
    orphan_metadata: BTreeMap<String, EntryMetadata>,
}

impl ResourceBundle {
    /// Read and parse a bundle from disk.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_id = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| I18nError::parse(&source_id, format!("error reading file: {e}")))?;
        Self::parse_str(&text, &source_id)
    }

    /// Parse a bundle from JSON text.
    pub fn parse_str(text: &str, source_id: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| I18nError::parse(source_id, format!("invalid JSON: {e}")))?;
        Self::parse_value(value, source_id)
    }

    /// Parse an already-decoded JSON document.
    pub fn parse_value(document: Value, source_id: &str) -> Result<Self> {
        let Value::Object(object) = document else {
            return Err(I18nError::parse(source_id, "resource bundle must be a JSON object"));
        };

        let locale = match object.get(LOCALE_KEY) {
            None => None,
            Some(Value::String(tag)) => Some(tag.clone()),
            Some(_) => return Err(I18nError::parse(source_id, "@@locale must be a string")),
        };
        let last_modified = object
            .get(LAST_MODIFIED_KEY)
            .and_then(Value::as_str)
            .map(String::from);

        // Document order is not guaranteed, so collect metadata before entries.
        let mut globals = Map::new();
        let mut metadata = HashMap::new();
        for (key, value) in &object {
            if key.starts_with(BUNDLE_MARKER) {
                globals.insert(key.clone(), value.clone());
            } else if let Some(target) = key.strip_prefix(ENTRY_MARKER) {
                let Value::Object(raw) = value else {
                    return Err(I18nError::parse(
                        source_id,
                        format!(
                            "metadata for '{target}' must be an object, got {}",
                            json_type_name(value)
                        ),
                    ));
                };
                let parsed = EntryMetadata::from_object(target, raw.clone(), source_id)?;
                metadata.insert(target.to_string(), parsed);
            }
        }

        let mut entries = HashMap::new();
        for (key, value) in object {
            if key.starts_with(ENTRY_MARKER) {
                continue;
            }
            let Value::String(text) = value else {
                return Err(I18nError::parse(
                    source_id,
                    format!(
                        "translation value for '{key}' must be a string, got {}",
                        json_type_name(&value)
                    ),
                ));
            };
            let entry_metadata = metadata.remove(&key);
            entries.insert(
                key.clone(),
                ResourceEntry {
                    key,
                    value: text,
                    metadata: entry_metadata,
                },
            );
        }

        let orphan_metadata: BTreeMap<String, EntryMetadata> = metadata.into_iter().collect();

        Ok(Self {
            source: source_id.to_string(),
            locale,
            last_modified,
            globals,
            entries,
            orphan_metadata,
        })
    }

    /// Where the bundle came from (file path or caller-supplied id).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Bundle-level locale tag, as written.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// The `@@last_modified` global, if present.
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// All entries by key.
    pub fn entries(&self) -> &HashMap<String, ResourceEntry> {
        &self.entries
    }

    /// Entry for `key`, without metadata-only keys.
    pub fn get(&self, key: &str) -> Option<&ResourceEntry> {
        self.entries.get(key)
    }

    /// Entry keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of translation entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle has no translation entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-serialize to a JSON document equivalent to the parsed one.
    pub fn to_json(&self) -> Value {
        let mut object = self.globals.clone();
        for entry in self.entries.values() {
            object.insert(entry.key.clone(), Value::String(entry.value.clone()));
            if let Some(metadata) = &entry.metadata {
                object.insert(format!("@{}", entry.key), Value::Object(metadata.raw.clone()));
            }
        }
        for (key, metadata) in &self.orphan_metadata {
            object.insert(format!("@{key}"), Value::Object(metadata.raw.clone()));
        }
        Value::Object(object)
    }

    /// Report non-fatal problems. Never fails.
    pub fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if self.entries.is_empty() {
            warnings.push(ValidationWarning::NoEntries);
        }
        if self.locale.is_none() {
            warnings.push(ValidationWarning::MissingLocale);
        }

        for key in self.keys() {
            let entry = &self.entries[key];
            if entry.value.trim().is_empty() {
                warnings.push(ValidationWarning::EmptyValue { key: key.to_string() });
            }

            let used = placeholder_names(&entry.value);
            let declared: BTreeSet<String> = entry.placeholders().keys().cloned().collect();

            let undeclared: Vec<String> = used.difference(&declared).cloned().collect();
            if !undeclared.is_empty() {
                warnings.push(ValidationWarning::UndeclaredPlaceholders {
                    key: key.to_string(),
                    names: undeclared,
                });
            }

            let unused: Vec<String> = declared.difference(&used).cloned().collect();
            if !unused.is_empty() {
                warnings.push(ValidationWarning::UnusedPlaceholders {
                    key: key.to_string(),
                    names: unused,
                });
            }
        }

        for key in self.orphan_metadata.keys() {
            warnings.push(ValidationWarning::OrphanMetadata { key: key.clone() });
        }

        warnings
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Names of the top-level constructs in a pattern.
///
/// Only braces at depth 1 count; plural and select bodies are deeper and
/// contribute nothing beyond their control variable.
pub fn placeholder_names(pattern: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in pattern.chars() {
        match c {
            '{' => {
                depth += 1;
                if depth == 1 {
                    current.clear();
                } else if depth == 2 {
                    current.push(c);
                }
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let name = current
                        .split([',', '{'])
                        .next()
                        .unwrap_or_default()
                        .trim();
                    if !name.is_empty() {
                        names.insert(name.to_string());
                    }
                }
            }
            _ if depth == 1 => current.push(c),
            _ => {}
        }
    }

    names
}

/// Locale fragment of a `<prefix>_<locale>.<ext>` file name.
///
/// Trailing `_`-separated segments that look like locale parts (at most
/// three characters, or fully uppercase) are collected; the first segment is
/// always the prefix. A bare `<locale>.<ext>` name with a 2-3 letter stem is
/// accepted too.
pub fn locale_from_filename(file_name: &str, extension: &str) -> Option<String> {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let stem = file_name.strip_suffix(&suffix)?;
    let parts: Vec<&str> = stem.split('_').collect();

    if parts.len() < 2 {
        let looks_like_language =
            (2..=3).contains(&stem.len()) && stem.chars().all(|c| c.is_ascii_alphabetic());
        return looks_like_language.then(|| stem.to_string());
    }

    let mut locale_parts = Vec::new();
    for part in parts[1..].iter().rev() {
        let looks_like_locale = !part.is_empty()
            && (part.len() <= 3 || part.chars().all(|c| !c.is_lowercase()));
        if !looks_like_locale {
            break;
        }
        locale_parts.push(*part);
    }

    if locale_parts.is_empty() {
        return None;
    }
    locale_parts.reverse();
    Some(locale_parts.join("_"))
}
