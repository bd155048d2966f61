//! Placeholder argument values.

use crate::arb::ResourceEntry;
use crate::error::{I18nError, Result};
use std::fmt;

/// A value substituted into a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl FormatValue {
    /// Numeric view, `None` for strings.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Str(_) => None,
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
        }
    }

    /// True for integers and floats.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Str(_))
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
        }
    }
}

impl fmt::Display for FormatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for FormatValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for FormatValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<&String> for FormatValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FormatValue {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for FormatValue {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<u64> for FormatValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f32> for FormatValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for FormatValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Placeholder types that require a numeric argument.
const NUMERIC_TYPES: [&str; 5] = ["int", "num", "double", "number", "float"];

/// Ordered mapping from placeholder name to value.
///
/// Inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatArgs {
    entries: Vec<(String, FormatValue)>,
}

impl FormatArgs {
    /// Empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FormatArgs::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FormatValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FormatValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Value for a placeholder.
    pub fn get(&self, name: &str) -> Option<&FormatValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether a value is set for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no argument is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormatValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Check supplied arguments against the entry's declared placeholder
    /// types. Placeholders declared numeric must not receive strings;
    /// undeclared or absent arguments are left to the formatter.
    pub fn check_declared_types(&self, entry: &ResourceEntry) -> Result<()> {
        for (name, spec) in entry.placeholders() {
            let Some(declared) = spec.kind.as_deref() else {
                continue;
            };
            let Some(value) = self.get(name) else {
                continue;
            };
            let numeric = NUMERIC_TYPES.contains(&declared.to_ascii_lowercase().as_str());
            if numeric && !value.is_numeric() {
                return Err(I18nError::format(
                    entry.value(),
                    format!(
                        "placeholder '{name}' is declared as {declared} but got a {}",
                        value.type_name()
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for FormatArgs
where
    K: Into<String>,
    V: Into<FormatValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

/// Build [`FormatArgs`] inline.
///
/// ```
/// use lokal_i18n::args;
///
/// let args = args! { "name" => "Ana", "count" => 3 };
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::FormatArgs::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut args = $crate::FormatArgs::new();
        $(
            args.insert($name, $value);
        )+
        args
    }};
}
