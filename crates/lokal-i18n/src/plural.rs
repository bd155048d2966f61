//! CLDR plural category resolution.
//!
//! Each tabulated language maps to one [`PluralRule`] family. Digit based
//! conditions look at the integer part of the value only; visible fraction
//! digits (the CLDR `v`/`f`/`t` operands) are not modelled.

use std::fmt;
use std::str::FromStr;

/// CLDR plural category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    /// All categories in canonical order.
    pub const ALL: [PluralCategory; 6] = [
        Self::Zero,
        Self::One,
        Self::Two,
        Self::Few,
        Self::Many,
        Self::Other,
    ];

    /// Category name as used in case labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(Self::Zero),
            "one" => Ok(Self::One),
            "two" => Ok(Self::Two),
            "few" => Ok(Self::Few),
            "many" => Ok(Self::Many),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown plural category: {s}")),
        }
    }
}

/// Plural rule families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralRule {
    /// No distinction (Chinese, Japanese, Turkish, ...).
    OtherOnly,
    /// `one` for exactly 1 (English, German, Spanish, ...).
    OneOther,
    /// `one` for 0 and 1 (French, Portuguese, Armenian).
    French,
    /// Russian, Ukrainian, Belarusian.
    EastSlavic,
    /// Serbian, Croatian, Bosnian.
    SouthSlavic,
    Polish,
    CzechSlovak,
    Lithuanian,
    Latvian,
    Romanian,
    Arabic,
    Welsh,
    Irish,
    Maltese,
    Slovenian,
    Icelandic,
}

/// Integer part and full magnitude of a value.
#[derive(Debug, Clone, Copy)]
struct Operands {
    n: f64,
    i: u64,
}

impl Operands {
    fn new(value: f64) -> Self {
        let n = if value.is_finite() { value.abs() } else { 0.0 };
        Self { n, i: n.trunc() as u64 }
    }

    fn is(&self, value: u64) -> bool {
        self.n == value as f64
    }
}

impl PluralRule {
    /// Categorize a value under this rule.
    pub fn categorize(&self, value: f64) -> PluralCategory {
        use PluralCategory::*;

        let op = Operands::new(value);
        let i = op.i;
        let mod10 = i % 10;
        let mod100 = i % 100;

        match self {
            Self::OtherOnly => Other,
            Self::OneOther => {
                if op.is(1) {
                    One
                } else {
                    Other
                }
            }
            Self::French => {
                if i <= 1 {
                    One
                } else {
                    Other
                }
            }
            Self::EastSlavic => {
                if mod10 == 1 && mod100 != 11 {
                    One
                } else if (2..=4).contains(&mod10) && !(12..=14).contains(&mod100) {
                    Few
                } else {
                    Many
                }
            }
            Self::SouthSlavic => {
                if mod10 == 1 && mod100 != 11 {
                    One
                } else if (2..=4).contains(&mod10) && !(12..=14).contains(&mod100) {
                    Few
                } else {
                    Other
                }
            }
            Self::Polish => {
                if i == 1 {
                    One
                } else if (2..=4).contains(&mod10) && !(12..=14).contains(&mod100) {
                    Few
                } else {
                    Many
                }
            }
            Self::CzechSlovak => match i {
                1 => One,
                2..=4 => Few,
                _ => Other,
            },
            Self::Lithuanian => {
                if (11..=19).contains(&mod100) {
                    Other
                } else if mod10 == 1 {
                    One
                } else if mod10 >= 2 {
                    Few
                } else {
                    Other
                }
            }
            Self::Latvian => {
                if mod10 == 0 || (11..=19).contains(&mod100) {
                    Zero
                } else if mod10 == 1 && mod100 != 11 {
                    One
                } else {
                    Other
                }
            }
            // CLDR: few is `v != 0 or n = 0 or n != 1 and n % 100 = 1..19`,
            // so 101 and 1001 are few.
            Self::Romanian => {
                if op.is(1) {
                    One
                } else if op.is(0) || (1..=19).contains(&mod100) {
                    Few
                } else {
                    Other
                }
            }
            Self::Arabic => {
                if op.is(0) {
                    Zero
                } else if op.is(1) {
                    One
                } else if op.is(2) {
                    Two
                } else if (3..=10).contains(&mod100) {
                    Few
                } else if (11..=99).contains(&mod100) {
                    Many
                } else {
                    Other
                }
            }
            Self::Welsh => match i {
                _ if !op.is(i) => Other,
                0 => Zero,
                1 => One,
                2 => Two,
                3 => Few,
                6 => Many,
                _ => Other,
            },
            Self::Irish => match i {
                _ if !op.is(i) => Other,
                1 => One,
                2 => Two,
                3..=6 => Few,
                7..=10 => Many,
                _ => Other,
            },
            Self::Maltese => {
                if op.is(1) {
                    One
                } else if op.is(0) || (2..=10).contains(&mod100) {
                    Few
                } else if (11..=19).contains(&mod100) {
                    Many
                } else {
                    Other
                }
            }
            Self::Slovenian => match mod100 {
                1 => One,
                2 => Two,
                3 | 4 => Few,
                _ => Other,
            },
            Self::Icelandic => {
                if mod10 == 1 && mod100 != 11 {
                    One
                } else {
                    Other
                }
            }
        }
    }
}

/// Extract the lowercase language subtag from a locale-ish string.
pub fn language_of(locale: &str) -> String {
    locale
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Rule family for a language subtag; untabulated languages get
/// [`PluralRule::OtherOnly`].
pub fn rule_for(language: &str) -> PluralRule {
    match language_of(language).as_str() {
        "zh" | "ja" | "ko" | "th" | "vi" | "id" | "ms" | "tr" | "fa" | "lo" | "my" => {
            PluralRule::OtherOnly
        }
        "en" | "de" | "nl" | "sv" | "da" | "no" | "nb" | "nn" | "fi" | "et" | "el" | "it"
        | "es" | "ca" | "bg" | "hu" | "he" | "bn" | "te" | "ta" | "ur" | "sw" => {
            PluralRule::OneOther
        }
        "fr" | "pt" | "hy" => PluralRule::French,
        "ru" | "uk" | "be" => PluralRule::EastSlavic,
        "sr" | "hr" | "bs" => PluralRule::SouthSlavic,
        "pl" => PluralRule::Polish,
        "cs" | "sk" => PluralRule::CzechSlovak,
        "lt" => PluralRule::Lithuanian,
        "lv" => PluralRule::Latvian,
        "ro" | "mo" => PluralRule::Romanian,
        "ar" => PluralRule::Arabic,
        "cy" => PluralRule::Welsh,
        "ga" => PluralRule::Irish,
        "mt" => PluralRule::Maltese,
        "sl" => PluralRule::Slovenian,
        "is" => PluralRule::Icelandic,
        _ => PluralRule::OtherOnly,
    }
}

/// Every language with an explicit rule, sorted.
pub fn tabulated_languages() -> Vec<&'static str> {
    let mut languages = vec![
        "zh", "ja", "ko", "th", "vi", "id", "ms", "tr", "fa", "lo", "my", "en", "de", "nl",
        "sv", "da", "no", "nb", "nn", "fi", "et", "el", "it", "es", "ca", "bg", "hu", "he",
        "bn", "te", "ta", "ur", "sw", "fr", "pt", "hy", "ru", "uk", "be", "sr", "hr", "bs",
        "pl", "cs", "sk", "lt", "lv", "ro", "mo", "ar", "cy", "ga", "mt", "sl", "is",
    ];
    languages.sort_unstable();
    languages
}

/// Plural category of `value` in `language`.
pub fn category_for(language: &str, value: f64) -> PluralCategory {
    rule_for(language).categorize(value)
}

/// Integers sampled by [`categories_used`].
const SAMPLE_VALUES: [u64; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 10, 11, 12, 15, 20, 21, 100, 101];

/// Categories a language actually emits, in canonical order.
pub fn categories_used(language: &str) -> Vec<PluralCategory> {
    let rule = rule_for(language);
    let mut seen = [false; 6];
    for value in SAMPLE_VALUES {
        seen[rule.categorize(value as f64) as usize] = true;
    }
    PluralCategory::ALL
        .into_iter()
        .filter(|category| seen[*category as usize])
        .collect()
}
