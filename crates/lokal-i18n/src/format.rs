//! ICU-style message formatting.
//!
//! Supported constructs:
//!
//! - `{name}` substitutes an argument (a trailing `, style` is ignored)
//! - `{name, plural, =0{..} one{..} other{..}}` picks a case by value
//! - `{name, select, male{..} female{..} other{..}}` picks a case by string
//!
//! Select constructs are resolved before plural constructs, and both before
//! plain placeholders, because a select body may carry a plural that uses
//! an argument the select did not consume. Construct bodies are found by
//! brace depth, so literal braces in text are not supported; an unmatched
//! brace is copied through verbatim.

use crate::error::{I18nError, Result};
use crate::locale::LocaleTag;
use crate::plural;
use crate::value::{FormatArgs, FormatValue};
use lokal_common_config::{DEFAULT_FALLBACK_LOCALE, DEFAULT_PATTERN_CACHE_CAPACITY};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

const PLURAL: &str = "plural";
const SELECT: &str = "select";
const OTHER: &str = "other";

/// A brace construct `{name, keyword, cases}` located in a string.
struct Construct<'a> {
    start: usize,
    /// Byte index one past the closing brace.
    end: usize,
    name: &'a str,
    cases: &'a str,
}

/// Byte index of the brace closing the one at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split construct content into name, keyword and the rest. Both commas
/// must come before any nested brace.
fn split_header(content: &str) -> Option<(&str, &str, &str)> {
    let header_end = content.find('{').unwrap_or(content.len());
    let header = &content[..header_end];
    let first = header.find(',')?;
    let second = first + 1 + header[first + 1..].find(',')?;
    let name = content[..first].trim();
    if name.is_empty() {
        return None;
    }
    Some((name, content[first + 1..second].trim(), &content[second + 1..]))
}

/// Leftmost construct with the given keyword. Outer constructs start
/// before the ones nested in them, so they are found first.
fn find_construct<'a>(text: &'a str, keyword: &str) -> Option<Construct<'a>> {
    for (start, _) in text.match_indices('{') {
        let Some(close) = matching_brace(text, start) else {
            continue;
        };
        let content = &text[start + 1..close];
        if let Some((name, found, cases)) = split_header(content) {
            if found == keyword {
                return Some(Construct {
                    start,
                    end: close + 1,
                    name,
                    cases,
                });
            }
        }
    }
    None
}

/// Parse `label{body}` pairs in declaration order. Parsing stops at the
/// first malformed case.
fn parse_cases(source: &str) -> Vec<(&str, &str)> {
    let mut cases = Vec::new();
    let mut rest = source;

    loop {
        rest = rest.trim_start();
        let label_end = rest
            .find(|c: char| c == '{' || c.is_whitespace())
            .unwrap_or(rest.len());
        let label = &rest[..label_end];
        if label.is_empty() {
            break;
        }

        let after_label = rest[label_end..].trim_start();
        if !after_label.starts_with('{') {
            break;
        }
        let Some(close) = matching_brace(after_label, 0) else {
            break;
        };
        cases.push((label, &after_label[1..close]));
        rest = &after_label[close + 1..];
    }

    cases
}

fn case_body<'a>(cases: &[(&str, &'a str)], label: &str) -> Option<&'a str> {
    cases.iter().find(|(l, _)| *l == label).map(|(_, body)| *body)
}

/// A pattern with precomputed construct flags.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPattern {
    source: String,
    locale: LocaleTag,
    has_select: bool,
    has_plural: bool,
    has_placeholder: bool,
}

impl CompiledPattern {
    /// Scan `pattern` once for the constructs it uses.
    pub fn compile(pattern: &str, locale: &LocaleTag) -> Self {
        let mut has_select = false;
        let mut has_plural = false;
        let mut has_placeholder = false;

        for (start, _) in pattern.match_indices('{') {
            let Some(close) = matching_brace(pattern, start) else {
                continue;
            };
            match split_header(&pattern[start + 1..close]) {
                Some((_, SELECT, _)) => has_select = true,
                Some((_, PLURAL, _)) => has_plural = true,
                _ => has_placeholder = true,
            }
        }

        Self {
            source: pattern.to_string(),
            locale: locale.clone(),
            has_select,
            has_plural,
            has_placeholder,
        }
    }

    /// The pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Locale whose plural rules apply.
    pub fn locale(&self) -> &LocaleTag {
        &self.locale
    }

    /// Whether the pattern has a `select` construct.
    pub fn has_select(&self) -> bool {
        self.has_select
    }

    /// Whether the pattern has a `plural` construct.
    pub fn has_plural(&self) -> bool {
        self.has_plural
    }

    /// Whether the pattern has a plain `{name}` placeholder.
    pub fn has_placeholder(&self) -> bool {
        self.has_placeholder
    }

    /// Evaluate the pattern against `args`.
    pub fn format(&self, args: &FormatArgs) -> Result<String> {
        if !(self.has_select || self.has_plural || self.has_placeholder) {
            return Ok(self.source.clone());
        }

        let mut text = self.source.clone();
        loop {
            if self.has_select {
                if let Some(construct) = find_construct(&text, SELECT) {
                    let body = self.select_body(&construct, args)?;
                    text = splice(&text, &construct, &body);
                    continue;
                }
            }
            if self.has_plural {
                if let Some(construct) = find_construct(&text, PLURAL) {
                    let body = self.plural_body(&construct, args)?;
                    text = splice(&text, &construct, &body);
                    continue;
                }
            }
            break;
        }

        self.substitute(&text, args)
    }

    fn argument<'a>(&self, args: &'a FormatArgs, name: &str, what: &str) -> Result<&'a FormatValue> {
        args.get(name).ok_or_else(|| {
            I18nError::format(&self.source, format!("missing value for {what} '{name}'"))
        })
    }

    fn select_body(&self, construct: &Construct<'_>, args: &FormatArgs) -> Result<String> {
        let choice = self
            .argument(args, construct.name, "select variable")?
            .to_string();
        let cases = parse_cases(construct.cases);

        case_body(&cases, &choice)
            .or_else(|| case_body(&cases, OTHER))
            .map(String::from)
            .ok_or_else(|| {
                I18nError::format(
                    &self.source,
                    format!(
                        "select variable '{}' has no case for '{choice}' and no 'other' case",
                        construct.name
                    ),
                )
            })
    }

    fn plural_body(&self, construct: &Construct<'_>, args: &FormatArgs) -> Result<String> {
        let value = self.argument(args, construct.name, "plural variable")?;
        let Some(number) = value.as_number() else {
            return Err(I18nError::format(
                &self.source,
                format!("plural variable '{}' must be a number", construct.name),
            ));
        };
        let cases = parse_cases(construct.cases);

        // Exact labels only match integral values.
        let exact = cases.iter().find_map(|(label, body)| {
            let target: f64 = label.strip_prefix('=')?.trim().parse().ok()?;
            (number.fract() == 0.0 && number == target).then_some(*body)
        });
        if let Some(body) = exact {
            return Ok(body.to_string());
        }

        let category = plural::category_for(self.locale.language(), number);
        let body = case_body(&cases, category.as_str())
            .or_else(|| case_body(&cases, OTHER))
            .or_else(|| cases.first().map(|(_, body)| *body));

        Ok(body.map_or_else(|| value.to_string(), String::from))
    }

    fn substitute(&self, text: &str, args: &FormatArgs) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let Some(close) = matching_brace(rest, open) else {
                out.push_str(&rest[open..]);
                return Ok(out);
            };

            let content = &rest[open + 1..close];
            let name = content.split(',').next().unwrap_or_default().trim();
            if name.is_empty() || content.contains('{') {
                out.push_str(&rest[open..=close]);
            } else {
                let value = self.argument(args, name, "placeholder")?;
                out.push_str(&value.to_string());
            }
            rest = &rest[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

fn splice(text: &str, construct: &Construct<'_>, body: &str) -> String {
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..construct.start]);
    out.push_str(body);
    out.push_str(&text[construct.end..]);
    out
}

type PatternKey = (String, LocaleTag);

/// Formatter bound to one locale, with a bounded cache of compiled patterns.
pub struct MessageFormatter {
    locale: LocaleTag,
    cache: Mutex<LruCache<PatternKey, Arc<CompiledPattern>>>,
}

impl MessageFormatter {
    /// Formatter with the default cache capacity.
    pub fn new(locale: LocaleTag) -> Self {
        Self::with_capacity(locale, DEFAULT_PATTERN_CACHE_CAPACITY)
    }

    /// Formatter caching at most `capacity` patterns. A capacity of zero
    /// is clamped to one.
    pub fn with_capacity(locale: LocaleTag, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            locale,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Locale whose plural rules this formatter applies.
    pub fn locale(&self) -> &LocaleTag {
        &self.locale
    }

    /// Maximum number of cached patterns.
    pub fn cache_capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }

    /// Compile `pattern`, reusing a cached result when present.
    pub fn compile(&self, pattern: &str) -> Arc<CompiledPattern> {
        let key = (pattern.to_string(), self.locale.clone());
        let mut cache = self.cache.lock();
        if let Some(compiled) = cache.get(&key) {
            return Arc::clone(compiled);
        }
        let compiled = Arc::new(CompiledPattern::compile(pattern, &self.locale));
        cache.put(key, Arc::clone(&compiled));
        compiled
    }

    /// Format `pattern` in this formatter's locale.
    pub fn format(&self, pattern: &str, args: &FormatArgs) -> Result<String> {
        self.compile(pattern).format(args)
    }

    /// Number of patterns currently cached.
    pub fn cached_patterns(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop every cached pattern.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl std::fmt::Debug for MessageFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("MessageFormatter")
            .field("locale", &self.locale)
            .field("cached", &cache.len())
            .field("capacity", &cache.cap())
            .finish()
    }
}

/// Format a pattern once, without caching.
pub fn format(pattern: &str, locale: &str, args: &FormatArgs) -> Result<String> {
    let locale = LocaleTag::parse(locale)
        .or_else(|| LocaleTag::parse(DEFAULT_FALLBACK_LOCALE))
        .ok_or_else(|| I18nError::format(pattern, "no locale to format with"))?;
    CompiledPattern::compile(pattern, &locale).format(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use test_case::test_case;

    const ITEMS: &str = "{count, plural, =0{No items} one{One item} other{{count} items}}";
    const GENDER: &str = "{gender, select, male{He} female{She} other{They}}";

    fn en() -> MessageFormatter {
        MessageFormatter::new(LocaleTag::parse("en").unwrap())
    }

    #[test_case(0, "No items")]
    #[test_case(1, "One item")]
    #[test_case(5, "5 items")]
    fn test_plural_scenario(count: i64, expected: &str) {
        assert_eq!(en().format(ITEMS, &args! { "count" => count }).unwrap(), expected);
    }

    #[test]
    fn test_placeholder_scenario() {
        let formatter = en();
        assert_eq!(
            formatter.format("Welcome, {name}!", &args! { "name" => "Ana" }).unwrap(),
            "Welcome, Ana!"
        );
        let err = formatter.format("Welcome, {name}!", &args! {}).unwrap_err();
        assert!(matches!(err, I18nError::Format { ref pattern, .. } if pattern == "Welcome, {name}!"));
    }

    #[test_case("male", "He")]
    #[test_case("female", "She")]
    #[test_case("x", "They")]
    fn test_select_scenario(gender: &str, expected: &str) {
        assert_eq!(en().format(GENDER, &args! { "gender" => gender }).unwrap(), expected);
    }

    #[test]
    fn test_select_containing_plural() {
        let pattern = "{gender, select, female{{count, plural, one{She has one} other{She has {count}}}} other{They have {count}}}";
        let formatter = en();
        assert_eq!(
            formatter.format(pattern, &args! { "gender" => "female", "count" => 1 }).unwrap(),
            "She has one"
        );
        assert_eq!(
            formatter.format(pattern, &args! { "gender" => "female", "count" => 4 }).unwrap(),
            "She has 4"
        );
        assert_eq!(
            formatter.format(pattern, &args! { "gender" => "n", "count" => 2 }).unwrap(),
            "They have 2"
        );
    }

    #[test]
    fn test_plural_containing_select() {
        let pattern = "{n, plural, one{{who, select, me{I have} other{{who} has}} one} other{many}}";
        assert_eq!(
            en().format(pattern, &args! { "n" => 1, "who" => "Ana" }).unwrap(),
            "Ana has one"
        );
    }

    #[test]
    fn test_multiple_constructs_and_text() {
        let pattern = "{name} sent {count, plural, one{a photo} other{{count} photos}} to {other, select, other{{other}}}.";
        let args = args! { "name" => "Ana", "count" => 3, "other" => "Luis" };
        assert_eq!(en().format(pattern, &args).unwrap(), "Ana sent 3 photos to Luis.");
    }

    #[test]
    fn test_exact_label_beats_category() {
        let pattern = "{n, plural, =1{exactly one} one{one} other{other}}";
        assert_eq!(en().format(pattern, &args! { "n" => 1 }).unwrap(), "exactly one");
        assert_eq!(en().format(pattern, &args! { "n" => 1.5 }).unwrap(), "other");
    }

    #[test]
    fn test_plural_uses_locale_rules() {
        let formatter = MessageFormatter::new(LocaleTag::parse("ru").unwrap());
        let pattern = "{n, plural, one{{n} файл} few{{n} файла} many{{n} файлов} other{{n} файла}}";
        assert_eq!(formatter.format(pattern, &args! { "n" => 21 }).unwrap(), "21 файл");
        assert_eq!(formatter.format(pattern, &args! { "n" => 3 }).unwrap(), "3 файла");
        assert_eq!(formatter.format(pattern, &args! { "n" => 11 }).unwrap(), "11 файлов");
    }

    #[test]
    fn test_plural_last_resort_cases() {
        let formatter = en();
        let no_other = "{n, plural, one{single}}";
        assert_eq!(formatter.format(no_other, &args! { "n" => 7 }).unwrap(), "single");
        let no_cases = "{n, plural, }";
        assert_eq!(formatter.format(no_cases, &args! { "n" => 7 }).unwrap(), "7");
    }

    #[test]
    fn test_plural_errors() {
        let formatter = en();
        let err = formatter.format(ITEMS, &args! {}).unwrap_err();
        assert!(err.to_string().contains("plural variable 'count'"));

        let err = formatter.format(ITEMS, &args! { "count" => "five" }).unwrap_err();
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn test_select_errors() {
        let formatter = en();
        assert!(formatter.format(GENDER, &args! {}).is_err());
        let err = formatter
            .format("{g, select, a{A} b{B}}", &args! { "g" => "c" })
            .unwrap_err();
        assert!(err.to_string().contains("no 'other' case"));
    }

    #[test_case("Hello {name" ; "unclosed brace")]
    #[test_case("Hello name}" ; "stray close brace")]
    #[test_case("Empty {} braces" ; "empty braces")]
    fn test_unmatched_braces_pass_through(pattern: &str) {
        assert_eq!(en().format(pattern, &args! { "name" => "x" }).unwrap(), pattern);
    }

    #[test]
    fn test_style_suffix_is_ignored() {
        assert_eq!(
            en().format("Total: {amount, number}", &args! { "amount" => 12.5 }).unwrap(),
            "Total: 12.5"
        );
    }

    #[test]
    fn test_compile_flags_and_cache() {
        let formatter = en();
        let compiled = formatter.compile(ITEMS);
        assert!(compiled.has_plural());
        assert!(!compiled.has_select());
        assert!(compiled.has_placeholder());
        assert!(!formatter.compile("plain text").has_placeholder());

        let again = formatter.compile(ITEMS);
        assert!(Arc::ptr_eq(&compiled, &again));
        assert_eq!(formatter.cached_patterns(), 2);

        formatter.clear_cache();
        assert_eq!(formatter.cached_patterns(), 0);
    }

    #[test]
    fn test_cache_is_bounded() {
        let formatter = MessageFormatter::with_capacity(LocaleTag::parse("en").unwrap(), 4);
        for i in 0..10 {
            formatter.format(&format!("pattern {i}"), &args! {}).unwrap();
        }
        assert_eq!(formatter.cached_patterns(), 4);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let formatter = MessageFormatter::with_capacity(LocaleTag::parse("en").unwrap(), 2);
        let first = formatter.compile("first");
        formatter.compile("second");
        // Touch "first" so "second" is the eviction candidate.
        assert!(Arc::ptr_eq(&first, &formatter.compile("first")));
        formatter.compile("third");

        assert_eq!(formatter.cached_patterns(), 2);
        assert!(Arc::ptr_eq(&first, &formatter.compile("first")));
    }

    #[test]
    fn test_zero_capacity_is_clamped_to_one() {
        let formatter = MessageFormatter::with_capacity(LocaleTag::parse("en").unwrap(), 0);
        assert_eq!(formatter.cache_capacity(), 1);

        let compiled = formatter.compile(ITEMS);
        assert!(Arc::ptr_eq(&compiled, &formatter.compile(ITEMS)));
        formatter.compile("other pattern");
        assert_eq!(formatter.cached_patterns(), 1);
        assert_eq!(
            formatter.format(ITEMS, &args! { "count" => 3 }).unwrap(),
            "3 items"
        );
    }

    #[test]
    fn test_free_format() {
        assert_eq!(format(ITEMS, "en_US", &args! { "count" => 1 }).unwrap(), "One item");
        assert_eq!(format("Hi {n}", "", &args! { "n" => "Bo" }).unwrap(), "Hi Bo");
    }

    #[test]
    fn test_parse_cases_stops_on_malformed() {
        assert_eq!(
            parse_cases(" =0{zero} one {one} other{{n} more}"),
            vec![("=0", "zero"), ("one", "one"), ("other", "{n} more")]
        );
        assert_eq!(parse_cases("one{a} broken other{b}"), vec![("one", "a")]);
    }
}
