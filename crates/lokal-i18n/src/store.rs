//! Lazy, cached loading of resource bundles from a directory.

use crate::arb::{locale_from_filename, ResourceBundle, ResourceEntry};
use crate::error::{I18nError, Result};
use crate::locale::LocaleTag;
use glob::Pattern;
use lokal_common_log::spans::{bundle_span, record_error, LoadTimer};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Discovery = BTreeMap<LocaleTag, PathBuf>;

/// Loads invalidated this many times in a row return their result uncached.
const LOAD_ATTEMPTS: usize = 3;

/// A bundle file that exists but did not parse.
#[derive(Debug, Clone)]
struct FailedLoad {
    source_id: String,
    message: String,
}

enum Lookup {
    Hit(Arc<ResourceBundle>),
    Failed(FailedLoad),
    /// Not cached; carries the generation the load starts under.
    Miss(u64),
}

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by every whole-cache invalidation. A load only stores its
    /// result when the generation it started under is still current.
    generation: u64,
    bundles: HashMap<LocaleTag, Arc<ResourceBundle>>,
    failed: HashMap<LocaleTag, FailedLoad>,
}

/// Per-locale bundle cache over one resource directory.
///
/// A locale's bundle is parsed outside any lock and then swapped into the
/// cache as a whole, so readers see either the previous bundle or the new
/// one, never a partially built map.
///
/// A file that fails to parse is remembered as failed, so lookups do not
/// re-read it until the next reload.
#[derive(Debug)]
pub struct TranslationStore {
    directory: PathBuf,
    extension: String,
    discovered: RwLock<Option<Arc<Discovery>>>,
    cache: RwLock<CacheState>,
}

impl TranslationStore {
    /// Store over `directory` for files ending in `.extension`.
    pub fn new(directory: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.trim_start_matches('.').to_string(),
            discovered: RwLock::new(None),
            cache: RwLock::new(CacheState::default()),
        }
    }

    /// The resource directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resource file extension, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Locales with a parseable resource file, sorted.
    ///
    /// The result is cached until [`reload_all`](Self::reload_all) or
    /// [`clear_cache`](Self::clear_cache).
    pub fn discover_locales(&self) -> Result<Vec<LocaleTag>> {
        Ok(self.discovery()?.keys().cloned().collect())
    }

    fn discovery(&self) -> Result<Arc<Discovery>> {
        if let Some(discovered) = self.discovered.read().as_ref() {
            return Ok(Arc::clone(discovered));
        }

        let discovered = Arc::new(self.scan()?);
        *self.discovered.write() = Some(Arc::clone(&discovered));
        Ok(discovered)
    }

    fn scan(&self) -> Result<Discovery> {
        let mut discovered = Discovery::new();

        for path in self.resource_files()? {
            let bundle = match ResourceBundle::parse_file(&path) {
                Ok(bundle) => bundle,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable resource file");
                    continue;
                }
            };

            let tag = bundle
                .locale()
                .and_then(LocaleTag::parse)
                .or_else(|| {
                    let name = path.file_name()?.to_str()?;
                    LocaleTag::parse(&locale_from_filename(name, &self.extension)?)
                });

            match tag {
                Some(tag) => {
                    discovered.entry(tag).or_insert(path);
                }
                None => debug!(path = %path.display(), "no locale for resource file"),
            }
        }

        debug!(
            directory = %self.directory.display(),
            locales = discovered.len(),
            "discovered locales"
        );
        Ok(discovered)
    }

    /// Files in the directory carrying the resource extension, sorted.
    fn resource_files(&self) -> Result<Vec<PathBuf>> {
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }

        let read_dir =
            fs::read_dir(&self.directory).map_err(|e| I18nError::io(&self.directory, e))?;

        let mut files: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == self.extension)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Resolve the resource file for a locale.
    ///
    /// Tries the usual naming conventions (`*_<tag>`, `*-<tag>`, `<tag>`,
    /// with `-` or `_` inside the tag), then a case-insensitive match on
    /// the locale part of each file name, then the files' `@@locale`.
    pub fn find_resource_file(&self, tag: &LocaleTag) -> Result<Option<PathBuf>> {
        let files = self.resource_files()?;
        if files.is_empty() {
            return Ok(None);
        }

        let names: Vec<(&PathBuf, &str)> = files
            .iter()
            .filter_map(|path| Some((path, path.file_name()?.to_str()?)))
            .collect();

        let mut forms = vec![tag.as_str().to_string()];
        let underscored = tag.to_underscored();
        if !forms.contains(&underscored) {
            forms.push(underscored);
        }

        for form in &forms {
            let form = Pattern::escape(form);
            let ext = Pattern::escape(&self.extension);
            for pattern in [
                format!("*_{form}.{ext}"),
                format!("*-{form}.{ext}"),
                format!("{form}.{ext}"),
            ] {
                let Ok(pattern) = Pattern::new(&pattern) else {
                    continue;
                };
                if let Some((path, _)) = names.iter().find(|(_, name)| pattern.matches(name)) {
                    return Ok(Some((*path).clone()));
                }
            }
        }

        for (path, name) in &names {
            let matches = locale_from_filename(name, &self.extension)
                .and_then(|raw| LocaleTag::parse(&raw))
                .is_some_and(|found| found.as_str().eq_ignore_ascii_case(tag.as_str()));
            if matches {
                return Ok(Some((*path).clone()));
            }
        }

        Ok(self.discovery()?.get(tag).cloned())
    }

    fn not_found(&self, locale: &str) -> I18nError {
        let available = self
            .discover_locales()
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.to_string())
            .collect();
        I18nError::LocaleNotFound {
            locale: locale.to_string(),
            available,
        }
    }

    fn resolve_file(&self, locale: &str) -> Result<(LocaleTag, PathBuf)> {
        let Some(tag) = LocaleTag::parse(locale) else {
            return Err(self.not_found(locale));
        };
        match self.find_resource_file(&tag)? {
            Some(path) => Ok((tag, path)),
            None => Err(self.not_found(locale)),
        }
    }

    fn parse_bundle(tag: &LocaleTag, path: &Path) -> Result<Arc<ResourceBundle>> {
        let span = bundle_span(tag.as_str(), &path.display().to_string());
        let _guard = span.enter();

        let timer = LoadTimer::start();
        let bundle = ResourceBundle::parse_file(path).map_err(|e| {
            record_error(&e);
            e
        })?;
        timer.finish(bundle.len());

        for warning in bundle.validate() {
            debug!(%warning, "resource bundle warning");
        }
        Ok(Arc::new(bundle))
    }

    fn lookup(&self, tag: Option<&LocaleTag>) -> Lookup {
        let cache = self.cache.read();
        if let Some(tag) = tag {
            if let Some(bundle) = cache.bundles.get(tag) {
                return Lookup::Hit(Arc::clone(bundle));
            }
            if let Some(failed) = cache.failed.get(tag) {
                return Lookup::Failed(failed.clone());
            }
        }
        Lookup::Miss(cache.generation)
    }

    /// Bundle for a locale, parsed on first access and cached afterwards.
    ///
    /// A load racing a [`reload_all`](Self::reload_all) or
    /// [`clear_cache`](Self::clear_cache) does not store what it read; it
    /// starts over so the cache never holds a bundle older than the last
    /// invalidation.
    pub fn load_locale(&self, locale: &str) -> Result<Arc<ResourceBundle>> {
        let requested = LocaleTag::parse(locale);
        let mut last = None;

        for _ in 0..LOAD_ATTEMPTS {
            let generation = match self.lookup(requested.as_ref()) {
                Lookup::Hit(bundle) => return Ok(bundle),
                Lookup::Failed(failed) => {
                    return Err(I18nError::parse(failed.source_id, failed.message))
                }
                Lookup::Miss(generation) => generation,
            };

            let (tag, path) = self.resolve_file(locale)?;
            let parsed = Self::parse_bundle(&tag, &path);

            let mut cache = self.cache.write();
            if cache.generation != generation {
                debug!(locale = %tag, "cache invalidated during load, retrying");
                last = Some(parsed);
                continue;
            }

            return match parsed {
                Ok(bundle) => {
                    let stored = cache.bundles.entry(tag.clone()).or_insert(bundle);
                    debug!(locale = %tag, entries = stored.len(), "loaded resource bundle");
                    Ok(Arc::clone(stored))
                }
                Err(I18nError::Parse { source_id, message }) => {
                    warn!(
                        locale = %tag,
                        source = %source_id,
                        error = %message,
                        "resource bundle failed to load, skipping until reload"
                    );
                    cache.failed.insert(
                        tag,
                        FailedLoad {
                            source_id: source_id.clone(),
                            message: message.clone(),
                        },
                    );
                    Err(I18nError::Parse { source_id, message })
                }
                Err(e) => Err(e),
            };
        }

        // Invalidated on every attempt; hand back the latest read uncached.
        match last {
            Some(parsed) => parsed,
            None => Err(self.not_found(locale)),
        }
    }

    /// Re-read one locale and swap it into the cache.
    ///
    /// On failure the locale is evicted and the error returned.
    pub fn reload(&self, locale: &str) -> Result<Arc<ResourceBundle>> {
        let result = self
            .resolve_file(locale)
            .and_then(|(tag, path)| Ok((tag.clone(), Self::parse_bundle(&tag, &path)?)));

        match result {
            Ok((tag, bundle)) => {
                let mut cache = self.cache.write();
                cache.failed.remove(&tag);
                cache.bundles.insert(tag.clone(), Arc::clone(&bundle));
                info!(locale = %tag, entries = bundle.len(), "reloaded resource bundle");
                Ok(bundle)
            }
            Err(e) => {
                if let Some(tag) = LocaleTag::parse(locale) {
                    let mut cache = self.cache.write();
                    cache.bundles.remove(&tag);
                    cache.failed.remove(&tag);
                    debug!(locale = %tag, "evicted resource bundle");
                }
                Err(e)
            }
        }
    }

    /// Re-run discovery and reload every locale that was cached.
    ///
    /// Locales that were never loaded stay unloaded; locales whose file
    /// disappeared or no longer parses are dropped.
    ///
    /// Readers keep seeing the previous bundles until the reloaded ones are
    /// swapped in. Locales first loaded while the reload runs are kept.
    /// Failed loads are forgotten and retried on next access.
    pub fn reload_all(&self) -> Result<()> {
        let (generation, previous) = {
            let mut cache = self.cache.write();
            cache.generation += 1;
            cache.failed.clear();
            let previous: Vec<LocaleTag> = cache.bundles.keys().cloned().collect();
            (cache.generation, previous)
        };
        *self.discovered.write() = None;
        self.discovery()?;

        let mut fresh = HashMap::new();
        for tag in &previous {
            let loaded = self
                .resolve_file(tag.as_str())
                .and_then(|(tag, path)| Self::parse_bundle(&tag, &path));
            match loaded {
                Ok(bundle) => {
                    fresh.insert(tag.clone(), bundle);
                }
                Err(e) => warn!(locale = %tag, error = %e, "dropping locale on reload"),
            }
        }

        let mut cache = self.cache.write();
        if cache.generation != generation {
            debug!("cache invalidated again during reload, discarding this pass");
            return Ok(());
        }
        for tag in previous {
            match fresh.remove(&tag) {
                Some(bundle) => cache.bundles.insert(tag, bundle),
                None => cache.bundles.remove(&tag),
            };
        }
        info!(locales = cache.bundles.len(), "reloaded all resource bundles");
        Ok(())
    }

    /// Entry for `key` in `locale`, or `None` when either is unavailable.
    pub fn get_translation(&self, locale: &str, key: &str) -> Option<ResourceEntry> {
        match self.load_locale(locale) {
            Ok(bundle) => bundle.get(key).cloned(),
            Err(I18nError::LocaleNotFound { .. }) => None,
            Err(e) => {
                debug!(locale = %locale, error = %e, "locale unavailable for lookup");
                None
            }
        }
    }

    /// Drop every cached bundle, failed load and the discovery result.
    pub fn clear_cache(&self) {
        {
            let mut cache = self.cache.write();
            cache.generation += 1;
            cache.bundles.clear();
            cache.failed.clear();
        }
        *self.discovered.write() = None;
    }

    /// Locales currently cached, sorted.
    pub fn cached_locales(&self) -> Vec<LocaleTag> {
        let mut locales: Vec<LocaleTag> = self.cache.read().bundles.keys().cloned().collect();
        locales.sort();
        locales
    }

    /// Locales whose file failed to parse since the last reload, sorted.
    pub fn failed_locales(&self) -> Vec<LocaleTag> {
        let mut locales: Vec<LocaleTag> = self.cache.read().failed.keys().cloned().collect();
        locales.sort();
        locales
    }

    /// Whether a bundle for `locale` is cached.
    pub fn is_loaded(&self, locale: &str) -> bool {
        LocaleTag::parse(locale).is_some_and(|tag| self.cache.read().bundles.contains_key(&tag))
    }

    /// Load several locales, skipping unavailable ones. Returns how many
    /// are now cached.
    pub fn preload<S: AsRef<str>>(&self, locales: &[S]) -> Result<usize> {
        let mut loaded = 0;
        for locale in locales {
            match self.load_locale(locale.as_ref()) {
                Ok(_) => loaded += 1,
                Err(I18nError::LocaleNotFound { locale, .. }) => {
                    debug!(locale = %locale, "skipping unavailable locale");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn fixture() -> (TempDir, TranslationStore) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app_en.arb", r#"{ "@@locale": "en", "hello": "Hello" }"#);
        write(dir.path(), "app_es_ES.arb", r#"{ "hello": "Hola" }"#);
        write(dir.path(), "custom.arb", r#"{ "@@locale": "de", "hello": "Hallo" }"#);
        write(dir.path(), "broken_fr.arb", "{ not json");
        write(dir.path(), "notes.txt", "ignored");
        let store = TranslationStore::new(dir.path(), ".arb");
        (dir, store)
    }

    fn names(tags: Vec<LocaleTag>) -> Vec<String> {
        tags.into_iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_discover_locales() {
        let (_dir, store) = fixture();
        assert_eq!(names(store.discover_locales().unwrap()), vec!["de", "en", "es-ES"]);
    }

    #[test]
    fn test_discover_missing_directory() {
        let store = TranslationStore::new("/nonexistent/l10n", "arb");
        assert!(store.discover_locales().unwrap().is_empty());
        assert!(store.find_resource_file(&LocaleTag::parse("en").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_find_resource_file() {
        let (dir, store) = fixture();
        let find = |tag: &str| {
            store
                .find_resource_file(&LocaleTag::parse(tag).unwrap())
                .unwrap()
                .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
        };

        assert_eq!(find("en"), Some(PathBuf::from("app_en.arb")));
        assert_eq!(find("es-ES"), Some(PathBuf::from("app_es_ES.arb")));
        assert_eq!(find("de"), Some(PathBuf::from("custom.arb")));
        assert_eq!(find("it"), None);
    }

    #[test]
    fn test_find_case_insensitive() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "intl_PT_br.arb", r#"{ "x": "y" }"#);
        let store = TranslationStore::new(dir.path(), "arb");
        let found = store.find_resource_file(&LocaleTag::parse("pt-BR").unwrap()).unwrap();
        assert_eq!(found, Some(dir.path().join("intl_PT_br.arb")));
    }

    #[test]
    fn test_load_is_lazy_and_cached() {
        let (_dir, store) = fixture();
        assert!(store.cached_locales().is_empty());

        let first = store.load_locale("es_ES").unwrap();
        assert_eq!(first.get("hello").unwrap().value(), "Hola");
        assert!(store.is_loaded("es-ES"));

        let second = store.load_locale("es-ES").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(names(store.cached_locales()), vec!["es-ES"]);
    }

    #[test]
    fn test_load_unknown_locale() {
        let (_dir, store) = fixture();
        match store.load_locale("it").unwrap_err() {
            I18nError::LocaleNotFound { locale, available } => {
                assert_eq!(locale, "it");
                assert_eq!(available, vec!["de", "en", "es-ES"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_broken_file_is_parse_error() {
        let (_dir, store) = fixture();
        assert!(matches!(store.load_locale("fr"), Err(I18nError::Parse { .. })));
        assert!(store.get_translation("fr", "hello").is_none());
    }

    #[test]
    fn test_failed_load_is_not_reread_until_reload() {
        let (dir, store) = fixture();
        assert!(matches!(store.load_locale("fr"), Err(I18nError::Parse { .. })));
        assert_eq!(names(store.failed_locales()), vec!["fr"]);

        // Fixed on disk, but the failure stays cached.
        write(dir.path(), "broken_fr.arb", r#"{ "@@locale": "fr", "hello": "Bonjour" }"#);
        for _ in 0..3 {
            assert!(store.get_translation("fr", "hello").is_none());
        }
        match store.load_locale("fr").unwrap_err() {
            I18nError::Parse { source_id, .. } => assert!(source_id.ends_with("broken_fr.arb")),
            other => panic!("unexpected error: {other:?}"),
        }

        store.reload_all().unwrap();
        assert!(store.failed_locales().is_empty());
        assert_eq!(store.get_translation("fr", "hello").unwrap().value(), "Bonjour");
    }

    #[test]
    fn test_reload_and_clear_forget_failures() {
        let (dir, store) = fixture();
        assert!(store.load_locale("fr").is_err());
        write(dir.path(), "broken_fr.arb", r#"{ "hello": "Salut" }"#);

        assert_eq!(store.reload("fr").unwrap().len(), 1);
        assert!(store.failed_locales().is_empty());
        assert!(store.is_loaded("fr"));

        write(dir.path(), "broken_fr.arb", "{ still broken");
        store.clear_cache();
        assert!(store.load_locale("fr").is_err());
        assert_eq!(names(store.failed_locales()), vec!["fr"]);

        store.clear_cache();
        assert!(store.failed_locales().is_empty());
    }

    #[test]
    fn test_load_racing_reload_all_keeps_newest_bundle() {
        for round in 0..25 {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("app_en.arb");
            fs::write(&path, r#"{ "@@locale": "en", "hello": "old" }"#).unwrap();
            let store = Arc::new(TranslationStore::new(dir.path(), "arb"));
            let barrier = Arc::new(Barrier::new(2));

            let loader = {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.load_locale("en").map(|bundle| bundle.len())
                })
            };

            barrier.wait();
            let tmp = path.with_extension("arb.tmp");
            fs::write(&tmp, r#"{ "@@locale": "en", "hello": "new" }"#).unwrap();
            fs::rename(&tmp, &path).unwrap();
            store.reload_all().unwrap();

            assert_eq!(loader.join().unwrap().unwrap(), 1);
            assert_eq!(
                store.get_translation("en", "hello").unwrap().value(),
                "new",
                "stale bundle cached in round {round}"
            );
        }
    }

    #[test]
    fn test_get_translation() {
        let (_dir, store) = fixture();
        assert_eq!(store.get_translation("en", "hello").unwrap().value(), "Hello");
        assert!(store.get_translation("en", "missing").is_none());
        assert!(store.get_translation("it", "hello").is_none());
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let (dir, store) = fixture();
        assert_eq!(store.get_translation("en", "hello").unwrap().value(), "Hello");

        write(dir.path(), "app_en.arb", r#"{ "@@locale": "en", "hello": "Hi", "bye": "Bye" }"#);
        assert_eq!(store.get_translation("en", "hello").unwrap().value(), "Hello");

        let bundle = store.reload("en").unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(store.get_translation("en", "hello").unwrap().value(), "Hi");
    }

    #[test]
    fn test_reload_failure_evicts() {
        let (dir, store) = fixture();
        store.load_locale("en").unwrap();
        write(dir.path(), "app_en.arb", "[]");

        assert!(store.reload("en").is_err());
        assert!(!store.is_loaded("en"));
    }

    #[test]
    fn test_reload_all_only_reloads_cached() {
        let (dir, store) = fixture();
        store.load_locale("en").unwrap();
        write(dir.path(), "app_en.arb", r#"{ "@@locale": "en", "hello": "Hey" }"#);
        write(dir.path(), "app_it.arb", r#"{ "hello": "Ciao" }"#);

        store.reload_all().unwrap();

        assert_eq!(names(store.cached_locales()), vec!["en"]);
        assert_eq!(store.get_translation("en", "hello").unwrap().value(), "Hey");
        assert_eq!(
            names(store.discover_locales().unwrap()),
            vec!["de", "en", "es-ES", "it"]
        );
    }

    #[test]
    fn test_reload_all_drops_removed_locale() {
        let (dir, store) = fixture();
        store.load_locale("es-ES").unwrap();
        fs::remove_file(dir.path().join("app_es_ES.arb")).unwrap();

        store.reload_all().unwrap();
        assert!(store.cached_locales().is_empty());
    }

    #[test]
    fn test_preload_and_clear() {
        let (_dir, store) = fixture();
        assert_eq!(store.preload(&["en", "de", "it"]).unwrap(), 2);
        assert_eq!(names(store.cached_locales()), vec!["de", "en"]);

        store.clear_cache();
        assert!(store.cached_locales().is_empty());
        assert!(!store.is_loaded("en"));
    }
}
