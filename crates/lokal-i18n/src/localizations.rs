//! The localisation facade.

use crate::detect::detect_system_locale;
use crate::error::{I18nError, Result};
use crate::format::{CompiledPattern, MessageFormatter};
use crate::locale::{LocaleManager, LocaleTag};
use crate::observer::{ObserverId, ObserverRegistry, ObserverResult};
use crate::store::TranslationStore;
use crate::value::{FormatArgs, FormatValue};
use crate::watch::{HotReloadWatcher, ResourceChange};
use lokal_common_config::LocalizationConfig;
use lokal_common_log::spans::{locale_span, translate_span};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Current locale and the formatter bound to it.
struct ActiveLocale {
    locale: LocaleTag,
    formatter: Arc<MessageFormatter>,
}

struct Inner {
    config: LocalizationConfig,
    store: TranslationStore,
    locales: RwLock<LocaleManager>,
    active: RwLock<ActiveLocale>,
    locale_observers: ObserverRegistry<LocaleTag>,
    update_observers: ObserverRegistry<Path>,
}

impl Inner {
    fn formatter(&self, locale: &LocaleTag) -> Arc<MessageFormatter> {
        Arc::new(MessageFormatter::with_capacity(
            locale.clone(),
            self.config.pattern_cache_capacity,
        ))
    }

    /// Invalidate after a resource file changed, then tell observers.
    fn apply_change(&self, change: &ResourceChange) {
        if let Err(e) = self.store.reload_all() {
            warn!(path = %change.path.display(), error = %e, "reload after change failed");
        }

        if self.config.supported_locales.is_empty() {
            match self.store.discover_locales() {
                Ok(found) => {
                    let mut locales = self.locales.write();
                    for tag in &found {
                        if !locales.is_supported(tag.as_str()) {
                            info!(locale = %tag, "new locale discovered");
                            locales.add_locale(tag.as_str());
                        }
                    }

                    let gone: Vec<LocaleTag> = locales
                        .supported_locales()
                        .iter()
                        .filter(|tag| !found.contains(*tag) && *tag != locales.fallback_locale())
                        .cloned()
                        .collect();
                    for tag in gone {
                        match locales.remove_locale(tag.as_str()) {
                            Ok(_) => info!(locale = %tag, "locale removed from resource directory"),
                            Err(e) => warn!(locale = %tag, error = %e, "cannot drop removed locale"),
                        }
                    }
                }
                Err(e) => warn!(error = %e, "locale discovery failed"),
            }
        }

        self.update_observers
            .notify(change.path.as_path(), "translations_updated");
    }
}

/// Translation entry point composing locale resolution, the resource store
/// and message formatting.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Localizations {
    inner: Arc<Inner>,
    watcher: Mutex<Option<HotReloadWatcher>>,
}

impl Localizations {
    /// Build from a configuration.
    ///
    /// Supported locales come from the configuration or, when it lists
    /// none, from the resource directory. The initial locale is the
    /// configured default, else the detected system locale (if enabled),
    /// else the fallback, resolved against the supported set.
    pub fn new(config: LocalizationConfig) -> Result<Self> {
        config.validate()?;

        let store = TranslationStore::new(&config.arb_dir, &config.file_extension);

        let supported: Vec<String> = if config.supported_locales.is_empty() {
            store
                .discover_locales()?
                .into_iter()
                .map(|tag| tag.to_string())
                .collect()
        } else {
            config.supported_locales.clone()
        };
        if supported.is_empty() {
            warn!(directory = %config.arb_dir.display(), "no resource files found");
        }

        let manager = LocaleManager::new(&supported, &config.fallback_locale);

        let requested = match &config.default_locale {
            Some(locale) => locale.clone(),
            None if config.auto_detect_locale => detect_system_locale()
                .map(|tag| tag.to_string())
                .unwrap_or_else(|| manager.fallback_locale().to_string()),
            None => manager.fallback_locale().to_string(),
        };
        let locale = manager.resolve(&requested);

        let formatter = Arc::new(MessageFormatter::with_capacity(
            locale.clone(),
            config.pattern_cache_capacity,
        ));

        info!(
            locale = %locale,
            fallback = %manager.fallback_locale(),
            supported = ?manager.supported_locales(),
            "localizations initialized"
        );

        let hot_reload = config.hot_reload;
        let localizations = Self {
            inner: Arc::new(Inner {
                config,
                store,
                locales: RwLock::new(manager),
                active: RwLock::new(ActiveLocale { locale, formatter }),
                locale_observers: ObserverRegistry::new(),
                update_observers: ObserverRegistry::new(),
            }),
            watcher: Mutex::new(None),
        };

        if hot_reload {
            localizations.enable_hot_reload()?;
        }
        Ok(localizations)
    }

    /// Build with default settings over a resource directory.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        Self::new(LocalizationConfig::for_dir(directory))
    }

    /// Build from `LOKAL_*` environment variables and `.env` files.
    pub fn from_env() -> Result<Self> {
        Self::new(LocalizationConfig::from_env()?)
    }

    /// The configuration this instance was built from.
    pub fn config(&self) -> &LocalizationConfig {
        &self.inner.config
    }

    /// The underlying resource store.
    pub fn store(&self) -> &TranslationStore {
        &self.inner.store
    }

    /// The active locale.
    pub fn current_locale(&self) -> LocaleTag {
        self.inner.active.read().locale.clone()
    }

    /// Supported locales. Grows and shrinks with hot reload when the
    /// configuration lists none.
    pub fn supported_locales(&self) -> Vec<LocaleTag> {
        self.inner.locales.read().supported_locales().to_vec()
    }

    /// Last resort of every fallback chain.
    pub fn fallback_locale(&self) -> LocaleTag {
        self.inner.locales.read().fallback_locale().clone()
    }

    /// Switch the current locale and notify locale observers.
    ///
    /// The resolved locale's bundle is loaded first. Fails with
    /// [`I18nError::LocaleNotFound`] when no resource file exists for it and
    /// with [`I18nError::Parse`] when the file is broken. On failure the
    /// current locale is unchanged.
    pub fn set_locale(&self, locale: &str) -> Result<LocaleTag> {
        let span = locale_span(locale);
        let _guard = span.enter();

        let resolved = self.inner.locales.read().resolve(locale);

        match self.inner.store.load_locale(resolved.as_str()) {
            Ok(_) => {}
            Err(I18nError::LocaleNotFound { available, .. }) => {
                return Err(I18nError::LocaleNotFound {
                    locale: locale.to_string(),
                    available,
                });
            }
            Err(e) => return Err(e),
        }

        let formatter = self.inner.formatter(&resolved);
        let previous = {
            let mut active = self.inner.active.write();
            let previous = std::mem::replace(&mut active.locale, resolved.clone());
            active.formatter = formatter;
            previous
        };

        info!(from = %previous, to = %resolved, "locale changed");
        self.inner
            .locale_observers
            .notify(&resolved, "locale_change");
        Ok(resolved)
    }

    /// Translate `key` in the current locale.
    ///
    /// Walks the fallback chain and formats the first entry found. A
    /// formatting failure is logged and the raw pattern returned; only a
    /// key missing from every locale in the chain is an error.
    pub fn translate(&self, key: &str, args: &FormatArgs) -> Result<String> {
        let (locale, formatter) = {
            let active = self.inner.active.read();
            (active.locale.clone(), Arc::clone(&active.formatter))
        };
        self.lookup_and_format(key, &locale, args, |pattern| formatter.format(pattern, args))
    }

    /// Translate `key` for an explicit locale without changing the current
    /// one.
    pub fn translate_in(&self, locale: &str, key: &str, args: &FormatArgs) -> Result<String> {
        let locale = self.inner.locales.read().normalize(locale);
        if locale == self.current_locale() {
            return self.translate(key, args);
        }
        self.lookup_and_format(key, &locale, args, |pattern| {
            CompiledPattern::compile(pattern, &locale).format(args)
        })
    }

    fn lookup_and_format<F>(
        &self,
        key: &str,
        locale: &LocaleTag,
        args: &FormatArgs,
        format: F,
    ) -> Result<String>
    where
        F: Fn(&str) -> Result<String>,
    {
        let span = translate_span(key, locale.as_str());
        let _guard = span.enter();

        let chain = self.inner.locales.read().fallback_chain(locale.as_str());
        for candidate in &chain {
            let Some(entry) = self.inner.store.get_translation(candidate.as_str(), key) else {
                continue;
            };
            if candidate != locale {
                debug!(key, requested = %locale, found = %candidate, "using fallback translation");
            }

            let formatted = args
                .check_declared_types(&entry)
                .and_then(|()| format(entry.value()));
            return match formatted {
                Ok(text) => Ok(text),
                Err(e) => {
                    error!(key, locale = %candidate, error = %e, "formatting failed, returning raw pattern");
                    Ok(entry.value().to_string())
                }
            };
        }

        Err(I18nError::TranslationKey {
            key: key.to_string(),
            locale: locale.to_string(),
        })
    }

    /// Shorthand for [`translate`](Self::translate).
    pub fn t(&self, key: &str, args: &FormatArgs) -> Result<String> {
        self.translate(key, args)
    }

    /// Translate a plural message, supplying `count`.
    pub fn plural(
        &self,
        key: &str,
        count: impl Into<FormatValue>,
        args: &FormatArgs,
    ) -> Result<String> {
        let args = args.clone().with("count", count);
        self.translate(key, &args)
    }

    /// Whether `key` exists in `locale` (the current locale if `None`),
    /// without walking the fallback chain.
    pub fn has_key(&self, key: &str, locale: Option<&str>) -> bool {
        let locale = locale
            .map(String::from)
            .unwrap_or_else(|| self.current_locale().to_string());
        self.inner.store.get_translation(&locale, key).is_some()
    }

    /// Every key of `locale` (the current locale if `None`), sorted.
    /// Empty when the locale has no resource file.
    pub fn all_keys(&self, locale: Option<&str>) -> Vec<String> {
        let locale = locale
            .map(String::from)
            .unwrap_or_else(|| self.current_locale().to_string());
        match self.inner.store.load_locale(&locale) {
            Ok(bundle) => bundle.keys().into_iter().map(String::from).collect(),
            Err(e) => {
                debug!(locale = %locale, error = %e, "no keys for locale");
                Vec::new()
            }
        }
    }

    /// Add a supported locale, returning its normalized tag.
    pub fn add_locale(&self, locale: &str) -> LocaleTag {
        self.inner.locales.write().add_locale(locale)
    }

    /// Remove a supported locale. The fallback cannot be removed.
    pub fn remove_locale(&self, locale: &str) -> Result<bool> {
        self.inner.locales.write().remove_locale(locale)
    }

    /// Re-read every loaded locale from disk.
    pub fn reload_translations(&self) -> Result<()> {
        self.inner.store.reload_all()?;
        info!("translations reloaded");
        Ok(())
    }

    /// Register an observer called with the new locale after each
    /// successful [`set_locale`](Self::set_locale).
    pub fn on_locale_change<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&LocaleTag) -> ObserverResult + Send + Sync + 'static,
    {
        self.inner.locale_observers.register(observer)
    }

    /// Register an observer called with the changed file after hot reload
    /// has invalidated the cache.
    pub fn on_translations_updated<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Path) -> ObserverResult + Send + Sync + 'static,
    {
        self.inner.update_observers.register(observer)
    }

    /// Remove an observer of either kind.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.locale_observers.remove(id) || self.inner.update_observers.remove(id)
    }

    /// Start watching the resource directory. A no-op if already watching.
    pub fn enable_hot_reload(&self) -> Result<()> {
        let mut watcher = self.watcher.lock();
        if watcher.as_ref().is_some_and(HotReloadWatcher::is_watching) {
            warn!("hot reload is already enabled");
            return Ok(());
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let started = HotReloadWatcher::start(
            &self.inner.config.arb_dir,
            &self.inner.config.file_extension,
            move |change| {
                if let Some(inner) = inner.upgrade() {
                    inner.apply_change(change);
                }
            },
        )?;
        *watcher = Some(started);
        info!("hot reload enabled");
        Ok(())
    }

    /// Stop watching. Safe to call when not watching.
    pub fn disable_hot_reload(&self) {
        if let Some(mut watcher) = self.watcher.lock().take() {
            watcher.stop();
            info!("hot reload disabled");
        }
    }

    /// Whether the resource directory is being watched.
    pub fn is_hot_reloading(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .is_some_and(HotReloadWatcher::is_watching)
    }
}

impl std::fmt::Debug for Localizations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Localizations")
            .field("directory", &self.inner.config.arb_dir)
            .field("locale", &self.current_locale())
            .field("hot_reload", &self.is_hot_reloading())
            .finish()
    }
}
