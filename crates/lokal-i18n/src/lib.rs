//! Localisation for Lokal.
//!
//! Translations live in ARB resource bundles (one JSON file per locale).
//! [`Localizations`] is the entry point: it resolves locales against the
//! supported set, loads bundles lazily, walks the fallback chain for
//! missing keys and formats ICU-style patterns with placeholder, plural and
//! select constructs.
//!
//! ```no_run
//! use lokal_i18n::{args, Localizations};
//!
//! let l10n = Localizations::open("l10n")?;
//! l10n.set_locale("es")?;
//! let text = l10n.translate("items", &args! { "count" => 3 })?;
//! # Ok::<(), lokal_i18n::I18nError>(())
//! ```

pub mod arb;
pub mod detect;
pub mod error;
pub mod format;
pub mod locale;
pub mod localizations;
pub mod observer;
pub mod plural;
pub mod store;
pub mod value;
pub mod watch;

pub use arb::{
    locale_from_filename, placeholder_names, EntryKind, EntryMetadata, PlaceholderSpec,
    ResourceBundle, ResourceEntry, ValidationWarning,
};
pub use detect::detect_system_locale;
pub use error::{I18nError, Result};
pub use format::{format, CompiledPattern, MessageFormatter};
pub use locale::{parse_locale, LocaleManager, LocaleTag};
pub use localizations::Localizations;
pub use observer::{ObserverError, ObserverId, ObserverResult};
pub use plural::{categories_used, category_for, rule_for, PluralCategory, PluralRule};
pub use store::TranslationStore;
pub use value::{FormatArgs, FormatValue};
pub use watch::{ChangeKind, HotReloadWatcher, ResourceChange};
