//! Simple example demonstrating ARB-backed localisation.

use lokal_common_config::LocalizationConfig;
use lokal_common_log::{init, LogConfig};
use lokal_i18n::{args, LocaleManager, Localizations};
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(LogConfig::from_env())?;

    println!("=== Lokal i18n Example ===");

    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("app_en.arb"),
        r#"{
            "@@locale": "en",
            "welcome": "Welcome, {name}!",
            "inbox": "{count, plural, =0{No messages} one{One message} other{{count} messages}}",
            "shared": "{gender, select, male{He shared a file} female{She shared a file} other{They shared a file}}"
        }"#,
    )?;
    fs::write(
        dir.path().join("app_es.arb"),
        r#"{
            "@@locale": "es",
            "welcome": "¡Bienvenido, {name}!",
            "inbox": "{count, plural, =0{Sin mensajes} one{Un mensaje} other{{count} mensajes}}"
        }"#,
    )?;

    let config = LocalizationConfig::for_dir(dir.path())
        .with_default_locale("en")
        .with_auto_detect(false);
    let l10n = Localizations::new(config)?;
    println!("Supported: {:?}", l10n.supported_locales());
    println!("Current locale: {}", l10n.current_locale());

    println!("Translation: '{}'", l10n.t("welcome", &args! { "name" => "Ana" })?);
    for count in [0, 1, 7] {
        println!("Plural ({count}): '{}'", l10n.plural("inbox", count, &args! {})?);
    }
    println!("Select: '{}'", l10n.t("shared", &args! { "gender" => "female" })?);

    l10n.on_locale_change(|tag| {
        println!("-> locale changed to {tag}");
        Ok(())
    });
    l10n.set_locale("es_MX")?;

    println!("Translation: '{}'", l10n.t("welcome", &args! { "name" => "María" })?);
    println!("Plural (3): '{}'", l10n.plural("inbox", 3, &args! {})?);
    // Not translated to Spanish; falls back to English.
    println!("Fallback: '{}'", l10n.t("shared", &args! { "gender" => "x" })?);

    match l10n.t("missing.key", &args! {}) {
        Ok(text) => println!("Missing key: '{text}'"),
        Err(e) => println!("Missing key: {e}"),
    }

    println!("\n=== Locale Resolution Examples ===");

    let manager = LocaleManager::new(["en", "en-GB", "es", "pt-BR"], "en");
    for requested in ["en-US", "EN_gb", "es-AR", "pt", "ja", ""] {
        let chain: Vec<String> = manager
            .fallback_chain(requested)
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "'{}' -> {} (chain: {:?})",
            requested,
            manager.resolve(requested),
            chain
        );
    }

    Ok(())
}
