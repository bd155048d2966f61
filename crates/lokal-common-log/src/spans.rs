//! Tracing spans for localisation operations.
//!
//! Locale switches get an info span, bundle parses get an info span with a
//! deferred `error` field, and individual lookups get a debug span so they
//! only show up when translation tracing is asked for.

use std::time::{Duration, Instant};
use tracing::{debug_span, info_span, Span};

/// Span covering a change of the active locale.
pub fn locale_span(requested: &str) -> Span {
    info_span!("locale", requested = %requested)
}

/// Span covering the parse of one resource bundle. The `error` field is
/// filled by [`record_error`] when the parse fails.
pub fn bundle_span(locale: &str, path: &str) -> Span {
    info_span!(
        "bundle",
        locale = %locale,
        path = %path,
        error = tracing::field::Empty
    )
}

/// Span covering one key lookup through the fallback chain.
pub fn translate_span(key: &str, locale: &str) -> Span {
    debug_span!("translate", key = %key, locale = %locale)
}

/// Record `error` on the current span's `error` field.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", tracing::field::display(error));
}

/// Measures how long a bundle takes to read and parse.
#[derive(Debug)]
pub struct LoadTimer {
    started: Instant,
}

impl LoadTimer {
    /// Start timing now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Time since [`start`](Self::start).
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log the load at debug level with its entry count.
    pub fn finish(self, entries: usize) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!(
            entries,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "bundle parsed"
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    fn with_subscriber<F>(f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::new("trace"))
            .finish();

        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_spans_nest() {
        with_subscriber(|| {
            let locale = locale_span("de_DE");
            let _outer = locale.enter();

            let bundle = bundle_span("de-DE", "/tmp/app_de_DE.arb");
            let _middle = bundle.enter();

            let translate = translate_span("greeting", "de-DE");
            let _inner = translate.enter();

            tracing::info!("nested lookup");
        });
    }

    #[test]
    fn test_record_error_on_bundle_span() {
        with_subscriber(|| {
            let span = bundle_span("fr", "/missing/app_fr.arb");
            let _guard = span.enter();

            let error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
            record_error(&error);
        });
    }

    #[test]
    fn test_load_timer() {
        let timer = LoadTimer::start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
        assert!(timer.finish(12) >= Duration::from_millis(5));
    }
}
