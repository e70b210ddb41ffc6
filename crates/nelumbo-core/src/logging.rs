//! Logging integration for the nelumbo framework.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-render spans.

use crate::settings::Settings;

/// Target of the template engine's events.
const ENGINE_TARGET: &str = "nelumbo_template";

/// Returns the env-filter directives for `settings`.
///
/// In debug mode the engine's layer and buffering traces are switched on
/// unless `log_level` already sets a level for the engine.
pub fn filter_directives(settings: &Settings) -> String {
    let level = settings.log_level.trim();
    let level = if level.is_empty() { "info" } else { level };
    if settings.debug && !level.contains(ENGINE_TARGET) {
        format!("{level},{ENGINE_TARGET}=trace")
    } else {
        level.to_string()
    }
}

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter comes from [`filter_directives`]; an unparsable `log_level`
/// falls back to `info`. In debug mode a pretty, human-readable format is
/// used; otherwise a structured JSON format is used. Installing a second
/// subscriber is a silent no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(filter_directives(settings))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one template render.
///
/// Every event emitted while the render session runs carries the name of the
/// template that was requested.
///
/// # Examples
///
/// ```
/// use nelumbo_core::logging::render_span;
///
/// let span = render_span("home");
/// let _guard = span.enter();
/// tracing::debug!("rendering");
/// ```
pub fn render_span(template: &str) -> tracing::Span {
    tracing::debug_span!("render", template = template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_plain() {
        let settings = Settings {
            log_level: "warn".to_string(),
            ..Settings::default()
        };
        assert_eq!(filter_directives(&settings), "warn");
    }

    #[test]
    fn test_filter_directives_empty_level() {
        let settings = Settings {
            log_level: "  ".to_string(),
            ..Settings::default()
        };
        assert_eq!(filter_directives(&settings), "info");
    }

    #[test]
    fn test_filter_directives_debug_traces_engine() {
        let settings = Settings {
            debug: true,
            ..Settings::default()
        };
        assert_eq!(filter_directives(&settings), "info,nelumbo_template=trace");

        let settings = Settings {
            debug: true,
            log_level: "nelumbo_template=debug".to_string(),
            ..Settings::default()
        };
        assert_eq!(filter_directives(&settings), "nelumbo_template=debug");
    }

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings::default();
        setup_logging(&settings);
        setup_logging(&settings);
    }
}
