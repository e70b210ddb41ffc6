//! Settings system for the nelumbo framework.
//!
//! This module provides the [`Settings`] struct, which holds the configuration the
//! template engine consumes: where templates live, where partials are included
//! from, and the base URL for static assets.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The complete set of framework settings.
///
/// Defaults match the layout of a freshly created project: templates under
/// `templates/`, partials under `templates/includes/`, error pages under
/// `templates/errors/` and static assets served from `assets`.
///
/// # Examples
///
/// ```
/// use nelumbo_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.static_url, "assets");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,

    // ── Templates ────────────────────────────────────────────────────

    /// The template root directory.
    pub template_dir: PathBuf,
    /// The extension appended to every template name.
    pub template_extension: String,
    /// Subdirectory path components (below `template_dir`) holding partials for `{% include %}`.
    pub includes_dir: Vec<String>,
    /// Subdirectory (below `template_dir`) holding `error_generic`.
    pub error_dir: String,

    // ── Static files ─────────────────────────────────────────────────

    /// Base URL for static assets, consumed by `{% static %}`.
    pub static_url: String,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "nelumbo_template=trace").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Core
            debug: false,

            // Templates
            template_dir: PathBuf::from("templates"),
            template_extension: "html".to_string(),
            includes_dir: vec!["includes".to_string()],
            error_dir: "errors".to_string(),

            // Static files
            static_url: "assets".to_string(),

            // Logging
            log_level: "info".to_string(),

            // Extra
            extra: HashMap::new(),
        }
    }
}
