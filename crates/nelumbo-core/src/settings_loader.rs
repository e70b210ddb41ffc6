//! Settings loading from configuration files.
//!
//! This module provides functions to load [`Settings`] from TOML files, JSON
//! files (the classic `server.json`), and to apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `NELUMBO_DEBUG` | `debug` |
//! | `NELUMBO_TEMPLATE_DIR` | `template_dir` |
//! | `NELUMBO_TEMPLATE_EXTENSION` | `template_extension` |
//! | `NELUMBO_INCLUDES_DIR` | `includes_dir` (comma-separated) |
//! | `NELUMBO_ERROR_DIR` | `error_dir` |
//! | `NELUMBO_STATIC_URL` | `static_url` |
//! | `NELUMBO_LOG_LEVEL` | `log_level` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use nelumbo_core::settings_loader;
//!
//! // Load from TOML
//! let settings = settings_loader::from_toml_file("config/settings.toml").unwrap();
//!
//! // Load from JSON with environment overrides
//! let settings = settings_loader::from_json_file_with_env("server.json").unwrap();
//! ```

use std::path::Path;

use crate::error::NelumboError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML will use the default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, NelumboError> {
    // Go through serde_json::Value so the file can be deep-merged over the
    // serialized defaults.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| NelumboError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_with_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, NelumboError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, NelumboError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, NelumboError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| NelumboError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_with_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, NelumboError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from a JSON file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> Result<Settings, NelumboError> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a file, picking the format from its extension.
///
/// `.toml` files are parsed as TOML; everything else is parsed as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed.
pub fn from_file(path: impl AsRef<Path>) -> Result<Settings, NelumboError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => from_toml_file(path),
        _ => from_json_file(path),
    }
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Supported environment variables:
///
/// - `NELUMBO_DEBUG` -> `debug` (values: "true"/"1"/"yes" => true, anything else => false)
/// - `NELUMBO_TEMPLATE_DIR` -> `template_dir`
/// - `NELUMBO_TEMPLATE_EXTENSION` -> `template_extension`
/// - `NELUMBO_INCLUDES_DIR` -> `includes_dir` (comma-separated path components)
/// - `NELUMBO_ERROR_DIR` -> `error_dir`
/// - `NELUMBO_STATIC_URL` -> `static_url`
/// - `NELUMBO_LOG_LEVEL` -> `log_level`
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("NELUMBO_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("NELUMBO_TEMPLATE_DIR") {
        settings.template_dir = val.into();
    }

    if let Ok(val) = std::env::var("NELUMBO_TEMPLATE_EXTENSION") {
        settings.template_extension = val;
    }

    if let Ok(val) = std::env::var("NELUMBO_INCLUDES_DIR") {
        settings.includes_dir = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if let Ok(val) = std::env::var("NELUMBO_ERROR_DIR") {
        settings.error_dir = val;
    }

    if let Ok(val) = std::env::var("NELUMBO_STATIC_URL") {
        settings.static_url = val;
    }

    if let Ok(val) = std::env::var("NELUMBO_LOG_LEVEL") {
        settings.log_level = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, NelumboError> {
    std::fs::read_to_string(path).map_err(|e| {
        NelumboError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

/// Deep-merges `value` over the serialized defaults and deserializes the result.
fn merge_with_defaults(value: serde_json::Value, format: &str) -> Result<Settings, NelumboError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        NelumboError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        NelumboError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = true
            template_dir = "site/templates"
            static_url = "/static"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.template_dir, PathBuf::from("site/templates"));
        assert_eq!(settings.static_url, "/static");
        // Defaults preserved
        assert_eq!(settings.template_extension, "html");
        assert_eq!(settings.error_dir, "errors");
    }

    #[test]
    fn test_from_toml_str_includes_dir() {
        let toml = r#"
            includes_dir = ["partials", "shared"]
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.includes_dir, vec!["partials", "shared"]);
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.static_url, "assets");
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("[[invalid toml content");
        assert!(matches!(result, Err(NelumboError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_extra() {
        let toml = r#"
            [extra]
            site_name = "Lotus"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(
            settings.extra.get("site_name"),
            Some(&serde_json::json!("Lotus"))
        );
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{
            "template_dir": "../templates",
            "error_dir": "errs",
            "log_level": "debug"
        }"#;

        let settings = from_json_str(json).unwrap();
        assert_eq!(settings.template_dir, PathBuf::from("../templates"));
        assert_eq!(settings.error_dir, "errs");
        assert_eq!(settings.log_level, "debug");
        // Defaults preserved
        assert_eq!(settings.includes_dir, vec!["includes"]);
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    #[test]
    fn test_from_json_str_wrong_type() {
        let result = from_json_str(r#"{"debug": "maybe"}"#);
        assert!(matches!(result, Err(NelumboError::ConfigurationError(_))));
    }

    // ── File loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "static_url = \"/s\"\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert_eq!(settings.static_url, "/s");
    }

    #[test]
    fn test_from_file_picks_format() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("server.toml");
        std::fs::write(&toml_path, "error_dir = \"oops\"\n").unwrap();
        let json_path = dir.path().join("server.json");
        std::fs::write(&json_path, r#"{"error_dir": "uh-oh"}"#).unwrap();

        assert_eq!(from_file(&toml_path).unwrap().error_dir, "oops");
        assert_eq!(from_file(&json_path).unwrap().error_dir, "uh-oh");
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = from_json_file("/nonexistent/path/server.json");
        assert!(matches!(result, Err(NelumboError::ConfigurationError(_))));
    }

    // ── Environment variable overrides ──────────────────────────────

    #[test]
    fn test_apply_env_overrides_static_url() {
        let mut settings = Settings::default();
        std::env::set_var("NELUMBO_STATIC_URL", "https://cdn.example.com");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.static_url, "https://cdn.example.com");
        std::env::remove_var("NELUMBO_STATIC_URL");
    }

    #[test]
    fn test_apply_env_overrides_debug() {
        let mut settings = Settings::default();
        std::env::set_var("NELUMBO_DEBUG", "yes");
        apply_env_overrides(&mut settings);
        assert!(settings.debug);
        std::env::remove_var("NELUMBO_DEBUG");
    }

    #[test]
    fn test_apply_env_overrides_includes_dir() {
        let mut settings = Settings::default();
        std::env::set_var("NELUMBO_INCLUDES_DIR", "parts, , shared");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.includes_dir, vec!["parts", "shared"]);
        std::env::remove_var("NELUMBO_INCLUDES_DIR");
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3});
        let over = serde_json::json!({"a": {"b": 10}});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"b": 10, "c": 2}, "d": 3}));
    }

    #[test]
    fn test_toml_to_json_array() {
        let value: toml::Value = toml::from_str("x = [1, 2]").unwrap();
        assert_eq!(toml_to_json(value), serde_json::json!({"x": [1, 2]}));
    }
}
