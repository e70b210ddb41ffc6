//! # nelumbo-cli
//!
//! The `nelumbo` command-line front end.
//!
//! This crate provides:
//!
//! - **A command framework** - the [`ManagementCommand`] trait and the
//!   [`CommandRegistry`] that builds the clap command line and dispatches to it
//! - **Built-in commands** - `render`, `error-page` and `check`
//!
//! ## Quick Start
//!
//! ```rust
//! use nelumbo_cli::command::CommandRegistry;
//! use nelumbo_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert!(names.contains(&"render"));
//! assert!(names.contains(&"check"));
//! ```

// These clippy lints are intentionally allowed:
// - result_large_err: NelumboError is the crate-wide error type
// - doc_markdown: backtick requirements for documentation items are too strict
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]

pub mod command;
pub mod commands;

use std::ffi::OsString;
use std::path::Path;

use nelumbo_core::logging::setup_logging;
use nelumbo_core::settings_loader;
use nelumbo_core::{NelumboResult, Settings};

pub use command::{CommandRegistry, ManagementCommand};

/// Resolves the settings for a parsed command line.
///
/// Settings come from `--config` when given and from the defaults otherwise.
/// With `--env`, `NELUMBO_*` environment variables override both.
pub fn load_settings(matches: &clap::ArgMatches) -> NelumboResult<Settings> {
    let mut settings = match matches.get_one::<String>("config") {
        Some(path) => settings_loader::from_file(Path::new(path))?,
        None => Settings::default(),
    };
    if matches.get_flag("env") {
        settings_loader::apply_env_overrides(&mut settings);
    }
    Ok(settings)
}

/// Parses `args`, sets up logging and runs the selected command.
///
/// # Errors
///
/// Returns a `ConfigurationError` for a malformed command line, and
/// otherwise whatever the command itself returns.
pub fn run_from<I, T>(args: I) -> NelumboResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut registry = CommandRegistry::new();
    commands::register_builtin_commands(&mut registry);

    let matches = match registry.build_cli().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            e.print()?;
            return Ok(());
        }
        Err(e) => {
            return Err(nelumbo_core::NelumboError::ConfigurationError(
                e.render().to_string(),
            ))
        }
    };

    let settings = load_settings(&matches)?;
    setup_logging(&settings);
    registry.execute(&matches, &settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nelumbo_core::NelumboError;

    fn matches(args: &[&str]) -> clap::ArgMatches {
        let mut registry = CommandRegistry::new();
        commands::register_builtin_commands(&mut registry);
        registry.build_cli().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn test_load_settings_defaults() {
        let settings = load_settings(&matches(&["nelumbo", "check"])).unwrap();
        assert_eq!(settings.template_extension, "html");
    }

    #[test]
    fn test_load_settings_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nelumbo.toml");
        std::fs::write(&path, "static_url = \"/static/\"\ntemplate_extension = \"tpl\"\n").unwrap();
        let settings = load_settings(&matches(&[
            "nelumbo",
            "--config",
            path.to_str().unwrap(),
            "check",
        ]))
        .unwrap();
        assert_eq!(settings.static_url, "/static/");
        assert_eq!(settings.template_extension, "tpl");
    }

    #[test]
    fn test_load_settings_missing_file() {
        let result = load_settings(&matches(&["nelumbo", "-c", "/nonexistent/n.json", "check"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_run_from_rejects_unknown_command() {
        let err = run_from(["nelumbo", "serve"]).unwrap_err();
        assert!(matches!(err, NelumboError::ConfigurationError(_)));
    }
}
