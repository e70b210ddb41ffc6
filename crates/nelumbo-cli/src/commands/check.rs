//! The `check` command.
//!
//! Inspects the settings and the template directory for problems that would
//! otherwise only surface while rendering.

use nelumbo_core::{NelumboError, Settings};
use nelumbo_template::engine::ERROR_TEMPLATE;
use nelumbo_template::loaders::FileSystemLoader;

use crate::command::ManagementCommand;

/// Runs project checks.
pub struct CheckCommand;

/// The result of a single check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    /// The severity level of this check result.
    pub level: CheckLevel,
    /// A human-readable description of the issue.
    pub msg: String,
    /// An optional hint for how to resolve the issue.
    pub hint: Option<String>,
    /// A unique identifier for this check (e.g. "templates.E001").
    pub id: String,
}

/// Severity levels for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Runs every check against the given settings.
pub fn run_checks(settings: &Settings) -> Vec<CheckMessage> {
    let mut messages = Vec::new();

    if !settings.template_dir.is_dir() {
        messages.push(CheckMessage {
            level: CheckLevel::Error,
            msg: format!(
                "Template directory {} does not exist",
                settings.template_dir.display()
            ),
            hint: Some("Set template_dir to the directory holding your templates".to_string()),
            id: "templates.E001".to_string(),
        });
        // Nothing below the root can exist either.
        return messages;
    }

    let mut includes = settings.template_dir.clone();
    includes.extend(&settings.includes_dir);
    if !includes.is_dir() {
        messages.push(CheckMessage {
            level: CheckLevel::Warning,
            msg: format!("Includes directory {} does not exist", includes.display()),
            hint: Some("Every {% include %} will render an inline error".to_string()),
            id: "templates.W001".to_string(),
        });
    }

    let loader = FileSystemLoader::new(
        settings.template_dir.clone(),
        settings.template_extension.clone(),
    );
    let error_page = loader.resolve(ERROR_TEMPLATE, std::slice::from_ref(&settings.error_dir));
    if !error_page.is_file() {
        messages.push(CheckMessage {
            level: CheckLevel::Warning,
            msg: format!("Error page {} does not exist", error_page.display()),
            hint: Some("Error pages will fall back to a plain-text line".to_string()),
            id: "templates.W002".to_string(),
        });
    }

    if settings.static_url.is_empty() {
        messages.push(CheckMessage {
            level: CheckLevel::Warning,
            msg: "static_url is empty".to_string(),
            hint: Some("{% static %} paths will be relative to the page".to_string()),
            id: "static.W001".to_string(),
        });
    }

    messages
}

impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Check the project settings and template layout"
    }

    fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> Result<(), NelumboError> {
        let messages = run_checks(settings);

        if messages.is_empty() {
            tracing::info!("Check identified no issues");
            return Ok(());
        }

        let errors = messages.iter().filter(|m| m.level >= CheckLevel::Error).count();
        let warnings = messages.iter().filter(|m| m.level == CheckLevel::Warning).count();

        for msg in &messages {
            let hint_text = msg
                .hint
                .as_ref()
                .map_or(String::new(), |h| format!("\n\tHINT: {h}"));
            tracing::warn!("{} ({}): {}{}", msg.level, msg.id, msg.msg, hint_text);
        }

        tracing::info!(
            "Check identified {} issue(s) ({} error(s), {} warning(s))",
            messages.len(),
            errors,
            warnings
        );

        if errors > 0 {
            return Err(NelumboError::ConfigurationError(format!(
                "Check found {errors} error(s)"
            )));
        }

        Ok(())
    }
}
