//! The `render` command.
//!
//! Renders one template of the project with data read from a JSON file and
//! writes the page to standard output or to `--output`.

use std::path::Path;

use nelumbo_core::{NelumboError, RouteTable, Settings};
use nelumbo_template::{Context, Engine};

use crate::command::{output_argument, write_output, ManagementCommand};

/// Renders a template to HTML.
pub struct RenderCommand;

/// Reads the template data from a JSON file holding an object.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, and a
/// `SerializationError` if it does not hold a JSON object.
pub fn load_context(path: &Path) -> Result<Context, NelumboError> {
    let json = std::fs::read_to_string(path)?;
    Context::from_json_str(&json)
}

/// Builds the engine for `settings`, with routes from `routes` if given.
pub fn build_engine(settings: &Settings, routes: Option<&Path>) -> Result<Engine, NelumboError> {
    let mut engine = Engine::from_settings(settings);
    if let Some(path) = routes {
        let table = RouteTable::from_json_file(path)?;
        tracing::debug!(routes = table.len(), "route table loaded");
        engine.set_routes(table);
    }
    Ok(engine)
}

impl ManagementCommand for RenderCommand {
    fn name(&self) -> &'static str {
        "render"
    }

    fn help(&self) -> &'static str {
        "Render a template to HTML"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        let cmd = cmd
            .arg(
                clap::Arg::new("template")
                    .help("Template name, relative to the template directory and without extension")
                    .required(true),
            )
            .arg(
                clap::Arg::new("data")
                    .long("data")
                    .short('d')
                    .value_name("FILE")
                    .help("JSON file holding the template data"),
            )
            .arg(
                clap::Arg::new("routes")
                    .long("routes")
                    .value_name("FILE")
                    .help("JSON file mapping paths to routes, used by {% url %}"),
            );
        output_argument(cmd)
    }

    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> Result<(), NelumboError> {
        let template = matches.get_one::<String>("template").ok_or_else(|| {
            NelumboError::ConfigurationError("template argument is required".to_string())
        })?;

        let context = match matches.get_one::<String>("data") {
            Some(path) => load_context(Path::new(path))?,
            None => Context::new(),
        };
        let engine = build_engine(
            settings,
            matches.get_one::<String>("routes").map(Path::new),
        )?;

        let page = engine.render(template, &context)?;
        tracing::info!(template = %template, bytes = page.len(), "template rendered");
        write_output(matches, &page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_metadata() {
        let cmd = RenderCommand;
        assert_eq!(cmd.name(), "render");
        assert!(!cmd.help().is_empty());
    }

    #[test]
    fn test_arguments() {
        let cmd = RenderCommand.add_arguments(clap::Command::new("render"));
        let matches = cmd
            .try_get_matches_from(["render", "home", "--data", "d.json", "-o", "out.html"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("template").unwrap(), "home");
        assert_eq!(matches.get_one::<String>("data").unwrap(), "d.json");
        assert_eq!(matches.get_one::<String>("output").unwrap(), "out.html");
        assert!(matches.get_one::<String>("routes").is_none());
    }

    #[test]
    fn test_template_required() {
        let cmd = RenderCommand.add_arguments(clap::Command::new("render"));
        assert!(cmd.try_get_matches_from(["render"]).is_err());
    }

    #[test]
    fn test_load_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"user": {"name": "Ada"}}"#).unwrap();
        let ctx = load_context(&path).unwrap();
        assert_eq!(ctx.get("user.name").unwrap().to_display_string(), "Ada");

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            load_context(&path),
            Err(NelumboError::SerializationError(_))
        ));
        assert!(matches!(
            load_context(&dir.path().join("absent.json")),
            Err(NelumboError::IoError(_))
        ));
    }

    #[test]
    fn test_build_engine_with_routes() {
        let dir = tempfile::tempdir().unwrap();
        let routes = dir.path().join("routes.json");
        std::fs::write(
            &routes,
            r#"{"/groups": {"target": "Group::list", "name": "groups"}}"#,
        )
        .unwrap();
        let engine = build_engine(&Settings::default(), Some(&routes)).unwrap();
        assert_eq!(engine.routes().reverse("groups"), Some("/groups"));
    }
}
