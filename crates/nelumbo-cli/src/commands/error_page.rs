//! The `error-page` command: renders the project's generic error page.

use nelumbo_core::{NelumboError, Settings};
use nelumbo_template::Engine;

use crate::command::{output_argument, write_output, ManagementCommand};

pub struct ErrorPageCommand;

impl ManagementCommand for ErrorPageCommand {
    fn name(&self) -> &'static str {
        "error-page"
    }

    fn help(&self) -> &'static str {
        "Render the generic error page for a status code"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        let cmd = cmd
            .arg(
                clap::Arg::new("code")
                    .help("HTTP status code")
                    .value_parser(clap::value_parser!(u16))
                    .required(true),
            )
            .arg(
                clap::Arg::new("subtitle")
                    .help("Short title shown under the code")
                    .required(true),
            )
            .arg(
                clap::Arg::new("message")
                    .help("Longer explanation")
                    .default_value(""),
            );
        output_argument(cmd)
    }

    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> Result<(), NelumboError> {
        let code = matches.get_one::<u16>("code").copied().ok_or_else(|| {
            NelumboError::ConfigurationError("code argument is required".to_string())
        })?;
        let subtitle = matches
            .get_one::<String>("subtitle")
            .map_or("", String::as_str);
        let message = matches
            .get_one::<String>("message")
            .map_or("", String::as_str);

        let engine = Engine::from_settings(settings);
        let page = engine.render_error_page(code, subtitle, message)?;
        write_output(matches, &page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_metadata() {
        let cmd = ErrorPageCommand;
        assert_eq!(cmd.name(), "error-page");
        assert!(!cmd.help().is_empty());
    }

    #[test]
    fn test_code_must_be_numeric() {
        let cmd = ErrorPageCommand.add_arguments(clap::Command::new("error-page"));
        assert!(cmd
            .clone()
            .try_get_matches_from(["error-page", "abc", "Oops"])
            .is_err());
        let matches = cmd
            .try_get_matches_from(["error-page", "404", "Not Found"])
            .unwrap();
        assert_eq!(matches.get_one::<u16>("code"), Some(&404));
        assert_eq!(matches.get_one::<String>("message").unwrap(), "");
    }

    #[test]
    fn test_handle_writes_fallback_page() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("404.html");
        let settings = Settings {
            template_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let matches = ErrorPageCommand
            .add_arguments(clap::Command::new("error-page"))
            .try_get_matches_from([
                "error-page",
                "404",
                "Not Found",
                "No such page",
                "--output",
                out.to_str().unwrap(),
            ])
            .unwrap();
        ErrorPageCommand.handle(&matches, &settings).unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "404 Not Found: No such page"
        );
    }
}
