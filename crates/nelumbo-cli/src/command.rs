//! Command framework for the `nelumbo` binary.
//!
//! This module provides the [`ManagementCommand`] trait for defining CLI
//! commands and [`CommandRegistry`] for registering and dispatching them.
//!
//! ## Defining a Custom Command
//!
//! ```rust,no_run
//! use nelumbo_cli::command::ManagementCommand;
//! use nelumbo_core::{NelumboError, Settings};
//!
//! struct GreetCommand;
//!
//! impl ManagementCommand for GreetCommand {
//!     fn name(&self) -> &'static str { "greet" }
//!     fn help(&self) -> &'static str { "Say hello" }
//!
//!     fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!     ) -> Result<(), NelumboError> {
//!         println!("Hello from nelumbo!");
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use nelumbo_core::{NelumboError, Settings};

/// A command that can be registered and invoked through the CLI.
pub trait ManagementCommand: Send + Sync {
    /// Returns the name of this command (used to invoke it from the CLI).
    fn name(&self) -> &'static str;

    /// Returns a short help description for this command.
    fn help(&self) -> &'static str;

    /// Adds custom arguments to the clap command.
    ///
    /// The default implementation returns the command unchanged.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Executes the command with the given argument matches and settings.
    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings)
        -> Result<(), NelumboError>;
}

/// A registry of commands, keyed by name.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn ManagementCommand>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Creates a new empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registers a command. A command with the same name is replaced.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name(), command);
    }

    /// Returns the command with the given name, if registered.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns a sorted list of all registered command names.
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the top-level clap `Command` with every registered subcommand
    /// and the global `--config` and `--env` options.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("nelumbo")
            .about("Render nelumbo templates from the command line")
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(true)
            .arg(
                clap::Arg::new("config")
                    .long("config")
                    .short('c')
                    .global(true)
                    .value_name("FILE")
                    .help("Settings file (.toml or .json)"),
            )
            .arg(
                clap::Arg::new("env")
                    .long("env")
                    .global(true)
                    .action(clap::ArgAction::SetTrue)
                    .help("Apply NELUMBO_* environment overrides to the settings"),
            );

        let mut entries: Vec<_> = self.commands.iter().collect();
        entries.sort_by_key(|(name, _)| **name);

        for (name, cmd) in entries {
            let subcmd = clap::Command::new(*name).about(cmd.help());
            app = app.subcommand(cmd.add_arguments(subcmd));
        }

        app
    }

    /// Dispatches to the command named by the parsed subcommand.
    pub fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), NelumboError> {
        let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
            NelumboError::ConfigurationError("No subcommand specified".to_string())
        })?;

        let cmd = self.get(name).ok_or_else(|| {
            NelumboError::ConfigurationError(format!("Unknown command: {name}"))
        })?;

        tracing::debug!(command = name, "executing command");
        cmd.handle(sub_matches, settings)
    }
}

/// Adds the `--output FILE` option shared by commands that produce a page.
pub fn output_argument(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        clap::Arg::new("output")
            .long("output")
            .short('o')
            .value_name("FILE")
            .help("Write the page to FILE instead of standard output"),
    )
}

/// Writes a page to the `--output` file, or to standard output.
pub fn write_output(matches: &clap::ArgMatches, page: &str) -> Result<(), NelumboError> {
    match matches.get_one::<String>("output") {
        Some(path) => {
            std::fs::write(Path::new(path), page)?;
            tracing::info!(path = %path, bytes = page.len(), "page written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(page.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
