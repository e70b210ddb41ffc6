//! Built-in commands.
//!
//! Each command implements the
//! [`ManagementCommand`](crate::command::ManagementCommand) trait.

pub mod check;
pub mod error_page;
pub mod render;

pub use check::CheckCommand;
pub use error_page::ErrorPageCommand;
pub use render::RenderCommand;

use crate::command::CommandRegistry;

/// Registers all built-in commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(RenderCommand));
    registry.register(Box::new(ErrorPageCommand));
    registry.register(Box::new(CheckCommand));
}
