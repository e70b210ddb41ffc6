//! # nelumbo-core
//!
//! Core types, settings, route table, and error types for the nelumbo framework.
//! This crate has zero framework dependencies and provides the foundation for the
//! template engine and the command-line front end.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Framework settings with the defaults of a fresh project
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`routes`] - The read-only route table consumed by `{% url %}`
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod routes;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{NelumboError, NelumboResult};
pub use routes::{Route, RouteTable};
pub use settings::Settings;
