//! # nelumbo
//!
//! A line-oriented HTML template engine.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient access.
//! You can depend on `nelumbo` to get everything, or depend on individual
//! crates for finer-grained control.
//!
//! ```
//! use nelumbo::template::{Context, Engine};
//!
//! let engine = Engine::new();
//! engine.add_string_template("hello", "{% for n in names %}<b>{{ n }}</b>{% endfor %}");
//!
//! let ctx = Context::from_json(nelumbo::serde_json::json!({"names": ["Ada", "Bo"]})).unwrap();
//! assert_eq!(engine.render("hello", &ctx).unwrap(), "<b>Ada</b><b>Bo</b>");
//! ```

/// Core types, settings, the route table and error types.
pub use nelumbo_core as core;

/// The template engine.
pub use nelumbo_template as template;

/// The command-line front end.
#[cfg(feature = "cli")]
pub use nelumbo_cli as cli;

pub use nelumbo_core::{NelumboError, NelumboResult, Settings};
pub use nelumbo_template::{Context, ContextValue, Engine};

pub use serde_json;
pub use tracing;
