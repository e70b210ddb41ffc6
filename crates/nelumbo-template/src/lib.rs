//! # nelumbo-template
//!
//! A line-oriented template engine. Templates are plain text with embedded
//! directives for inheritance (`extends`/`block`), inclusion, loops,
//! conditionals, static asset URLs, route reversal and interpolation.
//!
//! ## Modules
//!
//! - [`engine`] - The [`Engine`] entry point and response sinks
//! - [`renderer`] - One render session: dispatch and directive handlers
//! - [`layer`] - Named layers of template lines
//! - [`buffering`] - Depth-tracked capture of structural directive bodies
//! - [`tags`] - Directive patterns and tag-content extraction
//! - [`expression`] - `{{ }}` interpolation
//! - [`condition`] - `{% if %}` condition evaluation
//! - [`loops`] - `{% for %}` body expansion
//! - [`blocks`] - Block slot lookup and filling
//! - [`context`] - The data context and value model
//! - [`loaders`] - Template loaders

pub mod blocks;
pub mod buffering;
pub mod condition;
pub mod context;
pub mod engine;
pub mod expression;
pub mod layer;
pub mod loaders;
pub mod loops;
pub mod renderer;
pub mod tags;

pub use context::{Context, ContextValue};
pub use engine::{Engine, ResponseSink, WriterSink};
pub use renderer::RenderSession;
