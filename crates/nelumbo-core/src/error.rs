//! Core error types for the nelumbo framework.
//!
//! This module provides the error enum [`NelumboError`]. Only failures that abort a
//! whole render (or a whole command) are represented here; failures a template can
//! recover from are rendered inline by the template engine and never surface as an
//! `Err`.

use thiserror::Error;

/// The primary error type for the nelumbo framework.
///
/// Each variant is fatal for the operation that produced it. The template
/// engine returns [`TemplateNotFound`](NelumboError::TemplateNotFound) and
/// [`MissingCollection`](NelumboError::MissingCollection) to abort a render;
/// the settings loader returns
/// [`ConfigurationError`](NelumboError::ConfigurationError).
#[derive(Error, Debug)]
pub enum NelumboError {
    // ── Templates ────────────────────────────────────────────────────

    /// The requested template (or a template it extends) does not exist.
    #[error("Template does not exist: {0}")]
    TemplateNotFound(String),

    /// A `{% for %}` loop iterates over a top-level name missing from the data.
    #[error("Missing collection: {0}")]
    MissingCollection(String),

    /// A template extends itself, directly or through its parents.
    #[error("Template inheritance cycle at: {0}")]
    InheritanceCycle(String),

    /// A buffering session was requested while another one was still open.
    #[error("Buffering session already active: {0}")]
    SessionAlreadyActive(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred while decoding data or route files.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl NelumboError {
    /// Returns `true` for the errors raised while resolving a template render.
    pub const fn is_render_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound(_)
                | Self::MissingCollection(_)
                | Self::InheritanceCycle(_)
                | Self::SessionAlreadyActive(_)
        )
    }
}

/// A convenience type alias for `Result<T, NelumboError>`.
pub type NelumboResult<T> = Result<T, NelumboError>;
