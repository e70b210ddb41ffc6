//! Depth-tracked capture of structural directive bodies.
//!
//! When the dispatcher meets `{% block %}`, `{% for %}` or `{% if %}` it
//! starts a buffering session. Every following line is diverted here: the
//! line is copied into the session buffer and consumed in its layer, until
//! the matching closing tag brings the nesting depth back to zero. Nested
//! directives of the same kind are buffered verbatim and handled when the
//! body itself is rendered.

use nelumbo_core::{NelumboError, NelumboResult};
use regex::Regex;

use crate::layer::Line;
use crate::tags::Directive;

/// The directive whose body is being captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferKind {
    /// `{% block name %}`
    Block { name: String },
    /// `{% for variable in collection %}`
    Loop { variable: String, collection: String },
    /// `{% if expression %}`
    Condition { expression: String },
}

impl BufferKind {
    const fn directive(&self) -> Directive {
        match self {
            Self::Block { .. } => Directive::Block,
            Self::Loop { .. } => Directive::For,
            Self::Condition { .. } => Directive::If,
        }
    }

    /// Pattern that raises the nesting depth.
    pub fn open_pattern(&self) -> &'static Regex {
        self.directive().pattern()
    }

    /// Pattern that lowers the nesting depth.
    pub fn close_pattern(&self) -> &'static Regex {
        match self {
            Self::Block { .. } => closing(Directive::Block),
            Self::Loop { .. } => closing(Directive::For),
            Self::Condition { .. } => closing(Directive::If),
        }
    }

    /// Human-readable label used in log output.
    pub fn label(&self) -> String {
        match self {
            Self::Block { name } => format!("block '{name}'"),
            Self::Loop {
                variable,
                collection,
            } => format!("for '{variable}:{collection}'"),
            Self::Condition { expression } => format!("if '{expression}'"),
        }
    }
}

fn closing(directive: Directive) -> &'static Regex {
    match directive.close_pattern() {
        Some(pattern) => pattern,
        None => unreachable!("structural directives always have a closing tag"),
    }
}

/// An in-progress capture.
#[derive(Debug, Clone)]
pub struct BufferSession {
    kind: BufferKind,
    depth: usize,
    buffer: Vec<Line>,
}

impl BufferSession {
    pub const fn kind(&self) -> &BufferKind {
        &self.kind
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub fn buffer(&self) -> &[Line] {
        &self.buffer
    }
}

/// A finished capture, handed back once the closing tag is reached.
#[derive(Debug, Clone)]
pub struct Closed {
    pub kind: BufferKind,
    pub buffer: Vec<Line>,
}

#[derive(Debug, Clone, Default)]
enum BufferState {
    #[default]
    Idle,
    Buffering(BufferSession),
}

/// Tracks the single active buffering session of a render.
#[derive(Debug, Clone, Default)]
pub struct SafeBufferingController {
    state: BufferState,
}

impl SafeBufferingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_active(&self) -> bool {
        matches!(self.state, BufferState::Buffering(_))
    }

    /// Current nesting depth, zero when idle.
    pub const fn depth(&self) -> usize {
        match &self.state {
            BufferState::Idle => 0,
            BufferState::Buffering(session) => session.depth,
        }
    }

    pub const fn session(&self) -> Option<&BufferSession> {
        match &self.state {
            BufferState::Idle => None,
            BufferState::Buffering(session) => Some(session),
        }
    }

    /// Starts capturing the body of `kind` at depth one.
    pub fn begin(&mut self, kind: BufferKind) -> NelumboResult<()> {
        if let BufferState::Buffering(active) = &self.state {
            return Err(NelumboError::SessionAlreadyActive(active.kind.label()));
        }
        tracing::debug!(directive = %kind.label(), "started safe buffering");
        self.state = BufferState::Buffering(BufferSession {
            kind,
            depth: 1,
            buffer: Vec::new(),
        });
        Ok(())
    }

    /// Feeds one line to the active session.
    ///
    /// Returns the finished capture when `line` closes it; `line` is then
    /// left untouched so the caller can replace it with the rendered result.
    /// Otherwise the line is moved into the buffer and consumed in place.
    /// Already-rendered lines are buffered without affecting the depth.
    pub fn on_line(&mut self, line: &mut Line) -> Option<Closed> {
        let BufferState::Buffering(session) = &mut self.state else {
            return None;
        };

        if !line.is_rendered() {
            if session.kind.open_pattern().is_match(line.text()) {
                session.depth += 1;
            }
            if session.kind.close_pattern().is_match(line.text()) {
                session.depth = session.depth.saturating_sub(1);
            }
        }

        if session.depth == 0 {
            let BufferState::Buffering(session) = std::mem::take(&mut self.state) else {
                return None;
            };
            tracing::debug!(
                directive = %session.kind.label(),
                lines = session.buffer.len(),
                "ended safe buffering"
            );
            return Some(Closed {
                kind: session.kind,
                buffer: session.buffer,
            });
        }

        session.buffer.push(line.clone());
        line.blank();
        None
    }

    /// Ends the active session without closing it, returning what it held.
    pub fn abandon(&mut self) -> Option<BufferSession> {
        match std::mem::take(&mut self.state) {
            BufferState::Idle => None,
            BufferState::Buffering(session) => Some(session),
        }
    }
}
