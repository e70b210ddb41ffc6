//! Named layers of template lines.
//!
//! A render session keeps every piece of in-flight content in a
//! [`LayerStack`]: the main template, each parent pulled in by `extends`, and
//! the transient layers used to render includes, loop iterations, condition
//! bodies and block contents. The final page is the concatenation of the
//! layers left in the stack, front to back.

use crate::tags::split_structural;

/// One line of a layer.
///
/// Structural tags are split onto their own lines when a template is loaded;
/// those follow-on segments are *glued* to the line before them and are
/// joined without a newline when the layer is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    text: String,
    glued: bool,
    rewritten: bool,
    rendered: bool,
}

impl Line {
    /// Creates a line that starts on a new output line.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Creates a line glued to the previous one.
    pub fn glued(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            glued: true,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn is_glued(&self) -> bool {
        self.glued
    }

    /// Returns `true` once a directive has replaced the line's text.
    pub const fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    /// Returns `true` if the line holds final output that must not be
    /// processed again.
    pub const fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Returns `true` if the line was rewritten to nothing visible and is
    /// dropped from the output.
    pub fn is_discarded(&self) -> bool {
        self.rewritten && self.text.trim().is_empty()
    }

    /// Replaces the text after a directive has been handled.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.rewritten = true;
    }

    /// Consumes the line.
    pub fn blank(&mut self) {
        self.text.clear();
        self.rewritten = true;
        self.rendered = false;
    }

    /// Replaces the line with finished output.
    pub fn fill(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.rewritten = true;
        self.rendered = true;
    }

    pub(crate) fn set_glued(&mut self, glued: bool) {
        self.glued = glued;
    }
}

/// What produced a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// The template passed to the session.
    Main,
    /// A parent template pulled in by `extends`.
    Extends,
    /// A template pulled in by `include`.
    Include,
    /// One iteration of a `for` body.
    Loop,
    /// The body of an `if` whose condition held.
    Condition,
    /// The contents of a `block`.
    Block,
}

impl LayerKind {
    /// The name prefix for layers of this kind.
    pub const fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Main => None,
            Self::Extends => Some("extends"),
            Self::Include => Some("include"),
            Self::Loop => Some("loop"),
            Self::Condition => Some("if"),
            Self::Block => Some("block"),
        }
    }

    /// Returns `true` for layers that hold a whole template file.
    pub const fn is_document(self) -> bool {
        matches!(self, Self::Main | Self::Extends | Self::Include)
    }
}

/// An ordered sequence of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    kind: LayerKind,
    lines: Vec<Line>,
}

impl Layer {
    pub const fn new(kind: LayerKind, lines: Vec<Line>) -> Self {
        Self { kind, lines }
    }

    /// Builds a layer from raw template lines, splitting structural tags
    /// onto glued segments.
    pub fn from_source<S: AsRef<str>>(kind: LayerKind, source: &[S]) -> Self {
        let mut lines = Vec::with_capacity(source.len());
        for raw in source {
            for (i, segment) in split_structural(raw.as_ref()).into_iter().enumerate() {
                if i == 0 {
                    lines.push(Line::new(segment));
                } else {
                    lines.push(Line::glued(segment));
                }
            }
        }
        Self { kind, lines }
    }

    pub const fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn line_mut(&mut self, index: usize) -> Option<&mut Line> {
        self.lines.get_mut(index)
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<Line> {
        &mut self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Joins the layer's lines into output text.
    ///
    /// Discarded lines are skipped. A newline separates two emitted lines
    /// unless everything between them was glued.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut first = true;
        let mut newline = false;
        for line in &self.lines {
            if !line.glued {
                newline = true;
            }
            if line.is_discarded() {
                continue;
            }
            if !first && newline {
                out.push('\n');
            }
            out.push_str(&line.text);
            first = false;
            newline = false;
        }
        out
    }

    /// Drops discarded lines. Returns `true` if visible content remains.
    pub fn clean(&mut self) -> bool {
        let mut carry_break = false;
        self.lines.retain_mut(|line| {
            if line.is_discarded() {
                carry_break |= !line.glued;
                return false;
            }
            if carry_break {
                line.glued = false;
                carry_break = false;
            }
            true
        });
        self.lines.iter().any(|line| !line.text.trim().is_empty())
    }
}

/// The ordered, named layers of a render session.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<(String, Layer)>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer and returns its final name (`prefix.name` when a prefix
    /// is given).
    ///
    /// A layer that already has the name is replaced. With `at_start` the
    /// layer moves to the front of the stack.
    pub fn create(
        &mut self,
        name: &str,
        layer: Layer,
        prefix: Option<&str>,
        at_start: bool,
    ) -> String {
        let full = prefix.map_or_else(|| name.to_string(), |p| format!("{p}.{name}"));
        tracing::trace!(layer = %full, "new layer");

        match self.position(&full) {
            Some(index) if !at_start => self.layers[index].1 = layer,
            existing => {
                if let Some(index) = existing {
                    self.layers.remove(index);
                }
                if at_start {
                    self.layers.insert(0, (full.clone(), layer));
                } else {
                    self.layers.push((full.clone(), layer));
                }
            }
        }
        full
    }

    /// Removes a layer. Removing an absent layer does nothing.
    pub fn remove(&mut self, name: &str) -> Option<Layer> {
        self.position(name).map(|index| self.layers.remove(index).1)
    }

    /// Drops the discarded lines of a layer and removes it when nothing
    /// visible is left.
    pub fn clean(&mut self, name: &str) {
        let keep = self.get_mut(name).map_or(true, Layer::clean);
        if !keep {
            tracing::trace!(layer = %name, "removing empty layer");
            self.remove(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Index of the layer from the front of the stack.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|(n, _)| n == name)
    }

    /// Layer names, front to back.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Layer)> {
        self.layers.iter().map(|(n, l)| (n.as_str(), l))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Concatenates every layer's rendered text, front to back.
    pub fn join(&self) -> String {
        self.layers.iter().map(|(_, layer)| layer.render()).collect()
    }
}
