//! The render session: one template rendered against one data context.
//!
//! A session loads the main template into a layer and walks it line by
//! line. Each line is offered to the directives in [`Directive::ORDER`];
//! structural directives open a buffering session that captures their body,
//! and when the body closes it is rendered in a transient layer of its own
//! and the result replaces the closing line. Parents pulled in by `extends`
//! are processed after the main layer, oldest first. Once every layer has
//! been walked, [`RenderSession::finalize`] joins them into the page.

use std::collections::{HashSet, VecDeque};
use std::io;

use nelumbo_core::{NelumboError, NelumboResult};

use crate::blocks::{fill_slot, find_slot};
use crate::buffering::{BufferKind, Closed, SafeBufferingController};
use crate::condition;
use crate::context::{Context, ContextValue};
use crate::engine::{Engine, ResponseSink};
use crate::expression::ExpressionEvaluator;
use crate::layer::{Layer, LayerKind, LayerStack, Line};
use crate::loops::{iteration_keys, Iteration, LoopHeader};
use crate::tags::{unquote, Directive};

/// Name of the layer holding the template a session was started with.
pub const MAIN_LAYER: &str = "main";

/// The state of one render.
pub struct RenderSession<'e> {
    engine: &'e Engine,
    context: &'e Context,
    layers: LayerStack,
    buffering: SafeBufferingController,
    /// Layers currently being walked, innermost last.
    active: Vec<String>,
    /// `extends` layers waiting to be walked.
    pending: VecDeque<String>,
    /// Every template extended so far.
    extended: HashSet<String>,
}

impl<'e> RenderSession<'e> {
    pub fn new(engine: &'e Engine, context: &'e Context) -> Self {
        Self {
            engine,
            context,
            layers: LayerStack::new(),
            buffering: SafeBufferingController::new(),
            active: Vec::new(),
            pending: VecDeque::new(),
            extended: HashSet::new(),
        }
    }

    pub const fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Returns `true` while a structural directive is still capturing its
    /// body.
    pub const fn is_buffering(&self) -> bool {
        self.buffering.is_active()
    }

    /// Loads `name` as the main layer and processes it, followed by every
    /// template it extends.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` if the template or a parent it extends does
    /// not exist, and `MissingCollection` if a loop iterates over an absent
    /// top-level name.
    pub fn load(&mut self, name: &str) -> NelumboResult<()> {
        let source = self.engine.load_lines(name, &[])?;
        tracing::debug!(template = %name, lines = source.len(), "loaded main template");

        self.layers.create(
            MAIN_LAYER,
            Layer::from_source(LayerKind::Main, &source),
            None,
            false,
        );
        self.process_layer(MAIN_LAYER)?;
        self.layers.clean(MAIN_LAYER);

        while let Some(parent) = self.pending.pop_front() {
            self.process_layer(&parent)?;
        }
        Ok(())
    }

    /// Joins every layer into the final page.
    ///
    /// Content captured by a directive that was never closed is lost.
    pub fn finalize(mut self) -> String {
        if let Some(session) = self.buffering.abandon() {
            tracing::warn!(
                directive = %session.kind().label(),
                lines = session.buffer().len(),
                "unterminated directive at end of template; buffered content discarded"
            );
        }
        self.layers.join()
    }

    /// Finalizes the page and hands it to `sink`.
    pub fn flush(self, sink: &mut dyn ResponseSink) -> io::Result<()> {
        let page = self.finalize();
        sink.send_html(&page)
    }

    /// Walks every line of a layer, routing it to the active buffering
    /// session if there is one and to the directive dispatcher otherwise.
    fn process_layer(&mut self, name: &str) -> NelumboResult<()> {
        self.active.push(name.to_string());
        let result = self.walk(name);
        self.active.pop();
        result
    }

    fn walk(&mut self, name: &str) -> NelumboResult<()> {
        let mut index = 0;
        while let Some(mut line) = self.layers.get(name).and_then(|l| l.line(index)).cloned() {
            if self.buffering.is_active() {
                if let Some(closed) = self.buffering.on_line(&mut line) {
                    self.close(closed, &mut line)?;
                }
            } else {
                self.dispatch(&mut line)?;
            }

            if let Some(slot) = self.layers.get_mut(name).and_then(|l| l.line_mut(index)) {
                *slot = line;
            }
            index += 1;
        }
        Ok(())
    }

    fn dispatch(&mut self, line: &mut Line) -> NelumboResult<()> {
        for directive in Directive::ORDER {
            if line.is_rendered() || self.buffering.is_active() {
                break;
            }
            if directive.is_match(line.text()) {
                self.apply(directive, line)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, directive: Directive, line: &mut Line) -> NelumboResult<()> {
        match directive {
            Directive::Extends => self.extend(line)?,
            Directive::Include => self.include(line)?,
            Directive::Block => self.begin_block(line)?,
            Directive::For => self.begin_loop(line)?,
            Directive::If => self.begin_condition(line)?,
            Directive::Static => self.static_url(line),
            Directive::Url => self.url(line),
            Directive::Interpolation => {
                let text = ExpressionEvaluator::new(self.context).interpret(line.text());
                line.set_text(text);
            }
        }
        Ok(())
    }

    fn close(&mut self, closed: Closed, line: &mut Line) -> NelumboResult<()> {
        match closed.kind {
            BufferKind::Block { name } => self.end_block(&name, closed.buffer, line),
            BufferKind::Loop {
                variable,
                collection,
            } => {
                let header = LoopHeader {
                    variable,
                    collection,
                };
                self.end_loop(&header, &closed.buffer, line)
            }
            BufferKind::Condition { expression } => {
                self.end_condition(&expression, closed.buffer, line)
            }
        }
    }

    /// Renders lines in a transient layer and removes the layer again.
    fn render_transient(&mut self, name: &str, layer: Layer) -> NelumboResult<String> {
        let prefix = layer.kind().prefix().unwrap_or("layer");
        let mut unique = name.to_string();
        let mut n = 1;
        while self.layers.contains(&format!("{prefix}.{unique}")) {
            n += 1;
            unique = format!("{name}#{n}");
        }

        let layer = self.layers.create(&unique, layer, Some(prefix), false);
        let result = self.process_layer(&layer);
        let output = self.layers.remove(&layer).map(|l| l.render()).unwrap_or_default();
        result.map(|()| output)
    }

    // ── extends / include ───────────────────────────────────────────

    fn extend(&mut self, line: &mut Line) -> NelumboResult<()> {
        let Some(tag) = Directive::Extends.find(line.text()) else {
            return Ok(());
        };
        let parent = unquote(tag.argument).to_string();
        if !self.extended.insert(parent.clone()) {
            return Err(NelumboError::InheritanceCycle(parent));
        }
        let source = self.engine.load_lines(&parent, &[])?;

        let layer = self.layers.create(
            &parent,
            Layer::from_source(LayerKind::Extends, &source),
            LayerKind::Extends.prefix(),
            true,
        );
        tracing::debug!(parent = %parent, "extending template");
        self.pending.push_back(layer);

        let mut text = line.text().to_string();
        text.replace_range(tag.range, "");
        line.set_text(text);
        Ok(())
    }

    fn include(&mut self, line: &mut Line) -> NelumboResult<()> {
        let tags: Vec<(std::ops::Range<usize>, String)> = Directive::Include
            .find_all(line.text())
            .into_iter()
            .map(|m| (m.range, unquote(m.argument).to_string()))
            .collect();

        let mut text = line.text().to_string();
        for (range, name) in tags.into_iter().rev() {
            let rendered = self.render_include(&name)?;
            text.replace_range(range, &rendered);
        }
        line.set_text(text);
        Ok(())
    }

    /// Renders an include in isolation. A missing include renders as an
    /// inline failure message.
    fn render_include(&mut self, name: &str) -> NelumboResult<String> {
        let layer = format!("{}.{name}", LayerKind::Include.prefix().unwrap_or("include"));
        if self.active.contains(&layer) {
            tracing::warn!(include = %name, "template includes itself");
            return Ok(format!("Can't include \"{name}\""));
        }

        let source = match self.engine.load_lines(name, self.engine.includes_dir()) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(include = %name, error = %e, "include failed");
                return Ok(format!("Can't include \"{name}\""));
            }
        };

        let rendered =
            self.render_transient(name, Layer::from_source(LayerKind::Include, &source));
        if let Some(session) = self.buffering.abandon() {
            tracing::warn!(
                include = %name,
                directive = %session.kind().label(),
                "unterminated directive in include; buffered content discarded"
            );
        }
        rendered
    }

    // ── block ───────────────────────────────────────────────────────

    fn begin_block(&mut self, line: &mut Line) -> NelumboResult<()> {
        let Some(tag) = Directive::Block.find(line.text()) else {
            return Ok(());
        };
        let name = tag.argument.to_string();
        line.blank();
        self.buffering.begin(BufferKind::Block { name })
    }

    fn end_block(&mut self, name: &str, body: Vec<Line>, line: &mut Line) -> NelumboResult<()> {
        let content = self.render_transient(name, Layer::new(LayerKind::Block, body))?;

        // A block nested in another block moves together with its parent.
        if self.is_inside(LayerKind::Block) {
            line.fill(content);
            return Ok(());
        }

        let target = self
            .layers
            .iter()
            .filter(|(layer, _)| !self.active.iter().any(|a| a.as_str() == *layer))
            .find_map(|(layer, l)| find_slot(l, name).map(|slot| (layer.to_string(), slot)));

        if let Some((layer, slot)) = target {
            tracing::debug!(block = %name, layer = %layer, "filling block slot");
            if let Some(l) = self.layers.get_mut(&layer) {
                fill_slot(l, slot, &content);
            }
            line.blank();
        } else if self.renders_blocks_in_place() {
            line.fill(content);
        } else {
            tracing::debug!(block = %name, "no slot for block; dropping it");
            line.blank();
        }
        Ok(())
    }

    fn is_inside(&self, kind: LayerKind) -> bool {
        self.active
            .iter()
            .any(|name| self.layers.get(name).is_some_and(|l| l.kind() == kind))
    }

    /// A block without a slot elsewhere renders where it stands inside an
    /// include, or inside the front-most document of the page.
    fn renders_blocks_in_place(&self) -> bool {
        let document = self.active.iter().rev().find_map(|name| {
            self.layers
                .get(name)
                .filter(|l| l.kind().is_document())
                .map(|l| (name, l.kind()))
        });
        match document {
            Some((_, LayerKind::Include)) | None => true,
            Some((name, _)) => self.layers.position(name) == Some(0),
        }
    }

    // ── for ─────────────────────────────────────────────────────────

    fn begin_loop(&mut self, line: &mut Line) -> NelumboResult<()> {
        let Some(tag) = Directive::For.find(line.text()) else {
            return Ok(());
        };
        let Some(header) = LoopHeader::parse(tag.argument) else {
            tracing::warn!(header = %tag.argument, "malformed for directive left as text");
            return Ok(());
        };
        line.blank();
        self.buffering.begin(BufferKind::Loop {
            variable: header.variable,
            collection: header.collection,
        })
    }

    fn end_loop(&mut self, header: &LoopHeader, body: &[Line], line: &mut Line) -> NelumboResult<()> {
        let evaluator = ExpressionEvaluator::new(self.context);
        let keys = match self.context.get(&header.collection) {
            Some(collection) => {
                let keys = iteration_keys(collection);
                if !matches!(collection, ContextValue::List(_) | ContextValue::Dict(_)) {
                    tracing::warn!(collection = %header.collection, "for loop over a non-collection value");
                }
                keys
            }
            None if header.is_nested() => {
                tracing::debug!(collection = %header.collection, "for loop over missing path");
                Vec::new()
            }
            None => return Err(NelumboError::MissingCollection(header.collection.clone())),
        };

        let mut outputs = Vec::with_capacity(keys.len());
        for (position, key) in keys.iter().enumerate() {
            let literal = evaluator.evaluate(&format!("{}.{key}", header.collection));
            let iteration = Iteration {
                header,
                key,
                literal: &literal,
                position,
            };
            let output = self.render_transient(
                &format!("{}.{key}", header.key()),
                Layer::new(LayerKind::Loop, iteration.expand(body)),
            )?;
            if !output.is_empty() {
                outputs.push(output);
            }
        }

        let separator = if body.first().is_some_and(Line::is_glued) {
            ""
        } else {
            "\n"
        };
        line.fill(outputs.join(separator));
        Ok(())
    }

    // ── if ──────────────────────────────────────────────────────────

    fn begin_condition(&mut self, line: &mut Line) -> NelumboResult<()> {
        let Some(tag) = Directive::If.find(line.text()) else {
            return Ok(());
        };
        let expression = tag.argument.to_string();
        line.blank();
        self.buffering.begin(BufferKind::Condition { expression })
    }

    fn end_condition(&mut self, expression: &str, body: Vec<Line>, line: &mut Line) -> NelumboResult<()> {
        match condition::evaluate(expression, &ExpressionEvaluator::new(self.context)) {
            Ok(true) => {
                let content =
                    self.render_transient(expression, Layer::new(LayerKind::Condition, body))?;
                line.fill(content);
            }
            Ok(false) => line.blank(),
            Err(e) => {
                tracing::warn!(condition = %expression, error = %e, "condition failed to evaluate");
                line.fill(condition::error_text(expression));
            }
        }
        Ok(())
    }

    // ── static / url ────────────────────────────────────────────────

    fn static_url(&self, line: &mut Line) {
        let base = self.engine.static_url().trim_end_matches('/');
        let text = Directive::Static
            .pattern()
            .replace_all(line.text(), |caps: &regex::Captures<'_>| {
                let path = unquote(&caps[1]).replace('\\', "/");
                format!("{base}/{}", path.trim_start_matches('/'))
            })
            .into_owned();
        line.set_text(text);
    }

    fn url(&self, line: &mut Line) {
        let routes = self.engine.routes();
        let text = Directive::Url
            .pattern()
            .replace_all(line.text(), |caps: &regex::Captures<'_>| {
                let name = unquote(&caps[1]);
                routes.reverse(name).map_or_else(
                    || format!("/{}", name.trim_start_matches('/')),
                    str::to_string,
                )
            })
            .into_owned();
        line.set_text(text);
    }
}
