//! The template engine: configuration and the entry points for rendering.
//!
//! The [`Engine`] struct holds everything a render needs besides the data:
//! template loaders, the include search path, the static asset base URL and
//! the route table. Each call to [`Engine::render`] runs a fresh
//! [`RenderSession`]; sessions share nothing, so one engine can serve any
//! number of renders.

use std::io::{self, Write};
use std::path::PathBuf;

use nelumbo_core::logging::render_span;
use nelumbo_core::settings::Settings;
use nelumbo_core::{NelumboError, NelumboResult, RouteTable};

use crate::context::{Context, ContextValue};
use crate::loaders::{FileSystemLoader, StringLoader, TemplateLoader};
use crate::renderer::RenderSession;

/// Receives a finished page.
pub trait ResponseSink {
    /// Sends the rendered HTML body.
    fn send_html(&mut self, body: &str) -> io::Result<()>;
}

/// A [`ResponseSink`] that writes the page to any [`Write`] implementation.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResponseSink for WriterSink<W> {
    fn send_html(&mut self, body: &str) -> io::Result<()> {
        self.writer.write_all(body.as_bytes())?;
        self.writer.flush()
    }
}

/// The name of the generic error page below the error directory.
pub const ERROR_TEMPLATE: &str = "error_generic";

/// The template engine.
///
/// # Examples
///
/// ```
/// use nelumbo_template::engine::Engine;
/// use nelumbo_template::context::{Context, ContextValue};
///
/// let engine = Engine::new();
/// engine.add_string_template("hello", "Hello {{ name }}!");
///
/// let mut ctx = Context::new();
/// ctx.set("name", ContextValue::from("World"));
///
/// assert_eq!(engine.render("hello", &ctx).unwrap(), "Hello World!");
/// ```
pub struct Engine {
    /// Registered template loaders, tried in order after the string loader.
    loaders: Vec<Box<dyn TemplateLoader>>,
    /// An in-memory string loader for programmatically added templates.
    string_loader: StringLoader,
    /// Path components below the template root holding includes.
    includes_dir: Vec<String>,
    /// Directory below the template root holding the error page.
    error_dir: String,
    /// Base URL for `{% static %}`.
    static_url: String,
    /// Routes for `{% url %}`.
    routes: RouteTable,
}

impl Engine {
    /// Creates an engine with default settings and no filesystem loader.
    pub fn new() -> Self {
        let defaults = Settings::default();
        Self {
            loaders: Vec::new(),
            string_loader: StringLoader::new(),
            includes_dir: defaults.includes_dir,
            error_dir: defaults.error_dir,
            static_url: defaults.static_url,
            routes: RouteTable::new(),
        }
    }

    /// Creates an engine that loads templates from `settings.template_dir`.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut engine = Self::new();
        engine.loaders.push(Box::new(FileSystemLoader::new(
            settings.template_dir.clone(),
            settings.template_extension.clone(),
        )));
        engine.includes_dir.clone_from(&settings.includes_dir);
        engine.error_dir.clone_from(&settings.error_dir);
        engine.static_url.clone_from(&settings.static_url);
        engine
    }

    /// Adds a filesystem loader for `dir` in front of the other loaders.
    pub fn set_template_dir(&mut self, dir: impl Into<PathBuf>, extension: &str) {
        self.loaders
            .insert(0, Box::new(FileSystemLoader::new(dir, extension)));
    }

    /// Adds a template loader.
    pub fn add_loader(&mut self, loader: Box<dyn TemplateLoader>) {
        self.loaders.push(loader);
    }

    /// Adds an in-memory template. Templates below a subdirectory are keyed
    /// by their slash-joined path, e.g. `includes/nav`.
    pub fn add_string_template(&self, key: &str, source: &str) {
        self.string_loader.add(key, source);
    }

    pub fn set_includes_dir(&mut self, dirs: Vec<String>) {
        self.includes_dir = dirs;
    }

    pub fn set_error_dir(&mut self, dir: impl Into<String>) {
        self.error_dir = dir.into();
    }

    pub fn set_static_url(&mut self, url: impl Into<String>) {
        self.static_url = url.into();
    }

    pub fn set_routes(&mut self, routes: RouteTable) {
        self.routes = routes;
    }

    pub fn includes_dir(&self) -> &[String] {
        &self.includes_dir
    }

    pub fn static_url(&self) -> &str {
        &self.static_url
    }

    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Loads a template's lines from the first loader that has it.
    pub fn load_lines(&self, name: &str, subdirs: &[String]) -> NelumboResult<Vec<String>> {
        if let Ok(lines) = self.string_loader.load_lines(name, subdirs) {
            return Ok(lines);
        }

        let mut last_error = None;
        for loader in &self.loaders {
            match loader.load_lines(name, subdirs) {
                Ok(lines) => return Ok(lines),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            NelumboError::TemplateNotFound(format!("Template \"{name}\" could not be found"))
        }))
    }

    /// Starts a render session for `context`.
    pub fn session<'e>(&'e self, context: &'e Context) -> RenderSession<'e> {
        RenderSession::new(self, context)
    }

    /// Renders a template by name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` if the template or a template it extends
    /// does not exist, and `MissingCollection` if a loop iterates over a
    /// missing top-level name. Every other failure is rendered inline.
    pub fn render(&self, name: &str, context: &Context) -> NelumboResult<String> {
        let span = render_span(name);
        let _guard = span.enter();

        let mut session = self.session(context);
        session.load(name)?;
        Ok(session.finalize())
    }

    /// Renders a template and hands the page to `sink`.
    pub fn render_into(
        &self,
        name: &str,
        context: &Context,
        sink: &mut dyn ResponseSink,
    ) -> NelumboResult<()> {
        let span = render_span(name);
        let _guard = span.enter();

        let mut session = self.session(context);
        session.load(name)?;
        session.flush(sink)?;
        Ok(())
    }

    /// Renders the generic error page with `code`, `subtitle` and `message`.
    ///
    /// Falls back to a plain-text line when the project has no error page.
    pub fn render_error_page(
        &self,
        code: u16,
        subtitle: &str,
        message: &str,
    ) -> NelumboResult<String> {
        let context: Context = [
            ("code", ContextValue::from(i64::from(code))),
            ("subtitle", ContextValue::from(subtitle)),
            ("message", ContextValue::from(message)),
        ]
        .into_iter()
        .collect();

        let name = format!("{}/{ERROR_TEMPLATE}", self.error_dir);
        match self.render(&name, &context) {
            Err(NelumboError::TemplateNotFound(detail)) => {
                tracing::warn!(code, detail = %detail, "error page template missing");
                Ok(format!("{code} {subtitle}: {message}"))
            }
            other => other,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nelumbo_core::Route;

    fn ctx(json: serde_json::Value) -> Context {
        Context::from_json(json).unwrap()
    }

    #[test]
    fn test_render_plain_text_verbatim() {
        let engine = Engine::new();
        engine.add_string_template("plain", "<h1>Hi</h1>\n\n  <p>text</p>\n");
        assert_eq!(
            engine.render("plain", &Context::new()).unwrap(),
            "<h1>Hi</h1>\n\n  <p>text</p>\n"
        );
    }

    #[test]
    fn test_render_missing_template() {
        let engine = Engine::new();
        let err = engine.render("nope", &Context::new()).unwrap_err();
        assert!(matches!(err, NelumboError::TemplateNotFound(_)));
    }

    #[test]
    fn test_render_interpolation() {
        let engine = Engine::new();
        engine.add_string_template("t", "Hello {{ name }}, {{ title = \"guest\" }}!");
        assert_eq!(
            engine.render("t", &ctx(serde_json::json!({"name": "Ada"}))).unwrap(),
            "Hello Ada, guest!"
        );
    }

    #[test]
    fn test_render_static_and_url() {
        let mut engine = Engine::new();
        engine.set_static_url("/assets/");
        let mut routes = RouteTable::new();
        routes.insert("/groups", Route::new("Group::list").with_name("groups"));
        engine.set_routes(routes);
        engine.add_string_template(
            "t",
            r#"<link href="{% static "css\site.css" %}"><a href="{% url "groups" %}"></a><a href="{% url 'about' %}"></a>"#,
        );
        assert_eq!(
            engine.render("t", &Context::new()).unwrap(),
            r#"<link href="/assets/css/site.css"><a href="/groups"></a><a href="/about"></a>"#
        );
    }

    #[test]
    fn test_render_into_sink() {
        let engine = Engine::new();
        engine.add_string_template("t", "{{ n }}");
        let mut sink = WriterSink::new(Vec::new());
        engine
            .render_into("t", &ctx(serde_json::json!({"n": 3})), &mut sink)
            .unwrap();
        assert_eq!(sink.into_inner(), b"3");
    }

    #[test]
    fn test_error_page_fallback() {
        let engine = Engine::new();
        assert_eq!(
            engine.render_error_page(404, "Not Found", "No such page").unwrap(),
            "404 Not Found: No such page"
        );
    }

    #[test]
    fn test_error_page_template() {
        let engine = Engine::new();
        engine.add_string_template(
            "errors/error_generic",
            "<h1>{{ code }}</h1><h2>{{ subtitle }}</h2><p>{{ message }}</p>",
        );
        assert_eq!(
            engine.render_error_page(500, "Oops", "Broken").unwrap(),
            "<h1>500</h1><h2>Oops</h2><p>Broken</p>"
        );
    }

    #[test]
    fn test_string_templates_shadow_loaders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "from disk").unwrap();

        let mut engine = Engine::new();
        engine.set_template_dir(dir.path(), "html");
        assert_eq!(engine.render("page", &Context::new()).unwrap(), "from disk");

        engine.add_string_template("page", "from memory");
        assert_eq!(engine.render("page", &Context::new()).unwrap(), "from memory");
    }
}
