//! Resolution of `{{ expression [= default] }}` interpolations.

use crate::context::{Context, ContextValue};
use crate::tags::{unquote, Directive};

/// Rendered when an expression resolves to nothing and has no default.
pub const UNKNOWN_KEY: &str = "Unknown key";

/// The parsed body of an interpolation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpolation<'a> {
    /// The dotted lookup path.
    pub path: &'a str,
    /// The fallback text, with surrounding quotes removed.
    pub default: Option<&'a str>,
}

impl<'a> Interpolation<'a> {
    /// Splits an interpolation body on its first `=`.
    pub fn parse(body: &'a str) -> Self {
        match body.split_once('=') {
            Some((path, default)) => Self {
                path: path.trim(),
                default: Some(unquote(default)),
            },
            None => Self {
                path: body.trim(),
                default: None,
            },
        }
    }
}

/// A resolved lookup: the path that was looked up and what it pointed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference<'c> {
    pub path: &'c str,
    pub value: Option<&'c ContextValue>,
}

impl Reference<'_> {
    /// Returns `true` if the path resolved to a non-null value.
    pub fn is_present(&self) -> bool {
        self.value.is_some_and(|v| !v.is_none())
    }

    /// The resolved value, `None` when absent.
    pub fn to_value(&self) -> ContextValue {
        self.value.cloned().unwrap_or(ContextValue::None)
    }
}

/// Resolves expressions against a render's data context.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionEvaluator<'c> {
    context: &'c Context,
}

impl<'c> ExpressionEvaluator<'c> {
    pub const fn new(context: &'c Context) -> Self {
        Self { context }
    }

    pub const fn context(&self) -> &'c Context {
        self.context
    }

    /// Looks a dotted path up without rendering it.
    pub fn reference<'p>(&self, path: &'p str) -> Reference<'p>
    where
        'c: 'p,
    {
        Reference {
            path,
            value: self.context.get(path),
        }
    }

    /// Renders one interpolation body to text.
    ///
    /// Absent and null values render the default, or [`UNKNOWN_KEY`] when
    /// there is none. Collections render as a structural dump.
    pub fn evaluate(&self, body: &str) -> String {
        let Interpolation { path, default } = Interpolation::parse(body);
        match self.context.get(path) {
            Some(value) if !value.is_none() => value.to_display_string(),
            _ => {
                tracing::trace!(path, "interpolation fell back to default");
                default.unwrap_or(UNKNOWN_KEY).to_string()
            }
        }
    }

    /// Replaces every interpolation on a line with its rendered value,
    /// left to right.
    pub fn interpret(&self, line: &str) -> String {
        let matches = Directive::Interpolation.find_all(line);
        if matches.is_empty() {
            return line.to_string();
        }

        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        for m in matches {
            out.push_str(&line[last..m.range.start]);
            out.push_str(&self.evaluate(m.argument));
            last = m.range.end;
        }
        out.push_str(&line[last..]);
        out
    }

    /// Resolves the first interpolation on a line to its reference instead of
    /// rendering it.
    pub fn interpret_reference<'l>(&self, line: &'l str) -> Option<Reference<'l>>
    where
        'c: 'l,
    {
        let m = Directive::Interpolation.find(line)?;
        let path = Interpolation::parse(m.argument).path;
        Some(self.reference(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        Context::from_json(json!({
            "name": "Ada",
            "age": 36,
            "tags": ["a", {"k": 1}],
            "user": {"profile": {"city": "Lyon"}, "nick": null},
            "empty": ""
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_with_default() {
        let i = Interpolation::parse(r#"user.name = "Guest""#);
        assert_eq!(i.path, "user.name");
        assert_eq!(i.default, Some("Guest"));

        let i = Interpolation::parse("name");
        assert_eq!(i.path, "name");
        assert_eq!(i.default, None);
    }

    #[test]
    fn test_evaluate_scalar() {
        let c = ctx();
        let ev = ExpressionEvaluator::new(&c);
        assert_eq!(ev.evaluate("name"), "Ada");
        assert_eq!(ev.evaluate("age"), "36");
        assert_eq!(ev.evaluate("user.profile.city"), "Lyon");
        assert_eq!(ev.evaluate("empty"), "");
    }

    #[test]
    fn test_evaluate_missing_uses_default() {
        let c = ctx();
        let ev = ExpressionEvaluator::new(&c);
        assert_eq!(ev.evaluate(r#"missing = "Guest""#), "Guest");
        assert_eq!(ev.evaluate("missing = 'x'"), "x");
        assert_eq!(ev.evaluate("missing"), UNKNOWN_KEY);
        assert_eq!(ev.evaluate("user.nick = anon"), "anon");
        assert_eq!(ev.evaluate("user.nick"), UNKNOWN_KEY);
    }

    #[test]
    fn test_evaluate_collection_dumps() {
        let c = ctx();
        let ev = ExpressionEvaluator::new(&c);
        assert_eq!(ev.evaluate("tags"), "['a', {'k': 1}]");
    }

    #[test]
    fn test_interpret_every_occurrence() {
        let c = ctx();
        let ev = ExpressionEvaluator::new(&c);
        assert_eq!(
            ev.interpret("<b>{{ name }}</b> is {{age}} in {{ user.profile.city }}"),
            "<b>Ada</b> is 36 in Lyon"
        );
        assert_eq!(ev.interpret("no tags here"), "no tags here");
    }

    #[test]
    fn test_reference() {
        let c = ctx();
        let ev = ExpressionEvaluator::new(&c);
        let r = ev.reference("user.profile.city");
        assert!(r.is_present());
        assert_eq!(r.to_value(), ContextValue::from("Lyon"));
        assert!(!ev.reference("user.nick").is_present());
        assert!(ev.reference("nope").value.is_none());

        let r = ev.interpret_reference("x {{ age = 3 }} y").unwrap();
        assert_eq!(r.path, "age");
        assert_eq!(r.to_value(), ContextValue::Integer(36));
        assert!(ev.interpret_reference("plain").is_none());
    }
}
