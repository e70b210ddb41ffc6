//! Directive patterns and tag-content extraction.
//!
//! The dispatcher tests every line against [`Directive::ORDER`]:
//!
//! | Directive | Syntax |
//! |---|---|
//! | `extends` | `{% extends "name" %}` |
//! | `include` | `{% include "name" %}` |
//! | `block` | `{% block name %} ... {% endblock %}` |
//! | `for` | `{% for var in collectionPath %} ... {% endfor %}` |
//! | `if` | `{% if condition %} ... {% endif %}` |
//! | `static` | `{% static "path" %}` |
//! | `url` | `{% url "routeName" %}` |
//! | interpolation | `{{ expression [= default] }}` |
//!
//! Interpolation comes last: its delimiters are broad enough to match inside
//! other tags.
//!
//! The three structural directives (`block`, `for`, `if`) and their closing
//! tags are split onto their own line segments when a template is loaded, see
//! [`split_structural`].

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static EXTENDS: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*extends\s+(.+?)\s*%\}"));
static INCLUDE: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*include\s+(.+?)\s*%\}"));
static BLOCK: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*block\s+(.+?)\s*%\}"));
static FOR: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*for\s+(.+?)\s*%\}"));
static IF: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*if\s+(.+?)\s*%\}"));
static STATIC: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*static\s+(.+?)\s*%\}"));
static URL: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*url\s+(.+?)\s*%\}"));
static INTERPOLATION: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{\{\s*(.+?)\s*\}\}"));

static ENDBLOCK: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*endblock(?:\s+[\w-]+)?\s*%\}"));
static ENDFOR: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*endfor\s*%\}"));
static ENDIF: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{%\s*endif\s*%\}"));

static STRUCTURAL: Lazy<Regex> =
    Lazy::new(|| tag_regex(r"\{%\s*(?:end)?(?:block|for|if)\b.*?%\}"));

/// Every `{{ }}` and `{% %}` span on a line.
pub(crate) static TAG_SPAN: Lazy<Regex> = Lazy::new(|| tag_regex(r"\{\{.*?\}\}|\{%.*?%\}"));

fn tag_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("directive pattern must compile")
}

/// A directive recognised by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `{% extends "name" %}`
    Extends,
    /// `{% include "name" %}`
    Include,
    /// `{% block name %}`
    Block,
    /// `{% for var in collectionPath %}`
    For,
    /// `{% if condition %}`
    If,
    /// `{% static "path" %}`
    Static,
    /// `{% url "routeName" %}`
    Url,
    /// `{{ expression [= default] }}`
    Interpolation,
}

/// One occurrence of a directive tag within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch<'a> {
    /// Byte range of the whole tag within the line.
    pub range: Range<usize>,
    /// The trimmed tag content after the keyword.
    pub argument: &'a str,
}

impl Directive {
    /// Dispatch order. Every matching directive fires, in this order.
    pub const ORDER: [Self; 8] = [
        Self::Extends,
        Self::Include,
        Self::Block,
        Self::For,
        Self::If,
        Self::Static,
        Self::Url,
        Self::Interpolation,
    ];

    /// The pattern matching this directive's opening tag.
    pub fn pattern(self) -> &'static Regex {
        match self {
            Self::Extends => &EXTENDS,
            Self::Include => &INCLUDE,
            Self::Block => &BLOCK,
            Self::For => &FOR,
            Self::If => &IF,
            Self::Static => &STATIC,
            Self::Url => &URL,
            Self::Interpolation => &INTERPOLATION,
        }
    }

    /// The pattern matching the closing tag of a structural directive.
    pub fn close_pattern(self) -> Option<&'static Regex> {
        match self {
            Self::Block => Some(&ENDBLOCK),
            Self::For => Some(&ENDFOR),
            Self::If => Some(&ENDIF),
            _ => None,
        }
    }

    /// Returns `true` if the directive occurs in `text`.
    pub fn is_match(self, text: &str) -> bool {
        self.pattern().is_match(text)
    }

    /// Extracts the first occurrence of the directive in `text`.
    pub fn find(self, text: &str) -> Option<TagMatch<'_>> {
        self.pattern().captures(text).and_then(|caps| to_match(&caps))
    }

    /// Extracts every occurrence of the directive in `text`, left to right.
    pub fn find_all(self, text: &str) -> Vec<TagMatch<'_>> {
        self.pattern()
            .captures_iter(text)
            .filter_map(|caps| to_match(&caps))
            .collect()
    }
}

fn to_match<'a>(caps: &regex::Captures<'a>) -> Option<TagMatch<'a>> {
    let whole = caps.get(0)?;
    let argument = caps.get(1)?;
    Some(TagMatch {
        range: whole.range(),
        argument: argument.as_str().trim(),
    })
}

/// Strips one pair of surrounding quotes (`"` or `'`) from a tag argument.
pub fn unquote(argument: &str) -> &str {
    let trimmed = argument.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

/// Splits a source line so each structural tag sits in its own segment.
///
/// Whitespace-only segments around structural tags are dropped, so an
/// indented `{% endfor %}` line produces a single segment. A line without
/// structural tags is returned unchanged as one segment.
pub fn split_structural(line: &str) -> Vec<&str> {
    if !STRUCTURAL.is_match(line) {
        return vec![line];
    }

    let mut segments = Vec::new();
    let mut last = 0;
    for tag in STRUCTURAL.find_iter(line) {
        let before = &line[last..tag.start()];
        if !before.trim().is_empty() {
            segments.push(before);
        }
        segments.push(tag.as_str());
        last = tag.end();
    }
    let rest = &line[last..];
    if !rest.trim().is_empty() {
        segments.push(rest);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_puts_interpolation_last() {
        assert_eq!(Directive::ORDER[0], Directive::Extends);
        assert_eq!(Directive::ORDER[7], Directive::Interpolation);
    }

    #[test]
    fn test_find_extracts_argument() {
        let m = Directive::Extends.find(r#"  {% extends "base" %}"#).unwrap();
        assert_eq!(m.argument, r#""base""#);
        assert_eq!(m.range, 2..22);

        let m = Directive::For.find("{% for item in items %}").unwrap();
        assert_eq!(m.argument, "item in items");

        let m = Directive::If.find("{%if age > 17%}").unwrap();
        assert_eq!(m.argument, "age > 17");
    }

    #[test]
    fn test_closing_tags_are_not_openings() {
        assert!(!Directive::Block.is_match("{% endblock %}"));
        assert!(!Directive::For.is_match("{% endfor %}"));
        assert!(!Directive::If.is_match("{% endif %}"));
        assert!(Directive::Block.close_pattern().unwrap().is_match("{% endblock %}"));
        assert!(Directive::Block.close_pattern().unwrap().is_match("{% endblock content %}"));
        assert!(Directive::For.close_pattern().unwrap().is_match("{%endfor%}"));
        assert!(Directive::Static.close_pattern().is_none());
    }

    #[test]
    fn test_find_all_interpolations() {
        let all = Directive::Interpolation.find_all("{{ a }} and {{b = x}}");
        let args: Vec<&str> = all.iter().map(|m| m.argument).collect();
        assert_eq!(args, vec!["a", "b = x"]);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""base""#), "base");
        assert_eq!(unquote("'css/site.css'"), "css/site.css");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote(r#""unbalanced"#), r#""unbalanced"#);
    }

    #[test]
    fn test_split_structural_inline() {
        assert_eq!(
            split_structural("<p>{% if x %}yes{% endif %}</p>"),
            vec!["<p>", "{% if x %}", "yes", "{% endif %}", "</p>"]
        );
    }

    #[test]
    fn test_split_structural_drops_indentation() {
        assert_eq!(split_structural("    {% endfor %}  "), vec!["{% endfor %}"]);
    }

    #[test]
    fn test_split_structural_leaves_other_lines() {
        assert_eq!(split_structural("  {{ name }}"), vec!["  {{ name }}"]);
        assert_eq!(split_structural(""), vec![""]);
        assert_eq!(
            split_structural(r#"{% include "nav" %}"#),
            vec![r#"{% include "nav" %}"#]
        );
    }
}
