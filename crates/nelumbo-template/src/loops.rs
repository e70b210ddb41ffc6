//! Expansion of `{% for %}` bodies.
//!
//! Loop variables are never bound in the data context. Each iteration gets a
//! copy of the buffered body in which references to the loop variable are
//! rewritten into full paths into the collection (`item.name` becomes
//! `items.0.name`), so the copy can be rendered like any other template text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::ContextValue;
use crate::layer::Line;
use crate::tags::{Directive, TAG_SPAN};

static INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*index\s*\}\}").expect("index pattern must compile"));

/// The parsed `var in collectionPath` header of a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopHeader {
    pub variable: String,
    pub collection: String,
}

impl LoopHeader {
    /// Parses `var in collectionPath`. Returns `None` when the header is
    /// malformed.
    pub fn parse(argument: &str) -> Option<Self> {
        let mut words = argument.split_whitespace();
        let variable = words.next()?;
        if words.next()? != "in" {
            return None;
        }
        let collection = words.next()?;
        if words.next().is_some() || !is_path(variable) || !is_path(collection) {
            return None;
        }
        Some(Self {
            variable: variable.to_string(),
            collection: collection.to_string(),
        })
    }

    /// The session key, `var:collectionPath`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.variable, self.collection)
    }

    /// Returns `true` if the collection is a dotted path rather than a bare
    /// top-level name.
    pub fn is_nested(&self) -> bool {
        self.collection.contains('.')
    }
}

fn is_path(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// The keys an iteration visits: indices for sequences, keys for mappings.
/// Any other value yields no iterations.
pub fn iteration_keys(collection: &ContextValue) -> Vec<String> {
    match collection {
        ContextValue::List(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        ContextValue::Dict(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// One iteration's substitution parameters.
#[derive(Debug, Clone, Copy)]
pub struct Iteration<'a> {
    pub header: &'a LoopHeader,
    /// The index or mapping key of this iteration.
    pub key: &'a str,
    /// The item rendered as text, spliced into attribute-style accesses.
    pub literal: &'a str,
    /// Zero-based position, rendered one-based by `{{ index }}`.
    pub position: usize,
}

impl Iteration<'_> {
    fn rewrite_path(&self, path: &str) -> Option<String> {
        let variable = self.header.variable.as_str();
        let mut segments: Vec<&str> = path.split('.').collect();

        if segments.first() == Some(&variable) {
            let rest = segments[1..].join(".");
            return Some(if rest.is_empty() {
                format!("{}.{}", self.header.collection, self.key)
            } else {
                format!("{}.{}.{rest}", self.header.collection, self.key)
            });
        }

        let at = segments.iter().skip(1).position(|s| *s == variable)? + 1;
        segments[at] = self.literal;
        Some(segments.join("."))
    }

    /// Rewrites loop-variable references inside the tag spans of `text`.
    fn rewrite_text(&self, text: &str) -> String {
        TAG_SPAN
            .replace_all(text, |caps: &regex::Captures<'_>| {
                rewrite_paths(&caps[0], |path| self.rewrite_path(path))
            })
            .into_owned()
    }

    /// Produces this iteration's copy of a loop body.
    ///
    /// `{{ index }}` is only replaced outside nested loops, which number
    /// their own iterations when they are expanded.
    pub fn expand(&self, body: &[Line]) -> Vec<Line> {
        let open = Directive::For.pattern();
        let close = Directive::For.close_pattern();
        let mut depth = 0usize;
        let mut out = Vec::with_capacity(body.len());

        for line in body {
            if close.is_some_and(|c| c.is_match(line.text())) {
                depth = depth.saturating_sub(1);
            }

            let mut copy = line.clone();
            if !line.is_rendered() {
                let mut text = self.rewrite_text(line.text());
                if depth == 0 {
                    let number = (self.position + 1).to_string();
                    text = INDEX.replace_all(&text, number.as_str()).into_owned();
                }
                if text != line.text() {
                    copy.set_text(text);
                }
            }

            if open.is_match(line.text()) {
                depth += 1;
            }
            out.push(copy);
        }
        out
    }
}

/// Applies `rewrite` to every dotted identifier in `span` that sits outside
/// quotes.
fn rewrite_paths(span: &str, rewrite: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(span.len());
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut chars = span.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            out.push(c);
        } else if c == '"' || c == '\'' {
            quote = Some(c);
            out.push(c);
        } else if (c.is_alphabetic() || c == '_')
            && !prev.is_some_and(|p| p.is_alphanumeric() || p == '_' || p == '.')
        {
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if !(next.is_alphanumeric() || next == '_' || next == '.') {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            let path = &span[start..end];
            match rewrite(path) {
                Some(replacement) => out.push_str(&replacement),
                None => out.push_str(path),
            }
            prev = path.chars().last();
            continue;
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(v: &str, c: &str) -> LoopHeader {
        LoopHeader {
            variable: v.to_string(),
            collection: c.to_string(),
        }
    }

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(Line::text).collect()
    }

    #[test]
    fn test_parse_header() {
        let h = LoopHeader::parse("item in items").unwrap();
        assert_eq!(h, header("item", "items"));
        assert_eq!(h.key(), "item:items");
        assert!(!h.is_nested());
        assert!(LoopHeader::parse("row in data.rows").unwrap().is_nested());
        assert!(LoopHeader::parse("item items").is_none());
        assert!(LoopHeader::parse("item in").is_none());
        assert!(LoopHeader::parse("a in b c").is_none());
    }

    #[test]
    fn test_iteration_keys() {
        let list = ContextValue::from(vec!["a", "b"]);
        assert_eq!(iteration_keys(&list), vec!["0", "1"]);
        let dict: ContextValue = serde_json::json!({"y": 1, "x": 2}).into();
        assert_eq!(iteration_keys(&dict), vec!["x", "y"]);
        assert!(iteration_keys(&ContextValue::from("abc")).is_empty());
    }

    #[test]
    fn test_expand_rewrites_variable() {
        let h = header("item", "items");
        let it = Iteration {
            header: &h,
            key: "1",
            literal: "b",
            position: 1,
        };
        let body = vec![
            Line::new("<li>{{ item }} / {{ item.name }}</li>"),
            Line::new("item stays item outside tags"),
        ];
        let out = it.expand(&body);
        assert_eq!(
            texts(&out),
            vec![
                "<li>{{ items.1 }} / {{ items.1.name }}</li>",
                "item stays item outside tags"
            ]
        );
        assert!(out[0].is_rewritten());
        assert!(!out[1].is_rewritten());
    }

    #[test]
    fn test_expand_leaves_similar_names_and_quotes() {
        let h = header("item", "items");
        let it = Iteration {
            header: &h,
            key: "0",
            literal: "a",
            position: 0,
        };
        let body = vec![Line::new(
            r#"{{ items }} {{ item_count }} {% if item == "item" %}"#,
        )];
        assert_eq!(
            texts(&it.expand(&body)),
            vec![r#"{{ items }} {{ item_count }} {% if items.0 == "item" %}"#]
        );
    }

    #[test]
    fn test_expand_attribute_access_uses_literal() {
        let h = header("key", "keys");
        let it = Iteration {
            header: &h,
            key: "0",
            literal: "title",
            position: 0,
        };
        let body = vec![Line::new("{{ labels.key }}")];
        assert_eq!(texts(&it.expand(&body)), vec!["{{ labels.title }}"]);
    }

    #[test]
    fn test_expand_index_outside_nested_loops_only() {
        let h = header("row", "rows");
        let it = Iteration {
            header: &h,
            key: "2",
            literal: "",
            position: 2,
        };
        let body = vec![
            Line::new("{{ index }}."),
            Line::new("{% for cell in row.cells %}"),
            Line::new("{{ index }}:{{ cell }}"),
            Line::new("{% endfor %}"),
            Line::new("({{index}})"),
        ];
        assert_eq!(
            texts(&it.expand(&body)),
            vec![
                "3.",
                "{% for cell in rows.2.cells %}",
                "{{ index }}:{{ cell }}",
                "{% endfor %}",
                "(3)"
            ]
        );
    }

    #[test]
    fn test_expand_skips_rendered_lines() {
        let h = header("item", "items");
        let it = Iteration {
            header: &h,
            key: "0",
            literal: "",
            position: 0,
        };
        let mut done = Line::new("");
        done.fill("{{ item }}");
        let out = it.expand(&[done]);
        assert_eq!(out[0].text(), "{{ item }}");
    }
}
