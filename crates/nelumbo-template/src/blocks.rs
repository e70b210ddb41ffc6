//! Block slots: the `{% block name %} ... {% endblock %}` spans of a parent
//! template that a child's block of the same name replaces.

use crate::layer::{Layer, Line};
use crate::tags::Directive;

/// Line indices of a block slot's opening and closing tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub open: usize,
    pub close: usize,
}

/// Finds the first slot named `name` in a layer.
///
/// The closing tag is matched by nesting depth, so a slot may contain
/// other blocks.
pub fn find_slot(layer: &Layer, name: &str) -> Option<Slot> {
    let lines = layer.lines();
    let open = lines.iter().position(|line| {
        !line.is_rendered()
            && Directive::Block
                .find(line.text())
                .is_some_and(|m| m.argument == name)
    })?;

    let close_pattern = Directive::Block.close_pattern()?;
    let mut depth = 1usize;
    for (offset, line) in lines[open + 1..].iter().enumerate() {
        if line.is_rendered() {
            continue;
        }
        if Directive::Block.is_match(line.text()) {
            depth += 1;
        }
        if close_pattern.is_match(line.text()) {
            depth -= 1;
            if depth == 0 {
                return Some(Slot {
                    open,
                    close: open + 1 + offset,
                });
            }
        }
    }
    None
}

/// Replaces the body of a slot with rendered content.
///
/// The lines strictly between the tags are consumed and the content is
/// inserted just before the closing tag. The tags stay in place so a
/// template further up the inheritance chain can still fill the same slot.
pub fn fill_slot(layer: &mut Layer, slot: Slot, content: &str) {
    let lines = layer.lines_mut();
    let glued = lines
        .get(slot.open + 1)
        .filter(|_| slot.open + 1 < slot.close)
        .or_else(|| lines.get(slot.close))
        .is_some_and(Line::is_glued);

    for line in &mut lines[slot.open + 1..slot.close] {
        line.blank();
    }

    let mut filled = Line::new("");
    filled.set_glued(glued);
    filled.fill(content);
    lines.insert(slot.close, filled);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;

    fn layer(lines: &[&str]) -> Layer {
        Layer::from_source(LayerKind::Extends, lines)
    }

    #[test]
    fn test_find_slot() {
        let l = layer(&[
            "<title>",
            "{% block title %}Default{% endblock %}",
            "</title>",
            "{% block content %}",
            "  {% block inner %}x{% endblock %}",
            "{% endblock %}",
        ]);
        assert_eq!(find_slot(&l, "title"), Some(Slot { open: 1, close: 3 }));
        let content = find_slot(&l, "content").unwrap();
        assert_eq!(l.line(content.open).unwrap().text(), "{% block content %}");
        assert_eq!(l.line(content.close).unwrap().text(), "{% endblock %}");
        assert_eq!(content.close, l.len() - 1);
        assert!(find_slot(&l, "missing").is_none());
    }

    #[test]
    fn test_find_slot_needs_close() {
        let l = layer(&["{% block a %}", "text"]);
        assert!(find_slot(&l, "a").is_none());
    }

    #[test]
    fn test_fill_slot_multi_line() {
        let mut l = layer(&["<main>", "{% block content %}", "default", "{% endblock %}", "</main>"]);
        let slot = find_slot(&l, "content").unwrap();
        fill_slot(&mut l, slot, "<p>child</p>");
        assert_eq!(
            l.render(),
            "<main>\n{% block content %}\n<p>child</p>\n{% endblock %}\n</main>"
        );
        assert!(l.line(3).unwrap().is_rendered());
        assert_eq!(find_slot(&l, "content"), Some(Slot { open: 1, close: 4 }));
    }

    #[test]
    fn test_fill_slot_inline() {
        let mut l = layer(&["<title>{% block title %}Default{% endblock %}</title>"]);
        let slot = find_slot(&l, "title").unwrap();
        fill_slot(&mut l, slot, "Child");
        assert_eq!(
            l.render(),
            "<title>{% block title %}Child{% endblock %}</title>"
        );
    }

    #[test]
    fn test_fill_empty_slot() {
        let mut l = layer(&["{% block a %}{% endblock %}"]);
        let slot = find_slot(&l, "a").unwrap();
        fill_slot(&mut l, slot, "x");
        assert_eq!(l.render(), "{% block a %}x{% endblock %}");
    }
}
