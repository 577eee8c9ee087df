//! `==highlighted==` text.
//!
//! Delimiters are matched across the source-backed text runs of a single
//! parent, so the highlighted span may contain other inline markup:
//! `==see *this*==`. An opener must be followed by content and a closer
//! preceded by it; `== loose ==` stays literal.

use crate::ast::{Document, NodeId, NodeKind, Segment, Text, WalkStatus};
use crate::parser::ParseContext;
use crate::pipeline::AstTransform;

const DELIMITER: &str = "==";

/// What sits on one side of a delimiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Neighbor {
    /// Whitespace, a line break or the edge of the parent.
    Space,
    /// Another `=`, making the run longer than a delimiter.
    Equals,
    Content,
}

impl Neighbor {
    fn of(c: char) -> Self {
        if c == '=' {
            Self::Equals
        } else if c.is_whitespace() {
            Self::Space
        } else {
            Self::Content
        }
    }
}

/// A delimiter occurrence: the text node holding it and its source offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Delimiter {
    node: NodeId,
    at: usize,
}

fn text_of(doc: &Document<'_>, id: NodeId) -> Option<Text> {
    match doc.kind(id) {
        NodeKind::Text(text) => Some(*text),
        _ => None,
    }
}

/// Neighbors of the delimiter at byte `offset` of sibling `index`.
///
/// Markup siblings count as content; the edge of the parent or a line break
/// counts as space.
fn neighbors(doc: &Document<'_>, siblings: &[NodeId], index: usize, text: Text, offset: usize) -> (Neighbor, Neighbor) {
    let value = doc.segment_value(text.segment);
    let before = match value[..offset].chars().next_back() {
        Some(c) => Neighbor::of(c),
        None => match index.checked_sub(1).map(|i| siblings[i]) {
            None => Neighbor::Space,
            Some(previous) => match text_of(doc, previous) {
                Some(t) if t.soft_line_break || t.hard_line_break => Neighbor::Space,
                Some(t) => doc
                    .segment_value(t.segment)
                    .chars()
                    .next_back()
                    .map_or(Neighbor::Space, Neighbor::of),
                None => Neighbor::Content,
            },
        },
    };
    let after = match value[offset + DELIMITER.len()..].chars().next() {
        Some(c) => Neighbor::of(c),
        None if text.soft_line_break || text.hard_line_break => Neighbor::Space,
        None => match siblings.get(index + 1) {
            None => Neighbor::Space,
            Some(&next) => match text_of(doc, next) {
                Some(t) => doc
                    .segment_value(t.segment)
                    .chars()
                    .next()
                    .map_or(Neighbor::Space, Neighbor::of),
                None => Neighbor::Content,
            },
        },
    };
    (before, after)
}

/// First opener under `parent` and the closer that ends it.
fn find_pair(doc: &Document<'_>, parent: NodeId) -> Option<(Delimiter, Delimiter)> {
    let siblings = doc.children(parent);
    let mut opener: Option<Delimiter> = None;
    for (index, &node) in siblings.iter().enumerate() {
        let Some(text) = text_of(doc, node) else {
            continue;
        };
        for (offset, _) in doc.segment_value(text.segment).match_indices(DELIMITER) {
            let (before, after) = neighbors(doc, siblings, index, text, offset);
            let at = text.segment.start + offset;
            match opener {
                None if before != Neighbor::Equals && after == Neighbor::Content => {
                    opener = Some(Delimiter { node, at });
                }
                Some(open)
                    if before == Neighbor::Content
                        && after != Neighbor::Equals
                        && at > open.at + DELIMITER.len() =>
                {
                    return Some((open, Delimiter { node, at }));
                }
                _ => {}
            }
        }
    }
    None
}

/// New text node for `text`, unless it would render as nothing.
fn text_node(doc: &mut Document<'_>, text: Text) -> Option<NodeId> {
    if text.segment.is_empty() && !text.soft_line_break && !text.hard_line_break {
        return None;
    }
    let id = doc.new_node(NodeKind::Text(text));
    doc.set_span(id, text.segment);
    Some(id)
}

fn place(doc: &mut Document<'_>, parent: NodeId, next: Option<NodeId>, id: NodeId) {
    match next {
        Some(next) => {
            doc.insert_before(parent, next, id);
        }
        None => doc.append_child(parent, id),
    }
}

/// Move everything between `open` and `close` into a new mark node.
fn wrap(doc: &mut Document<'_>, parent: NodeId, open: Delimiter, close: Delimiter) -> bool {
    let (Some(first), Some(last)) = (text_of(doc, open.node), text_of(doc, close.node)) else {
        return false;
    };
    let siblings = doc.children(parent).to_vec();
    let position = |id: NodeId| siblings.iter().position(|&c| c == id);
    let (Some(open_index), Some(close_index)) = (position(open.node), position(close.node)) else {
        return false;
    };
    let next = siblings.get(close_index + 1).copied();
    let inner_start = open.at + DELIMITER.len();

    let mark = doc.new_node(NodeKind::Mark);
    doc.set_span(mark, Segment::new(open.at, close.at + DELIMITER.len()));
    if open.node == close.node {
        if let Some(id) = text_node(doc, Text::new(Segment::new(inner_start, close.at))) {
            doc.append_child(mark, id);
        }
    } else {
        let head = Text {
            segment: Segment::new(inner_start, first.segment.stop),
            ..first
        };
        if let Some(id) = text_node(doc, head) {
            doc.append_child(mark, id);
        }
        for &middle in &siblings[open_index + 1..close_index] {
            doc.append_child(mark, middle);
        }
        if let Some(id) = text_node(doc, Text::new(Segment::new(last.segment.start, close.at))) {
            doc.append_child(mark, id);
        }
        doc.remove_child(parent, close.node);
    }

    place(doc, parent, next, mark);
    let tail = Text {
        segment: Segment::new(close.at + DELIMITER.len(), last.segment.stop),
        ..last
    };
    if let Some(id) = text_node(doc, tail) {
        place(doc, parent, next, id);
    }

    let before = Segment::new(first.segment.start, open.at);
    if before.is_empty() {
        doc.remove_child(parent, open.node);
    } else {
        *doc.kind_mut(open.node) = NodeKind::Text(Text::new(before));
        doc.set_span(open.node, before);
    }
    true
}

/// Wraps `==text==` into [`NodeKind::Mark`] nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mark;

impl Mark {
    /// Parents with at least one text child, outside code and raw HTML.
    fn candidates(doc: &Document<'_>) -> Vec<NodeId> {
        let mut parents = Vec::new();
        doc.walk(doc.root(), |id, entering| {
            if !entering {
                return WalkStatus::Continue;
            }
            match doc.kind(id) {
                NodeKind::CodeSpan | NodeKind::CodeBlock { .. } | NodeKind::HtmlBlock | NodeKind::Metadata => {
                    WalkStatus::SkipChildren
                }
                _ => {
                    if doc.children(id).iter().any(|&c| text_of(doc, c).is_some()) {
                        parents.push(id);
                    }
                    WalkStatus::Continue
                }
            }
        });
        parents
    }
}

impl AstTransform for Mark {
    fn transform(&self, doc: &mut Document<'_>, _ctx: &ParseContext) {
        for parent in Self::candidates(doc) {
            while let Some((open, close)) = find_pair(doc, parent) {
                if !wrap(doc, parent, open, close) {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Kind;
    use crate::html::HtmlRenderer;
    use crate::parser::{ParserOptions, parse};
    use crate::renderer::{RenderContext, RendererTable, render_document};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn marked(source: &str) -> Document<'_> {
        let mut doc = parse(source, ParserOptions::full());
        Mark.transform(&mut doc, &ParseContext::new());
        doc
    }

    fn render(source: &str) -> String {
        let doc = marked(source);
        let mut renderers = RendererTable::new();
        renderers.register(Arc::new(HtmlRenderer), 1000);
        let mut out = Vec::new();
        render_document(&doc, &renderers, &RenderContext::default(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn paragraph_kinds(doc: &Document<'_>) -> Vec<Kind> {
        let para = doc.children(doc.root())[0];
        doc.children(para).iter().map(|&id| doc.kind(id).kind()).collect()
    }

    #[test]
    fn test_mark_inside_text() {
        let doc = marked("a ==b== c");
        assert_eq!(paragraph_kinds(&doc), vec![Kind::Text, Kind::Mark, Kind::Text]);
        assert_eq!(render("a ==b== c"), "<p>a <mark>b</mark> c</p>\n");
    }

    #[test]
    fn test_mark_spans_markup() {
        assert_eq!(
            render("==see *this* now=="),
            "<p><mark>see <em>this</em> now</mark></p>\n"
        );
    }

    #[test]
    fn test_mark_around_markup_only() {
        let doc = marked("==*em*==");
        assert_eq!(paragraph_kinds(&doc), vec![Kind::Mark]);
        assert_eq!(render("==*em*=="), "<p><mark><em>em</em></mark></p>\n");
    }

    #[test]
    fn test_multiple_marks() {
        assert_eq!(
            render("==a== and ==b=="),
            "<p><mark>a</mark> and <mark>b</mark></p>\n"
        );
    }

    #[test]
    fn test_loose_delimiters_stay_literal() {
        assert_eq!(render("== a =="), "<p>== a ==</p>\n");
        assert_eq!(render("x==y"), "<p>x==y</p>\n");
        assert_eq!(render("a === b ==="), "<p>a === b ===</p>\n");
    }

    #[test]
    fn test_code_untouched() {
        assert_eq!(render("`==x==`"), "<p><code>==x==</code></p>\n");
    }

    #[test]
    fn test_soft_break_stays_after_mark() {
        assert_eq!(render("==a==\nb"), "<p><mark>a</mark>\nb</p>\n");
    }

    #[test]
    fn test_mark_in_heading() {
        let html = render("## ==New== release");
        assert!(html.contains("><mark>New</mark> release</h2>"), "{html}");
    }
}
