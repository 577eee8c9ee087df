//! Emoji shortcodes.
//!
//! `:tada:` in plain text becomes the emoji itself. Names are looked up in
//! the GitHub shortcode set; unknown names stay as written.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Document, NodeId, NodeKind, Segment, Text, WalkStatus};
use crate::parser::ParseContext;
use crate::pipeline::AstTransform;

static SHORTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[a-z0-9_+\-]+:").expect("valid regex"));

/// Byte ranges and replacements of known shortcodes inside `text`.
///
/// A failed lookup only consumes the opening colon, so `:foo:smile:` still
/// finds `:smile:`.
fn find_shortcodes(text: &str) -> Vec<(usize, usize, &'static str)> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(m) = SHORTCODE_RE.find_at(text, pos) {
        let name = &text[m.start() + 1..m.end() - 1];
        match emojis::get_by_shortcode(name) {
            Some(emoji) => {
                found.push((m.start(), m.end(), emoji.as_str()));
                pos = m.end();
            }
            None => pos = m.end() - 1,
        }
    }
    found
}

/// Replaces `:shortcode:` runs in text nodes with [`NodeKind::Literal`] emoji.
#[derive(Debug, Default, Clone, Copy)]
pub struct Emoji;

impl Emoji {
    fn candidates(doc: &Document<'_>) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        doc.walk(doc.root(), |id, entering| {
            if !entering {
                return WalkStatus::Continue;
            }
            match doc.kind(id) {
                NodeKind::CodeSpan | NodeKind::CodeBlock { .. } | NodeKind::HtmlBlock | NodeKind::Metadata => {
                    WalkStatus::SkipChildren
                }
                NodeKind::Text(_) => {
                    nodes.push(id);
                    WalkStatus::Continue
                }
                _ => WalkStatus::Continue,
            }
        });
        nodes
    }

    fn split(doc: &mut Document<'_>, node: NodeId) {
        let NodeKind::Text(text) = *doc.kind(node) else {
            return;
        };
        let Some(parent) = doc.parent(node) else {
            return;
        };
        let shortcodes = find_shortcodes(doc.segment_value(text.segment));
        if shortcodes.is_empty() {
            return;
        }

        let base = text.segment.start;
        let mut cursor = base;
        for (start, stop, emoji) in shortcodes {
            let (start, stop) = (base + start, base + stop);
            if start > cursor {
                let before = Segment::new(cursor, start);
                let id = doc.new_node(NodeKind::Text(Text::new(before)));
                doc.set_span(id, before);
                doc.insert_before(parent, node, id);
            }
            let literal = doc.new_node(NodeKind::Literal {
                value: emoji.to_owned(),
            });
            doc.set_span(literal, Segment::new(start, stop));
            doc.insert_before(parent, node, literal);
            cursor = stop;
        }

        let rest = text.segment.with_start(cursor);
        if rest.is_empty() && !text.soft_line_break && !text.hard_line_break {
            doc.remove_child(parent, node);
        } else {
            doc.set_segment(node, rest);
            doc.set_span(node, rest);
        }
    }
}

impl AstTransform for Emoji {
    fn transform(&self, doc: &mut Document<'_>, _ctx: &ParseContext) {
        for node in Self::candidates(doc) {
            Self::split(doc, node);
        }
    }
}
