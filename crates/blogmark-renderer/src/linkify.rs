//! Bare URL autolinking.
//!
//! Plain text such as `see https://example.com.` becomes a link without
//! angle brackets. Text nodes are split in place so every resulting segment
//! still points at the original source bytes.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Document, NodeId, NodeKind, Segment, Text, WalkStatus};
use crate::parser::ParseContext;
use crate::pipeline::AstTransform;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>]+").expect("valid regex")
});

/// Characters dropped from the end of a match, as in GFM autolink literals.
const TRAILING_PUNCTUATION: &[char] = &['?', '!', '.', ',', ':', '*', '_', '~', '\'', '"', ';'];

/// Trim trailing punctuation and unbalanced closing parentheses.
fn trim_match(candidate: &str) -> &str {
    let mut end = candidate.len();
    loop {
        let current = &candidate[..end];
        if let Some(stripped) = current.strip_suffix(TRAILING_PUNCTUATION) {
            end = stripped.len();
            continue;
        }
        if current.ends_with(')') && current.matches(')').count() > current.matches('(').count() {
            end -= 1;
            continue;
        }
        return current;
    }
}

/// Byte ranges of URLs inside `text`.
fn find_urls(text: &str) -> Vec<(usize, usize)> {
    URL_RE
        .find_iter(text)
        .filter_map(|m| {
            let trimmed = trim_match(m.as_str());
            let host = trimmed
                .split_once("://")
                .map_or(trimmed, |(_, rest)| rest)
                .trim_start_matches("www.");
            (!host.is_empty()).then(|| (m.start(), m.start() + trimmed.len()))
        })
        .collect()
}

/// Wraps bare URLs in text nodes into [`NodeKind::Link`] nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Linkify;

impl Linkify {
    fn candidates(doc: &Document<'_>) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        doc.walk(doc.root(), |id, entering| {
            if !entering {
                return WalkStatus::Continue;
            }
            match doc.kind(id) {
                NodeKind::Link { .. }
                | NodeKind::Image { .. }
                | NodeKind::CodeSpan
                | NodeKind::CodeBlock { .. }
                | NodeKind::HtmlBlock => WalkStatus::SkipChildren,
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
        let value = doc.segment_value(text.segment);
        let urls = find_urls(value);
        if urls.is_empty() {
            return;
        }

        let base = text.segment.start;
        let mut cursor = base;
        for (start, stop) in urls {
            let (start, stop) = (base + start, base + stop);
            if start > cursor {
                let before = Segment::new(cursor, start);
                let id = doc.new_node(NodeKind::Text(Text::new(before)));
                doc.set_span(id, before);
                doc.insert_before(parent, node, id);
            }

            let url = Segment::new(start, stop);
            let label = doc.segment_value(url);
            let destination = if label.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www.")) {
                format!("http://{label}")
            } else {
                label.to_owned()
            };
            let link = doc.new_node(NodeKind::Link {
                destination,
                title: None,
            });
            doc.set_span(link, url);
            let inner = doc.new_node(NodeKind::Text(Text::new(url)));
            doc.set_span(inner, url);
            doc.append_child(link, inner);
            doc.insert_before(parent, node, link);
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

impl AstTransform for Linkify {
    fn transform(&self, doc: &mut Document<'_>, _ctx: &ParseContext) {
        for node in Self::candidates(doc) {
            Self::split(doc, node);
        }
    }
}
