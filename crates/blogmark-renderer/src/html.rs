//! HTML output.
//!
//! [`HtmlWriter`] wraps the caller's sink for the duration of one
//! conversion and holds the per-call state (heading IDs, footnote numbers).
//! [`HtmlRenderer`] is the default [`NodeRenderer`] covering every node kind.

use std::collections::HashMap;
use std::io::{self, Write};

use pulldown_cmark::Alignment;

use crate::ast::{Document, Kind, NodeId, NodeKind, WalkStatus};
use crate::error::Error;
use crate::renderer::{NodeRenderer, RenderContext};

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Convert text to a URL-safe slug.
///
/// ASCII alphanumerics are lowercased and kept; runs of whitespace, `-` and
/// `_` collapse into a single `-`; everything else is dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true; // Prevents leading dash

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Escaping HTML writer over a borrowed sink.
pub struct HtmlWriter<'w> {
    out: &'w mut dyn Write,
    id_counts: HashMap<String, usize>,
    footnotes: HashMap<String, usize>,
}

impl<'w> HtmlWriter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        Self {
            out,
            id_counts: HashMap::new(),
            footnotes: HashMap::new(),
        }
    }

    /// Write markup verbatim.
    pub fn raw(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }

    /// Write character data, escaped.
    pub fn text(&mut self, s: &str) -> io::Result<()> {
        self.raw(&escape_html(s))
    }

    /// Write an opening tag. Attribute values are escaped.
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        write!(self.out, "<{tag}")?;
        for (name, value) in attrs {
            write!(self.out, " {name}=\"{}\"", escape_html(value))?;
        }
        self.out.write_all(b">")
    }

    pub fn close(&mut self, tag: &str) -> io::Result<()> {
        write!(self.out, "</{tag}>")
    }

    /// Reserve a heading ID, suffixing `-1`, `-2`, ... on repeats.
    pub fn unique_id(&mut self, base: &str) -> String {
        let count = self.id_counts.entry(base.to_owned()).or_default();
        let id = match *count {
            0 => base.to_owned(),
            n => format!("{base}-{n}"),
        };
        *count += 1;
        id
    }

    /// Display number of a footnote, assigned in order of first mention.
    pub fn footnote_number(&mut self, label: &str) -> usize {
        let next = self.footnotes.len() + 1;
        *self.footnotes.entry(label.to_owned()).or_insert(next)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Default renderer for every node kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn heading_id(w: &mut HtmlWriter<'_>, doc: &Document<'_>, node: NodeId, explicit: Option<&str>) -> String {
        let base = match explicit {
            Some(id) => id.to_owned(),
            None => slugify(&doc.text_content(node)),
        };
        if base.is_empty() {
            w.unique_id("heading")
        } else {
            w.unique_id(&base)
        }
    }

    fn cell_alignment(doc: &Document<'_>, cell: NodeId) -> Alignment {
        let Some(row) = doc.parent(cell) else {
            return Alignment::None;
        };
        let Some(table) = doc.parent(row) else {
            return Alignment::None;
        };
        let NodeKind::Table { alignments } = doc.kind(table) else {
            return Alignment::None;
        };
        doc.index_in_parent(cell)
            .and_then(|i| alignments.get(i).copied())
            .unwrap_or(Alignment::None)
    }

    fn cell_tag(doc: &Document<'_>, cell: NodeId) -> &'static str {
        match doc.parent(cell).map(|row| doc.kind(row)) {
            Some(NodeKind::TableHead) => "th",
            _ => "td",
        }
    }

    #[allow(clippy::too_many_lines)]
    fn render_node(
        w: &mut HtmlWriter<'_>,
        doc: &Document<'_>,
        node: NodeId,
        entering: bool,
    ) -> io::Result<WalkStatus> {
        match doc.kind(node) {
            NodeKind::Document | NodeKind::HtmlBlock | NodeKind::Alert { .. } => {}
            NodeKind::Metadata => return Ok(WalkStatus::SkipChildren),
            NodeKind::Paragraph => {
                if entering {
                    w.raw("<p>")?;
                } else {
                    w.raw("</p>\n")?;
                }
            }
            NodeKind::Heading { level, id, classes } => {
                let tag = format!("h{level}");
                if entering {
                    let id = Self::heading_id(w, doc, node, id.as_deref());
                    let class = classes.join(" ");
                    if class.is_empty() {
                        w.open(&tag, &[("id", &id)])?;
                    } else {
                        w.open(&tag, &[("id", &id), ("class", &class)])?;
                    }
                } else {
                    w.close(&tag)?;
                    w.raw("\n")?;
                }
            }
            NodeKind::Blockquote => {
                if entering {
                    w.raw("<blockquote>\n")?;
                } else {
                    w.raw("</blockquote>\n")?;
                }
            }
            NodeKind::CodeBlock { info } => {
                if !entering {
                    w.raw("</code></pre>\n")?;
                    return Ok(WalkStatus::Continue);
                }
                let lang = info.as_deref().and_then(|i| i.split_whitespace().next());
                w.raw("<pre>")?;
                match lang {
                    Some(lang) => w.open("code", &[("class", &format!("language-{lang}"))])?,
                    None => w.raw("<code>")?,
                }
                w.text(&doc.text_content(node))?;
                return Ok(WalkStatus::SkipChildren);
            }
            NodeKind::List { start } => match (start, entering) {
                (None, true) => w.raw("<ul>\n")?,
                (None, false) => w.raw("</ul>\n")?,
                (Some(1), true) => w.raw("<ol>\n")?,
                (Some(n), true) => {
                    w.open("ol", &[("start", &n.to_string())])?;
                    w.raw("\n")?;
                }
                (Some(_), false) => w.raw("</ol>\n")?,
            },
            NodeKind::ListItem => {
                if entering {
                    w.raw("<li>")?;
                } else {
                    w.raw("</li>\n")?;
                }
            }
            NodeKind::TaskMarker { checked } => {
                if entering {
                    if *checked {
                        w.raw(r#"<input type="checkbox" checked disabled> "#)?;
                    } else {
                        w.raw(r#"<input type="checkbox" disabled> "#)?;
                    }
                }
            }
            NodeKind::ThematicBreak => {
                if entering {
                    w.raw("<hr>\n")?;
                }
            }
            NodeKind::Table { .. } => {
                if entering {
                    w.raw("<table>\n")?;
                } else {
                    let has_body = doc
                        .children(node)
                        .last()
                        .is_some_and(|&last| doc.kind(last).kind() == Kind::TableRow);
                    if has_body {
                        w.raw("</tbody>\n")?;
                    }
                    w.raw("</table>\n")?;
                }
            }
            NodeKind::TableHead => {
                if entering {
                    w.raw("<thead>\n<tr>")?;
                } else {
                    w.raw("</tr>\n</thead>\n")?;
                }
            }
            NodeKind::TableRow => {
                if entering {
                    let first_body_row = doc
                        .previous_sibling(node)
                        .is_none_or(|prev| doc.kind(prev).kind() != Kind::TableRow);
                    if first_body_row {
                        w.raw("<tbody>\n")?;
                    }
                    w.raw("<tr>")?;
                } else {
                    w.raw("</tr>\n")?;
                }
            }
            NodeKind::TableCell => {
                let tag = Self::cell_tag(doc, node);
                if entering {
                    match Self::cell_alignment(doc, node) {
                        Alignment::None => w.open(tag, &[])?,
                        Alignment::Left => w.open(tag, &[("style", "text-align: left")])?,
                        Alignment::Center => w.open(tag, &[("style", "text-align: center")])?,
                        Alignment::Right => w.open(tag, &[("style", "text-align: right")])?,
                    }
                } else {
                    w.close(tag)?;
                }
            }
            NodeKind::FootnoteDefinition { label } => {
                if entering {
                    let number = w.footnote_number(label).to_string();
                    w.open(
                        "div",
                        &[("class", "footnote-definition"), ("id", &format!("fn-{label}"))],
                    )?;
                    w.open("sup", &[("class", "footnote-definition-label")])?;
                    w.text(&number)?;
                    w.raw("</sup>\n")?;
                } else {
                    w.raw("</div>\n")?;
                }
            }
            NodeKind::FootnoteReference { label } => {
                if entering {
                    let number = w.footnote_number(label).to_string();
                    w.open("sup", &[("class", "footnote-reference")])?;
                    w.open("a", &[("href", &format!("#fn-{label}"))])?;
                    w.text(&number)?;
                    w.raw("</a></sup>")?;
                }
            }
            NodeKind::DefinitionList => {
                if entering {
                    w.raw("<dl>\n")?;
                } else {
                    w.raw("</dl>\n")?;
                }
            }
            NodeKind::DefinitionTitle => {
                if entering {
                    w.raw("<dt>")?;
                } else {
                    w.raw("</dt>\n")?;
                }
            }
            NodeKind::DefinitionDetails => {
                if entering {
                    w.raw("<dd>")?;
                } else {
                    w.raw("</dd>\n")?;
                }
            }
            NodeKind::Emphasis => inline_tag(w, "em", entering)?,
            NodeKind::Strong => inline_tag(w, "strong", entering)?,
            NodeKind::Strikethrough => inline_tag(w, "s", entering)?,
            NodeKind::Superscript => inline_tag(w, "sup", entering)?,
            NodeKind::Subscript => inline_tag(w, "sub", entering)?,
            NodeKind::Mark => inline_tag(w, "mark", entering)?,
            NodeKind::Link { destination, title } => {
                if entering {
                    match title {
                        Some(title) => w.open("a", &[("href", destination), ("title", title)])?,
                        None => w.open("a", &[("href", destination)])?,
                    }
                } else {
                    w.close("a")?;
                }
            }
            NodeKind::Image { destination, title } => {
                if entering {
                    let alt = doc.text_content(node);
                    match title {
                        Some(title) => w.open(
                            "img",
                            &[("src", destination), ("alt", &alt), ("title", title)],
                        )?,
                        None => w.open("img", &[("src", destination), ("alt", &alt)])?,
                    }
                    return Ok(WalkStatus::SkipChildren);
                }
            }
            NodeKind::CodeSpan => {
                if entering {
                    w.raw("<code>")?;
                    w.text(&doc.text_content(node))?;
                    return Ok(WalkStatus::SkipChildren);
                }
                w.close("code")?;
            }
            NodeKind::RawHtml { value } => {
                if entering {
                    w.raw(value)?;
                }
            }
            NodeKind::Text(text) => {
                if entering {
                    w.text(doc.segment_value(text.segment))?;
                    if text.hard_line_break {
                        w.raw("<br>\n")?;
                    } else if text.soft_line_break {
                        w.raw("\n")?;
                    }
                }
            }
            NodeKind::Literal { value } => {
                if entering {
                    w.text(value)?;
                }
            }
        }
        Ok(WalkStatus::Continue)
    }
}

fn inline_tag(w: &mut HtmlWriter<'_>, tag: &str, entering: bool) -> io::Result<()> {
    if entering {
        w.open(tag, &[])
    } else {
        w.close(tag)
    }
}

impl NodeRenderer for HtmlRenderer {
    fn kinds(&self) -> &[Kind] {
        Kind::ALL
    }

    fn render(
        &self,
        w: &mut HtmlWriter<'_>,
        doc: &Document<'_>,
        node: NodeId,
        entering: bool,
        _ctx: &RenderContext<'_>,
    ) -> Result<WalkStatus, Error> {
        Ok(Self::render_node(w, doc, node, entering)?)
    }
}
