//! Markdown parsing into a [`Document`] tree.
//!
//! `pulldown-cmark` produces a flat stream of events with source offsets;
//! [`parse`] folds that stream into the arena tree so transforms can inspect
//! and rewrite structure before rendering.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag};
use regex::Regex;

use crate::ast::{Document, NodeId, NodeKind, Segment, Text};
use crate::pipeline::TextTransform;

/// Key under which the conversion language is stored in [`ParseContext`].
pub const LANG_KEY: &str = "lang";

/// Parser feature switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ParserOptions {
    pub tables: bool,
    pub strikethrough: bool,
    pub footnotes: bool,
    pub task_lists: bool,
    /// `# Heading {#id .class}` attribute blocks.
    pub heading_attributes: bool,
    /// Smart quotes, dashes and ellipses.
    pub typographer: bool,
    /// Leading `---` YAML front matter becomes a [`NodeKind::Metadata`] node.
    pub front_matter: bool,
    /// When `false`, every line is parsed as paragraph text and only inline
    /// constructs are recognized.
    pub block_structures: bool,
}

impl ParserOptions {
    /// Options for post bodies.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            footnotes: true,
            task_lists: true,
            heading_attributes: true,
            typographer: true,
            front_matter: false,
            block_structures: true,
        }
    }

    /// Options for single-line titles: inline markup and typography only.
    #[must_use]
    pub const fn title() -> Self {
        Self {
            tables: false,
            strikethrough: false,
            footnotes: false,
            task_lists: false,
            heading_attributes: false,
            typographer: true,
            front_matter: false,
            block_structures: false,
        }
    }

    /// Translate into `pulldown-cmark` options.
    ///
    /// GFM blockquote tags are never enabled; callouts are recognized by
    /// [`crate::AlertTransform`] so the marker line stays in the tree.
    #[must_use]
    pub fn to_options(self) -> Options {
        let mut options = Options::empty();
        options.set(Options::ENABLE_TABLES, self.tables);
        options.set(Options::ENABLE_STRIKETHROUGH, self.strikethrough);
        options.set(Options::ENABLE_FOOTNOTES, self.footnotes);
        options.set(Options::ENABLE_TASKLISTS, self.task_lists);
        options.set(Options::ENABLE_HEADING_ATTRIBUTES, self.heading_attributes);
        options.set(Options::ENABLE_SMART_PUNCTUATION, self.typographer);
        options.set(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS, self.front_matter);
        options
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::full()
    }
}

/// Per-call key/value context visible to AST transforms.
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    values: HashMap<&'static str, String>,
}

impl ParseContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying only the conversion language.
    #[must_use]
    pub fn with_lang(lang: &str) -> Self {
        let mut ctx = Self::new();
        ctx.set(LANG_KEY, lang);
        ctx
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Conversion language, empty if unset.
    #[must_use]
    pub fn lang(&self) -> &str {
        self.get(LANG_KEY).unwrap_or_default()
    }
}

/// Parse `source` into a document tree.
#[must_use]
pub fn parse(source: &str, options: ParserOptions) -> Document<'_> {
    let mut builder = TreeBuilder::new(source);
    for (event, range) in Parser::new_ext(source, options.to_options()).into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}

/// Convert pulldown-cmark heading level to a number.
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn non_empty(value: CowStr<'_>) -> Option<String> {
    (!value.is_empty()).then(|| value.into_string())
}

fn link_destination(link_type: LinkType, dest_url: CowStr<'_>) -> String {
    match link_type {
        LinkType::Email => format!("mailto:{dest_url}"),
        _ => dest_url.into_string(),
    }
}

struct TreeBuilder<'s> {
    doc: Document<'s>,
    stack: Vec<NodeId>,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str) -> Self {
        let doc = Document::new(source);
        let root = doc.root();
        Self {
            doc,
            stack: vec![root],
        }
    }

    fn finish(self) -> Document<'s> {
        self.doc
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn leaf(&mut self, kind: NodeKind, range: Range<usize>) -> NodeId {
        let id = self.doc.new_node(kind);
        self.doc.set_span(id, range.into());
        let parent = self.current();
        self.doc.append_child(parent, id);
        id
    }

    fn open(&mut self, kind: NodeKind, range: Range<usize>) {
        let id = self.leaf(kind, range);
        self.stack.push(id);
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start_tag(tag, range),
            Event::End(_) => self.close(),
            Event::Text(text) => self.text(&text, range),
            Event::Code(code) => {
                let span = self.leaf(NodeKind::CodeSpan, range.clone());
                let literal = self.doc.new_node(NodeKind::Literal {
                    value: code.into_string(),
                });
                self.doc.set_span(literal, range.into());
                self.doc.append_child(span, literal);
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.leaf(
                    NodeKind::Literal {
                        value: math.into_string(),
                    },
                    range,
                );
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.leaf(
                    NodeKind::RawHtml {
                        value: html.into_string(),
                    },
                    range,
                );
            }
            Event::FootnoteReference(label) => {
                self.leaf(
                    NodeKind::FootnoteReference {
                        label: label.into_string(),
                    },
                    range,
                );
            }
            Event::SoftBreak => self.line_break(false, range),
            Event::HardBreak => self.line_break(true, range),
            Event::Rule => {
                self.leaf(NodeKind::ThematicBreak, range);
            }
            Event::TaskListMarker(checked) => {
                self.leaf(NodeKind::TaskMarker { checked }, range);
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let kind = match tag {
            Tag::Paragraph => NodeKind::Paragraph,
            Tag::Heading {
                level, id, classes, ..
            } => NodeKind::Heading {
                level: heading_level_to_num(level),
                id: id.map(CowStr::into_string),
                classes: classes.into_iter().map(CowStr::into_string).collect(),
            },
            Tag::BlockQuote(_) => NodeKind::Blockquote,
            Tag::CodeBlock(kind) => NodeKind::CodeBlock {
                info: match kind {
                    CodeBlockKind::Fenced(info) => non_empty(info),
                    CodeBlockKind::Indented => None,
                },
            },
            Tag::HtmlBlock => NodeKind::HtmlBlock,
            Tag::List(start) => NodeKind::List { start },
            Tag::Item => NodeKind::ListItem,
            Tag::FootnoteDefinition(label) => NodeKind::FootnoteDefinition {
                label: label.into_string(),
            },
            Tag::DefinitionList => NodeKind::DefinitionList,
            Tag::DefinitionListTitle => NodeKind::DefinitionTitle,
            Tag::DefinitionListDefinition => NodeKind::DefinitionDetails,
            Tag::Table(alignments) => NodeKind::Table { alignments },
            Tag::TableHead => NodeKind::TableHead,
            Tag::TableRow => NodeKind::TableRow,
            Tag::TableCell => NodeKind::TableCell,
            Tag::Emphasis => NodeKind::Emphasis,
            Tag::Strong => NodeKind::Strong,
            Tag::Strikethrough => NodeKind::Strikethrough,
            Tag::Superscript => NodeKind::Superscript,
            Tag::Subscript => NodeKind::Subscript,
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => NodeKind::Link {
                destination: link_destination(link_type, dest_url),
                title: non_empty(title),
            },
            Tag::Image {
                link_type,
                dest_url,
                title,
                ..
            } => NodeKind::Image {
                destination: link_destination(link_type, dest_url),
                title: non_empty(title),
            },
            Tag::MetadataBlock(_) => NodeKind::Metadata,
        };
        self.open(kind, range);
    }

    /// Add text, preferring a source-backed segment.
    ///
    /// Adjacent source-backed runs with no break between them are merged so
    /// a single source word is a single node.
    fn text(&mut self, text: &str, range: Range<usize>) {
        if self.doc.source().get(range.clone()) != Some(text) {
            self.leaf(
                NodeKind::Literal {
                    value: text.to_owned(),
                },
                range,
            );
            return;
        }

        let parent = self.current();
        if let Some(&last) = self.doc.children(parent).last()
            && let NodeKind::Text(previous) = self.doc.kind_mut(last)
            && !previous.soft_line_break
            && !previous.hard_line_break
            && previous.segment.stop == range.start
        {
            previous.segment = previous.segment.with_stop(range.end);
            let span = self.doc.span(last).with_stop(range.end);
            self.doc.set_span(last, span);
            return;
        }

        self.leaf(NodeKind::Text(Text::new(range.clone().into())), range);
    }

    /// Record a line break on the preceding text run.
    fn line_break(&mut self, hard: bool, range: Range<usize>) {
        let parent = self.current();
        let previous = self
            .doc
            .children(parent)
            .last()
            .copied()
            .filter(|&last| match self.doc.kind(last) {
                NodeKind::Text(text) => !text.soft_line_break && !text.hard_line_break,
                _ => false,
            });
        let target = match previous {
            Some(id) => id,
            None => {
                let empty = Segment::new(range.start, range.start);
                self.leaf(NodeKind::Text(Text::new(empty)), range.start..range.start)
            }
        };
        if let NodeKind::Text(text) = self.doc.kind_mut(target) {
            if hard {
                text.hard_line_break = true;
            } else {
                text.soft_line_break = true;
            }
        }
    }
}

static ORDERED_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,9})[.)](?:[ \t]|$)").expect("valid regex"));

static BLOCK_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"#{1,6}(?:[ \t]|$)",
        r"|>",
        r"|[-+*](?:[ \t]|$)",
        r"|(?:-[ \t]*)+$",
        r"|(?:\*[ \t]*){3,}$",
        r"|(?:_[ \t]*){3,}$",
        r"|=+[ \t]*$",
        r"|```|~~~",
        r"|\[[^\]]+\]:",
        r")"
    ))
    .expect("valid regex")
});

/// Text transform that keeps the block parser from seeing anything but
/// paragraphs.
///
/// Line-leading block markers are backslash-escaped and indentation is
/// dropped, so headings, quotes, lists, fences, rules and setext underlines
/// all come out as literal paragraph text. Inline HTML is left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineOnly;

impl InlineOnly {
    fn neutralize_line(line: &str, out: &mut String) {
        let line = line.trim_start_matches([' ', '\t']);
        if let Some(digits) = ORDERED_LIST_RE.captures(line).and_then(|c| c.get(1)) {
            out.push_str(&line[..digits.end()]);
            out.push('\\');
            out.push_str(&line[digits.end()..]);
        } else if BLOCK_START_RE.is_match(line.trim_end_matches(['\r', '\n'])) {
            out.push('\\');
            out.push_str(line);
        } else {
            out.push_str(line);
        }
    }
}

impl TextTransform for InlineOnly {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut out = String::with_capacity(input.len() + 8);
        for line in input.split_inclusive('\n') {
            Self::neutralize_line(line, &mut out);
        }
        if out == input {
            Cow::Borrowed(input)
        } else {
            Cow::Owned(out)
        }
    }
}
