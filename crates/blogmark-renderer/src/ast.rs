//! Arena-backed markdown document tree.
//!
//! Nodes live in a single `Vec` owned by [`Document`] and point at each other
//! through [`NodeId`]s. Parent links are ids rather than references, so a
//! transform can collect candidates in one pass and rewrite their siblings in
//! a second pass without holding borrows across the mutation.
//!
//! Text content is never copied out of the source: [`Text`] nodes hold a
//! [`Segment`] into the immutable source buffer. Content that does not appear
//! verbatim in the source (decoded entities, escapes, smart punctuation) is
//! stored in a [`NodeKind::Literal`] instead.

use std::convert::Infallible;
use std::ops::Range;

use pulldown_cmark::Alignment;

use crate::alert::AlertType;

/// Half-open byte range `[start, stop)` into the source buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Segment {
    /// First byte of the range.
    pub start: usize,
    /// One past the last byte of the range.
    pub stop: usize,
}

impl Segment {
    /// Create a segment covering `[start, stop)`.
    #[must_use]
    pub const fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    /// Slice of `source` covered by this segment.
    ///
    /// Returns an empty string if the range does not fall on valid boundaries.
    #[must_use]
    pub fn value<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.stop).unwrap_or_default()
    }

    /// Number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }

    /// Whether the segment covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stop <= self.start
    }

    /// Same segment starting at `start` instead.
    #[must_use]
    pub const fn with_start(self, start: usize) -> Self {
        Self {
            start,
            stop: self.stop,
        }
    }

    /// Same segment ending at `stop` instead.
    #[must_use]
    pub const fn with_stop(self, stop: usize) -> Self {
        Self {
            start: self.start,
            stop,
        }
    }
}

impl From<Range<usize>> for Segment {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Handle to a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Source-backed text run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Text {
    /// Location of the text in the source.
    pub segment: Segment,
    /// A soft line break follows this text.
    pub soft_line_break: bool,
    /// A hard line break follows this text.
    pub hard_line_break: bool,
}

impl Text {
    /// Plain text run without a trailing break.
    #[must_use]
    pub const fn new(segment: Segment) -> Self {
        Self {
            segment,
            soft_line_break: false,
            hard_line_break: false,
        }
    }
}

/// Node payload.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading {
        level: u8,
        /// Explicit `{#id}` attribute.
        id: Option<String>,
        classes: Vec<String>,
    },
    Blockquote,
    /// Callout produced from a blockquote by [`crate::AlertTransform`].
    Alert {
        alert_type: AlertType,
        /// Language tag of the conversion that produced the node.
        lang: String,
    },
    CodeBlock {
        /// Fence info string, if any.
        info: Option<String>,
    },
    HtmlBlock,
    List {
        /// Start number for ordered lists.
        start: Option<u64>,
    },
    ListItem,
    TaskMarker {
        checked: bool,
    },
    ThematicBreak,
    Table {
        alignments: Vec<Alignment>,
    },
    TableHead,
    TableRow,
    TableCell,
    FootnoteDefinition {
        label: String,
    },
    FootnoteReference {
        label: String,
    },
    DefinitionList,
    DefinitionTitle,
    DefinitionDetails,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    /// Highlighted `==text==`.
    Mark,
    Link {
        destination: String,
        title: Option<String>,
    },
    Image {
        destination: String,
        title: Option<String>,
    },
    /// Inline code; its content is a single [`NodeKind::Literal`] child.
    CodeSpan,
    RawHtml {
        value: String,
    },
    Text(Text),
    Literal {
        value: String,
    },
    /// Front matter block; never rendered.
    Metadata,
}

impl NodeKind {
    /// Dispatch tag for this payload.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Document => Kind::Document,
            Self::Paragraph => Kind::Paragraph,
            Self::Heading { .. } => Kind::Heading,
            Self::Blockquote => Kind::Blockquote,
            Self::Alert { .. } => Kind::Alert,
            Self::CodeBlock { .. } => Kind::CodeBlock,
            Self::HtmlBlock => Kind::HtmlBlock,
            Self::List { .. } => Kind::List,
            Self::ListItem => Kind::ListItem,
            Self::TaskMarker { .. } => Kind::TaskMarker,
            Self::ThematicBreak => Kind::ThematicBreak,
            Self::Table { .. } => Kind::Table,
            Self::TableHead => Kind::TableHead,
            Self::TableRow => Kind::TableRow,
            Self::TableCell => Kind::TableCell,
            Self::FootnoteDefinition { .. } => Kind::FootnoteDefinition,
            Self::FootnoteReference { .. } => Kind::FootnoteReference,
            Self::DefinitionList => Kind::DefinitionList,
            Self::DefinitionTitle => Kind::DefinitionTitle,
            Self::DefinitionDetails => Kind::DefinitionDetails,
            Self::Emphasis => Kind::Emphasis,
            Self::Strong => Kind::Strong,
            Self::Strikethrough => Kind::Strikethrough,
            Self::Superscript => Kind::Superscript,
            Self::Subscript => Kind::Subscript,
            Self::Mark => Kind::Mark,
            Self::Link { .. } => Kind::Link,
            Self::Image { .. } => Kind::Image,
            Self::CodeSpan => Kind::CodeSpan,
            Self::RawHtml { .. } => Kind::RawHtml,
            Self::Text(_) => Kind::Text,
            Self::Literal { .. } => Kind::Literal,
            Self::Metadata => Kind::Metadata,
        }
    }
}

/// Fieldless node type tag used to register renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Document,
    Paragraph,
    Heading,
    Blockquote,
    Alert,
    CodeBlock,
    HtmlBlock,
    List,
    ListItem,
    TaskMarker,
    ThematicBreak,
    Table,
    TableHead,
    TableRow,
    TableCell,
    FootnoteDefinition,
    FootnoteReference,
    DefinitionList,
    DefinitionTitle,
    DefinitionDetails,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Mark,
    Link,
    Image,
    CodeSpan,
    RawHtml,
    Text,
    Literal,
    Metadata,
}

impl Kind {
    /// Every node type.
    pub const ALL: &'static [Kind] = &[
        Kind::Document,
        Kind::Paragraph,
        Kind::Heading,
        Kind::Blockquote,
        Kind::Alert,
        Kind::CodeBlock,
        Kind::HtmlBlock,
        Kind::List,
        Kind::ListItem,
        Kind::TaskMarker,
        Kind::ThematicBreak,
        Kind::Table,
        Kind::TableHead,
        Kind::TableRow,
        Kind::TableCell,
        Kind::FootnoteDefinition,
        Kind::FootnoteReference,
        Kind::DefinitionList,
        Kind::DefinitionTitle,
        Kind::DefinitionDetails,
        Kind::Emphasis,
        Kind::Strong,
        Kind::Strikethrough,
        Kind::Superscript,
        Kind::Subscript,
        Kind::Mark,
        Kind::Link,
        Kind::Image,
        Kind::CodeSpan,
        Kind::RawHtml,
        Kind::Text,
        Kind::Literal,
        Kind::Metadata,
    ];
}

/// Control signal returned by walk callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkStatus {
    /// Visit children, then continue with the next node.
    Continue,
    /// Do not visit this node's children. The exit callback still runs.
    SkipChildren,
    /// Abort the walk.
    Stop,
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    /// Source range the parser reported for this node.
    span: Segment,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Markdown document tree over a borrowed source buffer.
///
/// Detached nodes (created with [`new_node`](Self::new_node) or removed from
/// their parent) stay in the arena until the document is dropped; they are
/// simply unreachable from [`root`](Self::root).
#[derive(Clone, Debug)]
pub struct Document<'s> {
    source: &'s str,
    nodes: Vec<Node>,
}

impl<'s> Document<'s> {
    /// Create a document containing only the root node.
    #[must_use]
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            nodes: vec![Node {
                kind: NodeKind::Document,
                span: Segment::new(0, source.len()),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The source buffer all segments point into.
    #[must_use]
    pub fn source(&self) -> &'s str {
        self.source
    }

    /// The root [`NodeKind::Document`] node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    /// Source range covered by the node, including markup.
    ///
    /// Nodes created by transforms have an empty span unless one is set.
    #[must_use]
    pub fn span(&self, id: NodeId) -> Segment {
        self.nodes[id.0].span
    }

    pub fn set_span(&mut self, id: NodeId, span: Segment) {
        self.nodes[id.0].span = span;
    }

    /// Point a `Text` node at a different source range.
    ///
    /// Returns `false` if `id` is not a `Text` node.
    pub fn set_segment(&mut self, id: NodeId, segment: Segment) -> bool {
        match &mut self.nodes[id.0].kind {
            NodeKind::Text(text) => {
                text.segment = segment;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Sibling immediately before `id` under the same parent.
    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == id)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// Position of `id` among its parent's children.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Source text of a segment.
    #[must_use]
    pub fn segment_value(&self, segment: Segment) -> &'s str {
        segment.value(self.source)
    }

    /// Allocate a detached node.
    pub fn new_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            span: Segment::default(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` directly before `before` under `parent`.
    ///
    /// Returns `false` (and leaves the tree unchanged) if `before` is not a
    /// child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, before: NodeId, child: NodeId) -> bool {
        if self.parent(before) != Some(parent) {
            return false;
        }
        self.detach(child);
        let Some(index) = self.children(parent).iter().position(|&c| c == before) else {
            return false;
        };
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        true
    }

    /// Remove `child` from `parent`. Returns `false` if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.nodes[parent.0].children;
        let Some(index) = children.iter().position(|&c| c == child) else {
            return false;
        };
        children.remove(index);
        self.nodes[child.0].parent = None;
        true
    }

    /// Put `new` at the position `old` occupies under `parent`.
    ///
    /// `old` becomes detached. Returns `false` if `old` is not a child of
    /// `parent`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        if self.parent(old) != Some(parent) || old == new {
            return false;
        }
        self.detach(new);
        let Some(index) = self.children(parent).iter().position(|&c| c == old) else {
            return false;
        };
        self.nodes[parent.0].children[index] = new;
        self.nodes[old.0].parent = None;
        self.nodes[new.0].parent = Some(parent);
        true
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent {
            self.remove_child(parent, child);
        }
    }

    /// Depth-first walk starting at `from`, calling `f(node, entering)`.
    pub fn walk<F>(&self, from: NodeId, mut f: F) -> WalkStatus
    where
        F: FnMut(NodeId, bool) -> WalkStatus,
    {
        let result: Result<WalkStatus, Infallible> = self.try_walk(from, &mut |id, entering| {
            Ok(f(id, entering))
        });
        match result {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }

    /// Fallible depth-first walk. An `Err` from the callback aborts the walk.
    ///
    /// Open nodes are kept on an explicit stack of `(node, next child)`
    /// frames, so nesting depth is bounded by memory rather than the thread
    /// stack.
    pub fn try_walk<F, E>(&self, from: NodeId, f: &mut F) -> Result<WalkStatus, E>
    where
        F: FnMut(NodeId, bool) -> Result<WalkStatus, E>,
    {
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        let mut next = Some(from);
        loop {
            if let Some(node) = next.take() {
                match f(node, true)? {
                    WalkStatus::Stop => return Ok(WalkStatus::Stop),
                    WalkStatus::SkipChildren => {
                        if f(node, false)? == WalkStatus::Stop {
                            return Ok(WalkStatus::Stop);
                        }
                    }
                    WalkStatus::Continue => stack.push((node, 0)),
                }
            }

            let Some(frame) = stack.last_mut() else {
                return Ok(WalkStatus::Continue);
            };
            let (node, index) = *frame;
            if let Some(&child) = self.children(node).get(index) {
                frame.1 += 1;
                next = Some(child);
            } else {
                stack.pop();
                if f(node, false)? == WalkStatus::Stop {
                    return Ok(WalkStatus::Stop);
                }
            }
        }
    }

    /// Concatenated characters of every `Text`/`Literal` descendant of `id`.
    ///
    /// Markup nodes contribute nothing themselves; their descendants are
    /// visited in document order.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.walk(id, |node, entering| {
            if entering && node != id {
                match self.kind(node) {
                    NodeKind::Text(text) => out.push_str(text.segment.value(self.source)),
                    NodeKind::Literal { value } => out.push_str(value),
                    _ => {}
                }
            }
            WalkStatus::Continue
        });
        out
    }
}
