//! GitHub-style callouts.
//!
//! A blockquote whose first paragraph starts with a marker line such as
//! `[!NOTE]` is rewritten into a [`NodeKind::Alert`]:
//!
//! ```markdown
//! > [!WARNING]
//! > Back up your database first.
//! ```
//!
//! [`AlertTransform`] performs the rewrite after parsing, [`AlertRenderer`]
//! emits the labeled container. Anything that does not match the marker
//! syntax exactly stays an ordinary blockquote.

use std::fmt;
use std::sync::Arc;

use crate::ast::{Document, Kind, NodeId, NodeKind, Segment, WalkStatus};
use crate::error::Error;
use crate::html::HtmlWriter;
use crate::parser::ParseContext;
use crate::pipeline::AstTransform;
use crate::renderer::{NodeRenderer, RenderContext};
use crate::strings::Localizer;

/// Callout severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlertType {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AlertType {
    /// All alert types in severity order.
    pub const ALL: [AlertType; 5] = [
        AlertType::Note,
        AlertType::Tip,
        AlertType::Important,
        AlertType::Warning,
        AlertType::Caution,
    ];

    /// Match a marker token case-insensitively, ignoring surrounding whitespace.
    ///
    /// ```
    /// use blogmark_renderer::AlertType;
    ///
    /// assert_eq!(AlertType::parse("warning"), Some(AlertType::Warning));
    /// assert_eq!(AlertType::parse(" TIP "), Some(AlertType::Tip));
    /// assert_eq!(AlertType::parse("BOGUS"), None);
    /// ```
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
    }

    /// Lowercase token used in CSS classes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Caution => "caution",
        }
    }

    /// Title used when no localized string exists.
    #[must_use]
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Tip => "Tip",
            Self::Important => "Important",
            Self::Warning => "Warning",
            Self::Caution => "Caution",
        }
    }

    /// Localizer key for the title, e.g. `alertnote`.
    #[must_use]
    pub fn localization_key(self) -> String {
        format!("alert{}", self.as_str())
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrites callout-shaped blockquotes into alert nodes.
///
/// Runs in two passes: a read-only walk collects candidate blockquotes, then
/// each candidate is validated and rewritten. A candidate that fails any
/// check is left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertTransform;

impl AstTransform for AlertTransform {
    fn transform(&self, doc: &mut Document<'_>, ctx: &ParseContext) {
        let candidates = find_candidates(doc);
        for blockquote in candidates {
            rewrite(doc, blockquote, ctx.lang());
        }
    }
}

/// First source line of a paragraph.
struct MarkerLine<'s> {
    /// Line content without the terminator.
    content: &'s str,
    /// Offset just past the line terminator.
    cutoff: usize,
}

fn marker_line<'s>(doc: &Document<'s>, paragraph: NodeId) -> MarkerLine<'s> {
    let source = doc.source();
    let start = doc
        .first_child(paragraph)
        .map_or(doc.span(paragraph), |child| doc.span(child))
        .start
        .min(source.len());
    let rest = &source[start..];
    let (line_len, cutoff_len) = match rest.find('\n') {
        Some(i) => (i, i + 1),
        None => (rest.len(), rest.len()),
    };
    MarkerLine {
        content: rest[..line_len].trim_end_matches('\r'),
        cutoff: start + cutoff_len,
    }
}

fn candidate_paragraph(doc: &Document<'_>, blockquote: NodeId) -> Option<NodeId> {
    let first = doc.first_child(blockquote)?;
    matches!(doc.kind(first), NodeKind::Paragraph).then_some(first)
}

fn find_candidates(doc: &Document<'_>) -> Vec<NodeId> {
    let mut candidates = Vec::new();
    doc.walk(doc.root(), |id, entering| {
        if !entering || !matches!(doc.kind(id), NodeKind::Blockquote) {
            return WalkStatus::Continue;
        }
        let Some(paragraph) = candidate_paragraph(doc, id) else {
            return WalkStatus::Continue;
        };
        if !marker_line(doc, paragraph).content.starts_with("[!") {
            return WalkStatus::Continue;
        }
        tracing::trace!(span = ?doc.span(id), "Callout candidate");
        candidates.push(id);
        WalkStatus::SkipChildren
    });
    candidates
}

/// Edit to apply to the first paragraph's leading children.
enum MarkerEdit {
    Remove(NodeId),
    Trim(NodeId, Segment),
}

/// Work out which children cover the marker line.
///
/// Returns `None` when inline markup starts on the marker line.
fn plan_marker_removal(doc: &Document<'_>, paragraph: NodeId, cutoff: usize) -> Option<Vec<MarkerEdit>> {
    let mut edits = Vec::new();
    for &child in doc.children(paragraph) {
        match doc.kind(child) {
            NodeKind::Text(text) => {
                let segment = text.segment;
                if segment.stop <= cutoff {
                    edits.push(MarkerEdit::Remove(child));
                } else if segment.start < cutoff {
                    edits.push(MarkerEdit::Trim(child, segment.with_start(cutoff)));
                    break;
                } else {
                    break;
                }
            }
            _ => {
                if doc.span(child).start < cutoff {
                    return None;
                }
                break;
            }
        }
    }
    Some(edits)
}

fn rewrite(doc: &mut Document<'_>, blockquote: NodeId, lang: &str) {
    let Some(paragraph) = candidate_paragraph(doc, blockquote) else {
        return;
    };
    let Some(parent) = doc.parent(blockquote) else {
        return;
    };

    let line = marker_line(doc, paragraph);
    let Some(close) = line.content.find(']') else {
        return;
    };
    let Some(alert_type) = AlertType::parse(&line.content[2..close]) else {
        return;
    };
    if !line.content[close + 1..].trim().is_empty() {
        return;
    }
    let Some(edits) = plan_marker_removal(doc, paragraph, line.cutoff) else {
        return;
    };

    let alert = doc.new_node(NodeKind::Alert {
        alert_type,
        lang: lang.to_owned(),
    });
    doc.set_span(alert, doc.span(blockquote));

    for edit in edits {
        match edit {
            MarkerEdit::Remove(child) => {
                doc.remove_child(paragraph, child);
            }
            MarkerEdit::Trim(child, segment) => {
                doc.set_segment(child, segment);
            }
        }
    }
    if doc.child_count(paragraph) == 0 {
        doc.remove_child(blockquote, paragraph);
    }

    let children = doc.children(blockquote).to_vec();
    for child in children {
        doc.append_child(alert, child);
    }
    doc.replace_child(parent, blockquote, alert);

    tracing::debug!(alert = %alert_type, lang, "Rewrote blockquote into alert");
}

/// Renders [`NodeKind::Alert`] as a labeled container.
///
/// ```html
/// <div class="markdown-alert markdown-alert-note">
/// <p class="markdown-alert-title">Note</p>
/// ...children...
/// </div>
/// ```
pub struct AlertRenderer {
    localizer: Arc<dyn Localizer>,
}

impl AlertRenderer {
    #[must_use]
    pub fn new(localizer: Arc<dyn Localizer>) -> Self {
        Self { localizer }
    }

    /// Localized title, falling back to the capitalized type.
    #[must_use]
    pub fn title(&self, alert_type: AlertType, lang: &str) -> String {
        let title = self
            .localizer
            .get_string(lang, &alert_type.localization_key());
        if title.is_empty() {
            alert_type.default_title().to_owned()
        } else {
            title
        }
    }
}

impl NodeRenderer for AlertRenderer {
    fn kinds(&self) -> &[Kind] {
        &[Kind::Alert]
    }

    fn render(
        &self,
        w: &mut HtmlWriter<'_>,
        doc: &Document<'_>,
        node: NodeId,
        entering: bool,
        _ctx: &RenderContext<'_>,
    ) -> Result<WalkStatus, Error> {
        let NodeKind::Alert { alert_type, lang } = doc.kind(node) else {
            return Ok(WalkStatus::Continue);
        };
        if entering {
            let class = format!("markdown-alert markdown-alert-{alert_type}");
            w.open("div", &[("class", &class)])?;
            w.raw("\n")?;
            w.open("p", &[("class", "markdown-alert-title")])?;
            w.text(&self.title(*alert_type, lang))?;
            w.close("p")?;
            w.raw("\n")?;
        } else {
            w.close("div")?;
            w.raw("\n")?;
        }
        Ok(WalkStatus::Continue)
    }
}
