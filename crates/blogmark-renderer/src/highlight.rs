//! Syntax highlighting for fenced code blocks.
//!
//! Blocks whose info string names a language known to `syntect` are written
//! as class-annotated spans inside `<pre class="highlight">`, ready for a
//! stylesheet. Unknown languages and unfenced blocks fall through to the
//! plain [`HtmlRenderer`] output.

use std::sync::Arc;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::ast::{Document, Kind, NodeId, NodeKind, WalkStatus};
use crate::error::Error;
use crate::html::{HtmlRenderer, HtmlWriter};
use crate::renderer::{NodeRenderer, RenderContext};

/// Renders [`NodeKind::CodeBlock`] with highlighted tokens.
///
/// Cloning shares the loaded syntax definitions.
#[derive(Clone)]
pub struct CodeHighlighter {
    syntax_set: Arc<SyntaxSet>,
}

impl CodeHighlighter {
    /// Highlighter over the bundled syntax definitions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            syntax_set: Arc::new(SyntaxSet::load_defaults_newlines()),
        }
    }

    /// Highlighted HTML for `code`, or `None` when `lang` is unknown.
    #[must_use]
    pub fn highlight(&self, lang: &str, code: &str) -> Option<String> {
        let syntax = self.syntax_set.find_syntax_by_token(lang)?;
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::warn!(lang, error = %e, "Highlighting failed, writing plain code");
                return None;
            }
        }
        Some(generator.finalize())
    }
}

impl Default for CodeHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRenderer for CodeHighlighter {
    fn kinds(&self) -> &[Kind] {
        &[Kind::CodeBlock]
    }

    fn render(
        &self,
        w: &mut HtmlWriter<'_>,
        doc: &Document<'_>,
        node: NodeId,
        entering: bool,
        ctx: &RenderContext<'_>,
    ) -> Result<WalkStatus, Error> {
        if entering
            && let NodeKind::CodeBlock { info: Some(info) } = doc.kind(node)
            && let Some(lang) = info.split_whitespace().next()
            && let Some(html) = self.highlight(lang, &doc.text_content(node))
        {
            w.raw(r#"<pre class="highlight">"#)?;
            w.open("code", &[("class", &format!("language-{lang}"))])?;
            w.raw(&html)?;
            return Ok(WalkStatus::SkipChildren);
        }
        HtmlRenderer.render(w, doc, node, entering, ctx)
    }
}
