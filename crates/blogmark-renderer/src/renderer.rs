//! Node renderer dispatch.
//!
//! Rendering walks the [`Document`] once, calling the registered
//! [`NodeRenderer`] for each node on entry and exit. Renderers are looked up
//! per [`Kind`]; when several are registered for the same kind the one with
//! the lowest priority number wins.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::ast::{Document, Kind, NodeId, WalkStatus};
use crate::error::Error;
use crate::html::HtmlWriter;

/// Settings visible to renderers for one conversion.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderContext<'a> {
    /// Rewrite link and image destinations against `public_base`.
    pub absolute_links: bool,
    /// Public base URL of the site; empty disables absolutization.
    pub public_base: &'a str,
    /// Language tag of the conversion.
    pub lang: &'a str,
}

/// Renders one or more node kinds to HTML.
///
/// Implementations must not keep per-call state: a single renderer instance
/// is shared by every conversion running through its pipeline.
pub trait NodeRenderer: Send + Sync {
    /// Node kinds this renderer handles.
    fn kinds(&self) -> &[Kind];

    /// Render `node`. Called with `entering = true` before the children and
    /// `entering = false` after them (also when children were skipped).
    fn render(
        &self,
        w: &mut HtmlWriter<'_>,
        doc: &Document<'_>,
        node: NodeId,
        entering: bool,
        ctx: &RenderContext<'_>,
    ) -> Result<WalkStatus, Error>;
}

/// Per-kind renderer lookup.
#[derive(Clone, Default)]
pub struct RendererTable {
    entries: HashMap<Kind, (i32, Arc<dyn NodeRenderer>)>,
}

impl RendererTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `renderer` for all of its kinds.
    ///
    /// A kind already held at a lower priority number is left alone; equal
    /// priority is replaced by the later registration.
    pub fn register(&mut self, renderer: Arc<dyn NodeRenderer>, priority: i32) {
        for &kind in renderer.kinds() {
            match self.entries.get(&kind) {
                Some((existing, _)) if *existing < priority => {}
                _ => {
                    self.entries.insert(kind, (priority, Arc::clone(&renderer)));
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, kind: Kind) -> Option<&dyn NodeRenderer> {
        self.entries.get(&kind).map(|(_, r)| r.as_ref())
    }
}

impl fmt::Debug for RendererTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.entries.iter().map(|(k, (p, _))| (*k, *p)).collect();
        kinds.sort_by_key(|(k, _)| format!("{k:?}"));
        f.debug_struct("RendererTable").field("kinds", &kinds).finish()
    }
}

/// Render `doc` into `sink`.
///
/// Nodes without a registered renderer are transparent: their children are
/// still visited. The first renderer error aborts the walk and is returned.
pub fn render_document(
    doc: &Document<'_>,
    renderers: &RendererTable,
    ctx: &RenderContext<'_>,
    sink: &mut dyn Write,
) -> Result<(), Error> {
    let mut w = HtmlWriter::new(sink);
    doc.try_walk(doc.root(), &mut |node, entering| {
        match renderers.get(doc.kind(node).kind()) {
            Some(renderer) => renderer.render(&mut w, doc, node, entering, ctx),
            None => Ok(WalkStatus::Continue),
        }
    })?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::html::HtmlRenderer;
    use crate::parser::{ParserOptions, parse};
    use pretty_assertions::assert_eq;

    /// Renders paragraphs as `<div>` to observe override behavior.
    struct DivParagraphs;

    impl NodeRenderer for DivParagraphs {
        fn kinds(&self) -> &[Kind] {
            &[Kind::Paragraph]
        }

        fn render(
            &self,
            w: &mut HtmlWriter<'_>,
            _doc: &Document<'_>,
            _node: NodeId,
            entering: bool,
            _ctx: &RenderContext<'_>,
        ) -> Result<WalkStatus, Error> {
            w.raw(if entering { "<div>" } else { "</div>" })?;
            Ok(WalkStatus::Continue)
        }
    }

    /// Fails on every text node.
    struct FailingText;

    impl NodeRenderer for FailingText {
        fn kinds(&self) -> &[Kind] {
            &[Kind::Text]
        }

        fn render(
            &self,
            _w: &mut HtmlWriter<'_>,
            _doc: &Document<'_>,
            _node: NodeId,
            _entering: bool,
            _ctx: &RenderContext<'_>,
        ) -> Result<WalkStatus, Error> {
            Err(Error::Html("boom".to_owned()))
        }
    }

    fn render_with(table: &RendererTable, markdown: &str) -> Result<String, Error> {
        let doc = parse(markdown, ParserOptions::full());
        let mut out = Vec::new();
        render_document(&doc, table, &RenderContext::default(), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_lower_priority_number_wins() {
        let mut table = RendererTable::new();
        table.register(Arc::new(DivParagraphs), 500);
        table.register(Arc::new(HtmlRenderer), 1000);
        assert_eq!(render_with(&table, "hi").unwrap(), "<div>hi</div>");
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let mut table = RendererTable::new();
        table.register(Arc::new(HtmlRenderer), 1000);
        table.register(Arc::new(DivParagraphs), 500);
        assert_eq!(render_with(&table, "hi").unwrap(), "<div>hi</div>");
    }

    #[test]
    fn test_unregistered_kind_is_transparent() {
        let mut table = RendererTable::new();
        table.register(Arc::new(HtmlRenderer), 1000);
        table.entries.remove(&Kind::Emphasis);
        assert_eq!(render_with(&table, "*x*").unwrap(), "<p>x</p>\n");
    }

    #[test]
    fn test_renderer_error_aborts() {
        let mut table = RendererTable::new();
        table.register(Arc::new(HtmlRenderer), 1000);
        table.register(Arc::new(FailingText), 10);
        let err = render_with(&table, "text").unwrap_err();
        assert!(matches!(err, Error::Html(_)));
    }

    #[test]
    fn test_exit_called_after_skip_children() {
        let doc = parse("![alt](a.png)", ParserOptions::full());
        let mut calls = Vec::new();
        doc.walk(doc.root(), |node, entering| {
            if matches!(doc.kind(node), NodeKind::Image { .. }) {
                calls.push(entering);
                return WalkStatus::SkipChildren;
            }
            WalkStatus::Continue
        });
        assert_eq!(calls, vec![true, false]);
    }
}
