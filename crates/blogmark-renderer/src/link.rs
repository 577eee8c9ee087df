//! Link and image rendering.
//!
//! In absolute mode destinations are resolved against the public base URL
//! so feeds and e-mails carry working links. Links whose original
//! destination was already absolute open in a new tab. Images are wrapped
//! in a link to themselves and load lazily.

use std::sync::Arc;

use crate::ast::{Document, Kind, NodeId, NodeKind, WalkStatus};
use crate::error::Error;
use crate::html::HtmlWriter;
use crate::renderer::{NodeRenderer, RenderContext};
use crate::resolve::UrlResolver;

pub struct LinkRenderer {
    resolver: Arc<dyn UrlResolver>,
}

impl LinkRenderer {
    #[must_use]
    pub fn new(resolver: Arc<dyn UrlResolver>) -> Self {
        Self { resolver }
    }

    /// Output destination for `original`.
    ///
    /// Only the first resolver candidate is used; with no candidates the
    /// original destination is kept.
    fn destination(&self, original: &str, ctx: &RenderContext<'_>) -> Result<String, Error> {
        if ctx.absolute_links && !ctx.public_base.is_empty() {
            let resolved = self.resolver.resolve(ctx.public_base, original)?;
            if let Some(first) = resolved.into_iter().next() {
                return Ok(first);
            }
        }
        Ok(original.to_owned())
    }

    fn render_link(
        &self,
        w: &mut HtmlWriter<'_>,
        destination: &str,
        title: Option<&str>,
        entering: bool,
        ctx: &RenderContext<'_>,
    ) -> Result<WalkStatus, Error> {
        if !entering {
            w.close("a")?;
            return Ok(WalkStatus::Continue);
        }
        let href = self.destination(destination, ctx)?;
        let mut attrs = vec![("href", href.as_str())];
        if self.resolver.is_absolute(destination) {
            attrs.push(("target", "_blank"));
            attrs.push(("rel", "noopener"));
        }
        if let Some(title) = title {
            attrs.push(("title", title));
        }
        w.open("a", &attrs)?;
        Ok(WalkStatus::Continue)
    }

    fn render_image(
        &self,
        w: &mut HtmlWriter<'_>,
        doc: &Document<'_>,
        node: NodeId,
        destination: &str,
        title: Option<&str>,
        ctx: &RenderContext<'_>,
    ) -> Result<WalkStatus, Error> {
        let src = self.destination(destination, ctx)?;
        let alt = doc.text_content(node);
        w.open("a", &[("href", &src)])?;
        let mut attrs = vec![("src", src.as_str()), ("alt", alt.as_str()), ("loading", "lazy")];
        if let Some(title) = title {
            attrs.push(("title", title));
        }
        w.open("img", &attrs)?;
        w.close("a")?;
        Ok(WalkStatus::SkipChildren)
    }
}

impl NodeRenderer for LinkRenderer {
    fn kinds(&self) -> &[Kind] {
        &[Kind::Link, Kind::Image]
    }

    fn render(
        &self,
        w: &mut HtmlWriter<'_>,
        doc: &Document<'_>,
        node: NodeId,
        entering: bool,
        ctx: &RenderContext<'_>,
    ) -> Result<WalkStatus, Error> {
        match doc.kind(node) {
            NodeKind::Link { destination, title } => {
                self.render_link(w, destination, title.as_deref(), entering, ctx)
            }
            NodeKind::Image { destination, title } if entering => {
                self.render_image(w, doc, node, destination, title.as_deref(), ctx)
            }
            _ => Ok(WalkStatus::Continue),
        }
    }
}
