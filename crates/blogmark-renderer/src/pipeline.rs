//! Conversion pipelines.
//!
//! A [`Pipeline`] is parse options plus prioritized text transforms, AST
//! transforms and node renderers. It holds no per-call state and is shared
//! by every conversion that uses it.

use std::borrow::Cow;
use std::io::Write;
use std::sync::Arc;

use crate::alert::{AlertRenderer, AlertTransform};
use crate::ast::Document;
use crate::emoji::Emoji;
use crate::error::Error;
use crate::highlight::CodeHighlighter;
use crate::html::HtmlRenderer;
use crate::link::LinkRenderer;
use crate::linkify::Linkify;
use crate::mark::Mark;
use crate::parser::{InlineOnly, ParseContext, ParserOptions, parse};
use crate::renderer::{NodeRenderer, RenderContext, RendererTable, render_document};
use crate::resolve::UrlResolver;
use crate::strings::Localizer;

/// Priority of the default HTML renderer. Anything lower overrides it.
pub const DEFAULT_RENDERER_PRIORITY: i32 = 1000;
/// Priority of [`AlertTransform`] and [`AlertRenderer`].
pub const ALERT_PRIORITY: i32 = 500;
/// Priority of [`LinkRenderer`].
pub const LINK_RENDERER_PRIORITY: i32 = 500;
/// Priority of [`CodeHighlighter`].
pub const HIGHLIGHT_PRIORITY: i32 = 500;
/// Priority of [`Emoji`].
pub const EMOJI_PRIORITY: i32 = 700;
/// Priority of [`Mark`].
pub const MARK_PRIORITY: i32 = 800;
/// Priority of [`Linkify`].
pub const LINKIFY_PRIORITY: i32 = 999;
/// Priority of [`InlineOnly`] in pipelines without block structures.
pub const INLINE_ONLY_PRIORITY: i32 = 0;

/// Preprocess raw markdown text before parsing.
pub trait TextTransform: Send + Sync {
    /// Transform the input markdown text, returning an owned or borrowed string.
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str>;
}

impl<F> TextTransform for F
where
    F: for<'a> Fn(&'a str) -> Cow<'a, str> + Send + Sync,
{
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        (self)(input)
    }
}

/// Mutate the parsed tree after parsing.
pub trait AstTransform: Send + Sync {
    fn transform(&self, doc: &mut Document<'_>, ctx: &ParseContext);
}

impl<F> AstTransform for F
where
    F: Fn(&mut Document<'_>, &ParseContext) + Send + Sync,
{
    fn transform(&self, doc: &mut Document<'_>, ctx: &ParseContext) {
        (self)(doc, ctx);
    }
}

/// Immutable conversion pipeline.
pub struct Pipeline {
    options: ParserOptions,
    text_transforms: Vec<Box<dyn TextTransform>>,
    ast_transforms: Vec<Box<dyn AstTransform>>,
    renderers: RendererTable,
    absolute_links: bool,
    public_base: String,
}

impl Pipeline {
    /// Start building a pipeline.
    #[must_use]
    pub fn builder(options: ParserOptions) -> PipelineBuilder {
        PipelineBuilder::new(options)
    }

    #[must_use]
    pub fn options(&self) -> ParserOptions {
        self.options
    }

    #[must_use]
    pub fn absolute_links(&self) -> bool {
        self.absolute_links
    }

    /// Run the text transforms over `source`.
    #[must_use]
    pub fn preprocess<'a>(&self, source: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(source);
        for transform in &self.text_transforms {
            let next = match transform.transform(&current) {
                Cow::Borrowed(_) => None,
                Cow::Owned(owned) => Some(owned),
            };
            if let Some(owned) = next {
                current = Cow::Owned(owned);
            }
        }
        current
    }

    /// Parse already preprocessed text and run the AST transforms.
    #[must_use]
    pub fn parse<'s>(&self, source: &'s str, ctx: &ParseContext) -> Document<'s> {
        let mut doc = parse(source, self.options);
        for transform in &self.ast_transforms {
            transform.transform(&mut doc, ctx);
        }
        doc
    }

    /// Render a parsed document into `sink`.
    pub fn render(&self, doc: &Document<'_>, lang: &str, sink: &mut dyn Write) -> Result<(), Error> {
        let ctx = RenderContext {
            absolute_links: self.absolute_links,
            public_base: &self.public_base,
            lang,
        };
        render_document(doc, &self.renderers, &ctx, sink)
    }

    /// Preprocess, parse, transform and render `source`.
    pub fn convert(&self, source: &str, lang: &str, sink: &mut dyn Write) -> Result<(), Error> {
        let source = self.preprocess(source);
        let doc = self.parse(&source, &ParseContext::with_lang(lang));
        self.render(&doc, lang, sink)
    }
}

/// Builder for [`Pipeline`].
///
/// The default HTML renderer is always registered at
/// [`DEFAULT_RENDERER_PRIORITY`]. Transforms run in ascending priority
/// order; equal priorities keep registration order.
pub struct PipelineBuilder {
    options: ParserOptions,
    text_transforms: Vec<(i32, Box<dyn TextTransform>)>,
    ast_transforms: Vec<(i32, Box<dyn AstTransform>)>,
    renderers: RendererTable,
    absolute_links: bool,
    public_base: String,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        let mut renderers = RendererTable::new();
        renderers.register(Arc::new(HtmlRenderer), DEFAULT_RENDERER_PRIORITY);
        let builder = Self {
            options,
            text_transforms: Vec::new(),
            ast_transforms: Vec::new(),
            renderers,
            absolute_links: false,
            public_base: String::new(),
        };
        if options.block_structures {
            builder
        } else {
            builder.text_transform(InlineOnly, INLINE_ONLY_PRIORITY)
        }
    }

    #[must_use]
    pub fn text_transform<T: TextTransform + 'static>(mut self, transform: T, priority: i32) -> Self {
        self.text_transforms.push((priority, Box::new(transform)));
        self
    }

    #[must_use]
    pub fn ast_transform<T: AstTransform + 'static>(mut self, transform: T, priority: i32) -> Self {
        self.ast_transforms.push((priority, Box::new(transform)));
        self
    }

    #[must_use]
    pub fn renderer<R: NodeRenderer + 'static>(mut self, renderer: R, priority: i32) -> Self {
        self.renderers.register(Arc::new(renderer), priority);
        self
    }

    /// Public base URL handed to renderers.
    #[must_use]
    pub fn public_base(mut self, base: impl Into<String>) -> Self {
        self.public_base = base.into();
        self
    }

    /// Resolve link destinations against the public base.
    #[must_use]
    pub fn absolute_links(mut self, enabled: bool) -> Self {
        self.absolute_links = enabled;
        self
    }

    #[must_use]
    pub fn build(mut self) -> Pipeline {
        self.text_transforms.sort_by_key(|(priority, _)| *priority);
        self.ast_transforms.sort_by_key(|(priority, _)| *priority);
        tracing::debug!(
            absolute_links = self.absolute_links,
            block_structures = self.options.block_structures,
            text_transforms = self.text_transforms.len(),
            ast_transforms = self.ast_transforms.len(),
            renderers = ?self.renderers,
            "Built markdown pipeline"
        );
        Pipeline {
            options: self.options,
            text_transforms: self.text_transforms.into_iter().map(|(_, t)| t).collect(),
            ast_transforms: self.ast_transforms.into_iter().map(|(_, t)| t).collect(),
            renderers: self.renderers,
            absolute_links: self.absolute_links,
            public_base: self.public_base,
        }
    }
}

/// The three pipelines used by [`crate::Markdown`].
pub struct Pipelines {
    /// Post bodies with destinations as written.
    pub relative: Pipeline,
    /// Post bodies with destinations resolved against the public address.
    pub absolute: Pipeline,
    /// Titles: inline markup and typography only.
    pub title: Pipeline,
}

impl Pipelines {
    #[must_use]
    pub fn build(
        public_address: &str,
        resolver: &Arc<dyn UrlResolver>,
        localizer: &Arc<dyn Localizer>,
    ) -> Self {
        let highlighter = CodeHighlighter::new();
        let body = |absolute: bool| {
            Pipeline::builder(ParserOptions::full())
                .ast_transform(AlertTransform, ALERT_PRIORITY)
                .ast_transform(Emoji, EMOJI_PRIORITY)
                .ast_transform(Mark, MARK_PRIORITY)
                .ast_transform(Linkify, LINKIFY_PRIORITY)
                .renderer(AlertRenderer::new(Arc::clone(localizer)), ALERT_PRIORITY)
                .renderer(LinkRenderer::new(Arc::clone(resolver)), LINK_RENDERER_PRIORITY)
                .renderer(highlighter.clone(), HIGHLIGHT_PRIORITY)
                .public_base(public_address)
                .absolute_links(absolute)
                .build()
        };
        Self {
            relative: body(false),
            absolute: body(true),
            title: Pipeline::builder(ParserOptions::title())
                .ast_transform(Emoji, EMOJI_PRIORITY)
                .build(),
        }
    }

    /// Body pipeline for the requested link mode.
    #[must_use]
    pub fn body(&self, absolute: bool) -> &Pipeline {
        if absolute { &self.absolute } else { &self.relative }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeKind, Segment, Text};
    use crate::resolve::StandardResolver;
    use crate::strings::NoStrings;
    use pretty_assertions::assert_eq;

    fn convert(pipeline: &Pipeline, source: &str) -> String {
        let mut out = Vec::new();
        pipeline.convert(source, "en", &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn pipelines() -> Pipelines {
        let resolver: Arc<dyn UrlResolver> = Arc::new(StandardResolver);
        let localizer: Arc<dyn Localizer> = Arc::new(NoStrings);
        Pipelines::build("https://example.com", &resolver, &localizer)
    }

    struct Append(&'static str);

    impl TextTransform for Append {
        fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
            Cow::Owned(format!("{input}{}", self.0))
        }
    }

    /// Appends the conversion language as a literal node.
    struct LangMarker;

    impl AstTransform for LangMarker {
        fn transform(&self, doc: &mut Document<'_>, ctx: &ParseContext) {
            let literal = doc.new_node(NodeKind::Literal {
                value: ctx.lang().to_owned(),
            });
            let root = doc.root();
            doc.append_child(root, literal);
        }
    }

    #[test]
    fn test_text_transforms_run_in_priority_order() {
        let pipeline = Pipeline::builder(ParserOptions::full())
            .text_transform(Append("b"), 20)
            .text_transform(Append("a"), 10)
            .build();
        assert_eq!(pipeline.preprocess("x"), "xab");
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let pipeline = Pipeline::builder(ParserOptions::full())
            .text_transform(Append("1"), 5)
            .text_transform(Append("2"), 5)
            .build();
        assert_eq!(pipeline.preprocess(""), "12");
    }

    #[test]
    fn test_unchanged_text_stays_borrowed() {
        let pipeline = Pipeline::builder(ParserOptions::title()).build();
        assert!(matches!(pipeline.preprocess("Plain title"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_ast_transform_sees_context() {
        let pipeline = Pipeline::builder(ParserOptions::full())
            .ast_transform(LangMarker, 1)
            .build();
        let mut out = Vec::new();
        pipeline.convert("", "fr", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "fr");
    }

    #[test]
    fn test_body_pipelines_differ_only_in_link_mode() {
        let pipelines = pipelines();
        assert_eq!(
            convert(pipelines.body(false), "[a](/a)"),
            "<p><a href=\"/a\">a</a></p>\n"
        );
        assert_eq!(
            convert(pipelines.body(true), "[a](/a)"),
            "<p><a href=\"https://example.com/a\">a</a></p>\n"
        );
    }

    #[test]
    fn test_body_pipeline_renders_alerts() {
        let html = convert(&pipelines().relative, "> [!NOTE]\n> Hi");
        assert!(html.starts_with("<div class=\"markdown-alert markdown-alert-note\">\n"));
        assert!(html.contains(">Note</p>\n<p>Hi</p>\n</div>\n"));
    }

    #[test]
    fn test_title_pipeline_has_no_alerts_or_blocks() {
        let pipelines = pipelines();
        assert_eq!(
            convert(&pipelines.title, "> [!NOTE] *Hi*"),
            "<p>&gt; [!NOTE] <em>Hi</em></p>\n"
        );
        assert_eq!(convert(&pipelines.title, "# Title"), "<p># Title</p>\n");
    }

    #[test]
    fn test_title_pipeline_plain_links() {
        let html = convert(&pipelines().title, "[a](https://x.org)");
        assert_eq!(html, "<p><a href=\"https://x.org\">a</a></p>\n");
    }

    #[test]
    fn test_linkify_in_body_pipeline() {
        let html = convert(&pipelines().relative, "see https://x.org");
        assert_eq!(
            html,
            "<p>see <a href=\"https://x.org\" target=\"_blank\" rel=\"noopener\">https://x.org</a></p>\n"
        );
    }

    #[test]
    fn test_body_pipeline_extensions() {
        let pipelines = pipelines();
        for pipeline in [&pipelines.relative, &pipelines.absolute] {
            assert_eq!(
                convert(pipeline, "==Big== news :tada:"),
                "<p><mark>Big</mark> news \u{1f389}</p>\n"
            );
            assert!(convert(pipeline, "```rust\nfn f() {}\n```").starts_with(
                r#"<pre class="highlight"><code class="language-rust">"#
            ));
        }
    }

    #[test]
    fn test_title_pipeline_has_emoji_only() {
        assert_eq!(
            convert(&pipelines().title, "==Big== news :tada:"),
            "<p>==Big== news \u{1f389}</p>\n"
        );
    }

    #[test]
    fn test_parse_exposes_transformed_tree() {
        let pipeline = pipelines();
        let doc = pipeline
            .relative
            .parse("plain", &ParseContext::with_lang("en"));
        let para = doc.children(doc.root())[0];
        assert_eq!(
            doc.kind(doc.children(para)[0]),
            &NodeKind::Text(Text::new(Segment::new(0, 5)))
        );
    }
}
