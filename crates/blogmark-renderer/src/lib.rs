//! Markdown conversion for blog posts.
//!
//! This crate turns post bodies and titles into HTML or plain text. On top
//! of CommonMark (via `pulldown-cmark`) it adds:
//!
//! - GitHub-style callouts: a blockquote starting with `[!NOTE]`, `[!TIP]`,
//!   `[!IMPORTANT]`, `[!WARNING]` or `[!CAUTION]` becomes a titled
//!   container ([`AlertTransform`], [`AlertRenderer`])
//! - Absolute links for feeds: destinations resolved against the site's
//!   public address, external links opening in a new tab, images wrapped in
//!   a link with lazy loading ([`LinkRenderer`])
//! - `==highlighted==` text, `:emoji:` shortcodes and syntax-highlighted
//!   fenced code ([`Mark`], [`Emoji`], [`CodeHighlighter`])
//! - Plain-text extraction for summaries and titles
//!
//! # Architecture
//!
//! Parsing folds the event stream into an arena tree ([`Document`]) whose
//! text nodes point into the source buffer. AST transforms rewrite the tree,
//! then per-kind [`NodeRenderer`]s write HTML. A [`Pipeline`] bundles parse
//! options, transforms and renderers with priorities; [`Markdown`] owns the
//! three pipelines a site needs (relative, absolute, title) and builds them
//! once.
//!
//! # Example
//!
//! ```
//! use blogmark_renderer::Markdown;
//!
//! let md = Markdown::new("https://example.com");
//! let html = md
//!     .convert_to_string("> [!TIP]\n> Use **absolute** mode in feeds.", false, "en")
//!     .unwrap();
//! assert!(html.contains(r#"<div class="markdown-alert markdown-alert-tip">"#));
//! assert_eq!(
//!     md.convert_to_plain_text("Some *emphasis*."),
//!     "Some emphasis."
//! );
//! ```

mod alert;
mod ast;
mod emoji;
mod error;
mod highlight;
mod html;
mod link;
mod linkify;
mod mark;
mod markdown;
mod parser;
mod pipe;
mod pipeline;
mod renderer;
mod resolve;
mod strings;
mod text;

pub use alert::{AlertRenderer, AlertTransform, AlertType};
pub use ast::{Document, Kind, NodeId, NodeKind, Segment, Text, WalkStatus};
pub use emoji::Emoji;
pub use error::Error;
pub use highlight::CodeHighlighter;
pub use html::{HtmlRenderer, HtmlWriter, escape_html, slugify};
pub use link::LinkRenderer;
pub use linkify::Linkify;
pub use mark::Mark;
pub use markdown::Markdown;
pub use parser::{InlineOnly, LANG_KEY, ParseContext, ParserOptions, parse};
pub use pipe::{PipeReader, PipeWriter, pipe};
pub use pipeline::{
    ALERT_PRIORITY, AstTransform, DEFAULT_RENDERER_PRIORITY, EMOJI_PRIORITY, HIGHLIGHT_PRIORITY,
    INLINE_ONLY_PRIORITY, LINK_RENDERER_PRIORITY, LINKIFY_PRIORITY, MARK_PRIORITY, Pipeline,
    PipelineBuilder, Pipelines, TextTransform,
};
pub use renderer::{NodeRenderer, RenderContext, RendererTable, render_document};
pub use resolve::{ResolutionError, StandardResolver, UrlResolver, is_absolute_url};
pub use strings::{Localizer, NoStrings, Strings, StringsError};
pub use text::html_text_from_reader;
