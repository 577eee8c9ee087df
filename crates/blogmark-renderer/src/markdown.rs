//! Conversion entry points.

use std::io::{BufWriter, Write};
use std::sync::{Arc, OnceLock};

use crate::error::Error;
use crate::pipeline::{Pipeline, Pipelines};
use crate::resolve::{StandardResolver, UrlResolver};
use crate::strings::{Localizer, NoStrings};
use crate::text::render_to_text;

/// Markdown converter for a site.
///
/// Holds the public address and collaborators; the three pipelines are
/// built on first use and shared by all later calls, from any thread.
///
/// # Example
///
/// ```
/// use blogmark_renderer::Markdown;
///
/// let md = Markdown::new("https://example.com");
/// let html = md.convert_to_string("[About](/about)", true, "en").unwrap();
/// assert_eq!(html, "<p><a href=\"https://example.com/about\">About</a></p>\n");
/// assert_eq!(md.convert_title("*Hello* & \"world\""), "Hello & \u{201c}world\u{201d}");
/// ```
pub struct Markdown {
    public_address: String,
    resolver: Arc<dyn UrlResolver>,
    localizer: Arc<dyn Localizer>,
    pipelines: OnceLock<Pipelines>,
}

impl Markdown {
    /// Converter using [`StandardResolver`] and no localized strings.
    #[must_use]
    pub fn new(public_address: impl Into<String>) -> Self {
        Self {
            public_address: public_address.into(),
            resolver: Arc::new(StandardResolver),
            localizer: Arc::new(NoStrings),
            pipelines: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.resolver = resolver;
        self.pipelines = OnceLock::new();
        self
    }

    #[must_use]
    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self.pipelines = OnceLock::new();
        self
    }

    #[must_use]
    pub fn public_address(&self) -> &str {
        &self.public_address
    }

    fn pipelines(&self) -> &Pipelines {
        self.pipelines.get_or_init(|| {
            tracing::debug!(public_address = %self.public_address, "Initializing markdown pipelines");
            Pipelines::build(&self.public_address, &self.resolver, &self.localizer)
        })
    }

    /// Render `source` as HTML into `sink`.
    ///
    /// With `absolute` set, link and image destinations are resolved against
    /// the public address. `lang` selects alert titles.
    pub fn convert(&self, source: &str, absolute: bool, lang: &str, sink: &mut dyn Write) -> Result<(), Error> {
        let mut out = BufWriter::new(sink);
        self.pipelines().body(absolute).convert(source, lang, &mut out)?;
        out.flush()?;
        Ok(())
    }

    /// [`convert`](Self::convert) into a `String`.
    pub fn convert_to_string(&self, source: &str, absolute: bool, lang: &str) -> Result<String, Error> {
        let mut out = Vec::with_capacity(source.len() * 2);
        self.pipelines().body(absolute).convert(source, lang, &mut out)?;
        String::from_utf8(out).map_err(|e| Error::Html(e.to_string()))
    }

    /// Text content of the rendered body (relative links, no language).
    ///
    /// Returns an empty string for empty input and on any failure.
    #[must_use]
    pub fn convert_to_plain_text(&self, source: &str) -> String {
        self.try_convert_to_plain_text(source, false)
            .unwrap_or_default()
    }

    /// Text content of a title rendered with inline markup only.
    ///
    /// Returns an empty string for empty input and on any failure.
    #[must_use]
    pub fn convert_title(&self, source: &str) -> String {
        if source.is_empty() {
            return String::new();
        }
        plain_text(&self.pipelines().title, source).unwrap_or_default()
    }

    /// Fallible plain-text conversion behind [`convert_to_plain_text`](Self::convert_to_plain_text).
    pub fn try_convert_to_plain_text(&self, source: &str, absolute: bool) -> Result<String, Error> {
        if source.is_empty() {
            return Ok(String::new());
        }
        plain_text(self.pipelines().body(absolute), source)
    }
}

fn plain_text(pipeline: &Pipeline, source: &str) -> Result<String, Error> {
    render_to_text(|w| {
        let mut out = BufWriter::new(w);
        pipeline.convert(source, "", &mut out)?;
        out.flush()?;
        Ok(())
    })
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ResolutionError;
    use crate::strings::Strings;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl UrlResolver for CountingResolver {
        fn resolve(&self, base: &str, reference: &str) -> Result<Vec<String>, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StandardResolver.resolve(base, reference)
        }
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_convert_writes_to_sink() {
        let md = Markdown::new("https://example.com");
        let mut out = Vec::new();
        md.convert("Hello", false, "en", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<p>Hello</p>\n");
    }

    #[test]
    fn test_convert_sink_error() {
        let md = Markdown::default();
        let err = md.convert("Hello", false, "en", &mut FailingSink).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_resolver_only_used_in_absolute_mode() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let md = Markdown::new("https://example.com").with_resolver(Arc::<CountingResolver>::clone(&resolver));
        md.convert_to_string("[a](/a) ![b](b.png)", false, "").unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        md.convert_to_string("[a](/a) ![b](b.png)", true, "").unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_public_address_keeps_links() {
        let md = Markdown::new("");
        assert_eq!(
            md.convert_to_string("[a](/a)", true, "").unwrap(),
            "<p><a href=\"/a\">a</a></p>\n"
        );
    }

    #[test]
    fn test_localized_alert_title() {
        let mut strings = Strings::builtin();
        strings.insert("de", "alertnote", "Hinweis");
        let md = Markdown::default().with_localizer(Arc::new(strings));
        let html = md.convert_to_string("> [!NOTE]\n> Text", false, "de").unwrap();
        assert!(html.contains(">Hinweis</p>"));
        let html = md.convert_to_string("> [!NOTE]\n> Text", false, "en").unwrap();
        assert!(html.contains(">Note</p>"));
    }

    #[test]
    fn test_plain_text() {
        let md = Markdown::default();
        assert_eq!(
            md.convert_to_plain_text("# Title\n\nSome *emphasis* & more."),
            "Title\nSome emphasis & more."
        );
    }

    #[test]
    fn test_plain_text_empty() {
        assert_eq!(Markdown::default().convert_to_plain_text(""), "");
        assert_eq!(Markdown::default().convert_title(""), "");
    }

    #[test]
    fn test_plain_text_resolution_failure() {
        let md = Markdown::new("::not a base::");
        let err = md.try_convert_to_plain_text("[a](/a)", true).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
        assert_eq!(md.convert_to_plain_text("[a](/a)"), "a");
    }

    #[test]
    fn test_title_inline_only() {
        let md = Markdown::default();
        assert_eq!(md.convert_title("# Not a *heading*"), "# Not a heading");
        assert_eq!(md.convert_title("  Spaced  "), "Spaced");
        assert_eq!(md.convert_title("It's -- fine..."), "It\u{2019}s \u{2013} fine\u{2026}");
    }

    #[test]
    fn test_pipelines_built_once_across_threads() {
        let md = Markdown::new("https://example.com");
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert_eq!(md.convert_title("*x*"), "x");
                });
            }
        });
        let first: *const Pipelines = md.pipelines();
        let second: *const Pipelines = md.pipelines();
        assert_eq!(first, second);
    }
}
