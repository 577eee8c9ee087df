//! URL reference resolution.

use url::Url;

/// A destination could not be resolved against the base URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot resolve {reference:?} against {base:?}: {source}")]
pub struct ResolutionError {
    pub base: String,
    pub reference: String,
    #[source]
    pub source: url::ParseError,
}

impl ResolutionError {
    fn new(base: &str, reference: &str, source: url::ParseError) -> Self {
        Self {
            base: base.to_owned(),
            reference: reference.to_owned(),
            source,
        }
    }
}

/// Resolves link destinations into absolute URLs.
pub trait UrlResolver: Send + Sync {
    /// Resolve `reference` against `base`.
    ///
    /// May return several candidates; callers use the first.
    fn resolve(&self, base: &str, reference: &str) -> Result<Vec<String>, ResolutionError>;

    /// Whether `s` already carries a scheme.
    fn is_absolute(&self, s: &str) -> bool {
        is_absolute_url(s)
    }
}

/// RFC 3986 reference resolution via the `url` crate.
///
/// ```
/// use blogmark_renderer::{StandardResolver, UrlResolver};
///
/// let resolved = StandardResolver.resolve("https://example.com/blog/", "../img/a.png").unwrap();
/// assert_eq!(resolved, vec!["https://example.com/img/a.png".to_owned()]);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardResolver;

impl UrlResolver for StandardResolver {
    fn resolve(&self, base: &str, reference: &str) -> Result<Vec<String>, ResolutionError> {
        let base_url = Url::parse(base).map_err(|e| ResolutionError::new(base, reference, e))?;
        let joined = base_url
            .join(reference)
            .map_err(|e| ResolutionError::new(base, reference, e))?;
        Ok(vec![joined.into()])
    }
}

/// Whether `s` parses as a URL with a scheme.
#[must_use]
pub fn is_absolute_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_relative_path() {
        let resolved = StandardResolver
            .resolve("https://example.com", "img/a.png")
            .unwrap();
        assert_eq!(resolved, vec!["https://example.com/img/a.png".to_owned()]);
    }

    #[test]
    fn test_resolve_root_relative() {
        let resolved = StandardResolver
            .resolve("https://example.com/blog/post", "/about")
            .unwrap();
        assert_eq!(resolved, vec!["https://example.com/about".to_owned()]);
    }

    #[test]
    fn test_resolve_absolute_reference_unchanged() {
        let resolved = StandardResolver
            .resolve("https://example.com", "https://other.org/x")
            .unwrap();
        assert_eq!(resolved, vec!["https://other.org/x".to_owned()]);
    }

    #[test]
    fn test_resolve_fragment() {
        let resolved = StandardResolver
            .resolve("https://example.com/post", "#section")
            .unwrap();
        assert_eq!(resolved, vec!["https://example.com/post#section".to_owned()]);
    }

    #[test]
    fn test_malformed_base() {
        let err = StandardResolver.resolve("not a url", "a").unwrap_err();
        assert_eq!(err.base, "not a url");
        assert_eq!(err.reference, "a");
        assert_eq!(err.source, url::ParseError::RelativeUrlWithoutBase);
    }

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute_url("https://example.com"));
        assert!(is_absolute_url("mailto:me@example.com"));
        assert!(!is_absolute_url("/relative/path"));
        assert!(!is_absolute_url("image.png"));
        assert!(!is_absolute_url("#anchor"));
        assert!(StandardResolver.is_absolute("http://x.org"));
    }
}
