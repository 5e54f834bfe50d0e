//! URL recognition and candidate resolution
//!
//! Discovered link candidates may be relative ("p2.html", "/css/site.css")
//! or absolute. This module decides which is which and resolves relative
//! candidates against their source page by joining the source's scheme and
//! host with the candidate path. Note this is deliberately *not* full
//! RFC 3986 relative-reference resolution: `http://a.test/x/` + `p2.html`
//! resolves to `http://a.test/p2.html`, not `http://a.test/x/p2.html`.

use crate::UrlError;
use url::Url;

/// Parses a string as an absolute http/https URL with a host.
pub fn parse_url(s: &str) -> Result<Url, UrlError> {
    let url = Url::parse(s).map_err(|e| UrlError::Parse(format!("{}: {}", s, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Returns true if `s` already looks like an absolute http/https URL.
pub fn is_http_url(s: &str) -> bool {
    parse_url(s).is_ok()
}

/// Resolves a raw link candidate against the page it was found on.
///
/// URL-shaped candidates are taken as-is. Anything else is joined under the
/// source's scheme and host (port preserved when present): the candidate
/// becomes the entire path of the resolved URL regardless of the source's
/// own path.
pub fn resolve_candidate(source: &Url, candidate: &str) -> Result<Url, UrlError> {
    let candidate = candidate.trim();

    if is_http_url(candidate) {
        return parse_url(candidate);
    }

    let host = source.host_str().ok_or(UrlError::MissingHost)?;
    let path = candidate.trim_start_matches('/');

    let joined = match source.port() {
        Some(port) => format!("{}://{}:{}/{}", source.scheme(), host, port, path),
        None => format!("{}://{}/{}", source.scheme(), host, path),
    };

    parse_url(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_accepts_http_and_https() {
        assert!(parse_url("http://example.com/").is_ok());
        assert!(parse_url("https://example.com/a/b?c=d").is_ok());
    }

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        assert!(matches!(
            parse_url("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            parse_url("mailto:a@example.com"),
            Err(UrlError::InvalidScheme(_)) | Err(UrlError::MissingHost)
        ));
    }

    #[test]
    fn test_parse_url_rejects_relative() {
        assert!(parse_url("p2.html").is_err());
        assert!(parse_url("/p2").is_err());
    }

    #[test]
    fn test_resolve_absolute_candidate_passes_through() {
        let source = Url::parse("http://a.test/x/").unwrap();
        let resolved = resolve_candidate(&source, "http://b.test/y").unwrap();
        assert_eq!(resolved.as_str(), "http://b.test/y");
    }

    #[test]
    fn test_resolve_relative_joins_scheme_and_host() {
        let source = Url::parse("http://a.test/x/").unwrap();
        let resolved = resolve_candidate(&source, "p2.html").unwrap();
        assert_eq!(resolved.as_str(), "http://a.test/p2.html");
    }

    #[test]
    fn test_resolve_rooted_candidate() {
        let source = Url::parse("http://a.test/deep/page.html").unwrap();
        let resolved = resolve_candidate(&source, "/p2").unwrap();
        assert_eq!(resolved.as_str(), "http://a.test/p2");
    }

    #[test]
    fn test_resolve_preserves_port() {
        let source = Url::parse("http://127.0.0.1:8080/").unwrap();
        let resolved = resolve_candidate(&source, "/assets/site.css").unwrap();
        assert_eq!(resolved.as_str(), "http://127.0.0.1:8080/assets/site.css");
    }

    #[test]
    fn test_resolve_ignores_source_path() {
        // Scheme+host join, not relative-path semantics.
        let source = Url::parse("http://a.test/x/y/z.html").unwrap();
        let resolved = resolve_candidate(&source, "other.html").unwrap();
        assert_eq!(resolved.as_str(), "http://a.test/other.html");
    }
}
