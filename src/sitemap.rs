//! Sitemap decoding
//!
//! Decodes the standard `<urlset><url><loc>` sitemap document into a list
//! of URL strings for seeding the frontier. Fields other than `loc` are
//! ignored.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Failed to decode sitemap XML: {0}")]
    Xml(#[from] quick_xml::DeError),
}

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    loc: String,
}

/// Decodes sitemap XML bytes into the contained URLs, in document order.
pub fn parse_sitemap(xml: &[u8]) -> Result<Vec<String>, SitemapError> {
    let set: UrlSet = quick_xml::de::from_reader(xml)?;
    Ok(set.urls.into_iter().map(|u| u.loc).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sitemap_in_order() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://a.test/</loc><priority>1.0</priority></url>
  <url><loc>https://a.test/about</loc><lastmod>2020-01-01</lastmod></url>
  <url><loc>https://a.test/contact</loc></url>
</urlset>"#;

        let urls = parse_sitemap(xml).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://a.test/",
                "https://a.test/about",
                "https://a.test/contact"
            ]
        );
    }

    #[test]
    fn test_parse_empty_urlset() {
        let xml = br#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></urlset>"#;
        assert!(parse_sitemap(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_xml_errors() {
        let xml = b"<urlset><url><loc>https://a.test/";
        assert!(parse_sitemap(xml).is_err());
    }
}
