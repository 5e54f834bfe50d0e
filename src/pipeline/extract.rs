//! Link and resource extraction stages
//!
//! Both stages parse the body as HTML and emit the raw attribute values
//! they find; resolution against the source page happens later in the
//! discovery router. Non-HTML bodies simply yield no links.

use super::{DiscoverySink, PipelineError, PipelineStage};
use scraper::{Html, Selector};
use url::Url;

/// Emits every followable reference on the page: anchors plus stylesheet,
/// script, and image resources.
pub struct LinkExtractor;

/// Emits only stylesheet, script, and image resources, skipping anchors.
/// Useful for preserving a fixed set of pages without walking the site.
pub struct ResourceExtractor;

impl PipelineStage for LinkExtractor {
    fn name(&self) -> &'static str {
        "follow-links"
    }

    fn run(
        &self,
        body: &[u8],
        source: &Url,
        sink: &DiscoverySink,
    ) -> Result<Option<Vec<u8>>, PipelineError> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        emit_attr(&document, "a[href]", "href", source, sink);
        emit_resources(&document, source, sink);

        Ok(None)
    }
}

impl PipelineStage for ResourceExtractor {
    fn name(&self) -> &'static str {
        "resources"
    }

    fn run(
        &self,
        body: &[u8],
        source: &Url,
        sink: &DiscoverySink,
    ) -> Result<Option<Vec<u8>>, PipelineError> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        emit_resources(&document, source, sink);

        Ok(None)
    }
}

fn emit_resources(document: &Html, source: &Url, sink: &DiscoverySink) {
    emit_attr(document, "link[href]", "href", source, sink);
    emit_attr(document, "script[src]", "src", source, sink);
    emit_attr(document, "img[src]", "src", source, sink);
}

/// Runs a selector over the document and emits the named attribute of each
/// match, skipping values that cannot name a fetchable page.
fn emit_attr(document: &Html, selector: &str, attr: &str, source: &Url, sink: &DiscoverySink) {
    let selector = Selector::parse(selector).expect("static selector");

    for element in document.select(&selector) {
        if let Some(value) = element.value().attr(attr) {
            let value = value.trim();
            if is_followable(value) {
                sink.emit(source, value);
            }
        }
    }
}

fn is_followable(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.starts_with('#') {
        return false;
    }

    !(candidate.starts_with("javascript:")
        || candidate.starts_with("mailto:")
        || candidate.starts_with("tel:")
        || candidate.starts_with("data:"))
}
