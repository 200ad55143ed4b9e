//! HTML helpers for the crawl loop
//!
//! This module handles:
//! - Case-insensitive keyword matching against a page body
//! - Extracting anchor targets in document order
//! - Resolving targets against the page they were found on

use scraper::{Html, Selector};
use url::Url;

/// Returns true if `body` contains the already-lowercased keyword, ignoring case
pub fn contains_keyword(body: &str, keyword_lower: &str) -> bool {
    body.to_lowercase().contains(keyword_lower)
}

/// Extracts the raw `href` values of all `<a>` tags, in document order
///
/// Tag and attribute names match case-insensitively. Values are returned as
/// written (entity-decoded), not yet resolved.
///
/// # Example
///
/// ```
/// use sitegrep::crawler::extract_hrefs;
///
/// let html = r#"<p><A HREF="/one">1</A> <a class="x" href='two'>2</a></p>"#;
/// assert_eq!(extract_hrefs(html), vec!["/one", "two"]);
/// ```
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link cannot be followed:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => Some(absolute_url),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Malformed link {:?} on {}: {}", href, base_url, e);
            None
        }
    }
}
