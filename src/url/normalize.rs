use crate::UrlError;
use url::Url;

/// Reduces a URL to its page identity
///
/// # Normalization Steps
///
/// 1. Keep scheme, host, port, and path untouched
/// 2. Remove the query string
/// 3. Remove the fragment (everything after #)
/// 4. Remove any user info
///
/// URLs differing only by query or fragment normalize to the same value, and
/// normalizing an already-normalized URL is a no-op.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitegrep::url::normalize_url;
///
/// let url = Url::parse("https://example.com/docs/page?tab=2#intro").unwrap();
/// assert_eq!(normalize_url(&url).as_str(), "https://example.com/docs/page");
/// ```
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_query(None);
    normalized.set_fragment(None);

    // Only fails for URLs without a host, which carry no user info anyway
    let _ = normalized.set_username("");
    let _ = normalized.set_password(None);

    normalized
}

/// Parses the configured base URL into a crawlable seed
///
/// # Returns
///
/// * `Ok(Url)` - An absolute HTTP(S) URL with a host
/// * `Err(UrlError)` - The string is not a crawlable seed
pub fn parse_seed_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
