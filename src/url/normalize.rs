use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a sitemap URL so the same document always maps to one key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Only `http` and `https` are accepted
/// 3. Lowercase the host (done by the parser) and drop default ports
/// 4. Remove dot segments; empty path becomes `/`
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters, keeping the order of the rest
/// 7. Remove empty query string (trailing ?)
///
/// Scheme, `www.` prefixes and trailing slashes are preserved: they can
/// address different documents on a sitemap host.
///
/// # Examples
///
/// ```
/// use sitemap_hunter::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/a/../sitemap.xml#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/sitemap.xml");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Resolves a `<loc>` value (absolute or relative) against the document it
/// appeared in and normalizes it
///
/// Returns None for anything that is not an http(s) URL.
pub fn resolve_link(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let lowered = raw.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let joined = base.join(raw).ok()?;
    normalize_url(joined.as_str()).ok()
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
