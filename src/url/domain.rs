use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitemap_hunter::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// A normalized origin (scheme + host + optional port)
///
/// Every domain owns exactly one frontier and one persisted state shard,
/// addressed by [`Domain::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain {
    origin: Url,
    key: String,
}

impl Domain {
    /// Parses a seed entry into a normalized origin
    ///
    /// Bare hosts (`example.com`) are given the `https` scheme. Any path,
    /// query or fragment is discarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use sitemap_hunter::url::Domain;
    ///
    /// let domain = Domain::parse("Example.COM/some/page").unwrap();
    /// assert_eq!(domain.origin().as_str(), "https://example.com/");
    /// assert_eq!(domain.key(), "example.com");
    /// ```
    pub fn parse(seed: &str) -> UrlResult<Self> {
        let seed = seed.trim();
        if seed.is_empty() {
            return Err(UrlError::MissingDomain);
        }

        let lower = seed.to_ascii_lowercase();
        let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
            seed.to_string()
        } else if seed.contains("://") {
            return Err(UrlError::InvalidScheme(seed.to_string()));
        } else {
            format!("https://{}", seed)
        };

        let parsed = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::from_url(&parsed)
    }

    /// Builds the domain that owns the given URL
    pub fn from_url(url: &Url) -> UrlResult<Self> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        let host = extract_domain(url).ok_or(UrlError::MissingDomain)?;

        let origin_str = match url.port() {
            Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
            None => format!("{}://{}/", url.scheme(), host),
        };
        let origin = Url::parse(&origin_str).map_err(|e| UrlError::Malformed(e.to_string()))?;

        let key = match origin.port() {
            Some(port) => format!("{}_{}", host, port),
            None => host,
        };

        Ok(Self { origin, key })
    }

    /// The origin URL, always with a `/` path
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Filesystem-safe identifier used for the state shard and content tree
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Lowercase host name
    pub fn host(&self) -> &str {
        self.origin.host_str().unwrap_or_default()
    }

    /// Resolves a path (or absolute URL) against this origin
    pub fn join(&self, path: &str) -> UrlResult<Url> {
        self.origin
            .join(path)
            .map_err(|e| UrlError::Parse(e.to_string()))
    }

    /// Returns true if the URL lives on this origin's host and port
    pub fn owns(&self, url: &Url) -> bool {
        extract_domain(url).as_deref() == Some(self.host())
            && url.port_or_known_default() == self.origin.port_or_known_default()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.origin.as_str().trim_end_matches('/'))
    }
}
