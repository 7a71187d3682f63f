//! `<loc>` link extraction
//!
//! Sitemaps are scanned textually rather than parsed as a tree: real-world
//! sitemap files are frequently malformed, and only the `<loc>` values are
//! needed.

use regex::Regex;
use std::sync::LazyLock;

static LOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Unprefixed <loc> only; <image:loc> and <video:loc> point at media, not documents.
    Regex::new(r"(?is)<loc\b[^>]*>(.*?)</loc\s*>").expect("static regex")
});

/// Extracts every `<loc>` value from a sitemap document, in document order
///
/// CDATA wrappers are removed and the five predefined XML entities are
/// decoded. A document with no `<loc>` elements and no markup is treated
/// as a plain-text sitemap: each `http(s)://` line is a link.
///
/// # Example
///
/// ```
/// use sitemap_hunter::classifier::extract_locs;
///
/// let xml = "<urlset><url><loc>https://example.com/a?x=1&amp;y=2</loc></url></urlset>";
/// assert_eq!(extract_locs(xml), vec!["https://example.com/a?x=1&y=2"]);
/// ```
pub fn extract_locs(text: &str) -> Vec<String> {
    let links: Vec<String> = LOC_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_loc(m.as_str()))
        .filter(|loc| !loc.is_empty())
        .collect();

    if !links.is_empty() || looks_like_markup(text) {
        return links;
    }

    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("http://") || line.starts_with("https://"))
        .map(str::to_string)
        .collect()
}

fn looks_like_markup(text: &str) -> bool {
    text.trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with('<')
}

fn decode_loc(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(trimmed);

    inner
        .trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_urlset_locs_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/one</loc></url>
  <url><loc>
      https://example.com/two
  </loc></url>
</urlset>"#;
        assert_eq!(
            extract_locs(xml),
            vec!["https://example.com/one", "https://example.com/two"]
        );
    }

    #[test]
    fn test_ignores_media_locs() {
        let xml = r#"<urlset><url><loc>https://example.com/page</loc>
<image:image><image:loc>https://example.com/pic.jpg</image:loc></image:image></url></urlset>"#;
        assert_eq!(extract_locs(xml), vec!["https://example.com/page"]);
    }

    #[test]
    fn test_cdata_and_case() {
        let xml = "<urlset><url><LOC><![CDATA[https://example.com/c]]></LOC></url></urlset>";
        assert_eq!(extract_locs(xml), vec!["https://example.com/c"]);
    }

    #[test]
    fn test_plain_text_sitemap() {
        let text = "https://example.com/a\n\n  https://example.com/b  \nnot a link\n";
        assert_eq!(
            extract_locs(text),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_markup_without_locs_yields_nothing() {
        let html = "<html><body>https://example.com/a</body></html>";
        assert!(extract_locs(html).is_empty());
    }
}
