//! Ordered classification rules
//!
//! Rules are evaluated top to bottom and the first match decides the
//! document's classification. Anything no rule claims is `ContentRaw`.

use crate::classifier::Classification;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Tag names that mark a document as carrying descriptive metadata
pub const RICH_TAGS: &[&str] = &[
    "title",
    "description",
    "caption",
    "image:title",
    "image:caption",
    "video:title",
    "video:description",
    "news:title",
    "news:keywords",
];

static RICH_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = RICH_TAGS
        .iter()
        .map(|tag| regex::escape(tag))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)<(?:{})[\s>/]", alternatives)).expect("static regex")
});

/// A fetched document as seen by the rules
#[derive(Debug)]
pub struct Document<'a> {
    pub text: &'a str,
    pub links: &'a [String],
}

/// One entry in the ordered rule list
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Short identifier, used in logs
    pub name: &'static str,
    pub classification: Classification,
    pub matches: fn(&Document<'_>) -> bool,
}

/// Default precedence: index root, rich metadata tags, slug-like links
pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        name: "sitemap-index-root",
        classification: Classification::Index,
        matches: is_sitemap_index,
    },
    Rule {
        name: "rich-metadata-tags",
        classification: Classification::ContentRich,
        matches: has_rich_metadata,
    },
    Rule {
        name: "slug-like-links",
        classification: Classification::ContentRich,
        matches: has_slug_links,
    },
];

/// The root element is `<sitemapindex>` (any namespace prefix)
pub fn is_sitemap_index(doc: &Document<'_>) -> bool {
    root_element_name(doc.text)
        .map(|name| {
            let local = name.rsplit(':').next().unwrap_or(name);
            local.eq_ignore_ascii_case("sitemapindex")
        })
        .unwrap_or(false)
}

/// Any of [`RICH_TAGS`] appears as an element
pub fn has_rich_metadata(doc: &Document<'_>) -> bool {
    RICH_TAG_RE.is_match(doc.text)
}

/// Some link has a path segment longer than five characters containing `-` or `_`
pub fn has_slug_links(doc: &Document<'_>) -> bool {
    doc.links.iter().any(|link| is_slug_like(link))
}

fn is_slug_like(link: &str) -> bool {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.to_string(),
    };

    path.split('/').any(|segment| {
        segment.chars().count() > 5 && (segment.contains('-') || segment.contains('_'))
    })
}

/// Name of the first element, skipping the XML declaration, processing
/// instructions, comments and DOCTYPE
fn root_element_name(text: &str) -> Option<&str> {
    let mut rest = text;
    loop {
        let start = rest.find('<')?;
        rest = &rest[start..];

        if let Some(after) = rest.strip_prefix("<?") {
            rest = &after[after.find("?>")? + 2..];
        } else if let Some(after) = rest.strip_prefix("<!--") {
            rest = &after[after.find("-->")? + 3..];
        } else if let Some(after) = rest.strip_prefix("<!") {
            rest = &after[after.find('>')? + 1..];
        } else {
            let name_start = &rest[1..];
            let end = name_start
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(name_start.len());
            let name = &name_start[..end];
            return if name.is_empty() { None } else { Some(name) };
        }
    }
}
