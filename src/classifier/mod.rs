//! Document classification
//!
//! Decides, from the text of a fetched document alone, whether it is a
//! sitemap index (its links are child sitemaps to traverse), rich content
//! (descriptive metadata worth scanning) or raw content (bare links).
//! Classification is a pure function of the bytes: request order and
//! concurrency never change the bucket a document lands in.

mod links;
mod rules;

pub use links::extract_locs;
pub use rules::{Document, Rule, DEFAULT_RULES, RICH_TAGS};

use serde::{Deserialize, Serialize};

/// Classification of a fetched document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Classification {
    /// Sitemap index: every link is a child sitemap
    Index,
    /// Carries title/description/caption-style metadata or descriptive URLs
    ContentRich,
    /// Bare links only
    ContentRaw,
    /// Not classified yet
    #[default]
    Unknown,
}

impl Classification {
    /// Directory name of the content bucket this classification is stored in
    pub fn bucket(&self) -> Option<&'static str> {
        match self {
            Self::Index => Some("indices"),
            Self::ContentRich => Some("content_rich"),
            Self::ContentRaw => Some("content_raw"),
            Self::Unknown => None,
        }
    }

    /// Returns true for sitemap indexes, whose links are re-enqueued
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index)
    }
}

/// Result of running the classifier over one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub classification: Classification,
    /// Every `<loc>` value in document order, unresolved
    pub links: Vec<String>,
    /// Name of the rule that matched, None when the document fell through to raw
    pub rule: Option<&'static str>,
}

/// Ordered-rule classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Creates a classifier with a custom rule order
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Extracts links and classifies the document
    pub fn analyze(&self, text: &str) -> Analysis {
        let links = extract_locs(text);
        let doc = Document {
            text,
            links: &links,
        };

        let matched = self.rules.iter().find(|rule| (rule.matches)(&doc));
        let (classification, rule) = match matched {
            Some(rule) => (rule.classification, Some(rule.name)),
            None => (Classification::ContentRaw, None),
        };

        Analysis {
            classification,
            links,
            rule,
        }
    }

    /// Classifies the document, discarding the extracted links
    pub fn classify(&self, text: &str) -> Classification {
        self.analyze(text).classification
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }
}

/// Classifies a document with the default rules
///
/// # Example
///
/// ```
/// use sitemap_hunter::classifier::{classify, Classification};
///
/// let index = r#"<sitemapindex><sitemap><loc>https://e.com/a.xml</loc></sitemap></sitemapindex>"#;
/// assert_eq!(classify(index), Classification::Index);
///
/// let raw = "<urlset><url><loc>https://e.com/p/1</loc></url></urlset>";
/// assert_eq!(classify(raw), Classification::ContentRaw);
/// ```
pub fn classify(text: &str) -> Classification {
    Classifier::default().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/posts-sitemap.xml</loc></sitemap>
  <sitemap><loc>https://example.com/pages-sitemap.xml</loc></sitemap>
</sitemapindex>"#;

    const NEWS: &str = r#"<urlset xmlns:news="http://www.google.com/schemas/sitemap-news/0.9">
  <url><loc>https://example.com/a/1</loc>
    <news:news><news:title>Breaking</news:title></news:news>
  </url>
</urlset>"#;

    const SLUGS: &str = r#"<urlset>
  <url><loc>https://example.com/products/blue-widget</loc></url>
</urlset>"#;

    const RAW: &str = r#"<urlset>
  <url><loc>https://example.com/p/1</loc></url>
  <url><loc>https://example.com/p/2</loc></url>
</urlset>"#;

    #[test]
    fn test_precedence() {
        assert_eq!(classify(INDEX), Classification::Index);
        assert_eq!(classify(NEWS), Classification::ContentRich);
        assert_eq!(classify(SLUGS), Classification::ContentRich);
        assert_eq!(classify(RAW), Classification::ContentRaw);
    }

    #[test]
    fn test_index_wins_over_slug_links() {
        // Child sitemap names are slug-like, but the root element decides first
        let analysis = Classifier::default().analyze(INDEX);
        assert_eq!(analysis.classification, Classification::Index);
        assert_eq!(analysis.rule, Some("sitemap-index-root"));
        assert_eq!(analysis.links.len(), 2);
    }

    #[test]
    fn test_raw_has_no_rule() {
        let analysis = Classifier::default().analyze(RAW);
        assert_eq!(analysis.rule, None);
        assert_eq!(analysis.links.len(), 2);
    }

    #[test]
    fn test_deterministic() {
        let classifier = Classifier::default();
        let first = classifier.analyze(NEWS);
        for _ in 0..10 {
            assert_eq!(classifier.analyze(NEWS), first);
        }
    }

    #[test]
    fn test_custom_rule_order() {
        // Without the metadata rule, a titled document with short links is raw
        let rules = DEFAULT_RULES
            .iter()
            .copied()
            .filter(|rule| rule.name != "rich-metadata-tags")
            .collect();
        let classifier = Classifier::with_rules(rules);
        assert_eq!(classifier.classify(NEWS), Classification::ContentRaw);
    }

    #[test]
    fn test_buckets() {
        assert_eq!(Classification::Index.bucket(), Some("indices"));
        assert_eq!(Classification::ContentRich.bucket(), Some("content_rich"));
        assert_eq!(Classification::ContentRaw.bucket(), Some("content_raw"));
        assert_eq!(Classification::Unknown.bucket(), None);
    }
}
