use crate::url::Domain;
use crate::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Reads a newline-delimited seed list and returns the distinct origins
///
/// Blank lines and `#` comments are skipped. Entries that do not parse as
/// an origin are logged and dropped. Order of first appearance is kept.
///
/// Entries are deduplicated by [`Domain::key`], which has no scheme: the
/// shard and content tree belong to the host, so `http://a.com` and
/// `https://a.com` are one domain and the first entry's scheme is used.
pub fn load_seed_list(path: &Path) -> Result<Vec<Domain>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::SeedList {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_seed_list(&content))
}

/// Parses seed list content; see [`load_seed_list`]
pub fn parse_seed_list(content: &str) -> Vec<Domain> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut domains: Vec<Domain> = Vec::new();

    for line in content.lines() {
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }

        match Domain::parse(entry) {
            Ok(domain) => match seen.get(domain.key()) {
                None => {
                    seen.insert(domain.key().to_string(), domains.len());
                    domains.push(domain);
                }
                Some(&index) if domains[index] != domain => {
                    tracing::warn!(
                        "Seed '{}' shares state with {}; keeping {}",
                        entry,
                        domain.key(),
                        domains[index]
                    );
                }
                Some(_) => tracing::debug!("Skipping duplicate seed: {}", entry),
            },
            Err(e) => tracing::warn!("Ignoring invalid seed '{}': {}", entry, e),
        }
    }

    domains
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dedups_by_origin() {
        let domains = parse_seed_list(
            "example.com\n\n# comment\nhttps://EXAMPLE.com/sitemap.xml\nother.org\n",
        );
        let keys: Vec<&str> = domains.iter().map(|d| d.key()).collect();
        assert_eq!(keys, vec!["example.com", "other.org"]);
    }

    #[test]
    fn test_scheme_variants_share_one_domain() {
        let domains = parse_seed_list("http://a.com\nhttps://a.com\nHTTPS://b.com\n");
        assert_eq!(domains.len(), 2);
        assert_eq!(domains[0].origin().as_str(), "http://a.com/");
        assert_eq!(domains[1].origin().as_str(), "https://b.com/");
    }

    #[test]
    fn test_invalid_entries_dropped() {
        let domains = parse_seed_list("ftp://nope.com\nvalid.com\n");
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].host(), "valid.com");
    }

    #[test]
    fn test_missing_seed_list_is_error() {
        let result = load_seed_list(Path::new("/nonexistent/sites.txt"));
        assert!(matches!(result, Err(ConfigError::SeedList { .. })));
    }
}
