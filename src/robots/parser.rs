//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate. The
//! non-standard directives this crawler cares about (`Sitemap`,
//! `Crawl-delay`, `Request-rate`) are read here directly.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used as the default when robots.txt cannot be fetched or parsed.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// `url` may be an absolute URL or a bare path.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Every `Sitemap:` value, in file order
    ///
    /// Sitemap lines are not tied to a user-agent group. Values are
    /// returned as written; the caller resolves them against the origin.
    pub fn sitemaps(&self) -> Vec<String> {
        self.directives()
            .filter(|(key, _)| key == "sitemap")
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Gets the crawl delay for a specific user agent, in seconds
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.group_value(user_agent, "crawl-delay", |value| {
            value
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d >= 0.0)
        })
    }

    /// Gets the `Request-rate` for a user agent, as seconds per request
    ///
    /// `Request-rate: 1/5` (one request per five seconds) yields `5.0`.
    /// The period may carry an `s`, `m` or `h` unit suffix.
    pub fn request_rate(&self, user_agent: &str) -> Option<f64> {
        self.group_value(user_agent, "request-rate", parse_request_rate)
    }

    /// Iterates `(lowercased key, trimmed value)` pairs, skipping comments
    fn directives(&self) -> impl Iterator<Item = (String, &str)> {
        self.content.lines().filter_map(|line| {
            let line = line.split('#').next().unwrap_or("").trim();
            let (key, value) = line.split_once(':')?;
            Some((key.trim().to_lowercase(), value.trim()))
        })
    }

    /// Looks up a per-group directive, preferring a group naming this agent
    /// over the wildcard group
    fn group_value<T>(
        &self,
        user_agent: &str,
        directive: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let normalized_agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        // Consecutive User-agent lines form one group; any other directive closes the list
        let mut collecting_agents = false;
        let mut for_wildcard: Option<T> = None;
        let mut for_agent: Option<T> = None;

        for (key, value) in self.directives() {
            match key.as_str() {
                "user-agent" => {
                    if !collecting_agents {
                        group_agents.clear();
                        collecting_agents = true;
                    }
                    group_agents.push(value.to_lowercase());
                }
                _ => {
                    collecting_agents = false;
                    if key != directive {
                        continue;
                    }
                    let Some(parsed) = parse(value) else {
                        continue;
                    };

                    let names_agent = group_agents.iter().any(|ua| {
                        ua != "*" && !ua.is_empty() && normalized_agent.contains(ua.as_str())
                    });
                    if names_agent {
                        for_agent.get_or_insert(parsed);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        for_wildcard.get_or_insert(parsed);
                    }
                }
            }
        }

        for_agent.or(for_wildcard)
    }
}

fn parse_request_rate(value: &str) -> Option<f64> {
    let (requests, period) = value.split_once('/')?;
    let requests: f64 = requests.trim().parse().ok()?;

    let period = period.trim().to_lowercase();
    let (number, multiplier) = match period.chars().last()? {
        's' => (&period[..period.len() - 1], 1.0),
        'm' => (&period[..period.len() - 1], 60.0),
        'h' => (&period[..period.len() - 1], 3600.0),
        _ => (period.as_str(), 1.0),
    };
    let seconds: f64 = number.trim().parse().ok()?;

    if requests <= 0.0 || seconds < 0.0 || !seconds.is_finite() {
        return None;
    }
    Some(seconds * multiplier / requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("/any/path", "TestBot"));
        assert!(robots.sitemaps().is_empty());
    }

    #[test]
    fn test_parse_disallow_specific() {
        let content = "User-agent: *\nDisallow: /private";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("https://example.com/sitemap.xml", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/private/sitemap.xml", "TestBot"));
    }

    #[test]
    fn test_parse_specific_user_agent() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/page", "GoodBot"));
        assert!(!robots.is_allowed("/page", "BadBot"));
    }

    #[test]
    fn test_empty_robots_txt() {
        let robots = ParsedRobots::from_content("");
        assert!(robots.is_allowed("/any/path", "TestBot"));
        assert_eq!(robots.crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_sitemaps_in_order() {
        let content = "User-agent: *\nDisallow:\n\
                       Sitemap: https://example.com/sitemap_index.xml\n\
                       sitemap: /news-sitemap.xml # news\n\
                       Sitemap:\n";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(
            robots.sitemaps(),
            vec!["https://example.com/sitemap_index.xml", "/news-sitemap.xml"]
        );
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let content = "User-agent: *\nCrawl-delay: 10\nDisallow: /admin";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_specific_agent() {
        let content = "User-agent: TestBot\nCrawl-delay: 5\n\nUser-agent: *\nCrawl-delay: 10";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), Some(5.0));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_after_other_directives() {
        let content = concat!(
            "User-agent: TestBot\nDisallow: /tmp\nCrawl-delay: 4\n\n",
            "User-agent: OtherBot\nCrawl-delay: 9"
        );
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), Some(4.0));
        assert_eq!(robots.crawl_delay("NobodyBot"), None);
    }

    #[test]
    fn test_crawl_delay_multiple_user_agents() {
        let content = "User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("BotA"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotB"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_crawl_delay_rejects_garbage() {
        let content = "User-agent: *\nCrawl-delay: soon";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_request_rate() {
        let robots = ParsedRobots::from_content("User-agent: *\nRequest-rate: 1/5");
        assert_eq!(robots.request_rate("TestBot"), Some(5.0));

        let robots = ParsedRobots::from_content("User-agent: *\nRequest-rate: 2/1m");
        assert_eq!(robots.request_rate("TestBot"), Some(30.0));

        let robots = ParsedRobots::from_content("User-agent: *\nRequest-rate: 0/5");
        assert_eq!(robots.request_rate("TestBot"), None);
    }
}
