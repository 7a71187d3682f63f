//! Robots.txt handling module
//!
//! Resolves a domain's robots policy into the two things a traversal
//! needs: seed sitemap URLs and a politeness delay. Every failure is soft:
//! a missing or broken robots.txt yields the conventional fallback paths
//! and the configured minimum delay.

mod parser;

pub use parser::ParsedRobots;

use crate::config::CrawlerConfig;
use crate::url::{normalize_url, Domain};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Outcome of resolving a domain's robots policy
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Seed sitemap URLs, declared or fallback, deduplicated in order
    pub sitemaps: Vec<Url>,
    /// Minimum spacing between requests, already clamped to the configured range
    pub delay: Duration,
    /// Parsed rules used to filter same-host children
    pub robots: ParsedRobots,
    /// True when the sitemaps came from `Sitemap:` lines
    pub declared: bool,
    agent: String,
}

impl RobotsPolicy {
    /// Policy used when robots.txt is unavailable
    pub fn fallback(domain: &Domain, config: &CrawlerConfig, agent: &str) -> Self {
        Self::from_robots(domain, config, agent, ParsedRobots::allow_all())
    }

    /// Builds a policy from parsed robots.txt content
    pub fn from_robots(
        domain: &Domain,
        config: &CrawlerConfig,
        agent: &str,
        robots: ParsedRobots,
    ) -> Self {
        let mut sitemaps: Vec<Url> = Vec::new();
        for declared in robots.sitemaps() {
            match domain
                .origin()
                .join(&declared)
                .ok()
                .and_then(|url| normalize_url(url.as_str()).ok())
            {
                Some(url) if !sitemaps.contains(&url) => sitemaps.push(url),
                Some(_) => {}
                None => tracing::debug!("{}: ignoring sitemap line {:?}", domain, declared),
            }
        }

        let declared = !sitemaps.is_empty();
        if !declared {
            for path in &config.fallback_sitemaps {
                if let Ok(url) = domain.join(path) {
                    if !sitemaps.contains(&url) {
                        sitemaps.push(url);
                    }
                }
            }
        }

        let requested = [robots.crawl_delay(agent), robots.request_rate(agent)]
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<f64>, secs| Some(acc.map_or(secs, |a| a.max(secs))));

        Self {
            sitemaps,
            delay: clamp_delay(requested, config),
            robots,
            declared,
            agent: agent.to_string(),
        }
    }

    /// Checks a URL against the robots rules
    pub fn allows(&self, url: &Url) -> bool {
        self.robots.is_allowed(url.as_str(), &self.agent)
    }
}

/// Converts a robots-declared delay (seconds) to a duration within
/// `[min_delay_ms, max_delay_ms]`
fn clamp_delay(requested_secs: Option<f64>, config: &CrawlerConfig) -> Duration {
    let min = config.min_delay_ms;
    let max = config.max_delay_ms.max(min);
    let requested_ms = requested_secs
        .map(|secs| (secs * 1000.0).min(u64::MAX as f64) as u64)
        .unwrap_or(min);
    Duration::from_millis(requested_ms.clamp(min, max))
}

/// Fetches and interprets robots.txt for a domain
///
/// Never fails: network errors, timeouts and non-2xx responses are logged
/// and produce [`RobotsPolicy::fallback`]. A 4xx other than 429 means
/// "no rules" and still uses the fallback sitemap paths.
pub async fn resolve_policy(
    client: &Client,
    domain: &Domain,
    config: &CrawlerConfig,
    agent: &str,
) -> RobotsPolicy {
    let robots_url = match domain.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("{}: cannot build robots.txt URL: {}", domain, e);
            return RobotsPolicy::fallback(domain, config, agent);
        }
    };

    let response = client
        .get(robots_url.clone())
        .timeout(Duration::from_secs(config.robots_timeout_secs))
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("{}: robots.txt fetch failed: {}", domain, e);
            return RobotsPolicy::fallback(domain, config, agent);
        }
    };

    let status = response.status();
    if !status.is_success() {
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("{}: no robots.txt", domain);
        } else {
            tracing::warn!("{}: robots.txt returned {}", domain, status);
        }
        return RobotsPolicy::fallback(domain, config, agent);
    }

    match response.text().await {
        Ok(body) => {
            let policy =
                RobotsPolicy::from_robots(domain, config, agent, ParsedRobots::from_content(&body));
            tracing::info!(
                "{}: {} seed sitemap(s) ({}), delay {}ms",
                domain,
                policy.sitemaps.len(),
                if policy.declared { "declared" } else { "fallback" },
                policy.delay.as_millis()
            );
            policy
        }
        Err(e) => {
            tracing::warn!("{}: robots.txt body unreadable: {}", domain, e);
            RobotsPolicy::fallback(domain, config, agent)
        }
    }
}
