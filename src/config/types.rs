use serde::Deserialize;

/// Main configuration structure for Sitemap-Hunter
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent fetches per batch against one domain
    pub pool_size: u32,

    /// Politeness floor between requests to the same origin (milliseconds)
    pub min_delay_ms: u64,

    /// Upper bound for robots-declared and dynamically raised delays (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random extra delay added to every request (milliseconds)
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Timeout for one sitemap request (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for the robots.txt request (seconds)
    #[serde(default = "default_robots_timeout_secs")]
    pub robots_timeout_secs: u64,

    /// Error count at which a URL is no longer submitted
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,

    /// Consecutive failures that suspend a domain for the rest of the run
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,

    /// Initial backoff after a throttling response (milliseconds)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Maximum single backoff sleep (milliseconds)
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// In-call retries after a throttling response
    #[serde(default = "default_backoff_retries")]
    pub backoff_retries: u32,

    /// Paths tried when robots.txt declares no sitemap
    #[serde(default = "default_fallback_sitemaps")]
    pub fallback_sitemaps: Vec<String>,
}

/// Limits that bound a single run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BudgetConfig {
    /// Wall-clock budget for the whole run (seconds)
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Files fetched across all domains before the run stops
    #[serde(default = "default_max_files_per_run")]
    pub max_files_per_run: u64,

    /// Free space that must remain on the data volume (megabytes)
    #[serde(default = "default_min_free_disk_mb")]
    pub min_free_disk_mb: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: default_time_budget_secs(),
            max_files_per_run: default_max_files_per_run(),
            min_free_disk_mb: default_min_free_disk_mb(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root of the content tree and state files
    pub data_dir: String,

    /// Newline-delimited list of domains to crawl
    pub seed_list: String,
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_ms() -> u64 {
    250
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_robots_timeout_secs() -> u64 {
    10
}

fn default_retry_ceiling() -> u32 {
    3
}

fn default_breaker_threshold() -> u32 {
    10
}

fn default_backoff_base_ms() -> u64 {
    2_000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_backoff_retries() -> u32 {
    3
}

fn default_fallback_sitemaps() -> Vec<String> {
    vec!["/sitemap.xml".to_string(), "/sitemap_index.xml".to_string()]
}

fn default_time_budget_secs() -> u64 {
    55 * 60
}

fn default_max_files_per_run() -> u64 {
    5_000
}

fn default_min_free_disk_mb() -> u64 {
    512
}
