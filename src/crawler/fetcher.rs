//! HTTP fetcher implementation
//!
//! This module handles every sitemap request, including:
//! - Building the HTTP client with the crawler's user agent string
//! - The per-request politeness sleep
//! - Conditional GETs using stored validators
//! - Bounded in-call backoff on throttling responses
//! - Persisting the body into its classification bucket
//! - Error classification
//!
//! Every outcome is returned as data; nothing here fails the run.

use crate::classifier::{Classification, Classifier};
use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::backoff::{parse_retry_after, ExponentialBackoff};
use crate::state::{UrlRecord, Validator};
use crate::storage::ContentStore;
use crate::url::resolve_link;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, RETRY_AFTER,
};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Everything a worker needs to fetch one URL
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    /// Key of the domain whose content tree receives the body
    pub domain_key: String,
    /// Cached record from an earlier fetch, if any
    pub previous: Option<UrlRecord>,
    /// Failures recorded for this URL before this call
    pub error_count: u32,
    /// Politeness delay to sleep before the request
    pub delay: Duration,
}

/// Result of one fetch, as returned to the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The server confirmed the stored copy is current
    NotModified {
        classification: Classification,
        /// Children re-derived from the stored copy of an index
        children: Vec<Url>,
    },

    /// Fresh content was stored
    Success {
        classification: Classification,
        /// Child sitemaps, only populated for indexes
        children: Vec<Url>,
        /// Number of `<loc>` entries in the document
        discovered: usize,
        bytes: u64,
        validator: Validator,
        path: PathBuf,
    },

    /// Non-success status after any in-call retries
    HttpError(u16),

    /// The request or body read timed out
    Timeout,

    /// DNS, connect, TLS or redirect failure
    ConnectionError(String),

    /// Not attempted: the URL's error counter already reached the ceiling
    MaxRetriesExceeded,

    /// The response arrived but could not be stored
    Failed(String),
}

impl FetchOutcome {
    /// Short label for logs
    pub fn label(&self) -> String {
        match self {
            Self::NotModified { .. } => "not-modified".to_string(),
            Self::Success { classification, .. } => format!("success ({:?})", classification),
            Self::HttpError(code) => format!("http {}", code),
            Self::Timeout => "timeout".to_string(),
            Self::ConnectionError(e) => format!("connection error: {}", e),
            Self::MaxRetriesExceeded => "max retries exceeded".to_string(),
            Self::Failed(reason) => format!("failed: {}", reason),
        }
    }
}

/// A worker's immutable report for one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub outcome: FetchOutcome,
    /// The server sent at least one throttling response (429, 403 or 503)
    pub throttled: bool,
}

/// Fetch worker seam
///
/// The scheduler only depends on this trait, so traversal logic can be
/// exercised without a network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Timeouts come from the crawler section
///
/// # Example
///
/// ```no_run
/// use sitemap_hunter::config::load_config;
/// use sitemap_hunter::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher settings taken from the crawler configuration
#[derive(Debug, Clone)]
struct WorkerSettings {
    retry_ceiling: u32,
    jitter_ms: u64,
    backoff_retries: u32,
}

/// Production fetcher backed by reqwest and the content store
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    content: ContentStore,
    classifier: Classifier,
    backoff: ExponentialBackoff,
    settings: WorkerSettings,
}

/// What came back from the network, before storage
enum Response {
    NotModified,
    Body {
        final_url: Url,
        bytes: Vec<u8>,
        validator: Validator,
    },
}

impl HttpFetcher {
    pub fn new(client: Client, content: ContentStore, config: &CrawlerConfig) -> Self {
        Self {
            client,
            content,
            classifier: Classifier::default(),
            backoff: ExponentialBackoff::from_config(config),
            settings: WorkerSettings {
                retry_ceiling: config.retry_ceiling,
                jitter_ms: config.jitter_ms,
                backoff_retries: config.backoff_retries,
            },
        }
    }

    /// Validators to send, if the stored copy they describe still exists
    async fn usable_validator(&self, request: &FetchRequest) -> Option<Validator> {
        let previous = request.previous.as_ref()?;
        if previous.validator.is_empty() {
            return None;
        }
        let on_disk = self
            .content
            .exists(&request.domain_key, request.url.as_str(), previous.classification)
            .await;
        if !on_disk {
            tracing::debug!("{}: stored copy missing, fetching unconditionally", request.url);
            return None;
        }
        Some(previous.validator.clone())
    }

    /// Issues the conditional GET, retrying throttling responses with backoff
    ///
    /// Returns the response or the final failure outcome, plus whether any
    /// throttling response was seen.
    async fn request(
        &self,
        url: &Url,
        validator: Option<&Validator>,
    ) -> (Result<Response, FetchOutcome>, bool) {
        let mut throttled = false;
        let mut attempt = 0;

        loop {
            let mut builder = self.client.get(url.clone());
            if let Some(validator) = validator {
                if let Some(etag) = &validator.etag {
                    builder = builder.header(IF_NONE_MATCH, etag);
                }
                if let Some(last_modified) = &validator.last_modified {
                    builder = builder.header(IF_MODIFIED_SINCE, last_modified);
                }
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => return (Err(classify_error(&e)), throttled),
            };

            let status = response.status();
            if status == StatusCode::NOT_MODIFIED {
                return (Ok(Response::NotModified), throttled);
            }

            if is_throttling(status) {
                throttled = true;
                if attempt >= self.settings.backoff_retries {
                    return (Err(FetchOutcome::HttpError(status.as_u16())), throttled);
                }
                let hint = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                let wait = self.backoff.delay_with_hint(attempt, hint);
                tracing::debug!(
                    "{} returned {}, retry {} in {}ms",
                    url,
                    status.as_u16(),
                    attempt + 1,
                    wait.as_millis()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                return (Err(FetchOutcome::HttpError(status.as_u16())), throttled);
            }

            let final_url = response.url().clone();
            let validator = extract_validator(response.headers());
            return match response.bytes().await {
                Ok(bytes) => (
                    Ok(Response::Body {
                        final_url,
                        bytes: bytes.to_vec(),
                        validator,
                    }),
                    throttled,
                ),
                Err(e) => (Err(classify_error(&e)), throttled),
            };
        }
    }

    /// Children of a NotModified index, read back from the stored copy
    async fn stored_children(
        &self,
        request: &FetchRequest,
        classification: Classification,
    ) -> Vec<Url> {
        if !classification.is_index() {
            return Vec::new();
        }
        let stored = self
            .content
            .read(&request.domain_key, request.url.as_str(), classification)
            .await;
        match stored {
            Ok(Some(text)) => {
                resolve_children(&self.classifier.analyze(&text).links, &request.url)
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("{}: cannot read stored index: {}", request.url, e);
                Vec::new()
            }
        }
    }

    /// Classifies and stores a fresh body
    async fn store(
        &self,
        request: &FetchRequest,
        final_url: &Url,
        bytes: &[u8],
        validator: Validator,
    ) -> FetchOutcome {
        let text = String::from_utf8_lossy(bytes);
        let analysis = self.classifier.analyze(&text);
        let url = request.url.as_str();

        let written = self
            .content
            .write(&request.domain_key, url, analysis.classification, bytes)
            .await;
        let path = match written {
            Ok(path) => path,
            Err(e) => return FetchOutcome::Failed(e.to_string()),
        };

        if let Some(previous) = &request.previous {
            if previous.classification != analysis.classification {
                let removed = self
                    .content
                    .remove(&request.domain_key, url, previous.classification)
                    .await;
                if let Err(e) = removed {
                    tracing::warn!("{}: stale copy not removed: {}", url, e);
                }
            }
        }

        let children = if analysis.classification.is_index() {
            resolve_children(&analysis.links, final_url)
        } else {
            Vec::new()
        };

        tracing::debug!(
            "{} classified {:?} by {}",
            url,
            analysis.classification,
            analysis.rule.unwrap_or("fallthrough")
        );

        FetchOutcome::Success {
            classification: analysis.classification,
            children,
            discovered: analysis.links.len(),
            bytes: bytes.len() as u64,
            validator,
            path,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches one URL
    ///
    /// # Request Flow
    ///
    /// 1. Short-circuit if the URL's error counter reached the ceiling
    /// 2. Sleep the politeness delay plus jitter
    /// 3. Conditional GET (validators only if the stored copy exists)
    /// 4. Retry 429/403/503 with backoff, bounded per call
    /// 5. Classify, store and extract children
    async fn fetch(&self, request: FetchRequest) -> FetchResult {
        let url = request.url.to_string();

        if request.error_count >= self.settings.retry_ceiling {
            return FetchResult {
                url,
                outcome: FetchOutcome::MaxRetriesExceeded,
                throttled: false,
            };
        }

        let jitter = if self.settings.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.settings.jitter_ms)
        } else {
            0
        };
        tokio::time::sleep(request.delay + Duration::from_millis(jitter)).await;

        let validator = self.usable_validator(&request).await;
        let (response, throttled) = self
            .request(&request.url, validator.as_ref())
            .await;

        let outcome = match response {
            Ok(Response::NotModified) => {
                let classification = request
                    .previous
                    .as_ref()
                    .map(|record| record.classification)
                    .unwrap_or_default();
                FetchOutcome::NotModified {
                    classification,
                    children: self.stored_children(&request, classification).await,
                }
            }
            Ok(Response::Body {
                final_url,
                bytes,
                validator,
            }) => self.store(&request, &final_url, &bytes, validator).await,
            Err(outcome) => outcome,
        };

        FetchResult {
            url,
            outcome,
            throttled,
        }
    }
}

/// 429, 403 and 503 are treated as "slow down"
fn is_throttling(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN | StatusCode::SERVICE_UNAVAILABLE
    )
}

fn classify_error(e: &reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::Timeout
    } else if e.is_connect() {
        FetchOutcome::ConnectionError("connection refused".to_string())
    } else if e.is_redirect() {
        FetchOutcome::ConnectionError(format!("redirect error: {}", e))
    } else {
        FetchOutcome::ConnectionError(e.to_string())
    }
}

fn extract_validator(headers: &HeaderMap) -> Validator {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Validator {
        etag: header(ETAG),
        last_modified: header(LAST_MODIFIED),
    }
}

/// Resolves raw `<loc>` values against the document URL, dropping
/// unusable ones and duplicates while keeping document order
fn resolve_children(links: &[String], base: &Url) -> Vec<Url> {
    let mut children: Vec<Url> = Vec::with_capacity(links.len());
    for link in links {
        if let Some(url) = resolve_link(link, base) {
            if !children.contains(&url) {
                children.push(url);
            }
        }
    }
    children
}
