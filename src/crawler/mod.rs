//! Crawler module for sitemap fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - Conditional HTTP fetching with bounded backoff
//! - Per-domain frontier traversal in batches
//! - The run budget (time, disk, file quota, circuit breaker)
//! - Overall run coordination and signal handling

mod backoff;
mod budget;
mod coordinator;
mod fetcher;
mod scheduler;
mod shutdown;

pub use backoff::{parse_retry_after, ExponentialBackoff};
pub use budget::{DiskSpace, FixedSpace, RunBudget, VolumeSpace};
pub use coordinator::{order_domains, run_crawl, Coordinator, RunSummary};
pub use fetcher::{build_http_client, FetchOutcome, FetchRequest, FetchResult, Fetcher, HttpFetcher};
pub use scheduler::{DomainRunReport, FrontierScheduler};
pub use shutdown::{install_signal_handlers, Shutdown, ShutdownTrigger};
