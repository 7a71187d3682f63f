//! Run controller - the outermost crawl loop
//!
//! This module contains the loop that coordinates a whole run:
//! - Ordering domains by staleness from the global statistics
//! - Enforcing the time budget, disk floor and file quota between domains
//! - Resolving robots policy and starting new traversal epochs
//! - Delegating each domain to the frontier scheduler
//! - Recording per-domain aggregates and `lastCrawledAt`
//! - Stopping cleanly on termination signals
//!
//! Per-domain errors are logged and the loop moves on; only resource
//! exhaustion and termination stop the run early.

use crate::config::Config;
use crate::crawler::budget::{DiskSpace, RunBudget, VolumeSpace};
use crate::crawler::fetcher::{build_http_client, Fetcher, HttpFetcher};
use crate::crawler::scheduler::{DomainRunReport, FrontierScheduler};
use crate::crawler::shutdown::{install_signal_handlers, Shutdown};
use crate::robots::resolve_policy;
use crate::state::{DomainStatus, SuspendReason};
use crate::storage::{open_storage, GlobalStats, JsonStateStore, StateStore};
use crate::url::Domain;
use crate::SitemapError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Domains started, in processing order, with their reports
    pub domains: Vec<(String, DomainRunReport)>,
    /// Domains whose processing failed with an error
    pub failed: Vec<String>,
    /// Why the run stopped before visiting every domain, if it did
    pub stopped: Option<SuspendReason>,
    pub files_processed: u64,
    pub elapsed: Duration,
}

/// Orders domains by ascending `lastCrawledAt`; never-crawled domains
/// come first and ties keep seed order
pub fn order_domains(domains: &[Domain], stats: &GlobalStats) -> Vec<Domain> {
    let mut ordered: Vec<(Option<DateTime<Utc>>, &Domain)> = domains
        .iter()
        .map(|domain| (stats.last_crawled_at(domain.key()), domain))
        .collect();
    ordered.sort_by_key(|(last, _)| *last);
    ordered
        .into_iter()
        .map(|(_, domain)| domain.clone())
        .collect()
}

/// Main run controller structure
pub struct Coordinator {
    config: Config,
    client: Client,
    store: JsonStateStore,
    fetcher: Box<dyn Fetcher>,
    budget: RunBudget,
    shutdown: Shutdown,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the state and content stores under the configured data
    /// directory, builds the HTTP client and starts the run clock.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `shutdown` - Termination flag observed between and during batches
    pub fn new(config: Config, shutdown: Shutdown) -> Result<Self, SitemapError> {
        let data_dir = Path::new(&config.output.data_dir);
        let (store, content) = open_storage(data_dir)?;

        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let fetcher = HttpFetcher::new(client.clone(), content, &config.crawler);
        let budget = RunBudget::new(&config.budget, Box::new(VolumeSpace::new(data_dir)));

        Ok(Self {
            config,
            client,
            store,
            fetcher: Box::new(fetcher),
            budget,
            shutdown,
        })
    }

    /// Replaces the fetch worker implementation
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replaces the free-space source and restarts the run clock
    pub fn with_disk_space(mut self, disk: Box<dyn DiskSpace>) -> Self {
        self.budget = RunBudget::new(&self.config.budget, disk);
        self
    }

    pub fn store(&self) -> &JsonStateStore {
        &self.store
    }

    pub fn budget(&self) -> &RunBudget {
        &self.budget
    }

    /// Deletes every domain shard (explicit state reset)
    ///
    /// Content files and global statistics are kept. Returns the number of
    /// shards removed.
    pub async fn reset_all(&self) -> Result<usize, SitemapError> {
        let keys = self.store.list_domains().await?;
        for key in &keys {
            self.store.clear_domain(key).await?;
        }
        tracing::info!("Cleared {} domain shard(s)", keys.len());
        Ok(keys.len())
    }

    /// Processes domains until all are done or the run must stop
    pub async fn run(&mut self, domains: &[Domain]) -> Result<RunSummary, SitemapError> {
        let mut stats = self.store.load_global().await?;
        let ordered = order_domains(domains, &stats);
        let mut summary = RunSummary::default();

        tracing::info!("Starting run over {} domain(s)", ordered.len());

        for domain in &ordered {
            if self.shutdown.is_triggered() {
                summary.stopped = Some(SuspendReason::Shutdown);
                break;
            }
            if let Some(reason) = self.budget.check() {
                tracing::info!("Run budget exhausted ({}), not starting {}", reason, domain);
                summary.stopped = Some(reason);
                break;
            }

            self.budget.switch_domain();
            let result = self.process_domain(domain).await;

            let aggregate = stats.entry(domain.key());
            aggregate.last_crawled_at = Some(Utc::now());
            let mut stop = None;

            match result {
                Ok(report) => {
                    aggregate.files_downloaded += report.downloaded;
                    aggregate.not_modified += report.not_modified;
                    aggregate.urls_discovered += report.discovered;
                    aggregate.errors += report.errors;
                    aggregate.bytes_processed += report.bytes;
                    aggregate.set_status(report.status);

                    if let DomainStatus::Suspended(reason) = report.status {
                        if reason.stops_run() {
                            stop = Some(reason);
                        }
                    }
                    summary.domains.push((domain.key().to_string(), report));
                }
                Err(e) => {
                    tracing::error!("{}: domain failed: {}", domain, e);
                    aggregate.errors += 1;
                    aggregate.last_status = Some("failed".to_string());
                    summary.failed.push(domain.key().to_string());
                }
            }

            if let Err(e) = self.store.save_global(&stats).await {
                tracing::error!("Failed to save global statistics: {}", e);
            }

            if let Some(reason) = stop {
                tracing::info!("Stopping run: {}", reason);
                summary.stopped = Some(reason);
                break;
            }
        }

        summary.files_processed = self.budget.files_processed();
        summary.elapsed = self.budget.elapsed();

        tracing::info!(
            "Run finished: {} domain(s) processed, {} file(s) fetched in {:?}",
            summary.domains.len(),
            summary.files_processed,
            summary.elapsed
        );

        Ok(summary)
    }

    /// Resolves robots, loads or seeds the shard and runs the scheduler
    async fn process_domain(&mut self, domain: &Domain) -> Result<DomainRunReport, SitemapError> {
        let agent = self.config.user_agent.crawler_name.clone();

        let policy = tokio::select! {
            policy = resolve_policy(&self.client, domain, &self.config.crawler, &agent) => policy,
            _ = self.shutdown.wait() => {
                return Ok(DomainRunReport {
                    status: DomainStatus::Suspended(SuspendReason::Shutdown),
                    ..DomainRunReport::default()
                });
            }
        };

        let mut state = self.store.load_domain(domain.key()).await?;
        if state.needs_new_epoch() {
            let added = state.begin_epoch(policy.sitemaps.iter().map(|url| url.to_string()));
            tracing::info!(
                "{}: epoch {} seeded with {} sitemap(s)",
                domain,
                state.epoch,
                added
            );
        } else {
            tracing::info!("{}: resuming epoch {} from checkpoint", domain, state.epoch);
        }

        let mut scheduler = FrontierScheduler::new(
            domain,
            state,
            &policy,
            &self.config.crawler,
            self.fetcher.as_ref(),
            &self.store,
        );
        scheduler.run(&mut self.budget, &self.shutdown).await
    }
}

/// Runs a complete crawl with signal handling installed
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `domains` - Seed domains, deduplicated
/// * `fresh` - Delete every domain shard before starting
pub async fn run_crawl(
    config: Config,
    domains: Vec<Domain>,
    fresh: bool,
) -> Result<RunSummary, SitemapError> {
    let shutdown = install_signal_handlers();
    let mut coordinator = Coordinator::new(config, shutdown)?;
    if fresh {
        coordinator.reset_all().await?;
    }
    coordinator.run(&domains).await
}
