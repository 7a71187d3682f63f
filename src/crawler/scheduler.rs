//! Frontier scheduler: the traversal engine for one domain
//!
//! This module handles:
//! - Dequeuing batches of up to `pool-size` URLs (marked visited immediately)
//! - Dispatching a batch to the fetch workers and waiting for all of them
//! - Merging results into the domain state from a single owner
//! - Re-enqueuing children of sitemap indexes in FIFO order
//! - The per-domain circuit breaker and run budget checks
//! - Checkpointing the shard after every batch
//!
//! Workers never touch the frontier, records or error counters; they
//! return immutable [`FetchResult`]s and the merge step applies them.

use crate::config::CrawlerConfig;
use crate::crawler::budget::RunBudget;
use crate::crawler::fetcher::{FetchOutcome, FetchRequest, FetchResult, Fetcher};
use crate::crawler::shutdown::Shutdown;
use crate::robots::RobotsPolicy;
use crate::state::{DomainState, DomainStatus, SuspendReason, UrlRecord};
use crate::storage::StateStore;
use crate::url::Domain;
use crate::SitemapError;
use chrono::Utc;
use futures::future::join_all;
use std::time::Duration;
use url::Url;

/// Counters for one domain's share of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRunReport {
    /// Final status for this run
    pub status: DomainStatus,
    /// Requests actually issued (quota usage)
    pub attempted: u64,
    /// Fresh documents stored
    pub downloaded: u64,
    pub not_modified: u64,
    pub errors: u64,
    /// URLs skipped because their error counter reached the ceiling
    pub dropped: u64,
    /// `<loc>` entries seen in fresh documents
    pub discovered: u64,
    /// Children newly added to the queue
    pub enqueued: u64,
    pub bytes: u64,
    pub batches: u64,
}

/// Traverses one domain's frontier until it drains or a suspend
/// condition holds
pub struct FrontierScheduler<'a> {
    domain: &'a Domain,
    policy: &'a RobotsPolicy,
    config: &'a CrawlerConfig,
    fetcher: &'a dyn Fetcher,
    store: &'a dyn StateStore,
    state: DomainState,
    /// Current politeness delay; raised in memory on throttling, never persisted
    delay: Duration,
    status: DomainStatus,
    report: DomainRunReport,
}

impl<'a> FrontierScheduler<'a> {
    /// Creates a scheduler for a domain
    ///
    /// # Arguments
    ///
    /// * `domain` - The domain being traversed
    /// * `state` - Its loaded shard, with a non-empty queue unless already drained
    /// * `policy` - Resolved robots policy (delay and same-host rules)
    /// * `config` - Crawler configuration
    /// * `fetcher` - Worker implementation
    /// * `store` - Where checkpoints are written
    pub fn new(
        domain: &'a Domain,
        state: DomainState,
        policy: &'a RobotsPolicy,
        config: &'a CrawlerConfig,
        fetcher: &'a dyn Fetcher,
        store: &'a dyn StateStore,
    ) -> Self {
        Self {
            domain,
            policy,
            config,
            fetcher,
            store,
            state,
            delay: policy.delay,
            status: DomainStatus::Pending,
            report: DomainRunReport::default(),
        }
    }

    pub fn state(&self) -> &DomainState {
        &self.state
    }

    pub fn status(&self) -> DomainStatus {
        self.status
    }

    /// Current per-request delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs batches until the queue drains or the domain is suspended
    ///
    /// Every return path, including shutdown, writes a checkpoint first.
    /// A checkpoint failure is the only error.
    pub async fn run(
        &mut self,
        budget: &mut RunBudget,
        shutdown: &Shutdown,
    ) -> Result<DomainRunReport, SitemapError> {
        self.transition(DomainStatus::Active);
        tracing::info!(
            "{}: starting epoch {} with {} queued, {} visited",
            self.domain,
            self.state.epoch,
            self.state.frontier.queue_len(),
            self.state.frontier.visited_len()
        );

        loop {
            if shutdown.is_triggered() {
                return self
                    .finish(DomainStatus::Suspended(SuspendReason::Shutdown))
                    .await;
            }
            if self.state.frontier.is_empty() {
                return self.finish(DomainStatus::Drained).await;
            }
            if let Some(reason) = budget.check() {
                return self.finish(DomainStatus::Suspended(reason)).await;
            }

            let batch_size = budget
                .remaining_files()
                .min(u64::from(self.config.pool_size.max(1))) as usize;
            let requests = self.build_batch(batch_size);
            if requests.is_empty() {
                continue;
            }

            let fetcher = self.fetcher;
            let fetches = join_all(requests.into_iter().map(|request| fetcher.fetch(request)));
            let results = tokio::select! {
                biased;
                results = fetches => results,
                _ = shutdown.wait() => {
                    tracing::warn!(
                        "{}: shutdown during batch, abandoning in-flight fetches",
                        self.domain
                    );
                    return self
                        .finish(DomainStatus::Suspended(SuspendReason::Shutdown))
                        .await;
                }
            };

            for result in results {
                self.merge(result, budget);
            }
            self.report.batches += 1;
            self.checkpoint().await?;

            let failures = budget.consecutive_failures();
            if failures >= self.config.breaker_threshold {
                tracing::warn!(
                    "{}: {} consecutive failures, circuit breaker open",
                    self.domain,
                    failures
                );
                return self
                    .finish(DomainStatus::Suspended(SuspendReason::Breaker))
                    .await;
            }
        }
    }

    /// Dequeues the next batch and builds worker requests
    ///
    /// URLs are visited from this point on, whatever happens to the fetch.
    fn build_batch(&mut self, size: usize) -> Vec<FetchRequest> {
        self.state
            .frontier
            .next_batch(size)
            .into_iter()
            .filter_map(|raw| match Url::parse(&raw) {
                Ok(url) => Some(FetchRequest {
                    previous: self.state.record(&raw).cloned(),
                    error_count: self.state.errors.count(&raw),
                    url,
                    domain_key: self.domain.key().to_string(),
                    delay: self.delay,
                }),
                Err(e) => {
                    tracing::warn!(
                        "{}: dropping unparseable queue entry {:?}: {}",
                        self.domain,
                        raw,
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Applies one worker result to the domain state
    fn merge(&mut self, result: FetchResult, budget: &mut RunBudget) {
        let FetchResult {
            url,
            outcome,
            throttled,
        } = result;

        if !matches!(outcome, FetchOutcome::MaxRetriesExceeded) {
            budget.record_files(1);
            self.report.attempted += 1;
        }

        match outcome {
            FetchOutcome::Success {
                classification,
                children,
                discovered,
                bytes,
                validator,
                ..
            } => {
                budget.record_success();
                self.state.errors.clear(&url);
                self.state.upsert_record(
                    url.clone(),
                    UrlRecord {
                        validator,
                        classification,
                        discovered_url_count: discovered,
                        last_checked_at: Utc::now(),
                    },
                );
                self.report.downloaded += 1;
                self.report.bytes += bytes;
                self.report.discovered += discovered as u64;
                tracing::debug!("{}: {:?}, {} links", url, classification, discovered);

                if classification.is_index() {
                    self.enqueue_children(&children);
                }
            }
            FetchOutcome::NotModified {
                classification,
                children,
            } => {
                budget.record_success();
                self.state.errors.clear(&url);
                if let Some(record) = self.state.records.get_mut(&url) {
                    record.last_checked_at = Utc::now();
                }
                self.report.not_modified += 1;
                tracing::debug!("{}: not modified", url);

                if classification.is_index() {
                    self.enqueue_children(&children);
                }
            }
            FetchOutcome::MaxRetriesExceeded => {
                self.report.dropped += 1;
                tracing::debug!(
                    "{}: dropped after {} failures",
                    url,
                    self.state.errors.count(&url)
                );
            }
            error => {
                let failures = budget.record_failure();
                let count = self.state.errors.record_failure(&url);
                self.report.errors += 1;
                tracing::debug!(
                    "{}: {} (url failures {}, consecutive {})",
                    url,
                    error.label(),
                    count,
                    failures
                );
            }
        }

        if throttled {
            self.raise_delay();
        }
    }

    /// Adds unseen children to the back of the queue
    ///
    /// Children on this domain's own host must be allowed by robots.txt.
    fn enqueue_children(&mut self, children: &[Url]) {
        for child in children {
            if self.domain.owns(child) && !self.policy.allows(child) {
                tracing::debug!("{}: {} disallowed by robots.txt", self.domain, child);
                continue;
            }
            if self.state.frontier.enqueue(child.to_string()) {
                self.report.enqueued += 1;
            }
        }
    }

    /// Doubles the delay for the rest of the run, capped at `max-delay-ms`
    fn raise_delay(&mut self) {
        let cap = Duration::from_millis(self.config.max_delay_ms.max(self.config.min_delay_ms));
        let raised = self.delay.saturating_mul(2).min(cap).max(self.delay);
        if raised != self.delay {
            tracing::info!(
                "{}: throttled, delay raised to {}ms",
                self.domain,
                raised.as_millis()
            );
            self.delay = raised;
        }
    }

    async fn checkpoint(&self) -> Result<(), SitemapError> {
        self.store
            .save_domain(self.domain.key(), &self.state)
            .await?;
        Ok(())
    }

    fn transition(&mut self, next: DomainStatus) {
        if !self.status.can_transition_to(next) {
            tracing::warn!(
                "{}: unexpected status transition {} -> {}",
                self.domain,
                self.status,
                next
            );
        }
        self.status = next;
    }

    /// Checkpoints and records the final status
    async fn finish(&mut self, status: DomainStatus) -> Result<DomainRunReport, SitemapError> {
        self.checkpoint().await?;
        self.transition(status);
        self.report.status = status;

        tracing::info!(
            "{}: {} after {} batches ({} downloaded, {} not modified, {} errors, {} queued)",
            self.domain,
            status,
            self.report.batches,
            self.report.downloaded,
            self.report.not_modified,
            self.report.errors,
            self.state.frontier.queue_len()
        );
        Ok(self.report.clone())
    }
}
