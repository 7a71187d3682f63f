use crate::state::{ErrorRecords, Frontier, UrlRecord};
use std::collections::BTreeMap;

/// Everything persisted for one domain between runs
///
/// This is the in-memory form of a domain shard: the URL records that
/// drive conditional requests, the frontier of pending and visited URLs,
/// per-URL error counters and the traversal epoch.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Cached validators and classification per fetched URL
    pub records: BTreeMap<String, UrlRecord>,

    /// Work queue and visited set for the current epoch
    pub frontier: Frontier,

    /// Consecutive failure count per URL
    pub errors: ErrorRecords,

    /// Number of traversals started for this domain
    pub epoch: u64,
}

impl DomainState {
    /// Creates an empty state for a domain that has never been crawled
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the previous traversal finished (or none started)
    pub fn needs_new_epoch(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Starts a fresh traversal from the given entry points
    ///
    /// Clears the visited set and bumps the epoch. URL records and error
    /// counters survive, so already-downloaded documents are revalidated
    /// with conditional requests rather than fetched again.
    ///
    /// Returns the number of seeds enqueued.
    pub fn begin_epoch<I>(&mut self, seeds: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        self.frontier.reset_visited();
        self.epoch += 1;

        seeds
            .into_iter()
            .filter(|seed| self.frontier.enqueue(seed.clone()))
            .count()
    }

    /// Looks up the cached record for a URL
    pub fn record(&self, url: &str) -> Option<&UrlRecord> {
        self.records.get(url)
    }

    /// Inserts or replaces the record for a URL
    pub fn upsert_record(&mut self, url: String, record: UrlRecord) {
        self.records.insert(url, record);
    }
}
