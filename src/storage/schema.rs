//! On-disk schema definitions
//!
//! These structs are the JSON shapes written under `<data-dir>/state/`.
//! They are kept separate from the in-memory state types so the file
//! format can stay stable while the runtime types evolve.

use crate::state::{DomainState, DomainStatus, ErrorRecords, Frontier, UrlRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted shard for a single domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainShard {
    #[serde(default)]
    pub file_meta: BTreeMap<String, UrlRecord>,
    #[serde(default)]
    pub queue: Vec<String>,
    #[serde(default)]
    pub visited: Vec<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, u32>,
    #[serde(default)]
    pub epoch: u64,
}

impl From<&DomainState> for DomainShard {
    fn from(state: &DomainState) -> Self {
        Self {
            file_meta: state.records.clone(),
            queue: state.frontier.queue(),
            visited: state.frontier.visited(),
            errors: state.errors.as_map().clone(),
            epoch: state.epoch,
        }
    }
}

impl From<DomainShard> for DomainState {
    fn from(shard: DomainShard) -> Self {
        Self {
            records: shard.file_meta,
            frontier: Frontier::from_parts(shard.queue, shard.visited),
            errors: ErrorRecords::from(shard.errors),
            epoch: shard.epoch,
        }
    }
}

/// Cumulative counters for one domain across all runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainAggregate {
    pub files_downloaded: u64,
    pub not_modified: u64,
    pub urls_discovered: u64,
    pub errors: u64,
    pub bytes_processed: u64,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub last_status: Option<String>,
}

impl DomainAggregate {
    /// Records the final status of a domain's run
    pub fn set_status(&mut self, status: DomainStatus) {
        self.last_status = Some(status.to_db_string());
    }

    /// Parses the stored status, if any
    pub fn status(&self) -> Option<DomainStatus> {
        self.last_status
            .as_deref()
            .and_then(DomainStatus::from_db_string)
    }
}

/// Global statistics file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    #[serde(default)]
    pub domain_stats: BTreeMap<String, DomainAggregate>,
}

impl GlobalStats {
    /// When the domain was last processed, None if never
    pub fn last_crawled_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.domain_stats
            .get(key)
            .and_then(|aggregate| aggregate.last_crawled_at)
    }

    /// Mutable aggregate for a domain, created on first use
    pub fn entry(&mut self, key: &str) -> &mut DomainAggregate {
        self.domain_stats.entry(key.to_string()).or_default()
    }
}
