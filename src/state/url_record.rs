use crate::classifier::Classification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP cache validators returned with a document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Validator {
    /// Returns true when there is nothing to send in a conditional request
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Cached metadata for one fetched URL
///
/// Created on the first successful fetch and overwritten whenever fresh
/// content arrives. Records are never deleted: they bound future
/// downloads through conditional requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    #[serde(default)]
    pub validator: Validator,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub discovered_url_count: usize,
    pub last_checked_at: DateTime<Utc>,
}

/// Per-URL failure counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorRecords {
    counts: BTreeMap<String, u32>,
}

impl ErrorRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter for a URL and returns the new value
    pub fn record_failure(&mut self, url: &str) -> u32 {
        let count = self.counts.entry(url.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Forgets past failures after a successful fetch
    pub fn clear(&mut self, url: &str) {
        self.counts.remove(url);
    }

    pub fn count(&self, url: &str) -> u32 {
        self.counts.get(url).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }
}

impl From<BTreeMap<String, u32>> for ErrorRecords {
    fn from(counts: BTreeMap<String, u32>) -> Self {
        Self { counts }
    }
}
