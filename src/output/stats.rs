//! Statistics read back from the state store
//!
//! This module provides functionality for extracting and displaying
//! per-domain crawl statistics (`--stats`).

use crate::classifier::Classification;
use crate::storage::{DomainAggregate, StateStore};
use crate::SitemapError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// One domain's cumulative counters plus a snapshot of its shard
#[derive(Debug, Clone, Default)]
pub struct DomainStatistics {
    pub key: String,
    pub aggregate: DomainAggregate,
    pub epoch: u64,
    pub queued: usize,
    pub visited: usize,
    pub failing_urls: usize,
    /// Known documents per classification
    pub by_classification: BTreeMap<String, usize>,
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    pub domains: Vec<DomainStatistics>,
    pub total_files_downloaded: u64,
    pub total_not_modified: u64,
    pub total_urls_discovered: u64,
    pub total_errors: u64,
    pub total_bytes: u64,
}

/// Loads statistics from storage
///
/// Covers every domain that appears in the global file or has a shard.
pub async fn load_statistics(store: &dyn StateStore) -> Result<CrawlStatistics, SitemapError> {
    let global = store.load_global().await?;

    let mut keys: BTreeSet<String> = global.domain_stats.keys().cloned().collect();
    keys.extend(store.list_domains().await?);

    let mut stats = CrawlStatistics::default();
    for key in keys {
        let state = store.load_domain(&key).await?;
        let aggregate = global.domain_stats.get(&key).cloned().unwrap_or_default();

        let mut by_classification = BTreeMap::new();
        for record in state.records.values() {
            *by_classification
                .entry(classification_label(record.classification).to_string())
                .or_insert(0) += 1;
        }

        stats.total_files_downloaded += aggregate.files_downloaded;
        stats.total_not_modified += aggregate.not_modified;
        stats.total_urls_discovered += aggregate.urls_discovered;
        stats.total_errors += aggregate.errors;
        stats.total_bytes += aggregate.bytes_processed;

        stats.domains.push(DomainStatistics {
            key,
            aggregate,
            epoch: state.epoch,
            queued: state.frontier.queue_len(),
            visited: state.frontier.visited_len(),
            failing_urls: state.errors.len(),
            by_classification,
        });
    }

    Ok(stats)
}

fn classification_label(classification: Classification) -> &'static str {
    classification.bucket().unwrap_or("unknown")
}

/// Renders statistics as plain text
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Domains: {}", stats.domains.len());
    let _ = writeln!(out, "  Files downloaded: {}", stats.total_files_downloaded);
    let _ = writeln!(out, "  Not modified: {}", stats.total_not_modified);
    let _ = writeln!(out, "  URLs discovered: {}", stats.total_urls_discovered);
    let _ = writeln!(out, "  Errors: {}", stats.total_errors);
    let _ = writeln!(out, "  Bytes processed: {}", stats.total_bytes);
    let _ = writeln!(out);

    for domain in &stats.domains {
        let last = domain
            .aggregate
            .last_crawled_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        let status = domain.aggregate.last_status.as_deref().unwrap_or("-");

        let _ = writeln!(out, "{}:", domain.key);
        let _ = writeln!(out, "  Last crawled: {} ({})", last, status);
        let _ = writeln!(
            out,
            "  Epoch {}: {} queued, {} visited, {} failing",
            domain.epoch, domain.queued, domain.visited, domain.failing_urls
        );
        let _ = writeln!(
            out,
            "  Downloaded {}, not modified {}, errors {}",
            domain.aggregate.files_downloaded,
            domain.aggregate.not_modified,
            domain.aggregate.errors
        );
        if !domain.by_classification.is_empty() {
            let buckets: Vec<String> = domain
                .by_classification
                .iter()
                .map(|(label, count)| format!("{} {}", label, count))
                .collect();
            let _ = writeln!(out, "  Documents: {}", buckets.join(", "));
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DomainState, DomainStatus, UrlRecord, Validator};
    use crate::storage::{GlobalStats, JsonStateStore};
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_statistics() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(dir.path()).unwrap();

        let mut global = GlobalStats::default();
        let aggregate = global.entry("a.com");
        aggregate.files_downloaded = 3;
        aggregate.errors = 1;
        aggregate.last_crawled_at = Some(Utc::now());
        aggregate.set_status(DomainStatus::Drained);
        store.save_global(&global).await.unwrap();

        let mut state = DomainState::new();
        state.begin_epoch(vec!["https://b.com/sitemap.xml".to_string()]);
        state.upsert_record(
            "https://b.com/old.xml".to_string(),
            UrlRecord {
                validator: Validator::default(),
                classification: Classification::ContentRich,
                discovered_url_count: 5,
                last_checked_at: Utc::now(),
            },
        );
        store.save_domain("b.com", &state).await.unwrap();

        let stats = load_statistics(&store).await.unwrap();
        assert_eq!(stats.domains.len(), 2);
        assert_eq!(stats.total_files_downloaded, 3);
        assert_eq!(stats.total_errors, 1);

        let b = stats.domains.iter().find(|d| d.key == "b.com").unwrap();
        assert_eq!(b.queued, 1);
        assert_eq!(b.epoch, 1);
        assert_eq!(b.by_classification.get("content_rich"), Some(&1));

        let text = format_statistics(&stats);
        assert!(text.contains("a.com:"));
        assert!(text.contains("(drained)"));
        assert!(text.contains("b.com:"));
        assert!(text.contains("Last crawled: never"));
    }
}
