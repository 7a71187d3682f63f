//! Per-invocation run budget
//!
//! One `RunBudget` is created per run and passed by reference into the
//! coordinator and the scheduler. Nothing in it is persisted.

use crate::config::BudgetConfig;
use crate::state::SuspendReason;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Source of free-space readings for the data volume
pub trait DiskSpace: Send + Sync {
    fn available_bytes(&self) -> std::io::Result<u64>;
}

/// Free space of the filesystem holding `path`
#[derive(Debug, Clone)]
pub struct VolumeSpace {
    path: PathBuf,
}

impl VolumeSpace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiskSpace for VolumeSpace {
    fn available_bytes(&self) -> std::io::Result<u64> {
        fs2::available_space(&self.path)
    }
}

/// A fixed amount of free space, for tests and dry runs
#[derive(Debug, Clone, Copy)]
pub struct FixedSpace(pub u64);

impl DiskSpace for FixedSpace {
    fn available_bytes(&self) -> std::io::Result<u64> {
        Ok(self.0)
    }
}

/// Limits and counters for a single invocation
pub struct RunBudget {
    started: Instant,
    time_budget: Duration,
    max_files: u64,
    files_processed: u64,
    min_free_bytes: u64,
    consecutive_failures: u32,
    disk: Box<dyn DiskSpace>,
}

impl RunBudget {
    /// Starts the clock
    pub fn new(config: &BudgetConfig, disk: Box<dyn DiskSpace>) -> Self {
        Self {
            started: Instant::now(),
            time_budget: Duration::from_secs(config.time_budget_secs),
            max_files: config.max_files_per_run,
            files_processed: 0,
            min_free_bytes: config.min_free_disk_mb.saturating_mul(1024 * 1024),
            consecutive_failures: 0,
            disk,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn time_exhausted(&self) -> bool {
        self.elapsed() >= self.time_budget
    }

    /// Returns true when free space is below the floor
    ///
    /// A failing reading is logged and treated as enough space.
    pub fn disk_exhausted(&self) -> bool {
        match self.disk.available_bytes() {
            Ok(available) => available < self.min_free_bytes,
            Err(e) => {
                tracing::warn!("Free space check failed: {}", e);
                false
            }
        }
    }

    /// Files that may still be fetched in this run
    pub fn remaining_files(&self) -> u64 {
        self.max_files.saturating_sub(self.files_processed)
    }

    pub fn quota_exhausted(&self) -> bool {
        self.remaining_files() == 0
    }

    pub fn files_processed(&self) -> u64 {
        self.files_processed
    }

    /// Counts attempted fetches against the run quota
    pub fn record_files(&mut self, count: u64) {
        self.files_processed = self.files_processed.saturating_add(count);
    }

    /// First exhausted limit in check order: time, disk, quota
    pub fn check(&self) -> Option<SuspendReason> {
        if self.time_exhausted() {
            Some(SuspendReason::Time)
        } else if self.disk_exhausted() {
            Some(SuspendReason::Disk)
        } else if self.quota_exhausted() {
            Some(SuspendReason::Quota)
        } else {
            None
        }
    }

    // ===== Circuit breaker =====

    /// Increments and returns the current domain's consecutive failures
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Called when the coordinator moves to another domain
    pub fn switch_domain(&mut self) {
        self.consecutive_failures = 0;
    }
}

impl std::fmt::Debug for RunBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunBudget")
            .field("elapsed", &self.elapsed())
            .field("time_budget", &self.time_budget)
            .field("files_processed", &self.files_processed)
            .field("max_files", &self.max_files)
            .field("consecutive_failures", &self.consecutive_failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(time_secs: u64, max_files: u64, free_mb: u64) -> RunBudget {
        let config = BudgetConfig {
            time_budget_secs: time_secs,
            max_files_per_run: max_files,
            min_free_disk_mb: 100,
        };
        RunBudget::new(&config, Box::new(FixedSpace(free_mb * 1024 * 1024)))
    }

    #[test]
    fn test_fresh_budget_has_room() {
        let budget = budget(60, 10, 1000);
        assert_eq!(budget.check(), None);
        assert_eq!(budget.remaining_files(), 10);
    }

    #[test]
    fn test_quota() {
        let mut budget = budget(60, 3, 1000);
        budget.record_files(2);
        assert_eq!(budget.remaining_files(), 1);
        budget.record_files(5);
        assert_eq!(budget.remaining_files(), 0);
        assert_eq!(budget.check(), Some(SuspendReason::Quota));
    }

    #[test]
    fn test_disk_floor() {
        let budget = budget(60, 10, 50);
        assert!(budget.disk_exhausted());
        assert_eq!(budget.check(), Some(SuspendReason::Disk));
    }

    #[test]
    fn test_time_checked_first() {
        let budget = budget(0, 0, 0);
        assert_eq!(budget.check(), Some(SuspendReason::Time));
    }

    #[test]
    fn test_consecutive_failures() {
        let mut budget = budget(60, 10, 1000);
        assert_eq!(budget.record_failure(), 1);
        assert_eq!(budget.record_failure(), 2);
        budget.record_success();
        assert_eq!(budget.consecutive_failures(), 0);
        budget.record_failure();
        budget.switch_domain();
        assert_eq!(budget.consecutive_failures(), 0);
    }

    #[test]
    fn test_volume_space_reports_free_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(VolumeSpace::new(dir.path()).available_bytes().is_ok());
    }
}
