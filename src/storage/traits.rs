//! Storage traits and error types
//!
//! This module defines the trait interface for state backends and
//! associated error types.

use crate::state::DomainState;
use async_trait::async_trait;
use crate::storage::GlobalStats;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for domain state backends
///
/// Loads never fail on missing or corrupt data: they return an empty
/// state and log a warning. Saves must be atomic, so a crash mid-write
/// leaves the previous version intact.
#[async_trait]
pub trait StateStore: Send + Sync {
    // ===== Domain Shards =====

    /// Loads the shard for a domain, or an empty state if none exists
    async fn load_domain(&self, key: &str) -> StorageResult<DomainState>;

    /// Atomically replaces the shard for a domain
    async fn save_domain(&self, key: &str, state: &DomainState) -> StorageResult<()>;

    /// Deletes the shard for a domain (explicit state reset)
    async fn clear_domain(&self, key: &str) -> StorageResult<()>;

    /// Keys of every domain with a persisted shard
    async fn list_domains(&self) -> StorageResult<Vec<String>>;

    // ===== Global Statistics =====

    /// Loads the global aggregate map, or an empty map if none exists
    async fn load_global(&self) -> StorageResult<GlobalStats>;

    /// Atomically replaces the global aggregate map
    async fn save_global(&self, stats: &GlobalStats) -> StorageResult<()>;
}
