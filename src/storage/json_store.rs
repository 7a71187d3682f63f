//! JSON file storage implementation
//!
//! One shard file per domain under `<root>/domains/` plus a single
//! `<root>/global.json`.

use crate::state::DomainState;
use crate::storage::schema::{DomainShard, GlobalStats};
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use crate::storage::write_atomic;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const GLOBAL_FILE: &str = "global.json";
const DOMAINS_DIR: &str = "domains";

/// JSON-file state backend
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    root: PathBuf,
}

impl JsonStateStore {
    /// Creates a store rooted at `root`, creating the directory tree
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        let domains = root.join(DOMAINS_DIR);
        std::fs::create_dir_all(&domains).map_err(|e| StorageError::io(&domains, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the shard file for a domain key
    pub fn shard_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(DOMAINS_DIR).join(format!("{}.json", key)))
    }

    fn global_path(&self) -> PathBuf {
        self.root.join(GLOBAL_FILE)
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load_domain(&self, key: &str) -> StorageResult<DomainState> {
        let path = self.shard_path(key)?;
        let shard: DomainShard = read_tolerant(&path).await?;
        Ok(DomainState::from(shard))
    }

    async fn save_domain(&self, key: &str, state: &DomainState) -> StorageResult<()> {
        let path = self.shard_path(key)?;
        let bytes = serde_json::to_vec_pretty(&DomainShard::from(state))?;
        write_atomic(&path, &bytes).await
    }

    async fn clear_domain(&self, key: &str) -> StorageResult<()> {
        let path = self.shard_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn list_domains(&self) -> StorageResult<Vec<String>> {
        let dir = self.root.join(DOMAINS_DIR);
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn load_global(&self) -> StorageResult<GlobalStats> {
        read_tolerant(&self.global_path()).await
    }

    async fn save_global(&self, stats: &GlobalStats) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(stats)?;
        write_atomic(&self.global_path(), &bytes).await
    }
}

/// Reads a JSON file, falling back to the default value when the file is
/// missing or cannot be parsed
async fn read_tolerant<T>(path: &Path) -> StorageResult<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            tracing::warn!("Could not read {}: {}; starting empty", path.display(), e);
            return Ok(T::default());
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!("Corrupt state file {}: {}; starting empty", path.display(), e);
            Ok(T::default())
        }
    }
}

/// Keys become file names, so path separators and dot-only names are refused
fn validate_key(key: &str) -> StorageResult<()> {
    let bad = key.is_empty()
        || key.chars().all(|c| c == '.')
        || key.contains(['/', '\\', '\0']);
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
