//! Storage module for persisting crawl data
//!
//! This module handles everything written to disk:
//! - Per-domain state shards (frontier, URL records, error counters)
//! - The global per-domain statistics file
//! - The classification-partitioned content tree
//!
//! Every write goes to a temporary file that is renamed into place, so a
//! crash mid-write leaves the previous version intact.

mod content;
mod json_store;
mod schema;
mod traits;

pub use content::ContentStore;
pub use json_store::JsonStateStore;
pub use schema::{DomainAggregate, DomainShard, GlobalStats};
pub use traits::{StateStore, StorageError, StorageResult};

use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory under the data dir holding state shards and global stats
pub const STATE_DIR: &str = "state";

/// Directory under the data dir holding the content tree
pub const CONTENT_DIR: &str = "domains";

/// Opens the state and content stores rooted at a data directory
pub fn open_storage(data_dir: &Path) -> StorageResult<(JsonStateStore, ContentStore)> {
    let state = JsonStateStore::new(data_dir.join(STATE_DIR))?;
    let content = ContentStore::new(data_dir.join(CONTENT_DIR));
    Ok((state, content))
}

/// Writes `bytes` to `path` via a sibling temp file and a rename
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .await
        .map_err(|e| StorageError::io(parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("state");
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    let result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StorageError::io(path, e));
    }
    Ok(())
}
