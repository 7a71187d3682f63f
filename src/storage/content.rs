//! Classification-partitioned content tree
//!
//! ```text
//! <root>/<domain-key>/indices/<sha256(url)>.xml
//! <root>/<domain-key>/content_rich/...
//! <root>/<domain-key>/content_raw/...
//! ```
//!
//! Downstream tools read this tree directly and may skip `content_raw`.

use crate::classifier::Classification;
use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::write_atomic;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores fetched documents under a deterministic, URL-derived name
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Leaf file name for a URL: hex SHA-256 plus an extension
    ///
    /// `.txt` is used for URLs whose path ends in `.txt`, `.xml` otherwise.
    pub fn file_name(url: &str) -> String {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = if path.to_ascii_lowercase().ends_with(".txt") {
            "txt"
        } else {
            "xml"
        };
        format!("{}.{}", digest, ext)
    }

    /// Path a document lands in, None for `Unknown`
    pub fn path_for(
        &self,
        key: &str,
        url: &str,
        classification: Classification,
    ) -> Option<PathBuf> {
        let bucket = classification.bucket()?;
        Some(self.root.join(key).join(bucket).join(Self::file_name(url)))
    }

    /// Atomically writes a document into its bucket and returns its path
    pub async fn write(
        &self,
        key: &str,
        url: &str,
        classification: Classification,
        body: &[u8],
    ) -> StorageResult<PathBuf> {
        let path = self
            .path_for(key, url, classification)
            .ok_or_else(|| StorageError::InvalidKey(format!("unclassified document {}", url)))?;
        write_atomic(&path, body).await?;
        Ok(path)
    }

    /// Reads a stored document, None if it is not on disk
    pub async fn read(
        &self,
        key: &str,
        url: &str,
        classification: Classification,
    ) -> StorageResult<Option<String>> {
        let Some(path) = self.path_for(key, url, classification) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    pub async fn exists(&self, key: &str, url: &str, classification: Classification) -> bool {
        let Some(path) = self.path_for(key, url, classification) else {
            return false;
        };
        fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Deletes a stored document; a missing file is not an error
    pub async fn remove(
        &self,
        key: &str,
        url: &str,
        classification: Classification,
    ) -> StorageResult<()> {
        let Some(path) = self.path_for(key, url, classification) else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}
