//! Local asset store
//!
//! Owns the cache directory: writes downloaded image bytes to fresh files
//! with collision-resistant random names, and deletes files made obsolete by
//! LRU eviction or refresh. A committed file only becomes visible to readers
//! once the index publishes its path, so a plain write is safe.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AssetStore {
    cache_dir: PathBuf,
}

impl AssetStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Ensure the cache directory exists.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).await?;
        info!(cache_dir = %self.cache_dir.display(), "Asset store initialized");
        Ok(())
    }

    /// Write image bytes to a newly created file under the cache directory.
    /// The 128-bit random name makes collisions with existing files
    /// negligible.
    pub async fn commit(&self, data: &[u8]) -> Result<PathBuf> {
        let name = format!("avatar-{}", Uuid::new_v4().simple());
        let path = self.cache_dir.join(name);
        fs::write(&path, data).await?;
        debug!(path = %path.display(), size = data.len(), "Committed avatar to disk");
        Ok(path)
    }

    /// Delete a cache file. Failures are logged, not escalated: an orphaned
    /// file is acceptable collateral, bounded by the index capacity.
    pub async fn remove(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed cache file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache file"),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_commit_writes_unique_files() {
        let dir = tempdir().unwrap();
        let store = AssetStore::new(dir.path());
        store.init().await.unwrap();

        let a = store.commit(b"first").await.unwrap();
        let b = store.commit(b"second").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(tokio::fs::read(&a).await.unwrap(), b"first");
        assert_eq!(tokio::fs::read(&b).await.unwrap(), b"second");
        assert!(a.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let dir = tempdir().unwrap();
        let store = AssetStore::new(dir.path());
        store.init().await.unwrap();

        let path = store.commit(b"bytes").await.unwrap();
        store.remove(&path).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_file_does_not_panic() {
        let dir = tempdir().unwrap();
        let store = AssetStore::new(dir.path());
        store.remove(&dir.path().join("no-such-file")).await;
    }
}
