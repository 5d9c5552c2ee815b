//! The LRU index implementation

use crate::error::Result;
use crate::types::LruEntry;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A durable LRU index bounded by entry count.
///
/// Every mutation is flushed to the backing JSON file, so the index survives
/// process restarts. All operations are safe to call concurrently; for
/// concurrent `put`s of the same key, the last one to complete wins.
pub struct DiskLru {
    index_path: PathBuf,
    max_entries: usize,
    entries: Mutex<HashMap<String, LruEntry>>,
}

impl DiskLru {
    /// Open an index backed by the given file, loading any persisted entries.
    ///
    /// A missing file is a fresh cache, not an error. A file that exists but
    /// cannot be read or parsed is surfaced as an error.
    pub async fn open(index_path: impl Into<PathBuf>, max_entries: usize) -> Result<Self> {
        let index_path = index_path.into();
        let entries = match fs::read(&index_path).await {
            Ok(data) => {
                let entries: HashMap<String, LruEntry> = serde_json::from_slice(&data)?;
                info!(
                    path = %index_path.display(),
                    entries = entries.len(),
                    "Loaded LRU index"
                );
                entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %index_path.display(), "No LRU index file, starting empty");
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            index_path,
            max_entries,
            entries: Mutex::new(entries),
        })
    }

    /// Look up an entry by key, bumping its recency on a hit.
    pub async fn get(&self, key: &str) -> Result<Option<LruEntry>> {
        let mut entries = self.entries.lock().await;
        let found = match entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = Utc::now();
                Some(entry.clone())
            }
            None => None,
        };
        if found.is_some() {
            self.flush(&entries).await?;
        }
        Ok(found)
    }

    /// Insert or replace an entry. The creation time is always reset, so a
    /// replacement restarts the entry's age.
    ///
    /// When the insert pushes the index over capacity, the least-recently
    /// accessed other entry is removed and returned; the caller owns cleanup
    /// of whatever the evicted value referenced.
    pub async fn put(&self, key: &str, value: &str) -> Result<Option<LruEntry>> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            LruEntry {
                key: key.to_string(),
                value: value.to_string(),
                created_at: now,
                last_access: now,
            },
        );

        let mut evicted = None;
        if entries.len() > self.max_entries {
            // The freshly inserted key is never the eviction victim.
            let victim = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                evicted = entries.remove(&victim);
                debug!(key = %victim, "Evicted least-recently-used entry");
            }
        }

        self.flush(&entries).await?;
        Ok(evicted)
    }

    /// Remove an entry by key, returning it if present.
    pub async fn remove(&self, key: &str) -> Result<Option<LruEntry>> {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(key);
        if removed.is_some() {
            self.flush(&entries).await?;
        }
        Ok(removed)
    }

    /// Number of entries currently in the index.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Path of the backing index file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    async fn flush(&self, entries: &HashMap<String, LruEntry>) -> Result<()> {
        let data = serde_json::to_vec(entries)?;
        fs::write(&self.index_path, data).await?;
        Ok(())
    }
}
