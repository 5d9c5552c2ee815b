//! Configuration for the avatar cache

use std::env;
use std::path::PathBuf;

/// How cached files are presented to the caller's UI layer.
///
/// Selected once at construction via configuration, not by runtime
/// environment inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingMode {
    /// Present cached files as direct `file://` references. For UI layers
    /// with unrestricted local filesystem access.
    DirectFile,
    /// Serve cached files through a loopback HTTP server on an OS-assigned
    /// port. For sandboxed UI layers that can only load network URLs.
    LoopbackHttp,
}

/// Configuration for the caching source
#[derive(Debug, Clone)]
pub struct AvatarCacheConfig {
    pub cache_dir: PathBuf,
    /// Entry-count bound of the LRU index.
    pub max_entries: usize,
    /// Age beyond which a cached entry is refreshed in the background. The
    /// boundary is exclusive: an entry exactly this old is still a hit.
    pub stale_secs: u64,
    pub serving: ServingMode,
}

impl Default for AvatarCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/avatars"),
            max_entries: 1000,
            stale_secs: 6 * 60 * 60, // 6 hours
            serving: ServingMode::DirectFile,
        }
    }
}

impl AvatarCacheConfig {
    /// Parse configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_dir = env::var("AVATAR_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let max_entries = env::var("AVATAR_CACHE_ENTRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_entries);

        let stale_secs = env::var("AVATAR_STALE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.stale_secs);

        let serving = match env::var("AVATAR_SERVING").as_deref() {
            Ok("loopback") => ServingMode::LoopbackHttp,
            _ => ServingMode::DirectFile,
        };

        Self {
            cache_dir,
            max_entries,
            stale_secs,
            serving,
        }
    }

    /// Path of the LRU index file inside the cache directory.
    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join("avatars.index.json")
    }
}
