//! The caching avatar source
//!
//! Public entry point of the engine. Each load classifies every requested
//! (identity, format) pair as a hit, stale, or miss against the LRU index,
//! serves hits and stales from disk immediately, fetches misses
//! synchronously, and kicks off a background refresh for stales. Misses and
//! refreshes are pushed through the population worker pool, which never sits
//! on the caller's request path.

use crate::config::{AvatarCacheConfig, ServingMode};
use crate::error::{AvatarError, Result};
use crate::populate::{dispatch_from_map, PopulateJob, PopulatePool};
use crate::present::UrlPresenter;
use crate::remote::RemoteSource;
use crate::server::LoopbackServer;
use crate::store::AssetStore;
use crate::types::{alloc_response, cache_key, merge_response, AvatarFormat, AvatarMap, LoadPair, LoadSpec};
use chrono::{DateTime, Duration, Utc};
use disk_lru::DiskLru;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// An entry is stale once it is strictly older than the threshold; an entry
/// exactly at the threshold is still a hit. Staleness only triggers a
/// background refresh, never blocks serving.
fn is_stale(created_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now - created_at > threshold
}

pub struct CachingSource {
    index: Arc<DiskLru>,
    store: AssetStore,
    users: Arc<dyn RemoteSource>,
    teams: Arc<dyn RemoteSource>,
    stale_threshold: Duration,
    serving: ServingMode,
    presenter: UrlPresenter,
    pool: Option<PopulatePool>,
    populate_tx: Option<mpsc::Sender<PopulateJob>>,
    server: Option<LoopbackServer>,
    simple_mode: bool,
    running: bool,
}

impl CachingSource {
    /// Build the source: creates the cache directory and opens the LRU
    /// index. Call `start` before loading.
    pub async fn new(
        config: AvatarCacheConfig,
        users: Arc<dyn RemoteSource>,
        teams: Arc<dyn RemoteSource>,
    ) -> Result<Self> {
        let store = AssetStore::new(&config.cache_dir);
        store.init().await?;
        let index = Arc::new(DiskLru::open(config.index_path(), config.max_entries).await?);

        Ok(Self {
            index,
            store,
            users,
            teams,
            stale_threshold: Duration::seconds(config.stale_secs as i64),
            serving: config.serving,
            presenter: UrlPresenter::DirectFile,
            pool: None,
            populate_tx: None,
            server: None,
            simple_mode: false,
            running: false,
        })
    }

    /// Spin up the population workers and, in loopback mode, the local HTTP
    /// server. A server that fails to start drops the source into simple
    /// mode: loads delegate straight to the remote source instead of
    /// caching.
    pub async fn start(&mut self) {
        let pool = PopulatePool::start(self.index.clone(), self.store.clone());
        self.populate_tx = Some(pool.handle());
        self.pool = Some(pool);

        self.presenter = UrlPresenter::DirectFile;
        if self.serving == ServingMode::LoopbackHttp {
            match LoopbackServer::start(self.store.cache_dir()).await {
                Ok(server) => {
                    self.presenter = UrlPresenter::Loopback {
                        addr: server.addr(),
                    };
                    self.server = Some(server);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to start loopback server, using simple mode");
                    self.simple_mode = true;
                }
            }
        }
        self.running = true;
    }

    /// Close the job queue, drain the workers, and stop the loopback
    /// server. Loads after this fail fast.
    pub async fn stop(&mut self) {
        self.running = false;
        self.simple_mode = false;
        self.populate_tx = None;
        if let Some(pool) = self.pool.take() {
            pool.shutdown().await;
        }
        if let Some(server) = self.server.take() {
            server.stop();
        }
    }

    pub async fn load_users(
        &self,
        names: &[String],
        formats: &[AvatarFormat],
    ) -> Result<AvatarMap> {
        self.load(names, formats, &self.users).await
    }

    pub async fn load_teams(
        &self,
        names: &[String],
        formats: &[AvatarFormat],
    ) -> Result<AvatarMap> {
        self.load(names, formats, &self.teams).await
    }

    async fn load(
        &self,
        names: &[String],
        formats: &[AvatarFormat],
        remote: &Arc<dyn RemoteSource>,
    ) -> Result<AvatarMap> {
        if !self.running {
            return Err(AvatarError::Stopped);
        }
        if self.simple_mode {
            return remote.fetch(names, formats).await;
        }
        self.load_names(names, formats, remote).await
    }

    async fn load_names(
        &self,
        names: &[String],
        formats: &[AvatarFormat],
        remote: &Arc<dyn RemoteSource>,
    ) -> Result<AvatarMap> {
        let spec = self.spec_load(names, formats).await?;
        debug!(
            hits = spec.hits.len(),
            stales = spec.stales.len(),
            misses = spec.misses.len(),
            "Classified avatar load"
        );

        let mut res = alloc_response(names);
        for pair in spec.hits.iter().chain(spec.stales.iter()) {
            if let (Some(inner), Some(path)) = (res.get_mut(&pair.name), pair.path.as_deref()) {
                inner.insert(pair.format, self.presenter.present(path));
            }
        }

        // Misses block the caller for one remote round-trip; a failure here
        // just leaves those entries absent.
        let (miss_names, miss_formats) = spec.miss_details();
        if !miss_names.is_empty() {
            match remote.fetch(&miss_names, &miss_formats).await {
                Ok(fetched) => {
                    merge_response(&mut res, &fetched);
                    if let Some(tx) = &self.populate_tx {
                        dispatch_from_map(tx, &fetched);
                    }
                }
                Err(e) => warn!(error = %e, "Failed to fetch missed avatars"),
            }
        }

        // Stales were already served from disk; refresh them off the
        // caller's path.
        let (stale_names, stale_formats) = spec.stale_details();
        if !stale_names.is_empty() {
            let remote = remote.clone();
            let tx = self.populate_tx.clone();
            tokio::spawn(async move {
                debug!(names = stale_names.len(), "Background stale avatar refresh");
                match remote.fetch(&stale_names, &stale_formats).await {
                    Ok(fetched) => {
                        if let Some(tx) = &tx {
                            dispatch_from_map(tx, &fetched);
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to refresh stale avatars"),
                }
            });
        }

        Ok(res)
    }

    /// Partition every requested pair into hits, stales, and misses. Index
    /// failures abort the whole pass.
    async fn spec_load(&self, names: &[String], formats: &[AvatarFormat]) -> Result<LoadSpec> {
        let now = Utc::now();
        let mut spec = LoadSpec::default();
        for name in names {
            for format in formats {
                match self.index.get(&cache_key(name, *format)).await? {
                    Some(entry) => {
                        let pair = LoadPair {
                            name: name.clone(),
                            format: *format,
                            path: Some(entry.value),
                        };
                        if is_stale(entry.created_at, now, self.stale_threshold) {
                            spec.stales.push(pair);
                        } else {
                            spec.hits.push(pair);
                        }
                    }
                    None => spec.misses.push(LoadPair {
                        name: name.clone(),
                        format: *format,
                        path: None,
                    }),
                }
            }
        }
        Ok(spec)
    }
}
