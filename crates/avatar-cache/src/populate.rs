//! Population worker pool
//!
//! A fixed pool of workers drains one bounded job queue. Each job downloads
//! a single avatar and commits it to the asset store and the LRU index.
//! Enqueueing never blocks the request path: a full queue drops the job with
//! a warning, and the next load cycle re-detects the pair as a miss or
//! stale. Every job-level failure is logged and absorbed.

use crate::store::AssetStore;
use crate::types::{cache_key, AvatarFormat, AvatarMap};
use disk_lru::DiskLru;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const POOL_SIZE: usize = 10;
const QUEUE_CAPACITY: usize = 100;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// One queued unit of asynchronous work: download and persist a single
/// resolved avatar. Never retried if dropped.
#[derive(Debug, Clone)]
pub struct PopulateJob {
    pub name: String,
    pub format: AvatarFormat,
    pub url: String,
}

pub struct PopulatePool {
    tx: mpsc::Sender<PopulateJob>,
    workers: Vec<JoinHandle<()>>,
}

impl PopulatePool {
    /// Spawn the worker pool against a shared index and store.
    pub fn start(index: Arc<DiskLru>, store: AssetStore) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let rx = Arc::new(Mutex::new(rx));
        let client = Client::new();

        let workers = (0..POOL_SIZE)
            .map(|id| {
                let rx = rx.clone();
                let client = client.clone();
                let index = index.clone();
                let store = store.clone();
                tokio::spawn(async move {
                    worker_loop(id, rx, client, index, store).await;
                })
            })
            .collect();

        Self { tx, workers }
    }

    /// A cloneable handle for enqueueing jobs from the orchestrator and its
    /// background refresh tasks.
    pub fn handle(&self) -> mpsc::Sender<PopulateJob> {
        self.tx.clone()
    }

    /// Close the queue and wait for workers to drain, abandoning any that
    /// outlive the timeout.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, worker).await.is_err() {
                warn!("Populate worker did not drain in time, abandoning");
            }
        }
    }
}

/// Enqueue a job without ever blocking the caller. A full or closed queue
/// drops the job.
pub fn enqueue(tx: &mpsc::Sender<PopulateJob>, job: PopulateJob) {
    match tx.try_send(job) {
        Ok(()) => {}
        Err(TrySendError::Full(job)) => {
            warn!(name = %job.name, format = %job.format, "Populate queue full, dropping job");
        }
        Err(TrySendError::Closed(job)) => {
            warn!(name = %job.name, format = %job.format, "Populate queue closed, dropping job");
        }
    }
}

/// Enqueue one job per non-empty URL in a remote result, warming the cache
/// with everything the matrix fetch returned. Empty URLs mean "no image"
/// and are skipped.
pub fn dispatch_from_map(tx: &mpsc::Sender<PopulateJob>, fetched: &AvatarMap) {
    for (name, rec) in fetched {
        for (format, url) in rec {
            if !url.is_empty() {
                enqueue(
                    tx,
                    PopulateJob {
                        name: name.clone(),
                        format: *format,
                        url: url.clone(),
                    },
                );
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<PopulateJob>>>,
    client: Client,
    index: Arc<DiskLru>,
    store: AssetStore,
) {
    loop {
        // Hold the lock only for the receive itself so other workers can
        // pick up jobs while this one downloads.
        let job = { rx.lock().await.recv().await };
        match job {
            Some(job) => run_job(job, &client, &index, &store).await,
            None => break,
        }
    }
    debug!(worker = id, "Populate worker exiting");
}

async fn run_job(job: PopulateJob, client: &Client, index: &DiskLru, store: &AssetStore) {
    debug!(name = %job.name, format = %job.format, url = %job.url, "Populating avatar");

    let response = match client.get(&job.url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(url = %job.url, error = %e, "Failed to download avatar");
            return;
        }
    };
    if !response.status().is_success() {
        warn!(url = %job.url, status = %response.status(), "Avatar download returned error status");
        return;
    }
    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => {
            warn!(url = %job.url, error = %e, "Failed to read avatar body");
            return;
        }
    };

    // Remember where a previous copy of this key lived so we can clean it up
    // after the new file is published.
    let key = cache_key(&job.name, job.format);
    let previous = match index.get(&key).await {
        Ok(entry) => entry.map(|e| e.value),
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read previous index entry");
            return;
        }
    };

    let path = match store.commit(&bytes).await {
        Ok(p) => p,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to write avatar to disk");
            return;
        }
    };
    let path_str = path.display().to_string();

    let evicted = match index.put(&key, &path_str).await {
        Ok(evicted) => evicted,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to put avatar into index");
            // The file was never published; don't leave it behind.
            store.remove(&path).await;
            return;
        }
    };

    // A refresh writes a new random file, so the replaced file for this key
    // is now unreferenced.
    if let Some(previous) = previous {
        if previous != path_str {
            store.remove(Path::new(&previous)).await;
        }
    }
    if let Some(evicted) = evicted {
        store.remove(Path::new(&evicted.value)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_on_full_queue_drops_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        enqueue(
            &tx,
            PopulateJob {
                name: "alice".to_string(),
                format: AvatarFormat::Square40,
                url: "https://x/a.png".to_string(),
            },
        );
        // Queue is now full; this must return immediately.
        enqueue(
            &tx,
            PopulateJob {
                name: "bob".to_string(),
                format: AvatarFormat::Square40,
                url: "https://x/b.png".to_string(),
            },
        );
    }

    #[tokio::test]
    async fn test_enqueue_on_closed_queue_drops_without_panic() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        enqueue(
            &tx,
            PopulateJob {
                name: "alice".to_string(),
                format: AvatarFormat::Square40,
                url: "https://x/a.png".to_string(),
            },
        );
    }

    #[tokio::test]
    async fn test_dispatch_skips_empty_urls() {
        let (tx, mut rx) = mpsc::channel(10);
        let mut fetched = AvatarMap::new();
        let rec = fetched.entry("alice".to_string()).or_default();
        rec.insert(AvatarFormat::Square40, "https://x/a.png".to_string());
        rec.insert(AvatarFormat::FullSize, String::new());

        dispatch_from_map(&tx, &fetched);
        drop(tx);

        let mut jobs = Vec::new();
        while let Some(job) = rx.recv().await {
            jobs.push(job);
        }
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].format, AvatarFormat::Square40);
        assert_eq!(jobs[0].url, "https://x/a.png");
    }
}
