//! Cache facade orchestrating fetch, transform, index, and eviction.
//!
//! UI components call [`CacheManager::ensure_cached`] and
//! [`CacheManager::optimize`]; neither ever fails, they degrade to the best URI
//! still available.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::cache_store::CacheStore;
use super::evictor::{EvictionReport, Evictor};
use super::fetcher::HttpFetcher;
use super::transform::ImageTransformer;
use crate::application::services::{EvictionPolicy, QualityPolicy, UriClassifier};
use crate::application::services::quality_policy::DEFAULT_TRANSFORM_HOSTS;
use crate::domain::entities::{
    CacheEntry, CacheIndex, CacheKey, ImageFormat, QualityLadder, TransformOptions,
    TransformOverrides,
};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{FetcherPort, FileSystemPort, NetworkProbePort, TransformPort};
use crate::infrastructure::fs::TokioFileSystem;

/// Default interval between opportunistic sweeps (1 day).
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Settings for a [`CacheManager`].
#[derive(Debug, Clone)]
pub struct CacheManagerConfig {
    /// Cache root holding derivative files and `metadata.json`.
    pub cache_dir: PathBuf,
    /// Age and size budgets.
    pub eviction: EvictionPolicy,
    /// Minimum time between opportunistic sweeps.
    pub cleanup_interval: Duration,
    /// Sweep during [`CacheManager::init`] when a sweep is due.
    pub evict_on_init: bool,
    /// Host substrings that accept width/quality query parameters.
    pub transform_hosts: Vec<String>,
    /// Format used when callers do not pick one.
    pub default_format: ImageFormat,
}

impl CacheManagerConfig {
    /// Default settings rooted at `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            eviction: EvictionPolicy::default(),
            cleanup_interval: Duration::days(1),
            evict_on_init: true,
            transform_hosts: DEFAULT_TRANSFORM_HOSTS
                .iter()
                .map(|h| (*h).to_string())
                .collect(),
            default_format: ImageFormat::Jpeg,
        }
    }
}

/// Capabilities the cache consumes from the rest of the app.
#[derive(Clone)]
pub struct CachePorts {
    /// Byte source for remote URIs.
    pub fetcher: Arc<dyn FetcherPort>,
    /// Local filesystem.
    pub fs: Arc<dyn FileSystemPort>,
    /// Derivative producer.
    pub transformer: Arc<dyn TransformPort>,
    /// Network class probe.
    pub probe: Arc<dyn NetworkProbePort>,
}

impl CachePorts {
    /// Wires the HTTP fetcher, tokio filesystem, and `image` transformer.
    ///
    /// # Errors
    /// Returns `FetchFailed` if the HTTP client cannot be created.
    pub fn standard(timeout: StdDuration, probe: Arc<dyn NetworkProbePort>) -> CacheResult<Self> {
        let fs: Arc<dyn FileSystemPort> = Arc::new(TokioFileSystem::new());
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new(timeout)?),
            transformer: Arc::new(ImageTransformer::new(fs.clone())),
            fs,
            probe,
        })
    }
}

/// Snapshot of cache contents and counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Indexed entries.
    pub entries: usize,
    /// Sum of indexed sizes.
    pub total_bytes: u64,
    /// Lookups answered from the index.
    pub hits: u64,
    /// Lookups that needed work.
    pub misses: u64,
    /// Fetches started.
    pub fetches: u64,
    /// Operations currently in flight.
    pub in_flight: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} entries, {} bytes ({} hits, {} misses, {} fetches)",
            self.entries, self.total_bytes, self.hits, self.misses, self.fetches
        )
    }
}

type PendingPath = Shared<BoxFuture<'static, CacheResult<PathBuf>>>;

struct Inner {
    config: CacheManagerConfig,
    store: CacheStore,
    evictor: Evictor,
    policy: QualityPolicy,
    fetcher: Arc<dyn FetcherPort>,
    transformer: Arc<dyn TransformPort>,
    probe: Arc<dyn NetworkProbePort>,
    index: Mutex<CacheIndex>,
    in_flight: parking_lot::Mutex<HashMap<CacheKey, PendingPath>>,
    sweep_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
}

/// The image cache. Construct once at startup and share by cloning.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl CacheManager {
    /// Creates the cache root, loads the index, and sweeps if a sweep is due.
    ///
    /// # Errors
    /// Returns `FsFailed` if the cache directory cannot be created.
    pub async fn init(config: CacheManagerConfig, ports: CachePorts) -> CacheResult<Self> {
        let store = CacheStore::new(config.cache_dir.clone(), ports.fs);
        store.init().await?;

        let now = Utc::now();
        let mut index = store.load(now).await;
        let evictor = Evictor::new(config.eviction);

        if config.evict_on_init && index.cleanup_due(now, config.cleanup_interval) {
            evictor.run(&store, &mut index, now).await;
        }

        info!(
            dir = %config.cache_dir.display(),
            entries = index.len(),
            bytes = index.total_size(),
            "Image cache ready"
        );

        let policy = QualityPolicy::new(config.transform_hosts.iter().cloned(), config.default_format);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store,
                evictor,
                policy,
                fetcher: ports.fetcher,
                transformer: ports.transformer,
                probe: ports.probe,
                index: Mutex::new(index),
                in_flight: parking_lot::Mutex::new(HashMap::new()),
                sweep_task: parking_lot::Mutex::new(None),
                closed: AtomicBool::new(false),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                fetches: AtomicU64::new(0),
            }),
        })
    }

    /// Returns a local path for `uri`, fetching it on first use.
    ///
    /// Local and data URIs come back unchanged, as does `uri` itself when the
    /// fetch fails. Dropping the returned future never cancels work other
    /// callers are waiting on.
    pub async fn ensure_cached(&self, uri: &str) -> String {
        if UriClassifier::is_local(uri) {
            return uri.to_string();
        }
        if self.is_closed() {
            debug!(uri = %uri, "Cache closed, passing URI through");
            return uri.to_string();
        }

        let key = CacheKey::derive(uri, None);
        match self.inner.resolve_original(key, uri).await {
            Ok(path) => path_string(&path),
            Err(e) => {
                warn!(uri = %uri, error = %e, "Serving origin URI");
                uri.to_string()
            }
        }
    }

    /// Returns a cached derivative of `uri` sized for the current network.
    ///
    /// Caller overrides win over the network profile. Falls back to the cached
    /// original, then to `uri`, when anything fails.
    pub async fn optimize(&self, uri: &str, overrides: &TransformOverrides) -> String {
        if self.is_closed() {
            return uri.to_string();
        }

        let class = self.inner.probe.network_class().await;
        let options = self.inner.policy.resolve(class, overrides);
        let key = CacheKey::derive(uri, Some(&options));
        trace!(uri = %uri, class = %class, options = %options.descriptor(), "Optimizing image");

        let inner = Arc::clone(&self.inner);
        let job_key = key.clone();
        let job_uri = uri.to_string();
        let job = async move { inner.produce_derivative(&job_key, &job_uri, &options).await }.boxed();

        match self.inner.single_flight(key, job).await {
            Ok(path) => path_string(&path),
            Err(e) => {
                warn!(uri = %uri, error = %e, "Serving origin URI");
                uri.to_string()
            }
        }
    }

    /// Builds the quality ladder for `uri` on the current network.
    pub async fn ladder(&self, uri: &str) -> QualityLadder {
        let class = self.inner.probe.network_class().await;
        self.inner.policy.build_ladder(uri, class)
    }

    /// Runs the evictor now, regardless of when it last ran.
    pub async fn sweep(&self) -> EvictionReport {
        let mut index = self.inner.index.lock().await;
        self.inner
            .evictor
            .run(&self.inner.store, &mut index, Utc::now())
            .await
    }

    /// Returns cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let index = self.inner.index.lock().await;
        CacheStats {
            entries: index.len(),
            total_bytes: index.total_size(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            fetches: self.inner.fetches.load(Ordering::Relaxed),
            in_flight: self.inner.in_flight.lock().len(),
        }
    }

    /// Removes every entry and its file.
    ///
    /// # Errors
    /// Returns `FsFailed` if the emptied index cannot be persisted.
    pub async fn clear(&self) -> CacheResult<usize> {
        let mut index = self.inner.index.lock().await;
        let keys: Vec<CacheKey> = index.files.keys().cloned().collect();

        for key in &keys {
            if let Err(e) = self.inner.store.remove_file(key).await {
                warn!(key = %key, error = %e, "Failed to remove cached file");
            }
        }

        *index = CacheIndex::new(Utc::now());
        self.inner.store.save(&index).await?;
        info!(removed = keys.len(), "Cleared image cache");
        Ok(keys.len())
    }

    /// Waits for in-flight work, persists the index, and stops caching.
    ///
    /// Later calls pass URIs through unchanged.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let pending: Vec<PendingPath> = self.inner.in_flight.lock().values().cloned().collect();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Waiting for in-flight image work");
            future::join_all(pending).await;
        }

        let sweep = self.inner.sweep_task.lock().take();
        if let Some(task) = sweep
            && let Err(e) = task.await
        {
            warn!(error = %e, "Cache sweep task failed");
        }

        let index = self.inner.index.lock().await;
        self.inner.persist(&index).await;
        info!(entries = index.len(), "Image cache closed");
    }

    /// Returns true once [`CacheManager::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Returns the cache root.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        self.inner.store.root()
    }
}

impl Inner {
    /// Joins the in-flight operation for `key`, or starts `work` as that operation.
    ///
    /// `work` runs on its own task, so it finishes and leaves the in-flight map
    /// even when every caller has stopped waiting. Nothing new starts once the
    /// cache is closed.
    fn single_flight(
        self: &Arc<Self>,
        key: CacheKey,
        work: BoxFuture<'static, CacheResult<PathBuf>>,
    ) -> PendingPath {
        let mut in_flight = self.in_flight.lock();
        if let Some(pending) = in_flight.get(&key) {
            trace!(key = %key, "Joining in-flight request");
            return pending.clone();
        }
        if self.closed.load(Ordering::SeqCst) {
            return future::ready(Err(CacheError::fs("cache is closed")))
                .boxed()
                .shared();
        }

        let this = Arc::clone(self);
        let done_key = key.clone();
        let task = tokio::spawn(async move {
            let result = work.await;
            this.in_flight.lock().remove(&done_key);
            result
        });

        let pending = async move {
            task.await
                .unwrap_or_else(|e| Err(CacheError::fs(format!("Cache task failed: {e}"))))
        }
        .boxed()
        .shared();

        in_flight.insert(key, pending.clone());
        pending
    }

    async fn resolve_original(self: &Arc<Self>, key: CacheKey, uri: &str) -> CacheResult<PathBuf> {
        let this = Arc::clone(self);
        let job_key = key.clone();
        let job_uri = uri.to_string();
        let job = async move { this.fetch_original(&job_key, &job_uri).await }.boxed();
        self.single_flight(key, job).await
    }

    async fn fetch_original(self: &Arc<Self>, key: &CacheKey, uri: &str) -> CacheResult<PathBuf> {
        if let Some(path) = self.lookup(key).await {
            return Ok(path);
        }

        let dest = self.store.entry_path(key);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let file = self.fetcher.fetch(uri, &dest).await?;

        self.record(key, uri, file.size_bytes).await;
        Ok(file.path)
    }

    async fn produce_derivative(
        self: &Arc<Self>,
        key: &CacheKey,
        uri: &str,
        options: &TransformOptions,
    ) -> CacheResult<PathBuf> {
        if let Some(path) = self.lookup(key).await {
            return Ok(path);
        }

        let source = match UriClassifier::local_path(uri) {
            Some(path) => path,
            None if UriClassifier::is_local(uri) => {
                return Err(CacheError::transform(format!("No readable file behind {uri}")));
            }
            None => {
                self.resolve_original(CacheKey::derive(uri, None), uri)
                    .await?
            }
        };

        let dest = self.store.entry_path(key);
        match self.transformer.transform(&source, &dest, options).await {
            Ok(file) => {
                self.record(key, uri, file.size_bytes).await;
                Ok(file.path)
            }
            Err(e) => {
                warn!(uri = %uri, error = %e, "Transform failed, serving source");
                Ok(source)
            }
        }
    }

    /// Answers a lookup from the index, refreshing the entry on a hit.
    ///
    /// Entries whose file has disappeared are dropped and reported as misses.
    async fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let mut index = self.index.lock().await;
        if !index.contains(key) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Cache miss");
            return None;
        }

        if !self.store.has_file(key).await {
            debug!(key = %key, "Indexed file missing, dropping stale entry");
            index.remove(key);
            self.persist(&index).await;
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        index.touch(key, Utc::now());
        self.persist(&index).await;
        self.hits.fetch_add(1, Ordering::Relaxed);
        trace!(key = %key, "Cache hit");
        Some(self.store.entry_path(key))
    }

    async fn record(self: &Arc<Self>, key: &CacheKey, uri: &str, size_bytes: u64) {
        let now = Utc::now();
        let mut index = self.index.lock().await;
        index.put(key.clone(), CacheEntry::new(uri, size_bytes, now));
        self.persist(&index).await;
        debug!(key = %key, uri = %uri, size = size_bytes, "Cached image");

        let due = index.cleanup_due(now, self.config.cleanup_interval);
        drop(index);
        if due {
            self.schedule_sweep();
        }
    }

    async fn persist(&self, index: &CacheIndex) {
        if let Err(e) = self.store.save(index).await {
            warn!(error = %e, "Failed to persist cache index");
        }
    }

    fn schedule_sweep(self: &Arc<Self>) {
        let mut task = self.sweep_task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let this = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            let mut index = this.index.lock().await;
            let now = Utc::now();
            if index.cleanup_due(now, this.config.cleanup_interval) {
                this.evictor.run(&this.store, &mut index, now).await;
            }
        }));
        debug!("Scheduled cache sweep");
    }
}
