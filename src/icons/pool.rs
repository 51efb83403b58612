//! Icon Pool Module
//!
//! Read-through icon cache built on [`MemoryPool`]. Every handle that leaves the
//! pool through cleanup or clear is released exactly once; fetch and decode
//! failures degrade to "no icon" and are never returned to the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{Clock, EvictionHook, MemoryPool, PoolStats, SystemClock};
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::icons::{BlobRegistry, HandleRegistry, HttpFetcher, IconBlob, IconFetcher, IconHandle};

/// Priority icons are stored at. Refetching is expensive, so icons outrank
/// generic entries.
pub const ICON_PRIORITY: f64 = 2.0;

/// Number of icon loads a preload runs together.
pub const DEFAULT_PRELOAD_CHUNK: usize = 5;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

type PendingLoad = Shared<BoxFuture<'static, Option<IconHandle>>>;

// == Request Types ==
/// One item of the UI's list: a stable key and where its icon comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRequest {
    pub key: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl IconRequest {
    pub fn new(key: impl Into<String>, source_url: Option<String>) -> Self {
        Self {
            key: key.into(),
            source_url,
        }
    }
}

/// Half-open index window `[start, end)` of items about to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Outcome of a preload pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    /// Items inside the visible window
    pub requested: usize,
    /// Loads that produced a handle
    pub loaded: usize,
    /// Loads that ended without an icon
    pub failed: usize,
    /// Items already cached or without a source
    pub skipped: usize,
}

// == Revoke Hook ==
/// Releases revocable handles as entries are evicted or cleared.
struct RevokeOnEvict {
    handles: Arc<dyn HandleRegistry>,
}

impl EvictionHook<IconHandle> for RevokeOnEvict {
    fn on_evict(&self, key: &str, handle: &IconHandle) -> bool {
        if !handle.is_revocable() {
            return false;
        }
        match self.handles.release(handle) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, url = %handle.url, error = %e, "Failed to release icon handle");
                false
            }
        }
    }
}

// == Icon Pool ==
/// Shared icon cache. Cloning is cheap and every clone sees the same pool.
#[derive(Clone)]
pub struct IconPool {
    inner: Arc<Inner>,
}

struct Inner {
    cache: Mutex<MemoryPool<IconHandle>>,
    /// Loads in flight, keyed by icon key
    pending: Mutex<HashMap<String, PendingLoad>>,
    fetcher: Arc<dyn IconFetcher>,
    handles: Arc<dyn HandleRegistry>,
    chunk_size: usize,
}

impl IconPool {
    /// Starts building an icon pool with the given budget.
    pub fn builder(config: PoolConfig) -> IconPoolBuilder {
        IconPoolBuilder {
            config,
            fetcher: None,
            handles: None,
            clock: Arc::new(SystemClock),
            chunk_size: DEFAULT_PRELOAD_CHUNK,
        }
    }

    // == Load ==
    /// Fetches, decodes and stores an icon, returning its handle.
    ///
    /// Always fetches, even when the key is cached. A refresh replaces the
    /// cached entry and releases the handle it held, so callers still rendering
    /// that handle must read the key again. Failures are logged and yield
    /// `None`; the next call is a fresh attempt.
    pub async fn load_icon(&self, key: &str, source_url: &str) -> Option<IconHandle> {
        self.load(key, source_url, true).await
    }

    async fn load(&self, key: &str, source_url: &str, replace: bool) -> Option<IconHandle> {
        match self.fetch_and_store(key, source_url, replace).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(key = %key, url = %source_url, error = %e, "Failed to load icon");
                None
            }
        }
    }

    /// With `replace` unset an entry stored while the fetch was running wins
    /// and the freshly created handle is released instead.
    async fn fetch_and_store(&self, key: &str, source_url: &str, replace: bool) -> Result<IconHandle> {
        let bytes = self.inner.fetcher.fetch(source_url).await?;
        let blob = IconBlob::decode(source_url, bytes)?;
        let handle = self.inner.handles.create(blob)?;

        let (stored, existing) = {
            let mut cache = self.inner.cache.lock().await;
            let existing = if replace {
                None
            } else {
                cache.peek(key).map(|entry| entry.data.clone())
            };
            match existing {
                Some(existing) => (Ok(None), Some(existing)),
                None => (cache.set(key, handle.clone(), ICON_PRIORITY), None),
            }
        };

        if let Some(existing) = existing {
            self.release_handle(&handle);
            debug!(key = %key, url = %existing.url, "Icon stored concurrently, keeping cached handle");
            return Ok(existing);
        }

        match stored {
            Ok(Some(previous)) => {
                // Replacing a key must not orphan the handle it held.
                if previous.url != handle.url {
                    self.release_handle(&previous);
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.release_handle(&handle);
                return Err(e);
            }
        }

        debug!(key = %key, url = %handle.url, bytes = handle.byte_len, "Loaded icon");
        Ok(handle)
    }

    // == Get ==
    /// Cache-first read. A miss joins the in-flight load for the same key or
    /// starts a new one.
    pub async fn get_icon(&self, key: &str, source_url: &str) -> Option<IconHandle> {
        let cached = {
            let mut cache = self.inner.cache.lock().await;
            cache.get(key).cloned()
        };
        if let Some(handle) = cached {
            debug!(key = %key, "Icon cache hit");
            return Some(handle);
        }

        self.load_shared(key, source_url).await
    }

    /// Joins the in-flight load for `key` or starts one. The cache is checked
    /// again under the pending lock, so a key stored since the caller last
    /// looked is returned as is and never fetched twice.
    async fn load_shared(&self, key: &str, source_url: &str) -> Option<IconHandle> {
        let load = {
            let mut pending = self.inner.pending.lock().await;
            if let Some(existing) = pending.get(key) {
                debug!(key = %key, "Joining in-flight icon load");
                existing.clone()
            } else {
                let cached = {
                    let cache = self.inner.cache.lock().await;
                    cache.peek(key).map(|entry| entry.data.clone())
                };
                if let Some(handle) = cached {
                    debug!(key = %key, "Icon loaded since lookup");
                    return Some(handle);
                }

                let pool = self.clone();
                let key_owned = key.to_string();
                let url_owned = source_url.to_string();
                let load = async move {
                    let handle = pool.load(&key_owned, &url_owned, false).await;
                    pool.inner.pending.lock().await.remove(&key_owned);
                    handle
                }
                .boxed()
                .shared();
                pending.insert(key.to_string(), load.clone());
                load
            }
        };

        load.await
    }

    // == Preload ==
    /// Loads icons for the uncached items inside `range`, at most `chunk_size`
    /// at a time. Each chunk settles completely before the next one starts and
    /// a failed load never cancels its siblings.
    pub async fn preload_icons(&self, items: &[IconRequest], range: VisibleRange) -> PreloadReport {
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        let window = &items[start..end];

        let mut report = PreloadReport {
            requested: window.len(),
            ..Default::default()
        };

        let candidates: Vec<(&str, &str)> = {
            let cache = self.inner.cache.lock().await;
            window
                .iter()
                .filter_map(|item| match &item.source_url {
                    Some(url) if !cache.has(&item.key) => Some((item.key.as_str(), url.as_str())),
                    _ => None,
                })
                .collect()
        };
        report.skipped = window.len() - candidates.len();

        for chunk in candidates.chunks(self.inner.chunk_size) {
            let results = join_all(chunk.iter().map(|(key, url)| self.load_shared(key, url))).await;
            for result in results {
                if result.is_some() {
                    report.loaded += 1;
                } else {
                    report.failed += 1;
                }
            }
        }

        if report.requested > 0 {
            info!(
                start,
                end,
                loaded = report.loaded,
                failed = report.failed,
                skipped = report.skipped,
                "Icon preload complete"
            );
        }
        report
    }

    // == Cleanup ==
    /// Runs an eviction pass, releasing the handle of every evicted icon.
    pub async fn cleanup(&self, required_space: usize) -> usize {
        self.inner.cache.lock().await.cleanup(required_space)
    }

    // == Clear ==
    /// Releases every cached handle and empties the pool.
    pub async fn clear(&self) -> usize {
        let removed = self.inner.cache.lock().await.clear();
        info!(removed, "Icon pool cleared");
        removed
    }

    // == Delete ==
    /// Removes an icon without releasing it. The handle is returned so the
    /// caller can keep using it and must [`release`](Self::release) it later.
    pub async fn delete(&self, key: &str) -> Option<IconHandle> {
        self.inner.cache.lock().await.remove(key)
    }

    /// Releases a handle handed back by [`delete`](Self::delete).
    ///
    /// Handles still held by a cached entry are refused; cleanup and clear
    /// release those. Returns true when the handle was released.
    pub async fn release(&self, handle: &IconHandle) -> bool {
        let held = {
            let cache = self.inner.cache.lock().await;
            let held = cache
                .keys()
                .filter_map(|key| cache.peek(key))
                .any(|entry| entry.data.url == handle.url);
            held
        };
        if held {
            warn!(url = %handle.url, "Refusing to release a handle the pool still holds");
            return false;
        }
        self.release_handle(handle)
    }

    fn release_handle(&self, handle: &IconHandle) -> bool {
        if !handle.is_revocable() {
            return false;
        }
        match self.inner.handles.release(handle) {
            Ok(()) => true,
            Err(e) => {
                warn!(url = %handle.url, error = %e, "Failed to release icon handle");
                false
            }
        }
    }

    pub async fn has(&self, key: &str) -> bool {
        self.inner.cache.lock().await.has(key)
    }

    pub async fn stats(&self) -> PoolStats {
        self.inner.cache.lock().await.stats()
    }

    /// Registry backing this pool's handles.
    pub fn handles(&self) -> &Arc<dyn HandleRegistry> {
        &self.inner.handles
    }
}

impl fmt::Debug for IconPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconPool")
            .field("chunk_size", &self.inner.chunk_size)
            .field("live_handles", &self.inner.handles.live_count())
            .finish()
    }
}

// == Builder ==
/// Assembles an [`IconPool`] from its collaborators.
pub struct IconPoolBuilder {
    config: PoolConfig,
    fetcher: Option<Arc<dyn IconFetcher>>,
    handles: Option<Arc<dyn HandleRegistry>>,
    clock: Arc<dyn Clock>,
    chunk_size: usize,
}

impl IconPoolBuilder {
    /// Byte fetch capability. Defaults to [`HttpFetcher`].
    pub fn fetcher(mut self, fetcher: Arc<dyn IconFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Handle materialisation. Defaults to a fresh [`BlobRegistry`].
    pub fn handles(mut self, handles: Arc<dyn HandleRegistry>) -> Self {
        self.handles = Some(handles);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Concurrent loads per preload chunk.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn build(self) -> Result<IconPool> {
        if self.chunk_size == 0 {
            return Err(PoolError::InvalidConfig(
                "preload chunk size must be at least 1".to_string(),
            ));
        }

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(DEFAULT_FETCH_TIMEOUT)?),
        };
        let handles = self
            .handles
            .unwrap_or_else(|| Arc::new(BlobRegistry::new()));

        let cache = MemoryPool::new(self.config)?
            .with_clock(self.clock)
            .with_hook(Box::new(RevokeOnEvict {
                handles: handles.clone(),
            }));

        Ok(IconPool {
            inner: Arc::new(Inner {
                cache: Mutex::new(cache),
                pending: Mutex::new(HashMap::new()),
                fetcher,
                handles,
                chunk_size: self.chunk_size,
            }),
        })
    }
}
