//! Handle Registry Module
//!
//! Creates, resolves and releases revocable icon handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{PoolError, Result};
use crate::icons::{IconBlob, IconHandle};

/// Prefix of every handle URL issued by [`BlobRegistry`].
pub const HANDLE_PREFIX: &str = "blob:icon-pool/";

/// Materialises decoded icons as revocable handles.
pub trait HandleRegistry: Send + Sync {
    /// Creates a new handle pinning `blob` until released.
    fn create(&self, blob: IconBlob) -> Result<IconHandle>;

    /// Releases a handle. Releasing an unknown or already released handle is an error.
    fn release(&self, handle: &IconHandle) -> Result<()>;

    /// Returns the bytes behind a live handle URL.
    fn resolve(&self, url: &str) -> Option<Arc<IconBlob>>;

    /// Number of handles created and not yet released.
    fn live_count(&self) -> usize;
}

// == Blob Registry ==
/// In-process handle table issuing `blob:icon-pool/<n>` URLs.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: RwLock<HashMap<u64, Arc<IconBlob>>>,
    next_id: AtomicU64,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the numeric id out of a handle URL.
    pub fn parse_id(url: &str) -> Option<u64> {
        url.strip_prefix(HANDLE_PREFIX)?.parse().ok()
    }

    fn poisoned() -> PoolError {
        PoolError::Internal("handle registry lock poisoned".to_string())
    }
}

impl HandleRegistry for BlobRegistry {
    fn create(&self, blob: IconBlob) -> Result<IconHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = IconHandle {
            url: format!("{}{}", HANDLE_PREFIX, id),
            byte_len: blob.len(),
            mime: blob.mime,
        };

        self.blobs
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(id, Arc::new(blob));

        debug!(url = %handle.url, bytes = handle.byte_len, "Created icon handle");
        Ok(handle)
    }

    fn release(&self, handle: &IconHandle) -> Result<()> {
        let id = Self::parse_id(&handle.url)
            .ok_or_else(|| PoolError::HandleRelease(handle.url.clone()))?;

        match self.blobs.write().map_err(|_| Self::poisoned())?.remove(&id) {
            Some(_) => {
                debug!(url = %handle.url, "Released icon handle");
                Ok(())
            }
            None => Err(PoolError::HandleRelease(handle.url.clone())),
        }
    }

    fn resolve(&self, url: &str) -> Option<Arc<IconBlob>> {
        let id = Self::parse_id(url)?;
        self.blobs.read().ok()?.get(&id).cloned()
    }

    fn live_count(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }
}
