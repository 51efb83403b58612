//! Icon Fetch Module
//!
//! Byte fetch capability used by the icon pool on cache misses.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PoolError, Result};

/// Fetches raw icon bytes from a source URL.
#[async_trait]
pub trait IconFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

// == HTTP Fetcher ==
/// Fetches `http`/`https` URLs with reqwest. `file://` URLs and bare paths are
/// read from disk only when they resolve inside the configured icon root.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    icon_root: Option<PathBuf>,
}

impl HttpFetcher {
    /// Creates a fetcher whose remote requests time out after `timeout`.
    /// Local sources are refused until an icon root is set.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            icon_root: None,
        })
    }

    /// Allows local icons below `root`. Relative sources resolve against it.
    pub fn with_icon_root(mut self, root: impl AsRef<Path>) -> Result<Self> {
        let root = std::fs::canonicalize(root.as_ref()).map_err(|e| {
            PoolError::InvalidConfig(format!(
                "icon root {} is not usable: {}",
                root.as_ref().display(),
                e
            ))
        })?;
        self.icon_root = Some(root);
        Ok(self)
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PoolError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PoolError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| PoolError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn fetch_file(&self, url: &str, path: &str) -> Result<Vec<u8>> {
        let refused = |reason: &str| PoolError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let root = self
            .icon_root
            .as_ref()
            .ok_or_else(|| refused("local icons are disabled"))?;

        // Canonicalizing resolves `..` and symlinks before the root check
        let resolved = tokio::fs::canonicalize(root.join(path))
            .await
            .map_err(|e| refused(&e.to_string()))?;
        if !resolved.starts_with(root) {
            return Err(refused("path is outside the icon root"));
        }

        tokio::fs::read(&resolved)
            .await
            .map_err(|e| refused(&e.to_string()))
    }
}

#[async_trait]
impl IconFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_remote(url).await
        } else if let Some(path) = url.strip_prefix("file://") {
            self.fetch_file(url, path).await
        } else if !url.contains("://") {
            self.fetch_file(url, url).await
        } else {
            Err(PoolError::Fetch {
                url: url.to_string(),
                reason: "unsupported URL scheme".to_string(),
            })
        }
    }
}
