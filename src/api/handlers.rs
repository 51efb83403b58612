//! API Handlers
//!
//! HTTP request handlers for each host bridge endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::RwLock;

use crate::cache::{MemoryPool, DEFAULT_PRIORITY};
use crate::config::Config;
use crate::error::{PoolError, Result};
use crate::icons::{HttpFetcher, IconPool, PreloadReport, HANDLE_PREFIX};
use crate::models::{
    validate_key, ClearResponse, DeleteResponse, GetResponse, HealthResponse, IconQuery,
    IconResponse, PreloadRequest, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// Holds the generic pool and the icon pool for one host session.
#[derive(Clone)]
pub struct AppState {
    /// Generic pool for JSON payloads
    pub pool: Arc<RwLock<MemoryPool<serde_json::Value>>>,
    /// Icon pool, internally synchronised
    pub icons: IconPool,
    /// Origins granted cross-origin access to the bridge
    pub allowed_origins: Arc<[String]>,
}

impl AppState {
    /// Creates a new AppState from already built pools.
    pub fn new(pool: MemoryPool<serde_json::Value>, icons: IconPool) -> Self {
        Self {
            pool: Arc::new(RwLock::new(pool)),
            icons,
            allowed_origins: Arc::from(Vec::new()),
        }
    }

    /// Grants the given renderer origins cross-origin access.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = Arc::from(origins);
        self
    }

    /// Creates a new AppState from configuration.
    ///
    /// Icons are fetched over HTTP with the configured timeout, and from disk
    /// only below the configured icon root.
    pub fn from_config(config: &Config) -> Result<Self> {
        let pool = MemoryPool::new(config.pool.clone())?;
        let mut fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout))?;
        if let Some(root) = &config.icon_root {
            fetcher = fetcher.with_icon_root(root)?;
        }
        let icons = IconPool::builder(config.icon_pool.clone())
            .fetcher(Arc::new(fetcher))
            .chunk_size(config.preload_chunk_size)
            .build()?;
        Ok(Self::new(pool, icons).with_allowed_origins(config.allowed_origins.clone()))
    }
}

/// Handler for PUT /pool/set
///
/// Stores a JSON value in the generic pool with optional priority.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(PoolError::InvalidRequest(error_msg));
    }

    let priority = req.priority.unwrap_or(DEFAULT_PRIORITY);
    let mut pool = state.pool.write().await;
    let previous = pool.set(req.key.clone(), req.value, priority)?;

    Ok(Json(SetResponse::new(req.key, previous.is_some())))
}

/// Handler for GET /pool/get/:key
///
/// Retrieves a value from the generic pool by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Acquire write lock (reads update access bookkeeping)
    let mut pool = state.pool.write().await;
    let value = pool
        .get(&key)
        .cloned()
        .ok_or_else(|| PoolError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /pool/del/:key
///
/// Deletes a key from the generic pool.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let mut pool = state.pool.write().await;
    if pool.delete(&key) {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(PoolError::NotFound(key))
    }
}

/// Handler for GET /pool/stats
pub async fn pool_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let pool = state.pool.read().await;
    Json(StatsResponse::new(pool.stats()))
}

/// Handler for GET /icons/:key?src=URL
///
/// Returns the cached handle for `key`, loading it from `src` on a miss.
pub async fn icon_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<IconQuery>,
) -> Result<Json<IconResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(PoolError::InvalidRequest(error_msg));
    }

    match state.icons.get_icon(&key, &query.src).await {
        Some(handle) => Ok(Json(IconResponse::new(key, handle))),
        None => Err(PoolError::NotFound(key)),
    }
}

/// Handler for POST /icons/preload
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Json<PreloadReport> {
    let range = req.range();
    Json(state.icons.preload_icons(&req.items, range).await)
}

/// Handler for DELETE /icons
///
/// Releases every cached icon handle.
pub async fn clear_icons_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.icons.clear().await;
    Json(ClearResponse { removed })
}

/// Handler for GET /icons/stats
pub async fn icon_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.icons.stats().await))
}

/// Handler for GET /blob/:id
///
/// Serves the bytes behind a live icon handle.
pub async fn blob_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response> {
    let url = format!("{}{}", HANDLE_PREFIX, id);
    let blob = state
        .icons
        .handles()
        .resolve(&url)
        .ok_or_else(|| PoolError::NotFound(url))?;

    Ok(([(header::CONTENT_TYPE, blob.mime)], blob.bytes.clone()).into_response())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::icons::{BlobRegistry, IconFetcher};
    use async_trait::async_trait;

    struct NoFetch;

    #[async_trait]
    impl IconFetcher for NoFetch {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(PoolError::Fetch {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn test_state() -> AppState {
        let pool = MemoryPool::new(PoolConfig::with_max_size(10_000)).unwrap();
        let icons = IconPool::builder(PoolConfig::with_max_size(10_000))
            .fetcher(Arc::new(NoFetch))
            .handles(Arc::new(BlobRegistry::new()))
            .build()
            .unwrap();
        AppState::new(pool, icons)
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "test_key".to_string(),
            value: serde_json::json!("test_value"),
            priority: None,
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(!result.unwrap().replaced);

        let response = get_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(PoolError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "to_delete".to_string(),
            value: serde_json::json!(1),
            priority: Some(2.0),
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = delete_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let req = SetRequest {
            key: "".to_string(),
            value: serde_json::Value::Null,
            priority: None,
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(PoolError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_icon_handler_without_icon() {
        let state = test_state();

        let result = icon_handler(
            State(state),
            Path("games/snake.jar".to_string()),
            Query(IconQuery {
                src: "http://offline/snake.png".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(PoolError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats_handlers() {
        let state = test_state();

        let response = pool_stats_handler(State(state.clone())).await;
        assert_eq!(response.stats.item_count, 0);

        let response = icon_stats_handler(State(state)).await;
        assert_eq!(response.stats.max_size, 10_000);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
