//! Integration Tests for HTTP icon fetching
//!
//! Runs a real icon server on an ephemeral port and loads icons through the
//! reqwest-backed fetcher.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use icon_pool::api::create_router;
use icon_pool::icons::{
    BlobRegistry, HandleRegistry, HttpFetcher, IconFetcher, IconRequest, VisibleRange,
};
use icon_pool::{AppState, Config, IconPool, PoolConfig, PoolError};
use tower::ServiceExt;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nserved-over-http";

// == Helper Functions ==

async fn spawn_icon_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route(
            "/icon.png",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                PNG.to_vec()
            }),
        )
        .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }))
        .route("/page.png", get(|| async { "<html>not an icon</html>" }))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, hits)
}

fn http_pool(registry: Arc<BlobRegistry>) -> IconPool {
    IconPool::builder(PoolConfig::with_max_size(1024 * 1024))
        .fetcher(Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap()))
        .handles(registry)
        .build()
        .unwrap()
}

// == Fetcher Tests ==

#[tokio::test]
async fn test_http_fetcher_reads_body() {
    let (addr, _) = spawn_icon_server().await;
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();

    let bytes = fetcher
        .fetch(&format!("http://{}/icon.png", addr))
        .await
        .unwrap();

    assert_eq!(bytes, PNG);
}

#[tokio::test]
async fn test_http_fetcher_maps_status() {
    let (addr, _) = spawn_icon_server().await;
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();

    let result = fetcher.fetch(&format!("http://{}/missing.png", addr)).await;

    assert!(matches!(result, Err(PoolError::FetchStatus { status: 404, .. })));
}

#[tokio::test]
async fn test_http_fetcher_connection_refused() {
    let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();

    // Reserve a port, then free it so nothing is listening there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = fetcher.fetch(&format!("http://{}/icon.png", addr)).await;

    assert!(matches!(result, Err(PoolError::Fetch { .. })));
}

// == Icon Pool over HTTP ==

#[tokio::test]
async fn test_icon_pool_loads_over_http() {
    let (addr, hits) = spawn_icon_server().await;
    let registry = Arc::new(BlobRegistry::new());
    let pool = http_pool(registry.clone());
    let url = format!("http://{}/icon.png", addr);

    let handle = pool.get_icon("games/snake.jar", &url).await.unwrap();
    let again = pool.get_icon("games/snake.jar", &url).await.unwrap();

    assert_eq!(handle, again);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(registry.resolve(&handle.url).unwrap().bytes, PNG);
}

#[tokio::test]
async fn test_icon_pool_degrades_on_http_errors() {
    let (addr, _) = spawn_icon_server().await;
    let registry = Arc::new(BlobRegistry::new());
    let pool = http_pool(registry.clone());

    let missing = pool
        .get_icon("a", &format!("http://{}/missing.png", addr))
        .await;
    let not_an_image = pool.get_icon("b", &format!("http://{}/page.png", addr)).await;

    assert!(missing.is_none());
    assert!(not_an_image.is_none());
    assert_eq!(registry.live_count(), 0);
    assert_eq!(pool.stats().await.item_count, 0);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_download() {
    let (addr, hits) = spawn_icon_server().await;
    let registry = Arc::new(BlobRegistry::new());
    let pool = http_pool(registry);
    let url = format!("http://{}/icon.png", addr);

    let (a, b) = tokio::join!(pool.get_icon("same", &url), pool.get_icon("same", &url));

    assert_eq!(a, b);
    assert!(a.is_some());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_preload_then_clear_leaves_no_live_handles() {
    let (addr, hits) = spawn_icon_server().await;
    let registry = Arc::new(BlobRegistry::new());
    let pool = http_pool(registry.clone());
    let url = format!("http://{}/icon.png", addr);

    let items: Vec<IconRequest> = (0..12)
        .map(|i| IconRequest::new(format!("game-{}", i), Some(url.clone())))
        .collect();

    let report = pool.preload_icons(&items, VisibleRange::new(2, 10)).await;

    assert_eq!(report.loaded, 8);
    assert_eq!(hits.load(Ordering::SeqCst), 8);
    assert_eq!(registry.live_count(), 8);

    assert_eq!(pool.clear().await, 8);
    assert_eq!(registry.live_count(), 0);
}

// == Bridge Exposure ==

#[tokio::test]
async fn test_bridge_refuses_local_files_to_foreign_origins() {
    let private = std::env::temp_dir().join(format!("icon_pool_private_{}.svg", std::process::id()));
    tokio::fs::write(&private, "<svg><!-- private --></svg>").await.unwrap();

    let config = Config {
        allowed_origins: vec!["app://launcher".to_string()],
        ..Config::default()
    };
    let app = create_router(AppState::from_config(&config).unwrap());

    let request = Request::builder()
        .uri(format!("/icons/x?src={}", private.display()))
        .header("origin", "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // No icon root is configured, so the file is never read
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get("access-control-allow-origin").is_none());

    tokio::fs::remove_file(&private).await.unwrap();
}

#[tokio::test]
async fn test_bridge_serves_icons_from_icon_root() {
    let root = std::env::temp_dir().join(format!("icon_pool_root_{}", std::process::id()));
    tokio::fs::create_dir_all(&root).await.unwrap();
    tokio::fs::write(root.join("snake.png"), PNG).await.unwrap();

    let config = Config {
        icon_root: Some(root.clone()),
        ..Config::default()
    };
    let app = create_router(AppState::from_config(&config).unwrap());

    let request = Request::builder()
        .uri("/icons/snake?src=snake.png")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    tokio::fs::remove_dir_all(&root).await.unwrap();
}
