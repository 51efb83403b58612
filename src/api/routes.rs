//! API Routes
//!
//! Configures the Axum router with all host bridge endpoints.

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::handlers::{
    blob_handler, clear_icons_handler, delete_handler, get_handler, health_handler,
    icon_handler, icon_stats_handler, pool_stats_handler, preload_handler, set_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /pool/set` - Store a JSON value in the generic pool
/// - `GET /pool/get/:key` - Retrieve a generic value by key
/// - `DELETE /pool/del/:key` - Delete a generic value
/// - `GET /pool/stats` - Generic pool statistics
/// - `GET /icons/:key?src=URL` - Read-through icon lookup (keys containing `/`
///   are percent-encoded)
/// - `POST /icons/preload` - Preload icons for a visible window
/// - `DELETE /icons` - Release and drop every cached icon
/// - `GET /icons/stats` - Icon pool statistics
/// - `GET /blob/:id` - Bytes behind a live icon handle
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Only the origins in [`AppState::allowed_origins`]; none by default
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_origins(&state.allowed_origins)))
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/pool/set", put(set_handler))
        .route("/pool/get/:key", get(get_handler))
        .route("/pool/del/:key", delete(delete_handler))
        .route("/pool/stats", get(pool_stats_handler))
        .route("/icons", delete(clear_icons_handler))
        .route("/icons/:key", get(icon_handler))
        .route("/icons/preload", post(preload_handler))
        .route("/icons/stats", get(icon_stats_handler))
        .route("/blob/:id", get(blob_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}
