//! Error types for the memory pool and icon cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Pool Error Enum ==
/// Unified error type for the pool, the icon loader and the host bridge.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Key not found in the pool
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A single entry is larger than the whole pool budget
    #[error("Entry '{key}' is {size} bytes, pool budget is {max_size} bytes")]
    EntryTooLarge {
        key: String,
        size: usize,
        max_size: usize,
    },

    /// Pool configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport level failure while fetching icon bytes
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The icon source answered with a non-success status
    #[error("Fetch for {url} returned status {status}")]
    FetchStatus { url: String, status: u16 },

    /// Fetched bytes could not be turned into an icon
    #[error("Could not decode icon from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Releasing a revocable handle failed
    #[error("Could not release handle {0}")]
    HandleRelease(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for PoolError {
    fn into_response(self) -> Response {
        let status = match &self {
            PoolError::NotFound(_) => StatusCode::NOT_FOUND,
            PoolError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PoolError::EntryTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PoolError::Fetch { .. } | PoolError::FetchStatus { .. } => StatusCode::BAD_GATEWAY,
            PoolError::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PoolError::InvalidConfig(_)
            | PoolError::HandleRelease(_)
            | PoolError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the pool.
pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_too_large_message() {
        let err = PoolError::EntryTooLarge {
            key: "icons/big.png".to_string(),
            size: 2048,
            max_size: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("icons/big.png"));
        assert!(msg.contains("2048"));
    }

    #[test]
    fn test_status_mapping() {
        let response = PoolError::NotFound("k".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = PoolError::FetchStatus {
            url: "http://x".to_string(),
            status: 500,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
