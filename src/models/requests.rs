//! Request DTOs for the host bridge API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::MAX_PRIORITY;
use crate::icons::{IconRequest, VisibleRange};

/// Maximum accepted key length for bridge requests
pub const MAX_KEY_LENGTH: usize = 1024;

/// Request body for the generic SET operation (PUT /pool/set)
///
/// # Fields
/// - `key`: The pool key to store the value under
/// - `value`: Any JSON value
/// - `priority`: Optional eviction priority (default 1.0)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The pool key
    pub key: String,
    /// The value to store
    pub value: serde_json::Value,
    /// Optional eviction priority
    #[serde(default)]
    pub priority: Option<f64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(msg) = validate_key(&self.key) {
            return Some(msg);
        }
        if let Some(priority) = self.priority {
            if !(priority.is_finite() && priority > 0.0 && priority <= MAX_PRIORITY) {
                return Some(format!("Priority must be in (0, {}]", MAX_PRIORITY));
            }
        }
        None
    }
}

/// Query string for GET /icons/:key
#[derive(Debug, Clone, Deserialize)]
pub struct IconQuery {
    /// Where to fetch the icon from on a miss
    pub src: String,
}

/// Request body for POST /icons/preload
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    /// The full item list of the view
    pub items: Vec<IconRequest>,
    /// First visible index
    #[serde(default)]
    pub start: usize,
    /// One past the last visible index, defaults to the end of `items`
    #[serde(default)]
    pub end: Option<usize>,
}

impl PreloadRequest {
    pub fn range(&self) -> VisibleRange {
        VisibleRange::new(self.start, self.end.unwrap_or(self.items.len()))
    }
}

/// Shared key validation for bridge requests
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
