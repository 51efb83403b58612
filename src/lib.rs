//! Icon Pool - bounded in-memory pools for a game launcher front-end
//!
//! Provides a byte-bounded memory pool with priority, recency and age weighted
//! eviction, an icon cache built on it that keeps revocable handles leak free,
//! and a local HTTP bridge exposing both to a renderer process.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod icons;
pub mod models;

pub use api::AppState;
pub use cache::MemoryPool;
pub use config::{Config, PoolConfig};
pub use error::{PoolError, Result};
pub use icons::IconPool;
