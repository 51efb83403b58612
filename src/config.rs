//! Configuration Module
//!
//! Handles loading and managing pool and bridge configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PoolError, Result};

// == Pool Config ==
/// Budget and eviction thresholds for a single pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Byte budget
    pub max_size: usize,
    /// Utilization fraction at which an insert triggers cleanup
    pub cleanup_threshold: f64,
    /// Utilization fraction cleanup evicts down to
    pub target_ratio: f64,
    /// Handle releases in one pass above which leak pressure is logged
    pub release_warn_threshold: usize,
}

impl PoolConfig {
    /// Creates a config with the given budget and default thresholds.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Size above which an insert triggers cleanup.
    pub fn trigger_size(&self) -> f64 {
        self.max_size as f64 * self.cleanup_threshold
    }

    /// Size cleanup evicts down to.
    pub fn target_size(&self) -> f64 {
        self.max_size as f64 * self.target_ratio
    }

    /// Rejects budgets and ratios the eviction algorithm cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(PoolError::InvalidConfig(
                "max_size must be greater than zero".to_string(),
            ));
        }
        for (name, ratio) in [
            ("cleanup_threshold", self.cleanup_threshold),
            ("target_ratio", self.target_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(PoolError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        if self.target_ratio > self.cleanup_threshold {
            return Err(PoolError::InvalidConfig(format!(
                "target_ratio {} exceeds cleanup_threshold {}",
                self.target_ratio, self.cleanup_threshold
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 50 * 1024 * 1024,
            cleanup_threshold: 0.8,
            target_ratio: 0.6,
            release_warn_threshold: 100,
        }
    }
}

// == Bridge Config ==
/// Process configuration for the host bridge.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Generic pool budget and thresholds
    pub pool: PoolConfig,
    /// Icon pool budget and thresholds
    pub icon_pool: PoolConfig,
    /// Number of icon loads run together during a preload
    pub preload_chunk_size: usize,
    /// Request timeout for remote icon fetches, in seconds
    pub fetch_timeout: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Browser origins allowed to call the bridge cross-origin. Empty means
    /// same-origin only.
    pub allowed_origins: Vec<String>,
    /// Directory local icons may be read from. Without one only `http(s)`
    /// sources are fetched.
    pub icon_root: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `POOL_MAX_SIZE` - Generic pool budget in bytes (default: 50 MiB)
    /// - `ICON_POOL_MAX_SIZE` - Icon pool budget in bytes (default: 20 MiB)
    /// - `POOL_CLEANUP_THRESHOLD` - Cleanup trigger fraction (default: 0.8)
    /// - `POOL_TARGET_RATIO` - Cleanup target fraction (default: 0.6)
    /// - `PRELOAD_CHUNK_SIZE` - Concurrent loads per preload chunk (default: 5)
    /// - `FETCH_TIMEOUT_SECS` - Remote fetch timeout (default: 10)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `BRIDGE_ALLOWED_ORIGINS` - Comma-separated renderer origins (default: none)
    /// - `ICON_ROOT` - Directory local icon files are served from (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cleanup_threshold = env_or("POOL_CLEANUP_THRESHOLD", defaults.pool.cleanup_threshold);
        let target_ratio = env_or("POOL_TARGET_RATIO", defaults.pool.target_ratio);

        Self {
            pool: PoolConfig {
                max_size: env_or("POOL_MAX_SIZE", defaults.pool.max_size),
                cleanup_threshold,
                target_ratio,
                ..defaults.pool
            },
            icon_pool: PoolConfig {
                max_size: env_or("ICON_POOL_MAX_SIZE", defaults.icon_pool.max_size),
                cleanup_threshold,
                target_ratio,
                ..defaults.icon_pool
            },
            preload_chunk_size: env_or("PRELOAD_CHUNK_SIZE", defaults.preload_chunk_size),
            fetch_timeout: env_or("FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            allowed_origins: env::var("BRIDGE_ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(defaults.allowed_origins),
            icon_root: env::var_os("ICON_ROOT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            icon_pool: PoolConfig::with_max_size(20 * 1024 * 1024),
            preload_chunk_size: 5,
            fetch_timeout: 10,
            server_port: 3000,
            allowed_origins: Vec::new(),
            icon_root: None,
        }
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
