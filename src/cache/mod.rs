//! Cache Module
//!
//! Provides the byte-bounded memory pool with priority, recency and age
//! weighted eviction.

mod clock;
mod entry;
mod estimate;
mod eviction;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{PoolEntry, PRIORITY_BOOST};
pub use estimate::{DefaultEstimator, EstimateSize, FnEstimator, SizeEstimator, FALLBACK_ENTRY_SIZE};
pub use eviction::{eviction_score, rank_for_eviction, EvictionHook, RetainOnEvict};
pub use stats::PoolStats;
pub(crate) use stats::Counters;
pub use store::MemoryPool;

// == Public Constants ==
/// Priority given to entries stored without an explicit priority
pub const DEFAULT_PRIORITY: f64 = 1.0;

/// Ceiling for priority boosts from repeated reads
pub const MAX_PRIORITY: f64 = 5.0;
