//! Pool Statistics Module
//!
//! Read-only snapshot of pool utilization plus hit, miss and eviction counters.

use serde::Serialize;

// == Pool Stats ==
/// Snapshot of a pool's size accounting and activity counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    /// Current estimated size in bytes
    pub size: usize,
    /// Byte budget
    pub max_size: usize,
    /// size / max_size
    pub utilization: f64,
    /// Number of live entries
    pub item_count: usize,
    /// Current value of the logical access counter
    pub access_count: u64,
    /// Number of successful reads
    pub hits: u64,
    /// Number of reads for absent keys
    pub misses: u64,
    /// Number of entries removed by cleanup passes
    pub evictions: u64,
}

impl PoolStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Counters ==
/// Running activity counters kept by the pool.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }
}
