//! Pool Entry Module
//!
//! Defines the structure for individual pool entries with eviction bookkeeping.

use crate::cache::MAX_PRIORITY;

/// Priority added to an entry on every successful read.
pub const PRIORITY_BOOST: f64 = 0.1;

// == Pool Entry ==
/// Represents a single pool entry with its payload and eviction metadata.
#[derive(Debug, Clone)]
pub struct PoolEntry<V> {
    /// The stored payload
    pub data: V,
    /// Estimated size in bytes, fixed at insertion
    pub size: usize,
    /// Logical access counter value of the last touch
    pub last_access: u64,
    /// Eviction weight, higher survives longer
    pub priority: f64,
    /// Insertion time (Unix milliseconds), never refreshed on access
    pub timestamp: i64,
}

impl<V> PoolEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the given access tick and insertion time.
    pub fn new(data: V, size: usize, priority: f64, access_tick: u64, now_ms: i64) -> Self {
        Self {
            data,
            size,
            last_access: access_tick,
            priority,
            timestamp: now_ms,
        }
    }

    // == Touch ==
    /// Records a read: refreshes recency and boosts priority up to the cap.
    pub fn touch(&mut self, access_tick: u64) {
        self.last_access = access_tick;
        self.priority = (self.priority + PRIORITY_BOOST).min(MAX_PRIORITY);
    }

    // == Age ==
    /// Minutes elapsed since insertion. Clock skew never yields a negative age.
    pub fn age_minutes(&self, now_ms: i64) -> f64 {
        (now_ms - self.timestamp).max(0) as f64 / 60_000.0
    }
}
