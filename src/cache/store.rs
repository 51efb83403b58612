//! Memory Pool Module
//!
//! Main cache engine: a byte-bounded HashMap with score-based eviction.
//!
//! Inserts that would push the pool past `cleanup_threshold` of its budget
//! first run a cleanup pass that evicts down to `target_ratio`, so a pool near
//! its limit does not evict on every single insert.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{
    rank_for_eviction, Clock, Counters, DefaultEstimator, EstimateSize, EvictionHook, PoolEntry,
    PoolStats, RetainOnEvict, SizeEstimator, SystemClock, DEFAULT_PRIORITY,
};
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};

// == Memory Pool ==
/// Byte-bounded key/value store with priority, recency and age weighted eviction.
pub struct MemoryPool<V> {
    /// Key-value storage
    entries: HashMap<String, PoolEntry<V>>,
    /// Sum of `size` over all entries
    current_size: usize,
    /// Logical clock advanced on every insert and hit
    access_counter: u64,
    /// Hit, miss and eviction counters
    counters: Counters,
    config: PoolConfig,
    estimator: Box<dyn SizeEstimator<V>>,
    hook: Box<dyn EvictionHook<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: EstimateSize + 'static> MemoryPool<V> {
    // == Constructor ==
    /// Creates an empty pool that sizes payloads with their [`EstimateSize`] impl.
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_estimator(config, Box::new(DefaultEstimator::<V>::default()))
    }
}

impl<V: 'static> MemoryPool<V> {
    /// Creates an empty pool with a custom size estimator.
    pub fn with_estimator(config: PoolConfig, estimator: Box<dyn SizeEstimator<V>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            current_size: 0,
            access_counter: 0,
            counters: Counters::default(),
            config,
            estimator,
            hook: Box::new(RetainOnEvict),
            clock: Arc::new(SystemClock),
        })
    }

    /// Installs the hook run on every entry removed by cleanup or clear.
    pub fn with_hook(mut self, hook: Box<dyn EvictionHook<V>>) -> Self {
        self.hook = hook;
        self
    }

    /// Replaces the wall-clock source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<V> MemoryPool<V> {
    // == Set ==
    /// Stores a payload under `key` with the given eviction priority.
    ///
    /// An existing entry for `key` is replaced and its payload handed back
    /// without running the eviction hook. Payloads whose estimate alone exceeds
    /// the budget are rejected and leave the pool untouched.
    pub fn set(&mut self, key: impl Into<String>, data: V, priority: f64) -> Result<Option<V>> {
        let key = key.into();

        if !priority.is_finite() {
            return Err(PoolError::InvalidRequest(format!(
                "Priority for '{}' must be finite",
                key
            )));
        }

        let size = self.estimator.estimate(&data);
        if size > self.config.max_size {
            return Err(PoolError::EntryTooLarge {
                key,
                size,
                max_size: self.config.max_size,
            });
        }

        let previous = self.remove(&key);

        if (self.current_size + size) as f64 > self.config.trigger_size() {
            self.cleanup(size);
        }

        self.access_counter += 1;
        let entry = PoolEntry::new(data, size, priority, self.access_counter, self.clock.now_ms());
        self.entries.insert(key, entry);
        self.current_size += size;

        Ok(previous)
    }

    /// Stores a payload at the default priority.
    pub fn insert(&mut self, key: impl Into<String>, data: V) -> Result<Option<V>> {
        self.set(key, data, DEFAULT_PRIORITY)
    }

    // == Get ==
    /// Retrieves a payload, recording the access for eviction scoring.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.access_counter += 1;
                entry.touch(self.access_counter);
                self.counters.record_hit();
                Some(&entry.data)
            }
            None => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Membership check without access bookkeeping.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks at an entry without recording an access.
    pub fn peek(&self, key: &str) -> Option<&PoolEntry<V>> {
        self.entries.get(key)
    }

    // == Delete ==
    /// Removes an entry. The eviction hook is not run.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    /// Removes an entry and hands its payload back to the caller.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.current_size -= entry.size;
        Some(entry.data)
    }

    // == Cleanup ==
    /// Evicts lowest-scored entries until the pool is at or below its target
    /// size and at least `required_space` bytes have been freed.
    ///
    /// Returns the number of evicted entries.
    pub fn cleanup(&mut self, required_space: usize) -> usize {
        let now = self.clock.now_ms();
        let target = self.config.target_size();
        let ranked = rank_for_eviction(self.entries.iter(), self.access_counter, now);

        let mut freed = 0usize;
        let mut evicted = 0usize;
        let mut released = 0usize;

        for key in ranked {
            if (self.current_size - freed) as f64 <= target && freed >= required_space {
                break;
            }
            if let Some(entry) = self.entries.get(&key) {
                if self.hook.on_evict(&key, &entry.data) {
                    released += 1;
                }
            }
            if let Some(entry) = self.entries.remove(&key) {
                debug!(key = %key, size = entry.size, "Evicted pool entry");
                freed += entry.size;
                evicted += 1;
            }
        }

        self.current_size -= freed;
        self.counters.record_evictions(evicted);

        if released > self.config.release_warn_threshold {
            warn!(
                released,
                threshold = self.config.release_warn_threshold,
                "Cleanup released an unusually large number of handles in one pass"
            );
        }
        if evicted > 0 {
            debug!(
                evicted,
                freed,
                remaining = self.current_size,
                "Cleanup pass complete"
            );
        }

        evicted
    }

    // == Clear ==
    /// Removes every entry, running the eviction hook on each, and resets the
    /// size and access counter. Returns the number of removed entries.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        let mut released = 0usize;

        for (key, entry) in self.entries.iter() {
            if self.hook.on_evict(key, &entry.data) {
                released += 1;
            }
        }
        self.entries.clear();
        self.current_size = 0;
        self.access_counter = 0;

        debug!(removed, released, "Pool cleared");
        removed
    }

    // == Stats ==
    /// Returns a snapshot of size accounting and activity counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.current_size,
            max_size: self.config.max_size,
            utilization: self.current_size as f64 / self.config.max_size as f64,
            item_count: self.entries.len(),
            access_count: self.access_counter,
            hits: self.counters.hits,
            misses: self.counters.misses,
            evictions: self.counters.evictions,
        }
    }

    /// Current estimated size in bytes.
    pub fn current_size(&self) -> usize {
        self.current_size
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Iterates over the live keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    // == Length ==
    /// Returns the current number of entries in the pool.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> fmt::Debug for MemoryPool<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("item_count", &self.entries.len())
            .field("current_size", &self.current_size)
            .field("access_counter", &self.access_counter)
            .field("config", &self.config)
            .finish()
    }
}
