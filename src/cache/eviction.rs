//! Eviction Module
//!
//! Scores entries for removal and defines the hook run on every evicted entry.
//!
//! Score = `priority / (recency + 1) / (age_minutes + 1)` where `recency` is the
//! distance between the pool's access counter and the entry's last touch.
//! Lower scores are evicted first.

use std::cmp::Ordering;

use crate::cache::PoolEntry;

// == Score ==
/// Computes the eviction score of an entry at the given counter value and time.
pub fn eviction_score<V>(entry: &PoolEntry<V>, access_counter: u64, now_ms: i64) -> f64 {
    let recency = access_counter.saturating_sub(entry.last_access) as f64;
    let age = entry.age_minutes(now_ms);
    entry.priority * (1.0 / (recency + 1.0)) * (1.0 / (age + 1.0))
}

// == Ranking ==
/// Returns keys ordered from first-to-evict to last-to-evict.
///
/// Ties are broken by key so that a pass is deterministic.
pub fn rank_for_eviction<'a, V, I>(entries: I, access_counter: u64, now_ms: i64) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a PoolEntry<V>)>,
    V: 'a,
{
    let mut scored: Vec<(f64, &String)> = entries
        .into_iter()
        .map(|(key, entry)| (eviction_score(entry, access_counter, now_ms), key))
        .collect();

    scored.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });

    scored.into_iter().map(|(_, key)| key.clone()).collect()
}

// == Eviction Hook ==
/// Runs on every entry that leaves the pool through cleanup or clear.
///
/// Explicit deletes and overwrites do not run the hook; the caller receives the
/// payload back and owns whatever it holds.
pub trait EvictionHook<V>: Send + Sync {
    /// Releases resources held by `value`. Returns `true` when a handle was
    /// actually released.
    fn on_evict(&self, key: &str, value: &V) -> bool;
}

/// Hook that releases nothing. Payloads are simply dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetainOnEvict;

impl<V> EvictionHook<V> for RetainOnEvict {
    fn on_evict(&self, _key: &str, _value: &V) -> bool {
        false
    }
}
