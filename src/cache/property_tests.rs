//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check size accounting, budget and hook discipline over
//! arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::cache::{EvictionHook, FnEstimator, ManualClock, MemoryPool};
use crate::config::PoolConfig;

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 2000;
const TEST_START_MS: i64 = 1_700_000_000_000;

/// Payload carrying a unique id and its byte cost.
type Tagged = (u64, usize);

// == Strategies ==
/// Small key space so that overwrites, hits and deletes of live keys are common
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum PoolOp {
    Set { key: String, size: usize, priority: f64 },
    Get { key: String },
    Delete { key: String },
    Cleanup { required: usize },
    Advance { ms: i64 },
    Clear,
}

fn pool_op_strategy() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        6 => (key_strategy(), 1usize..=TEST_MAX_SIZE, 1u8..=5)
            .prop_map(|(key, size, p)| PoolOp::Set { key, size, priority: p as f64 }),
        3 => key_strategy().prop_map(|key| PoolOp::Get { key }),
        2 => key_strategy().prop_map(|key| PoolOp::Delete { key }),
        1 => (0usize..TEST_MAX_SIZE).prop_map(|required| PoolOp::Cleanup { required }),
        1 => (0i64..600_000).prop_map(|ms| PoolOp::Advance { ms }),
        1 => Just(PoolOp::Clear),
    ]
}

#[derive(Default, Clone)]
struct TagRecorder {
    released: Arc<Mutex<Vec<u64>>>,
}

impl EvictionHook<Tagged> for TagRecorder {
    fn on_evict(&self, _key: &str, value: &Tagged) -> bool {
        self.released.lock().unwrap().push(value.0);
        true
    }
}

fn tagged_pool(clock: Arc<ManualClock>, hook: TagRecorder) -> MemoryPool<Tagged> {
    MemoryPool::with_estimator(
        PoolConfig::with_max_size(TEST_MAX_SIZE),
        Box::new(FnEstimator(|v: &Tagged| v.1)),
    )
    .unwrap()
    .with_clock(clock)
    .with_hook(Box::new(hook))
}

fn live_size(pool: &MemoryPool<Tagged>) -> usize {
    pool.keys()
        .map(|key| pool.peek(key).map(|entry| entry.size).unwrap_or(0))
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // *For any* operation sequence, the tracked size equals the sum of live
    // entry sizes and never exceeds the budget.
    #[test]
    fn prop_size_accounting_and_budget(ops in prop::collection::vec(pool_op_strategy(), 1..80)) {
        let clock = Arc::new(ManualClock::new(TEST_START_MS));
        let mut pool = tagged_pool(clock.clone(), TagRecorder::default());
        let mut next_id = 0u64;

        for op in ops {
            match op {
                PoolOp::Set { key, size, priority } => {
                    next_id += 1;
                    pool.set(key, (next_id, size), priority).unwrap();
                }
                PoolOp::Get { key } => {
                    let _ = pool.get(&key);
                }
                PoolOp::Delete { key } => {
                    pool.delete(&key);
                }
                PoolOp::Cleanup { required } => {
                    pool.cleanup(required);
                }
                PoolOp::Advance { ms } => clock.advance(ms),
                PoolOp::Clear => {
                    pool.clear();
                }
            }

            prop_assert_eq!(pool.current_size(), live_size(&pool), "Size accounting drifted");
            prop_assert!(
                pool.current_size() <= TEST_MAX_SIZE,
                "Pool size {} exceeds budget {}",
                pool.current_size(),
                TEST_MAX_SIZE
            );
            prop_assert_eq!(pool.stats().item_count, pool.len());
        }
    }

    // *For any* operation sequence followed by clear, every payload leaves the
    // pool exactly once: either through the hook (cleanup/clear) or handed back
    // to the caller (delete/overwrite), never both and never twice.
    #[test]
    fn prop_every_payload_leaves_exactly_once(ops in prop::collection::vec(pool_op_strategy(), 1..80)) {
        let clock = Arc::new(ManualClock::new(TEST_START_MS));
        let hook = TagRecorder::default();
        let released = hook.released.clone();
        let mut pool = tagged_pool(clock.clone(), hook);

        let mut inserted: Vec<u64> = Vec::new();
        let mut handed_back: Vec<u64> = Vec::new();
        let mut next_id = 0u64;

        for op in ops {
            match op {
                PoolOp::Set { key, size, priority } => {
                    next_id += 1;
                    inserted.push(next_id);
                    if let Some(previous) = pool.set(key, (next_id, size), priority).unwrap() {
                        handed_back.push(previous.0);
                    }
                }
                PoolOp::Get { key } => {
                    let _ = pool.get(&key);
                }
                PoolOp::Delete { key } => {
                    if let Some(previous) = pool.remove(&key) {
                        handed_back.push(previous.0);
                    }
                }
                PoolOp::Cleanup { required } => {
                    pool.cleanup(required);
                }
                PoolOp::Advance { ms } => clock.advance(ms),
                PoolOp::Clear => {
                    pool.clear();
                }
            }
        }
        pool.clear();

        let released = released.lock().unwrap().clone();
        let mut seen = HashSet::new();
        for id in released.iter().chain(handed_back.iter()) {
            prop_assert!(seen.insert(*id), "Payload {} left the pool twice", id);
        }
        let expected: HashSet<u64> = inserted.into_iter().collect();
        prop_assert_eq!(seen, expected, "Some payload never left the pool");
    }

    // *For any* fill sequence, the most recently inserted entry survives the
    // cleanup its own insert triggered.
    #[test]
    fn prop_new_entry_survives_its_insert(
        sizes in prop::collection::vec(1usize..=TEST_MAX_SIZE, 1..40)
    ) {
        let clock = Arc::new(ManualClock::new(TEST_START_MS));
        let mut pool = tagged_pool(clock, TagRecorder::default());

        for (i, size) in sizes.into_iter().enumerate() {
            let key = format!("k{}", i);
            pool.set(key.clone(), (i as u64, size), 1.0).unwrap();
            prop_assert!(pool.has(&key), "Fresh entry '{}' was evicted by its own insert", key);
        }
    }
}
