//! Size Estimation Module
//!
//! Assigns a byte cost to each payload at insertion time. The pool enforces
//! `Σ estimate(entry) <= max_size`, so estimates only need to be stable for a
//! given payload, not exact.

use std::marker::PhantomData;

use tracing::debug;

/// Cost charged for payloads whose size cannot be determined.
pub const FALLBACK_ENTRY_SIZE: usize = 1024;

/// Payload types that know their approximate in-memory footprint.
pub trait EstimateSize {
    fn estimated_size(&self) -> usize;
}

impl EstimateSize for String {
    /// Two bytes per UTF-16 code unit, matching how text is held by the host UI.
    fn estimated_size(&self) -> usize {
        self.encode_utf16().count() * 2
    }
}

impl EstimateSize for Vec<u8> {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl EstimateSize for serde_json::Value {
    fn estimated_size(&self) -> usize {
        match self {
            serde_json::Value::String(s) => s.encode_utf16().count() * 2,
            other => match serde_json::to_vec(other) {
                Ok(bytes) => bytes.len(),
                Err(e) => {
                    debug!(error = %e, "Falling back to fixed size estimate");
                    FALLBACK_ENTRY_SIZE
                }
            },
        }
    }
}

// == Estimator Trait ==
/// Computes the cost of a pool payload.
pub trait SizeEstimator<V>: Send + Sync {
    fn estimate(&self, value: &V) -> usize;
}

/// Defers to the payload's own [`EstimateSize`] implementation.
pub struct DefaultEstimator<V>(PhantomData<fn(&V)>);

impl<V> Default for DefaultEstimator<V> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<V: EstimateSize> SizeEstimator<V> for DefaultEstimator<V> {
    fn estimate(&self, value: &V) -> usize {
        value.estimated_size()
    }
}

/// An estimator backed by a closure.
pub struct FnEstimator<F>(pub F);

impl<V, F> SizeEstimator<V> for FnEstimator<F>
where
    F: Fn(&V) -> usize + Send + Sync,
{
    fn estimate(&self, value: &V) -> usize {
        (self.0)(value)
    }
}
