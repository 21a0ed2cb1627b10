//! Progress reporting for snapshot downloads.
//!
//! Byte counts are accumulated with an atomic counter so the futures of one
//! batch can all report through a shared tracker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Progress callback receiving a percentage in `[0, 100]` with two decimals.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Percentage of `bytes` over `total`, rounded to two decimals.
///
/// An empty snapshot is complete by definition.
pub fn percent(bytes: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let raw = bytes as f64 / total as f64 * 100.0;
    ((raw * 100.0).round() / 100.0).min(100.0)
}

/// Accumulates downloaded bytes and forwards percentages to a callback.
pub struct ProgressTracker {
    bytes: AtomicU64,
    total: u64,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    /// Start tracking from `initial` bytes out of `total`.
    pub fn new(initial: u64, total: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            bytes: AtomicU64::new(initial),
            total,
            callback,
        }
    }

    /// Record a finished file and report the new percentage.
    pub fn add(&self, bytes: u64) {
        let now = self.bytes.fetch_add(bytes, Ordering::SeqCst) + bytes;
        if let Some(cb) = &self.callback {
            cb(percent(now, self.total));
        }
    }

    /// Report the current percentage without changing it.
    pub fn report(&self) {
        if let Some(cb) = &self.callback {
            cb(percent(self.bytes(), self.total));
        }
    }

    /// Bytes accounted for so far.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}
