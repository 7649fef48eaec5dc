//! Flush counters
//!
//! Process-wide accounting used for advisory backpressure.

use std::sync::atomic::{AtomicU64, Ordering};

/// Remainder and error counters
///
/// `remainder` is set to the cycle size when a cycle starts and drops as
/// workers commit; it should be zero once the cycle's failures are
/// accounted for. `errors` counts failed rows and never decreases.
#[derive(Debug, Default)]
pub struct Counters {
    remainder: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            remainder: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Start a cycle of `rows` rows
    #[inline]
    pub fn begin_cycle(&self, rows: u64) {
        self.remainder.store(rows, Ordering::Relaxed);
    }

    /// Record rows confirmed by a commit
    #[inline]
    pub fn confirm(&self, rows: u64) {
        // Saturating; an over-count shows up as a remainder/error mismatch
        let _ = self
            .remainder
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |r| {
                Some(r.saturating_sub(rows))
            });
    }

    /// Record failed rows
    #[inline]
    pub fn add_errors(&self, rows: u64) {
        self.errors.fetch_add(rows, Ordering::Relaxed);
    }

    /// Rows of the current cycle not yet confirmed
    #[inline]
    pub fn remainder(&self) -> u64 {
        self.remainder.load(Ordering::Relaxed)
    }

    /// Failed rows since start
    #[inline]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// `buffered + remainder - errors`, floored at zero
    ///
    /// Advisory only: the three values are read independently.
    #[inline]
    pub fn queue_length(&self, buffered: u64) -> u64 {
        buffered
            .saturating_add(self.remainder())
            .saturating_sub(self.errors())
    }
}
