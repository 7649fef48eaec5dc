//! Flush engine metrics
//!
//! Atomic counters for tracking flush cycles.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics for the flush engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Cycles run
    cycles: AtomicU64,

    /// Rows swapped out of the buffer
    rows_flushed: AtomicU64,

    /// Rows confirmed written
    rows_confirmed: AtomicU64,

    /// Rows not written
    rows_failed: AtomicU64,

    /// Cycles whose remainder disagreed with their failed rows
    anomalies: AtomicU64,

    /// Reports dropped because the report channel was full
    reports_dropped: AtomicU64,

    /// Total cycle time in microseconds
    cycle_time_us: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            rows_flushed: AtomicU64::new(0),
            rows_confirmed: AtomicU64::new(0),
            rows_failed: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
            reports_dropped: AtomicU64::new(0),
            cycle_time_us: AtomicU64::new(0),
        }
    }

    /// Record a completed cycle
    #[inline]
    pub fn record_cycle(&self, input: u64, confirmed: u64, failed: u64, duration: Duration) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.rows_flushed.fetch_add(input, Ordering::Relaxed);
        self.rows_confirmed.fetch_add(confirmed, Ordering::Relaxed);
        self.rows_failed.fetch_add(failed, Ordering::Relaxed);
        self.cycle_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a remainder anomaly
    #[inline]
    pub fn record_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped report
    #[inline]
    pub fn record_report_dropped(&self) {
        self.reports_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            rows_flushed: self.rows_flushed.load(Ordering::Relaxed),
            rows_confirmed: self.rows_confirmed.load(Ordering::Relaxed),
            rows_failed: self.rows_failed.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            reports_dropped: self.reports_dropped.load(Ordering::Relaxed),
            cycle_time_us: self.cycle_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of engine metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub cycles: u64,
    pub rows_flushed: u64,
    pub rows_confirmed: u64,
    pub rows_failed: u64,
    pub anomalies: u64,
    pub reports_dropped: u64,
    pub cycle_time_us: u64,
}

impl EngineSnapshot {
    /// Average cycle time, zero before the first cycle
    pub fn avg_cycle_time(&self) -> Duration {
        if self.cycles == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(self.cycle_time_us / self.cycles)
        }
    }
}
