//! Sink metrics
//!
//! Atomic counters for tracking sink throughput and health.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by a sink and every worker writing through it
///
/// All counters use relaxed ordering; values are eventually consistent.
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Worker connections opened
    connections_opened: AtomicU64,

    /// Partition destinations ensured
    partitions_ensured: AtomicU64,

    /// INSERT statements executed successfully
    statements_executed: AtomicU64,

    /// Rows confirmed by a commit
    rows_written: AtomicU64,

    /// Units of work committed
    commits: AtomicU64,

    /// Units of work rolled back after a failure
    rollbacks: AtomicU64,

    /// Failed connects, statements, and commits
    write_errors: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            partitions_ensured: AtomicU64::new(0),
            statements_executed: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Record an opened connection
    #[inline]
    pub fn record_connection(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an ensured partition
    #[inline]
    pub fn record_partition(&self) {
        self.partitions_ensured.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an executed statement
    #[inline]
    pub fn record_statement(&self) {
        self.statements_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a commit confirming `rows` rows
    #[inline]
    pub fn record_commit(&self, rows: u64) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows, Ordering::Relaxed);
    }

    /// Record a rollback
    #[inline]
    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a write error
    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            partitions_ensured: self.partitions_ensured.load(Ordering::Relaxed),
            statements_executed: self.statements_executed.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub partitions_ensured: u64,
    pub statements_executed: u64,
    pub rows_written: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub write_errors: u64,
}
