//! Rate-limited failure logging
//!
//! A destination that is down fails every share of every cycle. This keeps
//! the log to one line per interval, carrying the number of failures that
//! were folded into it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between logged failures
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs at most once per interval, counting what it suppressed
///
/// Thread-safe: counters are atomic, the last log time sits behind a mutex.
pub struct RateLimitedLogger {
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    suppressed: AtomicU64,
    total: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a logger with the given minimum interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            suppressed: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Minimum interval between logged lines
    pub fn interval(&self) -> Duration {
        self.min_interval
    }

    /// Count one failure and decide whether it should be logged
    ///
    /// Returns the number of failures suppressed since the last logged one,
    /// or `None` when this one is suppressed too.
    pub fn record(&self) -> Option<u64> {
        self.total.fetch_add(1, Ordering::Relaxed);

        let due = {
            let mut last = self.last_log_time.lock();
            let now = Instant::now();
            let due = last.is_none_or(|at| now.duration_since(at) >= self.min_interval);
            if due {
                *last = Some(now);
            }
            due
        };

        if due {
            Some(self.suppressed.swap(0, Ordering::Relaxed))
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Record a failure and emit a warning if one is due
    ///
    /// Returns true if the warning was logged.
    pub fn warn(&self, message: &str, error: &dyn std::fmt::Display) -> bool {
        let Some(suppressed) = self.record() else {
            return false;
        };
        let total = self.total.load(Ordering::Relaxed);

        if suppressed > 0 {
            tracing::warn!(
                error = %error,
                suppressed_count = suppressed,
                total_failures = total,
                "{message} (rate-limited)"
            );
        } else {
            tracing::warn!(error = %error, total_failures = total, "{message}");
        }
        true
    }

    /// Failures suppressed since the last logged one
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// Failures recorded since creation or the last reset
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.suppressed.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
        *self.last_log_time.lock() = None;
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
