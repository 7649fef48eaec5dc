//! Writer configuration
//!
//! Sizing of the flush engine: workers, statement size, commit size.

use serde::Deserialize;
use std::time::Duration;

/// Writer configuration
///
/// # Example
///
/// ```toml
/// [writer]
/// workers = 3
/// insert_size = 200
/// transaction_size = 10
/// idle_interval = "50ms"
/// report_capacity = 64
/// shutdown_grace = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Concurrent writers per partition
    /// Default: 3
    pub workers: usize,

    /// Maximum rows per INSERT statement
    /// Default: 200
    pub insert_size: usize,

    /// Statements per commit
    /// Default: 10
    pub transaction_size: usize,

    /// Sleep between checks of an empty buffer
    /// Default: 50ms
    #[serde(with = "humantime_serde")]
    pub idle_interval: Duration,

    /// Cycle reports held before new ones are dropped
    /// Default: 64
    pub report_capacity: usize,

    /// How long shutdown waits for the flush loop (unset waits forever)
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Option<Duration>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            insert_size: 200,
            transaction_size: 10,
            idle_interval: Duration::from_millis(50),
            report_capacity: 64,
            shutdown_grace: None,
        }
    }
}
