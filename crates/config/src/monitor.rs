//! Queue monitor configuration

use serde::Deserialize;
use std::time::Duration;

/// Queue monitor configuration
///
/// # Example
///
/// ```toml
/// [monitor]
/// enabled = true
/// interval = "100ms"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Log the writing queue length periodically
    /// Default: false
    pub enabled: bool,

    /// Sampling interval
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_millis(100),
        }
    }
}
