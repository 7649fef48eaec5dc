//! Logging configuration
//!
//! The `[log]` section picks the tracing filter and how the binary's
//! subscriber renders events. The engine logs one `info` line per queue
//! monitor sample, `debug` lines per cycle and partition, and `warn` or
//! `error` lines for rows that were not written.

use serde::Deserialize;

/// Most verbose level that is still emitted
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every share dispatched to and written by a worker
    Trace,
    /// Cycle and partition summaries
    Debug,
    #[default]
    Info,
    /// Failed writes, unwritten rows, dropped cycle reports
    Warn,
    /// Accounting anomalies and failed tasks only
    Error,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Rendering of log lines
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text with targets, for terminals
    #[default]
    Console,
    /// One JSON object per line; structured fields such as `cycle`,
    /// `partition` and `rows` become keys
    Json,
}

/// Stream log lines are written to
///
/// `tally run` prints its throughput summary on stdout; sending logs to
/// stderr keeps that summary separable.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

/// `[log]` section
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// output = "stderr"
/// ```
///
/// The CLI's `--log-level` flag overrides `level`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default: info
    pub level: LogLevel,

    /// Default: console
    pub format: LogFormat,

    /// Default: stdout
    pub output: LogOutput,
}
