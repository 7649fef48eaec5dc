//! Tally Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tally_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[writer]\nworkers = 4").unwrap();
//! assert_eq!(config.writer.workers, 4);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [writer]
//! workers = 3
//! insert_size = 200
//! transaction_size = 10
//!
//! [sink]
//! type = "postgres"
//! url = "postgres://postgres@localhost:5432/monitoring"
//! table_prefix = "parameter_events_"
//!
//! [monitor]
//! enabled = true
//! interval = "100ms"
//! ```

mod error;
mod logging;
mod monitor;
mod sink;
mod validation;
mod writer;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use monitor::MonitorConfig;
pub use sink::{SinkConfig, SinkType};
pub use validation::{EVENT_COLUMNS, MAX_BIND_PARAMS};
pub use writer::WriterConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Flush engine sizing
    pub writer: WriterConfig,

    /// Where rows are written
    pub sink: SinkConfig,

    /// Queue length monitor
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks for:
    /// - Writer sizes of at least 1 within the bind parameter limit
    /// - Required fields for the selected sink
    /// - Plain identifiers in table naming
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
