//! Sink configuration

use serde::Deserialize;
use std::time::Duration;

/// Sink type
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkType {
    /// PostgreSQL, one table per partition
    Postgres,
    /// In-process tables, nothing leaves the process (default)
    #[default]
    Memory,
}

impl SinkType {
    /// Name as written in config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// Sink configuration
///
/// # Example
///
/// ```toml
/// [sink]
/// type = "postgres"
/// url = "postgres://postgres@localhost:5432/monitoring"
/// schema = "public"
/// table_prefix = "events_"
/// connect_timeout = "10s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Sink type (postgres, memory)
    /// Default: memory
    #[serde(rename = "type")]
    pub sink_type: SinkType,

    /// Connection URL (required for postgres)
    pub url: Option<String>,

    /// Username, overriding the URL's
    pub username: Option<String>,

    /// Password, overriding the URL's
    pub password: Option<String>,

    /// Schema for partition tables
    /// Default: public
    pub schema: String,

    /// Prefix of every partition table name
    /// Default: events_
    pub table_prefix: String,

    /// Connect timeout
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sink_type: SinkType::Memory,
            url: None,
            username: None,
            password: None,
            schema: "public".into(),
            table_prefix: "events_".into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
