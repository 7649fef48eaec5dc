//! Configuration validation
//!
//! Validates config consistency:
//! - Writer sizes are at least 1 and fit PostgreSQL's bind parameter limit
//! - Required fields are present for the selected sink
//! - Table naming parts are plain identifiers
//! - Monitor interval is non-zero

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::sink::SinkType;

/// PostgreSQL's limit on bind parameters per statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Columns written per event row
pub const EVENT_COLUMNS: usize = 4;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_writer(config)?;
    validate_sink(config)?;
    validate_monitor(config)?;
    Ok(())
}

fn at_least_one(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::invalid_value("writer", field, "must be at least 1"));
    }
    Ok(())
}

/// Validate writer sizing
fn validate_writer(config: &Config) -> Result<()> {
    let writer = &config.writer;
    at_least_one("workers", writer.workers)?;
    at_least_one("insert_size", writer.insert_size)?;
    at_least_one("transaction_size", writer.transaction_size)?;
    at_least_one("report_capacity", writer.report_capacity)?;

    if writer.idle_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "writer",
            "idle_interval",
            "must be greater than zero",
        ));
    }

    if writer.insert_size.saturating_mul(EVENT_COLUMNS) > MAX_BIND_PARAMS {
        return Err(ConfigError::invalid_value(
            "writer",
            "insert_size",
            format!(
                "{} rows x {} columns exceeds {} bind parameters",
                writer.insert_size, EVENT_COLUMNS, MAX_BIND_PARAMS
            ),
        ));
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Validate the sink section
fn validate_sink(config: &Config) -> Result<()> {
    let sink = &config.sink;

    if sink.sink_type == SinkType::Postgres {
        match sink.url.as_deref() {
            None => return Err(ConfigError::missing_field("sink", "url")),
            Some(url) if url.trim().is_empty() => {
                return Err(ConfigError::invalid_value("sink", "url", "must not be empty"));
            }
            Some(_) => {}
        }
    }

    if sink.schema.is_empty() || !is_identifier(&sink.schema) {
        return Err(ConfigError::invalid_value(
            "sink",
            "schema",
            "must be letters, digits and underscores",
        ));
    }

    if !is_identifier(&sink.table_prefix) {
        return Err(ConfigError::invalid_value(
            "sink",
            "table_prefix",
            "must be letters, digits and underscores",
        ));
    }

    Ok(())
}

/// Validate the monitor section
fn validate_monitor(config: &Config) -> Result<()> {
    if config.monitor.enabled && config.monitor.interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "monitor",
            "interval",
            "must be greater than zero",
        ));
    }
    Ok(())
}
