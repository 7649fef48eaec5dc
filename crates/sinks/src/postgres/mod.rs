//! PostgreSQL Sink
//!
//! Writes each partition to its own table, created on first use.
//!
//! # Features
//!
//! - **Partition tables**: `"{schema}"."{prefix}{partition}"`, created with
//!   `CREATE TABLE IF NOT EXISTS`
//! - **Exclusive worker connections**: each writer opens its own
//!   `PgConnection`; partition setup uses a separate one-connection pool
//! - **Prepared statement reuse**: the connection's statement cache keeps one
//!   prepared INSERT per statement shape
//!
//! # Table Layout
//!
//! | Column | Type |
//! |--------|------|
//! | event_id | BIGSERIAL PRIMARY KEY |
//! | parameter_name | TEXT |
//! | event_time | TIMESTAMPTZ |
//! | event_value | DOUBLE PRECISION |
//! | event_status | INTEGER |

mod config;
mod sink;

pub use config::{
    DEFAULT_COLUMN_DDL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SCHEMA, DEFAULT_TABLE_PREFIX,
    PostgresConfig, is_identifier,
};
pub use sink::{PostgresConnection, PostgresSink};
