//! Sink contract
//!
//! The only operations the flush pipeline requires from a destination.

use async_trait::async_trait;
use tally_protocol::{PartitionKey, SqlValue};

use crate::error::SinkError;

/// One bounded multi-row INSERT, ready to execute
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    table: &'a str,
    text: &'a str,
    params: &'a [SqlValue<'a>],
    rows: usize,
}

impl<'a> Statement<'a> {
    /// Create a statement
    #[inline]
    pub fn new(table: &'a str, text: &'a str, params: &'a [SqlValue<'a>], rows: usize) -> Self {
        Self {
            table,
            text,
            params,
            rows,
        }
    }

    /// Destination table (as used in the statement text)
    #[inline]
    pub fn table(&self) -> &'a str {
        self.table
    }

    /// SQL text with numbered placeholders
    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Bind parameters, `rows * columns` of them, row-major
    #[inline]
    pub fn params(&self) -> &'a [SqlValue<'a>] {
        self.params
    }

    /// Number of rows this statement inserts
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// A relational destination
///
/// Implemented by the PostgreSQL and in-memory sinks.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Connection type handed to each worker
    type Connection: SinkConnection;

    /// Sink name for logging
    fn name(&self) -> &'static str;

    /// Destination table for a partition key, as it appears in SQL
    fn table_name(&self, key: &PartitionKey) -> Result<String, SinkError>;

    /// Open a new exclusive connection
    async fn connect(&self) -> Result<Self::Connection, SinkError>;

    /// Create the partition's destination if it does not exist
    ///
    /// Must be idempotent. Returns the destination table name.
    async fn ensure_partition(&self, key: &PartitionKey) -> Result<String, SinkError>;
}

/// An exclusive handle to the destination, owned by one worker
#[async_trait]
pub trait SinkConnection: Send + 'static {
    /// Start a unit of work
    async fn begin(&mut self) -> Result<(), SinkError>;

    /// Execute one statement, returning the affected row count
    async fn execute(&mut self, statement: &Statement<'_>) -> Result<u64, SinkError>;

    /// Commit the open unit of work
    async fn commit(&mut self) -> Result<(), SinkError>;

    /// Discard the open unit of work
    async fn rollback(&mut self) -> Result<(), SinkError>;

    /// Release the connection; later calls fail with `SinkError::Closed`
    async fn close(&mut self) -> Result<(), SinkError>;
}
