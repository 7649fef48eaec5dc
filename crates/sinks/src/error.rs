//! Sink errors

use tally_protocol::ProtocolError;

/// Errors from a sink or one of its connections
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Database driver error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Could not open a connection
    #[error("connection error: {0}")]
    Connection(String),

    /// Statement execution failed
    #[error("execute error: {0}")]
    Execute(String),

    /// Commit failed
    #[error("commit error: {0}")]
    Commit(String),

    /// Partition destination could not be created
    #[error("partition '{partition}' setup failed: {message}")]
    Partition { partition: String, message: String },

    /// Partition key cannot be mapped to a destination
    #[error("invalid partition: {0}")]
    InvalidPartition(#[from] ProtocolError),

    /// Connection was used after close
    #[error("connection is closed")]
    Closed,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl SinkError {
    /// Whether resubmitting the same rows later could succeed
    ///
    /// Configuration and naming problems will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidPartition(_) | Self::Config(_))
    }
}

/// Why a worker stopped writing its share
#[derive(Debug, thiserror::Error)]
pub enum WriteFailure {
    /// Could not open the worker's connection
    #[error("connect failed: {0}")]
    Connect(#[source] SinkError),

    /// Opening a unit of work failed
    #[error("begin before statement {statement} failed: {source}")]
    Begin {
        statement: usize,
        #[source]
        source: SinkError,
    },

    /// A statement failed
    #[error("statement {statement} failed: {source}")]
    Execute {
        statement: usize,
        #[source]
        source: SinkError,
    },

    /// A commit failed
    #[error("commit after statement {statement} failed: {source}")]
    Commit {
        statement: usize,
        #[source]
        source: SinkError,
    },

    /// A record produced the wrong number of values
    #[error("record shape error: {0}")]
    Shape(#[source] ProtocolError),
}

impl WriteFailure {
    /// Whether this failure comes from record or naming configuration
    /// rather than from the destination
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Shape(_) => true,
            Self::Connect(e) => !e.is_transient(),
            Self::Begin { source, .. }
            | Self::Execute { source, .. }
            | Self::Commit { source, .. } => !source.is_transient(),
        }
    }
}
