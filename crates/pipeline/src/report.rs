//! Cycle reports
//!
//! Every completed flush cycle produces one `CycleReport`, carrying the
//! aggregate outcome and every error the cycle collected.

use std::time::Duration;

use tally_protocol::{PartitionKey, ProtocolError};
use tally_sinks::{SinkError, WriteFailure};
use thiserror::Error;

/// Broad class of a flush error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The destination failed; resubmitting later could succeed
    Transient,
    /// Key or record shape is wrong; resubmitting will fail again
    Configuration,
}

/// An error collected during a flush cycle
///
/// Every variant carries the number of rows it left unwritten.
#[derive(Debug, Error)]
pub enum FlushError {
    /// A worker stopped writing its share
    #[error("partition '{partition}' worker {worker}: {rows} rows not written: {source}")]
    Write {
        partition: PartitionKey,
        worker: usize,
        rows: u64,
        #[source]
        source: WriteFailure,
    },

    /// A record produced the wrong number of values
    #[error("partition '{partition}' worker {worker}: {rows} rows not written: {source}")]
    RecordShape {
        partition: PartitionKey,
        worker: usize,
        rows: u64,
        #[source]
        source: ProtocolError,
    },

    /// The partition's destination could not be created
    #[error("partition '{partition}' setup failed, {rows} rows not written: {source}")]
    PartitionSetup {
        partition: PartitionKey,
        rows: u64,
        #[source]
        source: SinkError,
    },

    /// The partition key cannot name a destination
    #[error("invalid partition '{partition}', {rows} rows not written: {source}")]
    InvalidPartition {
        partition: PartitionKey,
        rows: u64,
        #[source]
        source: ProtocolError,
    },

    /// A worker task panicked; `rows` excludes units it committed first
    #[error("partition '{partition}' worker {worker} panicked, {rows} rows not written")]
    WorkerPanicked {
        partition: PartitionKey,
        worker: usize,
        rows: u64,
    },
}

impl FlushError {
    /// Map a worker failure, splitting out record shape errors
    pub fn from_write(partition: PartitionKey, worker: usize, rows: u64, failure: WriteFailure) -> Self {
        match failure {
            WriteFailure::Shape(source) => Self::RecordShape {
                partition,
                worker,
                rows,
                source,
            },
            source => Self::Write {
                partition,
                worker,
                rows,
                source,
            },
        }
    }

    /// Map a partition setup failure, splitting out invalid keys
    pub fn from_setup(partition: PartitionKey, rows: u64, error: SinkError) -> Self {
        match error {
            SinkError::InvalidPartition(source) => Self::InvalidPartition {
                partition,
                rows,
                source,
            },
            source => Self::PartitionSetup {
                partition,
                rows,
                source,
            },
        }
    }

    /// Broad class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Write { source, .. } if source.is_configuration() => ErrorKind::Configuration,
            Self::PartitionSetup { source, .. } if !source.is_transient() => {
                ErrorKind::Configuration
            }
            Self::RecordShape { .. } | Self::InvalidPartition { .. } => ErrorKind::Configuration,
            Self::Write { .. } | Self::PartitionSetup { .. } | Self::WorkerPanicked { .. } => {
                ErrorKind::Transient
            }
        }
    }

    /// Rows left unwritten
    pub fn rows(&self) -> u64 {
        match self {
            Self::Write { rows, .. }
            | Self::RecordShape { rows, .. }
            | Self::PartitionSetup { rows, .. }
            | Self::InvalidPartition { rows, .. }
            | Self::WorkerPanicked { rows, .. } => *rows,
        }
    }

    /// Partition the error belongs to
    pub fn partition(&self) -> &PartitionKey {
        match self {
            Self::Write { partition, .. }
            | Self::RecordShape { partition, .. }
            | Self::PartitionSetup { partition, .. }
            | Self::InvalidPartition { partition, .. }
            | Self::WorkerPanicked { partition, .. } => partition,
        }
    }
}

/// Outcome of one flush cycle
#[derive(Debug)]
pub struct CycleReport {
    /// Cycle number, starting at 1
    pub cycle: u64,

    /// Rows swapped out of the buffer
    pub input_rows: u64,

    /// Rows confirmed written
    pub confirmed: u64,

    /// Rows not written; `confirmed + error_rows == input_rows`
    pub error_rows: u64,

    /// Errors collected, in partition then worker order
    pub errors: Vec<FlushError>,

    /// Partitions in the batch
    pub partitions: usize,

    /// Remainder counter at cycle end
    pub remainder: u64,

    /// Wall time of the cycle
    pub duration: Duration,
}

impl CycleReport {
    /// Check if every row was written
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.error_rows == 0
    }

    /// Whether the remainder disagrees with the failed row count
    pub fn has_anomaly(&self) -> bool {
        self.remainder != self.error_rows
    }

    /// Errors of the given kind
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &FlushError> {
        self.errors.iter().filter(move |e| e.kind() == kind)
    }
}
