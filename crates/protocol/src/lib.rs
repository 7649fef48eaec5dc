//! Tally Protocol - Record model for the flush pipeline
//!
//! This crate provides the foundational types that flow through the pipeline:
//! - `Event` - One time-stamped measurement record
//! - `PartitionKey` - Routing key that selects the destination table
//! - `SqlValue` - Borrowed bind parameter for batch INSERT statements
//! - `InsertableRecord` - How a record lays its columns into a parameter array
//!
//! # Design Principles
//!
//! - **Immutable records**: Events are built once and only read afterwards
//! - **Cheap keys**: `PartitionKey` is an `Arc<str>`, cloning never allocates
//! - **Borrowed parameters**: `SqlValue` borrows text from the record, so
//!   filling a parameter array copies no strings

mod error;
mod event;
mod partition;
mod record;

pub use error::ProtocolError;
pub use event::Event;
pub use partition::{MAX_PARTITION_KEY_LENGTH, PartitionKey};
pub use record::{InsertableRecord, SqlValue};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod partition_test;
