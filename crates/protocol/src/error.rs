//! Protocol error types
//!
//! Errors raised when a record cannot be mapped onto its relational shape.

use thiserror::Error;

/// Errors that can occur when preparing records for insertion
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Partition key cannot be used as part of a table identifier
    #[error("invalid partition key '{key}': {reason}")]
    InvalidPartitionKey { key: String, reason: &'static str },

    /// Record wrote a different number of values than its column count
    #[error("record shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

impl ProtocolError {
    /// Create an invalid partition key error
    #[inline]
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPartitionKey {
            key: key.into(),
            reason,
        }
    }

    /// Create a shape mismatch error
    #[inline]
    pub fn shape_mismatch(expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch { expected, actual }
    }
}
