//! Insert parameter model
//!
//! Records are written with multi-row INSERT statements whose parameters live
//! in one flat array (`rows * columns`). `InsertableRecord` describes how one
//! record fills its row of that array.

use chrono::{DateTime, Utc};

use crate::partition::PartitionKey;

/// A single bind parameter
///
/// Text borrows from the record that produced it. `Null` is the default so
/// parameter arrays can be allocated up front and overwritten in place.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SqlValue<'a> {
    /// SQL NULL
    #[default]
    Null,
    /// Text column
    Text(&'a str),
    /// Timestamp with time zone
    Timestamp(DateTime<Utc>),
    /// Double precision float
    Double(f64),
    /// 32-bit integer
    Integer(i32),
    /// 64-bit integer
    BigInt(i64),
}

impl SqlValue<'_> {
    /// Check if this value is NULL
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A record that can be written by a batch INSERT
///
/// Implementations must write exactly `COLUMNS.len()` values, in column order.
pub trait InsertableRecord: Send + Sync {
    /// Column names, in the order `fill_values` writes them
    const COLUMNS: &'static [&'static str];

    /// Key that selects the destination partition
    fn partition_key(&self) -> &PartitionKey;

    /// Write this record's values into `out`, which is the record's row slice
    ///
    /// Returns the number of values the record produces. A return value that
    /// differs from `COLUMNS.len()` is a shape error; callers must not send
    /// the row.
    fn fill_values<'a>(&'a self, out: &mut [SqlValue<'a>]) -> usize;
}
