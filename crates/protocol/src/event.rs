//! Measurement event

use chrono::{DateTime, Utc};

use crate::partition::PartitionKey;
use crate::record::{InsertableRecord, SqlValue};

/// One time-stamped measurement
///
/// Immutable once created. The sink may assign a surrogate key on write; the
/// pipeline never does.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    partition_key: PartitionKey,
    timestamp: DateTime<Utc>,
    value: f64,
    status: i32,
}

impl Event {
    /// Column layout of the events table
    pub const COLUMNS: &'static [&'static str] =
        &["parameter_name", "event_time", "event_value", "event_status"];

    /// Create a new event
    pub fn new(
        partition_key: impl Into<PartitionKey>,
        timestamp: DateTime<Utc>,
        value: f64,
        status: i32,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            timestamp,
            value,
            status,
        }
    }

    /// Create an event stamped with the current time
    pub fn now(partition_key: impl Into<PartitionKey>, value: f64, status: i32) -> Self {
        Self::new(partition_key, Utc::now(), value, status)
    }

    /// Partition (parameter) this measurement belongs to
    #[inline]
    pub fn partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    /// Measurement time
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Measured value
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Quality/status code reported with the value
    #[inline]
    pub fn status(&self) -> i32 {
        self.status
    }
}

impl InsertableRecord for Event {
    const COLUMNS: &'static [&'static str] = Event::COLUMNS;

    #[inline]
    fn partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    fn fill_values<'a>(&'a self, out: &mut [SqlValue<'a>]) -> usize {
        let values = [
            SqlValue::Text(self.partition_key.as_str()),
            SqlValue::Timestamp(self.timestamp),
            SqlValue::Double(self.value),
            SqlValue::Integer(self.status),
        ];
        let n = values.len().min(out.len());
        out[..n].copy_from_slice(&values[..n]);
        values.len()
    }
}
