//! Partition key type
//!
//! `PartitionKey` selects which destination table a record is routed into.

use std::fmt;
use std::sync::Arc;

use crate::error::ProtocolError;

/// Longest key accepted as a table suffix.
///
/// PostgreSQL truncates identifiers at 63 bytes; this leaves room for a
/// table prefix.
pub const MAX_PARTITION_KEY_LENGTH: usize = 48;

/// Partition key for routing decisions
///
/// Every event carries one. Events sharing a key are written into the same
/// destination, in submission order.
///
/// # Example
///
/// ```
/// use tally_protocol::PartitionKey;
///
/// let key = PartitionKey::new("Boiler_Temp");
/// assert_eq!(key.as_str(), "Boiler_Temp");
/// assert_eq!(key.table_suffix().unwrap(), "boiler_temp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(Arc<str>);

impl PartitionKey {
    /// Create a new partition key
    #[inline]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Get the key as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalized form of the key usable inside a table identifier
    ///
    /// Keys must be non-empty, at most [`MAX_PARTITION_KEY_LENGTH`] bytes,
    /// and contain only ASCII letters, digits and `_`. Letters are lowered.
    pub fn table_suffix(&self) -> Result<String, ProtocolError> {
        let key = self.as_str();

        if key.is_empty() {
            return Err(ProtocolError::invalid_key(key, "key is empty"));
        }
        if key.len() > MAX_PARTITION_KEY_LENGTH {
            return Err(ProtocolError::invalid_key(key, "key is too long"));
        }
        if !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(ProtocolError::invalid_key(
                key,
                "only ASCII letters, digits and '_' are allowed",
            ));
        }

        Ok(key.to_ascii_lowercase())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartitionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PartitionKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
