//! Tests for PartitionKey

use std::collections::HashSet;

use crate::{MAX_PARTITION_KEY_LENGTH, PartitionKey, ProtocolError};

#[test]
fn test_partition_key_as_str() {
    let key = PartitionKey::new("pressure_1");
    assert_eq!(key.as_str(), "pressure_1");
    assert_eq!(key.to_string(), "pressure_1");
}

#[test]
fn test_partition_key_clone_shares_storage() {
    let key = PartitionKey::new("flow");
    let other = key.clone();
    assert_eq!(key, other);
    assert!(std::ptr::eq(key.as_str(), other.as_str()));
}

#[test]
fn test_partition_key_from_conversions() {
    assert_eq!(PartitionKey::from("a"), PartitionKey::new("a"));
    assert_eq!(PartitionKey::from(String::from("a")), PartitionKey::new("a"));
}

#[test]
fn test_partition_key_hash_set() {
    let mut set = HashSet::new();
    set.insert(PartitionKey::new("a"));
    set.insert(PartitionKey::new("a"));
    set.insert(PartitionKey::new("b"));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_table_suffix_lowercases() {
    let key = PartitionKey::new("Boiler_Temp_02");
    assert_eq!(key.table_suffix().unwrap(), "boiler_temp_02");
}

#[test]
fn test_table_suffix_rejects_empty() {
    let err = PartitionKey::new("").table_suffix().unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidPartitionKey { .. }));
}

#[test]
fn test_table_suffix_rejects_quotes_and_spaces() {
    for bad in ["a b", "a\"b", "drop;table", "dash-key", "ключ"] {
        assert!(
            PartitionKey::new(bad).table_suffix().is_err(),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_table_suffix_length_limit() {
    let ok = "k".repeat(MAX_PARTITION_KEY_LENGTH);
    assert!(PartitionKey::new(&ok).table_suffix().is_ok());

    let too_long = "k".repeat(MAX_PARTITION_KEY_LENGTH + 1);
    assert!(PartitionKey::new(&too_long).table_suffix().is_err());
}
