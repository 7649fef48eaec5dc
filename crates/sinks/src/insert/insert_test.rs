//! Tests for InsertTemplate and BatchInsertBuilder

use chrono::{TimeZone, Utc};
use tally_protocol::{Event, InsertableRecord, PartitionKey, ProtocolError, SqlValue};

use super::*;

fn events(n: usize) -> Vec<Event> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            Event::new(
                "flow",
                base + chrono::Duration::seconds(i as i64),
                i as f64,
                i as i32,
            )
        })
        .collect()
}

fn template(insert_size: usize) -> InsertTemplate {
    InsertTemplate::new("\"public\".\"events_flow\"", Event::COLUMNS, insert_size)
}

/// Record that claims three columns but only writes two
struct ShortRecord {
    key: PartitionKey,
}

impl InsertableRecord for ShortRecord {
    const COLUMNS: &'static [&'static str] = &["a", "b", "c"];

    fn partition_key(&self) -> &PartitionKey {
        &self.key
    }

    fn fill_values<'a>(&'a self, out: &mut [SqlValue<'a>]) -> usize {
        out[0] = SqlValue::Text(self.key.as_str());
        out[1] = SqlValue::Integer(1);
        2
    }
}

// =============================================================================
// Template
// =============================================================================

#[test]
fn test_template_full_text() {
    let t = InsertTemplate::new("t", &["a", "b"], 3);
    assert_eq!(
        t.full_text(),
        "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4), ($5, $6)"
    );
    assert_eq!(t.max_params(), 6);
    assert_eq!(t.columns(), 2);
    assert_eq!(t.insert_size(), 3);
}

#[test]
fn test_template_smaller_shape() {
    let t = InsertTemplate::new("t", &["a", "b"], 3);
    assert_eq!(t.text_for(1), "INSERT INTO t (a, b) VALUES ($1, $2)");
    assert_eq!(
        t.text_for(2),
        "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)"
    );
}

#[test]
fn test_template_full_shape_is_borrowed() {
    let t = template(10);
    assert!(matches!(t.text_for(10), std::borrow::Cow::Borrowed(_)));
    assert!(matches!(t.text_for(4), std::borrow::Cow::Owned(_)));
}

#[test]
fn test_template_clamps_insert_size() {
    let t = InsertTemplate::new("t", &["a"], 0);
    assert_eq!(t.insert_size(), 1);
    assert_eq!(t.full_text(), "INSERT INTO t (a) VALUES ($1)");
}

#[test]
fn test_template_event_columns() {
    let t = template(1);
    assert_eq!(
        t.full_text(),
        "INSERT INTO \"public\".\"events_flow\" (parameter_name, event_time, event_value, event_status) VALUES ($1, $2, $3, $4)"
    );
}

// =============================================================================
// Builder
// =============================================================================

#[test]
fn test_builder_statement_count_and_sizes() {
    for (n, k) in [(1, 1), (10, 3), (100, 50), (101, 50), (49, 50), (250, 7)] {
        let records = events(n);
        let t = template(k);
        let mut builder = BatchInsertBuilder::new(&t, &records);

        let expected_count = n.div_ceil(k);
        assert_eq!(builder.statement_count(), expected_count);

        let mut sizes = Vec::new();
        while let Some(stmt) = builder.next_statement() {
            let stmt = stmt.unwrap();
            assert_eq!(stmt.params().len(), stmt.rows() * 4);
            sizes.push(stmt.rows());
        }

        assert_eq!(sizes.len(), expected_count, "n={n} k={k}");
        let (last, full) = sizes.split_last().unwrap();
        assert!(full.iter().all(|&s| s == k));
        assert_eq!(*last, n - k * (expected_count - 1));
    }
}

#[test]
fn test_builder_empty_share() {
    let records: Vec<Event> = Vec::new();
    let t = template(5);
    let mut builder = BatchInsertBuilder::new(&t, &records);
    assert_eq!(builder.statement_count(), 0);
    assert!(builder.next_statement().is_none());
}

#[test]
fn test_builder_is_not_restartable() {
    let records = events(3);
    let t = template(2);
    let mut builder = BatchInsertBuilder::new(&t, &records);

    while builder.next_statement().is_some() {}
    assert_eq!(builder.remaining(), 0);
    assert!(builder.next_statement().is_none());
    assert!(builder.next_statement().is_none());
}

#[test]
fn test_builder_parameters_follow_record_order() {
    let records = events(5);
    let t = template(2);
    let mut builder = BatchInsertBuilder::new(&t, &records);

    let mut values = Vec::new();
    while let Some(stmt) = builder.next_statement() {
        let stmt = stmt.unwrap();
        for row in stmt.params().chunks(4) {
            values.push(row[2]);
        }
    }

    assert_eq!(
        values,
        (0..5).map(|i| SqlValue::Double(i as f64)).collect::<Vec<_>>()
    );
}

#[test]
fn test_builder_last_statement_uses_smaller_shape() {
    let records = events(5);
    let t = template(2);
    let mut builder = BatchInsertBuilder::new(&t, &records);

    let first = builder.next_statement().unwrap().unwrap().text().to_string();
    assert_eq!(first, t.full_text());
    builder.next_statement();
    let last = builder.next_statement().unwrap().unwrap();
    assert_eq!(last.rows(), 1);
    assert_eq!(last.text(), t.text_for(1));
    assert_eq!(last.table(), "\"public\".\"events_flow\"");
}

#[test]
fn test_builder_shape_mismatch_ends_sequence() {
    let records = vec![
        ShortRecord {
            key: PartitionKey::new("x"),
        },
        ShortRecord {
            key: PartitionKey::new("x"),
        },
    ];
    let t = InsertTemplate::new("t", ShortRecord::COLUMNS, 10);
    let mut builder = BatchInsertBuilder::new(&t, &records);

    let err = builder.next_statement().unwrap().unwrap_err();
    assert_eq!(err, ProtocolError::shape_mismatch(3, 2));
    assert!(builder.next_statement().is_none());
}
