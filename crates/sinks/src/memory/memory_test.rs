//! Tests for the memory sink

use std::time::Duration;

use tally_protocol::{PartitionKey, SqlValue};

use super::*;

fn stmt<'a>(table: &'a str, params: &'a [SqlValue<'a>], rows: usize) -> Statement<'a> {
    Statement::new(table, "INSERT", params, rows)
}

// ============================================================================
// Naming and partitions
// ============================================================================

#[test]
fn test_table_name_uses_prefix_and_suffix() {
    let sink = MemorySink::with_prefix("flow_");
    let name = sink.table_name(&PartitionKey::new("Pressure_1")).unwrap();
    assert_eq!(name, "flow_pressure_1");
}

#[test]
fn test_table_name_rejects_invalid_key() {
    let sink = MemorySink::new();
    let err = sink.table_name(&PartitionKey::new("bad key")).unwrap_err();
    assert!(matches!(err, SinkError::InvalidPartition(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_ensure_partition_creates_table_and_records_call() {
    let sink = MemorySink::new();
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    assert_eq!(table, "events_a");
    assert_eq!(sink.tables(), vec!["events_a".to_string()]);
    assert_eq!(sink.ensure_calls(), vec!["a".to_string()]);

    // Idempotent
    sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    assert_eq!(sink.tables().len(), 1);
    assert_eq!(sink.ensure_calls().len(), 2);
}

#[tokio::test]
async fn test_ensure_partition_fault() {
    let sink = MemorySink::new().with_faults(MemoryFaults::none().with_failing_partition("b"));
    let err = sink.ensure_partition(&PartitionKey::new("b")).await.unwrap_err();
    assert!(matches!(err, SinkError::Partition { .. }));
    assert!(sink.tables().is_empty());
}

// ============================================================================
// Units of work
// ============================================================================

#[tokio::test]
async fn test_rows_visible_only_after_commit() {
    let sink = MemorySink::new();
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let mut conn = sink.connect().await.unwrap();

    let params = [SqlValue::Text("a"), SqlValue::Double(1.0), SqlValue::Text("a"), SqlValue::Double(2.0)];
    conn.begin().await.unwrap();
    let affected = conn.execute(&stmt(&table, &params, 2)).await.unwrap();
    assert_eq!(affected, 2);
    assert_eq!(sink.row_count(&table), 0);

    conn.commit().await.unwrap();
    assert_eq!(sink.row_count(&table), 2);

    let rows = sink.rows(&table);
    assert_eq!(rows[1][1].as_double(), Some(2.0));
    assert_eq!(rows[0][0].as_text(), Some("a"));

    let commits = sink.commits_for(&table);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].statements, 1);
    assert_eq!(commits[0].rows, 2);
    assert_eq!(commits[0].connection, conn.id());
}

#[tokio::test]
async fn test_rollback_discards_pending_rows() {
    let sink = MemorySink::new();
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let mut conn = sink.connect().await.unwrap();

    let params = [SqlValue::Integer(1)];
    conn.begin().await.unwrap();
    conn.execute(&stmt(&table, &params, 1)).await.unwrap();
    conn.rollback().await.unwrap();

    assert_eq!(sink.row_count(&table), 0);
    assert_eq!(sink.rollbacks(), 1);
    assert!(sink.commits().is_empty());
}

#[tokio::test]
async fn test_execute_without_unit_autocommits() {
    let sink = MemorySink::new();
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let mut conn = sink.connect().await.unwrap();

    conn.execute(&stmt(&table, &[SqlValue::Null], 1)).await.unwrap();
    assert_eq!(sink.rows(&table), vec![vec![StoredValue::Null]]);
}

#[tokio::test]
async fn test_execute_against_missing_table_fails() {
    let sink = MemorySink::new();
    let mut conn = sink.connect().await.unwrap();
    let err = conn
        .execute(&stmt("events_nope", &[SqlValue::Null], 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::Execute(_)));
}

// ============================================================================
// Faults
// ============================================================================

#[tokio::test]
async fn test_nth_execute_fails_once() {
    let sink = MemorySink::new().with_faults(MemoryFaults::none().with_execute_failure_at(2));
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let mut conn = sink.connect().await.unwrap();
    let params = [SqlValue::Null];

    assert!(conn.execute(&stmt(&table, &params, 1)).await.is_ok());
    assert!(conn.execute(&stmt(&table, &params, 1)).await.is_err());
    assert!(conn.execute(&stmt(&table, &params, 1)).await.is_ok());
    assert_eq!(sink.row_count(&table), 2);
}

#[tokio::test]
async fn test_failing_table_and_commit_faults() {
    let sink = MemorySink::new();
    let a = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let b = sink.ensure_partition(&PartitionKey::new("b")).await.unwrap();
    sink.set_faults(MemoryFaults::none().with_failing_table(b.clone()));

    let mut conn = sink.connect().await.unwrap();
    let params = [SqlValue::Null];
    assert!(conn.execute(&stmt(&a, &params, 1)).await.is_ok());
    assert!(conn.execute(&stmt(&b, &params, 1)).await.is_err());

    sink.set_faults(MemoryFaults::none().with_failing_commits());
    conn.begin().await.unwrap();
    conn.execute(&stmt(&a, &params, 1)).await.unwrap();
    assert!(matches!(conn.commit().await, Err(SinkError::Commit(_))));
    assert_eq!(sink.row_count(&a), 1);
}

#[tokio::test]
async fn test_connect_fault() {
    let sink = MemorySink::new().with_faults(MemoryFaults::none().with_failing_connect());
    assert!(matches!(sink.connect().await, Err(SinkError::Connection(_))));
    assert_eq!(sink.connections_opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_execute_delay() {
    let sink = MemorySink::new()
        .with_faults(MemoryFaults::none().with_execute_delay(Duration::from_millis(100)));
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let mut conn = sink.connect().await.unwrap();

    let start = tokio::time::Instant::now();
    conn.execute(&stmt(&table, &[SqlValue::Null], 1)).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(100));
}

// ============================================================================
// Connections
// ============================================================================

#[tokio::test]
async fn test_close_and_drop_release_connections() {
    let sink = MemorySink::new();
    let mut first = sink.connect().await.unwrap();
    let second = sink.connect().await.unwrap();
    assert_eq!(sink.open_connections(), 2);
    assert_eq!(sink.connections_opened(), 2);

    first.close().await.unwrap();
    first.close().await.unwrap();
    assert_eq!(sink.open_connections(), 1);
    assert!(matches!(first.begin().await, Err(SinkError::Closed)));

    drop(second);
    assert_eq!(sink.open_connections(), 0);
}
