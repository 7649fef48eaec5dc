//! Tests for the writer worker

use std::sync::Arc;

use tally_protocol::{Event, InsertableRecord, PartitionKey, SqlValue};

use crate::{
    InsertTemplate, MemoryFaults, MemorySink, Sink, SinkMetrics, WriteFailure, WriterWorker,
};

fn events(key: &str, n: usize) -> Vec<Event> {
    (0..n).map(|i| Event::now(key, i as f64, 0)).collect()
}

async fn setup(insert_size: usize) -> (MemorySink, InsertTemplate) {
    let sink = MemorySink::new();
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let template = InsertTemplate::new(table, Event::COLUMNS, insert_size);
    (sink, template)
}

fn worker(transaction_size: usize) -> WriterWorker<MemorySink> {
    WriterWorker::new(0, transaction_size, Arc::new(SinkMetrics::new()))
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_empty_share_does_not_connect() {
    let (sink, template) = setup(2).await;
    let mut w = worker(2);

    let outcome = w.write(&sink, &template, &events("a", 0), |_| {}).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.statements, 0);
    assert!(!w.is_connected());
    assert_eq!(sink.connections_opened(), 0);
}

#[tokio::test]
async fn test_commits_every_transaction_size_statements() {
    let (sink, template) = setup(2).await;
    let mut w = worker(2);
    let mut committed = Vec::new();

    let outcome = w
        .write(&sink, &template, &events("a", 7), |rows| committed.push(rows))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.assigned, 7);
    assert_eq!(outcome.statements, 4);
    assert_eq!(outcome.commits, 2);
    assert_eq!(outcome.confirmed, 7);
    assert_eq!(outcome.failed_rows(), 0);
    assert_eq!(committed, vec![4, 3]);

    let commits = sink.commits_for(template.table());
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].statements, 2);
    assert_eq!(commits[1].statements, 2);
    assert_eq!(sink.row_count(template.table()), 7);
}

#[tokio::test]
async fn test_trailing_partial_unit_committed() {
    let (sink, template) = setup(2).await;
    let mut w = worker(3);

    let outcome = w.write(&sink, &template, &events("a", 8), |_| {}).await;
    assert_eq!(outcome.statements, 4);
    assert_eq!(outcome.commits, 2);

    let commits = sink.commits_for(template.table());
    assert_eq!(commits[0].statements, 3);
    assert_eq!(commits[1].statements, 1);
}

#[tokio::test]
async fn test_rows_committed_in_share_order() {
    let (sink, template) = setup(3).await;
    let mut w = worker(1);

    w.write(&sink, &template, &events("a", 5), |_| {}).await;

    let values: Vec<_> = sink
        .rows(template.table())
        .iter()
        .map(|row| row[2].as_double().unwrap())
        .collect();
    assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[tokio::test]
async fn test_connection_opened_lazily_and_reused() {
    let (sink, template) = setup(2).await;
    let metrics = Arc::new(SinkMetrics::new());
    let mut w: WriterWorker<MemorySink> = WriterWorker::new(3, 2, Arc::clone(&metrics));
    assert_eq!(w.id(), 3);
    assert!(!w.is_connected());

    w.write(&sink, &template, &events("a", 3), |_| {}).await;
    w.write(&sink, &template, &events("a", 3), |_| {}).await;

    assert!(w.is_connected());
    assert_eq!(sink.connections_opened(), 1);
    assert_eq!(metrics.snapshot().connections_opened, 1);

    w.close().await;
    assert!(!w.is_connected());
    assert_eq!(sink.open_connections(), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_execute_failure_keeps_earlier_units() {
    let (sink, template) = setup(2).await;
    sink.set_faults(MemoryFaults::none().with_execute_failure_at(3));
    let metrics = Arc::new(SinkMetrics::new());
    let mut w: WriterWorker<MemorySink> = WriterWorker::new(0, 2, Arc::clone(&metrics));
    let mut committed = 0u64;

    let outcome = w
        .write(&sink, &template, &events("a", 8), |rows| committed += rows)
        .await;

    assert!(matches!(
        outcome.error,
        Some(WriteFailure::Execute { statement: 2, .. })
    ));
    assert_eq!(outcome.confirmed, 4);
    assert_eq!(committed, 4);
    assert_eq!(outcome.failed_rows(), 4);
    assert_eq!(sink.row_count(template.table()), 4);
    assert_eq!(sink.rollbacks(), 1);
    assert!(!w.is_connected());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.commits, 1);
    assert_eq!(snapshot.rollbacks, 1);
    assert_eq!(snapshot.write_errors, 1);
    assert_eq!(snapshot.rows_written, 4);
}

#[tokio::test]
async fn test_reconnects_after_failure() {
    let (sink, template) = setup(2).await;
    sink.set_faults(MemoryFaults::none().with_execute_failure_at(1));
    let mut w = worker(2);

    let failed = w.write(&sink, &template, &events("a", 2), |_| {}).await;
    assert!(!failed.is_success());

    let ok = w.write(&sink, &template, &events("a", 2), |_| {}).await;
    assert!(ok.is_success());
    assert_eq!(sink.connections_opened(), 2);
    assert_eq!(sink.row_count(template.table()), 2);
}

#[tokio::test]
async fn test_commit_failure_loses_unit() {
    let (sink, template) = setup(2).await;
    sink.set_faults(MemoryFaults::none().with_failing_commits());
    let mut w = worker(5);

    let outcome = w.write(&sink, &template, &events("a", 4), |_| {}).await;
    assert!(matches!(outcome.error, Some(WriteFailure::Commit { .. })));
    assert_eq!(outcome.confirmed, 0);
    assert_eq!(outcome.failed_rows(), 4);
    assert_eq!(sink.total_rows(), 0);
}

#[tokio::test]
async fn test_connect_failure_fails_whole_share() {
    let (sink, template) = setup(2).await;
    sink.set_faults(MemoryFaults::none().with_failing_connect());
    let mut w = worker(2);

    let outcome = w.write(&sink, &template, &events("a", 5), |_| {}).await;
    assert!(matches!(outcome.error, Some(WriteFailure::Connect(_))));
    assert_eq!(outcome.failed_rows(), 5);
    assert_eq!(outcome.statements, 0);
}

struct WideRecord {
    key: PartitionKey,
}

impl InsertableRecord for WideRecord {
    const COLUMNS: &'static [&'static str] = &["a", "b"];

    fn partition_key(&self) -> &PartitionKey {
        &self.key
    }

    fn fill_values<'a>(&'a self, out: &mut [SqlValue<'a>]) -> usize {
        for v in out.iter_mut() {
            *v = SqlValue::Integer(1);
        }
        3
    }
}

#[tokio::test]
async fn test_shape_error_is_configuration_failure() {
    let sink = MemorySink::new();
    let table = sink.ensure_partition(&PartitionKey::new("a")).await.unwrap();
    let template = InsertTemplate::new(table, WideRecord::COLUMNS, 2);
    let records: Vec<_> = (0..3)
        .map(|_| WideRecord {
            key: PartitionKey::new("a"),
        })
        .collect();
    let mut w: WriterWorker<MemorySink> = worker(2);

    let outcome = w.write(&sink, &template, &records, |_| {}).await;
    let failure = outcome.error.as_ref().unwrap();
    assert!(failure.is_configuration());
    assert_eq!(outcome.confirmed, 0);
    assert_eq!(sink.total_rows(), 0);
}
