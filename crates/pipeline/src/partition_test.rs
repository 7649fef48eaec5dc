//! Tests for partition grouping and the partition router

use std::sync::Arc;

use tally_protocol::{Event, PartitionKey};
use tally_sinks::{MemoryFaults, MemorySink, SinkError, SinkMetrics};

use crate::{PartitionRouter, group_by_partition};

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn test_group_preserves_first_appearance_and_order() {
    let records = vec![
        Event::now("b", 1.0, 0),
        Event::now("a", 2.0, 0),
        Event::now("b", 3.0, 0),
        Event::now("c", 4.0, 0),
        Event::now("a", 5.0, 0),
    ];

    let groups = group_by_partition(records);
    let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["b", "a", "c"]);

    let values = |i: usize| groups[i].records.iter().map(|e| e.value()).collect::<Vec<_>>();
    assert_eq!(values(0), vec![1.0, 3.0]);
    assert_eq!(values(1), vec![2.0, 5.0]);
    assert_eq!(values(2), vec![4.0]);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_group_empty() {
    assert!(group_by_partition(Vec::<Event>::new()).is_empty());
}

// ============================================================================
// Router
// ============================================================================

fn router(sink: &Arc<MemorySink>) -> PartitionRouter<MemorySink> {
    PartitionRouter::new(Arc::clone(sink), Arc::new(SinkMetrics::new()))
}

#[tokio::test]
async fn test_ensure_once_per_key() {
    let sink = Arc::new(MemorySink::new());
    let router = router(&sink);
    let a = PartitionKey::new("a");

    assert!(!router.is_known(&a));
    assert_eq!(router.ensure(&a).await.unwrap(), "events_a");
    assert_eq!(router.ensure(&a).await.unwrap(), "events_a");
    router.ensure(&PartitionKey::new("b")).await.unwrap();

    assert!(router.is_known(&a));
    assert_eq!(router.known_count(), 2);
    assert_eq!(sink.ensure_calls(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_concurrent_ensure_shares_one_call() {
    let sink = Arc::new(MemorySink::new());
    let router = Arc::new(router(&sink));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.ensure(&PartitionKey::new("a")).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(sink.ensure_calls().len(), 1);
}

#[tokio::test]
async fn test_failed_ensure_is_retried() {
    let sink = Arc::new(MemorySink::new().with_faults(MemoryFaults::none().with_failing_partition("a")));
    let router = router(&sink);
    let a = PartitionKey::new("a");

    assert!(matches!(router.ensure(&a).await, Err(SinkError::Partition { .. })));
    assert!(!router.is_known(&a));

    sink.set_faults(MemoryFaults::none());
    assert!(router.ensure(&a).await.is_ok());
    assert_eq!(sink.ensure_calls().len(), 2);
}

#[tokio::test]
async fn test_invalid_key_is_rejected() {
    let sink = Arc::new(MemorySink::new());
    let router = router(&sink);

    let err = router.ensure(&PartitionKey::new("no spaces")).await.unwrap_err();
    assert!(matches!(err, SinkError::InvalidPartition(_)));
    assert_eq!(router.known_count(), 0);
}
