//! Tests for engine configuration and lifecycle

use std::sync::Arc;
use std::time::Duration;

use tally_protocol::Event;
use tally_sinks::MemorySink;

use crate::{EngineConfig, FlushEngine, MAX_BIND_PARAMS, PipelineError};

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.workers, 3);
    assert_eq!(config.insert_size, 200);
    assert_eq!(config.transaction_size, 10);
    assert_eq!(config.idle_interval, Duration::from_millis(50));
    assert!(config.shutdown_grace.is_none());
    assert!(config.validate(4).is_ok());
}

#[test]
fn test_config_builder() {
    let config = EngineConfig::default()
        .with_workers(8)
        .with_insert_size(100)
        .with_transaction_size(5)
        .with_idle_interval(Duration::from_millis(10))
        .with_report_capacity(4)
        .with_shutdown_grace(Duration::from_secs(2));

    assert_eq!(config.workers, 8);
    assert_eq!(config.insert_size, 100);
    assert_eq!(config.transaction_size, 5);
    assert_eq!(config.report_capacity, 4);
    assert_eq!(config.shutdown_grace, Some(Duration::from_secs(2)));
}

#[test]
fn test_config_rejects_zero_values() {
    for config in [
        EngineConfig::default().with_workers(0),
        EngineConfig::default().with_insert_size(0),
        EngineConfig::default().with_transaction_size(0),
        EngineConfig::default().with_report_capacity(0),
        EngineConfig::default().with_idle_interval(Duration::ZERO),
    ] {
        assert!(matches!(
            config.validate(4),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}

#[test]
fn test_config_rejects_too_many_bind_params() {
    let limit = MAX_BIND_PARAMS / 4;
    assert!(EngineConfig::default().with_insert_size(limit).validate(4).is_ok());

    let err = EngineConfig::default()
        .with_insert_size(limit + 1)
        .validate(4)
        .unwrap_err();
    assert!(err.to_string().contains("bind parameters"));
}

#[test]
fn test_engine_new_validates() {
    let sink = Arc::new(MemorySink::new());
    let result = FlushEngine::new::<Event>(sink, EngineConfig::default().with_workers(0));
    assert!(result.is_err());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_start_and_stop_idle_engine() {
    let sink = Arc::new(MemorySink::new());
    let engine = FlushEngine::new::<Event>(sink, EngineConfig::default()).unwrap();
    let (handle, _reports) = engine.start::<Event>();

    assert!(handle.is_running());
    assert_eq!(handle.queue_length(), 0);

    let summary = handle.stop().await;
    assert!(summary.completed);
    assert_eq!(summary.cycles, 0);
    assert_eq!(summary.queue_length, 0);
}

#[tokio::test]
async fn test_submit_after_stop_requested_fails() {
    let sink = Arc::new(MemorySink::new());
    let engine = FlushEngine::new::<Event>(sink, EngineConfig::default()).unwrap();
    let (handle, _reports) = engine.start::<Event>();
    let probe = handle.probe();

    handle.shutdown_token().cancel();
    assert!(matches!(
        handle.submit(vec![Event::now("a", 1.0, 0)]),
        Err(PipelineError::ShuttingDown)
    ));

    let summary = handle.stop().await;
    assert!(summary.completed);
    assert_eq!(crate::QueueDepth::queue_length(&probe), 0);
}

#[tokio::test]
async fn test_stop_flushes_buffered_rows() {
    let sink = Arc::new(MemorySink::new());
    let config = EngineConfig::default().with_idle_interval(Duration::from_secs(3600));
    let engine = FlushEngine::new::<Event>(Arc::clone(&sink), config).unwrap();
    let (handle, mut reports) = engine.start::<Event>();

    // Let the coordinator reach its idle sleep
    tokio::task::yield_now().await;
    handle
        .submit((0..10).map(|i| Event::now("a", i as f64, 0)))
        .unwrap();

    let summary = handle.stop().await;
    assert!(summary.completed);
    assert_eq!(summary.rows_confirmed, 10);
    assert_eq!(summary.left_buffered, 0);
    assert_eq!(summary.queue_length, 0);
    assert_eq!(sink.row_count("events_a"), 10);
    assert_eq!(sink.open_connections(), 0);

    let report = reports.recv().await.unwrap();
    assert_eq!(report.confirmed, 10);
}
