//! Flush engine lifecycle
//!
//! `FlushEngine` wires the buffer, counters, router and writer pool to a
//! sink and starts the coordinator; the returned `FlushHandle` is the
//! caller's side: submit records, read the queue length, stop.

use std::sync::Arc;
use std::time::Duration;

use tally_protocol::InsertableRecord;
use tally_sinks::{MetricsSnapshot, Sink, SinkMetrics};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::buffer::AccumulationBuffer;
use crate::coordinator::FlushCoordinator;
use crate::counters::Counters;
use crate::dispatch::WriterPool;
use crate::error::{PipelineError, Result};
use crate::metrics::{EngineMetrics, EngineSnapshot};
use crate::partition::PartitionRouter;
use crate::report::CycleReport;

// =============================================================================
// Constants
// =============================================================================

/// Default number of writer workers
pub const DEFAULT_WORKERS: usize = 3;

/// Default rows per INSERT statement
pub const DEFAULT_INSERT_SIZE: usize = 200;

/// Default statements per unit of work
pub const DEFAULT_TRANSACTION_SIZE: usize = 10;

/// Default sleep when the buffer is empty
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(50);

/// Default report channel capacity
pub const DEFAULT_REPORT_CAPACITY: usize = 64;

/// PostgreSQL's limit on bind parameters per statement
pub const MAX_BIND_PARAMS: usize = 65_535;

// =============================================================================
// Configuration
// =============================================================================

/// Flush engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Writer workers per partition
    pub workers: usize,

    /// Maximum rows per INSERT statement
    pub insert_size: usize,

    /// Statements per unit of work
    pub transaction_size: usize,

    /// Sleep between checks of an empty buffer
    pub idle_interval: Duration,

    /// Capacity of the cycle report channel
    pub report_capacity: usize,

    /// How long `stop` waits for the coordinator; `None` waits forever
    pub shutdown_grace: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            insert_size: DEFAULT_INSERT_SIZE,
            transaction_size: DEFAULT_TRANSACTION_SIZE,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            report_capacity: DEFAULT_REPORT_CAPACITY,
            shutdown_grace: None,
        }
    }
}

impl EngineConfig {
    /// Set the number of workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the rows per statement
    pub fn with_insert_size(mut self, size: usize) -> Self {
        self.insert_size = size;
        self
    }

    /// Set the statements per unit of work
    pub fn with_transaction_size(mut self, size: usize) -> Self {
        self.transaction_size = size;
        self
    }

    /// Set the idle interval
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Set the report channel capacity
    pub fn with_report_capacity(mut self, capacity: usize) -> Self {
        self.report_capacity = capacity;
        self
    }

    /// Set the shutdown grace period
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = Some(grace);
        self
    }

    /// Validate for records with `columns` values each
    pub fn validate(&self, columns: usize) -> Result<()> {
        if self.workers == 0 {
            return Err(PipelineError::invalid_config("workers must be at least 1"));
        }
        if self.insert_size == 0 {
            return Err(PipelineError::invalid_config("insert_size must be at least 1"));
        }
        if self.transaction_size == 0 {
            return Err(PipelineError::invalid_config(
                "transaction_size must be at least 1",
            ));
        }
        if self.report_capacity == 0 {
            return Err(PipelineError::invalid_config(
                "report_capacity must be at least 1",
            ));
        }
        if self.idle_interval.is_zero() {
            return Err(PipelineError::invalid_config(
                "idle_interval must be greater than zero",
            ));
        }
        if self.insert_size.saturating_mul(columns) > MAX_BIND_PARAMS {
            return Err(PipelineError::invalid_config(format!(
                "insert_size {} x {} columns exceeds {} bind parameters",
                self.insert_size, columns, MAX_BIND_PARAMS
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A configured, not yet started flush engine
pub struct FlushEngine<S: Sink> {
    sink: Arc<S>,
    config: EngineConfig,
    sink_metrics: Arc<SinkMetrics>,
}

impl<S: Sink> FlushEngine<S> {
    /// Create an engine writing records of type `R` to `sink`
    pub fn new<R: InsertableRecord>(sink: Arc<S>, config: EngineConfig) -> Result<Self> {
        config.validate(R::COLUMNS.len())?;
        Ok(Self {
            sink,
            config,
            sink_metrics: Arc::new(SinkMetrics::new()),
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start the coordinator
    ///
    /// Must be called within a Tokio runtime. Returns the caller's handle and
    /// the receiving end of the cycle report channel.
    pub fn start<R>(self) -> (FlushHandle<R>, mpsc::Receiver<CycleReport>)
    where
        R: InsertableRecord + 'static,
    {
        let buffer = Arc::new(AccumulationBuffer::new());
        let counters = Arc::new(Counters::new());
        let metrics = Arc::new(EngineMetrics::new());
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.report_capacity);

        let router = PartitionRouter::new(Arc::clone(&self.sink), Arc::clone(&self.sink_metrics));
        let pool = WriterPool::new(
            self.config.workers,
            self.config.transaction_size,
            Arc::clone(&self.sink_metrics),
        );

        let coordinator = FlushCoordinator::new(
            self.sink,
            Arc::clone(&buffer),
            Arc::clone(&counters),
            router,
            pool,
            self.config.clone(),
            tx,
            Arc::clone(&metrics),
            cancel.clone(),
        );
        let task = tokio::spawn(coordinator.run());

        let handle = FlushHandle {
            buffer,
            counters,
            metrics,
            sink_metrics: self.sink_metrics,
            cancel,
            task,
            shutdown_grace: self.config.shutdown_grace,
        };
        (handle, rx)
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Caller's handle to a running flush engine
pub struct FlushHandle<R> {
    buffer: Arc<AccumulationBuffer<R>>,
    counters: Arc<Counters>,
    metrics: Arc<EngineMetrics>,
    sink_metrics: Arc<SinkMetrics>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    shutdown_grace: Option<Duration>,
}

impl<R: Send + 'static> FlushHandle<R> {
    /// Append records to the buffer
    ///
    /// Never blocks beyond the buffer's critical section. Fails once `stop`
    /// has been requested.
    pub fn submit<I>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
    {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::ShuttingDown);
        }
        self.buffer.append(records);
        Ok(())
    }

    /// `buffered + remainder - errors`; advisory
    pub fn queue_length(&self) -> u64 {
        self.counters.queue_length(self.buffer.len() as u64)
    }

    /// Records waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Shared counters
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Engine metrics snapshot
    pub fn metrics(&self) -> EngineSnapshot {
        self.metrics.snapshot()
    }

    /// Sink metrics snapshot
    pub fn sink_metrics(&self) -> MetricsSnapshot {
        self.sink_metrics.snapshot()
    }

    /// Cloneable probe for the queue length, for monitors
    pub fn probe(&self) -> QueueProbe<R> {
        QueueProbe {
            buffer: Arc::clone(&self.buffer),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Token cancelled when stop is requested
    ///
    /// Tasks that should stop together with the engine can watch a clone.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the coordinator task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the engine
    ///
    /// Signals the coordinator, which finishes its current cycle, flushes
    /// whatever is still buffered and closes every worker connection. With
    /// a shutdown grace period, a coordinator that has not finished in time
    /// is detached, never aborted, since aborting could cut a commit short.
    pub async fn stop(self) -> ShutdownSummary {
        self.cancel.cancel();

        let mut task = self.task;
        let joined = match self.shutdown_grace {
            Some(grace) => match tokio::time::timeout(grace, &mut task).await {
                Ok(result) => Some(result),
                Err(_) => {
                    tracing::error!(
                        grace_ms = grace.as_millis() as u64,
                        "flush coordinator did not stop within grace period, detaching"
                    );
                    None
                }
            },
            None => Some((&mut task).await),
        };

        let completed = match joined {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                tracing::error!(error = %e, "flush coordinator task failed");
                false
            }
            None => false,
        };

        let metrics = self.metrics.snapshot();
        let summary = ShutdownSummary {
            completed,
            cycles: metrics.cycles,
            rows_confirmed: metrics.rows_confirmed,
            rows_failed: metrics.rows_failed,
            reports_dropped: metrics.reports_dropped,
            left_buffered: self.buffer.len(),
            queue_length: self.counters.queue_length(self.buffer.len() as u64),
        };

        tracing::info!(
            completed = summary.completed,
            cycles = summary.cycles,
            rows_confirmed = summary.rows_confirmed,
            rows_failed = summary.rows_failed,
            "flush engine stopped"
        );
        summary
    }
}

/// Final state after `stop`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Whether the coordinator finished (false if it failed or was detached)
    pub completed: bool,

    /// Cycles run
    pub cycles: u64,

    /// Rows confirmed written
    pub rows_confirmed: u64,

    /// Rows not written
    pub rows_failed: u64,

    /// Reports dropped on a full channel
    pub reports_dropped: u64,

    /// Records still buffered
    pub left_buffered: usize,

    /// Queue length at stop
    pub queue_length: u64,
}

// =============================================================================
// Queue probe
// =============================================================================

/// Anything that can report a queue length
pub trait QueueDepth: Send + Sync + 'static {
    /// Current queue length
    fn queue_length(&self) -> u64;
}

/// Read-only view of an engine's queue length
pub struct QueueProbe<R> {
    buffer: Arc<AccumulationBuffer<R>>,
    counters: Arc<Counters>,
}

impl<R> Clone for QueueProbe<R> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<R: Send + 'static> QueueDepth for QueueProbe<R> {
    fn queue_length(&self) -> u64 {
        self.counters.queue_length(self.buffer.len() as u64)
    }
}
