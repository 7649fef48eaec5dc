//! Tally - Pipeline
//!
//! The buffered, partitioned, parallel flush engine.
//!
//! # Architecture
//!
//! ```text
//! submit ──→ [AccumulationBuffer] ──swap──→ [FlushCoordinator]
//!                                                  │
//!                                          [PartitionRouter] ── ensure ──→ Sink
//!                                                  │ per partition, one at a time
//!                                            [WriterPool]
//!                                     ┌────────────┼────────────┐
//!                                 WriterWorker WriterWorker WriterWorker ──→ Sink
//!                                                  │
//!                                    CycleReport ──→ mpsc::Receiver
//! ```
//!
//! # Key Design
//!
//! - **Swap, don't copy**: the buffer hands its whole contents to a cycle
//!   under one lock; appends during a cycle land in the next one
//! - **Contiguous shares**: a partition's records are split into ordered,
//!   non-overlapping ranges, one per worker
//! - **Partial success**: each worker commits every `transaction_size`
//!   statements; a failure never undoes earlier commits or stops siblings
//! - **Reports on a channel**: `try_send`, dropped and counted when full
//! - **Cooperative stop**: cancellation is checked between cycles, never
//!   inside one; remaining rows are flushed before workers close
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tally_pipeline::{EngineConfig, FlushEngine};
//! use tally_protocol::Event;
//! use tally_sinks::MemorySink;
//!
//! let engine = FlushEngine::new::<Event>(Arc::new(MemorySink::new()), EngineConfig::default())?;
//! let (handle, mut reports) = engine.start::<Event>();
//!
//! handle.submit(vec![Event::now("flow", 1.5, 0)])?;
//! let report = reports.recv().await;
//!
//! let summary = handle.stop().await;
//! ```

mod buffer;
mod coordinator;
mod counters;
mod dispatch;
mod engine;
mod error;
mod metrics;
mod monitor;
mod partition;
mod report;

pub use buffer::AccumulationBuffer;
pub use coordinator::FlushCoordinator;
pub use counters::Counters;
pub use dispatch::{PartitionOutcome, WriterPool, split_shares};
pub use engine::{
    DEFAULT_IDLE_INTERVAL, DEFAULT_INSERT_SIZE, DEFAULT_REPORT_CAPACITY,
    DEFAULT_TRANSACTION_SIZE, DEFAULT_WORKERS, EngineConfig, FlushEngine, FlushHandle,
    MAX_BIND_PARAMS, QueueDepth, QueueProbe, ShutdownSummary,
};
pub use error::{PipelineError, Result};
pub use metrics::{EngineMetrics, EngineSnapshot};
pub use monitor::{DEFAULT_MONITOR_INTERVAL, QueueMonitor};
pub use partition::{PartitionBatch, PartitionRouter, group_by_partition};
pub use report::{CycleReport, ErrorKind, FlushError};




#[cfg(test)]
#[path = "partition_test.rs"]
mod partition_test;


#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
