//! Tally - Sinks
//!
//! Everything the flush pipeline needs from a relational destination, plus
//! the statement machinery that feeds it.
//!
//! # Architecture
//!
//! ```text
//! [records share] → [BatchInsertBuilder] → Statement → [WriterWorker] → [SinkConnection]
//!                          ↑                                  │
//!                   [InsertTemplate]                  commit every K statements
//! ```
//!
//! A `Sink` creates one exclusive `SinkConnection` per worker and lazily
//! creates partition tables. The `WriterWorker` drives a builder's
//! statements through its connection in bounded units of work.
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | `postgres` | PostgreSQL via sqlx, one table per partition |
//! | `memory` | In-process tables with fault injection (tests, dry runs) |

/// PostgreSQL sink
pub mod postgres;

/// In-memory sink
pub mod memory;

/// Statement templates and the batch INSERT builder
pub mod insert;

/// Shared utilities
pub mod util;

mod error;
mod metrics;
mod sink;
mod writer;

pub use error::{SinkError, WriteFailure};
pub use insert::{BatchInsertBuilder, InsertTemplate};
pub use memory::{CommitRecord, MemoryConnection, MemoryFaults, MemorySink, StoredValue};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use postgres::{PostgresConfig, PostgresConnection, PostgresSink};
pub use sink::{Sink, SinkConnection, Statement};
pub use util::RateLimitedLogger;
pub use writer::{WriteOutcome, WriterWorker};

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
