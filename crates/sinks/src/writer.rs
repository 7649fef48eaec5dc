//! Writer worker
//!
//! Owns one exclusive sink connection and drives a builder's statements
//! through it in bounded units of work.

use std::sync::Arc;

use tally_protocol::InsertableRecord;

use crate::error::WriteFailure;
use crate::insert::{BatchInsertBuilder, InsertTemplate};
use crate::metrics::SinkMetrics;
use crate::sink::{Sink, SinkConnection};

/// Result of writing one share
#[derive(Debug, Default)]
pub struct WriteOutcome {
    /// Rows assigned to the worker
    pub assigned: usize,

    /// Affected rows confirmed by a commit
    pub confirmed: u64,

    /// Statements executed successfully
    pub statements: usize,

    /// Units of work committed
    pub commits: usize,

    /// Why the worker stopped early, if it did
    pub error: Option<WriteFailure>,
}

impl WriteOutcome {
    /// Assigned rows not confirmed as written
    #[inline]
    pub fn failed_rows(&self) -> u64 {
        (self.assigned as u64).saturating_sub(self.confirmed)
    }

    /// Whether the whole share was attempted without error
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Worker that writes contiguous record shares through its own connection
///
/// The connection is opened on first use and kept across shares. A failed
/// statement or commit rolls back the open unit of work and drops the
/// connection; the next share reconnects. Units committed before the
/// failure stay committed.
pub struct WriterWorker<S: Sink> {
    id: usize,
    transaction_size: usize,
    connection: Option<S::Connection>,
    metrics: Arc<SinkMetrics>,
}

impl<S: Sink> WriterWorker<S> {
    /// Create a worker committing every `transaction_size` statements
    pub fn new(id: usize, transaction_size: usize, metrics: Arc<SinkMetrics>) -> Self {
        Self {
            id,
            transaction_size: transaction_size.max(1),
            connection: None,
            metrics,
        }
    }

    /// Worker index within its pool
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the worker currently holds an open connection
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Write `records` to the template's table
    ///
    /// `on_commit` is called with the affected row count of every
    /// successful commit, in order.
    pub async fn write<R, F>(
        &mut self,
        sink: &S,
        template: &InsertTemplate,
        records: &[R],
        mut on_commit: F,
    ) -> WriteOutcome
    where
        R: InsertableRecord,
        F: FnMut(u64) + Send,
    {
        let mut outcome = WriteOutcome {
            assigned: records.len(),
            ..Default::default()
        };
        if records.is_empty() {
            return outcome;
        }

        if self.connection.is_none() {
            match sink.connect().await {
                Ok(conn) => {
                    self.metrics.record_connection();
                    tracing::debug!(worker = self.id, sink = sink.name(), "writer connected");
                    self.connection = Some(conn);
                }
                Err(e) => {
                    self.metrics.record_error();
                    outcome.error = Some(WriteFailure::Connect(e));
                    return outcome;
                }
            }
        }
        let Some(conn) = self.connection.as_mut() else {
            return outcome;
        };

        let metrics = &self.metrics;
        let transaction_size = self.transaction_size;
        let mut builder = BatchInsertBuilder::new(template, records);
        let mut in_unit = false;
        let mut unit_statements = 0usize;
        let mut unit_rows = 0u64;

        while let Some(next) = builder.next_statement() {
            let statement = match next {
                Ok(s) => s,
                Err(e) => {
                    outcome.error = Some(WriteFailure::Shape(e));
                    break;
                }
            };

            if !in_unit {
                if let Err(e) = conn.begin().await {
                    outcome.error = Some(WriteFailure::Begin {
                        statement: outcome.statements,
                        source: e,
                    });
                    break;
                }
                in_unit = true;
            }

            match conn.execute(&statement).await {
                Ok(affected) => {
                    metrics.record_statement();
                    unit_rows += affected;
                    unit_statements += 1;
                    outcome.statements += 1;
                }
                Err(e) => {
                    outcome.error = Some(WriteFailure::Execute {
                        statement: outcome.statements,
                        source: e,
                    });
                    break;
                }
            }

            if unit_statements == transaction_size {
                if let Err(e) = conn.commit().await {
                    in_unit = false;
                    outcome.error = Some(WriteFailure::Commit {
                        statement: outcome.statements,
                        source: e,
                    });
                    break;
                }
                in_unit = false;
                metrics.record_commit(unit_rows);
                outcome.commits += 1;
                outcome.confirmed += unit_rows;
                on_commit(unit_rows);
                unit_statements = 0;
                unit_rows = 0;
            }
        }

        if outcome.error.is_none() && in_unit {
            match conn.commit().await {
                Ok(()) => {
                    metrics.record_commit(unit_rows);
                    outcome.commits += 1;
                    outcome.confirmed += unit_rows;
                    on_commit(unit_rows);
                }
                Err(e) => {
                    outcome.error = Some(WriteFailure::Commit {
                        statement: outcome.statements,
                        source: e,
                    });
                }
            }
            in_unit = false;
        }

        if let Some(ref failure) = outcome.error {
            metrics.record_error();
            if in_unit {
                if let Err(e) = conn.rollback().await {
                    tracing::debug!(worker = self.id, error = %e, "rollback after failure failed");
                }
                metrics.record_rollback();
            }
            tracing::warn!(
                worker = self.id,
                table = template.table(),
                assigned = outcome.assigned,
                confirmed = outcome.confirmed,
                error = %failure,
                "writer stopped early"
            );
            self.drop_connection().await;
        } else {
            tracing::trace!(
                worker = self.id,
                table = template.table(),
                rows = outcome.confirmed,
                statements = outcome.statements,
                commits = outcome.commits,
                "share written"
            );
        }

        outcome
    }

    /// Close the connection, if open
    pub async fn close(&mut self) {
        self.drop_connection().await;
    }

    async fn drop_connection(&mut self) {
        if let Some(mut conn) = self.connection.take()
            && let Err(e) = conn.close().await
        {
            tracing::debug!(worker = self.id, error = %e, "error closing writer connection");
        }
    }
}
