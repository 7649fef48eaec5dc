//! Writer pool and share dispatch
//!
//! Splits one partition's records across the pool's workers and runs the
//! shares concurrently.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tally_protocol::{InsertableRecord, PartitionKey};
use tally_sinks::{InsertTemplate, Sink, SinkMetrics, WriterWorker};

use crate::counters::Counters;
use crate::report::FlushError;

/// Split `n` records across `workers` workers
///
/// `base = (n - 1) / workers` and `extra = (n - 1) - base * workers`;
/// worker `i` takes `base + 1` records while `i <= extra`, `base` after
/// that. Ranges are contiguous, start at zero and cover exactly `0..n`.
/// A worker whose share would be empty gets no range, and nor does any
/// worker after it.
pub fn split_shares(n: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    if n == 0 {
        return Vec::new();
    }

    let base = (n - 1) / workers;
    let extra = (n - 1) - base * workers;

    let mut shares = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let len = if i <= extra { base + 1 } else { base };
        // Shares only shrink from here on
        if len == 0 {
            break;
        }
        let end = (start + len).min(n);
        shares.push(start..end);
        start = end;
        if start == n {
            break;
        }
    }
    shares
}

/// Aggregate result of writing one partition
#[derive(Debug, Default)]
pub struct PartitionOutcome {
    /// Rows handed to the pool
    pub input_rows: u64,

    /// Rows confirmed written
    pub confirmed: u64,

    /// Rows not written
    pub failed_rows: u64,

    /// Workers scheduled
    pub workers: usize,

    /// Statements executed
    pub statements: usize,

    /// Units of work committed
    pub commits: usize,

    /// Errors, in worker order
    pub errors: Vec<FlushError>,
}

/// Fixed pool of long-lived writer workers
///
/// Each worker keeps its connection across cycles. While a share is being
/// written the worker is moved into its task, so no connection is ever
/// used by two tasks at once.
pub struct WriterPool<S: Sink> {
    workers: Vec<Option<WriterWorker<S>>>,
    transaction_size: usize,
    metrics: Arc<SinkMetrics>,
}

impl<S: Sink> WriterPool<S> {
    /// Create `size` workers committing every `transaction_size` statements
    pub fn new(size: usize, transaction_size: usize, metrics: Arc<SinkMetrics>) -> Self {
        let workers = (0..size.max(1))
            .map(|id| Some(WriterWorker::new(id, transaction_size, Arc::clone(&metrics))))
            .collect();
        Self {
            workers,
            transaction_size,
            metrics,
        }
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Workers currently holding a connection
    pub fn connected(&self) -> usize {
        self.workers
            .iter()
            .flatten()
            .filter(|w| w.is_connected())
            .count()
    }

    /// Write `records` to the template's table across the pool
    ///
    /// Returns once every scheduled worker has finished. A failing worker
    /// does not cancel its siblings; `counters` is decremented as units
    /// commit.
    pub async fn dispatch<R>(
        &mut self,
        sink: &Arc<S>,
        template: &Arc<InsertTemplate>,
        partition: &PartitionKey,
        records: Arc<Vec<R>>,
        counters: &Arc<Counters>,
    ) -> PartitionOutcome
    where
        R: InsertableRecord + 'static,
    {
        let shares = split_shares(records.len(), self.workers.len());
        let mut outcome = PartitionOutcome {
            input_rows: records.len() as u64,
            workers: shares.len(),
            ..Default::default()
        };

        let mut tasks = Vec::with_capacity(shares.len());
        for (id, range) in shares.into_iter().enumerate() {
            let mut worker = self.workers[id]
                .take()
                .unwrap_or_else(|| self.fresh_worker(id));
            let sink = Arc::clone(sink);
            let template = Arc::clone(template);
            let records = Arc::clone(&records);
            let counters = Arc::clone(counters);
            let rows = range.len() as u64;
            // Survives a panic in the task
            let committed = Arc::new(AtomicU64::new(0));
            let task_committed = Arc::clone(&committed);

            tracing::trace!(partition = %partition, worker = id, rows, "share dispatched");
            let handle = tokio::spawn(async move {
                let share = &records[range];
                let result = worker
                    .write(sink.as_ref(), &template, share, |confirmed| {
                        task_committed.fetch_add(confirmed, Ordering::Relaxed);
                        counters.confirm(confirmed)
                    })
                    .await;
                (worker, result)
            });
            tasks.push((id, rows, committed, handle));
        }

        for (id, rows, committed, handle) in tasks {
            match handle.await {
                Ok((worker, result)) => {
                    self.workers[id] = Some(worker);
                    outcome.confirmed += result.confirmed;
                    outcome.statements += result.statements;
                    outcome.commits += result.commits;
                    let failed = result.failed_rows();
                    outcome.failed_rows += failed;
                    if let Some(failure) = result.error {
                        outcome.errors.push(FlushError::from_write(
                            partition.clone(),
                            id,
                            failed,
                            failure,
                        ));
                    }
                }
                Err(e) => {
                    // Units committed before the panic stay written
                    let confirmed = committed.load(Ordering::Relaxed).min(rows);
                    let failed = rows - confirmed;
                    tracing::error!(
                        partition = %partition,
                        worker = id,
                        confirmed,
                        error = %e,
                        "writer task failed"
                    );
                    self.workers[id] = Some(self.fresh_worker(id));
                    outcome.confirmed += confirmed;
                    outcome.failed_rows += failed;
                    outcome.errors.push(FlushError::WorkerPanicked {
                        partition: partition.clone(),
                        worker: id,
                        rows: failed,
                    });
                }
            }
        }

        outcome
    }

    /// Close every worker's connection
    pub async fn close(&mut self) {
        for worker in self.workers.iter_mut().flatten() {
            worker.close().await;
        }
    }

    fn fresh_worker(&self, id: usize) -> WriterWorker<S> {
        WriterWorker::new(id, self.transaction_size, Arc::clone(&self.metrics))
    }
}
