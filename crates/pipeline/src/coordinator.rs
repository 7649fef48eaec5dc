//! Flush coordinator
//!
//! The single background loop that drives flush cycles. Cycles never
//! overlap; partitions within a cycle are written one at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tally_protocol::InsertableRecord;
use tally_sinks::{InsertTemplate, RateLimitedLogger, Sink};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::buffer::AccumulationBuffer;
use crate::counters::Counters;
use crate::dispatch::WriterPool;
use crate::engine::EngineConfig;
use crate::metrics::EngineMetrics;
use crate::partition::{PartitionRouter, group_by_partition};
use crate::report::{CycleReport, FlushError};

/// Drives flush cycles until cancelled
pub struct FlushCoordinator<S: Sink, R> {
    sink: Arc<S>,
    buffer: Arc<AccumulationBuffer<R>>,
    counters: Arc<Counters>,
    router: PartitionRouter<S>,
    pool: WriterPool<S>,
    templates: HashMap<String, Arc<InsertTemplate>>,
    config: EngineConfig,
    reports: mpsc::Sender<CycleReport>,
    metrics: Arc<EngineMetrics>,
    failure_log: RateLimitedLogger,
    drop_log: RateLimitedLogger,
    cancel: CancellationToken,
    cycle: u64,
}

impl<S, R> FlushCoordinator<S, R>
where
    S: Sink,
    R: InsertableRecord + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        sink: Arc<S>,
        buffer: Arc<AccumulationBuffer<R>>,
        counters: Arc<Counters>,
        router: PartitionRouter<S>,
        pool: WriterPool<S>,
        config: EngineConfig,
        reports: mpsc::Sender<CycleReport>,
        metrics: Arc<EngineMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink,
            buffer,
            counters,
            router,
            pool,
            templates: HashMap::new(),
            config,
            reports,
            metrics,
            failure_log: RateLimitedLogger::default(),
            drop_log: RateLimitedLogger::default(),
            cancel,
            cycle: 0,
        }
    }

    /// Run until cancelled, then flush what is left and close every worker
    pub async fn run(mut self) {
        tracing::info!(
            sink = self.sink.name(),
            workers = self.pool.size(),
            insert_size = self.config.insert_size,
            transaction_size = self.config.transaction_size,
            "flush coordinator started"
        );

        loop {
            match self.buffer.swap_if_non_empty() {
                Some(batch) => self.run_cycle(batch).await,
                None => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.config.idle_interval) => {}
                    }
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
        }

        // Final flush
        let mut drained = 0usize;
        while let Some(batch) = self.buffer.swap_if_non_empty() {
            drained += batch.len();
            self.run_cycle(batch).await;
        }
        if drained > 0 {
            tracing::info!(rows = drained, "flushed remaining rows on shutdown");
        }

        self.pool.close().await;
        tracing::info!(cycles = self.cycle, "flush coordinator stopped");
    }

    /// Run one cycle over a swapped batch and deliver its report
    pub(crate) async fn run_cycle(&mut self, batch: Vec<R>) {
        let report = self.flush(batch).await;
        self.deliver(report);
    }

    async fn flush(&mut self, batch: Vec<R>) -> CycleReport {
        let start = Instant::now();
        self.cycle += 1;
        let cycle = self.cycle;
        let input_rows = batch.len() as u64;
        self.counters.begin_cycle(input_rows);

        let partitions = group_by_partition(batch);
        let mut report = CycleReport {
            cycle,
            input_rows,
            confirmed: 0,
            error_rows: 0,
            errors: Vec::new(),
            partitions: partitions.len(),
            remainder: 0,
            duration: Default::default(),
        };

        for part in partitions {
            let rows = part.len() as u64;
            let table = match self.router.ensure(&part.key).await {
                Ok(table) => table,
                Err(e) => {
                    let error = FlushError::from_setup(part.key, rows, e);
                    self.failure_log.warn("partition setup failed", &error);
                    report.error_rows += rows;
                    report.errors.push(error);
                    continue;
                }
            };

            let template = self.template_for(table);
            let outcome = self
                .pool
                .dispatch(
                    &self.sink,
                    &template,
                    &part.key,
                    Arc::new(part.records),
                    &self.counters,
                )
                .await;

            tracing::debug!(
                cycle,
                partition = %part.key,
                rows,
                workers = outcome.workers,
                statements = outcome.statements,
                commits = outcome.commits,
                confirmed = outcome.confirmed,
                "partition flushed"
            );

            for error in &outcome.errors {
                self.failure_log.warn("partition write failed", error);
            }
            report.confirmed += outcome.confirmed;
            report.error_rows += outcome.failed_rows;
            report.errors.extend(outcome.errors);
        }

        report.remainder = self.counters.remainder();
        report.duration = start.elapsed();
        self.counters.add_errors(report.error_rows);
        self.metrics.record_cycle(
            report.input_rows,
            report.confirmed,
            report.error_rows,
            report.duration,
        );

        if report.has_anomaly() {
            self.metrics.record_anomaly();
            tracing::error!(
                cycle,
                remainder = report.remainder,
                error_rows = report.error_rows,
                "row accounting anomaly: remainder does not match failed rows"
            );
        } else if report.remainder != 0 {
            tracing::warn!(
                cycle,
                remainder = report.remainder,
                errors = report.errors.len(),
                "cycle finished with unwritten rows"
            );
        }

        tracing::debug!(
            cycle,
            rows = report.input_rows,
            confirmed = report.confirmed,
            failed = report.error_rows,
            partitions = report.partitions,
            duration_ms = report.duration.as_millis() as u64,
            "flush cycle complete"
        );

        report
    }

    fn template_for(&mut self, table: String) -> Arc<InsertTemplate> {
        let insert_size = self.config.insert_size;
        Arc::clone(
            self.templates
                .entry(table)
                .or_insert_with_key(|table| {
                    Arc::new(InsertTemplate::new(table.as_str(), R::COLUMNS, insert_size))
                }),
        )
    }

    fn deliver(&self, report: CycleReport) {
        match self.reports.try_send(report) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(report)) => {
                self.metrics.record_report_dropped();
                self.drop_log.warn(
                    "cycle report dropped",
                    &format_args!("report channel full at cycle {}", report.cycle),
                );
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
