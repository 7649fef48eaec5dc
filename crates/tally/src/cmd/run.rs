//! Run command - drive the flush engine with synthetic events
//!
//! Submits the same bulk of events every `--interval` until `--duration`
//! elapses or Ctrl+C arrives, then stops the engine and prints throughput.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: memory sink, 10000 events across 10 partitions every 50ms for 60s
//! tally run
//!
//! # PostgreSQL from config, shorter run
//! tally run --config configs/config.toml --sink postgres --duration 10s
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tally_config::{Config, SinkType};
use tally_pipeline::{
    CycleReport, EngineConfig, FlushEngine, QueueMonitor, ShutdownSummary,
};
use tally_protocol::Event;
use tally_sinks::{MemorySink, PostgresConfig, PostgresSink, Sink};

/// Sink override on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    Memory,
    Postgres,
}

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Sink to write to (overrides config file)
    #[arg(long, value_enum)]
    pub sink: Option<SinkArg>,

    /// Events per submitted bulk
    #[arg(short, long, default_value = "10000")]
    pub events: usize,

    /// Distinct partition keys the bulk is spread across
    #[arg(short, long, default_value = "10")]
    pub partitions: usize,

    /// Pause between submissions
    #[arg(short, long, default_value = "50ms", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    /// How long to keep submitting
    #[arg(short, long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub duration: Duration,
}

/// Run the load generator
pub async fn run(mut config: Config, args: RunArgs) -> Result<()> {
    match args.sink {
        Some(SinkArg::Memory) => config.sink.sink_type = SinkType::Memory,
        Some(SinkArg::Postgres) => config.sink.sink_type = SinkType::Postgres,
        None => {}
    }
    config.validate().context("invalid configuration")?;

    if args.events == 0 || args.partitions == 0 {
        anyhow::bail!("--events and --partitions must be at least 1");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        sink = config.sink.sink_type.as_str(),
        workers = config.writer.workers,
        insert_size = config.writer.insert_size,
        transaction_size = config.writer.transaction_size,
        "Tally starting"
    );

    let result = match config.sink.sink_type {
        SinkType::Memory => {
            let sink = Arc::new(MemorySink::with_prefix(config.sink.table_prefix.clone()));
            drive(Arc::clone(&sink), &config, &args).await.map(|summary| {
                println!(
                    "Memory sink holds {} event(s) in {} table(s).",
                    sink.total_rows(),
                    sink.tables().len()
                );
                summary
            })
        }
        SinkType::Postgres => {
            let sink = Arc::new(
                PostgresSink::new(postgres_config(&config)?)
                    .context("failed to create postgres sink")?,
            );
            let result = drive(Arc::clone(&sink), &config, &args).await;
            sink.shutdown().await;
            result
        }
    };

    let summary = result?;
    if !summary.completed {
        warn!(
            left_buffered = summary.left_buffered,
            "engine did not finish its final flush"
        );
    }

    info!("Tally shutdown complete");
    Ok(())
}

/// Map the `[sink]` section onto the PostgreSQL sink's settings
fn postgres_config(config: &Config) -> Result<PostgresConfig> {
    let sink = &config.sink;
    let url = sink
        .url
        .clone()
        .context("[sink] url is required for the postgres sink")?;

    let mut pg = PostgresConfig::default()
        .with_url(url)
        .with_schema(sink.schema.clone())
        .with_table_prefix(sink.table_prefix.clone())
        .with_connect_timeout(sink.connect_timeout);
    pg.username = sink.username.clone();
    pg.password = sink.password.clone();
    Ok(pg)
}

/// Map the `[writer]` section onto the engine's settings
fn engine_config(config: &Config) -> EngineConfig {
    let writer = &config.writer;
    let engine = EngineConfig::default()
        .with_workers(writer.workers)
        .with_insert_size(writer.insert_size)
        .with_transaction_size(writer.transaction_size)
        .with_idle_interval(writer.idle_interval)
        .with_report_capacity(writer.report_capacity);

    match writer.shutdown_grace {
        Some(grace) => engine.with_shutdown_grace(grace),
        None => engine,
    }
}

/// Events spread round-robin over `partitions` parameter names
fn generate_bulk(events: usize, partitions: usize) -> Vec<Event> {
    (0..events)
        .map(|i| {
            let key = format!("parameter_{}", i % partitions);
            Event::now(key, (i % 1000) as f64 * 0.5, (i % 3) as i32)
        })
        .collect()
}

/// Log every cycle report until the engine closes the channel
fn consume_reports(mut reports: mpsc::Receiver<CycleReport>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            if report.is_clean() {
                debug!(
                    cycle = report.cycle,
                    rows = report.confirmed,
                    partitions = report.partitions,
                    duration_ms = report.duration.as_millis() as u64,
                    "cycle written"
                );
                continue;
            }
            for error in &report.errors {
                warn!(
                    cycle = report.cycle,
                    partition = %error.partition(),
                    kind = ?error.kind(),
                    rows = error.rows(),
                    error = %error,
                    "rows not written"
                );
            }
        }
    })
}

async fn drive<S: Sink>(sink: Arc<S>, config: &Config, args: &RunArgs) -> Result<ShutdownSummary> {
    let engine = FlushEngine::new::<Event>(sink, engine_config(config))
        .context("failed to configure flush engine")?;
    let (handle, reports) = engine.start::<Event>();
    let reporter = consume_reports(reports);

    let monitor = config.monitor.enabled.then(|| {
        QueueMonitor::spawn(handle.probe(), config.monitor.interval, handle.shutdown_token())
    });

    let bulk = generate_bulk(args.events, args.partitions);
    let mut submitted: u64 = 0;
    let start = Instant::now();
    println!("Submitting {} event(s) every {:?}...", args.events, args.interval);

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while start.elapsed() < args.duration {
        handle
            .submit(bulk.iter().cloned())
            .context("flush engine rejected submission")?;
        submitted += bulk.len() as u64;

        tokio::select! {
            _ = tokio::time::sleep(args.interval) => {}
            _ = &mut ctrl_c => {
                info!("interrupt received, stopping submissions");
                break;
            }
        }
    }
    println!("Writing to engine was stopped. Draining...");

    let summary = handle.stop().await;
    let elapsed = start.elapsed();

    if let Some(monitor) = monitor {
        monitor.join().await;
    }
    // A detached coordinator still owns the report sender
    if summary.completed {
        if reporter.await.is_err() {
            warn!("report consumer task failed");
        }
    } else {
        reporter.abort();
    }

    print_summary(&summary, submitted, elapsed);
    Ok(summary)
}

fn print_summary(summary: &ShutdownSummary, submitted: u64, elapsed: Duration) {
    let millis = elapsed.as_secs_f64() * 1000.0;
    println!("Writing duration is {:.0} milliseconds.", millis);
    if submitted > 0 {
        println!(
            "{:.3} milliseconds per 10000 events.",
            millis / (submitted as f64 / 10_000.0)
        );
    }
    println!("Submitted {} event(s).", submitted);
    println!("Written {} event(s).", summary.rows_confirmed);
    println!("Failed {} event(s).", summary.rows_failed);
    if summary.left_buffered > 0 {
        println!("Left {} event(s) buffered.", summary.left_buffered);
    }
}
