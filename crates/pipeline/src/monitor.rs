//! Queue length monitor
//!
//! Samples an engine's queue length on a fixed interval and logs it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::QueueDepth;

/// Default sampling interval
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(100);

/// Background task logging the queue length until cancelled
pub struct QueueMonitor {
    last: Arc<AtomicU64>,
    samples: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl QueueMonitor {
    /// Spawn a monitor sampling `probe` every `interval`
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<Q: QueueDepth>(probe: Q, interval: Duration, cancel: CancellationToken) -> Self {
        let last = Arc::new(AtomicU64::new(0));
        let samples = Arc::new(AtomicU64::new(0));

        let task = {
            let last = Arc::clone(&last);
            let samples = Arc::clone(&samples);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            let length = probe.queue_length();
                            last.store(length, Ordering::Relaxed);
                            samples.fetch_add(1, Ordering::Relaxed);
                            tracing::info!(queue_length = length, "writing queue");
                        }
                    }
                }
                tracing::debug!("queue monitor stopped");
            })
        };

        Self {
            last,
            samples,
            task,
        }
    }

    /// Most recent sample
    pub fn last_sample(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }

    /// Number of samples taken
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Wait for the monitor to exit after its token is cancelled
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "queue monitor task failed");
        }
    }
}
