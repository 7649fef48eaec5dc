//! Partition router
//!
//! Groups a swapped batch by partition key and makes sure every
//! partition's destination exists before anything is written to it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tally_protocol::{InsertableRecord, PartitionKey};
use tally_sinks::{Sink, SinkError, SinkMetrics};
use tokio::sync::OnceCell;

/// Records of one partition, in arrival order
#[derive(Debug)]
pub struct PartitionBatch<R> {
    pub key: PartitionKey,
    pub records: Vec<R>,
}

impl<R> PartitionBatch<R> {
    /// Number of records
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the batch has no records
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Group records by partition key
///
/// Partitions come out in order of first appearance; records keep their
/// relative order within each partition.
pub fn group_by_partition<R: InsertableRecord>(records: Vec<R>) -> Vec<PartitionBatch<R>> {
    let mut index: HashMap<PartitionKey, usize> = HashMap::new();
    let mut batches: Vec<PartitionBatch<R>> = Vec::new();

    for record in records {
        let slot = match index.get(record.partition_key()) {
            Some(&slot) => slot,
            None => {
                let key = record.partition_key().clone();
                index.insert(key.clone(), batches.len());
                batches.push(PartitionBatch {
                    key,
                    records: Vec::new(),
                });
                batches.len() - 1
            }
        };
        batches[slot].records.push(record);
    }

    batches
}

/// Lazily ensures partition destinations, once per key
///
/// The cache only grows. Each key gets its own once-cell, so concurrent
/// callers for the same key share one `ensure_partition` call; a failed
/// call leaves the cell empty and the next caller retries.
pub struct PartitionRouter<S: Sink> {
    sink: Arc<S>,
    known: Mutex<HashMap<PartitionKey, Arc<OnceCell<String>>>>,
    metrics: Arc<SinkMetrics>,
}

impl<S: Sink> PartitionRouter<S> {
    /// Create a router over `sink`
    pub fn new(sink: Arc<S>, metrics: Arc<SinkMetrics>) -> Self {
        Self {
            sink,
            known: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Destination table for `key`, creating it on first use
    pub async fn ensure(&self, key: &PartitionKey) -> Result<String, SinkError> {
        let cell = {
            let mut known = self.known.lock();
            Arc::clone(known.entry(key.clone()).or_default())
        };

        let table = cell
            .get_or_try_init(|| async {
                let table = self.sink.ensure_partition(key).await?;
                self.metrics.record_partition();
                tracing::info!(partition = %key, table = %table, "partition created");
                Ok::<_, SinkError>(table)
            })
            .await?;

        Ok(table.clone())
    }

    /// Whether `key` has been ensured
    pub fn is_known(&self, key: &PartitionKey) -> bool {
        self.known
            .lock()
            .get(key)
            .is_some_and(|cell| cell.initialized())
    }

    /// Number of ensured partitions
    pub fn known_count(&self) -> usize {
        self.known
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}
