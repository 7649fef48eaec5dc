//! Accumulation buffer
//!
//! Pending records wait here until the coordinator swaps them out.

use parking_lot::Mutex;

/// Append/swap buffer of pending records
///
/// A single mutex covers both append and swap, so every appended record
/// ends up in exactly one swapped batch.
#[derive(Debug)]
pub struct AccumulationBuffer<R> {
    pending: Mutex<Vec<R>>,
}

impl<R> Default for AccumulationBuffer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> AccumulationBuffer<R> {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Append records, preserving their order
    pub fn append<I>(&self, records: I)
    where
        I: IntoIterator<Item = R>,
    {
        self.pending.lock().extend(records);
    }

    /// Append one record
    pub fn push(&self, record: R) {
        self.pending.lock().push(record);
    }

    /// Take the buffered records, leaving an empty buffer behind
    ///
    /// Returns `None` when nothing was buffered, so an empty flush is
    /// distinguishable from a flush of zero records.
    pub fn swap_if_non_empty(&self) -> Option<Vec<R>> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut *pending))
        }
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
