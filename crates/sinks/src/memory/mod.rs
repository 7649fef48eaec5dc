//! Memory sink - in-process tables
//!
//! Keeps committed rows in memory, per table, with real unit-of-work
//! semantics: executed rows stay pending on their connection until commit
//! and are discarded on rollback. Faults can be injected to exercise the
//! failure paths of the flush pipeline.
//!
//! # Use Cases
//!
//! - **Testing**: Assert exactly what was committed, and in which units
//! - **Dry runs**: Run the load generator without a database

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tally_protocol::{PartitionKey, SqlValue};

use crate::error::SinkError;
use crate::sink::{Sink, SinkConnection, Statement};

/// Default table name prefix
pub const DEFAULT_TABLE_PREFIX: &str = "events_";

/// Owned copy of a bound parameter
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Null,
    Text(String),
    Timestamp(DateTime<Utc>),
    Double(f64),
    Integer(i32),
    BigInt(i64),
}

impl From<&SqlValue<'_>> for StoredValue {
    fn from(value: &SqlValue<'_>) -> Self {
        match *value {
            SqlValue::Null => Self::Null,
            SqlValue::Text(s) => Self::Text(s.to_owned()),
            SqlValue::Timestamp(t) => Self::Timestamp(t),
            SqlValue::Double(v) => Self::Double(v),
            SqlValue::Integer(v) => Self::Integer(v),
            SqlValue::BigInt(v) => Self::BigInt(v),
        }
    }
}

impl StoredValue {
    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Double content, if this is a double value
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer content, if this is an integer value
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

/// Faults the memory sink injects
#[derive(Debug, Clone, Default)]
pub struct MemoryFaults {
    /// Fail the nth execute across all connections (1-based), once
    pub fail_execute_nth: Option<usize>,

    /// Fail every execute against these tables
    pub fail_tables: HashSet<String>,

    /// Fail `ensure_partition` for these partition keys
    pub fail_partitions: HashSet<String>,

    /// Fail every commit
    pub fail_commits: bool,

    /// Fail every connect
    pub fail_connect: bool,

    /// Delay every execute by this long
    pub execute_delay: Option<Duration>,
}

impl MemoryFaults {
    /// No faults
    pub fn none() -> Self {
        Self::default()
    }

    /// Fail the nth execute (1-based)
    pub fn with_execute_failure_at(mut self, nth: usize) -> Self {
        self.fail_execute_nth = Some(nth);
        self
    }

    /// Fail every execute against `table`
    pub fn with_failing_table(mut self, table: impl Into<String>) -> Self {
        self.fail_tables.insert(table.into());
        self
    }

    /// Fail partition setup for `key`
    pub fn with_failing_partition(mut self, key: impl Into<String>) -> Self {
        self.fail_partitions.insert(key.into());
        self
    }

    /// Fail every commit
    pub fn with_failing_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    /// Fail every connect
    pub fn with_failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Delay every execute
    pub fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = Some(delay);
        self
    }
}

/// One committed unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Connection that committed
    pub connection: u64,

    /// Tables written in the unit, in first-write order
    pub tables: Vec<String>,

    /// Statements in the unit
    pub statements: usize,

    /// Rows in the unit
    pub rows: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    faults: MemoryFaults,
    tables: HashMap<String, Vec<Vec<StoredValue>>>,
    ensure_calls: Vec<String>,
    commits: Vec<CommitRecord>,
    rollbacks: usize,
    executes: usize,
    next_connection: u64,
    open_connections: usize,
}

/// In-memory sink
///
/// Cloning shares the same tables.
#[derive(Debug, Clone)]
pub struct MemorySink {
    table_prefix: String,
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// Create an empty sink with the default table prefix
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_TABLE_PREFIX)
    }

    /// Create an empty sink whose tables are named `{prefix}{suffix}`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Replace the injected faults
    pub fn set_faults(&self, faults: MemoryFaults) {
        self.state.lock().faults = faults;
    }

    /// Builder form of `set_faults`
    pub fn with_faults(self, faults: MemoryFaults) -> Self {
        self.set_faults(faults);
        self
    }

    /// Partition keys passed to `ensure_partition`, in call order
    pub fn ensure_calls(&self) -> Vec<String> {
        self.state.lock().ensure_calls.clone()
    }

    /// Tables that exist
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Committed rows of `table`, in commit order
    pub fn rows(&self, table: &str) -> Vec<Vec<StoredValue>> {
        self.state
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of committed rows in `table`
    pub fn row_count(&self, table: &str) -> usize {
        self.state.lock().tables.get(table).map_or(0, Vec::len)
    }

    /// Number of committed rows across all tables
    pub fn total_rows(&self) -> usize {
        self.state.lock().tables.values().map(Vec::len).sum()
    }

    /// All committed units of work, in commit order
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.state.lock().commits.clone()
    }

    /// Committed units of work that wrote `table`
    pub fn commits_for(&self, table: &str) -> Vec<CommitRecord> {
        self.state
            .lock()
            .commits
            .iter()
            .filter(|c| c.tables.iter().any(|t| t == table))
            .cloned()
            .collect()
    }

    /// Number of rollbacks
    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }

    /// Connections opened so far
    pub fn connections_opened(&self) -> u64 {
        self.state.lock().next_connection
    }

    /// Connections currently open
    pub fn open_connections(&self) -> usize {
        self.state.lock().open_connections
    }
}

#[async_trait]
impl Sink for MemorySink {
    type Connection = MemoryConnection;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn table_name(&self, key: &PartitionKey) -> Result<String, SinkError> {
        Ok(format!("{}{}", self.table_prefix, key.table_suffix()?))
    }

    async fn connect(&self) -> Result<MemoryConnection, SinkError> {
        let mut state = self.state.lock();
        if state.faults.fail_connect {
            return Err(SinkError::Connection("injected connect failure".into()));
        }
        state.next_connection += 1;
        state.open_connections += 1;
        Ok(MemoryConnection {
            id: state.next_connection,
            state: Arc::clone(&self.state),
            pending: Vec::new(),
            in_unit: false,
            closed: false,
        })
    }

    async fn ensure_partition(&self, key: &PartitionKey) -> Result<String, SinkError> {
        let table = self.table_name(key)?;
        let mut state = self.state.lock();
        state.ensure_calls.push(key.as_str().to_owned());
        if state.faults.fail_partitions.contains(key.as_str()) {
            return Err(SinkError::Partition {
                partition: key.to_string(),
                message: "injected partition failure".into(),
            });
        }
        state.tables.entry(table.clone()).or_default();
        Ok(table)
    }
}

/// Exclusive connection to a [`MemorySink`]
#[derive(Debug)]
pub struct MemoryConnection {
    id: u64,
    state: Arc<Mutex<MemoryState>>,
    pending: Vec<(String, Vec<Vec<StoredValue>>)>,
    in_unit: bool,
    closed: bool,
}

impl MemoryConnection {
    /// Connection number, starting at 1
    pub fn id(&self) -> u64 {
        self.id
    }

    fn check_open(&self) -> Result<(), SinkError> {
        if self.closed {
            Err(SinkError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SinkConnection for MemoryConnection {
    async fn begin(&mut self) -> Result<(), SinkError> {
        self.check_open()?;
        self.pending.clear();
        self.in_unit = true;
        Ok(())
    }

    async fn execute(&mut self, statement: &Statement<'_>) -> Result<u64, SinkError> {
        self.check_open()?;

        let delay = self.state.lock().faults.execute_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut state = self.state.lock();
            state.executes += 1;
            if state.faults.fail_execute_nth == Some(state.executes) {
                return Err(SinkError::Execute("injected execute failure".into()));
            }
            if state.faults.fail_tables.contains(statement.table()) {
                return Err(SinkError::Execute(format!(
                    "injected failure for table {}",
                    statement.table()
                )));
            }
            if !state.tables.contains_key(statement.table()) {
                return Err(SinkError::Execute(format!(
                    "relation {} does not exist",
                    statement.table()
                )));
            }
        }

        let rows = statement.rows();
        let params = statement.params();
        if rows == 0 || params.len() % rows != 0 {
            return Err(SinkError::Execute(format!(
                "{} parameters do not divide into {} rows",
                params.len(),
                rows
            )));
        }
        let width = params.len() / rows;
        let values = params
            .chunks(width)
            .map(|row| row.iter().map(StoredValue::from).collect())
            .collect();

        self.pending.push((statement.table().to_owned(), values));
        if !self.in_unit {
            // Autocommit
            self.commit().await?;
        }
        Ok(rows as u64)
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.check_open()?;
        self.in_unit = false;
        let pending = std::mem::take(&mut self.pending);

        let mut state = self.state.lock();
        if state.faults.fail_commits {
            return Err(SinkError::Commit("injected commit failure".into()));
        }
        if pending.is_empty() {
            return Ok(());
        }

        let mut record = CommitRecord {
            connection: self.id,
            tables: Vec::new(),
            statements: pending.len(),
            rows: 0,
        };
        for (table, rows) in pending {
            if !record.tables.contains(&table) {
                record.tables.push(table.clone());
            }
            record.rows += rows.len();
            state.tables.entry(table).or_default().extend(rows);
        }
        state.commits.push(record);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SinkError> {
        self.check_open()?;
        self.in_unit = false;
        self.pending.clear();
        self.state.lock().rollbacks += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if !self.closed {
            self.closed = true;
            self.pending.clear();
            self.state.lock().open_connections -= 1;
        }
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if !self.closed {
            self.state.lock().open_connections -= 1;
        }
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
