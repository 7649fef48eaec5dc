//! PostgreSQL sink implementation

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, Postgres};
use tally_protocol::{PartitionKey, SqlValue};

use crate::error::SinkError;
use crate::sink::{Sink, SinkConnection, Statement};

use super::config::{PostgresConfig, is_identifier};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

/// PostgreSQL sink
pub struct PostgresSink {
    config: PostgresConfig,
    options: PgConnectOptions,
    /// Used only for partition setup
    admin: PgPool,
}

impl PostgresSink {
    /// Create a sink from config
    ///
    /// No connection is opened until the first partition setup or worker
    /// connect. Must be called within a Tokio runtime.
    pub fn new(config: PostgresConfig) -> Result<Self, SinkError> {
        if !is_identifier(&config.schema) || config.schema.is_empty() {
            return Err(SinkError::Config(format!(
                "invalid schema name '{}'",
                config.schema
            )));
        }
        if !is_identifier(&config.table_prefix) {
            return Err(SinkError::Config(format!(
                "invalid table prefix '{}'",
                config.table_prefix
            )));
        }

        let mut options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| SinkError::Config(format!("invalid postgres url: {}", e)))?;
        if let Some(ref username) = config.username {
            options = options.username(username);
        }
        if let Some(ref password) = config.password {
            options = options.password(password);
        }

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect_lazy_with(options.clone());

        Ok(Self {
            config,
            options,
            admin,
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Close the partition setup pool
    pub async fn shutdown(&self) {
        self.admin.close().await;
    }
}

#[async_trait]
impl Sink for PostgresSink {
    type Connection = PostgresConnection;

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn table_name(&self, key: &PartitionKey) -> Result<String, SinkError> {
        Ok(format!(
            "\"{}\".\"{}{}\"",
            self.config.schema,
            self.config.table_prefix,
            key.table_suffix()?
        ))
    }

    async fn connect(&self) -> Result<PostgresConnection, SinkError> {
        let conn = tokio::time::timeout(
            self.config.connect_timeout,
            PgConnection::connect_with(&self.options),
        )
        .await
        .map_err(|_| {
            SinkError::Connection(format!(
                "connect timed out after {:?}",
                self.config.connect_timeout
            ))
        })?
        .map_err(|e| SinkError::Connection(e.to_string()))?;

        Ok(PostgresConnection { conn: Some(conn) })
    }

    async fn ensure_partition(&self, key: &PartitionKey) -> Result<String, SinkError> {
        let table = self.table_name(key)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table, self.config.column_ddl
        );

        sqlx::query(&ddl)
            .execute(&self.admin)
            .await
            .map_err(|e| SinkError::Partition {
                partition: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(partition = %key, table = %table, "partition table ready");
        Ok(table)
    }
}

/// A worker's exclusive PostgreSQL connection
pub struct PostgresConnection {
    conn: Option<PgConnection>,
}

impl PostgresConnection {
    fn conn(&mut self) -> Result<&mut PgConnection, SinkError> {
        self.conn.as_mut().ok_or(SinkError::Closed)
    }

    async fn run(&mut self, sql: &'static str) -> Result<(), SinkError> {
        sqlx::query(sql).execute(self.conn()?).await?;
        Ok(())
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: SqlValue<'q>) -> PgQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<&str>),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Timestamp(t) => query.bind(t),
        SqlValue::Double(v) => query.bind(v),
        SqlValue::Integer(v) => query.bind(v),
        SqlValue::BigInt(v) => query.bind(v),
    }
}

#[async_trait]
impl SinkConnection for PostgresConnection {
    async fn begin(&mut self) -> Result<(), SinkError> {
        self.run("BEGIN").await
    }

    async fn execute(&mut self, statement: &Statement<'_>) -> Result<u64, SinkError> {
        let conn = self.conn()?;
        let mut query = sqlx::query(statement.text());
        for value in statement.params() {
            query = bind_value(query, *value);
        }
        let result = query
            .execute(conn)
            .await
            .map_err(|e| SinkError::Execute(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.run("COMMIT")
            .await
            .map_err(|e| SinkError::Commit(e.to_string()))
    }

    async fn rollback(&mut self) -> Result<(), SinkError> {
        self.run("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}
