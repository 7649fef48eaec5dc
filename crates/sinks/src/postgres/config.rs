//! PostgreSQL sink configuration

use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default schema for partition tables
pub const DEFAULT_SCHEMA: &str = "public";

/// Default partition table prefix
pub const DEFAULT_TABLE_PREFIX: &str = "events_";

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Column definitions for event partition tables
pub const DEFAULT_COLUMN_DDL: &str = "event_id BIGSERIAL PRIMARY KEY, \
     parameter_name TEXT NOT NULL, \
     event_time TIMESTAMPTZ NOT NULL, \
     event_value DOUBLE PRECISION NOT NULL, \
     event_status INTEGER NOT NULL";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the PostgreSQL sink
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Connection URL (e.g., "postgres://localhost:5432/tally")
    pub url: String,

    /// Username, overriding the URL's (optional)
    pub username: Option<String>,

    /// Password, overriding the URL's (optional)
    pub password: Option<String>,

    /// Schema holding the partition tables
    pub schema: String,

    /// Prefix of every partition table name
    pub table_prefix: String,

    /// Column definitions used when creating a partition table
    pub column_ddl: String,

    /// Timeout for opening a connection
    pub connect_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/tally".into(),
            username: None,
            password: None,
            schema: DEFAULT_SCHEMA.into(),
            table_prefix: DEFAULT_TABLE_PREFIX.into(),
            column_ddl: DEFAULT_COLUMN_DDL.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl PostgresConfig {
    /// Set the connection URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the table prefix
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Set the column definitions for new partition tables
    pub fn with_column_ddl(mut self, ddl: impl Into<String>) -> Self {
        self.column_ddl = ddl.into();
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Whether `name` can be used inside a quoted identifier as-is
///
/// Allows ASCII letters, digits and underscores. The empty string is
/// accepted so an empty table prefix is valid.
pub fn is_identifier(name: &str) -> bool {
    name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
