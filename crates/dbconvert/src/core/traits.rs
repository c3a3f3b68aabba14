//! Collaborator contracts for source and target databases.
//!
//! Connectivity, catalog introspection and wire protocols live outside this
//! crate. The conversion orchestrator only talks to:
//!
//! - [`SourceDatabase`]: hands out a typed schema snapshot and pages of rows
//! - [`TargetDatabase`]: reports its own schema, runs scripts inside a transaction
//!   and accepts rows through parameterized inserts or a bulk-copy channel
//!
//! Every asynchronous call receives the run's [`CancellationToken`] so that
//! timeouts and Ctrl-C are honoured by the implementation as well.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::dialect::DatabaseType;
use crate::error::{ConvertError, Result};
use crate::schema::{SchemaInfo, Table};

use super::value::{Row, SqlValue};

/// Server and database a collaborator is connected to.
///
/// Used as the key of resumable error profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Dialect spoken by the server.
    pub db_type: DatabaseType,
    /// Host name or data source.
    pub server: String,
    /// Database (catalog) name.
    pub database: String,
}

impl ServerInfo {
    pub fn new(db_type: DatabaseType, server: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            db_type,
            server: server.into(),
            database: database.into(),
        }
    }
}

/// Read schema and data from the source database.
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Connection identity.
    fn server_info(&self) -> ServerInfo;

    /// Fetch the full schema snapshot.
    async fn fetch_schema(&self, cancel: &CancellationToken) -> Result<SchemaInfo>;

    /// Count the rows of a table.
    async fn row_count(&self, table: &Table, cancel: &CancellationToken) -> Result<u64>;

    /// Read up to `limit` rows starting at `offset`, ordered by primary key
    /// when the table has one.
    ///
    /// An empty vector means the table is exhausted.
    async fn read_page(
        &self,
        table: &Table,
        offset: u64,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>>;
}

/// Apply scripts and write rows to the target database.
///
/// Implementations own a single connection for the duration of a run; the
/// transaction methods act on that connection.
#[async_trait]
pub trait TargetDatabase: Send + Sync {
    /// Connection identity.
    fn server_info(&self) -> ServerInfo;

    /// Fetch the objects that already exist on the target.
    async fn fetch_schema(&self, cancel: &CancellationToken) -> Result<SchemaInfo>;

    // ===== Transaction Operations =====

    /// Open a transaction on the run's connection.
    async fn begin_transaction(&self) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> Result<()>;

    // ===== Script Operations =====

    /// Execute script text, returning the number of affected rows.
    async fn execute(&self, sql: &str, cancel: &CancellationToken) -> Result<u64>;

    /// Execute a parameterized statement.
    ///
    /// Placeholders follow [`placeholder`] for the target dialect.
    async fn execute_with_params(
        &self,
        sql: &str,
        params: Vec<SqlValue<'static>>,
        cancel: &CancellationToken,
    ) -> Result<u64>;

    // ===== Data Operations =====

    /// Whether the target accepts rows through [`TargetDatabase::bulk_copy`].
    fn supports_bulk_copy(&self) -> bool {
        false
    }

    /// Copy rows into a table through the engine's bulk protocol.
    async fn bulk_copy(
        &self,
        table: &Table,
        columns: &[String],
        rows: Vec<Row>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let _ = (columns, rows, cancel);
        Err(ConvertError::data_transfer(
            table.qualified_name(),
            "bulk copy is not supported by this target",
        ))
    }
}

/// Positional parameter placeholder for a dialect (1-based).
///
/// - SQL Server: `@p1`
/// - PostgreSQL: `$1`
/// - MySQL: `?`
/// - Oracle: `:1`
pub fn placeholder(db: DatabaseType, index: usize) -> String {
    match db {
        DatabaseType::SqlServer => format!("@p{}", index),
        DatabaseType::Postgres => format!("${}", index),
        DatabaseType::MySql => "?".to_string(),
        DatabaseType::Oracle => format!(":{}", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholder(DatabaseType::SqlServer, 2), "@p2");
        assert_eq!(placeholder(DatabaseType::Postgres, 1), "$1");
        assert_eq!(placeholder(DatabaseType::MySql, 9), "?");
        assert_eq!(placeholder(DatabaseType::Oracle, 3), ":3");
    }

    #[test]
    fn test_server_info_serializes_camel_case() {
        let info = ServerInfo::new(DatabaseType::MySql, "db1", "shop");
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"dbType\":\"mysql\""));
    }
}
