//! In-memory source and target collaborators for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dbconvert::core::{Row, ServerInfo, SourceDatabase, SqlValue, TargetDatabase};
use dbconvert::schema::{PrimaryKey, SchemaInfo, Table, TableColumn};
use dbconvert::{ConvertError, DatabaseType, Result};
use tokio_util::sync::CancellationToken;

pub struct MemorySource {
    pub info: ServerInfo,
    pub schema: SchemaInfo,
    pub rows: HashMap<String, Vec<Row>>,
}

impl MemorySource {
    pub fn new(db_type: DatabaseType, schema: SchemaInfo) -> Self {
        Self {
            info: ServerInfo::new(db_type, "source-host", "shop"),
            schema,
            rows: HashMap::new(),
        }
    }

    pub fn with_rows(mut self, table: &str, count: i32) -> Self {
        let rows = (1..=count).map(|i| vec![SqlValue::I32(i)]).collect();
        self.rows.insert(table.to_string(), rows);
        self
    }
}

#[async_trait]
impl SourceDatabase for MemorySource {
    fn server_info(&self) -> ServerInfo {
        self.info.clone()
    }

    async fn fetch_schema(&self, _cancel: &CancellationToken) -> Result<SchemaInfo> {
        Ok(self.schema.clone())
    }

    async fn row_count(&self, table: &Table, _cancel: &CancellationToken) -> Result<u64> {
        Ok(self.rows.get(&table.qualified_name()).map_or(0, |r| r.len() as u64))
    }

    async fn read_page(
        &self,
        table: &Table,
        offset: u64,
        limit: usize,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Row>> {
        let rows = self.rows.get(&table.qualified_name()).cloned().unwrap_or_default();
        Ok(rows.into_iter().skip(offset as usize).take(limit).collect())
    }
}

pub struct MemoryTarget {
    pub info: ServerInfo,
    pub schema: SchemaInfo,
    /// Statements containing this text fail.
    pub fail_on: Option<String>,
    pub executed: Mutex<Vec<String>>,
    pub transactions: Mutex<Vec<&'static str>>,
}

impl MemoryTarget {
    pub fn new(db_type: DatabaseType, schema: SchemaInfo) -> Self {
        Self {
            info: ServerInfo::new(db_type, "target-host", "shop"),
            schema,
            fail_on: None,
            executed: Mutex::new(Vec::new()),
            transactions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn transactions(&self) -> Vec<&'static str> {
        self.transactions.lock().unwrap().clone()
    }

    fn record(&self, sql: &str) -> Result<()> {
        if self.fail_on.as_deref().is_some_and(|f| sql.contains(f)) {
            return Err(ConvertError::Database(format!("rejected: {}", sql)));
        }
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }
}

#[async_trait]
impl TargetDatabase for MemoryTarget {
    fn server_info(&self) -> ServerInfo {
        self.info.clone()
    }

    async fn fetch_schema(&self, _cancel: &CancellationToken) -> Result<SchemaInfo> {
        Ok(self.schema.clone())
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.transactions.lock().unwrap().push("begin");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.transactions.lock().unwrap().push("commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.transactions.lock().unwrap().push("rollback");
        Ok(())
    }

    async fn execute(&self, sql: &str, _cancel: &CancellationToken) -> Result<u64> {
        self.record(sql)?;
        Ok(0)
    }

    async fn execute_with_params(
        &self,
        sql: &str,
        params: Vec<SqlValue<'static>>,
        _cancel: &CancellationToken,
    ) -> Result<u64> {
        self.record(sql)?;
        Ok(params.len() as u64)
    }
}

/// Add a one-column table with a primary key.
pub fn add_table(schema: &mut SchemaInfo, schema_name: &str, name: &str) {
    let table = Table::new(schema_name, name);
    schema.columns.push(TableColumn::new(&table, "id", "integer", false));
    schema.primary_keys.push(PrimaryKey {
        schema: schema_name.into(),
        table_name: name.into(),
        name: format!("pk_{}", name),
        columns: vec!["id".into()],
    });
    schema.tables.push(table);
}
