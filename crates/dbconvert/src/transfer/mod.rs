//! Table data transfer with a read-ahead pager.
//!
//! One reader task pulls pages from the source and hands them to the writer
//! through a single-slot channel, so the next page is read while the current
//! one is written. The writer either:
//! - hands rows to the target's bulk-copy channel
//! - executes parameterized multi-row INSERTs on the target
//! - renders INSERTs with literal values into the generated script

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::{Page, Row, SourceDatabase, SqlValue, TargetDatabase};
use crate::error::{ConvertError, Result};
use crate::feedback::Feedback;
use crate::schema::{DdlGenerator, DdlStatement, Table};

const OWNER: &str = "transfer";

/// How pages reach the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    BulkCopy,
    Insert,
    /// Rows are rendered as INSERT statements; nothing touches the target.
    Script,
}

/// Transfer job for a single table.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// Table as named on the source.
    pub source_table: Table,

    /// Table as named on the target, after schema and table mappings.
    pub target_table: Table,

    /// Column names in source read order.
    pub columns: Vec<String>,
}

/// Statistics from a transfer job.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStats {
    pub table: String,

    /// Row count reported by the source before reading.
    pub total_rows: u64,

    /// Rows written (or rendered).
    pub rows: u64,

    pub pages: usize,

    #[serde(skip)]
    pub elapsed: Duration,

    pub completed: bool,
}

/// Outcome of one table transfer.
#[derive(Debug, Clone, Default)]
pub struct TableTransfer {
    pub stats: TransferStats,

    /// Rendered INSERTs in [`WriteMode::Script`] mode.
    pub statements: Vec<DdlStatement>,
}

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Rows per page read from the source.
    pub batch_size: usize,
    pub mode: WriteMode,
    /// Send a feedback message after every page.
    pub report_progress: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            mode: WriteMode::Insert,
            report_progress: true,
        }
    }
}

/// Moves table rows from the source to the target.
pub struct TransferEngine {
    source: Arc<dyn SourceDatabase>,
    target: Arc<dyn TargetDatabase>,
    generator: DdlGenerator,
    config: TransferConfig,
    feedback: Feedback,
    /// Optional shared counter for real-time progress reporting.
    progress_counter: Option<Arc<AtomicU64>>,
}

impl TransferEngine {
    pub fn new(
        source: Arc<dyn SourceDatabase>,
        target: Arc<dyn TargetDatabase>,
        generator: DdlGenerator,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            target,
            generator,
            config,
            feedback: Feedback::new(),
            progress_counter: None,
        }
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    /// Set a shared counter that tracks rows written for the current job.
    ///
    /// The counter is reset at the start of every job, so after a failure it
    /// holds the rows written before the failing page.
    pub fn with_progress_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.progress_counter = Some(counter);
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Transfer one table.
    pub async fn execute(&self, job: &TransferJob, cancel: &CancellationToken) -> Result<TableTransfer> {
        let table_name = job.source_table.qualified_name();
        let start = Instant::now();
        if let Some(counter) = &self.progress_counter {
            counter.store(0, Ordering::Relaxed);
        }

        let total_rows = self.source.row_count(&job.source_table, cancel).await?;
        info!(
            "Starting transfer for {} ({} rows, mode: {:?})",
            table_name, total_rows, self.config.mode
        );

        let mut out = TableTransfer {
            stats: TransferStats {
                table: table_name.clone(),
                total_rows,
                ..Default::default()
            },
            statements: Vec::new(),
        };
        if total_rows == 0 {
            out.stats.completed = true;
            return Ok(out);
        }

        // Single-slot channel: at most one page is read ahead of the writer.
        let (tx, mut rx) = mpsc::channel::<Page>(1);
        let reader = tokio::spawn(read_pages(
            Arc::clone(&self.source),
            job.source_table.clone(),
            self.config.batch_size.max(1),
            tx,
            cancel.clone(),
        ));

        let written = self.write_pages(job, &mut rx, &mut out, cancel).await;
        // Stop the reader if the writer bailed out early.
        drop(rx);

        let read = match reader.await {
            Ok(result) => result,
            Err(e) => Err(ConvertError::data_transfer(
                table_name.clone(),
                format!("Reader task failed: {}", e),
            )),
        };
        written?;
        read?;

        out.stats.elapsed = start.elapsed();
        out.stats.completed = true;
        info!(
            "{}: transferred {} rows in {} pages in {:?}",
            table_name, out.stats.rows, out.stats.pages, out.stats.elapsed
        );
        Ok(out)
    }

    async fn write_pages(
        &self,
        job: &TransferJob,
        rx: &mut mpsc::Receiver<Page>,
        out: &mut TableTransfer,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            let page = tokio::select! {
                _ = cancel.cancelled() => return Err(ConvertError::Cancelled),
                page = rx.recv() => page,
            };
            let Some(page) = page else {
                return Ok(());
            };
            let count = page.len() as u64;
            let is_last = page.is_last;
            if count > 0 {
                self.write_page(job, page.rows, out, cancel).await?;
                out.stats.rows += count;
                out.stats.pages += 1;
                if let Some(counter) = &self.progress_counter {
                    counter.fetch_add(count, Ordering::Relaxed);
                }
                if self.config.report_progress {
                    self.feedback.info(
                        OWNER,
                        progress_message(&job.target_table.name, count, out.stats.rows, out.stats.total_rows),
                    );
                }
            }
            if is_last {
                return Ok(());
            }
        }
    }

    async fn write_page(
        &self,
        job: &TransferJob,
        rows: Vec<Row>,
        out: &mut TableTransfer,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let table = &job.target_table;
        match self.config.mode {
            WriteMode::Script => {
                out.statements
                    .extend(self.generator.insert_rows(table, &job.columns, &rows));
            }
            WriteMode::BulkCopy if self.target.supports_bulk_copy() => {
                self.target.bulk_copy(table, &job.columns, rows, cancel).await?;
            }
            WriteMode::BulkCopy | WriteMode::Insert => {
                let per_statement = self.generator.rows_per_insert(job.columns.len());
                for chunk in rows.chunks(per_statement) {
                    let sql = self
                        .generator
                        .insert_with_placeholders(table, &job.columns, chunk.len());
                    let params: Vec<SqlValue<'static>> = chunk.iter().flatten().cloned().collect();
                    self.target.execute_with_params(&sql, params, cancel).await?;
                }
            }
        }
        Ok(())
    }
}

/// Read pages until the source is exhausted.
///
/// A page shorter than `batch_size` is the last one; an empty read ends the
/// table as well.
async fn read_pages(
    source: Arc<dyn SourceDatabase>,
    table: Table,
    batch_size: usize,
    tx: mpsc::Sender<Page>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut offset = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        // Claim the slot before reading so no page waits outside the channel.
        let Ok(permit) = tx.reserve().await else {
            // Writer is gone; its error is reported by the engine.
            return Ok(());
        };
        let rows = source.read_page(&table, offset, batch_size, &cancel).await?;
        let page = Page::new(offset, rows);
        let page = if page.len() < batch_size { page.mark_final() } else { page };
        let done = page.is_last;
        offset += page.len() as u64;
        debug!(table = %table.qualified_name(), offset, "read page");
        permit.send(page);
        if done {
            return Ok(());
        }
    }
}

/// `Table "orders": 500 records transferred. (1500/2000, 75%)`
pub fn progress_message(table: &str, page_rows: u64, transferred: u64, total: u64) -> String {
    format!(
        "Table \"{}\": {} records transferred. ({}/{}, {})",
        table,
        page_rows,
        transferred,
        total,
        percent(transferred, total)
    )
}

fn percent(done: u64, total: u64) -> String {
    if total == 0 {
        return "100%".to_string();
    }
    let pct = done as f64 * 100.0 / total as f64;
    if pct.fract() == 0.0 {
        format!("{}%", pct as u64)
    } else {
        format!("{:.2}%", pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServerInfo;
    use crate::dialect::DatabaseType;
    use crate::feedback::ChannelObserver;
    use crate::schema::SchemaInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Numbers {
        count: u64,
    }

    #[async_trait]
    impl SourceDatabase for Numbers {
        fn server_info(&self) -> ServerInfo {
            ServerInfo::new(DatabaseType::MySql, "src", "db")
        }

        async fn fetch_schema(&self, _cancel: &CancellationToken) -> Result<SchemaInfo> {
            Ok(SchemaInfo::default())
        }

        async fn row_count(&self, _table: &Table, _cancel: &CancellationToken) -> Result<u64> {
            Ok(self.count)
        }

        async fn read_page(
            &self,
            _table: &Table,
            offset: u64,
            limit: usize,
            _cancel: &CancellationToken,
        ) -> Result<Vec<Row>> {
            let end = (offset + limit as u64).min(self.count);
            Ok((offset..end).map(|i| vec![SqlValue::I64(i as i64)]).collect())
        }
    }

    #[derive(Default)]
    struct Recorder {
        bulk: bool,
        fail_after: Option<usize>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl TargetDatabase for Recorder {
        fn server_info(&self) -> ServerInfo {
            ServerInfo::new(DatabaseType::Postgres, "dst", "db")
        }

        async fn fetch_schema(&self, _cancel: &CancellationToken) -> Result<SchemaInfo> {
            Ok(SchemaInfo::default())
        }

        async fn begin_transaction(&self) -> Result<()> {
            Ok(())
        }

        async fn commit(&self) -> Result<()> {
            Ok(())
        }

        async fn rollback(&self) -> Result<()> {
            Ok(())
        }

        async fn execute(&self, _sql: &str, _cancel: &CancellationToken) -> Result<u64> {
            Ok(0)
        }

        async fn execute_with_params(
            &self,
            sql: &str,
            params: Vec<SqlValue<'static>>,
            _cancel: &CancellationToken,
        ) -> Result<u64> {
            let mut calls = self.calls.lock().unwrap();
            if self.fail_after.is_some_and(|n| calls.len() >= n) {
                return Err(ConvertError::Database("duplicate key".into()));
            }
            calls.push((sql.to_string(), params.len()));
            Ok(params.len() as u64)
        }

        fn supports_bulk_copy(&self) -> bool {
            self.bulk
        }

        async fn bulk_copy(
            &self,
            _table: &Table,
            _columns: &[String],
            rows: Vec<Row>,
            _cancel: &CancellationToken,
        ) -> Result<u64> {
            self.calls.lock().unwrap().push(("BULK".into(), rows.len()));
            Ok(rows.len() as u64)
        }
    }

    fn job() -> TransferJob {
        TransferJob {
            source_table: Table::new("", "numbers"),
            target_table: Table::new("public", "numbers"),
            columns: vec!["n".into()],
        }
    }

    fn engine(count: u64, target: Arc<Recorder>, mode: WriteMode, batch_size: usize) -> TransferEngine {
        TransferEngine::new(
            Arc::new(Numbers { count }),
            target,
            DdlGenerator::new(DatabaseType::MySql, DatabaseType::Postgres),
            TransferConfig {
                batch_size,
                mode,
                report_progress: true,
            },
        )
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_reaches_total() {
        let (observer, mut rx) = ChannelObserver::new();
        let target = Arc::new(Recorder::default());
        let engine = engine(1050, target.clone(), WriteMode::Insert, 500)
            .with_feedback(Feedback::new().with_observer(Arc::new(observer)));

        let result = engine.execute(&job(), &CancellationToken::new()).await.unwrap();
        assert_eq!(result.stats.rows, 1050);
        assert_eq!(result.stats.pages, 3);
        assert!(result.stats.completed);

        let mut seen = Vec::new();
        while let Ok(info) = rx.try_recv() {
            let done: u64 = info
                .message
                .split('(')
                .nth(1)
                .and_then(|s| s.split('/').next())
                .unwrap()
                .parse()
                .unwrap();
            seen.push(done);
        }
        assert_eq!(seen, vec![500, 1000, 1050]);
        assert_eq!(target.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_bulk_copy_used_when_supported() {
        let target = Arc::new(Recorder {
            bulk: true,
            ..Default::default()
        });
        let result = engine(10, target.clone(), WriteMode::BulkCopy, 4)
            .execute(&job(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.stats.rows, 10);
        let calls = target.calls.lock().unwrap();
        assert!(calls.iter().all(|(sql, _)| sql == "BULK"));
        assert_eq!(calls.iter().map(|(_, n)| n).sum::<usize>(), 10);
    }

    #[tokio::test]
    async fn test_script_mode_renders_inserts() {
        let target = Arc::new(Recorder::default());
        let result = engine(3, target.clone(), WriteMode::Script, 2)
            .execute(&job(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.statements.len(), 2);
        assert_eq!(
            result.statements[0].sql,
            "INSERT INTO \"public\".\"numbers\" (\"n\") VALUES\n(0),\n(1)"
        );
        assert!(target.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_count() {
        let counter = Arc::new(AtomicU64::new(0));
        let target = Arc::new(Recorder {
            fail_after: Some(1),
            ..Default::default()
        });
        let err = engine(10, target, WriteMode::Insert, 4)
            .with_progress_counter(counter.clone())
            .execute(&job(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
        assert_eq!(counter.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine(10, Arc::new(Recorder::default()), WriteMode::Insert, 4)
            .execute(&job(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Cancelled));
    }

    /// Shared read/write counters for the read-ahead bound.
    #[derive(Default)]
    struct Pacing {
        reads: AtomicU64,
        writes: AtomicU64,
        max_ahead: AtomicU64,
    }

    struct PacedSource(Arc<Pacing>);

    #[async_trait]
    impl SourceDatabase for PacedSource {
        fn server_info(&self) -> ServerInfo {
            ServerInfo::new(DatabaseType::MySql, "src", "db")
        }

        async fn fetch_schema(&self, _cancel: &CancellationToken) -> Result<SchemaInfo> {
            Ok(SchemaInfo::default())
        }

        async fn row_count(&self, _table: &Table, _cancel: &CancellationToken) -> Result<u64> {
            Ok(20)
        }

        async fn read_page(
            &self,
            _table: &Table,
            offset: u64,
            limit: usize,
            _cancel: &CancellationToken,
        ) -> Result<Vec<Row>> {
            let reads = self.0.reads.fetch_add(1, Ordering::SeqCst) + 1;
            let ahead = reads - self.0.writes.load(Ordering::SeqCst);
            self.0.max_ahead.fetch_max(ahead, Ordering::SeqCst);
            let end = (offset + limit as u64).min(20);
            Ok((offset..end).map(|i| vec![SqlValue::I64(i as i64)]).collect())
        }
    }

    struct SlowTarget(Arc<Pacing>);

    #[async_trait]
    impl TargetDatabase for SlowTarget {
        fn server_info(&self) -> ServerInfo {
            ServerInfo::new(DatabaseType::Postgres, "dst", "db")
        }

        async fn fetch_schema(&self, _cancel: &CancellationToken) -> Result<SchemaInfo> {
            Ok(SchemaInfo::default())
        }

        async fn begin_transaction(&self) -> Result<()> {
            Ok(())
        }

        async fn commit(&self) -> Result<()> {
            Ok(())
        }

        async fn rollback(&self) -> Result<()> {
            Ok(())
        }

        async fn execute(&self, _sql: &str, _cancel: &CancellationToken) -> Result<u64> {
            Ok(0)
        }

        async fn execute_with_params(
            &self,
            _sql: &str,
            params: Vec<SqlValue<'static>>,
            _cancel: &CancellationToken,
        ) -> Result<u64> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.0.writes.fetch_add(1, Ordering::SeqCst);
            Ok(params.len() as u64)
        }
    }

    #[tokio::test]
    async fn test_reader_holds_at_most_one_unconsumed_page() {
        let pacing = Arc::new(Pacing::default());
        let engine = TransferEngine::new(
            Arc::new(PacedSource(Arc::clone(&pacing))),
            Arc::new(SlowTarget(Arc::clone(&pacing))),
            DdlGenerator::new(DatabaseType::MySql, DatabaseType::Postgres),
            TransferConfig {
                batch_size: 1,
                mode: WriteMode::Insert,
                report_progress: false,
            },
        );

        let result = engine.execute(&job(), &CancellationToken::new()).await.unwrap();
        assert_eq!(result.stats.rows, 20);
        // One page in the writer, one waiting in the channel.
        assert!(pacing.max_ahead.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_progress_message() {
        assert_eq!(
            progress_message("orders", 500, 1500, 2000),
            "Table \"orders\": 500 records transferred. (1500/2000, 75%)"
        );
        assert_eq!(percent(1, 3), "33.33%");
        assert_eq!(percent(0, 0), "100%");
    }
}
