//! Conversion orchestrator - main workflow coordinator.
//!
//! A run moves through
//! `FetchSourceSchema → ComputeTargetSchema → SyncSchemaOnTarget → TransferData → Finalize`.
//! Schema sync is skipped when scripts are only generated; cancellation ends
//! the run from any phase with [`ConvertError::Cancelled`] after rolling back
//! an open transaction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConversionOptions, SchemaMapping};
use crate::core::{SourceDatabase, TargetDatabase};
use crate::error::{ConvertError, Result};
use crate::feedback::{Feedback, InfoType};
use crate::schema::{
    compute_target_schema, missing_schemas, target_schema_name, target_table, terminate, DdlGenerator,
    DdlStatement, DialectPair, ObjectType, SchemaInfo,
};
use crate::state::{ErrorProfile, ErrorProfileStore, NoopProfileStore, ProfileKey};
use crate::transfer::{TransferConfig, TransferEngine, TransferJob, WriteMode};
use crate::translate::{TranslateEngine, TranslateObject, TranslateResult};

const OWNER: &str = "convert";

/// Phase of a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvertPhase {
    FetchSourceSchema,
    ComputeTargetSchema,
    SyncSchemaOnTarget,
    TransferData,
    Finalize,
}

impl ConvertPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvertPhase::FetchSourceSchema => "fetch_source_schema",
            ConvertPhase::ComputeTargetSchema => "compute_target_schema",
            ConvertPhase::SyncSchemaOnTarget => "sync_schema_on_target",
            ConvertPhase::TransferData => "transfer_data",
            ConvertPhase::Finalize => "finalize",
        }
    }
}

/// Data transfer outcome of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResult {
    pub source_table: String,
    pub target_table: String,
    pub total_rows: u64,
    pub rows_transferred: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a conversion run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResult {
    /// Unique run identifier.
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,

    /// Terminal status: information, warning (finished with recorded
    /// failures) or error.
    pub info_type: InfoType,

    pub message: String,

    pub translate_results: Vec<TranslateResult>,

    /// Failure messages of objects and tables, in occurrence order.
    pub failures: Vec<String>,

    pub tables: Vec<TableResult>,

    /// Generated script when nothing is executed on the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl ConvertResult {
    /// Pretty-printed JSON for `--output json` and result files.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_success(&self) -> bool {
        self.info_type != InfoType::Error
    }
}

/// Mutable bookkeeping of one run.
struct RunState {
    result: ConvertResult,
    has_error: bool,
    /// A failure was absorbed by continue-on-error.
    continued: bool,
    in_transaction: bool,
}

impl RunState {
    fn fail(&mut self, message: impl Into<String>) {
        self.has_error = true;
        self.result.failures.push(message.into());
    }
}

/// Conversion orchestrator.
pub struct Orchestrator {
    source: Arc<dyn SourceDatabase>,
    target: Arc<dyn TargetDatabase>,
    options: ConversionOptions,
    feedback: Feedback,
    profiles: Arc<dyn ErrorProfileStore>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn SourceDatabase>,
        target: Arc<dyn TargetDatabase>,
        options: ConversionOptions,
    ) -> Self {
        Self {
            source,
            target,
            options,
            feedback: Feedback::new(),
            profiles: Arc::new(NoopProfileStore::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_profile_store(mut self, profiles: Arc<dyn ErrorProfileStore>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn dialects(&self) -> DialectPair {
        DialectPair::new(self.source.server_info().db_type, self.target.server_info().db_type)
    }

    fn enter(&self, phase: ConvertPhase) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        info!(phase = phase.as_str(), "entering phase");
        Ok(())
    }

    /// Run the conversion.
    pub async fn run(self) -> Result<ConvertResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let dialects = self.dialects();
        info!(
            "Starting conversion run {} ({} to {})",
            run_id, dialects.source, dialects.target
        );

        let mut run = RunState {
            result: ConvertResult {
                run_id,
                started_at,
                completed_at: started_at,
                info_type: InfoType::Information,
                message: String::new(),
                translate_results: Vec::new(),
                failures: Vec::new(),
                tables: Vec::new(),
                script: None,
            },
            has_error: false,
            continued: false,
            in_transaction: false,
        };

        match self.run_phases(&mut run, dialects).await {
            Ok(()) => {}
            Err(ConvertError::Cancelled) => {
                self.rollback(&mut run).await;
                warn!("Conversion cancelled");
                self.feedback.warning(OWNER, "Convert has been cancelled.");
                return Err(ConvertError::Cancelled);
            }
            Err(e) => {
                self.rollback(&mut run).await;
                error!("Conversion failed: {}", e);
                self.feedback.error(OWNER, e.to_string());
                run.fail(e.to_string());
                run.result.info_type = InfoType::Error;
                run.result.message = e.to_string();
            }
        }
        run.result.completed_at = Utc::now();
        Ok(run.result)
    }

    async fn run_phases(&self, run: &mut RunState, dialects: DialectPair) -> Result<()> {
        let options = &self.options;

        // ===== FetchSourceSchema =====
        self.enter(ConvertPhase::FetchSourceSchema)?;
        let source_schema = self.source.fetch_schema(&self.cancel).await?;
        let needs_existing = options.exclude_existing_objects
            || (options.execute_script_on_target_server && options.create_schema_if_not_exists);
        let existing = if needs_existing {
            Some(self.target.fetch_schema(&self.cancel).await?)
        } else {
            None
        };
        info!(
            "Found {} tables and {} other objects on the source",
            source_schema.tables.len(),
            source_schema.object_count() - source_schema.tables.len()
        );

        // ===== ComputeTargetSchema =====
        self.enter(ConvertPhase::ComputeTargetSchema)?;
        let mut target_schema = compute_target_schema(&source_schema, existing.as_ref(), options, dialects);
        if options.only_for_translate {
            keep_script_objects(&mut target_schema);
        }
        let generator = DdlGenerator::new(dialects.source, dialects.target);

        let mut statements = Vec::new();
        if options.includes_schema() {
            if !self.translate_objects(run, &source_schema, &target_schema, dialects).await? {
                run.result.info_type = InfoType::Error;
                run.result.message = "Convert failed.".into();
                return Ok(());
            }
            if options.only_for_translate {
                self.finish_translate_only(run);
                return Ok(());
            }
            statements = self.schema_statements(run, &generator, &target_schema, existing.as_ref(), dialects);
        }

        // ===== SyncSchemaOnTarget =====
        if options.execute_script_on_target_server {
            self.enter(ConvertPhase::SyncSchemaOnTarget)?;
            if options.includes_schema() && statements.is_empty() && !options.includes_data() {
                self.feedback.info(OWNER, "The script to create schema is empty.");
                run.result.message = "No any script to execute.".into();
                return Ok(());
            }
            if options.use_transaction {
                self.target.begin_transaction().await?;
                run.in_transaction = true;
            }
            if !self.sync_schema(run, &statements).await? {
                self.finalize(run).await?;
                return Ok(());
            }
            statements.clear();
        }

        // ===== TransferData =====
        if options.includes_data() {
            self.enter(ConvertPhase::TransferData)?;
            let data = self
                .transfer_data(run, &source_schema, &target_schema, generator, dialects)
                .await?;
            statements.extend(data);
        }

        if !options.execute_script_on_target_server {
            let script = statements
                .iter()
                .map(|s| terminate(dialects.target, &s.sql))
                .collect::<Vec<_>>()
                .join("\n\n");
            run.result.script = Some(script);
        }

        self.finalize(run).await
    }

    /// Translate views, routines and triggers of the target schema.
    ///
    /// Returns `false` when a failure stopped the batch.
    async fn translate_objects(
        &self,
        run: &mut RunState,
        source_schema: &SchemaInfo,
        target_schema: &SchemaInfo,
        dialects: DialectPair,
    ) -> Result<bool> {
        let objects = script_objects(target_schema);
        if objects.is_empty() {
            return Ok(true);
        }
        let continue_on_error = self.options.translate_continues_on_error();
        let mut engine = TranslateEngine::new(dialects.source, dialects.target)
            .with_continue_on_error(continue_on_error)
            .with_hoist_declarations(self.options.hoist_declarations)
            .with_schema_mappings(effective_schema_mappings(source_schema, &self.options, dialects))
            .with_feedback(self.feedback.clone());

        let summary = engine.translate_all(&objects, &self.cancel).await?;
        run.result.failures.extend(summary.failure_messages());
        run.result.translate_results = summary.results.clone();
        match summary.status {
            InfoType::Information => Ok(true),
            InfoType::Warning => {
                run.has_error = true;
                run.continued = true;
                Ok(true)
            }
            InfoType::Error => {
                run.has_error = true;
                Ok(false)
            }
        }
    }

    fn finish_translate_only(&self, run: &mut RunState) {
        let (info_type, message) = if run.has_error {
            (InfoType::Warning, "Translate has finished, but some errors occurred.")
        } else {
            (InfoType::Information, "Translate has finished.")
        };
        run.result.info_type = info_type;
        run.result.message = message.into();
        self.feedback.send(info_type, OWNER, message);
    }

    fn schema_statements(
        &self,
        run: &RunState,
        generator: &DdlGenerator,
        target_schema: &SchemaInfo,
        existing: Option<&SchemaInfo>,
        dialects: DialectPair,
    ) -> Vec<DdlStatement> {
        let mut statements = Vec::new();
        if self.options.create_schema_if_not_exists {
            let empty = SchemaInfo::default();
            for schema in missing_schemas(target_schema, existing.unwrap_or(&empty), dialects.target) {
                if schema.eq_ignore_ascii_case(dialects.target.default_schema()) {
                    continue;
                }
                statements.extend(generator.create_schema(&schema));
            }
        }
        statements.extend(generator.table_statements(target_schema));
        statements.extend(
            run.result
                .translate_results
                .iter()
                .filter_map(|r| {
                    r.script
                        .as_ref()
                        .map(|script| DdlStatement::new(r.object_type, r.object_name.clone(), script.clone()))
                }),
        );
        debug!(count = statements.len(), "generated schema statements");
        statements
    }

    /// Execute schema statements on the target.
    ///
    /// Returns `false` when a failure stops the run.
    async fn sync_schema(&self, run: &mut RunState, statements: &[DdlStatement]) -> Result<bool> {
        if statements.is_empty() {
            return Ok(true);
        }
        self.feedback.info(OWNER, "Begin to sync schema...");

        if !self.options.split_scripts_to_execute {
            let target = self.target.server_info().db_type;
            let script = statements
                .iter()
                .map(|s| terminate(target, &s.sql))
                .collect::<Vec<_>>()
                .join("\n");
            if let Err(e) = self.target.execute(&script, &self.cancel).await {
                cancelled(&e)?;
                let message = ConvertError::schema_transfer("script", e.to_string()).to_string();
                self.feedback.error(OWNER, &message);
                run.fail(message);
                // A single script cannot be traced back to one object.
                run.continued = false;
                return Ok(false);
            }
        } else {
            let count = statements.len();
            for (i, statement) in statements.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return Err(ConvertError::Cancelled);
                }
                if self.options.output_remind_information {
                    self.feedback.info(
                        OWNER,
                        format!("({}/{}), executing:\n {}", i + 1, count, statement.sql),
                    );
                }
                if let Err(e) = self.target.execute(&statement.sql, &self.cancel).await {
                    cancelled(&e)?;
                    let message = ConvertError::schema_transfer(
                        format!("{} {}", statement.object_type, statement.object_name),
                        e.to_string(),
                    )
                    .to_string();
                    self.feedback.error(OWNER, &message);
                    run.fail(message);
                    let skippable = self.options.continue_on_error_occurs
                        && statement.object_type.is_script_object();
                    if !skippable {
                        run.continued = false;
                        return Ok(false);
                    }
                    run.continued = true;
                }
            }
        }
        self.feedback.info(OWNER, "End sync schema.");
        Ok(true)
    }

    async fn transfer_data(
        &self,
        run: &mut RunState,
        source_schema: &SchemaInfo,
        target_schema: &SchemaInfo,
        generator: DdlGenerator,
        dialects: DialectPair,
    ) -> Result<Vec<DdlStatement>> {
        let options = &self.options;
        let mode = if !options.execute_script_on_target_server {
            WriteMode::Script
        } else if options.bulk_copy && self.target.supports_bulk_copy() {
            WriteMode::BulkCopy
        } else {
            WriteMode::Insert
        };
        let counter = Arc::new(AtomicU64::new(0));
        let engine = TransferEngine::new(
            Arc::clone(&self.source),
            Arc::clone(&self.target),
            generator,
            TransferConfig {
                batch_size: options.data_batch_size,
                mode,
                report_progress: options.output_remind_information,
            },
        )
        .with_feedback(self.feedback.clone())
        .with_progress_counter(Arc::clone(&counter));

        let source_info = self.source.server_info();
        let target_info = self.target.server_info();
        let mut statements = Vec::new();

        let jobs: Vec<TransferJob> = source_schema
            .tables
            .iter()
            .filter_map(|table| {
                let mapped = target_table(table, options, dialects);
                target_schema.contains_table(&mapped.schema, &mapped.name).then(|| TransferJob {
                    source_table: table.clone(),
                    target_table: mapped,
                    columns: source_schema.columns_of(table).iter().map(|c| c.name.clone()).collect(),
                })
            })
            .collect();
        info!("Transferring data of {} tables ({:?})", jobs.len(), mode);

        for job in &jobs {
            let key = ProfileKey::new(
                &source_info,
                &job.source_table.qualified_name(),
                &target_info,
                &job.target_table.qualified_name(),
            );
            match engine.execute(job, &self.cancel).await {
                Ok(transfer) => {
                    run.result.tables.push(TableResult {
                        source_table: job.source_table.qualified_name(),
                        target_table: job.target_table.qualified_name(),
                        total_rows: transfer.stats.total_rows,
                        rows_transferred: transfer.stats.rows,
                        error: None,
                    });
                    statements.extend(transfer.statements);
                    if mode != WriteMode::Script {
                        if let Err(e) = self.profiles.remove(&key).await {
                            warn!("Failed to clear error profile of {}: {}", job.source_table.qualified_name(), e);
                        }
                    }
                }
                Err(ConvertError::Cancelled) => return Err(ConvertError::Cancelled),
                Err(e) => {
                    let rows = counter.load(Ordering::Relaxed);
                    let err = ConvertError::data_transfer(job.source_table.qualified_name(), e.to_string());
                    run.result.tables.push(TableResult {
                        source_table: job.source_table.qualified_name(),
                        target_table: job.target_table.qualified_name(),
                        total_rows: 0,
                        rows_transferred: rows,
                        error: Some(e.to_string()),
                    });
                    // Inside a transaction the whole run is rolled back.
                    if options.use_transaction {
                        return Err(err);
                    }
                    self.feedback.error(OWNER, err.to_string());
                    run.fail(err.to_string());
                    if mode != WriteMode::Script {
                        self.save_profile(key, rows, &e).await;
                    }
                    if options.continue_on_error_occurs {
                        run.continued = true;
                    }
                }
            }
        }
        Ok(statements)
    }

    async fn save_profile(&self, key: ProfileKey, rows: u64, error: &ConvertError) {
        let profile = ErrorProfile::new(key, self.options.hash(), rows, error.to_string());
        if let Err(e) = self.profiles.save(&profile).await {
            warn!(
                "Failed to save error profile ({}) of {}: {}",
                self.profiles.backend_type(),
                profile.key.source_table,
                e
            );
        }
    }

    // ===== Finalize =====

    async fn finalize(&self, run: &mut RunState) -> Result<()> {
        self.enter(ConvertPhase::Finalize)?;
        if run.in_transaction {
            let can_commit = !run.has_error || run.continued;
            if can_commit {
                self.target.commit().await?;
                run.in_transaction = false;
            } else {
                self.rollback(run).await;
            }
        }

        let (info_type, message) = if !run.has_error {
            (InfoType::Information, "Convert has finished.")
        } else if run.continued {
            (InfoType::Warning, "Convert has finished, but some errors occurred.")
        } else {
            (InfoType::Error, "Convert failed.")
        };
        run.result.info_type = info_type;
        if run.result.message.is_empty() {
            run.result.message = message.into();
        }
        self.feedback.send(info_type, OWNER, message);
        Ok(())
    }

    async fn rollback(&self, run: &mut RunState) {
        if !run.in_transaction {
            return;
        }
        run.in_transaction = false;
        if let Err(e) = self.target.rollback().await {
            warn!("Rollback failed: {}", e);
        }
    }
}

fn cancelled(e: &ConvertError) -> Result<()> {
    if matches!(e, ConvertError::Cancelled) {
        Err(ConvertError::Cancelled)
    } else {
        Ok(())
    }
}

/// Drop tables and their children; views, routines and triggers stay.
fn keep_script_objects(schema: &mut SchemaInfo) {
    schema.tables.clear();
    schema.columns.clear();
    schema.primary_keys.clear();
    schema.foreign_keys.clear();
    schema.indexes.clear();
}

/// Functions first, then views, procedures and triggers, so that dependents
/// come after what they use.
fn script_objects(schema: &SchemaInfo) -> Vec<TranslateObject> {
    let routines = schema
        .functions
        .iter()
        .map(|f| (ObjectType::Function, f))
        .chain(schema.views.iter().map(|v| (ObjectType::View, v)))
        .chain(schema.procedures.iter().map(|p| (ObjectType::Procedure, p)));
    routines
        .map(|(kind, o)| TranslateObject::new(kind, o.schema.clone(), o.name.clone(), o.definition.clone()))
        .chain(
            schema
                .triggers
                .iter()
                .map(|t| TranslateObject::new(ObjectType::Trigger, t.schema.clone(), t.name.clone(), t.definition.clone())),
        )
        .collect()
}

/// Explicit schema mappings plus the implicit ones: every source schema that
/// lands under another name on the target.
fn effective_schema_mappings(
    source: &SchemaInfo,
    options: &ConversionOptions,
    dialects: DialectPair,
) -> Vec<SchemaMapping> {
    let mut mappings = options.schema_mappings.clone();
    let names = source
        .schemas
        .iter()
        .chain(source.tables.iter().map(|t| &t.schema))
        .chain(source.views.iter().map(|v| &v.schema))
        .chain(source.functions.iter().map(|f| &f.schema))
        .chain(source.procedures.iter().map(|p| &p.schema))
        .chain(source.triggers.iter().map(|t| &t.schema));
    for schema in names {
        if schema.is_empty() || mappings.iter().any(|m| m.source_schema.eq_ignore_ascii_case(schema)) {
            continue;
        }
        let target = target_schema_name(schema, options, dialects);
        if target != *schema {
            mappings.push(SchemaMapping {
                source_schema: schema.clone(),
                target_schema: target,
            });
        }
    }
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DatabaseType;
    use crate::schema::{ScriptObject, Table, TableColumn};

    #[test]
    fn test_effective_schema_mappings() {
        let source = SchemaInfo {
            schemas: vec!["dbo".into(), "sales".into()],
            ..Default::default()
        };
        let options = ConversionOptions::default();
        let mappings = effective_schema_mappings(
            &source,
            &options,
            DialectPair::new(DatabaseType::SqlServer, DatabaseType::Postgres),
        );
        assert_eq!(
            mappings,
            vec![SchemaMapping {
                source_schema: "dbo".into(),
                target_schema: "public".into(),
            }]
        );
    }

    #[test]
    fn test_script_object_order() {
        let schema = SchemaInfo {
            views: vec![ScriptObject::new("dbo", "v", "")],
            functions: vec![ScriptObject::new("dbo", "f", "")],
            procedures: vec![ScriptObject::new("dbo", "p", "")],
            ..Default::default()
        };
        let names: Vec<_> = script_objects(&schema).into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["f", "v", "p"]);
    }

    #[test]
    fn test_keep_script_objects() {
        let table = Table::new("dbo", "t");
        let mut schema = SchemaInfo {
            columns: vec![TableColumn::new(&table, "id", "int", false)],
            tables: vec![table],
            views: vec![ScriptObject::new("dbo", "v", "")],
            ..Default::default()
        };
        keep_script_objects(&mut schema);
        assert!(schema.tables.is_empty() && schema.columns.is_empty());
        assert_eq!(schema.views.len(), 1);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(ConvertPhase::SyncSchemaOnTarget.as_str(), "sync_schema_on_target");
    }
}
