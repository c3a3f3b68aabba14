//! Whole-run scenarios against in-memory collaborators.

mod common;

use std::sync::Arc;

use common::{add_table, MemorySource, MemoryTarget};
use dbconvert::feedback::ChannelObserver;
use dbconvert::schema::{SchemaInfo, ScriptObject};
use dbconvert::{
    ConversionOptions, ConvertError, DatabaseType, ErrorProfileStore, Feedback, FileProfileStore,
    GenerateScriptMode, InfoType, Orchestrator,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const TABLES: [&str; 5] = ["orders", "customers", "items", "invoices", "payments"];

fn source_schema() -> SchemaInfo {
    let mut schema = SchemaInfo::default();
    for name in TABLES {
        add_table(&mut schema, "public", name);
    }
    schema
}

fn source_with_rows(schema: SchemaInfo) -> MemorySource {
    TABLES
        .iter()
        .fold(MemorySource::new(DatabaseType::Postgres, schema), |source, name| {
            source.with_rows(&format!("public.{}", name), 3)
        })
}

fn executing() -> ConversionOptions {
    ConversionOptions {
        execute_script_on_target_server: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_excluding_existing_tables_creates_only_the_delta() {
    let mut existing = SchemaInfo::default();
    for name in ["orders", "items", "payments"] {
        add_table(&mut existing, "public", name);
    }
    let source = Arc::new(source_with_rows(source_schema()));
    let target = Arc::new(MemoryTarget::new(DatabaseType::Postgres, existing));
    let options = ConversionOptions {
        exclude_existing_objects: true,
        ..executing()
    };

    let result = Orchestrator::new(source, target.clone(), options).run().await.unwrap();
    assert_eq!(result.info_type, InfoType::Information, "{:?}", result.failures);

    let executed = target.executed();
    let creates: Vec<_> = executed.iter().filter(|s| s.starts_with("CREATE TABLE")).collect();
    assert_eq!(creates.len(), 2, "{:#?}", executed);
    assert!(creates.iter().any(|s| s.contains("customers")));
    assert!(creates.iter().any(|s| s.contains("invoices")));
    for skipped in ["orders", "items", "payments"] {
        assert!(executed.iter().all(|s| !s.contains(skipped)), "{} touched", skipped);
    }

    let inserts = executed.iter().filter(|s| s.starts_with("INSERT INTO")).count();
    assert_eq!(inserts, 2);
    assert_eq!(result.tables.len(), 2);
    assert!(result.tables.iter().all(|t| t.rows_transferred == 3));
}

#[tokio::test]
async fn test_failure_inside_transaction_rolls_back() {
    let source = Arc::new(source_with_rows(source_schema()));
    let target = Arc::new(
        MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default()).failing_on("INSERT INTO"),
    );
    let options = ConversionOptions {
        use_transaction: true,
        ..executing()
    };

    let result = Orchestrator::new(source, target.clone(), options).run().await.unwrap();
    assert_eq!(result.info_type, InfoType::Error);
    assert!(!result.is_success());
    assert_eq!(target.transactions(), vec!["begin", "rollback"]);
    assert!(result.failures.iter().any(|f| f.contains("orders")), "{:?}", result.failures);
}

#[tokio::test]
async fn test_failed_table_leaves_error_profile_until_clean_rerun() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileProfileStore::new(dir.path().join("profiles.json")));
    let options = ConversionOptions {
        generate_script_mode: GenerateScriptMode::Data,
        continue_on_error_occurs: true,
        ..executing()
    };

    let source = Arc::new(source_with_rows(source_schema()));
    let target = Arc::new(
        MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default()).failing_on("invoices"),
    );
    let result = Orchestrator::new(source.clone(), target, options.clone())
        .with_profile_store(store.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(result.info_type, InfoType::Warning);
    assert_eq!(result.tables.iter().filter(|t| t.error.is_none()).count(), 4);

    let profiles = store.list().await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].key.source_table, "public.invoices");
    assert_eq!(profiles[0].options_hash, options.hash());

    let target = Arc::new(MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default()));
    let result = Orchestrator::new(source, target, options)
        .with_profile_store(store.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(result.info_type, InfoType::Information);
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_on_first_schema_error() {
    let source = Arc::new(source_with_rows(source_schema()));
    let target = Arc::new(
        MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default())
            .failing_on("CREATE TABLE \"public\".\"items\""),
    );

    let result = Orchestrator::new(source, target.clone(), executing()).run().await.unwrap();
    assert_eq!(result.info_type, InfoType::Error);
    assert!(target.executed().iter().all(|s| !s.starts_with("INSERT INTO")));
}

#[tokio::test]
async fn test_table_failure_is_fatal_even_when_continuing() {
    let source = Arc::new(source_with_rows(source_schema()));
    let target = Arc::new(
        MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default())
            .failing_on("CREATE TABLE \"public\".\"customers\""),
    );
    let options = ConversionOptions {
        continue_on_error_occurs: true,
        ..executing()
    };

    let result = Orchestrator::new(source, target.clone(), options).run().await.unwrap();
    assert_eq!(result.info_type, InfoType::Error, "{:?}", result.failures);
    let executed = target.executed();
    assert!(executed.iter().all(|s| !s.contains("\"items\"")), "{:#?}", executed);
    assert!(executed.iter().all(|s| !s.starts_with("INSERT INTO")));
}

#[tokio::test]
async fn test_single_script_failure_is_fatal_even_when_continuing() {
    let source = Arc::new(source_with_rows(source_schema()));
    let target = Arc::new(
        MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default()).failing_on("CREATE TABLE"),
    );
    let options = ConversionOptions {
        continue_on_error_occurs: true,
        split_scripts_to_execute: false,
        ..executing()
    };

    let result = Orchestrator::new(source, target.clone(), options).run().await.unwrap();
    assert_eq!(result.info_type, InfoType::Error);
    assert!(target.executed().iter().all(|s| !s.starts_with("INSERT INTO")));
}

#[tokio::test]
async fn test_cancelled_run_returns_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let source = Arc::new(source_with_rows(source_schema()));
    let target = Arc::new(MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default()));

    let err = Orchestrator::new(source, target.clone(), executing())
        .with_cancel_token(cancel)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Cancelled));
    assert!(target.executed().is_empty());
}

#[tokio::test]
async fn test_translate_only_continues_past_broken_procedure() {
    let mut schema = SchemaInfo::default();
    add_table(&mut schema, "", "ignored");
    schema.procedures = vec![
        ScriptObject::new("", "p_first", "CREATE PROCEDURE p_first AS BEGIN NULL; END;"),
        ScriptObject::new("", "p_broken", "CREATE PROCEDURE p_broken AS BEGIN IF THEN"),
        ScriptObject::new("", "p_third", "CREATE PROCEDURE p_third AS BEGIN NULL; END;"),
    ];
    let source = Arc::new(MemorySource::new(DatabaseType::Oracle, schema));
    let target = Arc::new(MemoryTarget::new(DatabaseType::Postgres, SchemaInfo::default()));
    let options = ConversionOptions {
        only_for_translate: true,
        continue_on_error_occurs: true,
        ..Default::default()
    };

    let result = Orchestrator::new(source, target.clone(), options).run().await.unwrap();
    assert_eq!(result.info_type, InfoType::Warning);
    assert_eq!(result.message, "Translate has finished, but some errors occurred.");
    assert_eq!(result.translate_results.len(), 3);
    assert_eq!(result.translate_results.iter().filter(|r| r.is_success()).count(), 2);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].contains("p_broken"));
    assert!(target.executed().is_empty());
}

#[tokio::test]
async fn test_script_mode_reports_monotonic_progress() {
    let mut schema = SchemaInfo::default();
    add_table(&mut schema, "public", "orders");
    let source =
        Arc::new(MemorySource::new(DatabaseType::Postgres, schema).with_rows("public.orders", 1050));
    let target = Arc::new(MemoryTarget::new(DatabaseType::MySql, SchemaInfo::default()));
    let (observer, mut rx) = ChannelObserver::new();
    let options = ConversionOptions {
        generate_script_mode: GenerateScriptMode::Data,
        ..Default::default()
    };

    let result = Orchestrator::new(source, target.clone(), options)
        .with_feedback(Feedback::new().with_observer(Arc::new(observer)))
        .run()
        .await
        .unwrap();
    assert_eq!(result.info_type, InfoType::Information);
    assert!(target.executed().is_empty());
    let script = result.script.unwrap();
    assert_eq!(script.matches("INSERT INTO").count(), 3);

    let mut progress = Vec::new();
    while let Ok(info) = rx.try_recv() {
        if info.message.contains("records transferred") {
            progress.push(info.message);
        }
    }
    assert_eq!(progress.len(), 3, "{:#?}", progress);
    assert!(progress[0].contains("(500/1050"));
    assert!(progress[1].contains("(1000/1050"));
    assert!(progress[2].contains("(1050/1050, 100%)"));
}
