//! # dbconvert
//!
//! Cross-dialect translation of stored routines, views and triggers, and
//! schema plus data conversion between Oracle, SQL Server, MySQL and
//! PostgreSQL.
//!
//! The translation pipeline is:
//!
//! - **Parse**: a dialect grammar produces a syntax tree ([`parser`])
//! - **Adapt**: the tree becomes the dialect-neutral statement model ([`adapter`], [`model`])
//! - **Translate**: function calls and data types are rewritten ([`function`], [`dialect`])
//! - **Emit**: the model is rendered in the target dialect ([`emitter`])
//!
//! The [`orchestrator`] drives a whole conversion on top of it: schema
//! snapshots from the source and target collaborators, target schema
//! derivation, schema scripts and paged data transfer.
//!
//! ## Example
//!
//! ```rust
//! use dbconvert::dialect::DatabaseType;
//! use dbconvert::translate::TranslateEngine;
//! use dbconvert::ParseMode;
//!
//! let engine = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::MySql);
//! let function = engine
//!     .translate_text(
//!         "CREATE FUNCTION f(a IN NUMBER) RETURN NUMBER AS BEGIN RETURN NVL(a,0); END;",
//!         ParseMode::Function,
//!     )
//!     .unwrap();
//! assert!(function.contains("IFNULL(a,0)"));
//! ```

pub mod adapter;
pub mod config;
pub mod core;
pub mod dialect;
pub mod emitter;
pub mod error;
pub mod feedback;
pub mod function;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod schema;
pub mod state;
pub mod transfer;
pub mod translate;

// Re-exports for convenient access
pub use config::{ConversionOptions, GenerateScriptMode, SchemaMapping, TableNameMapping};
pub use core::{ServerInfo, SourceDatabase, SqlValue, TargetDatabase};
pub use dialect::DatabaseType;
pub use error::{ConvertError, Result};
pub use feedback::{Feedback, FeedbackInfo, FeedbackObserver, InfoType};
pub use orchestrator::{ConvertResult, Orchestrator};
pub use parser::ParseMode;
pub use schema::SchemaInfo;
pub use state::{ErrorProfile, ErrorProfileStore, FileProfileStore};
pub use translate::{TranslateEngine, TranslateObject, TranslateResult, TranslateSummary};
