//! Translation engine.
//!
//! Each object moves through `Parsed -> FunctionsTranslated -> Rendered ->
//! Recorded`, or ends in `Failed` when parsing or rendering fails. Failures
//! are captured in the object's [`TranslateResult`]; whether the batch goes
//! on after one is decided by the continue-on-error policy.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::{self, ParseMode};
use crate::config::SchemaMapping;
use crate::dialect::canonical::map_data_type;
use crate::dialect::DatabaseType;
use crate::emitter::{self, EmitOptions};
use crate::error::{ConvertError, Result};
use crate::feedback::{Feedback, InfoType};
use crate::function::FunctionTranslator;
use crate::model::{Script, TokenKind};
use crate::schema::ObjectType;

const OWNER: &str = "translate";

/// Source definition of one object to translate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateObject {
    pub object_type: ObjectType,
    pub schema: String,
    pub name: String,
    pub definition: String,
}

impl TranslateObject {
    pub fn new(
        object_type: ObjectType,
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            object_type,
            schema: schema.into(),
            name: name.into(),
            definition: definition.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    fn parse_mode(&self) -> ParseMode {
        match self.object_type {
            ObjectType::View => ParseMode::View,
            ObjectType::Procedure => ParseMode::Procedure,
            ObjectType::Function => ParseMode::Function,
            ObjectType::Trigger => ParseMode::Trigger,
            _ => ParseMode::Detect,
        }
    }
}

/// Outcome of translating one object. Exactly one of `script` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResult {
    pub object_type: ObjectType,
    pub object_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslateResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-object translation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateState {
    Parsed,
    FunctionsTranslated,
    Rendered,
    Recorded,
    Failed,
}

impl TranslateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslateState::Parsed => "parsed",
            TranslateState::FunctionsTranslated => "functions_translated",
            TranslateState::Rendered => "rendered",
            TranslateState::Recorded => "recorded",
            TranslateState::Failed => "failed",
        }
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateSummary {
    /// `Information` when every object translated, `Warning` when failures
    /// were recorded and the batch went on, `Error` when a failure stopped it.
    pub status: InfoType,
    pub results: Vec<TranslateResult>,
}

impl TranslateSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &TranslateResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TranslateResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// `"<type> <name>: <error>"` for every failed object.
    pub fn failure_messages(&self) -> Vec<String> {
        self.failed()
            .map(|r| {
                format!(
                    "{} {}: {}",
                    r.object_type,
                    r.object_name,
                    r.error.as_deref().unwrap_or_default()
                )
            })
            .collect()
    }
}

/// Translates object definitions from one dialect to another.
pub struct TranslateEngine {
    source: DatabaseType,
    target: DatabaseType,
    functions: FunctionTranslator,
    emit_options: EmitOptions,
    continue_on_error: bool,
    schema_mappings: Vec<SchemaMapping>,
    feedback: Feedback,
    results: Vec<TranslateResult>,
}

impl TranslateEngine {
    pub fn new(source: DatabaseType, target: DatabaseType) -> Self {
        Self {
            source,
            target,
            functions: FunctionTranslator::new(source, target),
            emit_options: EmitOptions::default(),
            continue_on_error: false,
            schema_mappings: Vec::new(),
            feedback: Feedback::new(),
            results: Vec::new(),
        }
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_hoist_declarations(mut self, hoist: bool) -> Self {
        self.emit_options.hoist_declarations = hoist;
        self
    }

    pub fn with_schema_mappings(mut self, mappings: Vec<SchemaMapping>) -> Self {
        self.schema_mappings = mappings;
        self
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn source(&self) -> DatabaseType {
        self.source
    }

    pub fn target(&self) -> DatabaseType {
        self.target
    }

    /// Results recorded so far, in translation order.
    pub fn results(&self) -> &[TranslateResult] {
        &self.results
    }

    /// Translate source text into target text without recording a result.
    pub fn translate_text(&self, definition: &str, mode: ParseMode) -> Result<String> {
        let mut script = adapter::parse(self.source, definition, mode)?;
        self.transition(&script, TranslateState::Parsed);
        self.translate_script(&mut script);
        self.transition(&script, TranslateState::FunctionsTranslated);
        let text = emitter::render(self.target, &script, &self.emit_options)?;
        self.transition(&script, TranslateState::Rendered);
        Ok(text)
    }

    /// Translate one object and record its result.
    ///
    /// Returns the object's error when it failed, after recording it.
    pub fn translate_object(&mut self, object: &TranslateObject) -> std::result::Result<(), String> {
        let name = object.qualified_name();
        let outcome = self.translate_text(&object.definition, object.parse_mode());
        let result = match outcome {
            Ok(script) => {
                debug!(object = %name, state = TranslateState::Recorded.as_str(), "translated");
                TranslateResult {
                    object_type: object.object_type,
                    object_name: name,
                    script: Some(script),
                    error: None,
                }
            }
            Err(e) => {
                debug!(object = %name, state = TranslateState::Failed.as_str(), error = %e, "translation failed");
                TranslateResult {
                    object_type: object.object_type,
                    object_name: name,
                    script: None,
                    error: Some(e.to_string()),
                }
            }
        };
        let error = result.error.clone();
        self.results.push(result);
        match error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Translate a batch in order.
    ///
    /// Object failures never surface as `Err`; only cancellation does.
    pub async fn translate_all(
        &mut self,
        objects: &[TranslateObject],
        cancel: &CancellationToken,
    ) -> Result<TranslateSummary> {
        let first = self.results.len();
        let mut status = InfoType::Information;
        for (i, object) in objects.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }
            self.feedback.info(
                OWNER,
                format!(
                    "({}/{}) Translating {} \"{}\".",
                    i + 1,
                    objects.len(),
                    object.object_type,
                    object.qualified_name()
                ),
            );
            if let Err(error) = self.translate_object(object) {
                let message = format!(
                    "Error occurred when translating {} \"{}\": {}",
                    object.object_type,
                    object.qualified_name(),
                    error
                );
                if self.continue_on_error {
                    self.feedback.warning(OWNER, message);
                    status = InfoType::Warning;
                } else {
                    self.feedback.error(OWNER, message);
                    status = InfoType::Error;
                    break;
                }
            }
            // Parsing is CPU bound; let other tasks run between objects.
            tokio::task::yield_now().await;
        }
        Ok(TranslateSummary {
            status,
            results: self.results[first..].to_vec(),
        })
    }

    /// Apply function, data type and schema translation to a parsed script.
    fn translate_script(&self, script: &mut Script) {
        if let Some(name) = script.object_name_mut() {
            if let Some(mapped) = map_schema(&self.schema_mappings, &name.schema) {
                name.schema = mapped;
            }
        }
        let (source, target) = (self.source, self.target);
        let mut rewritten = 0;
        script.visit_tokens_mut(&mut |token| {
            if token.kind == TokenKind::DataType {
                if source != target {
                    token.text = map_data_type(source, target, &token.text).target_type;
                }
            } else {
                rewritten += self.functions.translate_token(token);
            }
        });
        if let Script::Trigger(trigger) = script {
            if let Some((schema, table)) = trigger.table.text.split_once('.') {
                if let Some(mapped) = map_schema(&self.schema_mappings, schema) {
                    trigger.table.text = format!("{}.{}", mapped, table);
                }
            }
        }
        debug!(name = %script.name(), rewritten, "translated function calls");
    }

    fn transition(&self, script: &Script, state: TranslateState) {
        debug!(
            kind = script.kind_name(),
            name = %script.name(),
            state = state.as_str(),
            "translation state"
        );
    }
}

/// Target schema for a source schema, when a mapping names it.
pub(crate) fn map_schema(mappings: &[SchemaMapping], schema: &str) -> Option<String> {
    mappings
        .iter()
        .find(|m| m.source_schema.eq_ignore_ascii_case(schema))
        .map(|m| m.target_schema.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_text_maps_functions_and_types() {
        let engine = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::MySql);
        let out = engine
            .translate_text(
                "CREATE FUNCTION F(a IN NUMBER) RETURN NUMBER AS BEGIN RETURN NVL(a,0); END;",
                ParseMode::Function,
            )
            .unwrap();
        assert!(out.contains("IFNULL(a,0)"), "{}", out);
        assert!(!out.contains("NVL"));
        assert!(!out.contains("()"));
    }

    #[test]
    fn test_translate_object_records_failure() {
        let mut engine = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::Postgres);
        let broken = TranslateObject::new(ObjectType::Procedure, "hr", "broken", "CREATE PROCEDURE (");
        assert!(engine.translate_object(&broken).is_err());
        let recorded = &engine.results()[0];
        assert_eq!(recorded.object_name, "hr.broken");
        assert!(recorded.script.is_none());
        assert!(recorded.error.is_some());
    }

    #[test]
    fn test_schema_mapping_renames_object() {
        let engine = TranslateEngine::new(DatabaseType::SqlServer, DatabaseType::Postgres).with_schema_mappings(vec![
            SchemaMapping {
                source_schema: "dbo".into(),
                target_schema: "public".into(),
            },
        ]);
        let out = engine
            .translate_text("CREATE PROCEDURE dbo.touch AS BEGIN UPDATE t SET n = 1; END", ParseMode::Procedure)
            .unwrap();
        assert!(out.starts_with("CREATE OR REPLACE PROCEDURE public.touch"), "{}", out);
    }

    #[tokio::test]
    async fn test_stop_on_first_failure_without_continue() {
        let objects = vec![
            TranslateObject::new(ObjectType::Procedure, "", "bad", "CREATE PROCEDURE ("),
            TranslateObject::new(
                ObjectType::Procedure,
                "",
                "good",
                "CREATE PROCEDURE good AS BEGIN NULL; END;",
            ),
        ];
        let mut engine = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::Postgres);
        let summary = engine.translate_all(&objects, &CancellationToken::new()).await.unwrap();
        assert_eq!(summary.status, InfoType::Error);
        assert_eq!(summary.results.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut engine = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::Postgres);
        let objects = vec![TranslateObject::new(ObjectType::View, "", "v", "CREATE VIEW v AS SELECT 1 FROM DUAL")];
        let err = engine.translate_all(&objects, &cancel).await.unwrap_err();
        assert!(matches!(err, ConvertError::Cancelled));
    }
}
