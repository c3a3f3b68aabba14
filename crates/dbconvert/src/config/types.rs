//! Conversion option types.

use serde::{Deserialize, Serialize};

/// Options controlling one conversion run.
///
/// Keys are camelCase in YAML; every field has a default so an empty
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    /// Use the target's bulk-copy channel for data when it has one (default: true).
    pub bulk_copy: bool,

    /// Run schema and data statements inside one transaction (default: false).
    pub use_transaction: bool,

    /// Record per-object failures and keep going (default: false).
    #[serde(alias = "continueWhenErrorOccurs", alias = "continueOnError")]
    pub continue_on_error_occurs: bool,

    /// Execute generated statements one at a time (default: true).
    pub split_scripts_to_execute: bool,

    /// Apply scripts and rows to the target instead of only generating text
    /// (default: false).
    pub execute_script_on_target_server: bool,

    /// Create target schemas that do not exist yet (default: true).
    pub create_schema_if_not_exists: bool,

    /// Source schema to target schema renames.
    pub schema_mappings: Vec<SchemaMapping>,

    /// Source table to target table renames.
    pub table_name_mappings: Vec<TableNameMapping>,

    /// Keep only self-referencing foreign keys (default: false).
    pub ignore_not_self_foreign_key: bool,

    /// Prefix primary key names with the table name (default: false).
    pub ensure_primary_key_name_unique: bool,

    /// Prefix index names with the table name (default: false).
    pub ensure_index_name_unique: bool,

    /// Which parts of the source to convert (default: both).
    pub generate_script_mode: GenerateScriptMode,

    /// Skip objects that already exist on the target (default: false).
    #[serde(alias = "notCreateIfExists")]
    pub exclude_existing_objects: bool,

    /// Rows per page read from the source (default: 500).
    pub data_batch_size: usize,

    /// Declare routine variables once at the top of the body (default: true).
    pub hoist_declarations: bool,

    /// Translate routines, views and triggers only; no tables or data
    /// (default: false).
    pub only_for_translate: bool,

    /// Report per-object progress messages (default: true).
    pub output_remind_information: bool,

    /// Replace single-attribute user-defined types by the attribute's type
    /// (default: true).
    #[serde(alias = "useOriginalDataTypeIfUdtHasOnlyOneAttr")]
    pub use_original_data_type_if_udt_has_one_attr: bool,

    /// Schema used on the target for objects of the source's default schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            bulk_copy: true,
            use_transaction: false,
            continue_on_error_occurs: false,
            split_scripts_to_execute: true,
            execute_script_on_target_server: false,
            create_schema_if_not_exists: true,
            schema_mappings: Vec::new(),
            table_name_mappings: Vec::new(),
            ignore_not_self_foreign_key: false,
            ensure_primary_key_name_unique: false,
            ensure_index_name_unique: false,
            generate_script_mode: GenerateScriptMode::Both,
            exclude_existing_objects: false,
            data_batch_size: default_data_batch_size(),
            hoist_declarations: true,
            only_for_translate: false,
            output_remind_information: true,
            use_original_data_type_if_udt_has_one_attr: true,
            default_schema: None,
        }
    }
}

impl ConversionOptions {
    /// Whether the schema phase runs.
    pub fn includes_schema(&self) -> bool {
        self.only_for_translate
            || matches!(
                self.generate_script_mode,
                GenerateScriptMode::Schema | GenerateScriptMode::Both
            )
    }

    /// Whether the data phase runs.
    pub fn includes_data(&self) -> bool {
        !self.only_for_translate
            && matches!(
                self.generate_script_mode,
                GenerateScriptMode::Data | GenerateScriptMode::Both
            )
    }

    /// Continue-on-error policy of the translation engine.
    ///
    /// Generating a script without executing it never stops at a broken
    /// object: the failure is recorded and reported with the script.
    pub fn translate_continues_on_error(&self) -> bool {
        self.continue_on_error_occurs || (!self.execute_script_on_target_server && !self.only_for_translate)
    }
}

/// Schema rename applied to the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMapping {
    pub source_schema: String,
    pub target_schema: String,
}

/// Table rename applied to the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNameMapping {
    /// Schema of the source table; empty matches any schema.
    #[serde(default)]
    pub schema: String,
    pub source_name: String,
    pub target_name: String,
}

/// Parts of the source to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateScriptMode {
    /// Tables, keys, indexes, views, routines and triggers.
    Schema,

    /// Table rows only.
    Data,

    #[default]
    Both,
}

impl GenerateScriptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerateScriptMode::Schema => "schema",
            GenerateScriptMode::Data => "data",
            GenerateScriptMode::Both => "both",
        }
    }
}

fn default_data_batch_size() -> usize {
    500
}
