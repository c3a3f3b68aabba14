//! Error types for the conversion library.

use thiserror::Error;

use crate::dialect::DatabaseType;

/// Main error type for translation and conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Source text could not be parsed.
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The emitter has no rendering for a statement in the target dialect.
    #[error("{construct} is not supported by the {dialect} emitter")]
    UnsupportedConstruct {
        dialect: DatabaseType,
        construct: String,
    },

    /// DDL execution failed on the target
    #[error("Schema transfer failed for {object}: {message}")]
    SchemaTransfer { object: String, message: String },

    /// Data transfer failed for a specific table
    #[error("Data transfer failed for table {table}: {message}")]
    DataTransfer { table: String, message: String },

    /// Conversion was cancelled (SIGINT, caller request, etc.)
    #[error("Conversion cancelled")]
    Cancelled,

    /// Configuration error (invalid YAML, bad mapping, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by a source or target database collaborator
    #[error("Database error: {0}")]
    Database(String),

    /// Error profile store failure
    #[error("State error: {0}")]
    State(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// Create a Syntax error at the given position.
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        ConvertError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create an UnsupportedConstruct error.
    pub fn unsupported(dialect: DatabaseType, construct: impl Into<String>) -> Self {
        ConvertError::UnsupportedConstruct {
            dialect,
            construct: construct.into(),
        }
    }

    /// Create a SchemaTransfer error
    pub fn schema_transfer(object: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::SchemaTransfer {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a DataTransfer error
    pub fn data_transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::DataTransfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether the error only invalidates the object being translated.
    ///
    /// Syntax and unsupported-construct errors never abort a batch on their own;
    /// the translation engine records them and applies the continue-on-error policy.
    pub fn is_object_scoped(&self) -> bool {
        matches!(
            self,
            ConvertError::Syntax { .. } | ConvertError::UnsupportedConstruct { .. }
        )
    }

    /// Process exit code used by the command line front end.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConvertError::Config(_) | ConvertError::Yaml(_) => 2,
            ConvertError::Syntax { .. } | ConvertError::UnsupportedConstruct { .. } => 3,
            ConvertError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
