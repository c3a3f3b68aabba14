//! Conversion options validation.

use std::collections::HashSet;

use tracing::warn;

use super::{ConversionOptions, GenerateScriptMode};
use crate::error::{ConvertError, Result};

/// Validate the options.
pub fn validate(options: &ConversionOptions) -> Result<()> {
    if options.data_batch_size == 0 {
        return Err(ConvertError::Config("dataBatchSize must be at least 1".into()));
    }

    let mut schemas = HashSet::new();
    for mapping in &options.schema_mappings {
        if mapping.target_schema.trim().is_empty() {
            return Err(ConvertError::Config(format!(
                "schemaMappings: target schema for '{}' is empty",
                mapping.source_schema
            )));
        }
        if !schemas.insert(mapping.source_schema.to_ascii_lowercase()) {
            return Err(ConvertError::Config(format!(
                "schemaMappings: source schema '{}' is mapped more than once",
                mapping.source_schema
            )));
        }
    }

    let mut tables = HashSet::new();
    for mapping in &options.table_name_mappings {
        if mapping.source_name.trim().is_empty() || mapping.target_name.trim().is_empty() {
            return Err(ConvertError::Config(
                "tableNameMappings: source and target names are required".into(),
            ));
        }
        let key = (
            mapping.schema.to_ascii_lowercase(),
            mapping.source_name.to_ascii_lowercase(),
        );
        if !tables.insert(key) {
            return Err(ConvertError::Config(format!(
                "tableNameMappings: table '{}' is mapped more than once",
                mapping.source_name
            )));
        }
    }

    if options.bulk_copy && options.generate_script_mode == GenerateScriptMode::Schema {
        warn!("bulkCopy has no effect when generateScriptMode is schema");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchemaMapping, TableNameMapping};

    fn mapping(source: &str, target: &str) -> SchemaMapping {
        SchemaMapping {
            source_schema: source.into(),
            target_schema: target.into(),
        }
    }

    #[test]
    fn test_default_options_are_valid() {
        assert!(validate(&ConversionOptions::default()).is_ok());
    }

    #[test]
    fn test_zero_batch_size() {
        let options = ConversionOptions {
            data_batch_size: 0,
            ..ConversionOptions::default()
        };
        let err = validate(&options).unwrap_err();
        assert!(err.to_string().contains("dataBatchSize"));
    }

    #[test]
    fn test_duplicate_schema_mapping() {
        let options = ConversionOptions {
            schema_mappings: vec![mapping("dbo", "public"), mapping("DBO", "app")],
            ..ConversionOptions::default()
        };
        assert!(validate(&options).is_err());
    }

    #[test]
    fn test_empty_target_schema() {
        let options = ConversionOptions {
            schema_mappings: vec![mapping("dbo", " ")],
            ..ConversionOptions::default()
        };
        assert!(validate(&options).is_err());
    }

    #[test]
    fn test_table_mappings() {
        let ok = TableNameMapping {
            schema: "dbo".into(),
            source_name: "Orders".into(),
            target_name: "orders".into(),
        };
        let mut options = ConversionOptions {
            table_name_mappings: vec![ok.clone()],
            ..ConversionOptions::default()
        };
        assert!(validate(&options).is_ok());

        options.table_name_mappings.push(TableNameMapping {
            target_name: "orders2".into(),
            ..ok.clone()
        });
        assert!(validate(&options).is_err());

        options.table_name_mappings = vec![TableNameMapping {
            target_name: String::new(),
            ..ok
        }];
        assert!(validate(&options).is_err());
    }

    #[test]
    fn test_bulk_copy_with_schema_only_is_allowed() {
        let options = ConversionOptions {
            generate_script_mode: GenerateScriptMode::Schema,
            ..ConversionOptions::default()
        };
        assert!(validate(&options).is_ok());
    }
}
