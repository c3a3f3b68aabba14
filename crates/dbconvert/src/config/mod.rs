//! Conversion options loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

impl ConversionOptions {
    /// Load options from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        let options: ConversionOptions = if yaml.trim().is_empty() {
            ConversionOptions::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        options.validate()?;
        Ok(options)
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// SHA256 of the canonical YAML form, recorded with error profiles.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Target schema for `schema`, or `None` when no mapping names it.
    pub fn mapped_schema(&self, schema: &str) -> Option<&str> {
        self.schema_mappings
            .iter()
            .find(|m| m.source_schema.eq_ignore_ascii_case(schema))
            .map(|m| m.target_schema.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let options = ConversionOptions::from_yaml("").unwrap();
        assert_eq!(options, ConversionOptions::default());
        assert_eq!(options.data_batch_size, 500);
        assert!(options.hoist_declarations);
    }

    #[test]
    fn test_camel_case_keys_and_aliases() {
        let options = ConversionOptions::from_yaml(
            "useTransaction: true\n\
             continueWhenErrorOccurs: true\n\
             notCreateIfExists: true\n\
             generateScriptMode: schema\n\
             schemaMappings:\n  - sourceSchema: dbo\n    targetSchema: public\n",
        )
        .unwrap();
        assert!(options.use_transaction);
        assert!(options.continue_on_error_occurs);
        assert!(options.exclude_existing_objects);
        assert_eq!(options.generate_script_mode, GenerateScriptMode::Schema);
        assert_eq!(options.mapped_schema("DBO"), Some("public"));
        assert!(options.includes_schema());
        assert!(!options.includes_data());
    }

    #[test]
    fn test_hash_changes_with_options() {
        let a = ConversionOptions::default();
        let b = ConversionOptions {
            bulk_copy: false,
            ..ConversionOptions::default()
        };
        assert_eq!(a.hash(), ConversionOptions::default().hash());
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_translate_policy() {
        let mut options = ConversionOptions::default();
        assert!(options.translate_continues_on_error());
        options.execute_script_on_target_server = true;
        assert!(!options.translate_continues_on_error());
        options.continue_on_error_occurs = true;
        assert!(options.translate_continues_on_error());
    }

    #[test]
    fn test_only_for_translate_skips_data() {
        let options = ConversionOptions {
            only_for_translate: true,
            generate_script_mode: GenerateScriptMode::Data,
            ..ConversionOptions::default()
        };
        assert!(options.includes_schema());
        assert!(!options.includes_data());
    }
}
