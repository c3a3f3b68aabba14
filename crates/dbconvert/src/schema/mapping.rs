//! Target schema derivation.
//!
//! [`compute_target_schema`] clones the source snapshot and applies, in
//! order: user-defined type flattening, table renames, schema renames, data
//! type mapping, exclusion of objects the target already has, foreign key
//! pruning and unique constraint naming. The source snapshot is never touched.

use std::collections::HashSet;

use tracing::debug;

use crate::config::{ConversionOptions, TableNameMapping};
use crate::dialect::{map_data_type, DatabaseType};

use super::types::{SchemaInfo, Table};

/// Dialects on either side of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectPair {
    pub source: DatabaseType,
    pub target: DatabaseType,
}

impl DialectPair {
    pub fn new(source: DatabaseType, target: DatabaseType) -> Self {
        Self { source, target }
    }
}

/// Derive the schema to create on the target.
///
/// `existing` is the target's own snapshot; it is consulted only when
/// `exclude_existing_objects` is set.
pub fn compute_target_schema(
    source: &SchemaInfo,
    existing: Option<&SchemaInfo>,
    options: &ConversionOptions,
    dialects: DialectPair,
) -> SchemaInfo {
    let mut target = source.clone();

    if options.use_original_data_type_if_udt_has_one_attr && dialects.source != dialects.target {
        flatten_single_attribute_types(&mut target);
    }
    if !options.table_name_mappings.is_empty() {
        map_table_names(&mut target, &options.table_name_mappings);
    }
    map_schemas(&mut target, options, dialects);
    map_column_types(&mut target, dialects);

    if options.exclude_existing_objects {
        if let Some(existing) = existing {
            exclude_existing_objects(&mut target, existing);
        }
    }
    if options.ignore_not_self_foreign_key {
        target.foreign_keys.retain(|fk| fk.is_self_referencing());
    }
    let max_len = dialects.target.max_identifier_length();
    if options.ensure_primary_key_name_unique {
        ensure_primary_key_names_unique(&mut target, max_len);
    }
    if options.ensure_index_name_unique {
        ensure_index_names_unique(&mut target, max_len);
    }

    debug!(
        tables = target.tables.len(),
        excluded = source.tables.len() - target.tables.len(),
        "computed target schema"
    );
    target
}

/// Target schema name for a source schema.
///
/// An explicit mapping wins; the source dialect's default schema (or no
/// schema) becomes the configured default or the target dialect's default.
pub fn target_schema_name(schema: &str, options: &ConversionOptions, dialects: DialectPair) -> String {
    if let Some(mapped) = options.mapped_schema(schema) {
        return mapped.to_string();
    }
    let source_default = dialects.source.default_schema();
    if schema.is_empty() || (!source_default.is_empty() && schema.eq_ignore_ascii_case(source_default)) {
        return options
            .default_schema
            .clone()
            .unwrap_or_else(|| dialects.target.default_schema().to_string());
    }
    schema.to_string()
}

/// Target name of a source table after schema and table name mappings.
pub fn target_table(table: &Table, options: &ConversionOptions, dialects: DialectPair) -> Table {
    let name = table_mapping(&options.table_name_mappings, &table.schema, &table.name).unwrap_or(&table.name);
    Table {
        schema: target_schema_name(&table.schema, options, dialects),
        name: name.to_string(),
        comment: table.comment.clone(),
    }
}

/// Schemas the target must have for `target` that `existing` lacks.
///
/// Only SQL Server and PostgreSQL have schemas separate from databases.
pub fn missing_schemas(target: &SchemaInfo, existing: &SchemaInfo, db: DatabaseType) -> Vec<String> {
    if !matches!(db, DatabaseType::SqlServer | DatabaseType::Postgres) {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let names = target
        .tables
        .iter()
        .map(|t| &t.schema)
        .chain(target.views.iter().map(|v| &v.schema))
        .chain(target.functions.iter().map(|f| &f.schema))
        .chain(target.procedures.iter().map(|p| &p.schema))
        .chain(target.schemas.iter());
    for schema in names {
        if schema.is_empty() || existing.contains_schema(schema) {
            continue;
        }
        if seen.insert(schema.to_ascii_lowercase()) {
            out.push(schema.clone());
        }
    }
    out
}

fn flatten_single_attribute_types(schema: &mut SchemaInfo) {
    let types = schema.user_defined_types.clone();
    for column in &mut schema.columns {
        let Some(udt) = types.iter().find(|u| u.name.eq_ignore_ascii_case(&column.data_type)) else {
            continue;
        };
        if let [attribute] = udt.attributes.as_slice() {
            debug!(column = %column.name, udt = %udt.name, "using underlying type of single attribute UDT");
            column.data_type = attribute.data_type.clone();
        }
    }
}

fn table_mapping<'m>(mappings: &'m [TableNameMapping], schema: &str, name: &str) -> Option<&'m str> {
    mappings
        .iter()
        .find(|m| {
            (m.schema.is_empty() || m.schema.eq_ignore_ascii_case(schema))
                && m.source_name.eq_ignore_ascii_case(name)
        })
        .map(|m| m.target_name.as_str())
}

fn map_table_names(schema: &mut SchemaInfo, mappings: &[TableNameMapping]) {
    let rename = |s: &str, name: &mut String| {
        if let Some(target) = table_mapping(mappings, s, name) {
            *name = target.to_string();
        }
    };
    for t in &mut schema.tables {
        rename(&t.schema, &mut t.name);
    }
    for c in &mut schema.columns {
        rename(&c.schema, &mut c.table_name);
    }
    for k in &mut schema.primary_keys {
        rename(&k.schema, &mut k.table_name);
    }
    for k in &mut schema.foreign_keys {
        rename(&k.schema, &mut k.table_name);
        rename(&k.referenced_schema, &mut k.referenced_table);
    }
    for i in &mut schema.indexes {
        rename(&i.schema, &mut i.table_name);
    }
    for t in &mut schema.triggers {
        rename(&t.schema, &mut t.table_name);
    }
}

fn map_schemas(schema: &mut SchemaInfo, options: &ConversionOptions, dialects: DialectPair) {
    let map = |s: &mut String| *s = target_schema_name(s, options, dialects);
    schema.schemas.iter_mut().for_each(map);
    schema.tables.iter_mut().for_each(|t| map(&mut t.schema));
    schema.columns.iter_mut().for_each(|c| map(&mut c.schema));
    schema.primary_keys.iter_mut().for_each(|k| map(&mut k.schema));
    for k in &mut schema.foreign_keys {
        map(&mut k.schema);
        map(&mut k.referenced_schema);
    }
    schema.indexes.iter_mut().for_each(|i| map(&mut i.schema));
    schema.triggers.iter_mut().for_each(|t| map(&mut t.schema));
    schema
        .views
        .iter_mut()
        .chain(schema.functions.iter_mut())
        .chain(schema.procedures.iter_mut())
        .for_each(|o| map(&mut o.schema));
    schema.user_defined_types.iter_mut().for_each(|u| map(&mut u.schema));

    let mut seen = HashSet::new();
    schema.schemas.retain(|s| !s.is_empty() && seen.insert(s.to_ascii_lowercase()));
}

fn map_column_types(schema: &mut SchemaInfo, dialects: DialectPair) {
    if dialects.source == dialects.target {
        return;
    }
    for column in &mut schema.columns {
        column.data_type = map_data_type(dialects.source, dialects.target, &column.data_type).target_type;
    }
}

fn exclude_existing_objects(schema: &mut SchemaInfo, existing: &SchemaInfo) {
    let existing_tables: Vec<(String, String)> = schema
        .tables
        .iter()
        .filter(|t| existing.contains_table(&t.schema, &t.name))
        .map(|t| (t.schema.clone(), t.name.clone()))
        .collect();
    for (s, name) in &existing_tables {
        debug!(table = %format!("{}.{}", s, name), "skipping table that exists on the target");
        schema.remove_table(s, name);
    }

    let present = |list: &[super::types::ScriptObject], s: &str, n: &str| {
        list.iter()
            .any(|o| o.schema.eq_ignore_ascii_case(s) && o.name.eq_ignore_ascii_case(n))
    };
    schema.views.retain(|v| !present(&existing.views, &v.schema, &v.name));
    schema.functions.retain(|f| !present(&existing.functions, &f.schema, &f.name));
    schema.procedures.retain(|p| !present(&existing.procedures, &p.schema, &p.name));
    schema.triggers.retain(|t| {
        !existing
            .triggers
            .iter()
            .any(|e| e.schema.eq_ignore_ascii_case(&t.schema) && e.name.eq_ignore_ascii_case(&t.name))
    });
}

/// `{table}_{name}`, unless the name already mentions the table, cut to the
/// dialect's identifier length and made unique against `taken`.
fn unique_name(name: &str, table: &str, prefix: &str, max_len: usize, taken: &mut HashSet<String>) -> String {
    let base = if name.is_empty() || name.eq_ignore_ascii_case("PRIMARY") {
        format!("{}_{}", prefix, table)
    } else if name.to_ascii_lowercase().contains(&table.to_ascii_lowercase()) {
        name.to_string()
    } else {
        format!("{}_{}", table, name)
    };
    let base: String = base.chars().take(max_len).collect();
    let mut candidate = base.clone();
    let mut n = 1;
    while !taken.insert(candidate.to_ascii_lowercase()) {
        let suffix = format!("_{}", n);
        let keep = max_len.saturating_sub(suffix.len());
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    candidate
}

fn ensure_primary_key_names_unique(schema: &mut SchemaInfo, max_len: usize) {
    let mut taken = HashSet::new();
    for key in &mut schema.primary_keys {
        key.name = unique_name(&key.name, &key.table_name, "PK", max_len, &mut taken);
    }
}

fn ensure_index_names_unique(schema: &mut SchemaInfo, max_len: usize) {
    let mut taken = HashSet::new();
    for index in &mut schema.indexes {
        index.name = unique_name(&index.name, &index.table_name, "IX", max_len, &mut taken);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaMapping;
    use crate::schema::types::*;

    fn table(schema: &mut SchemaInfo, s: &str, name: &str) {
        let t = Table::new(s, name);
        schema.columns.push(TableColumn::new(&t, "id", "int", false));
        schema.primary_keys.push(PrimaryKey {
            schema: s.into(),
            table_name: name.into(),
            name: "PRIMARY".into(),
            columns: vec!["id".into()],
        });
        schema.tables.push(t);
    }

    fn mssql_to_pg() -> DialectPair {
        DialectPair::new(DatabaseType::SqlServer, DatabaseType::Postgres)
    }

    #[test]
    fn test_default_schema_maps_to_target_default() {
        let mut source = SchemaInfo::default();
        table(&mut source, "dbo", "orders");
        table(&mut source, "sales", "items");
        let target = compute_target_schema(&source, None, &ConversionOptions::default(), mssql_to_pg());
        assert_eq!(target.tables[0].schema, "public");
        assert_eq!(target.tables[1].schema, "sales");
        assert_eq!(target.columns[0].schema, "public");
        assert_eq!(source.tables[0].schema, "dbo");
    }

    #[test]
    fn test_explicit_mappings() {
        let mut source = SchemaInfo::default();
        table(&mut source, "dbo", "Orders");
        let options = ConversionOptions {
            schema_mappings: vec![SchemaMapping {
                source_schema: "dbo".into(),
                target_schema: "shop".into(),
            }],
            table_name_mappings: vec![TableNameMapping {
                schema: String::new(),
                source_name: "orders".into(),
                target_name: "order_header".into(),
            }],
            ..ConversionOptions::default()
        };
        let target = compute_target_schema(&source, None, &options, mssql_to_pg());
        assert!(target.contains_table("shop", "order_header"));
        assert_eq!(target.columns[0].table_name, "order_header");
        assert_eq!(target.primary_keys[0].table_name, "order_header");
    }

    #[test]
    fn test_column_types_are_mapped() {
        let mut source = SchemaInfo::default();
        table(&mut source, "dbo", "t");
        source.columns[0].data_type = "nvarchar(50)".into();
        let target = compute_target_schema(&source, None, &ConversionOptions::default(), mssql_to_pg());
        assert_ne!(target.columns[0].data_type, "nvarchar(50)");
    }

    #[test]
    fn test_exclude_existing_tables() {
        let mut source = SchemaInfo::default();
        for name in ["a", "b", "c", "d", "e"] {
            table(&mut source, "public", name);
        }
        let mut existing = SchemaInfo::default();
        for name in ["a", "c", "e"] {
            table(&mut existing, "public", name);
        }
        let options = ConversionOptions {
            exclude_existing_objects: true,
            ..ConversionOptions::default()
        };
        let pg = DialectPair::new(DatabaseType::Postgres, DatabaseType::Postgres);
        let target = compute_target_schema(&source, Some(&existing), &options, pg);
        let names: Vec<_> = target.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d"]);
        assert_eq!(target.columns.len(), 2);
    }

    #[test]
    fn test_foreign_key_pruning() {
        let mut source = SchemaInfo::default();
        source.foreign_keys = vec![
            ForeignKey {
                schema: "dbo".into(),
                table_name: "emp".into(),
                name: "fk_manager".into(),
                referenced_schema: "dbo".into(),
                referenced_table: "emp".into(),
                ..Default::default()
            },
            ForeignKey {
                schema: "dbo".into(),
                table_name: "emp".into(),
                name: "fk_dept".into(),
                referenced_schema: "dbo".into(),
                referenced_table: "dept".into(),
                ..Default::default()
            },
        ];
        let options = ConversionOptions {
            ignore_not_self_foreign_key: true,
            ..ConversionOptions::default()
        };
        let target = compute_target_schema(&source, None, &options, mssql_to_pg());
        assert_eq!(target.foreign_keys.len(), 1);
        assert_eq!(target.foreign_keys[0].name, "fk_manager");
    }

    #[test]
    fn test_unique_constraint_names() {
        let mut source = SchemaInfo::default();
        table(&mut source, "dbo", "orders");
        table(&mut source, "dbo", "items");
        source.indexes = vec![
            Index {
                schema: "dbo".into(),
                table_name: "orders".into(),
                name: "ix_date".into(),
                ..Default::default()
            },
            Index {
                schema: "dbo".into(),
                table_name: "items".into(),
                name: "ix_date".into(),
                ..Default::default()
            },
        ];
        let options = ConversionOptions {
            ensure_primary_key_name_unique: true,
            ensure_index_name_unique: true,
            ..ConversionOptions::default()
        };
        let target = compute_target_schema(&source, None, &options, mssql_to_pg());
        assert_eq!(target.primary_keys[0].name, "PK_orders");
        assert_eq!(target.primary_keys[1].name, "PK_items");
        assert_eq!(target.indexes[0].name, "orders_ix_date");
        assert_eq!(target.indexes[1].name, "items_ix_date");
    }

    #[test]
    fn test_unique_name_suffix_and_length() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("pk_t", "t", "PK", 30, &mut taken), "pk_t");
        assert_eq!(unique_name("pk_t", "t", "PK", 30, &mut taken), "pk_t_1");
        let long = unique_name("x", &"t".repeat(40), "PK", 30, &mut taken);
        assert_eq!(long.len(), 30);
    }

    #[test]
    fn test_single_attribute_udt() {
        let mut source = SchemaInfo::default();
        table(&mut source, "dbo", "t");
        source.columns[0].data_type = "phone".into();
        source.user_defined_types.push(UserDefinedType {
            schema: "dbo".into(),
            name: "Phone".into(),
            attributes: vec![UdtAttribute {
                name: "value".into(),
                data_type: "varchar(20)".into(),
            }],
        });
        let target = compute_target_schema(&source, None, &ConversionOptions::default(), mssql_to_pg());
        assert_eq!(
            target.columns[0].data_type,
            map_data_type(DatabaseType::SqlServer, DatabaseType::Postgres, "varchar(20)").target_type
        );
    }

    #[test]
    fn test_target_table() {
        let options = ConversionOptions {
            table_name_mappings: vec![TableNameMapping {
                schema: "dbo".into(),
                source_name: "Orders".into(),
                target_name: "order_header".into(),
            }],
            ..ConversionOptions::default()
        };
        let mapped = target_table(&Table::new("dbo", "orders"), &options, mssql_to_pg());
        assert!(mapped.is("public", "order_header"));
        let untouched = target_table(&Table::new("sales", "orders"), &options, mssql_to_pg());
        assert!(untouched.is("sales", "orders"));
    }

    #[test]
    fn test_missing_schemas() {
        let mut target = SchemaInfo::default();
        table(&mut target, "sales", "t");
        table(&mut target, "public", "u");
        let existing = SchemaInfo {
            schemas: vec!["public".into()],
            ..Default::default()
        };
        assert_eq!(missing_schemas(&target, &existing, DatabaseType::Postgres), vec!["sales".to_string()]);
        assert!(missing_schemas(&target, &existing, DatabaseType::MySql).is_empty());
    }
}
