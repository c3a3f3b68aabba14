//! Schema catalog types.
//!
//! A [`SchemaInfo`] is the typed snapshot handed over by the introspection
//! collaborator. Collections are flat and keyed by `(schema, name)` (child
//! objects additionally by their table), so the target-side schema can be
//! derived by cloning and renaming without touching the source snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of database object, as recorded in translation results and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Schema,
    Table,
    Column,
    PrimaryKey,
    ForeignKey,
    Index,
    View,
    Function,
    Procedure,
    Trigger,
    Type,
    Data,
}

impl ObjectType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Schema => "schema",
            ObjectType::Table => "table",
            ObjectType::Column => "column",
            ObjectType::PrimaryKey => "primary_key",
            ObjectType::ForeignKey => "foreign_key",
            ObjectType::Index => "index",
            ObjectType::View => "view",
            ObjectType::Function => "function",
            ObjectType::Procedure => "procedure",
            ObjectType::Trigger => "trigger",
            ObjectType::Type => "type",
            ObjectType::Data => "data",
        }
    }

    /// Whether a failed DDL statement of this kind may be skipped under
    /// continue-on-error without invalidating dependent objects.
    pub fn is_script_object(&self) -> bool {
        matches!(
            self,
            ObjectType::View | ObjectType::Function | ObjectType::Procedure | ObjectType::Trigger
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn same(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn qualify(schema: &str, name: &str) -> String {
    if schema.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", schema, name)
    }
}

/// Table metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Table comment.
    pub comment: Option<String>,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            comment: None,
        }
    }

    /// `schema.name`, or just `name` when the schema is empty.
    pub fn qualified_name(&self) -> String {
        qualify(&self.schema, &self.name)
    }

    /// Whether this table is `(schema, name)`, ignoring case.
    pub fn is(&self, schema: &str, name: &str) -> bool {
        same(&self.schema, schema) && same(&self.name, name)
    }
}

/// Column metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableColumn {
    pub schema: String,
    pub table_name: String,

    /// Column name.
    pub name: String,

    /// Full data type text, including length/precision (e.g. `varchar(50)`).
    pub data_type: String,

    pub is_nullable: bool,

    /// Default value expression as written in the source dialect.
    pub default_value: Option<String>,

    /// Whether this is an identity/auto-increment column.
    pub is_identity: bool,

    /// Ordinal position (1-based).
    pub order: i32,
}

impl TableColumn {
    pub fn new(
        table: &Table,
        name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: bool,
    ) -> Self {
        Self {
            schema: table.schema.clone(),
            table_name: table.name.clone(),
            name: name.into(),
            data_type: data_type.into(),
            is_nullable,
            default_value: None,
            is_identity: false,
            order: 0,
        }
    }

    pub fn belongs_to(&self, table: &Table) -> bool {
        table.is(&self.schema, &self.table_name)
    }
}

/// Primary key constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrimaryKey {
    pub schema: String,
    pub table_name: String,
    pub name: String,
    pub columns: Vec<String>,
}

impl PrimaryKey {
    pub fn belongs_to(&self, table: &Table) -> bool {
        table.is(&self.schema, &self.table_name)
    }
}

/// Foreign key constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForeignKey {
    pub schema: String,
    pub table_name: String,

    /// Constraint name.
    pub name: String,

    /// Columns in the referencing table.
    pub columns: Vec<String>,

    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,

    pub update_cascade: bool,
    pub delete_cascade: bool,
}

impl ForeignKey {
    pub fn belongs_to(&self, table: &Table) -> bool {
        table.is(&self.schema, &self.table_name)
    }

    /// Whether the key references its own table.
    pub fn is_self_referencing(&self) -> bool {
        same(&self.schema, &self.referenced_schema) && same(&self.table_name, &self.referenced_table)
    }
}

/// Index metadata (primary key indexes excluded).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Index {
    pub schema: String,
    pub table_name: String,
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
}

impl Index {
    pub fn belongs_to(&self, table: &Table) -> bool {
        table.is(&self.schema, &self.table_name)
    }
}

/// Trigger attached to a table, with its source definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableTrigger {
    pub schema: String,
    pub table_name: String,
    pub name: String,
    pub definition: String,
}

impl TableTrigger {
    pub fn belongs_to(&self, table: &Table) -> bool {
        table.is(&self.schema, &self.table_name)
    }
}

/// View, function or procedure with its source definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptObject {
    pub schema: String,
    pub name: String,
    pub definition: String,
}

impl ScriptObject {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: definition.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(&self.schema, &self.name)
    }
}

pub type View = ScriptObject;
pub type Function = ScriptObject;
pub type Procedure = ScriptObject;

/// Attribute of a user-defined type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UdtAttribute {
    pub name: String,
    pub data_type: String,
}

/// User-defined type (alias or composite).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDefinedType {
    pub schema: String,
    pub name: String,
    pub attributes: Vec<UdtAttribute>,
}

/// Typed schema snapshot of one database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaInfo {
    /// Schemas (namespaces) known to exist.
    pub schemas: Vec<String>,
    pub tables: Vec<Table>,
    pub columns: Vec<TableColumn>,
    pub primary_keys: Vec<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<Index>,
    pub triggers: Vec<TableTrigger>,
    pub views: Vec<View>,
    pub functions: Vec<Function>,
    pub procedures: Vec<Procedure>,
    pub user_defined_types: Vec<UserDefinedType>,
}

impl SchemaInfo {
    /// Look up a table by `(schema, name)`, ignoring case.
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.is(schema, name))
    }

    /// Whether a table exists, ignoring case.
    pub fn contains_table(&self, schema: &str, name: &str) -> bool {
        self.table(schema, name).is_some()
    }

    /// Whether a schema exists, ignoring case.
    pub fn contains_schema(&self, schema: &str) -> bool {
        self.schemas.iter().any(|s| same(s, schema))
    }

    /// Columns of a table in ordinal order.
    pub fn columns_of(&self, table: &Table) -> Vec<&TableColumn> {
        let mut cols: Vec<_> = self.columns.iter().filter(|c| c.belongs_to(table)).collect();
        cols.sort_by_key(|c| c.order);
        cols
    }

    pub fn primary_key_of(&self, table: &Table) -> Option<&PrimaryKey> {
        self.primary_keys.iter().find(|pk| pk.belongs_to(table))
    }

    pub fn foreign_keys_of(&self, table: &Table) -> Vec<&ForeignKey> {
        self.foreign_keys.iter().filter(|fk| fk.belongs_to(table)).collect()
    }

    pub fn indexes_of(&self, table: &Table) -> Vec<&Index> {
        self.indexes.iter().filter(|i| i.belongs_to(table)).collect()
    }

    pub fn triggers_of(&self, table: &Table) -> Vec<&TableTrigger> {
        self.triggers.iter().filter(|t| t.belongs_to(table)).collect()
    }

    /// Look up a user-defined type by name, with or without schema.
    pub fn user_defined_type(&self, name: &str) -> Option<&UserDefinedType> {
        let (schema, base) = match name.rsplit_once('.') {
            Some((s, b)) => (Some(s), b),
            None => (None, name),
        };
        self.user_defined_types
            .iter()
            .find(|u| same(&u.name, base) && schema.map_or(true, |s| same(&u.schema, s)))
    }

    /// Remove a table together with its columns, keys, indexes and triggers.
    pub fn remove_table(&mut self, schema: &str, name: &str) {
        self.tables.retain(|t| !t.is(schema, name));
        self.columns
            .retain(|c| !(same(&c.schema, schema) && same(&c.table_name, name)));
        self.primary_keys
            .retain(|k| !(same(&k.schema, schema) && same(&k.table_name, name)));
        self.foreign_keys
            .retain(|k| !(same(&k.schema, schema) && same(&k.table_name, name)));
        self.indexes
            .retain(|i| !(same(&i.schema, schema) && same(&i.table_name, name)));
        self.triggers
            .retain(|t| !(same(&t.schema, schema) && same(&t.table_name, name)));
    }

    /// Whether the snapshot holds no objects at all.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.views.is_empty()
            && self.functions.is_empty()
            && self.procedures.is_empty()
            && self.triggers.is_empty()
    }

    /// Number of tables, views, routines and triggers.
    pub fn object_count(&self) -> usize {
        self.tables.len()
            + self.views.len()
            + self.functions.len()
            + self.procedures.len()
            + self.triggers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaInfo {
        let orders = Table::new("dbo", "Orders");
        let items = Table::new("dbo", "Items");
        SchemaInfo {
            schemas: vec!["dbo".into()],
            columns: vec![
                TableColumn {
                    order: 2,
                    ..TableColumn::new(&orders, "total", "decimal(10,2)", true)
                },
                TableColumn {
                    order: 1,
                    ..TableColumn::new(&orders, "id", "int", false)
                },
                TableColumn::new(&items, "id", "int", false),
            ],
            foreign_keys: vec![ForeignKey {
                schema: "dbo".into(),
                table_name: "Items".into(),
                name: "FK_Items_Orders".into(),
                columns: vec!["order_id".into()],
                referenced_schema: "dbo".into(),
                referenced_table: "Orders".into(),
                referenced_columns: vec!["id".into()],
                ..Default::default()
            }],
            tables: vec![orders, items],
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        let schema = sample();
        assert!(schema.contains_table("DBO", "orders"));
        assert!(!schema.contains_table("dbo", "missing"));
        assert!(schema.contains_schema("DBO"));
    }

    #[test]
    fn test_columns_in_ordinal_order() {
        let schema = sample();
        let orders = schema.table("dbo", "orders").unwrap().clone();
        let names: Vec<_> = schema.columns_of(&orders).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "total"]);
    }

    #[test]
    fn test_remove_table_drops_children() {
        let mut schema = sample();
        schema.remove_table("dbo", "Items");
        assert_eq!(schema.tables.len(), 1);
        assert!(schema.foreign_keys.is_empty());
        assert_eq!(schema.columns.len(), 2);
    }

    #[test]
    fn test_self_reference() {
        let mut fk = sample().foreign_keys[0].clone();
        assert!(!fk.is_self_referencing());
        fk.referenced_table = "items".into();
        assert!(fk.is_self_referencing());
    }

    #[test]
    fn test_object_type_names() {
        assert_eq!(ObjectType::PrimaryKey.to_string(), "primary_key");
        assert!(ObjectType::Trigger.is_script_object());
        assert!(!ObjectType::Table.is_script_object());
    }
}
