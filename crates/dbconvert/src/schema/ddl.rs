//! DDL and data script generation for the target dialect.
//!
//! The generator works on an already mapped target schema (see
//! [`super::compute_target_schema`]): names and column types are final, only
//! column defaults still carry source dialect expressions and are passed
//! through the function translator.

use serde::Serialize;
use tracing::debug;

use crate::core::{placeholder, Row};
use crate::dialect::DatabaseType;
use crate::function;

use super::types::*;

/// One statement of a generated script.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DdlStatement {
    pub object_type: ObjectType,
    pub object_name: String,
    pub sql: String,
}

impl DdlStatement {
    pub fn new(object_type: ObjectType, object_name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            object_type,
            object_name: object_name.into(),
            sql: sql.into(),
        }
    }
}

/// Renders target DDL for tables, keys and indexes and INSERTs for rows.
#[derive(Debug, Clone, Copy)]
pub struct DdlGenerator {
    source: DatabaseType,
    target: DatabaseType,
}

impl DdlGenerator {
    pub fn new(source: DatabaseType, target: DatabaseType) -> Self {
        Self { source, target }
    }

    pub fn target(&self) -> DatabaseType {
        self.target
    }

    fn quote(&self, name: &str) -> String {
        self.target.quote_identifier(name)
    }

    fn qualify(&self, schema: &str, name: &str) -> String {
        if schema.is_empty() {
            self.quote(name)
        } else {
            format!("{}.{}", self.quote(schema), self.quote(name))
        }
    }

    fn quote_list(&self, names: &[String]) -> String {
        names.iter().map(|n| self.quote(n)).collect::<Vec<_>>().join(", ")
    }

    // ===== Schema Operations =====

    /// `CREATE SCHEMA` for engines with schemas separate from databases.
    pub fn create_schema(&self, schema: &str) -> Option<DdlStatement> {
        let sql = match self.target {
            DatabaseType::SqlServer => format!(
                "IF NOT EXISTS (SELECT 1 FROM sys.schemas WHERE name = N'{}') EXEC(N'CREATE SCHEMA {}')",
                schema.replace('\'', "''"),
                self.quote(schema).replace('\'', "''")
            ),
            DatabaseType::Postgres => format!("CREATE SCHEMA IF NOT EXISTS {}", self.quote(schema)),
            DatabaseType::Oracle | DatabaseType::MySql => return None,
        };
        Some(DdlStatement::new(ObjectType::Schema, schema, sql))
    }

    // ===== Table Operations =====

    fn identity_clause(&self) -> &'static str {
        match self.target {
            DatabaseType::SqlServer => "IDENTITY(1,1)",
            DatabaseType::MySql => "AUTO_INCREMENT",
            DatabaseType::Postgres | DatabaseType::Oracle => "GENERATED BY DEFAULT AS IDENTITY",
        }
    }

    /// Translate a column default into the target dialect.
    ///
    /// SQL Server wraps stored defaults in parentheses, `((0))`; those are
    /// peeled before translation.
    pub fn translate_default(&self, default: &str) -> String {
        let mut text = default.trim();
        while text.starts_with('(') && text.ends_with(')') && balanced(&text[1..text.len() - 1]) {
            text = text[1..text.len() - 1].trim();
        }
        if self.source == self.target {
            text.to_string()
        } else {
            function::translate(text, self.source, self.target)
        }
    }

    fn column_definition(&self, column: &TableColumn) -> String {
        let mut def = format!("{} {}", self.quote(&column.name), column.data_type);
        if column.is_identity {
            def.push(' ');
            def.push_str(self.identity_clause());
        } else if let Some(default) = column.default_value.as_deref().filter(|d| !d.trim().is_empty()) {
            def.push_str(" DEFAULT ");
            def.push_str(&self.translate_default(default));
        }
        def.push_str(if column.is_nullable { " NULL" } else { " NOT NULL" });
        def
    }

    /// `CREATE TABLE` with the primary key inline.
    pub fn create_table(&self, schema: &SchemaInfo, table: &Table) -> DdlStatement {
        let mut parts: Vec<String> = schema
            .columns_of(table)
            .into_iter()
            .map(|c| self.column_definition(c))
            .collect();

        if let Some(pk) = schema.primary_key_of(table).filter(|pk| !pk.columns.is_empty()) {
            let constraint = if pk.name.is_empty() || self.target == DatabaseType::MySql {
                String::new()
            } else {
                format!("CONSTRAINT {} ", self.quote(&pk.name))
            };
            parts.push(format!("{}PRIMARY KEY ({})", constraint, self.quote_list(&pk.columns)));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.qualify(&table.schema, &table.name),
            parts.join(",\n    ")
        );
        if self.target == DatabaseType::MySql {
            sql.push_str(" ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci");
        }
        debug!(table = %table.qualified_name(), "generated CREATE TABLE");
        DdlStatement::new(ObjectType::Table, table.qualified_name(), sql)
    }

    pub fn create_foreign_key(&self, fk: &ForeignKey) -> DdlStatement {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.qualify(&fk.schema, &fk.table_name),
            self.quote(&fk.name),
            self.quote_list(&fk.columns),
            self.qualify(&fk.referenced_schema, &fk.referenced_table),
            self.quote_list(&fk.referenced_columns)
        );
        if fk.delete_cascade {
            sql.push_str(" ON DELETE CASCADE");
        }
        // Oracle has no ON UPDATE clause.
        if fk.update_cascade && self.target != DatabaseType::Oracle {
            sql.push_str(" ON UPDATE CASCADE");
        }
        DdlStatement::new(ObjectType::ForeignKey, fk.name.clone(), sql)
    }

    pub fn create_index(&self, index: &Index) -> DdlStatement {
        let unique = if index.is_unique { "UNIQUE " } else { "" };
        let table = self.qualify(&index.schema, &index.table_name);
        let sql = format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote(&index.name),
            table,
            self.quote_list(&index.columns)
        );
        DdlStatement::new(ObjectType::Index, index.name.clone(), sql)
    }

    /// Table, then its indexes, for every table; foreign keys last so that
    /// referenced tables exist.
    pub fn table_statements(&self, schema: &SchemaInfo) -> Vec<DdlStatement> {
        let mut out = Vec::new();
        for table in &schema.tables {
            out.push(self.create_table(schema, table));
            for index in schema.indexes_of(table) {
                out.push(self.create_index(index));
            }
        }
        out.extend(self.foreign_key_statements(schema));
        out
    }

    pub fn foreign_key_statements(&self, schema: &SchemaInfo) -> Vec<DdlStatement> {
        schema.foreign_keys.iter().map(|fk| self.create_foreign_key(fk)).collect()
    }

    // ===== Data Operations =====

    /// Parameterized INSERT of `rows` rows, used when rows go through the
    /// target collaborator. Placeholders are numbered row by row.
    pub fn insert_with_placeholders(&self, table: &Table, columns: &[String], rows: usize) -> String {
        let mut index = 0;
        let tuples: Vec<String> = (0..rows.max(1))
            .map(|_| {
                let params: Vec<String> = columns
                    .iter()
                    .map(|_| {
                        index += 1;
                        placeholder(self.target, index)
                    })
                    .collect();
                format!("({})", params.join(", "))
            })
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.qualify(&table.schema, &table.name),
            self.quote_list(columns),
            tuples.join(", ")
        )
    }

    /// Rows per parameterized INSERT; Oracle takes a single VALUES tuple.
    pub fn rows_per_insert(&self, column_count: usize) -> usize {
        match self.target {
            DatabaseType::Oracle => 1,
            // SQL Server caps a statement at 2100 parameters.
            _ => (2000 / column_count.max(1)).max(1),
        }
    }

    /// INSERT statements with literal values for a generated script.
    ///
    /// Oracle gets one statement per row; the other dialects one multi-row
    /// statement per page.
    pub fn insert_rows(&self, table: &Table, columns: &[String], rows: &[Row]) -> Vec<DdlStatement> {
        if rows.is_empty() {
            return Vec::new();
        }
        let head = format!(
            "INSERT INTO {} ({}) VALUES",
            self.qualify(&table.schema, &table.name),
            self.quote_list(columns)
        );
        let tuple = |row: &Row| {
            let values: Vec<String> = row.iter().map(|v| v.to_literal(self.target)).collect();
            format!("({})", values.join(", "))
        };
        let name = table.qualified_name();
        if self.target == DatabaseType::Oracle {
            rows.iter()
                .map(|row| DdlStatement::new(ObjectType::Data, name.clone(), format!("{} {}", head, tuple(row))))
                .collect()
        } else {
            let values: Vec<String> = rows.iter().map(tuple).collect();
            vec![DdlStatement::new(
                ObjectType::Data,
                name,
                format!("{}\n{}", head, values.join(",\n")),
            )]
        }
    }
}

/// Terminate a statement for inclusion in a script.
///
/// SQL Server batches are separated with `GO` so that routines and views
/// start their own batch.
pub fn terminate(db: DatabaseType, sql: &str) -> String {
    let trimmed = sql.trim_end();
    let mut out = trimmed.to_string();
    if !trimmed.ends_with(';') {
        out.push(';');
    }
    if db == DatabaseType::SqlServer {
        out.push_str("\nGO");
    }
    out
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlValue;

    fn orders() -> (SchemaInfo, Table) {
        let table = Table::new("sales", "orders");
        let mut id = TableColumn::new(&table, "id", "INTEGER", false);
        id.is_identity = true;
        let mut status = TableColumn::new(&table, "status", "VARCHAR(10)", true);
        status.order = 1;
        status.default_value = Some("('new')".into());
        let schema = SchemaInfo {
            tables: vec![table.clone()],
            columns: vec![id, status],
            primary_keys: vec![PrimaryKey {
                schema: "sales".into(),
                table_name: "orders".into(),
                name: "pk_orders".into(),
                columns: vec!["id".into()],
            }],
            ..Default::default()
        };
        (schema, table)
    }

    #[test]
    fn test_create_table_postgres() {
        let (schema, table) = orders();
        let ddl = DdlGenerator::new(DatabaseType::SqlServer, DatabaseType::Postgres).create_table(&schema, &table);
        assert_eq!(
            ddl.sql,
            "CREATE TABLE \"sales\".\"orders\" (\n    \
             \"id\" INTEGER GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n    \
             \"status\" VARCHAR(10) DEFAULT 'new' NULL,\n    \
             CONSTRAINT \"pk_orders\" PRIMARY KEY (\"id\")\n)"
        );
        assert_eq!(ddl.object_type, ObjectType::Table);
    }

    #[test]
    fn test_create_table_mysql_engine_suffix() {
        let (schema, table) = orders();
        let ddl = DdlGenerator::new(DatabaseType::Postgres, DatabaseType::MySql).create_table(&schema, &table);
        assert!(ddl.sql.contains("`id` INTEGER AUTO_INCREMENT NOT NULL"));
        assert!(ddl.sql.contains("PRIMARY KEY (`id`)"));
        assert!(!ddl.sql.contains("CONSTRAINT"));
        assert!(ddl.sql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"));
    }

    #[test]
    fn test_default_translation() {
        let generator = DdlGenerator::new(DatabaseType::SqlServer, DatabaseType::Postgres);
        assert_eq!(generator.translate_default("((0))"), "0");
        assert_eq!(generator.translate_default("(a) + (b)"), "(a) + (b)");
    }

    #[test]
    fn test_foreign_key_actions() {
        let fk = ForeignKey {
            schema: "hr".into(),
            table_name: "emp".into(),
            name: "fk_dept".into(),
            columns: vec!["dept_id".into()],
            referenced_schema: "hr".into(),
            referenced_table: "dept".into(),
            referenced_columns: vec!["id".into()],
            update_cascade: true,
            delete_cascade: true,
        };
        let pg = DdlGenerator::new(DatabaseType::Oracle, DatabaseType::Postgres).create_foreign_key(&fk);
        assert_eq!(
            pg.sql,
            "ALTER TABLE \"hr\".\"emp\" ADD CONSTRAINT \"fk_dept\" FOREIGN KEY (\"dept_id\") \
             REFERENCES \"hr\".\"dept\" (\"id\") ON DELETE CASCADE ON UPDATE CASCADE"
        );
        let ora = DdlGenerator::new(DatabaseType::Postgres, DatabaseType::Oracle).create_foreign_key(&fk);
        assert!(ora.sql.ends_with("ON DELETE CASCADE"));
    }

    #[test]
    fn test_create_index_and_schema() {
        let index = Index {
            schema: "dbo".into(),
            table_name: "orders".into(),
            name: "ix_orders_date".into(),
            columns: vec!["order_date".into()],
            is_unique: true,
        };
        let generator = DdlGenerator::new(DatabaseType::Postgres, DatabaseType::SqlServer);
        assert_eq!(
            generator.create_index(&index).sql,
            "CREATE UNIQUE INDEX [ix_orders_date] ON [dbo].[orders] ([order_date])"
        );
        assert!(generator.create_schema("sales").is_some());
        assert!(DdlGenerator::new(DatabaseType::Postgres, DatabaseType::MySql)
            .create_schema("sales")
            .is_none());
    }

    #[test]
    fn test_insert_rows() {
        let table = Table::new("", "t");
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows: Vec<Row> = vec![
            vec![SqlValue::I32(1), SqlValue::from("a".to_string())],
            vec![SqlValue::I32(2), SqlValue::Null],
        ];
        let mysql = DdlGenerator::new(DatabaseType::Postgres, DatabaseType::MySql).insert_rows(&table, &columns, &rows);
        assert_eq!(mysql.len(), 1);
        assert_eq!(mysql[0].sql, "INSERT INTO `t` (`id`, `name`) VALUES\n(1, 'a'),\n(2, NULL)");

        let oracle = DdlGenerator::new(DatabaseType::Postgres, DatabaseType::Oracle).insert_rows(&table, &columns, &rows);
        assert_eq!(oracle.len(), 2);
        assert_eq!(oracle[1].sql, "INSERT INTO \"t\" (\"id\", \"name\") VALUES (2, NULL)");
    }

    #[test]
    fn test_placeholder_insert_and_terminate() {
        let table = Table::new("public", "t");
        let sql = DdlGenerator::new(DatabaseType::MySql, DatabaseType::Postgres)
            .insert_with_placeholders(&table, &["a".to_string(), "b".to_string()], 2);
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"t\" (\"a\", \"b\") VALUES ($1, $2), ($3, $4)"
        );
        let oracle = DdlGenerator::new(DatabaseType::MySql, DatabaseType::Oracle);
        assert_eq!(oracle.rows_per_insert(3), 1);
        assert_eq!(DdlGenerator::new(DatabaseType::MySql, DatabaseType::SqlServer).rows_per_insert(3), 666);
        assert_eq!(terminate(DatabaseType::Postgres, "SELECT 1"), "SELECT 1;");
        assert_eq!(terminate(DatabaseType::SqlServer, "END;"), "END;\nGO");
    }
}
