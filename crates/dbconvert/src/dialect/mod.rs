//! Supported SQL dialects and data type mapping between them.
//!
//! [`DatabaseType`] names a dialect everywhere in the crate: the lexer picks its
//! tokenizer rules from it, the adapters and emitters are selected by it, and the
//! canonical type hub in [`canonical`] maps column, parameter and variable types
//! across any (source, target) pair.
//!
//! ```rust
//! use dbconvert::dialect::DatabaseType;
//!
//! let db = DatabaseType::from_db_type("pg").unwrap();
//! assert_eq!(db, DatabaseType::Postgres);
//! assert_eq!(db.quote_identifier("order"), "\"order\"");
//! ```

pub mod canonical;

pub use canonical::{map_data_type, CanonicalType, TypeMapping};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::identifier;
use crate::error::{ConvertError, Result};

/// A SQL engine whose procedural dialect can be read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Oracle, PL/SQL.
    Oracle,
    /// Microsoft SQL Server, T-SQL.
    #[serde(alias = "mssql")]
    SqlServer,
    /// MySQL stored program language.
    MySql,
    /// PostgreSQL, PL/pgSQL.
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl DatabaseType {
    /// All supported dialects, in a stable order.
    pub const ALL: [DatabaseType; 4] = [
        DatabaseType::Oracle,
        DatabaseType::SqlServer,
        DatabaseType::MySql,
        DatabaseType::Postgres,
    ];

    /// Parse a dialect from a configuration or command line name.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "oracle" | "plsql" | "ora" => Ok(DatabaseType::Oracle),
            "sqlserver" | "mssql" | "sql_server" | "tsql" => Ok(DatabaseType::SqlServer),
            "mysql" | "mariadb" => Ok(DatabaseType::MySql),
            "postgres" | "postgresql" | "pg" | "plpgsql" => Ok(DatabaseType::Postgres),
            other => Err(ConvertError::Config(format!(
                "Unknown database type: '{}'. Supported types: oracle, sqlserver, mysql, postgres",
                other
            ))),
        }
    }

    /// Short lowercase name used in config files and logs.
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseType::Oracle => "oracle",
            DatabaseType::SqlServer => "sqlserver",
            DatabaseType::MySql => "mysql",
            DatabaseType::Postgres => "postgres",
        }
    }

    /// Quote an identifier with the dialect's delimiter.
    ///
    /// Identifiers that fail validation are returned unquoted so callers rendering
    /// best-effort script text never lose the name.
    pub fn quote_identifier(&self, name: &str) -> String {
        let quoted = match self {
            DatabaseType::Oracle | DatabaseType::Postgres => identifier::quote_pg(name),
            DatabaseType::SqlServer => identifier::quote_mssql(name),
            DatabaseType::MySql => identifier::quote_mysql(name),
        };
        quoted.unwrap_or_else(|_| name.to_string())
    }

    /// Schema used when an object carries none.
    pub fn default_schema(&self) -> &'static str {
        match self {
            DatabaseType::SqlServer => "dbo",
            DatabaseType::Postgres => "public",
            DatabaseType::Oracle | DatabaseType::MySql => "",
        }
    }

    /// Maximum identifier length accepted by the engine.
    pub fn max_identifier_length(&self) -> usize {
        match self {
            DatabaseType::Oracle => 30,
            DatabaseType::SqlServer => 128,
            DatabaseType::MySql => 64,
            DatabaseType::Postgres => 63,
        }
    }

    /// Single-line comment prefix.
    pub fn comment_prefix(&self) -> &'static str {
        match self {
            DatabaseType::MySql => "# ",
            _ => "-- ",
        }
    }

    /// Whether local variables carry an `@` sigil.
    pub fn uses_variable_sigil(&self) -> bool {
        matches!(self, DatabaseType::SqlServer)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatabaseType::Oracle => "Oracle",
            DatabaseType::SqlServer => "SQL Server",
            DatabaseType::MySql => "MySQL",
            DatabaseType::Postgres => "PostgreSQL",
        };
        f.write_str(label)
    }
}

impl FromStr for DatabaseType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        DatabaseType::from_db_type(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_db_type_aliases() {
        assert_eq!(DatabaseType::from_db_type("Oracle").unwrap(), DatabaseType::Oracle);
        assert_eq!(DatabaseType::from_db_type("mssql").unwrap(), DatabaseType::SqlServer);
        assert_eq!(DatabaseType::from_db_type("tsql").unwrap(), DatabaseType::SqlServer);
        assert_eq!(DatabaseType::from_db_type("mariadb").unwrap(), DatabaseType::MySql);
        assert_eq!(DatabaseType::from_db_type("pg").unwrap(), DatabaseType::Postgres);
        assert!(DatabaseType::from_db_type("db2").is_err());
    }

    #[test]
    fn test_name_roundtrip() {
        for db in DatabaseType::ALL {
            assert_eq!(db.name().parse::<DatabaseType>().unwrap(), db);
        }
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(DatabaseType::MySql.quote_identifier("a`b"), "`a``b`");
        assert_eq!(DatabaseType::SqlServer.quote_identifier("t"), "[t]");
        assert_eq!(DatabaseType::Oracle.quote_identifier("T"), "\"T\"");
        assert_eq!(DatabaseType::Postgres.quote_identifier(""), "");
    }

    #[test]
    fn test_serde_names() {
        let db: DatabaseType = serde_yaml::from_str("mssql").unwrap();
        assert_eq!(db, DatabaseType::SqlServer);
        assert_eq!(serde_yaml::to_string(&DatabaseType::MySql).unwrap().trim(), "mysql");
    }
}
