//! Hub-and-spoke canonical type system for data type mapping.
//!
//! Every dialect converts its native type text into a [`CanonicalType`] and back,
//! so four dialects need eight conversions instead of twelve direct mappers.
//!
//! ```text
//! Source DB   →  CanonicalType  →  Target DB
//!   NUMBER(9)  →     Int32       →   INT
//!   NVARCHAR   →   Varchar(n)    →   VARCHAR2(n)
//! ```
//!
//! Types that have no canonical counterpart pass through unchanged as
//! [`CanonicalType::Unknown`].

use std::fmt;

use tracing::warn;

use super::DatabaseType;

/// Database-agnostic intermediate type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalType {
    // ===== Boolean =====
    Boolean,

    // ===== Integer Types =====
    /// 8-bit unsigned integer.
    UInt8,
    Int16,
    Int32,
    Int64,

    // ===== Floating Point =====
    Float32,
    Float64,

    // ===== Decimal/Numeric =====
    /// Exact decimal with precision and scale.
    Decimal { precision: u8, scale: u8 },
    /// Numeric with no declared precision (Oracle `NUMBER`, PostgreSQL `NUMERIC`).
    Number,
    /// Money type with fixed precision (19,4).
    Money,

    // ===== String Types =====
    /// Fixed-length character string.
    Char(u32),
    /// Variable-length character string. 0 means unlimited/max.
    Varchar(u32),
    Text,

    // ===== Binary Types =====
    Binary(u32),
    /// Variable-length binary data. 0 means unlimited/max.
    Varbinary(u32),
    Blob,

    // ===== Date/Time Types =====
    Date,
    Time,
    DateTime,
    DateTimeTz,

    // ===== Special Types =====
    Uuid,
    Json,
    Xml,

    /// Type that couldn't be mapped; carries the original text.
    Unknown(String),
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalType::Decimal { precision, scale } => {
                write!(f, "Decimal({},{})", precision, scale)
            }
            CanonicalType::Char(n) => write!(f, "Char({})", n),
            CanonicalType::Varchar(n) => write!(f, "Varchar({})", n),
            CanonicalType::Binary(n) => write!(f, "Binary({})", n),
            CanonicalType::Varbinary(n) => write!(f, "Varbinary({})", n),
            CanonicalType::Unknown(s) => write!(f, "Unknown({})", s),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Result of mapping one type between dialects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Rendered target type.
    pub target_type: String,
    /// True when the target type cannot hold every source value exactly.
    pub is_lossy: bool,
}

impl TypeMapping {
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
        }
    }

    pub fn lossy(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
        }
    }
}

/// Map a native type from `source` to `target`.
///
/// Same-dialect mappings return the input unchanged.
pub fn map_data_type(source: DatabaseType, target: DatabaseType, data_type: &str) -> TypeMapping {
    if source == target {
        return TypeMapping::lossless(data_type.trim());
    }

    let canonical = to_canonical(source, data_type);
    let rendered = from_canonical(target, &canonical);
    let is_lossy = is_lossy(target, &canonical);
    if is_lossy {
        warn!(
            "Type {} ({}) maps lossily to {} as {}",
            data_type.trim(),
            canonical,
            target,
            rendered
        );
        TypeMapping::lossy(rendered)
    } else {
        TypeMapping::lossless(rendered)
    }
}

/// Split `name(args) suffix` into lowercase name, numeric-or-max args, and suffix.
struct ParsedType {
    name: String,
    args: Vec<String>,
    suffix: String,
}

fn parse_type(text: &str) -> ParsedType {
    let lower = text.trim().to_lowercase();
    let (head, args, suffix) = match (lower.find('('), lower.rfind(')')) {
        (Some(open), Some(close)) if close > open => (
            lower[..open].to_string(),
            lower[open + 1..close]
                .split(',')
                .map(|a| a.trim().split_whitespace().next().unwrap_or("").to_string())
                .collect(),
            lower[close + 1..].trim().to_string(),
        ),
        _ => (lower.clone(), Vec::new(), String::new()),
    };
    let mut name = head.split_whitespace().collect::<Vec<_>>().join(" ");
    if suffix.contains("time zone") && !name.contains("time zone") {
        name = format!("{} {}", name, suffix);
    }
    ParsedType {
        name,
        args,
        suffix,
    }
}

fn arg_u32(args: &[String], idx: usize) -> Option<u32> {
    args.get(idx).and_then(|a| a.parse::<u32>().ok())
}

/// Length argument where `max` (or an absent length) means unlimited.
fn length_or_max(args: &[String], default: u32) -> u32 {
    match args.first().map(String::as_str) {
        Some("max") => 0,
        Some(_) => arg_u32(args, 0).unwrap_or(default),
        None => default,
    }
}

fn decimal(args: &[String], default_precision: u8, default_scale: u8) -> CanonicalType {
    let precision = arg_u32(args, 0)
        .map(|p| p.min(u8::MAX as u32) as u8)
        .unwrap_or(default_precision);
    let scale = arg_u32(args, 1)
        .map(|s| s.min(u8::MAX as u32) as u8)
        .unwrap_or(default_scale);
    CanonicalType::Decimal { precision, scale }
}

fn integer_by_precision(precision: u32) -> CanonicalType {
    match precision {
        0..=4 => CanonicalType::Int16,
        5..=9 => CanonicalType::Int32,
        10..=18 => CanonicalType::Int64,
        p => CanonicalType::Decimal {
            precision: p.min(38) as u8,
            scale: 0,
        },
    }
}

/// Convert native type text into the canonical hub type.
pub fn to_canonical(db: DatabaseType, data_type: &str) -> CanonicalType {
    let parsed = parse_type(data_type);
    let args = &parsed.args;
    let unsigned = parsed.suffix.contains("unsigned") || parsed.name.ends_with(" unsigned");
    let name = parsed.name.trim_end_matches(" unsigned");

    let mapped = match db {
        DatabaseType::Oracle => match name {
            "number" => match (arg_u32(args, 0), arg_u32(args, 1)) {
                (None, _) => Some(CanonicalType::Number),
                (Some(p), None) | (Some(p), Some(0)) => Some(integer_by_precision(p)),
                (Some(_), Some(_)) => Some(decimal(args, 38, 0)),
            },
            "integer" | "int" | "pls_integer" | "binary_integer" => Some(CanonicalType::Int32),
            "smallint" => Some(CanonicalType::Int16),
            "float" | "binary_double" => Some(CanonicalType::Float64),
            "binary_float" => Some(CanonicalType::Float32),
            "char" | "nchar" => Some(CanonicalType::Char(length_or_max(args, 1))),
            "varchar2" | "nvarchar2" | "varchar" => {
                Some(CanonicalType::Varchar(length_or_max(args, 4000)))
            }
            "clob" | "nclob" | "long" => Some(CanonicalType::Text),
            "blob" | "long raw" | "bfile" => Some(CanonicalType::Blob),
            "raw" => Some(CanonicalType::Varbinary(length_or_max(args, 2000))),
            "date" | "timestamp" => Some(CanonicalType::DateTime),
            "timestamp with time zone" | "timestamp with local time zone" => {
                Some(CanonicalType::DateTimeTz)
            }
            "xmltype" => Some(CanonicalType::Xml),
            "boolean" => Some(CanonicalType::Boolean),
            _ => None,
        },
        DatabaseType::SqlServer => match name {
            "bit" => Some(CanonicalType::Boolean),
            "tinyint" => Some(CanonicalType::UInt8),
            "smallint" => Some(CanonicalType::Int16),
            "int" | "integer" => Some(CanonicalType::Int32),
            "bigint" => Some(CanonicalType::Int64),
            "real" => Some(CanonicalType::Float32),
            "float" => match arg_u32(args, 0) {
                Some(n) if n <= 24 => Some(CanonicalType::Float32),
                _ => Some(CanonicalType::Float64),
            },
            "decimal" | "numeric" => Some(decimal(args, 18, 0)),
            "money" | "smallmoney" => Some(CanonicalType::Money),
            "char" | "nchar" => Some(CanonicalType::Char(length_or_max(args, 1))),
            "varchar" | "nvarchar" => Some(CanonicalType::Varchar(length_or_max(args, 1))),
            "text" | "ntext" => Some(CanonicalType::Text),
            "binary" => Some(CanonicalType::Binary(length_or_max(args, 1))),
            "varbinary" => Some(CanonicalType::Varbinary(length_or_max(args, 1))),
            "image" => Some(CanonicalType::Blob),
            "date" => Some(CanonicalType::Date),
            "time" => Some(CanonicalType::Time),
            "datetime" | "datetime2" | "smalldatetime" => Some(CanonicalType::DateTime),
            "datetimeoffset" => Some(CanonicalType::DateTimeTz),
            "uniqueidentifier" => Some(CanonicalType::Uuid),
            "xml" => Some(CanonicalType::Xml),
            _ => None,
        },
        DatabaseType::MySql => match name {
            "bool" | "boolean" => Some(CanonicalType::Boolean),
            "tinyint" if arg_u32(args, 0) == Some(1) => Some(CanonicalType::Boolean),
            "tinyint" if unsigned => Some(CanonicalType::UInt8),
            "tinyint" | "smallint" => Some(CanonicalType::Int16),
            "mediumint" => Some(CanonicalType::Int32),
            "int" | "integer" if unsigned => Some(CanonicalType::Int64),
            "int" | "integer" => Some(CanonicalType::Int32),
            "bigint" => Some(CanonicalType::Int64),
            "float" => Some(CanonicalType::Float32),
            "double" | "double precision" | "real" => Some(CanonicalType::Float64),
            "decimal" | "numeric" => Some(decimal(args, 10, 0)),
            "char" => Some(CanonicalType::Char(length_or_max(args, 1))),
            "varchar" => Some(CanonicalType::Varchar(length_or_max(args, 255))),
            "tinytext" | "text" | "mediumtext" | "longtext" => Some(CanonicalType::Text),
            "binary" => Some(CanonicalType::Binary(length_or_max(args, 1))),
            "varbinary" => Some(CanonicalType::Varbinary(length_or_max(args, 255))),
            "tinyblob" | "blob" | "mediumblob" | "longblob" => Some(CanonicalType::Blob),
            "date" => Some(CanonicalType::Date),
            "time" => Some(CanonicalType::Time),
            "datetime" | "timestamp" => Some(CanonicalType::DateTime),
            "year" => Some(CanonicalType::Int16),
            "json" => Some(CanonicalType::Json),
            "enum" | "set" => Some(CanonicalType::Varchar(255)),
            _ => None,
        },
        DatabaseType::Postgres => match name {
            "boolean" | "bool" => Some(CanonicalType::Boolean),
            "smallint" | "int2" | "smallserial" => Some(CanonicalType::Int16),
            "integer" | "int" | "int4" | "serial" => Some(CanonicalType::Int32),
            "bigint" | "int8" | "bigserial" => Some(CanonicalType::Int64),
            "real" | "float4" => Some(CanonicalType::Float32),
            "double precision" | "float8" | "float" => Some(CanonicalType::Float64),
            "numeric" | "decimal" if args.is_empty() => Some(CanonicalType::Number),
            "numeric" | "decimal" => Some(decimal(args, 38, 0)),
            "money" => Some(CanonicalType::Money),
            "char" | "character" | "bpchar" => Some(CanonicalType::Char(length_or_max(args, 1))),
            "varchar" | "character varying" => Some(CanonicalType::Varchar(length_or_max(args, 0))),
            "text" | "citext" => Some(CanonicalType::Text),
            "bytea" => Some(CanonicalType::Blob),
            "date" => Some(CanonicalType::Date),
            "time" | "time without time zone" => Some(CanonicalType::Time),
            "timestamp" | "timestamp without time zone" => Some(CanonicalType::DateTime),
            "timestamptz" | "timestamp with time zone" => Some(CanonicalType::DateTimeTz),
            "uuid" => Some(CanonicalType::Uuid),
            "json" | "jsonb" => Some(CanonicalType::Json),
            "xml" => Some(CanonicalType::Xml),
            _ => None,
        },
    };

    mapped.unwrap_or_else(|| CanonicalType::Unknown(data_type.trim().to_string()))
}

/// Render a canonical type in the target dialect.
pub fn from_canonical(db: DatabaseType, canonical: &CanonicalType) -> String {
    use CanonicalType as C;

    match db {
        DatabaseType::Oracle => match canonical {
            C::Boolean => "NUMBER(1)".into(),
            C::UInt8 => "NUMBER(3)".into(),
            C::Int16 => "NUMBER(5)".into(),
            C::Int32 => "NUMBER(10)".into(),
            C::Int64 => "NUMBER(19)".into(),
            C::Float32 => "BINARY_FLOAT".into(),
            C::Float64 => "BINARY_DOUBLE".into(),
            C::Decimal { precision, scale } => format!("NUMBER({},{})", precision.min(&38), scale),
            C::Number => "NUMBER".into(),
            C::Money => "NUMBER(19,4)".into(),
            C::Char(n) => format!("CHAR({})", n.clamp(&1, &2000)),
            C::Varchar(n) if *n == 0 || *n > 4000 => "CLOB".into(),
            C::Varchar(n) => format!("VARCHAR2({})", n),
            C::Text => "CLOB".into(),
            C::Binary(n) | C::Varbinary(n) if *n == 0 || *n > 2000 => "BLOB".into(),
            C::Binary(n) | C::Varbinary(n) => format!("RAW({})", n),
            C::Blob => "BLOB".into(),
            C::Date => "DATE".into(),
            C::Time | C::DateTime => "TIMESTAMP".into(),
            C::DateTimeTz => "TIMESTAMP WITH TIME ZONE".into(),
            C::Uuid => "RAW(16)".into(),
            C::Json => "CLOB".into(),
            C::Xml => "XMLTYPE".into(),
            C::Unknown(s) => s.clone(),
        },
        DatabaseType::SqlServer => match canonical {
            C::Boolean => "BIT".into(),
            C::UInt8 => "TINYINT".into(),
            C::Int16 => "SMALLINT".into(),
            C::Int32 => "INT".into(),
            C::Int64 => "BIGINT".into(),
            C::Float32 => "REAL".into(),
            C::Float64 => "FLOAT".into(),
            C::Decimal { precision, scale } => format!("DECIMAL({},{})", precision.min(&38), scale),
            C::Number => "DECIMAL(38,10)".into(),
            C::Money => "MONEY".into(),
            C::Char(n) => format!("NCHAR({})", n.clamp(&1, &4000)),
            C::Varchar(n) if *n == 0 || *n > 4000 => "NVARCHAR(MAX)".into(),
            C::Varchar(n) => format!("NVARCHAR({})", n),
            C::Text | C::Json => "NVARCHAR(MAX)".into(),
            C::Binary(n) => format!("BINARY({})", n.clamp(&1, &8000)),
            C::Varbinary(n) if *n == 0 || *n > 8000 => "VARBINARY(MAX)".into(),
            C::Varbinary(n) => format!("VARBINARY({})", n),
            C::Blob => "VARBINARY(MAX)".into(),
            C::Date => "DATE".into(),
            C::Time => "TIME".into(),
            C::DateTime => "DATETIME2".into(),
            C::DateTimeTz => "DATETIMEOFFSET".into(),
            C::Uuid => "UNIQUEIDENTIFIER".into(),
            C::Xml => "XML".into(),
            C::Unknown(s) => s.clone(),
        },
        DatabaseType::MySql => match canonical {
            C::Boolean => "TINYINT(1)".into(),
            C::UInt8 => "TINYINT UNSIGNED".into(),
            C::Int16 => "SMALLINT".into(),
            C::Int32 => "INT".into(),
            C::Int64 => "BIGINT".into(),
            C::Float32 => "FLOAT".into(),
            C::Float64 => "DOUBLE".into(),
            C::Decimal { precision, scale } => format!("DECIMAL({},{})", precision.min(&65), scale),
            C::Number => "DECIMAL(65,30)".into(),
            C::Money => "DECIMAL(19,4)".into(),
            C::Char(n) if *n > 255 => format!("VARCHAR({})", n),
            C::Char(n) => format!("CHAR({})", n),
            C::Varchar(n) if *n == 0 || *n > 16383 => "LONGTEXT".into(),
            C::Varchar(n) => format!("VARCHAR({})", n),
            C::Text => "LONGTEXT".into(),
            C::Binary(n) => format!("BINARY({})", n.clamp(&1, &255)),
            C::Varbinary(n) if *n == 0 || *n > 65535 => "LONGBLOB".into(),
            C::Varbinary(n) => format!("VARBINARY({})", n),
            C::Blob => "LONGBLOB".into(),
            C::Date => "DATE".into(),
            C::Time => "TIME".into(),
            C::DateTime | C::DateTimeTz => "DATETIME(6)".into(),
            C::Uuid => "CHAR(36)".into(),
            C::Json => "JSON".into(),
            C::Xml => "LONGTEXT".into(),
            C::Unknown(s) => s.clone(),
        },
        DatabaseType::Postgres => match canonical {
            C::Boolean => "BOOLEAN".into(),
            C::UInt8 | C::Int16 => "SMALLINT".into(),
            C::Int32 => "INTEGER".into(),
            C::Int64 => "BIGINT".into(),
            C::Float32 => "REAL".into(),
            C::Float64 => "DOUBLE PRECISION".into(),
            C::Decimal { precision, scale } => format!("NUMERIC({},{})", precision, scale),
            C::Number => "NUMERIC".into(),
            C::Money => "NUMERIC(19,4)".into(),
            C::Char(n) => format!("CHAR({})", n),
            C::Varchar(0) => "TEXT".into(),
            C::Varchar(n) => format!("VARCHAR({})", n),
            C::Text => "TEXT".into(),
            C::Xml => "XML".into(),
            C::Binary(_) | C::Varbinary(_) | C::Blob => "BYTEA".into(),
            C::Date => "DATE".into(),
            C::Time => "TIME".into(),
            C::DateTime => "TIMESTAMP".into(),
            C::DateTimeTz => "TIMESTAMPTZ".into(),
            C::Uuid => "UUID".into(),
            C::Json => "JSONB".into(),
            C::Unknown(s) => s.clone(),
        },
    }
}

fn is_lossy(target: DatabaseType, canonical: &CanonicalType) -> bool {
    use CanonicalType as C;

    match (target, canonical) {
        (_, C::Unknown(_)) => true,
        (DatabaseType::MySql, C::DateTimeTz) => true,
        (DatabaseType::Oracle, C::Time) => true,
        (DatabaseType::MySql, C::Decimal { precision, .. }) => *precision > 65,
        _ => false,
    }
}
