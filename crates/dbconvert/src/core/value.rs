//! SQL value types for table data transfer.
//!
//! Rows travel from the source collaborator to the target as [`SqlValue`]s.
//! When the conversion only generates a script, the same values are rendered as
//! dialect literals through [`SqlValue::to_literal`].

use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dialect::DatabaseType;

/// SQL value enum for type-safe row handling.
///
/// Uses `Cow` for string and byte data so collaborators can hand out borrowed
/// buffers; pages that cross a channel hold `'static` values.
///
/// ```rust
/// use std::borrow::Cow;
/// use dbconvert::core::SqlValue;
///
/// let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
/// let owned: SqlValue<'static> = borrowed.into_owned();
/// assert!(!owned.is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point.
    F32(f32),

    /// 64-bit floating point.
    F64(f64),

    /// Exact numeric.
    Decimal(Decimal),

    /// Text/string data.
    Text(Cow<'a, str>),

    /// Binary data.
    Bytes(Cow<'a, [u8]>),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null => SqlValue::Null,
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I16(v) => SqlValue::I16(v),
            SqlValue::I32(v) => SqlValue::I32(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::F32(v) => SqlValue::F32(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Decimal(v) => SqlValue::Decimal(v),
            SqlValue::Text(v) => SqlValue::Text(Cow::Owned(v.into_owned())),
            SqlValue::Bytes(v) => SqlValue::Bytes(Cow::Owned(v.into_owned())),
            SqlValue::Uuid(v) => SqlValue::Uuid(v),
            SqlValue::DateTime(v) => SqlValue::DateTime(v),
            SqlValue::DateTimeOffset(v) => SqlValue::DateTimeOffset(v),
            SqlValue::Date(v) => SqlValue::Date(v),
            SqlValue::Time(v) => SqlValue::Time(v),
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render the value as a literal of the given dialect.
    ///
    /// Used when data is emitted as `INSERT` statements into a generated
    /// script instead of being written through the target collaborator.
    pub fn to_literal(&self, db: DatabaseType) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => match db {
                DatabaseType::MySql | DatabaseType::Postgres => {
                    (if *v { "TRUE" } else { "FALSE" }).to_string()
                }
                DatabaseType::SqlServer | DatabaseType::Oracle => {
                    (if *v { "1" } else { "0" }).to_string()
                }
            },
            SqlValue::I16(v) => v.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F32(v) => float_literal(f64::from(*v), db),
            SqlValue::F64(v) => float_literal(*v, db),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::Text(v) => string_literal(v, db),
            SqlValue::Bytes(v) => bytes_literal(v, db),
            SqlValue::Uuid(v) => format!("'{}'", v),
            SqlValue::DateTime(v) => {
                let text = v.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
                match db {
                    DatabaseType::Oracle => format!(
                        "TO_TIMESTAMP('{}', 'YYYY-MM-DD HH24:MI:SS.FF6')",
                        text
                    ),
                    _ => format!("'{}'", text),
                }
            }
            SqlValue::DateTimeOffset(v) => match db {
                DatabaseType::MySql => {
                    format!("'{}'", v.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f"))
                }
                DatabaseType::Oracle => format!(
                    "TO_TIMESTAMP_TZ('{}', 'YYYY-MM-DD HH24:MI:SS.FF6 TZH:TZM')",
                    v.format("%Y-%m-%d %H:%M:%S%.6f %:z")
                ),
                DatabaseType::SqlServer | DatabaseType::Postgres => {
                    format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.6f %:z"))
                }
            },
            SqlValue::Date(v) => match db {
                DatabaseType::Oracle => format!("DATE '{}'", v.format("%Y-%m-%d")),
                _ => format!("'{}'", v.format("%Y-%m-%d")),
            },
            SqlValue::Time(v) => format!("'{}'", v.format("%H:%M:%S%.6f")),
        }
    }
}

fn float_literal(v: f64, db: DatabaseType) -> String {
    if v.is_finite() {
        return v.to_string();
    }
    match db {
        DatabaseType::Postgres => format!("'{}'::float8", v),
        _ => "NULL".to_string(),
    }
}

fn string_literal(v: &str, db: DatabaseType) -> String {
    let mut escaped = v.replace('\'', "''");
    match db {
        DatabaseType::MySql => {
            escaped = escaped.replace('\\', "\\\\");
            format!("'{}'", escaped)
        }
        DatabaseType::SqlServer => format!("N'{}'", escaped),
        DatabaseType::Oracle | DatabaseType::Postgres => format!("'{}'", escaped),
    }
}

fn bytes_literal(v: &[u8], db: DatabaseType) -> String {
    let mut hex = String::with_capacity(v.len() * 2);
    for b in v {
        let _ = write!(hex, "{:02X}", b);
    }
    match db {
        DatabaseType::SqlServer => format!("0x{}", hex),
        DatabaseType::MySql => format!("X'{}'", hex),
        DatabaseType::Postgres => format!("'\\x{}'::bytea", hex),
        DatabaseType::Oracle => format!("HEXTORAW('{}')", hex),
    }
}

// From implementations for common types
impl From<bool> for SqlValue<'static> {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue<'static> {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue<'static> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue<'static> {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<Decimal> for SqlValue<'static> {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<String> for SqlValue<'static> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

impl From<Uuid> for SqlValue<'static> {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDateTime> for SqlValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<NaiveDate> for SqlValue<'static> {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl<T> From<Option<T>> for SqlValue<'static>
where
    T: Into<SqlValue<'static>>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One table row.
pub type Row = Vec<SqlValue<'static>>;

/// A page of rows read from a source table.
///
/// Pages are the unit handed from the reader task to the writer through the
/// single-slot channel of the transfer pager.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Rows in this page (owned for channel transfer).
    pub rows: Vec<Row>,

    /// Offset of the first row within the table.
    pub offset: u64,

    /// Whether this is the final page of the table.
    pub is_last: bool,
}

impl Page {
    /// Create a new page starting at `offset`.
    pub fn new(offset: u64, rows: Vec<Row>) -> Self {
        Self {
            rows,
            offset,
            is_last: false,
        }
    }

    /// Mark this as the final page.
    pub fn mark_final(mut self) -> Self {
        self.is_last = true;
        self
    }

    /// Number of rows in this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_into_owned() {
        let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
        let owned: SqlValue<'static> = borrowed.into_owned();
        assert_eq!(owned, SqlValue::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_string_literals_escape_per_dialect() {
        let v = SqlValue::from("O'Brien \\ co");
        assert_eq!(v.to_literal(DatabaseType::Postgres), "'O''Brien \\ co'");
        assert_eq!(v.to_literal(DatabaseType::MySql), "'O''Brien \\\\ co'");
        assert_eq!(v.to_literal(DatabaseType::SqlServer), "N'O''Brien \\ co'");
    }

    #[test]
    fn test_bool_and_null_literals() {
        assert_eq!(SqlValue::Bool(true).to_literal(DatabaseType::MySql), "TRUE");
        assert_eq!(SqlValue::Bool(true).to_literal(DatabaseType::SqlServer), "1");
        assert_eq!(SqlValue::Null.to_literal(DatabaseType::Oracle), "NULL");
        let missing: SqlValue<'static> = Option::<i32>::None.into();
        assert!(missing.is_null());
    }

    #[test]
    fn test_bytes_and_dates() {
        let b = SqlValue::from(vec![0xde_u8, 0xad]);
        assert_eq!(b.to_literal(DatabaseType::SqlServer), "0xDEAD");
        assert_eq!(b.to_literal(DatabaseType::MySql), "X'DEAD'");
        assert_eq!(b.to_literal(DatabaseType::Postgres), "'\\xDEAD'::bytea");

        let d = SqlValue::from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(d.to_literal(DatabaseType::Oracle), "DATE '2024-02-29'");
        assert_eq!(d.to_literal(DatabaseType::MySql), "'2024-02-29'");
    }

    #[test]
    fn test_non_finite_float() {
        assert_eq!(SqlValue::F64(f64::NAN).to_literal(DatabaseType::MySql), "NULL");
        assert_eq!(SqlValue::F64(1.5).to_literal(DatabaseType::Oracle), "1.5");
    }

    #[test]
    fn test_page_operations() {
        let page = Page::new(0, vec![vec![SqlValue::I32(1)], vec![SqlValue::I32(2)]]);
        assert_eq!(page.len(), 2);
        assert!(!page.is_last);
        assert!(page.mark_final().is_last);
    }
}
