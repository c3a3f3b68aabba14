//! Static function tables.
//!
//! Two kinds of table live here:
//!
//! - [`FunctionSpecification`] lists, per dialect, the built-in functions the
//!   translator recognizes with their argument signature and call style.
//! - [`FunctionMapping`] rows tie the spellings of one function concept across
//!   dialects together, each with the [`Shape`] of its argument list.
//!
//! Within a mapping row the first entry of a dialect is the spelling written
//! for that dialect. Every entry with a name is readable. An entry with an
//! empty name has no call syntax and can only be written.

use crate::dialect::DatabaseType;

/// A built-in function of one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpecification {
    pub name: &'static str,
    /// Declared argument signature, for diagnostics.
    pub arguments: &'static str,
    /// Called without parentheses (`SYSDATE`, `CURRENT_USER`).
    pub no_parentheses: bool,
}

const fn f(name: &'static str, arguments: &'static str) -> FunctionSpecification {
    FunctionSpecification {
        name,
        arguments,
        no_parentheses: false,
    }
}

const fn bare(name: &'static str) -> FunctionSpecification {
    FunctionSpecification {
        name,
        arguments: "",
        no_parentheses: true,
    }
}

const ORACLE: &[FunctionSpecification] = &[
    f("NVL", "expr, replacement"),
    f("NVL2", "expr, not_null_value, null_value"),
    f("COALESCE", "expr, ..."),
    f("SUBSTR", "string, position[, length]"),
    f("LENGTH", "string"),
    f("INSTR", "string, substring[, position[, occurrence]]"),
    f("CONCAT", "string1, string2"),
    bare("SYSDATE"),
    bare("SYSTIMESTAMP"),
    bare("USER"),
    f("CEIL", "number"),
    f("FLOOR", "number"),
    f("ROUND", "number[, digits]"),
    f("TRUNC", "value[, format]"),
    bare("DBMS_RANDOM.VALUE"),
    f("SYS_GUID", ""),
    f("EXTRACT", "unit FROM datetime"),
    f("ADD_MONTHS", "date, months"),
    f("MONTHS_BETWEEN", "date1, date2"),
    f("CHR", "code"),
    f("MOD", "dividend, divisor"),
    f("DECODE", "expr, search, result, ...[, default]"),
    f("UPPER", "string"),
    f("LOWER", "string"),
    f("TRIM", "string"),
    f("LTRIM", "string[, set]"),
    f("RTRIM", "string[, set]"),
    f("REPLACE", "string, search[, replacement]"),
    f("ABS", "number"),
    f("TO_CHAR", "value[, format]"),
    f("TO_DATE", "string[, format]"),
    f("TO_NUMBER", "string[, format]"),
];

const SQL_SERVER: &[FunctionSpecification] = &[
    f("ISNULL", "expr, replacement"),
    f("COALESCE", "expr, ..."),
    f("SUBSTRING", "string, start, length"),
    f("LEN", "string"),
    f("CHARINDEX", "substring, string[, start]"),
    f("CONCAT", "string1, string2, ..."),
    f("GETDATE", ""),
    f("SYSDATETIME", ""),
    bare("CURRENT_TIMESTAMP"),
    f("SUSER_SNAME", ""),
    f("CEILING", "number"),
    f("FLOOR", "number"),
    f("ROUND", "number, digits"),
    f("RAND", "[seed]"),
    f("NEWID", ""),
    f("DATEPART", "unit, date"),
    f("YEAR", "date"),
    f("MONTH", "date"),
    f("DAY", "date"),
    f("DATEADD", "unit, number, date"),
    f("DATEDIFF", "unit, startdate, enddate"),
    f("CHAR", "code"),
    f("LEFT", "string, length"),
    f("RIGHT", "string, length"),
    f("IIF", "condition, true_value, false_value"),
    f("UPPER", "string"),
    f("LOWER", "string"),
    f("LTRIM", "string"),
    f("RTRIM", "string"),
    f("REPLACE", "string, search, replacement"),
    f("ABS", "number"),
    f("CAST", "expr AS type"),
    f("CONVERT", "type, expr[, style]"),
];

const MYSQL: &[FunctionSpecification] = &[
    f("IFNULL", "expr, replacement"),
    f("COALESCE", "expr, ..."),
    f("SUBSTRING", "string, position[, length]"),
    f("SUBSTR", "string, position[, length]"),
    f("CHAR_LENGTH", "string"),
    f("LENGTH", "string"),
    f("INSTR", "string, substring"),
    f("LOCATE", "substring, string[, position]"),
    f("CONCAT", "string1, string2, ..."),
    f("NOW", ""),
    f("SYSDATE", ""),
    bare("CURRENT_TIMESTAMP"),
    f("CURRENT_USER", ""),
    f("CEIL", "number"),
    f("CEILING", "number"),
    f("FLOOR", "number"),
    f("ROUND", "number[, digits]"),
    f("RAND", "[seed]"),
    f("UUID", ""),
    f("EXTRACT", "unit FROM date"),
    f("YEAR", "date"),
    f("MONTH", "date"),
    f("DAY", "date"),
    f("DATE_ADD", "date, INTERVAL number unit"),
    f("TIMESTAMPADD", "unit, number, date"),
    f("TIMESTAMPDIFF", "unit, start, end"),
    f("DATEDIFF", "end, start"),
    f("CHAR", "code"),
    f("LEFT", "string, length"),
    f("RIGHT", "string, length"),
    f("MOD", "dividend, divisor"),
    f("IF", "condition, true_value, false_value"),
    f("UPPER", "string"),
    f("LOWER", "string"),
    f("TRIM", "string"),
    f("REPLACE", "string, search, replacement"),
    f("ABS", "number"),
    f("CAST", "expr AS type"),
];

const POSTGRES: &[FunctionSpecification] = &[
    f("COALESCE", "expr, ..."),
    f("SUBSTRING", "string, start[, length]"),
    f("SUBSTR", "string, start[, length]"),
    f("LENGTH", "string"),
    f("CHAR_LENGTH", "string"),
    f("STRPOS", "string, substring"),
    f("CONCAT", "string1, string2, ..."),
    f("NOW", ""),
    bare("CURRENT_TIMESTAMP"),
    bare("CURRENT_USER"),
    f("CEIL", "number"),
    f("CEILING", "number"),
    f("FLOOR", "number"),
    f("ROUND", "number[, digits]"),
    f("RANDOM", ""),
    f("GEN_RANDOM_UUID", ""),
    f("EXTRACT", "unit FROM source"),
    f("DATE_PART", "'unit', source"),
    f("CHR", "code"),
    f("LEFT", "string, length"),
    f("RIGHT", "string, length"),
    f("MOD", "dividend, divisor"),
    f("UPPER", "string"),
    f("LOWER", "string"),
    f("TRIM", "string"),
    f("REPLACE", "string, search, replacement"),
    f("ABS", "number"),
    f("CAST", "expr AS type"),
    f("TO_CHAR", "value, format"),
];

/// The function table of a dialect.
pub fn specifications(db: DatabaseType) -> &'static [FunctionSpecification] {
    match db {
        DatabaseType::Oracle => ORACLE,
        DatabaseType::SqlServer => SQL_SERVER,
        DatabaseType::MySql => MYSQL,
        DatabaseType::Postgres => POSTGRES,
    }
}

/// Look up a function by name, case-insensitively.
pub fn find(db: DatabaseType, name: &str) -> Option<&'static FunctionSpecification> {
    specifications(db)
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

// ===== Cross-dialect mappings =====

/// How a spelling arranges the arguments of its concept.
///
/// Canonical argument orders: `position` is (haystack, needle), `dateadd` is
/// (amount, date), `datediff` is (start, end), `datepart` is (date) with the
/// unit carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Arguments in canonical order.
    Args,
    /// First two arguments swapped.
    SwappedArgs,
    /// Date unit first, then canonical arguments.
    UnitFirst,
    /// `NAME(unit FROM date)`.
    ExtractFrom,
    /// A function fixed to one date unit (`YEAR(d)`).
    ExtractFixed(&'static str),
    /// `DATE_ADD(date, INTERVAL n unit)`.
    IntervalAdd,
    /// `ADD_MONTHS(date, n)`.
    AddMonths,
    /// `DATEDIFF(end, start)` counting days.
    DayDiff,
    /// `(date + (n) * INTERVAL '1 unit')`. Write only.
    IntervalArithmetic,
    /// Oracle date subtraction and `MONTHS_BETWEEN`. Write only.
    DateSubtraction,
    /// PostgreSQL date subtraction through casts and `DATE_PART`. Write only.
    CastDateSubtraction,
    /// `(a % b)`. Write only.
    Modulo,
    /// `CONCAT(a, b)`, or `(a || b || c)` past two arguments.
    Concatenation,
    /// `SUBSTR(s, 1, n)`. Write only.
    LeadingSubstr,
    /// `SUBSTR(s, -(n))`. Write only.
    TrailingSubstr,
    /// `CASE WHEN c THEN a ELSE b END`. Write only.
    CaseWhen,
    /// `CASE e WHEN s THEN r ... ELSE d END`. Write only.
    Decode,
}

/// One spelling of a concept.
#[derive(Debug, Clone, Copy)]
pub struct MappingEntry {
    pub db: DatabaseType,
    pub name: &'static str,
    pub shape: Shape,
}

/// All spellings of one function concept.
#[derive(Debug, Clone, Copy)]
pub struct FunctionMapping {
    pub concept: &'static str,
    pub entries: &'static [MappingEntry],
}

impl FunctionMapping {
    /// The spelling written for `db`.
    pub fn writer(&self, db: DatabaseType) -> Option<&'static MappingEntry> {
        self.entries.iter().find(|e| e.db == db)
    }

    /// Spellings of `db` that can be read.
    pub fn readers(&self, db: DatabaseType) -> impl Iterator<Item = &'static MappingEntry> {
        self.entries
            .iter()
            .filter(move |e| e.db == db && !e.name.is_empty())
    }
}

const fn e(db: DatabaseType, name: &'static str, shape: Shape) -> MappingEntry {
    MappingEntry { db, name, shape }
}

use self::Shape::*;
use crate::dialect::DatabaseType::{MySql as MY, Oracle as ORA, Postgres as PG, SqlServer as MS};

pub const MAPPINGS: &[FunctionMapping] = &[
    FunctionMapping {
        concept: "ifnull",
        entries: &[
            e(ORA, "NVL", Args),
            e(MS, "ISNULL", Args),
            e(MY, "IFNULL", Args),
            e(PG, "COALESCE", Args),
        ],
    },
    FunctionMapping {
        concept: "substr",
        entries: &[
            e(ORA, "SUBSTR", Args),
            e(MS, "SUBSTRING", Args),
            e(MY, "SUBSTRING", Args),
            e(MY, "SUBSTR", Args),
            e(PG, "SUBSTRING", Args),
            e(PG, "SUBSTR", Args),
        ],
    },
    FunctionMapping {
        concept: "length",
        entries: &[
            e(ORA, "LENGTH", Args),
            e(MS, "LEN", Args),
            e(MY, "CHAR_LENGTH", Args),
            e(MY, "LENGTH", Args),
            e(PG, "LENGTH", Args),
            e(PG, "CHAR_LENGTH", Args),
        ],
    },
    FunctionMapping {
        concept: "position",
        entries: &[
            e(ORA, "INSTR", Args),
            e(MS, "CHARINDEX", SwappedArgs),
            e(MY, "INSTR", Args),
            e(MY, "LOCATE", SwappedArgs),
            e(PG, "STRPOS", Args),
        ],
    },
    FunctionMapping {
        concept: "concat",
        entries: &[
            e(ORA, "CONCAT", Concatenation),
            e(MS, "CONCAT", Args),
            e(MY, "CONCAT", Args),
            e(PG, "CONCAT", Args),
        ],
    },
    FunctionMapping {
        concept: "now",
        entries: &[
            e(ORA, "SYSDATE", Args),
            e(ORA, "SYSTIMESTAMP", Args),
            e(MS, "GETDATE", Args),
            e(MS, "SYSDATETIME", Args),
            e(MS, "CURRENT_TIMESTAMP", Args),
            e(MY, "NOW", Args),
            e(MY, "SYSDATE", Args),
            e(MY, "CURRENT_TIMESTAMP", Args),
            e(PG, "NOW", Args),
            e(PG, "CURRENT_TIMESTAMP", Args),
        ],
    },
    FunctionMapping {
        concept: "user",
        entries: &[
            e(ORA, "USER", Args),
            e(MS, "SUSER_SNAME", Args),
            e(MY, "CURRENT_USER", Args),
            e(PG, "CURRENT_USER", Args),
        ],
    },
    FunctionMapping {
        concept: "ceil",
        entries: &[
            e(ORA, "CEIL", Args),
            e(MS, "CEILING", Args),
            e(MY, "CEIL", Args),
            e(MY, "CEILING", Args),
            e(PG, "CEIL", Args),
            e(PG, "CEILING", Args),
        ],
    },
    FunctionMapping {
        concept: "random",
        entries: &[
            e(ORA, "DBMS_RANDOM.VALUE", Args),
            e(MS, "RAND", Args),
            e(MY, "RAND", Args),
            e(PG, "RANDOM", Args),
        ],
    },
    FunctionMapping {
        concept: "newid",
        entries: &[
            e(ORA, "SYS_GUID", Args),
            e(MS, "NEWID", Args),
            e(MY, "UUID", Args),
            e(PG, "GEN_RANDOM_UUID", Args),
        ],
    },
    FunctionMapping {
        concept: "datepart",
        entries: &[
            e(ORA, "EXTRACT", ExtractFrom),
            e(MS, "DATEPART", UnitFirst),
            e(MS, "YEAR", ExtractFixed("YEAR")),
            e(MS, "MONTH", ExtractFixed("MONTH")),
            e(MS, "DAY", ExtractFixed("DAY")),
            e(MY, "EXTRACT", ExtractFrom),
            e(MY, "YEAR", ExtractFixed("YEAR")),
            e(MY, "MONTH", ExtractFixed("MONTH")),
            e(MY, "DAY", ExtractFixed("DAY")),
            e(PG, "EXTRACT", ExtractFrom),
            e(PG, "DATE_PART", UnitFirst),
        ],
    },
    FunctionMapping {
        concept: "dateadd",
        entries: &[
            e(ORA, "ADD_MONTHS", AddMonths),
            e(MS, "DATEADD", UnitFirst),
            e(MY, "DATE_ADD", IntervalAdd),
            e(MY, "TIMESTAMPADD", UnitFirst),
            e(PG, "", IntervalArithmetic),
        ],
    },
    FunctionMapping {
        concept: "datediff",
        entries: &[
            e(ORA, "", DateSubtraction),
            e(MS, "DATEDIFF", UnitFirst),
            e(MY, "TIMESTAMPDIFF", UnitFirst),
            e(MY, "DATEDIFF", DayDiff),
            e(PG, "", CastDateSubtraction),
        ],
    },
    FunctionMapping {
        concept: "chr",
        entries: &[
            e(ORA, "CHR", Args),
            e(MS, "CHAR", Args),
            e(MY, "CHAR", Args),
            e(PG, "CHR", Args),
        ],
    },
    FunctionMapping {
        concept: "left",
        entries: &[
            e(ORA, "", LeadingSubstr),
            e(MS, "LEFT", Args),
            e(MY, "LEFT", Args),
            e(PG, "LEFT", Args),
        ],
    },
    FunctionMapping {
        concept: "right",
        entries: &[
            e(ORA, "", TrailingSubstr),
            e(MS, "RIGHT", Args),
            e(MY, "RIGHT", Args),
            e(PG, "RIGHT", Args),
        ],
    },
    FunctionMapping {
        concept: "mod",
        entries: &[
            e(ORA, "MOD", Args),
            e(MS, "", Modulo),
            e(MY, "MOD", Args),
            e(PG, "MOD", Args),
        ],
    },
    FunctionMapping {
        concept: "decode",
        entries: &[
            e(ORA, "DECODE", Args),
            e(MS, "", Decode),
            e(MY, "", Decode),
            e(PG, "", Decode),
        ],
    },
    FunctionMapping {
        concept: "iif",
        entries: &[
            e(ORA, "", CaseWhen),
            e(MS, "IIF", Args),
            e(MY, "IF", Args),
            e(PG, "", CaseWhen),
        ],
    },
];

/// Normalize a date unit literal (`yy`, `'month'`, `dd`) to its keyword.
pub fn normalize_unit(text: &str) -> Option<&'static str> {
    let unit = text.trim().trim_matches(|c| c == '\'' || c == '"').to_ascii_uppercase();
    let unit = match unit.as_str() {
        "YEAR" | "YEARS" | "YY" | "YYYY" => "YEAR",
        "QUARTER" | "QQ" | "Q" => "QUARTER",
        "MONTH" | "MONTHS" | "MM" | "M" => "MONTH",
        "WEEK" | "WEEKS" | "WK" | "WW" => "WEEK",
        "DAY" | "DAYS" | "DD" | "D" => "DAY",
        "HOUR" | "HOURS" | "HH" => "HOUR",
        "MINUTE" | "MINUTES" | "MI" | "N" => "MINUTE",
        "SECOND" | "SECONDS" | "SS" | "S" => "SECOND",
        _ => return None,
    };
    Some(unit)
}
