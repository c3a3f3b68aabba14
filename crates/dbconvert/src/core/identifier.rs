//! Identifier validation, quoting and normalization.
//!
//! Generated DDL and data scripts splice table, column and schema names into
//! SQL text, so every name goes through [`validate_identifier`] and the quoting
//! helper of the target dialect. Routine bodies keep the author's spelling; only
//! the sigils and delimiters that differ between dialects are normalized here.

use crate::error::{ConvertError, Result};

/// Maximum identifier length accepted before quoting (SQL Server's limit, the largest).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier before it is spliced into generated SQL.
///
/// Rejects empty names, names containing null bytes and names longer than
/// any supported engine accepts.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConvertError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(ConvertError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConvertError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote with double quotes (PostgreSQL, Oracle).
pub fn quote_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a MySQL identifier using backticks.
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote a SQL Server identifier using brackets.
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Remove one level of `"…"`, `[…]` or `` `…` `` delimiters from each dotted part.
///
/// ```rust
/// use dbconvert::core::identifier::unquote;
///
/// assert_eq!(unquote("[dbo].[Orders]"), "dbo.Orders");
/// assert_eq!(unquote("`shop`.items"), "shop.items");
/// ```
pub fn unquote(name: &str) -> String {
    split_qualified(name)
        .iter()
        .map(|part| unquote_part(part))
        .collect::<Vec<_>>()
        .join(".")
}

fn unquote_part(part: &str) -> String {
    let trimmed = part.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next_back()) {
        (Some('"'), Some('"')) if trimmed.len() >= 2 => {
            trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
        }
        (Some('['), Some(']')) => trimmed[1..trimmed.len() - 1].replace("]]", "]"),
        (Some('`'), Some('`')) if trimmed.len() >= 2 => {
            trimmed[1..trimmed.len() - 1].replace("``", "`")
        }
        _ => trimmed.to_string(),
    }
}

/// Split a possibly quoted, dot-qualified name into its parts.
///
/// Dots inside delimiters do not split.
pub fn split_qualified(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut closing: Option<char> = None;

    for ch in name.chars() {
        match closing {
            Some(end) => {
                current.push(ch);
                if ch == end {
                    closing = None;
                }
            }
            None => match ch {
                '"' => {
                    closing = Some('"');
                    current.push(ch);
                }
                '`' => {
                    closing = Some('`');
                    current.push(ch);
                }
                '[' => {
                    closing = Some(']');
                    current.push(ch);
                }
                '.' => parts.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }
    parts.push(current);
    parts
}

/// Last part of a qualified name, unquoted.
pub fn base_name(name: &str) -> String {
    split_qualified(name)
        .last()
        .map(|p| unquote_part(p))
        .unwrap_or_default()
}

/// Strip a T-SQL local-variable sigil (`@x` → `x`); globals (`@@x`) are left alone.
pub fn strip_variable_sigil(name: &str) -> &str {
    if name.starts_with('@') && !name.starts_with("@@") {
        &name[1..]
    } else {
        name
    }
}

/// Strip a T-SQL temporary-table marker (`#t`, `##t` → `t`).
pub fn strip_temp_marker(name: &str) -> &str {
    name.trim_start_matches('#')
}

/// Whether a T-SQL table name denotes a temporary table.
pub fn is_temp_table(name: &str) -> bool {
    base_name(name).starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("bad\0name").is_err());
        assert!(validate_identifier(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_quote_escapes_delimiters() {
        assert_eq!(quote_pg("table\"name").unwrap(), "\"table\"\"name\"");
        assert_eq!(quote_mysql("table`name").unwrap(), "`table``name`");
        assert_eq!(quote_mssql("table]name").unwrap(), "[table]]name]");
    }

    #[test]
    fn test_unquote_roundtrip() {
        assert_eq!(unquote(&quote_mssql("a]b").unwrap()), "a]b");
        assert_eq!(unquote(&quote_pg("a\"b").unwrap()), "a\"b");
        assert_eq!(unquote("\"HR\".\"EMP\""), "HR.EMP");
    }

    #[test]
    fn test_split_qualified_respects_delimiters() {
        assert_eq!(split_qualified("[a.b].c"), vec!["[a.b]", "c"]);
        assert_eq!(split_qualified("plain"), vec!["plain"]);
        assert_eq!(base_name("dbo.[Order Details]"), "Order Details");
    }

    #[test]
    fn test_sigils() {
        assert_eq!(strip_variable_sigil("@total"), "total");
        assert_eq!(strip_variable_sigil("@@FETCH_STATUS"), "@@FETCH_STATUS");
        assert_eq!(strip_temp_marker("##scratch"), "scratch");
        assert!(is_temp_table("dbo.#work"));
        assert!(!is_temp_table("work"));
    }
}
