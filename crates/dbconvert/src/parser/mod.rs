//! Concrete syntax for the four source dialects.
//!
//! Each dialect has a hand-written grammar producing a [`SyntaxNode`] tree
//! rooted at a `Script` node with exactly one unit child (`Procedure`,
//! `Function`, `Trigger`, `View` or `Block`). The adapters turn that tree into
//! the statement model.

pub mod cursor;
mod dml;
pub mod lexer;
mod mysql;
mod plsql;
mod postgres;
pub mod tree;
mod tsql;

use serde::{Deserialize, Serialize};

pub use cursor::Parser;
pub use tree::{SyntaxKind, SyntaxNode};

use crate::dialect::DatabaseType;
use crate::error::Result;
use crate::model::{Token, TokenKind};

/// What kind of object the source text is expected to define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    View,
    Procedure,
    Function,
    Trigger,
    CommonBlock,
    /// Take the kind from the `CREATE ...` header; headerless text is a block.
    Detect,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::View => "view",
            ParseMode::Procedure => "procedure",
            ParseMode::Function => "function",
            ParseMode::Trigger => "trigger",
            ParseMode::CommonBlock => "common_block",
            ParseMode::Detect => "detect",
        }
    }

    fn unit_kind(&self) -> Option<UnitKind> {
        match self {
            ParseMode::View => Some(UnitKind::View),
            ParseMode::Procedure => Some(UnitKind::Procedure),
            ParseMode::Function => Some(UnitKind::Function),
            ParseMode::Trigger => Some(UnitKind::Trigger),
            ParseMode::CommonBlock => Some(UnitKind::Block),
            ParseMode::Detect => None,
        }
    }
}

impl std::fmt::Display for ParseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "view" => Ok(ParseMode::View),
            "procedure" | "proc" => Ok(ParseMode::Procedure),
            "function" => Ok(ParseMode::Function),
            "trigger" => Ok(ParseMode::Trigger),
            "common_block" | "block" => Ok(ParseMode::CommonBlock),
            "detect" | "auto" => Ok(ParseMode::Detect),
            _ => Err(format!("unknown parse mode: {}", s)),
        }
    }
}

/// Kind of the single unit under the `Script` root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitKind {
    Procedure,
    Function,
    Trigger,
    View,
    Block,
}

impl UnitKind {
    fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Procedure => "procedure",
            UnitKind::Function => "function",
            UnitKind::Trigger => "trigger",
            UnitKind::View => "view",
            UnitKind::Block => "block",
        }
    }
}

/// Parse one object definition.
pub fn parse(db: DatabaseType, source: &str, mode: ParseMode) -> Result<SyntaxNode> {
    let cleaned;
    let source = if db == DatabaseType::MySql {
        cleaned = mysql::blank_definer(&mysql::strip_delimiters(source));
        cleaned.as_str()
    } else {
        source
    };

    let mut parser = Parser::new(db, source)?;
    let start = parser.mark();
    let unit = match db {
        DatabaseType::Postgres => parser.pg_unit(mode)?,
        _ => {
            let kind = parser.unit_header(mode)?;
            match db {
                DatabaseType::Oracle => parser.oracle_unit(kind, start)?,
                DatabaseType::SqlServer => parser.tsql_unit(kind, start)?,
                _ => parser.mysql_unit(kind, start)?,
            }
        }
    };

    // Trailing terminators: `;`, SQL*Plus `/`, T-SQL `GO`.
    loop {
        if parser.eat_punct(";") || parser.eat_punct("/") || parser.eat_word("GO") {
            continue;
        }
        break;
    }
    if !parser.at_end() {
        return Err(parser.expected("end of input"));
    }
    Ok(SyntaxNode::new(SyntaxKind::Script, source, 0, 1, 1).with_children(vec![unit]))
}

/// Identifier and function-call references of a standalone expression, as
/// child tokens with spans relative to `text`.
pub fn scan_references(db: DatabaseType, text: &str) -> Result<Vec<Token>> {
    let parser = Parser::new(db, text)?;
    if parser.lexeme_count() == 0 {
        return Ok(Vec::new());
    }
    let mut node = parser.expression_node(SyntaxKind::Expression, 0, parser.lexeme_count());
    // Anchor at the text start so leading whitespace does not shift spans.
    node.text = text.to_string();
    node.offset = 0;
    Ok(node.to_token(TokenKind::Expression).children)
}

impl<'s> Parser<'s> {
    /// Resolve the unit kind from the `CREATE` header and the requested mode.
    pub(crate) fn unit_header(&mut self, mode: ParseMode) -> Result<UnitKind> {
        let header = match self.create_header() {
            Some(h) => Some(h),
            // Catalog views store routine text without `CREATE`.
            None if self.at_any_word(&["PROCEDURE", "FUNCTION", "TRIGGER"])
                && self.peek_nth(1).is_some_and(|l| l.is_name()) =>
            {
                self.bump().map(|l| l.upper())
            }
            None => None,
        };
        let from_header = header.map(|h| match h.as_str() {
            "PROCEDURE" => UnitKind::Procedure,
            "FUNCTION" => UnitKind::Function,
            "TRIGGER" => UnitKind::Trigger,
            _ => UnitKind::View,
        });
        match (mode.unit_kind(), from_header) {
            (None, Some(kind)) | (Some(UnitKind::Block), Some(kind)) => Ok(kind),
            (None, None) | (Some(UnitKind::Block), None) => Ok(UnitKind::Block),
            (Some(UnitKind::View), None) if self.at_select() => Ok(UnitKind::View),
            (Some(expected), None) => Err(self.expected(&format!("CREATE {}", expected.as_str().to_uppercase()))),
            (Some(expected), Some(found)) if expected == found => Ok(found),
            (Some(expected), Some(found)) => Err(self.error(format!(
                "expected a {} definition, found a {}",
                expected.as_str(),
                found.as_str()
            ))),
        }
    }

    /// `name [(columns)] AS select`, or a bare select when no header was given.
    pub(super) fn view_unit(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = Vec::new();
        if !self.at_select() {
            children.push(self.name(SyntaxKind::Name)?);
            if self.at_punct("(") {
                children.push(self.column_list()?);
            }
            // WITH SCHEMABINDING, SQL SECURITY ..., and similar view options.
            while !self.at_word("AS") {
                if self.at_end() {
                    return Err(self.expected("AS"));
                }
                self.bump();
            }
            self.bump();
        }
        children.push(if self.at_paren_select() {
            self.paren_select()?
        } else {
            self.select()?
        });
        if self.eat_word("WITH") {
            while !self.at_statement_end() {
                self.bump();
            }
        }
        Ok(self.finish(SyntaxKind::View, start, children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    #[test]
    fn test_detect_mode_from_header() {
        let root = parse(DatabaseType::MySql, "CREATE VIEW v AS SELECT a FROM t", ParseMode::Detect).unwrap();
        assert_eq!(root.kind, SyntaxKind::Script);
        assert_eq!(root.children[0].kind, SyntaxKind::View);
        assert_eq!(root.children[0].child_text(SyntaxKind::Name), Some("v"));
    }

    #[test]
    fn test_view_mode_accepts_bare_select() {
        let root = parse(DatabaseType::Postgres, "SELECT a, b FROM t WHERE a > 0", ParseMode::View).unwrap();
        let view = &root.children[0];
        assert!(view.child(SyntaxKind::Name).is_none());
        assert!(view.has(SyntaxKind::Select));
    }

    #[test]
    fn test_mode_mismatch_is_a_syntax_error() {
        let err = parse(DatabaseType::Oracle, "CREATE VIEW v AS SELECT 1 FROM dual", ParseMode::Procedure).unwrap_err();
        assert!(matches!(err, ConvertError::Syntax { .. }));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let err = parse(
            DatabaseType::Oracle,
            "CREATE PROCEDURE p AS BEGIN NULL; END; extra",
            ParseMode::Procedure,
        )
        .unwrap_err();
        match err {
            ConvertError::Syntax { line, message, .. } => {
                assert_eq!(line, 1);
                assert!(message.contains("end of input"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scan_references() {
        let refs = scan_references(DatabaseType::SqlServer, "ISNULL(@a, 0) + t.b").unwrap();
        let spans: Vec<_> = refs.iter().map(|t| (t.kind, t.span.clone())).collect();
        assert_eq!(
            spans,
            vec![
                (TokenKind::FunctionCall, Some(0..13)),
                (TokenKind::Identifier, Some(7..9)),
                (TokenKind::Identifier, Some(16..19)),
            ]
        );
    }

    #[test]
    fn test_parse_mode_from_str() {
        assert_eq!("common-block".parse::<ParseMode>().unwrap(), ParseMode::CommonBlock);
        assert!("package".parse::<ParseMode>().is_err());
    }
}
