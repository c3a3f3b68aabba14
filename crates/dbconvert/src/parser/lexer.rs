//! Lexing on top of the `sqlparser` tokenizer.
//!
//! The tokenizer does the hard part (quoting rules, comments, dollar quoting,
//! per-dialect identifier characters). This module turns its output into
//! [`Lexeme`]s that keep the exact source slice and byte offsets, which the
//! grammars need to cut expression text out of the original source.

use sqlparser::dialect::{Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::tokenizer::{Location, Token as SqlToken, Tokenizer};

use crate::dialect::DatabaseType;
use crate::error::{ConvertError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    /// Unquoted word: keyword, identifier, bind variable (`:x`, `@x`, `$1`).
    Word,
    /// Delimited identifier (`"x"`, `[x]`, `` `x` ``).
    QuotedIdent,
    Number,
    String,
    /// PostgreSQL `$tag$ ... $tag$` body.
    DollarString,
    Punct,
}

/// One token with its exact source text and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub text: String,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Lexeme {
    /// Case-insensitive keyword test on unquoted words.
    pub fn is_word(&self, keyword: &str) -> bool {
        self.kind == LexemeKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == LexemeKind::Punct && self.text == punct
    }

    /// Word or delimited identifier.
    pub fn is_name(&self) -> bool {
        matches!(self.kind, LexemeKind::Word | LexemeKind::QuotedIdent)
    }

    pub fn upper(&self) -> String {
        self.text.to_ascii_uppercase()
    }
}

/// Maps between byte offsets and 1-based (line, column) positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// Byte offset of a tokenizer location (columns count characters).
    pub fn offset(&self, source: &str, location: Location) -> usize {
        let line = (location.line.max(1) as usize).min(self.line_starts.len());
        let start = self.line_starts[line - 1];
        let chars_before = (location.column.max(1) - 1) as usize;
        source[start..]
            .char_indices()
            .nth(chars_before)
            .map(|(i, _)| start + i)
            .unwrap_or(source.len())
    }

    /// 1-based (line, column) of a byte offset.
    pub fn position(&self, source: &str, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts[line];
        let end = offset.min(source.len());
        let column = source.get(start..end).map(|s| s.chars().count()).unwrap_or(0) + 1;
        (line + 1, column)
    }
}

fn tokenizer_dialect(db: DatabaseType) -> Box<dyn Dialect> {
    match db {
        DatabaseType::Oracle => Box::new(GenericDialect {}),
        DatabaseType::SqlServer => Box::new(MsSqlDialect {}),
        DatabaseType::MySql => Box::new(MySqlDialect {}),
        DatabaseType::Postgres => Box::new(PostgreSqlDialect {}),
    }
}

/// Tokenize a whole source text.
pub fn tokenize(db: DatabaseType, source: &str) -> Result<Vec<Lexeme>> {
    let index = LineIndex::new(source);
    tokenize_range(db, source, &index, 0..source.len())
}

/// Tokenize `source[range]`, reporting offsets and positions relative to the
/// whole `source` (used for dollar-quoted routine bodies).
pub fn tokenize_range(
    db: DatabaseType,
    source: &str,
    index: &LineIndex,
    range: std::ops::Range<usize>,
) -> Result<Vec<Lexeme>> {
    let fragment = &source[range.clone()];
    let base = range.start;
    let dialect = tokenizer_dialect(db);
    let tokens = Tokenizer::new(dialect.as_ref(), fragment)
        .with_unescape(false)
        .tokenize_with_location()
        .map_err(|e| {
            let local = LineIndex::new(fragment).offset(fragment, e.location);
            let (line, column) = index.position(source, base + local);
            ConvertError::syntax(line, column, e.message)
        })?;

    let local_index = LineIndex::new(fragment);
    let mut out: Vec<Lexeme> = Vec::with_capacity(tokens.len());
    for t in tokens {
        let kind = match &t.token {
            SqlToken::Whitespace(_) | SqlToken::EOF => continue,
            SqlToken::Word(w) if w.quote_style.is_some() => LexemeKind::QuotedIdent,
            SqlToken::Word(_) => LexemeKind::Word,
            SqlToken::Number(..) => LexemeKind::Number,
            SqlToken::DollarQuotedString(_) => LexemeKind::DollarString,
            _ => LexemeKind::Punct,
        };
        let start = local_index.offset(fragment, t.span.start);
        let end = local_index.offset(fragment, t.span.end).max(start);
        let text = fragment[start..end].to_string();
        let kind = refine_kind(kind, &text);
        let (line, column) = index.position(source, base + start);
        out.push(Lexeme {
            kind,
            text,
            start: base + start,
            end: base + end,
            line,
            column,
        });
    }
    Ok(merge_compound(out, source))
}

/// Classify the tokens the match above lumps together as punctuation.
fn refine_kind(kind: LexemeKind, text: &str) -> LexemeKind {
    if kind != LexemeKind::Punct {
        return kind;
    }
    let mut chars = text.chars();
    let first = chars.next();
    let second = chars.next();
    match (first, second) {
        (Some('\''), _) | (Some('"'), _) => LexemeKind::String,
        (Some('N' | 'n' | 'E' | 'e' | 'X' | 'x' | 'B' | 'b'), Some('\'')) => LexemeKind::String,
        (Some(':'), Some(c)) if c.is_alphabetic() || c == '_' => LexemeKind::Word,
        (Some('$'), Some(c)) if c.is_ascii_digit() => LexemeKind::Word,
        (Some('@'), Some(_)) => LexemeKind::Word,
        _ => LexemeKind::Punct,
    }
}

/// Join `:` `=` into `:=` and a sigil followed by an adjacent word into one word.
fn merge_compound(lexemes: Vec<Lexeme>, source: &str) -> Vec<Lexeme> {
    let mut out: Vec<Lexeme> = Vec::with_capacity(lexemes.len());
    for lex in lexemes {
        // `label:LOOP` is a label, not a bind variable.
        let after_name = out.len() >= 2 && {
            let before = &out[out.len() - 2];
            before.end == out[out.len() - 1].start && (before.is_name() || before.is_punct(")"))
        };
        if let Some(prev) = out.last_mut() {
            let adjacent = prev.end == lex.start;
            let sigil = prev.kind == LexemeKind::Punct
                && (matches!(prev.text.as_str(), "@" | "@@") || (prev.text == ":" && !after_name));
            if adjacent && prev.is_punct(":") && lex.is_punct("=") {
                prev.text = ":=".to_string();
                prev.end = lex.end;
                continue;
            }
            if adjacent && sigil && lex.kind == LexemeKind::Word {
                prev.kind = LexemeKind::Word;
                prev.end = lex.end;
                prev.text = source[prev.start..prev.end].to_string();
                continue;
            }
        }
        out.push(lex);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(db: DatabaseType, sql: &str) -> Vec<String> {
        tokenize(db, sql).unwrap().into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn test_slices_keep_source_spelling() {
        let lexemes = tokenize(DatabaseType::SqlServer, "SELECT [Order Id] FROM dbo.t -- note\nWHERE x='a''b'").unwrap();
        let quoted = &lexemes[1];
        assert_eq!(quoted.kind, LexemeKind::QuotedIdent);
        assert_eq!(quoted.text, "[Order Id]");
        let last = lexemes.last().unwrap();
        assert_eq!(last.kind, LexemeKind::String);
        assert_eq!(last.text, "'a''b'");
        assert_eq!(last.line, 2);
    }

    #[test]
    fn test_positions_and_offsets() {
        let sql = "BEGIN\n  x := 1;\nEND;";
        let lexemes = tokenize(DatabaseType::Oracle, sql).unwrap();
        let assign = lexemes.iter().find(|l| l.text == ":=").unwrap();
        assert_eq!((assign.line, assign.column), (2, 5));
        assert_eq!(&sql[assign.start..assign.end], ":=");
    }

    #[test]
    fn test_bind_variables_are_words() {
        let words = texts(DatabaseType::Oracle, ":NEW.id := :OLD.id;");
        assert_eq!(words[0], ":NEW");
        let lexemes = tokenize(DatabaseType::SqlServer, "SET @total = @@ROWCOUNT").unwrap();
        assert_eq!(lexemes[1].text, "@total");
        assert_eq!(lexemes[1].kind, LexemeKind::Word);
        assert_eq!(lexemes[3].text, "@@ROWCOUNT");
    }

    #[test]
    fn test_dollar_quoted_body() {
        let lexemes = tokenize(DatabaseType::Postgres, "AS $$ BEGIN END; $$ LANGUAGE plpgsql").unwrap();
        assert_eq!(lexemes[1].kind, LexemeKind::DollarString);
        assert_eq!(lexemes[1].text, "$$ BEGIN END; $$");
    }

    #[test]
    fn test_unterminated_string_reports_position() {
        let err = tokenize(DatabaseType::MySql, "SELECT 1;\nSELECT 'oops").unwrap_err();
        match err {
            ConvertError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_line_index_roundtrip() {
        let src = "ab\ncdé\nf";
        let index = LineIndex::new(src);
        assert_eq!(index.position(src, 0), (1, 1));
        assert_eq!(index.position(src, 5), (2, 3));
        assert_eq!(index.offset(src, Location { line: 3, column: 1 }), src.len() - 1);
    }
}
