//! Token cursor shared by the dialect grammars.
//!
//! The grammars are hand-written recursive descent parsers. They only build
//! structure for statements; expressions are kept as source slices, with the
//! identifier and function-call references inside them found by
//! [`Parser::scan_refs`].

use std::ops::Range;

use super::lexer::{tokenize_range, Lexeme, LexemeKind, LineIndex};
use super::tree::{SyntaxKind, SyntaxNode};
use crate::dialect::DatabaseType;
use crate::error::{ConvertError, Result};

/// Words that never name a column, variable or function inside an expression.
const RESERVED: &[&str] = &[
    "ALL", "AND", "ANY", "APPLY", "AS", "ASC", "AT", "BEGIN", "BETWEEN", "BOTH", "BY", "CASE",
    "COLLATE", "CONNECT", "CROSS", "CURSOR", "DECLARE", "DEFAULT", "DESC", "DISTINCT", "DO",
    "ELSE", "ELSEIF", "ELSIF", "END", "ESCAPE", "EXCEPT", "EXISTS", "EXIT", "FALSE", "FETCH",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FROM", "FULL", "GROUP", "HAVING", "ILIKE", "IN",
    "INNER", "INTERSECT", "INTERVAL", "INTO", "IS", "JOIN", "LAST", "LATERAL", "LEADING", "LEAVE",
    "LEFT", "LIKE", "LIMIT", "LOOP", "MINUS", "MOD", "NATURAL", "NEXT", "NOT", "NULL", "NULLS",
    "OF", "OFFSET", "ON", "ONLY", "OR", "ORDER", "OUTER", "OVER", "PARTITION", "PRECEDING",
    "PRIOR", "RANGE", "RETURN", "RETURNING", "REVERSE", "RIGHT", "ROW", "ROWS", "SELECT",
    "SEPARATOR", "SET", "SIMILAR", "SOME", "START", "THEN", "TO", "TOP", "TRAILING", "TRUE",
    "UNBOUNDED", "UNION", "UNIQUE", "UNTIL", "USING", "VALUES", "WHEN", "WHERE", "WHILE", "WINDOW",
    "WITH", "WITHIN",
];

/// Reserved words that are function calls when followed by `(`.
const CALLABLE_KEYWORDS: &[&str] = &["LEFT", "RIGHT", "MOD"];

/// Words that start a new T-SQL statement when seen outside parentheses.
const TSQL_STATEMENT_START: &[&str] = &[
    "BEGIN", "BREAK", "CLOSE", "COMMIT", "CONTINUE", "CREATE", "DEALLOCATE", "DECLARE", "DELETE",
    "DROP", "ELSE", "END", "EXEC", "EXECUTE", "FETCH", "GO", "GOTO", "IF", "INSERT", "MERGE",
    "OPEN", "PRINT", "RAISERROR", "RETURN", "ROLLBACK", "SELECT", "SET", "THROW", "TRUNCATE",
    "UPDATE", "WHILE",
];

/// Words that may continue a data type after its first word.
const TYPE_CONTINUATION: &[&str] = &[
    "PRECISION", "VARYING", "UNSIGNED", "SIGNED", "ZEROFILL", "RAW", "CHARACTER", "CHAR",
    "LARGE", "OBJECT",
];

/// Words after which a trailing name is not an implicit alias.
const NOT_ALIAS: &[&str] = &["DAY", "MONTH", "YEAR", "HOUR", "MINUTE", "SECOND"];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

fn matches_stop(lex: &Lexeme, stop: &str) -> bool {
    if stop.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        lex.is_word(stop)
    } else {
        lex.is_punct(stop)
    }
}

/// Recursive descent cursor over the lexemes of one source text.
pub struct Parser<'s> {
    db: DatabaseType,
    source: &'s str,
    index: LineIndex,
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl<'s> Parser<'s> {
    pub fn new(db: DatabaseType, source: &'s str) -> Result<Self> {
        let index = LineIndex::new(source);
        let lexemes = tokenize_range(db, source, &index, 0..source.len())?;
        Ok(Self {
            db,
            source,
            index,
            lexemes,
            pos: 0,
        })
    }

    /// Parser over a byte range of the same source (dollar-quoted bodies).
    pub fn sub_parser(&self, range: Range<usize>) -> Result<Parser<'s>> {
        let lexemes = tokenize_range(self.db, self.source, &self.index, range)?;
        Ok(Parser {
            db: self.db,
            source: self.source,
            index: self.index.clone(),
            lexemes,
            pos: 0,
        })
    }

    pub fn db(&self) -> DatabaseType {
        self.db
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    // ===== Position =====

    pub fn mark(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    pub fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Lexeme> {
        self.lexemes.get(self.pos + n)
    }

    pub fn lexeme(&self, idx: usize) -> Option<&Lexeme> {
        self.lexemes.get(idx)
    }

    pub fn lexeme_count(&self) -> usize {
        self.lexemes.len()
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    pub fn bump(&mut self) -> Option<Lexeme> {
        let lex = self.lexemes.get(self.pos).cloned();
        if lex.is_some() {
            self.pos += 1;
        }
        lex
    }

    // ===== Lookahead =====

    pub fn at_word(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|l| l.is_word(keyword))
    }

    pub fn at_word_nth(&self, n: usize, keyword: &str) -> bool {
        self.peek_nth(n).is_some_and(|l| l.is_word(keyword))
    }

    /// Whether the next lexemes are exactly these words.
    pub fn at_words(&self, keywords: &[&str]) -> bool {
        keywords.iter().enumerate().all(|(i, k)| self.at_word_nth(i, k))
    }

    pub fn at_any_word(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.at_word(k))
    }

    pub fn at_punct(&self, punct: &str) -> bool {
        self.peek().is_some_and(|l| l.is_punct(punct))
    }

    pub fn at_punct_nth(&self, n: usize, punct: &str) -> bool {
        self.peek_nth(n).is_some_and(|l| l.is_punct(punct))
    }

    pub fn at_name(&self) -> bool {
        self.peek().is_some_and(|l| l.is_name())
    }

    /// Whether the next lexeme is a word that can be an alias or label.
    pub fn at_alias_candidate(&self) -> bool {
        match self.peek() {
            Some(l) if l.kind == LexemeKind::QuotedIdent => true,
            Some(l) if l.kind == LexemeKind::Word => {
                !is_reserved(&l.text) && !self.is_statement_start(self.pos) && !l.text.starts_with('@')
            }
            _ => false,
        }
    }

    // ===== Consumption =====

    pub fn eat_word(&mut self, keyword: &str) -> bool {
        if self.at_word(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn eat_words(&mut self, keywords: &[&str]) -> bool {
        if self.at_words(keywords) {
            self.pos += keywords.len();
            true
        } else {
            false
        }
    }

    pub fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_word(&mut self, keyword: &str) -> Result<()> {
        if self.eat_word(keyword) {
            Ok(())
        } else {
            Err(self.expected(keyword))
        }
    }

    pub fn expect_words(&mut self, keywords: &[&str]) -> Result<()> {
        for k in keywords {
            self.expect_word(k)?;
        }
        Ok(())
    }

    pub fn expect_punct(&mut self, punct: &str) -> Result<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", punct)))
        }
    }

    pub fn skip_semicolons(&mut self) {
        while self.eat_punct(";") {}
    }

    /// Skip a parenthesized group, the cursor being on its `(`.
    pub fn skip_balanced(&mut self) -> Result<()> {
        self.expect_punct("(")?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(l) if l.is_punct("(") => depth += 1,
                Some(l) if l.is_punct(")") => depth -= 1,
                Some(_) => {}
                None => return Err(self.expected("')'")),
            }
        }
        Ok(())
    }

    // ===== Errors =====

    /// Syntax error at the current lexeme.
    pub fn error(&self, message: impl Into<String>) -> ConvertError {
        let (line, column) = match self.peek() {
            Some(l) => (l.line, l.column),
            None => self.index.position(self.source, self.source.len()),
        };
        ConvertError::syntax(line, column, message)
    }

    pub fn expected(&self, what: &str) -> ConvertError {
        match self.peek() {
            Some(l) => self.error(format!("expected {}, found '{}'", what, l.text)),
            None => self.error(format!("expected {}, found end of input", what)),
        }
    }

    pub fn unsupported(&self, construct: &str) -> ConvertError {
        ConvertError::unsupported(self.db, construct)
    }

    // ===== Nodes =====

    /// Node spanning lexemes `from..to` of this parser.
    pub fn node(&self, kind: SyntaxKind, from: usize, to: usize) -> SyntaxNode {
        match (self.lexemes.get(from), to.checked_sub(1).and_then(|i| self.lexemes.get(i))) {
            (Some(first), Some(last)) if to > from => SyntaxNode::new(
                kind,
                &self.source[first.start..last.end],
                first.start,
                first.line,
                first.column,
            ),
            _ => SyntaxNode::marker(kind),
        }
    }

    /// Node over `from..pos` with the given children.
    pub fn finish(&self, kind: SyntaxKind, from: usize, children: Vec<SyntaxNode>) -> SyntaxNode {
        self.node(kind, from, self.pos).with_children(children)
    }

    /// Leaf for the next lexeme.
    pub fn leaf(&mut self, kind: SyntaxKind) -> Result<SyntaxNode> {
        if self.at_end() {
            return Err(self.expected("token"));
        }
        let node = self.node(kind, self.pos, self.pos + 1);
        self.pos += 1;
        Ok(node)
    }

    /// Possibly qualified name: `a`, `s.a`, `[s].[a]`, `:NEW.col`.
    pub fn name(&mut self, kind: SyntaxKind) -> Result<SyntaxNode> {
        let start = self.pos;
        if !self.at_name() {
            return Err(self.expected("name"));
        }
        self.pos += 1;
        loop {
            if self.at_punct(".") && self.peek_nth(1).is_some_and(|l| l.is_name()) {
                self.pos += 2;
            } else if self.at_punct(".") && self.at_punct_nth(1, ".") {
                // `db..table`
                self.pos += 2;
                if !self.at_name() {
                    return Err(self.expected("name"));
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.node(kind, start, self.pos))
    }

    /// Comma separated names.
    pub fn name_list(&mut self, kind: SyntaxKind) -> Result<Vec<SyntaxNode>> {
        let mut out = vec![self.name(kind)?];
        while self.eat_punct(",") {
            out.push(self.name(kind)?);
        }
        Ok(out)
    }

    /// `( name, ... )` as a column list node.
    pub fn column_list(&mut self) -> Result<SyntaxNode> {
        let start = self.pos;
        self.expect_punct("(")?;
        let names = self.name_list(SyntaxKind::Name)?;
        self.expect_punct(")")?;
        Ok(self.finish(SyntaxKind::ColumnList, start, names))
    }

    /// Data type such as `NUMBER(10,2)`, `t.col%TYPE`, `DOUBLE PRECISION`,
    /// `TIMESTAMP WITH TIME ZONE`, `INT UNSIGNED` or `int[]`.
    pub fn data_type(&mut self) -> Result<SyntaxNode> {
        let start = self.pos;
        self.eat_word("SETOF");
        self.name(SyntaxKind::DataType)?;
        loop {
            if self.at_punct("(") {
                self.skip_balanced()?;
            } else if self.at_punct("%") && self.peek_nth(1).is_some_and(|l| l.kind == LexemeKind::Word) {
                self.pos += 2;
            } else if self.at_punct("[") && self.at_punct_nth(1, "]") {
                self.pos += 2;
            } else if self.at_words(&["WITH", "TIME", "ZONE"]) || self.at_words(&["WITHOUT", "TIME", "ZONE"]) {
                self.pos += 3;
            } else if self.at_words(&["WITH", "LOCAL", "TIME", "ZONE"]) {
                self.pos += 4;
            } else if self.at_any_word(TYPE_CONTINUATION) && !self.at_words(&["CHARACTER", "SET"]) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let node = self.node(SyntaxKind::DataType, start, self.pos);
        // Column attributes that are not part of the type.
        loop {
            if self.eat_words(&["CHARACTER", "SET"]) || self.eat_word("CHARSET") || self.eat_word("COLLATE") {
                self.bump();
            } else {
                break;
            }
        }
        Ok(node)
    }

    // ===== Statement boundaries =====

    /// Whether lexeme `idx` starts a new T-SQL statement.
    pub fn is_statement_start(&self, idx: usize) -> bool {
        if self.db != DatabaseType::SqlServer {
            return false;
        }
        let Some(lex) = self.lexemes.get(idx) else {
            return false;
        };
        if lex.kind != LexemeKind::Word || !TSQL_STATEMENT_START.iter().any(|k| lex.is_word(k)) {
            return false;
        }
        let next_is_paren = self.lexemes.get(idx + 1).is_some_and(|l| l.is_punct("("));
        let prev = idx.checked_sub(1).and_then(|i| self.lexemes.get(i));
        if lex.is_word("UPDATE") && next_is_paren {
            return false;
        }
        if lex.is_word("FETCH") && prev.is_some_and(|p| p.is_word("ROWS") || p.is_word("ROW")) {
            return false;
        }
        // `IF EXISTS` in `DROP TABLE IF EXISTS`.
        if lex.is_word("IF") && prev.is_some_and(|p| p.is_word("TABLE") || p.is_word("VIEW") || p.is_word("PROCEDURE")) {
            return false;
        }
        true
    }

    /// End of a statement: `;`, end of input or, for T-SQL, the next statement.
    pub fn at_statement_end(&self) -> bool {
        self.at_end() || self.at_punct(";") || self.is_statement_start(self.pos)
    }

    /// Consume the statement terminator.
    pub fn end_statement(&mut self) -> Result<()> {
        if self.eat_punct(";") || self.at_end() {
            return Ok(());
        }
        if self.db == DatabaseType::SqlServer && self.is_statement_start(self.pos) {
            return Ok(());
        }
        Err(self.expected("';'"))
    }

    /// Index of the first lexeme at or after `pos` that ends an expression.
    fn scan_to_stop(&self, stops: &[&str]) -> usize {
        let mut depth = 0usize;
        let mut case_depth = 0usize;
        let mut i = self.pos;
        while let Some(lex) = self.lexemes.get(i) {
            if depth == 0 && case_depth == 0 {
                if lex.is_punct(";") || lex.is_punct(")") {
                    break;
                }
                if stops.iter().any(|s| matches_stop(lex, s)) {
                    break;
                }
                if i > self.pos && self.is_statement_start(i) {
                    break;
                }
            }
            if lex.is_punct("(") {
                depth += 1;
            } else if lex.is_punct(")") {
                depth = depth.saturating_sub(1);
            } else if lex.is_word("CASE") {
                case_depth += 1;
            } else if lex.is_word("END") && case_depth > 0 {
                case_depth -= 1;
            }
            i += 1;
        }
        i
    }

    /// Expression up to a stop word or punctuation at nesting depth zero.
    pub fn expression(&mut self, kind: SyntaxKind, stops: &[&str]) -> Result<SyntaxNode> {
        let start = self.pos;
        let end = self.scan_to_stop(stops);
        if end == start {
            return Err(self.expected("expression"));
        }
        self.pos = end;
        Ok(self.expression_node(kind, start, end))
    }

    /// Expression, or `None` when a stop follows immediately.
    pub fn optional_expression(&mut self, kind: SyntaxKind, stops: &[&str]) -> Option<SyntaxNode> {
        let start = self.pos;
        let end = self.scan_to_stop(stops);
        if end == start {
            return None;
        }
        self.pos = end;
        Some(self.expression_node(kind, start, end))
    }

    /// Comma separated expressions.
    pub fn expression_list(&mut self, kind: SyntaxKind, stops: &[&str]) -> Result<Vec<SyntaxNode>> {
        let mut stops_with_comma: Vec<&str> = stops.to_vec();
        stops_with_comma.push(",");
        let mut out = vec![self.expression(kind, &stops_with_comma)?];
        while self.eat_punct(",") {
            out.push(self.expression(kind, &stops_with_comma)?);
        }
        Ok(out)
    }

    /// `( expr, ... )`, possibly empty.
    pub fn paren_expression_list(&mut self, kind: SyntaxKind) -> Result<Vec<SyntaxNode>> {
        self.expect_punct("(")?;
        if self.eat_punct(")") {
            return Ok(Vec::new());
        }
        let items = self.expression_list(kind, &[])?;
        self.expect_punct(")")?;
        Ok(items)
    }

    /// Expression that may end in an alias (`expr [AS] alias`).
    pub fn expression_with_alias(
        &mut self,
        kind: SyntaxKind,
        stops: &[&str],
    ) -> Result<(SyntaxNode, Option<SyntaxNode>)> {
        let mut stops_with_as: Vec<&str> = stops.to_vec();
        stops_with_as.push("AS");
        let start = self.pos;
        let end = self.scan_to_stop(&stops_with_as);
        if end == start {
            return Err(self.expected("expression"));
        }
        self.pos = end;
        if self.eat_word("AS") {
            let alias = if self.peek().is_some_and(|l| l.kind == LexemeKind::String) {
                self.leaf(SyntaxKind::Alias)?
            } else {
                self.name(SyntaxKind::Alias)?
            };
            return Ok((self.expression_node(kind, start, end), Some(alias)));
        }
        if end - start >= 2 && self.is_implicit_alias(end - 1) {
            let alias = self.node(SyntaxKind::Alias, end - 1, end);
            return Ok((self.expression_node(kind, start, end - 1), Some(alias)));
        }
        Ok((self.expression_node(kind, start, end), None))
    }

    fn is_implicit_alias(&self, idx: usize) -> bool {
        let (Some(last), Some(prev)) = (self.lexemes.get(idx), self.lexemes.get(idx - 1)) else {
            return false;
        };
        let last_ok = match last.kind {
            LexemeKind::QuotedIdent => true,
            LexemeKind::Word => {
                !is_reserved(&last.text)
                    && !last.text.starts_with('@')
                    && !last.text.starts_with(':')
                    && !NOT_ALIAS.iter().any(|w| last.is_word(w))
            }
            _ => false,
        };
        let prev_ok = match prev.kind {
            LexemeKind::QuotedIdent | LexemeKind::Number | LexemeKind::String => true,
            LexemeKind::Word => {
                !is_reserved(&prev.text) || ["END", "NULL", "TRUE", "FALSE"].iter().any(|w| prev.is_word(w))
            }
            LexemeKind::Punct => prev.is_punct(")") || prev.is_punct("*"),
            LexemeKind::DollarString => false,
        };
        last_ok && prev_ok
    }

    /// Expression node over lexemes `from..to` with its references.
    pub fn expression_node(&self, kind: SyntaxKind, from: usize, to: usize) -> SyntaxNode {
        self.node(kind, from, to).with_children(self.scan_refs(from, to))
    }

    /// Expression node over a byte range of the source, tokenized on its own.
    pub fn range_expression(&self, kind: SyntaxKind, range: Range<usize>) -> Result<SyntaxNode> {
        let sub = self.sub_parser(range.clone())?;
        if sub.lexemes.is_empty() {
            return Err(self.expected("expression"));
        }
        Ok(sub.expression_node(kind, 0, sub.lexemes.len()))
    }

    /// Expression node for text that does not occur in the source.
    pub fn synthetic_expression(&self, kind: SyntaxKind, text: &str) -> Result<SyntaxNode> {
        let sub = Parser::new(self.db, text)?;
        let children = sub.scan_refs(0, sub.lexemes.len());
        let (line, column) = self.peek().map(|l| (l.line, l.column)).unwrap_or((0, 0));
        let mut node = SyntaxNode::new(kind, text, 0, line, column);
        node.children = children;
        Ok(node)
    }

    /// Identifier and function-call references in lexemes `from..to`.
    ///
    /// A chain of names joined by `.` is one identifier; a chain followed by
    /// `(` is a function call whose arguments are scanned too. Attribute
    /// suffixes such as `%NOTFOUND` and PostgreSQL `::type` casts are skipped.
    pub fn scan_refs(&self, from: usize, to: usize) -> Vec<SyntaxNode> {
        let mut out = Vec::new();
        let mut i = from;
        while i < to {
            let lex = &self.lexemes[i];
            let is_ref_start = match lex.kind {
                LexemeKind::QuotedIdent => true,
                LexemeKind::Word => {
                    !is_reserved(&lex.text)
                        || (CALLABLE_KEYWORDS.iter().any(|k| lex.is_word(k))
                            && i + 1 < to
                            && self.lexemes[i + 1].is_punct("("))
                }
                _ => false,
            };
            if lex.is_punct("::") && i + 1 < to && self.lexemes[i + 1].is_name() {
                i += 2;
                continue;
            }
            if !is_ref_start {
                i += 1;
                continue;
            }

            let mut j = i + 1;
            while j + 1 < to && self.lexemes[j].is_punct(".") {
                let next = &self.lexemes[j + 1];
                if next.is_name() {
                    j += 2;
                } else if next.is_punct("*") {
                    j += 2;
                    break;
                } else {
                    break;
                }
            }

            if j < to && self.lexemes[j].is_punct("(") {
                if let Some(close) = self.matching_paren(j, to) {
                    out.push(self.node(SyntaxKind::FunctionCall, i, close + 1));
                    i = j + 1;
                    continue;
                }
            }
            out.push(self.node(SyntaxKind::Identifier, i, j));
            // `c%NOTFOUND`, `v%TYPE`
            if j + 1 < to
                && self.lexemes[j].is_punct("%")
                && self.lexemes[j].start == self.lexemes[j - 1].end
                && self.lexemes[j + 1].start == self.lexemes[j].end
            {
                j += 2;
            }
            i = j;
        }
        out
    }

    fn matching_paren(&self, open: usize, to: usize) -> Option<usize> {
        let mut depth = 0usize;
        for idx in open..to {
            let lex = &self.lexemes[idx];
            if lex.is_punct("(") {
                depth += 1;
            } else if lex.is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
        }
        None
    }

    /// Skip to the end of the current statement, returning it as `Unknown`.
    pub fn skip_statement(&mut self) -> SyntaxNode {
        let start = self.pos;
        self.pos += 1;
        let end = self.scan_to_stop(&[]);
        self.pos = end;
        // A stray `)` would stop the scan forever.
        while self.at_punct(")") {
            self.pos += 1;
            self.pos = self.scan_to_stop(&[]);
        }
        let node = self.node(SyntaxKind::Unknown, start, self.pos);
        self.eat_punct(";");
        node
    }

    /// Statements up to one of the terminator words.
    pub fn statements_until<F>(&mut self, terminators: &[&str], mut statement: F) -> Result<Vec<SyntaxNode>>
    where
        F: FnMut(&mut Self) -> Result<SyntaxNode>,
    {
        let mut out = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at_end() || self.at_any_word(terminators) {
                break;
            }
            let before = self.pos;
            let node = statement(self)?;
            if self.pos == before {
                return Err(self.expected("statement"));
            }
            out.push(node);
        }
        Ok(out)
    }

    /// Skip a `CREATE ... <KIND>` header prefix, returning the object kind word.
    ///
    /// Anything between `CREATE`/`ALTER` and the kind (`OR REPLACE`,
    /// `DEFINER = ...`, `EDITIONABLE`, `ALGORITHM = ...`) is ignored.
    pub fn create_header(&mut self) -> Option<String> {
        if !self.at_word("CREATE") && !self.at_word("ALTER") {
            return None;
        }
        let start = self.pos;
        let mut i = self.pos + 1;
        while let Some(lex) = self.lexemes.get(i) {
            if lex.kind == LexemeKind::Word {
                let upper = lex.upper();
                let kind = match upper.as_str() {
                    "PROCEDURE" | "PROC" => Some("PROCEDURE"),
                    "FUNCTION" => Some("FUNCTION"),
                    "TRIGGER" => Some("TRIGGER"),
                    "VIEW" => Some("VIEW"),
                    "TABLE" | "INDEX" | "SEQUENCE" | "TYPE" | "PACKAGE" => None,
                    _ => {
                        i += 1;
                        continue;
                    }
                };
                return match kind {
                    Some(k) => {
                        self.pos = i + 1;
                        Some(k.to_string())
                    }
                    None => {
                        self.pos = start;
                        None
                    }
                };
            }
            i += 1;
        }
        self.pos = start;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(db: DatabaseType, sql: &str) -> Parser<'_> {
        Parser::new(db, sql).unwrap()
    }

    #[test]
    fn test_expression_stops_at_depth_zero() {
        let mut p = parser(DatabaseType::Oracle, "NVL(a, b) + f(x, y) THEN z");
        let node = p.expression(SyntaxKind::Condition, &["THEN"]).unwrap();
        assert_eq!(node.text, "NVL(a, b) + f(x, y)");
        assert!(p.at_word("THEN"));
    }

    #[test]
    fn test_case_expression_is_not_a_boundary() {
        let mut p = parser(DatabaseType::SqlServer, "CASE WHEN @a = 1 THEN 'x' ELSE 'y' END SELECT 1");
        let node = p.expression(SyntaxKind::Expression, &[]).unwrap();
        assert_eq!(node.text, "CASE WHEN @a = 1 THEN 'x' ELSE 'y' END");
        assert!(p.at_word("SELECT"));
    }

    #[test]
    fn test_scan_refs_finds_calls_and_identifiers() {
        let mut p = parser(DatabaseType::Oracle, "NVL(t.a, 0) + b");
        let node = p.expression(SyntaxKind::Expression, &[]).unwrap();
        let kinds: Vec<_> = node.children.iter().map(|c| (c.kind, c.text.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (SyntaxKind::FunctionCall, "NVL(t.a, 0)"),
                (SyntaxKind::Identifier, "t.a"),
                (SyntaxKind::Identifier, "b"),
            ]
        );
    }

    #[test]
    fn test_scan_refs_skips_attributes_and_keywords() {
        let mut p = parser(DatabaseType::Oracle, "c%NOTFOUND OR x IS NULL");
        let node = p.expression(SyntaxKind::Condition, &[]).unwrap();
        let texts: Vec<_> = node.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "x"]);
    }

    #[test]
    fn test_alias_detection() {
        let mut p = parser(DatabaseType::MySql, "COUNT(*) total FROM t");
        let (expr, alias) = p.expression_with_alias(SyntaxKind::Expression, &["FROM"]).unwrap();
        assert_eq!(expr.text, "COUNT(*)");
        assert_eq!(alias.unwrap().text, "total");

        let mut p = parser(DatabaseType::MySql, "a + b FROM t");
        let (expr, alias) = p.expression_with_alias(SyntaxKind::Expression, &["FROM"]).unwrap();
        assert_eq!(expr.text, "a + b");
        assert!(alias.is_none());
    }

    #[test]
    fn test_data_type_forms() {
        for (sql, expected) in [
            ("NUMBER(10, 2) :=", "NUMBER(10, 2)"),
            ("emp.sal%TYPE;", "emp.sal%TYPE"),
            ("DOUBLE PRECISION DEFAULT", "DOUBLE PRECISION"),
            ("TIMESTAMP WITH TIME ZONE,", "TIMESTAMP WITH TIME ZONE"),
        ] {
            let mut p = parser(DatabaseType::Oracle, sql);
            assert_eq!(p.data_type().unwrap().text, expected);
        }
    }

    #[test]
    fn test_tsql_statement_start_rules() {
        let p = parser(DatabaseType::SqlServer, "IF UPDATE(a) OFFSET 1 ROWS FETCH NEXT 2 ROWS ONLY");
        assert!(p.is_statement_start(0));
        assert!(!p.is_statement_start(1));
        let fetch = p.lexemes.iter().position(|l| l.is_word("FETCH")).unwrap();
        assert!(!p.is_statement_start(fetch));
    }

    #[test]
    fn test_create_header_skips_modifiers() {
        let mut p = parser(DatabaseType::Oracle, "CREATE OR REPLACE EDITIONABLE PROCEDURE p IS");
        assert_eq!(p.create_header().as_deref(), Some("PROCEDURE"));
        assert!(p.at_word("p"));

        let mut p = parser(DatabaseType::Oracle, "CREATE TABLE t (a INT)");
        assert_eq!(p.create_header(), None);
        assert!(p.at_word("CREATE"));
    }

    #[test]
    fn test_error_position() {
        let mut p = parser(DatabaseType::Oracle, "BEGIN\n  x");
        p.bump();
        match p.expect_punct(";").unwrap_err() {
            ConvertError::Syntax { line, column, .. } => assert_eq!((line, column), (2, 3)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
