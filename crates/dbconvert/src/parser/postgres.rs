//! PL/pgSQL grammar.
//!
//! Routine bodies live in dollar-quoted strings; they are parsed by a
//! sub-parser over the inner byte range so positions stay relative to the
//! whole source. Block structure and most statements come from the PL/SQL
//! grammar.

use super::cursor::Parser;
use super::lexer::LexemeKind;
use super::tree::{SyntaxKind, SyntaxNode};
use super::{ParseMode, UnitKind};
use crate::error::Result;

const RAISE_LEVELS: &[&str] = &["DEBUG", "LOG", "INFO", "NOTICE", "WARNING", "EXCEPTION"];

impl<'s> Parser<'s> {
    pub(super) fn pg_unit(&mut self, mode: ParseMode) -> Result<SyntaxNode> {
        let start = self.mark();
        // A trigger definition usually arrives together with its function.
        let header_mode = if mode == ParseMode::Trigger {
            ParseMode::Detect
        } else {
            mode
        };
        let kind = self.unit_header(header_mode)?;
        match kind {
            UnitKind::Procedure => self.pg_routine(start, false),
            UnitKind::Function => {
                let function = self.pg_routine(start, true)?;
                self.skip_semicolons();
                let trigger_start = self.mark();
                if self.create_header().as_deref() == Some("TRIGGER") {
                    return self.pg_trigger(trigger_start, Some(function));
                }
                self.reset(trigger_start);
                if mode == ParseMode::Trigger {
                    return Err(self.expected("CREATE TRIGGER"));
                }
                Ok(function)
            }
            UnitKind::Trigger => self.pg_trigger(start, None),
            UnitKind::View if mode == ParseMode::Trigger => Err(self.expected("CREATE TRIGGER")),
            UnitKind::View => self.view_unit(start),
            UnitKind::Block if mode == ParseMode::Trigger => Err(self.expected("CREATE TRIGGER")),
            UnitKind::Block => self.pg_block(start),
        }
    }

    fn pg_routine(&mut self, start: usize, function: bool) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        if let Some(params) = self.pg_parameters()? {
            children.push(params);
        }
        if function {
            self.expect_word("RETURNS")?;
            if self.at_word("TABLE") {
                return Err(self.unsupported("RETURNS TABLE"));
            }
            let mut return_type = self.data_type()?;
            return_type.kind = SyntaxKind::ReturnType;
            children.push(return_type);
        }

        let mut body = None;
        let mut language = None;
        while !self.at_end() && !self.at_punct(";") {
            let kind = self.peek().map(|l| l.kind);
            if kind == Some(LexemeKind::DollarString) {
                body = self.bump();
            } else if kind == Some(LexemeKind::String) {
                return Err(self.unsupported("quoted routine body"));
            } else if self.eat_word("LANGUAGE") {
                language = self.bump().map(|l| l.text.to_lowercase());
            } else {
                self.bump();
            }
        }
        if let Some(language) = language {
            if language.trim_matches('\'') != "plpgsql" {
                return Err(self.unsupported(&format!("LANGUAGE {}", language)));
            }
        }
        let Some(body) = body else {
            return Err(self.expected("routine body"));
        };
        let mut sub = self.sub_parser(dollar_inner(&body.text, body.start))?;
        sub.pg_body(&mut children)?;

        let kind = if function {
            SyntaxKind::Function
        } else {
            SyntaxKind::Procedure
        };
        Ok(self.finish(kind, start, children))
    }

    /// `( [mode] [name] type [DEFAULT | = expr], ... )`; `None` when empty.
    fn pg_parameters(&mut self) -> Result<Option<SyntaxNode>> {
        let start = self.mark();
        self.expect_punct("(")?;
        if self.eat_punct(")") {
            return Ok(None);
        }
        let mut params = Vec::new();
        loop {
            let p_start = self.mark();
            let mut children = Vec::new();
            let mode_start = self.mark();
            if self.eat_word("INOUT") || self.eat_word("IN") || self.eat_word("OUT") || self.eat_word("VARIADIC") {
                children.push(self.node(SyntaxKind::Mode, mode_start, self.mark()));
            }
            // Unnamed parameters are referred to as `$n`.
            let named = self.peek_nth(1).is_some_and(|l| l.is_name() && !l.is_word("DEFAULT"));
            if named {
                children.insert(0, self.name(SyntaxKind::Name)?);
            } else {
                let name = format!("${}", params.len() + 1);
                children.insert(0, SyntaxNode::new(SyntaxKind::Name, name, 0, 0, 0));
            }
            children.push(self.data_type()?);
            if self.eat_word("DEFAULT") || self.eat_punct("=") {
                children.push(self.expression(SyntaxKind::Default, &[","])?);
            }
            params.push(self.finish(SyntaxKind::Parameter, p_start, children));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(Some(self.finish(SyntaxKind::ParameterList, start, params)))
    }

    /// `[<<label>>] [DECLARE ...] BEGIN ... END` filling the whole parser.
    fn pg_body(&mut self, children: &mut Vec<SyntaxNode>) -> Result<()> {
        if self.eat_punct("<<") {
            self.name(SyntaxKind::Label)?;
            self.expect_punct(">>")?;
        }
        if self.eat_word("DECLARE") {
            if let Some(declarations) = self.plsql_declarations(&["BEGIN"])? {
                children.push(declarations);
            }
        }
        self.plsql_block(children)?;
        self.skip_semicolons();
        if !self.at_end() {
            return Err(self.expected("end of routine body"));
        }
        Ok(())
    }

    fn pg_trigger(&mut self, start: usize, function: Option<SyntaxNode>) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        self.trigger_clauses(&mut children)?;
        let call_start = self.mark();
        self.expect_word("EXECUTE")?;
        if !self.eat_word("FUNCTION") {
            self.expect_word("PROCEDURE")?;
        }
        let function_name = self.name(SyntaxKind::Name)?;
        self.skip_balanced()?;
        match function {
            Some(function) => children.extend(function.children.into_iter().filter(|c| {
                matches!(
                    c.kind,
                    SyntaxKind::DeclareSection | SyntaxKind::Body | SyntaxKind::ExceptionSection
                )
            })),
            None => {
                let call = self.finish(SyntaxKind::Call, call_start, vec![function_name]);
                children.push(self.finish(SyntaxKind::Body, call_start, vec![call]));
            }
        }
        Ok(self.finish(SyntaxKind::Trigger, start, children))
    }

    /// `DO $$ ... $$` or a bare block.
    fn pg_block(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = Vec::new();
        if self.eat_word("DO") {
            let mut body = None;
            while !self.at_end() && !self.at_punct(";") {
                if self.peek().is_some_and(|l| l.kind == LexemeKind::DollarString) {
                    body = self.bump();
                } else {
                    self.bump();
                }
            }
            let Some(body) = body else {
                return Err(self.expected("dollar-quoted block"));
            };
            let mut sub = self.sub_parser(dollar_inner(&body.text, body.start))?;
            sub.pg_body(&mut children)?;
        } else if self.at_any_word(&["DECLARE", "BEGIN"]) || self.at_punct("<<") {
            if self.eat_punct("<<") {
                self.name(SyntaxKind::Label)?;
                self.expect_punct(">>")?;
            }
            if self.eat_word("DECLARE") {
                if let Some(declarations) = self.plsql_declarations(&["BEGIN"])? {
                    children.push(declarations);
                }
            }
            self.plsql_block(&mut children)?;
        } else {
            let body_start = self.mark();
            let statements = self.statements_until(&[], Self::plsql_statement)?;
            children.push(self.finish(SyntaxKind::Body, body_start, statements));
        }
        Ok(self.finish(SyntaxKind::Block, start, children))
    }

    // ===== Statements =====

    /// PostgreSQL-only statements; `None` leaves the cursor untouched.
    pub(super) fn pg_statement(&mut self) -> Result<Option<SyntaxNode>> {
        let start = self.mark();
        let Some(word) = self.peek().filter(|l| l.kind == LexemeKind::Word).map(|l| l.upper()) else {
            return Ok(None);
        };
        let node = match word.as_str() {
            "PERFORM" => {
                self.bump();
                let call_start = self.mark();
                if self.at_name() && (self.at_punct_nth(1, "(") || self.at_punct_nth(1, ".")) {
                    let name = self.name(SyntaxKind::Name)?;
                    if self.at_punct("(") {
                        let mut children = vec![name];
                        children.extend(self.paren_expression_list(SyntaxKind::Argument)?);
                        if self.at_statement_end() {
                            self.end_statement()?;
                            return Ok(Some(self.finish(SyntaxKind::Perform, start, children)));
                        }
                    }
                    self.reset(call_start);
                }
                let value = self.expression(SyntaxKind::Value, &[])?;
                self.finish(SyntaxKind::Perform, start, vec![value])
            }
            "RAISE" => self.pg_raise()?,
            "EXECUTE" => {
                self.bump();
                self.execute_dynamic_rest(start)?
            }
            "CALL" => {
                self.bump();
                let mut children = vec![self.name(SyntaxKind::Name)?];
                if self.at_punct("(") {
                    children.extend(self.paren_expression_list(SyntaxKind::Argument)?);
                }
                self.finish(SyntaxKind::Call, start, children)
            }
            "RETURN" if self.at_word_nth(1, "NEXT") || self.at_word_nth(1, "QUERY") => {
                return Err(self.unsupported("RETURN NEXT/QUERY"));
            }
            "GET" | "ASSERT" | "MOVE" | "LOCK" | "ANALYZE" => return Ok(Some(self.skip_statement())),
            "CREATE" => {
                if self.create_header().is_some() {
                    return Err(self.unsupported("object definition inside a routine"));
                }
                self.create_table()?
            }
            "DROP" => self.drop()?,
            "TRUNCATE" => self.truncate()?,
            _ => return Ok(None),
        };
        self.end_statement()?;
        Ok(Some(node))
    }

    /// `RAISE [level] ['format', args] [USING option = expr, ...]`
    ///
    /// Levels below `EXCEPTION` become `Print`; `%` placeholders stay in the
    /// format string for the adapter to substitute.
    fn pg_raise(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("RAISE")?;
        let mut level = "EXCEPTION".to_string();
        if self.at_any_word(RAISE_LEVELS) {
            level = self.bump().map(|l| l.upper()).unwrap_or(level);
        }
        let mut children = Vec::new();
        if self.peek().is_some_and(|l| l.kind == LexemeKind::String) {
            let format_start = self.mark();
            self.bump();
            children.push(self.expression_node(SyntaxKind::Value, format_start, self.mark()));
            while self.eat_punct(",") {
                children.push(self.expression(SyntaxKind::Argument, &[",", "USING"])?);
            }
        } else if self.at_word("SQLSTATE") {
            self.bump();
            children.push(self.leaf(SyntaxKind::Code)?);
        } else if self.at_name() && !self.at_word("USING") {
            children.push(self.name(SyntaxKind::Code)?);
        }
        if self.eat_word("USING") {
            loop {
                let option = self.bump().map(|l| l.upper()).unwrap_or_default();
                self.expect_punct("=")?;
                let value = self.expression(SyntaxKind::Value, &[","])?;
                match option.as_str() {
                    "ERRCODE" => children.push(SyntaxNode { kind: SyntaxKind::Code, ..value }),
                    "MESSAGE" if !children.iter().any(|c| c.kind == SyntaxKind::Value) => children.push(value),
                    _ => {}
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        let kind = if level == "EXCEPTION" {
            SyntaxKind::Raise
        } else {
            SyntaxKind::Print
        };
        if kind == SyntaxKind::Print && !children.iter().any(|c| c.kind == SyntaxKind::Value) {
            return Err(self.expected("message"));
        }
        Ok(self.finish(kind, start, children))
    }
}

/// Inner byte range of a `$tag$ ... $tag$` string starting at `offset`.
fn dollar_inner(text: &str, offset: usize) -> std::ops::Range<usize> {
    let tag_len = text[1..].find('$').map(|i| i + 2).unwrap_or(1);
    let inner_end = text.len().saturating_sub(tag_len).max(tag_len);
    offset + tag_len..offset + inner_end
}

#[cfg(test)]
mod tests {
    use crate::dialect::DatabaseType;
    use crate::parser::{parse, ParseMode, SyntaxKind};

    #[test]
    fn test_dollar_body_positions() {
        let sql = "CREATE OR REPLACE FUNCTION add_one(x integer) RETURNS integer AS $fn$\nBEGIN\n  RETURN x + 1;\nEND;\n$fn$ LANGUAGE plpgsql;";
        let root = parse(DatabaseType::Postgres, sql, ParseMode::Function).unwrap();
        let unit = &root.children[0];
        assert_eq!(unit.child_text(SyntaxKind::ReturnType), Some("integer"));
        let ret = &unit.child(SyntaxKind::Body).unwrap().children[0];
        assert_eq!(ret.kind, SyntaxKind::Return);
        assert_eq!(ret.line, 3);
        assert_eq!(&sql[ret.offset..ret.offset + ret.text.len()], "RETURN x + 1");
    }

    #[test]
    fn test_non_plpgsql_language_is_unsupported() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $$ SELECT 1 $$ LANGUAGE sql;";
        let err = parse(DatabaseType::Postgres, sql, ParseMode::Function).unwrap_err();
        assert!(matches!(err, crate::error::ConvertError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_trigger_merges_function_body() {
        let sql = "CREATE FUNCTION trg_fn() RETURNS trigger AS $$
DECLARE n int;
BEGIN
  NEW.updated_at := now();
  RAISE NOTICE 'row % touched', NEW.id;
  RETURN NEW;
END;
$$ LANGUAGE plpgsql;
CREATE TRIGGER trg BEFORE UPDATE ON orders FOR EACH ROW EXECUTE FUNCTION trg_fn();";
        let root = parse(DatabaseType::Postgres, sql, ParseMode::Trigger).unwrap();
        let unit = &root.children[0];
        assert_eq!(unit.kind, SyntaxKind::Trigger);
        assert_eq!(unit.child_text(SyntaxKind::Name), Some("trg"));
        assert_eq!(unit.child_text(SyntaxKind::TableName), Some("orders"));
        assert!(unit.has(SyntaxKind::DeclareSection));
        let body = unit.child(SyntaxKind::Body).unwrap();
        let kinds: Vec<_> = body.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![SyntaxKind::Assignment, SyntaxKind::Print, SyntaxKind::Return]);
        assert_eq!(body.children[1].children_of(SyntaxKind::Argument).count(), 1);
    }

    #[test]
    fn test_do_block_with_perform_and_for_query() {
        let sql = "DO $$
DECLARE r record;
BEGIN
  FOR r IN SELECT id FROM t LOOP
    PERFORM audit(r.id);
  END LOOP;
  RAISE EXCEPTION 'failed: %', 1 USING ERRCODE = 'P0001';
END $$;";
        let root = parse(DatabaseType::Postgres, sql, ParseMode::CommonBlock).unwrap();
        let body = root.children[0].child(SyntaxKind::Body).unwrap();
        let for_loop = &body.children[0];
        assert_eq!(for_loop.kind, SyntaxKind::ForLoop);
        assert!(for_loop.has(SyntaxKind::Select));
        let perform = &for_loop.child(SyntaxKind::Body).unwrap().children[0];
        assert_eq!(perform.child_text(SyntaxKind::Name), Some("audit"));
        let raise = &body.children[1];
        assert_eq!(raise.kind, SyntaxKind::Raise);
        assert_eq!(raise.child_text(SyntaxKind::Code), Some("'P0001'"));
    }
}
