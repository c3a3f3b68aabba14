//! PL/SQL grammar.
//!
//! PL/pgSQL is close enough to share the block structure and most procedural
//! statements; PostgreSQL-only statements are tried first through
//! [`Parser::pg_statement`].

use super::cursor::Parser;
use super::tree::{SyntaxKind, SyntaxNode};
use super::UnitKind;
use crate::dialect::DatabaseType;
use crate::error::Result;

/// Grammar function for one statement of a dialect.
pub(super) type StatementFn<'s> = fn(&mut Parser<'s>) -> Result<SyntaxNode>;

impl<'s> Parser<'s> {
    pub(super) fn oracle_unit(&mut self, kind: UnitKind, start: usize) -> Result<SyntaxNode> {
        let node = match kind {
            UnitKind::Procedure => self.plsql_routine(start, false)?,
            UnitKind::Function => self.plsql_routine(start, true)?,
            UnitKind::Trigger => self.plsql_trigger(start)?,
            UnitKind::View => self.view_unit(start)?,
            UnitKind::Block => self.plsql_anonymous_block(start)?,
        };
        self.skip_semicolons();
        self.eat_punct("/");
        Ok(node)
    }

    fn plsql_routine(&mut self, start: usize, function: bool) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        if self.at_punct("(") {
            children.push(self.plsql_parameters()?);
        }
        if function {
            self.expect_word("RETURN")?;
            let mut return_type = self.data_type()?;
            return_type.kind = SyntaxKind::ReturnType;
            children.push(return_type);
        }
        // AUTHID, DETERMINISTIC, PIPELINED, RESULT_CACHE, PARALLEL_ENABLE ...
        while !self.at_word("IS") && !self.at_word("AS") {
            if self.at_end() {
                return Err(self.expected("IS or AS"));
            }
            if self.at_punct("(") {
                self.skip_balanced()?;
            } else {
                self.bump();
            }
        }
        self.bump();
        if self.at_word("LANGUAGE") || self.at_word("EXTERNAL") {
            return Err(self.unsupported("call specification"));
        }
        if let Some(declarations) = self.plsql_declarations(&["BEGIN"])? {
            children.push(declarations);
        }
        self.plsql_block(&mut children)?;
        let kind = if function {
            SyntaxKind::Function
        } else {
            SyntaxKind::Procedure
        };
        Ok(self.finish(kind, start, children))
    }

    /// `( name [IN | OUT | IN OUT] [NOCOPY] type [:= | DEFAULT expr], ... )`
    fn plsql_parameters(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_punct("(")?;
        let mut params = Vec::new();
        loop {
            let p_start = self.mark();
            let mut children = vec![self.name(SyntaxKind::Name)?];
            let mode_start = self.mark();
            if self.eat_words(&["IN", "OUT"]) || self.eat_word("IN") || self.eat_word("OUT") {
                children.push(self.node(SyntaxKind::Mode, mode_start, self.mark()));
            }
            self.eat_word("NOCOPY");
            children.push(self.data_type()?);
            if self.eat_punct(":=") || self.eat_word("DEFAULT") {
                children.push(self.expression(SyntaxKind::Default, &[","])?);
            }
            params.push(self.finish(SyntaxKind::Parameter, p_start, children));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(self.finish(SyntaxKind::ParameterList, start, params))
    }

    fn plsql_trigger(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        self.trigger_clauses(&mut children)?;
        if self.at_words(&["COMPOUND", "TRIGGER"]) {
            return Err(self.unsupported("compound trigger"));
        }
        if self.eat_word("DECLARE") {
            if let Some(declarations) = self.plsql_declarations(&["BEGIN"])? {
                children.push(declarations);
            }
        }
        self.plsql_block(&mut children)?;
        Ok(self.finish(SyntaxKind::Trigger, start, children))
    }

    fn plsql_anonymous_block(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = Vec::new();
        if !self.at_word("DECLARE") && !self.at_word("BEGIN") {
            let body_start = self.mark();
            let statements = self.statements_until(&[], Self::plsql_statement)?;
            children.push(self.finish(SyntaxKind::Body, body_start, statements));
            return Ok(self.finish(SyntaxKind::Block, start, children));
        }
        if self.eat_word("DECLARE") {
            if let Some(declarations) = self.plsql_declarations(&["BEGIN"])? {
                children.push(declarations);
            }
        }
        self.plsql_block(&mut children)?;
        Ok(self.finish(SyntaxKind::Block, start, children))
    }

    /// Timing, events, table, `FOR EACH ROW` and `WHEN (...)` of a trigger header.
    pub(super) fn trigger_clauses(&mut self, children: &mut Vec<SyntaxNode>) -> Result<()> {
        let timing_start = self.mark();
        if !(self.eat_word("BEFORE") || self.eat_word("AFTER") || self.eat_words(&["INSTEAD", "OF"])) {
            return Err(self.expected("BEFORE, AFTER or INSTEAD OF"));
        }
        children.push(self.node(SyntaxKind::Timing, timing_start, self.mark()));
        loop {
            if !self.at_any_word(&["INSERT", "UPDATE", "DELETE"]) {
                return Err(self.expected("INSERT, UPDATE or DELETE"));
            }
            children.push(self.leaf(SyntaxKind::Event)?);
            if self.eat_word("OF") {
                self.name_list(SyntaxKind::Name)?;
            }
            if !self.eat_word("OR") && !self.eat_punct(",") {
                break;
            }
        }
        self.expect_word("ON")?;
        children.push(self.name(SyntaxKind::TableName)?);
        if self.eat_word("REFERENCING") {
            while self.at_any_word(&["OLD", "NEW", "PARENT"]) {
                self.bump();
                let _ = self.eat_word("ROW") || self.eat_word("TABLE");
                self.eat_word("AS");
                self.bump();
            }
        }
        if self.at_word("FOR") {
            let for_start = self.mark();
            self.bump();
            self.eat_word("EACH");
            if self.eat_word("ROW") {
                children.push(self.node(SyntaxKind::ForEachRow, for_start, self.mark()));
            } else {
                self.expect_word("STATEMENT")?;
            }
        }
        if self.eat_word("FOLLOWS") || self.eat_word("PRECEDES") {
            self.name(SyntaxKind::Name)?;
        }
        let _ = self.eat_word("ENABLE") || self.eat_word("DISABLE");
        if self.eat_word("WHEN") {
            self.expect_punct("(")?;
            children.push(self.expression(SyntaxKind::Condition, &[])?);
            self.expect_punct(")")?;
        }
        Ok(())
    }

    // ===== Declarations =====

    /// Declarations up to one of the terminators; `None` when there are none.
    pub(super) fn plsql_declarations(&mut self, terminators: &[&str]) -> Result<Option<SyntaxNode>> {
        let start = self.mark();
        let mut items = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at_end() || self.at_any_word(terminators) {
                break;
            }
            items.push(self.plsql_declaration()?);
        }
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.finish(SyntaxKind::DeclareSection, start, items)))
    }

    fn plsql_declaration(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        if self.eat_word("CURSOR") {
            let name = self.name(SyntaxKind::Name)?;
            if self.at_punct("(") {
                self.skip_balanced()?;
            }
            if self.eat_word("RETURN") {
                self.data_type()?;
            }
            if !self.eat_word("IS") {
                self.expect_word("FOR")?;
            }
            let select = self.select()?;
            self.end_statement()?;
            return Ok(self.finish(SyntaxKind::CursorDecl, start, vec![name, select]));
        }
        if self.at_any_word(&["PRAGMA", "TYPE", "SUBTYPE"]) {
            return Ok(self.skip_statement());
        }
        if self.at_any_word(&["PROCEDURE", "FUNCTION"]) {
            return Err(self.unsupported("nested subprogram"));
        }

        let name = self.name(SyntaxKind::Name)?;
        if self.at_word("EXCEPTION") || self.at_word("ALIAS") {
            self.reset(start);
            return Ok(self.skip_statement());
        }
        if self.at_any_word(&["CURSOR", "NO", "SCROLL"]) {
            self.eat_word("NO");
            self.eat_word("SCROLL");
            self.expect_word("CURSOR")?;
            if self.at_punct("(") {
                self.skip_balanced()?;
            }
            if !self.eat_word("FOR") {
                self.expect_word("IS")?;
            }
            let select = self.select()?;
            self.end_statement()?;
            return Ok(self.finish(SyntaxKind::CursorDecl, start, vec![name, select]));
        }

        let mut children = vec![name];
        if self.at_word("CONSTANT") {
            children.push(self.leaf(SyntaxKind::Constant)?);
        }
        children.push(self.data_type()?);
        self.eat_words(&["NOT", "NULL"]);
        if self.eat_punct(":=") || self.eat_punct("=") || self.eat_word("DEFAULT") {
            children.push(self.expression(SyntaxKind::Default, &[])?);
        }
        self.end_statement()?;
        Ok(self.finish(SyntaxKind::VariableDecl, start, children))
    }

    // ===== Blocks =====

    /// `BEGIN statements [EXCEPTION handlers] END [name]`
    pub(super) fn plsql_block(&mut self, children: &mut Vec<SyntaxNode>) -> Result<()> {
        let body_start = self.mark();
        self.expect_word("BEGIN")?;
        let statements = self.statements_until(&["EXCEPTION", "END"], Self::plsql_statement)?;
        children.push(self.finish(SyntaxKind::Body, body_start, statements));
        if self.at_word("EXCEPTION") {
            children.push(self.plsql_exception_section()?);
        }
        self.expect_word("END")?;
        if self.at_name() && !self.at_punct(";") {
            self.bump();
        }
        Ok(())
    }

    fn plsql_exception_section(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("EXCEPTION")?;
        let mut handlers = Vec::new();
        while self.at_word("WHEN") {
            let handler_start = self.mark();
            self.bump();
            let mut children = Vec::new();
            loop {
                let name_start = self.mark();
                while !self.at_word("OR") && !self.at_word("THEN") && !self.at_end() {
                    self.bump();
                }
                if self.mark() == name_start {
                    return Err(self.expected("exception name"));
                }
                children.push(self.node(SyntaxKind::Name, name_start, self.mark()));
                if !self.eat_word("OR") {
                    break;
                }
            }
            self.expect_word("THEN")?;
            let body_start = self.mark();
            let statements = self.statements_until(&["WHEN", "END"], Self::plsql_statement)?;
            children.push(self.finish(SyntaxKind::Body, body_start, statements));
            handlers.push(self.finish(SyntaxKind::Handler, handler_start, children));
        }
        if handlers.is_empty() {
            return Err(self.expected("WHEN"));
        }
        Ok(self.finish(SyntaxKind::ExceptionSection, start, handlers))
    }

    // ===== Statements =====

    pub(super) fn plsql_statement(&mut self) -> Result<SyntaxNode> {
        if self.db() == DatabaseType::Postgres {
            if let Some(node) = self.pg_statement()? {
                return Ok(node);
            }
        }
        let start = self.mark();

        if self.eat_punct("<<") {
            let mut label = self.name(SyntaxKind::Label)?;
            self.expect_punct(">>")?;
            if self.at_any_word(&["LOOP", "WHILE", "FOR", "BEGIN", "DECLARE"]) {
                let mut node = self.plsql_statement()?;
                node.children.insert(0, label);
                return Ok(node);
            }
            label.kind = SyntaxKind::Name;
            return Ok(self.finish(SyntaxKind::LabelDecl, start, vec![label]));
        }

        let Some(word) = self.peek().map(|l| l.upper()) else {
            return Err(self.expected("statement"));
        };
        let node = match word.as_str() {
            "IF" => return self.if_statement(Self::plsql_statement),
            "CASE" => return self.case_statement(Self::plsql_statement),
            "LOOP" => {
                let body = self.plsql_loop_body()?;
                self.finish(SyntaxKind::Loop, start, vec![body])
            }
            "WHILE" => {
                self.bump();
                let condition = self.expression(SyntaxKind::Condition, &["LOOP"])?;
                let body = self.plsql_loop_body()?;
                self.finish(SyntaxKind::While, start, vec![condition, body])
            }
            "FOR" => return self.plsql_for(),
            "EXIT" | "CONTINUE" => {
                self.bump();
                let mut children = Vec::new();
                if self.at_name() && !self.at_word("WHEN") {
                    children.push(self.name(SyntaxKind::Label)?);
                }
                if self.eat_word("WHEN") {
                    children.push(self.expression(SyntaxKind::Condition, &[])?);
                }
                let kind = if word == "EXIT" {
                    SyntaxKind::Exit
                } else {
                    SyntaxKind::Continue
                };
                self.finish(kind, start, children)
            }
            "OPEN" => {
                self.bump();
                let mut children = vec![self.name(SyntaxKind::CursorName)?];
                if self.at_punct("(") {
                    return Err(self.unsupported("cursor parameters"));
                }
                if self.eat_word("FOR") {
                    if self.at_word("EXECUTE") {
                        return Err(self.unsupported("OPEN ... FOR EXECUTE"));
                    }
                    children.push(self.select()?);
                }
                self.finish(SyntaxKind::Open, start, children)
            }
            "FETCH" => {
                self.bump();
                if self.at_any_word(&["PRIOR", "FIRST", "LAST", "ABSOLUTE", "RELATIVE"]) {
                    return Err(self.unsupported("scrolling FETCH"));
                }
                self.eat_word("NEXT");
                let _ = self.eat_word("FROM") || self.eat_word("IN");
                let cursor = self.name(SyntaxKind::CursorName)?;
                self.eat_words(&["BULK", "COLLECT"]);
                let into_start = self.mark();
                self.expect_word("INTO")?;
                let targets = self.name_list(SyntaxKind::Target)?;
                let into = self.finish(SyntaxKind::IntoVariables, into_start, targets);
                if self.at_word("LIMIT") {
                    return Err(self.unsupported("FETCH ... LIMIT"));
                }
                self.finish(SyntaxKind::Fetch, start, vec![cursor, into])
            }
            "CLOSE" => {
                self.bump();
                let cursor = self.name(SyntaxKind::CursorName)?;
                self.finish(SyntaxKind::Close, start, vec![cursor])
            }
            "RETURN" => {
                self.bump();
                let children = self.optional_expression(SyntaxKind::Value, &[]).into_iter().collect();
                self.finish(SyntaxKind::Return, start, children)
            }
            "NULL" if self.at_punct_nth(1, ";") => {
                self.bump();
                self.finish(SyntaxKind::Null, start, Vec::new())
            }
            "GOTO" => {
                self.bump();
                let label = self.name(SyntaxKind::Name)?;
                self.finish(SyntaxKind::Goto, start, vec![label])
            }
            "COMMIT" | "ROLLBACK" => self.transaction()?,
            "SAVEPOINT" | "MERGE" | "LOCK" | "PIPE" => return Ok(self.skip_statement()),
            "SELECT" | "WITH" => self.select()?,
            "INSERT" => self.insert()?,
            "UPDATE" => self.update()?,
            "DELETE" => self.delete()?,
            "DECLARE" | "BEGIN" => {
                let mut children = Vec::new();
                if self.eat_word("DECLARE") {
                    if let Some(declarations) = self.plsql_declarations(&["BEGIN"])? {
                        children.push(declarations);
                    }
                }
                self.plsql_block(&mut children)?;
                self.finish(SyntaxKind::NestedBlock, start, children)
            }
            "EXECUTE" if self.at_word_nth(1, "IMMEDIATE") => {
                self.pos_advance(2);
                self.execute_dynamic_rest(start)?
            }
            "RAISE" => {
                self.bump();
                let children = if self.at_name() {
                    vec![self.name(SyntaxKind::Code)?]
                } else {
                    Vec::new()
                };
                self.finish(SyntaxKind::Raise, start, children)
            }
            _ => return self.plsql_assignment_or_call(),
        };
        self.end_statement()?;
        Ok(node)
    }

    /// `<sql> [INTO targets] [USING args]` after `EXECUTE [IMMEDIATE]`.
    pub(super) fn execute_dynamic_rest(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = vec![self.expression(SyntaxKind::Value, &["INTO", "USING", "BULK"])?];
        if self.at_word("INTO") || self.at_words(&["BULK", "COLLECT"]) {
            let into_start = self.mark();
            self.eat_words(&["BULK", "COLLECT"]);
            self.expect_word("INTO")?;
            self.eat_word("STRICT");
            let targets = self.name_list(SyntaxKind::Target)?;
            children.push(self.finish(SyntaxKind::IntoVariables, into_start, targets));
        }
        if self.eat_word("USING") {
            loop {
                let _ = self.eat_words(&["IN", "OUT"]) || self.eat_word("IN") || self.eat_word("OUT");
                children.push(self.expression(SyntaxKind::Argument, &[","])?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        Ok(self.finish(SyntaxKind::ExecuteDynamic, start, children))
    }

    fn plsql_assignment_or_call(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        if !self.at_name() {
            return Ok(self.skip_statement());
        }
        let target = self.name(SyntaxKind::Target)?;
        let assigns = self.eat_punct(":=")
            || (self.db() == DatabaseType::Postgres && self.eat_punct("="));
        if assigns {
            let mut children = vec![target];
            children.extend(self.assignment_value(&[])?);
            self.end_statement()?;
            return Ok(self.finish(SyntaxKind::Assignment, start, children));
        }
        if self.at_punct("(") {
            // `arr(i) := ...` is an indexed assignment, not a call.
            let mark = self.mark();
            self.skip_balanced()?;
            if self.at_punct(":=") {
                return Err(self.unsupported("collection element assignment"));
            }
            self.reset(mark);
        }
        let mut children = vec![SyntaxNode { kind: SyntaxKind::Name, ..target }];
        if self.at_punct("(") {
            children.extend(self.paren_expression_list(SyntaxKind::Argument)?);
        }
        self.end_statement()?;
        Ok(self.finish(SyntaxKind::Call, start, children))
    }

    /// `LOOP statements END LOOP [label];`
    fn plsql_loop_body(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("LOOP")?;
        let statements = self.statements_until(&["END"], Self::plsql_statement)?;
        let body = self.finish(SyntaxKind::Body, start, statements);
        self.expect_words(&["END", "LOOP"])?;
        if self.at_name() {
            self.bump();
        }
        Ok(body)
    }

    fn plsql_for(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("FOR")?;
        let mut children = vec![self.name(SyntaxKind::Name)?];
        self.expect_word("IN")?;
        if self.at_word("REVERSE") {
            children.push(self.leaf(SyntaxKind::Reverse)?);
        }
        if self.at_paren_select() {
            children.push(self.paren_select()?);
        } else if self.at_select() {
            children.push(self.select()?);
        } else if self.at_word("EXECUTE") {
            return Err(self.unsupported("FOR ... IN EXECUTE"));
        } else {
            let range_start = self.mark();
            let range = self.expression(SyntaxKind::Range, &["LOOP", "BY"])?;
            if self.at_word("BY") {
                return Err(self.unsupported("FOR loop step"));
            }
            match range.text.find("..") {
                Some(split) => {
                    let lower = trimmed(self.source(), range.offset..range.offset + split);
                    let upper = trimmed(self.source(), range.offset + split + 2..range.offset + range.text.len());
                    let bounds = vec![
                        self.range_expression(SyntaxKind::Value, lower)?,
                        self.range_expression(SyntaxKind::Value, upper)?,
                    ];
                    children.push(range.with_children(bounds));
                }
                None => {
                    self.reset(range_start);
                    children.push(self.name(SyntaxKind::CursorName)?);
                    if self.at_punct("(") {
                        return Err(self.unsupported("cursor parameters"));
                    }
                }
            }
        }
        children.push(self.plsql_loop_body()?);
        self.end_statement()?;
        Ok(self.finish(SyntaxKind::ForLoop, start, children))
    }

    // ===== Shared procedural forms =====

    /// `IF c THEN ... ELSIF|ELSEIF c THEN ... ELSE ... END IF;`
    pub(super) fn if_statement(&mut self, statement: StatementFn<'s>) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("IF")?;
        let mut children = Vec::new();
        loop {
            let branch_start = self.mark();
            let condition = self.expression(SyntaxKind::Condition, &["THEN"])?;
            self.expect_word("THEN")?;
            let body_start = self.mark();
            let statements = self.statements_until(&["ELSIF", "ELSEIF", "ELSE", "END"], statement)?;
            let body = self.finish(SyntaxKind::Body, body_start, statements);
            children.push(self.finish(SyntaxKind::IfBranch, branch_start, vec![condition, body]));
            if !(self.eat_word("ELSIF") || self.eat_word("ELSEIF")) {
                break;
            }
        }
        if self.at_word("ELSE") {
            let else_start = self.mark();
            self.bump();
            let statements = self.statements_until(&["END"], statement)?;
            let body = self.finish(SyntaxKind::Body, else_start + 1, statements);
            children.push(self.finish(SyntaxKind::ElseBranch, else_start, vec![body]));
        }
        self.expect_words(&["END", "IF"])?;
        self.end_statement()?;
        Ok(self.finish(SyntaxKind::If, start, children))
    }

    /// `CASE [selector] WHEN v THEN ... [ELSE ...] END CASE;`
    pub(super) fn case_statement(&mut self, statement: StatementFn<'s>) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("CASE")?;
        let mut children = Vec::new();
        if !self.at_word("WHEN") {
            children.push(self.expression(SyntaxKind::Selector, &["WHEN"])?);
        }
        while self.at_word("WHEN") {
            let when_start = self.mark();
            self.bump();
            let condition = self.expression(SyntaxKind::Condition, &["THEN"])?;
            self.expect_word("THEN")?;
            let body_start = self.mark();
            let statements = self.statements_until(&["WHEN", "ELSE", "END"], statement)?;
            let body = self.finish(SyntaxKind::Body, body_start, statements);
            children.push(self.finish(SyntaxKind::When, when_start, vec![condition, body]));
        }
        if self.at_word("ELSE") {
            let else_start = self.mark();
            self.bump();
            let statements = self.statements_until(&["END"], statement)?;
            let body = self.finish(SyntaxKind::Body, else_start + 1, statements);
            children.push(self.finish(SyntaxKind::ElseBranch, else_start, vec![body]));
        }
        self.expect_words(&["END", "CASE"])?;
        if self.at_name() {
            self.bump();
        }
        self.end_statement()?;
        Ok(self.finish(SyntaxKind::Case, start, children))
    }
}

/// `range` without surrounding whitespace.
fn trimmed(source: &str, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
    let text = &source[range.clone()];
    let leading = text.len() - text.trim_start().len();
    let trailing = text.len() - text.trim_end().len();
    range.start + leading..range.end - trailing
}

#[cfg(test)]
mod tests {
    use crate::dialect::DatabaseType;
    use crate::parser::{parse, ParseMode, SyntaxKind};

    #[test]
    fn test_fetch_direction_other_than_next_is_rejected() {
        let sql = "CREATE PROCEDURE p AS v NUMBER; BEGIN FETCH LAST FROM c INTO v; END;";
        let err = parse(DatabaseType::Oracle, sql, ParseMode::Procedure).unwrap_err();
        assert!(err.to_string().contains("scrolling FETCH"), "{}", err);
    }

    #[test]
    fn test_function_header_and_body() {
        let root = parse(
            DatabaseType::Oracle,
            "CREATE OR REPLACE FUNCTION F(a IN NUMBER) RETURN NUMBER AS BEGIN RETURN NVL(a,0); END;",
            ParseMode::Function,
        )
        .unwrap();
        let unit = &root.children[0];
        assert_eq!(unit.kind, SyntaxKind::Function);
        assert_eq!(unit.child_text(SyntaxKind::Name), Some("F"));
        assert_eq!(unit.child_text(SyntaxKind::ReturnType), Some("NUMBER"));
        let param = &unit.child(SyntaxKind::ParameterList).unwrap().children[0];
        assert_eq!(param.child_text(SyntaxKind::Mode), Some("IN"));
        let ret = &unit.child(SyntaxKind::Body).unwrap().children[0];
        assert_eq!(ret.kind, SyntaxKind::Return);
        assert_eq!(ret.child_text(SyntaxKind::Value), Some("NVL(a,0)"));
    }

    #[test]
    fn test_cursor_loop_and_exception() {
        let sql = "CREATE PROCEDURE p IS
  CURSOR c IS SELECT id FROM t;
  v_id NUMBER := 0;
BEGIN
  OPEN c;
  <<outer>> LOOP
    FETCH c INTO v_id;
    EXIT WHEN c%NOTFOUND;
    DBMS_OUTPUT.PUT_LINE(v_id);
  END LOOP outer;
  CLOSE c;
EXCEPTION
  WHEN NO_DATA_FOUND OR TOO_MANY_ROWS THEN NULL;
  WHEN OTHERS THEN RAISE;
END p;
/";
        let root = parse(DatabaseType::Oracle, sql, ParseMode::Procedure).unwrap();
        let unit = &root.children[0];
        let decls = unit.child(SyntaxKind::DeclareSection).unwrap();
        assert_eq!(decls.children[0].kind, SyntaxKind::CursorDecl);
        assert_eq!(decls.children[1].child_text(SyntaxKind::Default), Some("0"));
        let body = unit.child(SyntaxKind::Body).unwrap();
        let kinds: Vec<_> = body.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![SyntaxKind::Open, SyntaxKind::Loop, SyntaxKind::Close]);
        let lp = &body.children[1];
        assert_eq!(lp.child_text(SyntaxKind::Label), Some("outer"));
        let inner: Vec<_> = lp.child(SyntaxKind::Body).unwrap().children.iter().map(|c| c.kind).collect();
        assert_eq!(inner, vec![SyntaxKind::Fetch, SyntaxKind::Exit, SyntaxKind::Call]);
        let handlers = unit.child(SyntaxKind::ExceptionSection).unwrap();
        assert_eq!(handlers.children.len(), 2);
        assert_eq!(handlers.children[0].children_of(SyntaxKind::Name).count(), 2);
    }

    #[test]
    fn test_numeric_for_range() {
        let root = parse(
            DatabaseType::Oracle,
            "BEGIN FOR i IN REVERSE 1..v_n LOOP NULL; END LOOP; END;",
            ParseMode::CommonBlock,
        )
        .unwrap();
        let body = root.children[0].child(SyntaxKind::Body).unwrap();
        let for_loop = &body.children[0];
        assert!(for_loop.has(SyntaxKind::Reverse));
        let range = for_loop.child(SyntaxKind::Range).unwrap();
        let bounds: Vec<_> = range.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(bounds, vec!["1", "v_n"]);
    }

    #[test]
    fn test_trigger_header() {
        let sql = "CREATE OR REPLACE TRIGGER trg BEFORE INSERT OR UPDATE OF sal ON emp FOR EACH ROW WHEN (NEW.sal > 0) BEGIN :NEW.updated := SYSDATE; END;";
        let root = parse(DatabaseType::Oracle, sql, ParseMode::Trigger).unwrap();
        let unit = &root.children[0];
        assert_eq!(unit.child_text(SyntaxKind::Timing), Some("BEFORE"));
        assert_eq!(unit.children_of(SyntaxKind::Event).count(), 2);
        assert!(unit.has(SyntaxKind::ForEachRow));
        assert_eq!(unit.child_text(SyntaxKind::Condition), Some("NEW.sal > 0"));
        let assign = &unit.child(SyntaxKind::Body).unwrap().children[0];
        assert_eq!(assign.child_text(SyntaxKind::Target), Some(":NEW.updated"));
    }
}
