//! MySQL stored-program grammar.

use super::cursor::Parser;
use super::lexer::LexemeKind;
use super::tree::{SyntaxKind, SyntaxNode};
use super::UnitKind;
use crate::error::Result;

/// Blank out `DELIMITER` lines and turn custom delimiters back into `;`.
///
/// Byte offsets are preserved so positions in errors match the input.
pub(super) fn strip_delimiters(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut delimiter = ";".to_string();
    for line in source.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let is_directive = trimmed.get(..10).is_some_and(|p| p.eq_ignore_ascii_case("DELIMITER "));
        if is_directive {
            if let Some(d) = trimmed.get(10..).and_then(|rest| rest.split_whitespace().next()) {
                delimiter = d.to_string();
            }
            out.extend(line.chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
        } else if delimiter != ";" {
            let padded = format!(";{}", " ".repeat(delimiter.len() - 1));
            out.push_str(&line.replace(&delimiter, &padded));
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Blank out a `DEFINER = user@host` header clause, keeping offsets.
///
/// The tokenizer cannot split `` `root`@`%` ``; the clause carries nothing
/// a translation needs.
pub(super) fn blank_definer(source: &str) -> String {
    let upper = source.to_ascii_uppercase();
    let header_end = ["PROCEDURE", "FUNCTION", "TRIGGER", "VIEW"]
        .iter()
        .filter_map(|kw| upper.find(kw))
        .min()
        .unwrap_or(0);
    let Some(at) = upper[..header_end].find("DEFINER") else {
        return source.to_string();
    };
    let bytes = source.as_bytes();
    let skip_space = |mut i: usize| {
        while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
            i += 1;
        }
        i
    };
    let mut end = skip_space(at + "DEFINER".len());
    if bytes.get(end) != Some(&b'=') {
        return source.to_string();
    }
    end = skip_space(end + 1);
    // user@host, each part bare or quoted
    while let Some(&b) = bytes.get(end) {
        match b {
            b'`' | b'\'' | b'"' => match source[end + 1..].find(b as char) {
                Some(close) => end += close + 2,
                None => break,
            },
            _ if b.is_ascii_whitespace() => break,
            _ => end += 1,
        }
    }

    let mut out = String::with_capacity(source.len());
    out.push_str(&source[..at]);
    out.extend(source[at..end].chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
    out.push_str(&source[end..]);
    out
}

impl<'s> Parser<'s> {
    pub(super) fn mysql_unit(&mut self, kind: UnitKind, start: usize) -> Result<SyntaxNode> {
        match kind {
            UnitKind::Procedure => self.mysql_routine(start, false),
            UnitKind::Function => self.mysql_routine(start, true),
            UnitKind::Trigger => self.mysql_trigger(start),
            UnitKind::View => self.view_unit(start),
            UnitKind::Block => {
                let mut children = Vec::new();
                if self.at_word("BEGIN") || (self.at_name() && self.at_punct_nth(1, ":")) {
                    self.mysql_routine_body(&mut children)?;
                } else {
                    let body_start = self.mark();
                    let statements = self.statements_until(&[], Self::mysql_statement)?;
                    children.push(self.finish(SyntaxKind::Body, body_start, statements));
                }
                Ok(self.finish(SyntaxKind::Block, start, children))
            }
        }
    }

    fn mysql_routine(&mut self, start: usize, function: bool) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        let list_start = self.mark();
        self.expect_punct("(")?;
        if !self.at_punct(")") {
            let mut params = Vec::new();
            loop {
                let p_start = self.mark();
                let mut param = Vec::new();
                let mode_start = self.mark();
                if self.eat_word("INOUT") || self.eat_word("IN") || self.eat_word("OUT") {
                    param.push(self.node(SyntaxKind::Mode, mode_start, self.mark()));
                }
                param.insert(0, self.name(SyntaxKind::Name)?);
                param.push(self.data_type()?);
                params.push(self.finish(SyntaxKind::Parameter, p_start, param));
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct(")")?;
            children.push(self.finish(SyntaxKind::ParameterList, list_start, params));
        } else {
            self.bump();
        }
        if function {
            self.expect_word("RETURNS")?;
            let mut return_type = self.data_type()?;
            return_type.kind = SyntaxKind::ReturnType;
            children.push(return_type);
        }
        self.skip_characteristics();
        self.mysql_routine_body(&mut children)?;
        let kind = if function {
            SyntaxKind::Function
        } else {
            SyntaxKind::Procedure
        };
        Ok(self.finish(kind, start, children))
    }

    fn skip_characteristics(&mut self) {
        loop {
            if self.eat_word("COMMENT") {
                self.bump();
            } else if self.eat_words(&["SQL", "SECURITY"]) {
                self.bump();
            } else if !(self.eat_words(&["LANGUAGE", "SQL"])
                || self.eat_words(&["NOT", "DETERMINISTIC"])
                || self.eat_word("DETERMINISTIC")
                || self.eat_words(&["CONTAINS", "SQL"])
                || self.eat_words(&["NO", "SQL"])
                || self.eat_words(&["READS", "SQL", "DATA"])
                || self.eat_words(&["MODIFIES", "SQL", "DATA"]))
            {
                break;
            }
        }
    }

    /// `[label:] BEGIN ... END [label]` or a single statement.
    fn mysql_routine_body(&mut self, children: &mut Vec<SyntaxNode>) -> Result<()> {
        if self.at_name() && self.at_punct_nth(1, ":") && self.at_word_nth(2, "BEGIN") {
            children.push(self.name(SyntaxKind::Label)?);
            self.bump();
        }
        let body_start = self.mark();
        if self.eat_word("BEGIN") {
            let statements = self.statements_until(&["END"], Self::mysql_statement)?;
            children.push(self.finish(SyntaxKind::Body, body_start, statements));
            self.expect_word("END")?;
            if self.at_name() {
                self.bump();
            }
            self.eat_punct(";");
        } else {
            let statement = self.mysql_statement()?;
            children.push(self.finish(SyntaxKind::Body, body_start, vec![statement]));
        }
        Ok(())
    }

    fn mysql_trigger(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        self.trigger_clauses(&mut children)?;
        self.mysql_routine_body(&mut children)?;
        Ok(self.finish(SyntaxKind::Trigger, start, children))
    }

    // ===== Statements =====

    pub(super) fn mysql_statement(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        if self.at_name() && self.at_punct_nth(1, ":") {
            let label = self.name(SyntaxKind::Label)?;
            self.bump();
            let mut node = self.mysql_statement()?;
            node.children.insert(0, label);
            return Ok(node);
        }
        let Some(word) = self.peek().map(|l| l.upper()) else {
            return Err(self.expected("statement"));
        };
        let node = match word.as_str() {
            "DECLARE" => return self.mysql_declare(),
            "SET" => return self.mysql_set(),
            "SELECT" | "WITH" => self.select()?,
            "INSERT" => self.insert()?,
            "UPDATE" => self.update()?,
            "DELETE" => self.delete()?,
            "REPLACE" => return Err(self.unsupported("REPLACE")),
            "IF" => return self.if_statement(Self::mysql_statement),
            "CASE" => return self.case_statement(Self::mysql_statement),
            "LOOP" => {
                self.bump();
                let body = self.mysql_loop_body(&["END"])?;
                self.expect_words(&["END", "LOOP"])?;
                self.eat_label_suffix();
                self.finish(SyntaxKind::Loop, start, vec![body])
            }
            "WHILE" => {
                self.bump();
                let condition = self.expression(SyntaxKind::Condition, &["DO"])?;
                self.expect_word("DO")?;
                let body = self.mysql_loop_body(&["END"])?;
                self.expect_words(&["END", "WHILE"])?;
                self.eat_label_suffix();
                self.finish(SyntaxKind::While, start, vec![condition, body])
            }
            "REPEAT" => {
                self.bump();
                let body = self.mysql_loop_body(&["UNTIL"])?;
                self.expect_word("UNTIL")?;
                let condition = self.expression(SyntaxKind::Condition, &["END"])?;
                self.expect_words(&["END", "REPEAT"])?;
                self.eat_label_suffix();
                self.finish(SyntaxKind::Repeat, start, vec![body, condition])
            }
            "LEAVE" | "ITERATE" => {
                self.bump();
                let label = self.name(SyntaxKind::Label)?;
                let kind = if word == "LEAVE" {
                    SyntaxKind::Exit
                } else {
                    SyntaxKind::Continue
                };
                self.finish(kind, start, vec![label])
            }
            "OPEN" | "CLOSE" => {
                self.bump();
                let cursor = self.name(SyntaxKind::CursorName)?;
                let kind = if word == "OPEN" {
                    SyntaxKind::Open
                } else {
                    SyntaxKind::Close
                };
                self.finish(kind, start, vec![cursor])
            }
            "FETCH" => {
                self.bump();
                if self.eat_word("NEXT") {
                    self.expect_word("FROM")?;
                } else {
                    self.eat_word("FROM");
                }
                let cursor = self.name(SyntaxKind::CursorName)?;
                let into_start = self.mark();
                self.expect_word("INTO")?;
                let targets = self.name_list(SyntaxKind::Target)?;
                let into = self.finish(SyntaxKind::IntoVariables, into_start, targets);
                self.finish(SyntaxKind::Fetch, start, vec![cursor, into])
            }
            "RETURN" => {
                self.bump();
                let value = self.expression(SyntaxKind::Value, &[])?;
                self.finish(SyntaxKind::Return, start, vec![value])
            }
            "CALL" => {
                self.bump();
                let mut children = vec![self.name(SyntaxKind::Name)?];
                if self.at_punct("(") {
                    children.extend(self.paren_expression_list(SyntaxKind::Argument)?);
                }
                self.finish(SyntaxKind::Call, start, children)
            }
            "SIGNAL" => self.mysql_signal()?,
            "RESIGNAL" => {
                while !self.at_statement_end() {
                    self.bump();
                }
                self.finish(SyntaxKind::Raise, start, Vec::new())
            }
            "PREPARE" => {
                self.bump();
                let name = self.name(SyntaxKind::Name)?;
                self.expect_word("FROM")?;
                let value = self.expression(SyntaxKind::Value, &[])?;
                self.finish(SyntaxKind::Prepare, start, vec![name, value])
            }
            "EXECUTE" => {
                self.bump();
                let mut children = vec![self.name(SyntaxKind::Name)?];
                if self.eat_word("USING") {
                    children.extend(self.expression_list(SyntaxKind::Argument, &[])?);
                }
                self.finish(SyntaxKind::ExecutePrepared, start, children)
            }
            "DEALLOCATE" | "DROP" if self.at_word_nth(1, "PREPARE") => {
                self.pos_advance(2);
                let name = self.name(SyntaxKind::Name)?;
                self.finish(SyntaxKind::DeallocatePrepare, start, vec![name])
            }
            "DROP" => self.drop()?,
            "TRUNCATE" => self.truncate()?,
            "CREATE" => {
                if self.create_header().is_some() {
                    return Err(self.unsupported("object definition inside a routine"));
                }
                self.create_table()?
            }
            "START" | "COMMIT" | "ROLLBACK" => self.transaction()?,
            "BEGIN" => {
                self.bump();
                let body = self.mysql_loop_body(&["END"])?;
                self.expect_word("END")?;
                self.eat_label_suffix();
                self.finish(SyntaxKind::NestedBlock, start, vec![body])
            }
            _ => return Ok(self.skip_statement()),
        };
        self.end_statement()?;
        Ok(node)
    }

    fn mysql_loop_body(&mut self, terminators: &[&str]) -> Result<SyntaxNode> {
        let start = self.mark();
        let statements = self.statements_until(terminators, Self::mysql_statement)?;
        Ok(self.finish(SyntaxKind::Body, start, statements))
    }

    /// Optional label repeated after `END LOOP`, `END WHILE`, `END REPEAT` or `END`.
    fn eat_label_suffix(&mut self) {
        if self.at_name() && !self.at_punct(";") {
            self.bump();
        }
    }

    fn mysql_declare(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("DECLARE")?;
        if self.at_any_word(&["CONTINUE", "EXIT", "UNDO"]) && self.at_word_nth(1, "HANDLER") {
            let action = self.leaf(SyntaxKind::HandlerAction)?;
            self.expect_word("HANDLER")?;
            self.expect_word("FOR")?;
            let mut children = vec![action];
            loop {
                let cond_start = self.mark();
                if self.eat_word("SQLSTATE") {
                    self.eat_word("VALUE");
                    self.bump();
                } else if !self.eat_words(&["NOT", "FOUND"]) {
                    self.bump();
                }
                children.push(self.node(SyntaxKind::Name, cond_start, self.mark()));
                if !self.eat_punct(",") {
                    break;
                }
            }
            let body_start = self.mark();
            let statement = self.mysql_statement()?;
            children.push(self.finish(SyntaxKind::Body, body_start, vec![statement]));
            let handler = self.finish(SyntaxKind::HandlerDecl, start, children);
            return Ok(self.finish(SyntaxKind::DeclareSection, start, vec![handler]));
        }
        if self.at_word_nth(1, "CONDITION") {
            return Ok(self.skip_statement());
        }

        let names = self.name_list(SyntaxKind::Name)?;
        if self.eat_word("CURSOR") {
            self.expect_word("FOR")?;
            let select = self.select()?;
            self.end_statement()?;
            let mut children = names;
            children.truncate(1);
            children.push(select);
            let cursor = self.finish(SyntaxKind::CursorDecl, start, children);
            return Ok(self.finish(SyntaxKind::DeclareSection, start, vec![cursor]));
        }
        let data_type = self.data_type()?;
        let default = if self.eat_word("DEFAULT") {
            Some(self.expression(SyntaxKind::Default, &[])?)
        } else {
            None
        };
        self.end_statement()?;
        let items = names
            .into_iter()
            .map(|name| {
                let mut children = vec![name.clone(), data_type.clone()];
                children.extend(default.clone());
                SyntaxNode { kind: SyntaxKind::VariableDecl, ..name }.with_children(children)
            })
            .collect();
        Ok(self.finish(SyntaxKind::DeclareSection, start, items))
    }

    /// `SET a = 1, b := 2`; several assignments come back as a nested block.
    fn mysql_set(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("SET")?;
        if self.at_any_word(&["NAMES", "CHARACTER", "TRANSACTION", "SESSION", "GLOBAL", "PERSIST"]) {
            while !self.at_statement_end() {
                self.bump();
            }
            let node = self.finish(SyntaxKind::Unknown, start, Vec::new());
            self.end_statement()?;
            return Ok(node);
        }
        let mut items = Vec::new();
        loop {
            let item_start = self.mark();
            let mut children = vec![self.name(SyntaxKind::Target)?];
            if !self.eat_punct("=") {
                self.expect_punct(":=")?;
            }
            children.extend(self.assignment_value(&[","])?);
            items.push(self.finish(SyntaxKind::Assignment, item_start, children));
            if !self.eat_punct(",") {
                break;
            }
        }
        let node = if items.len() == 1 {
            items.remove(0)
        } else {
            let body = self.finish(SyntaxKind::Body, start, items);
            self.finish(SyntaxKind::NestedBlock, start, vec![body])
        };
        self.end_statement()?;
        Ok(node)
    }

    /// `SIGNAL SQLSTATE [VALUE] 'xxxxx' [SET MESSAGE_TEXT = msg, ...]`
    fn mysql_signal(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("SIGNAL")?;
        let mut children = Vec::new();
        if self.eat_word("SQLSTATE") {
            self.eat_word("VALUE");
            if !self.peek().is_some_and(|l| l.kind == LexemeKind::String) {
                return Err(self.expected("SQLSTATE value"));
            }
            children.push(self.leaf(SyntaxKind::Code)?);
        } else {
            children.push(self.name(SyntaxKind::Code)?);
        }
        if self.eat_word("SET") {
            loop {
                let item = self.bump().map(|l| l.upper()).unwrap_or_default();
                self.expect_punct("=")?;
                let value = self.expression(SyntaxKind::Value, &[","])?;
                if item == "MESSAGE_TEXT" {
                    children.push(value);
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        Ok(self.finish(SyntaxKind::Raise, start, children))
    }
}
