//! T-SQL grammar.
//!
//! Statements need no terminator: a statement ends at `;`, at the end of
//! input, or where a word that can only start a statement appears.

use super::cursor::Parser;
use super::tree::{SyntaxKind, SyntaxNode};
use super::UnitKind;
use crate::error::Result;

const PARAMETER_STOPS: &[&str] = &[",", "OUT", "OUTPUT", "READONLY", "AS", "WITH", "FOR"];

impl<'s> Parser<'s> {
    pub(super) fn tsql_unit(&mut self, kind: UnitKind, start: usize) -> Result<SyntaxNode> {
        match kind {
            UnitKind::Procedure => self.tsql_procedure(start),
            UnitKind::Function => self.tsql_function(start),
            UnitKind::Trigger => self.tsql_trigger(start),
            UnitKind::View => self.view_unit(start),
            UnitKind::Block => {
                let body_start = self.mark();
                let statements = self.statements_until(&["GO"], Self::tsql_statement)?;
                let body = self.finish(SyntaxKind::Body, body_start, statements);
                Ok(self.finish(SyntaxKind::Block, start, vec![body]))
            }
        }
    }

    fn tsql_procedure(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        // Numbered procedures: `p;2`.
        if self.at_punct(";") && self.peek_nth(1).is_some_and(|l| l.kind == super::lexer::LexemeKind::Number) {
            self.pos_advance(2);
        }
        let parenthesized = self.eat_punct("(");
        if self.peek().is_some_and(|l| l.text.starts_with('@')) {
            children.push(self.tsql_parameters()?);
        }
        if parenthesized {
            self.expect_punct(")")?;
        }
        self.skip_routine_options();
        self.expect_word("AS")?;
        children.push(self.tsql_body()?);
        Ok(self.finish(SyntaxKind::Procedure, start, children))
    }

    fn tsql_function(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        self.expect_punct("(")?;
        if !self.at_punct(")") {
            children.push(self.tsql_parameters()?);
        }
        self.expect_punct(")")?;
        self.expect_word("RETURNS")?;
        if self.peek().is_some_and(|l| l.text.starts_with('@')) {
            return Err(self.unsupported("multi-statement table-valued function"));
        }
        if self.at_word("TABLE") {
            return Err(self.unsupported("inline table-valued function"));
        }
        let mut return_type = self.data_type()?;
        return_type.kind = SyntaxKind::ReturnType;
        children.push(return_type);
        self.skip_routine_options();
        self.expect_word("AS")?;
        children.push(self.tsql_body()?);
        Ok(self.finish(SyntaxKind::Function, start, children))
    }

    fn tsql_trigger(&mut self, start: usize) -> Result<SyntaxNode> {
        let mut children = vec![self.name(SyntaxKind::Name)?];
        self.expect_word("ON")?;
        if self.at_word("DATABASE") || self.at_words(&["ALL", "SERVER"]) {
            return Err(self.unsupported("DDL trigger"));
        }
        children.push(self.name(SyntaxKind::TableName)?);
        self.skip_routine_options();
        let timing_start = self.mark();
        if !(self.eat_word("FOR") || self.eat_word("AFTER") || self.eat_words(&["INSTEAD", "OF"])) {
            return Err(self.expected("FOR, AFTER or INSTEAD OF"));
        }
        children.push(self.node(SyntaxKind::Timing, timing_start, self.mark()));
        loop {
            if !self.at_any_word(&["INSERT", "UPDATE", "DELETE"]) {
                return Err(self.expected("INSERT, UPDATE or DELETE"));
            }
            children.push(self.leaf(SyntaxKind::Event)?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_words(&["NOT", "FOR", "REPLICATION"]);
        self.expect_word("AS")?;
        children.push(self.tsql_body()?);
        Ok(self.finish(SyntaxKind::Trigger, start, children))
    }

    /// `WITH RECOMPILE, ENCRYPTION, EXECUTE AS ...` and `FOR REPLICATION`.
    fn skip_routine_options(&mut self) {
        if self.eat_word("WITH") {
            while !self.at_end() && !self.at_word("AS") && !self.at_any_word(&["FOR", "AFTER", "INSTEAD"]) {
                if self.at_words(&["EXECUTE", "AS"]) {
                    self.pos_advance(3);
                } else {
                    self.bump();
                }
            }
        }
        self.eat_words(&["FOR", "REPLICATION"]);
    }

    /// `@p [AS] type [VARYING] [= default] [OUT | OUTPUT] [READONLY], ...`
    fn tsql_parameters(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        let mut params = Vec::new();
        loop {
            let p_start = self.mark();
            let mut children = vec![self.name(SyntaxKind::Name)?];
            self.eat_word("AS");
            children.push(self.data_type()?);
            self.eat_word("VARYING");
            if self.eat_punct("=") {
                children.push(self.expression(SyntaxKind::Default, PARAMETER_STOPS)?);
            }
            if self.at_word("OUT") || self.at_word("OUTPUT") {
                children.push(self.leaf(SyntaxKind::Mode)?);
            }
            self.eat_word("READONLY");
            params.push(self.finish(SyntaxKind::Parameter, p_start, children));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(self.finish(SyntaxKind::ParameterList, start, params))
    }

    /// Routine body: statements up to the end of input or `GO`.
    fn tsql_body(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        let statements = self.statements_until(&["GO"], Self::tsql_statement)?;
        Ok(self.finish(SyntaxKind::Body, start, statements))
    }

    // ===== Statements =====

    pub(super) fn tsql_statement(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        if self.at_name() && self.at_punct_nth(1, ":") && !self.is_statement_start(start) {
            let label = self.name(SyntaxKind::Name)?;
            self.expect_punct(":")?;
            return Ok(self.finish(SyntaxKind::LabelDecl, start, vec![label]));
        }
        let Some(word) = self.peek().map(|l| l.upper()) else {
            return Err(self.expected("statement"));
        };
        let node = match word.as_str() {
            "DECLARE" => self.tsql_declare()?,
            "SET" => self.tsql_set()?,
            "SELECT" | "WITH" => self.select()?,
            "INSERT" => self.insert()?,
            "UPDATE" => self.update()?,
            "DELETE" => self.delete()?,
            "IF" => return self.tsql_if(),
            "WHILE" => {
                self.bump();
                let condition = self.expression(SyntaxKind::Condition, &[])?;
                let body = self.tsql_single_body()?;
                return Ok(self.finish(SyntaxKind::While, start, vec![condition, body]));
            }
            "BEGIN" => return self.tsql_begin(),
            "RETURN" => {
                self.bump();
                let children = self.optional_expression(SyntaxKind::Value, &[]).into_iter().collect();
                self.finish(SyntaxKind::Return, start, children)
            }
            "PRINT" => {
                self.bump();
                let value = self.expression(SyntaxKind::Value, &[])?;
                self.finish(SyntaxKind::Print, start, vec![value])
            }
            "RAISERROR" => self.tsql_raiserror()?,
            "THROW" => {
                self.bump();
                let mut children = Vec::new();
                if !self.at_statement_end() {
                    let mut args = self.expression_list(SyntaxKind::Argument, &[])?.into_iter();
                    if let (Some(code), Some(message)) = (args.next(), args.next()) {
                        children.push(SyntaxNode { kind: SyntaxKind::Code, ..code });
                        children.push(SyntaxNode { kind: SyntaxKind::Value, ..message });
                    }
                }
                self.finish(SyntaxKind::Raise, start, children)
            }
            "EXEC" | "EXECUTE" => self.tsql_exec()?,
            "OPEN" | "CLOSE" | "DEALLOCATE" => {
                self.bump();
                self.eat_word("GLOBAL");
                let cursor = self.name(SyntaxKind::CursorName)?;
                let kind = match word.as_str() {
                    "OPEN" => SyntaxKind::Open,
                    "CLOSE" => SyntaxKind::Close,
                    _ => SyntaxKind::Deallocate,
                };
                self.finish(kind, start, vec![cursor])
            }
            "FETCH" => {
                self.bump();
                if self.at_any_word(&["PRIOR", "FIRST", "LAST", "ABSOLUTE", "RELATIVE"]) {
                    return Err(self.unsupported("scrolling FETCH"));
                }
                self.eat_word("NEXT");
                self.eat_word("FROM");
                self.eat_word("GLOBAL");
                let mut children = vec![self.name(SyntaxKind::CursorName)?];
                let into_start = self.mark();
                if self.eat_word("INTO") {
                    let targets = self.name_list(SyntaxKind::Target)?;
                    children.push(self.finish(SyntaxKind::IntoVariables, into_start, targets));
                }
                self.finish(SyntaxKind::Fetch, start, children)
            }
            "BREAK" => {
                self.bump();
                self.finish(SyntaxKind::Exit, start, Vec::new())
            }
            "CONTINUE" => {
                self.bump();
                self.finish(SyntaxKind::Continue, start, Vec::new())
            }
            "GOTO" => {
                self.bump();
                let label = self.name(SyntaxKind::Name)?;
                self.finish(SyntaxKind::Goto, start, vec![label])
            }
            "COMMIT" | "ROLLBACK" | "SAVE" => {
                if word == "SAVE" {
                    return Ok(self.skip_statement());
                }
                self.transaction()?
            }
            "TRUNCATE" => self.truncate()?,
            "DROP" => self.drop()?,
            "CREATE" => {
                if self.create_header().is_some() {
                    return Err(self.unsupported("object definition inside a routine"));
                }
                self.create_table()?
            }
            _ => return Ok(self.skip_statement()),
        };
        self.end_statement()?;
        Ok(node)
    }

    /// One statement as a body (T-SQL `IF`/`WHILE` take a single statement,
    /// usually a `BEGIN ... END` block).
    fn tsql_single_body(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.skip_semicolons();
        let statement = self.tsql_statement()?;
        let statements = match statement.kind {
            SyntaxKind::NestedBlock if !statement.has(SyntaxKind::Label) => statement
                .child(SyntaxKind::Body)
                .map(|b| b.children.clone())
                .unwrap_or_default(),
            _ => vec![statement],
        };
        Ok(self.finish(SyntaxKind::Body, start, statements))
    }

    fn tsql_if(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("IF")?;
        let branch_start = self.mark();
        let condition = self.expression(SyntaxKind::Condition, &[])?;
        let body = self.tsql_single_body()?;
        let mut children = vec![self.finish(SyntaxKind::IfBranch, branch_start, vec![condition, body])];
        let mark = self.mark();
        self.skip_semicolons();
        if self.at_word("ELSE") {
            let else_start = self.mark();
            self.bump();
            let body = self.tsql_single_body()?;
            children.push(self.finish(SyntaxKind::ElseBranch, else_start, vec![body]));
        } else {
            self.reset(mark);
        }
        Ok(self.finish(SyntaxKind::If, start, children))
    }

    fn tsql_begin(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        if self.at_words(&["BEGIN", "TRY"]) {
            self.pos_advance(2);
            let try_start = self.mark();
            let statements = self.statements_until(&["END"], Self::tsql_statement)?;
            let try_body = self.finish(SyntaxKind::Body, try_start, statements);
            let try_block = self.finish(SyntaxKind::TryBlock, try_start, vec![try_body]);
            self.expect_words(&["END", "TRY"])?;
            self.expect_words(&["BEGIN", "CATCH"])?;
            let catch_start = self.mark();
            let statements = self.statements_until(&["END"], Self::tsql_statement)?;
            let catch_body = self.finish(SyntaxKind::Body, catch_start, statements);
            let catch_block = self.finish(SyntaxKind::CatchBlock, catch_start, vec![catch_body]);
            self.expect_words(&["END", "CATCH"])?;
            self.eat_punct(";");
            return Ok(self.finish(SyntaxKind::TryCatch, start, vec![try_block, catch_block]));
        }
        if self.at_word_nth(1, "TRAN") || self.at_word_nth(1, "TRANSACTION") || self.at_word_nth(1, "DISTRIBUTED") {
            let node = self.transaction()?;
            self.end_statement()?;
            return Ok(node);
        }
        self.expect_word("BEGIN")?;
        let body_start = self.mark();
        let statements = self.statements_until(&["END"], Self::tsql_statement)?;
        let body = self.finish(SyntaxKind::Body, body_start, statements);
        self.expect_word("END")?;
        self.eat_punct(";");
        Ok(self.finish(SyntaxKind::NestedBlock, start, vec![body]))
    }

    fn tsql_declare(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("DECLARE")?;
        let mut items = Vec::new();
        loop {
            let item_start = self.mark();
            let name = self.name(SyntaxKind::Name)?;
            if self.eat_word("CURSOR") || (self.at_any_word(&["INSENSITIVE", "SCROLL"]) && self.at_word_nth(1, "CURSOR")) {
                self.eat_word("INSENSITIVE");
                self.eat_word("SCROLL");
                self.eat_word("CURSOR");
                // LOCAL, FORWARD_ONLY, STATIC, READ_ONLY ...
                while self.at_name() && !self.at_word("FOR") && !self.at_statement_end() {
                    self.bump();
                }
                let mut children = vec![name];
                if self.eat_word("FOR") {
                    children.push(self.select()?);
                }
                items.push(self.finish(SyntaxKind::CursorDecl, item_start, children));
            } else if self.eat_word("AS") && self.at_word("TABLE") || self.at_word("TABLE") {
                self.expect_word("TABLE")?;
                let mut children = vec![name];
                children.extend(self.column_defs()?);
                items.push(self.finish(SyntaxKind::TableVariableDecl, item_start, children));
            } else {
                let mut children = vec![name, self.data_type()?];
                if self.eat_punct("=") {
                    children.push(self.expression(SyntaxKind::Default, &[","])?);
                }
                items.push(self.finish(SyntaxKind::VariableDecl, item_start, children));
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(self.finish(SyntaxKind::DeclareSection, start, items))
    }

    fn tsql_set(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("SET")?;
        if !self.peek().is_some_and(|l| l.text.starts_with('@') && !l.text.starts_with("@@")) {
            // SET NOCOUNT ON, SET XACT_ABORT ON, SET TRANSACTION ISOLATION LEVEL ...
            while !self.at_statement_end() {
                self.bump();
            }
            return Ok(self.finish(SyntaxKind::Unknown, start, Vec::new()));
        }
        let target = self.name(SyntaxKind::Target)?;
        let mut operator = None;
        if !self.eat_punct("=") {
            match self.peek() {
                Some(l) if l.text.len() == 2 && l.text.ends_with('=') && !matches!(l.text.as_str(), "<=" | ">=" | "!=") => {
                    operator = Some(l.text[..1].to_string());
                    self.bump();
                }
                Some(l) if matches!(l.text.as_str(), "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^") && self.at_punct_nth(1, "=") => {
                    operator = Some(l.text.clone());
                    self.pos_advance(2);
                }
                _ => return Err(self.expected("'='")),
            }
        }
        if self.eat_word("CURSOR") {
            while self.at_name() && !self.at_word("FOR") {
                self.bump();
            }
            self.expect_word("FOR")?;
            let select = self.select()?;
            return Ok(self.finish(SyntaxKind::Assignment, start, vec![target, select]));
        }
        let mut children = vec![target];
        let values = self.assignment_value(&[])?;
        match operator {
            Some(op) => {
                let text = format!("{} {} ({})", children[0].text, op, values[0].text);
                children.push(self.synthetic_expression(SyntaxKind::Value, &text)?);
            }
            None => children.extend(values),
        }
        Ok(self.finish(SyntaxKind::Assignment, start, children))
    }

    /// `RAISERROR(msg, severity, state [, args]) [WITH options]`
    fn tsql_raiserror(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("RAISERROR")?;
        let args = self.paren_expression_list(SyntaxKind::Argument)?;
        if self.eat_word("WITH") {
            while self.at_name() && !self.at_statement_end() {
                self.bump();
                self.eat_punct(",");
            }
        }
        let mut children = Vec::new();
        let mut args = args.into_iter();
        if let Some(message) = args.next() {
            children.push(SyntaxNode { kind: SyntaxKind::Value, ..message });
        }
        // Severity and state have no counterpart elsewhere.
        children.extend(args.skip(2));
        Ok(self.finish(SyntaxKind::Raise, start, children))
    }

    /// `EXEC (@sql)`, `EXEC sp_executesql @sql, ...` or `EXEC [@rc =] proc args`.
    fn tsql_exec(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.bump();
        if self.eat_punct("(") {
            let value = self.expression(SyntaxKind::Value, &[])?;
            self.expect_punct(")")?;
            return Ok(self.finish(SyntaxKind::ExecuteDynamic, start, vec![value]));
        }
        if self.peek().is_some_and(|l| l.text.starts_with('@')) && self.at_punct_nth(1, "=") {
            self.pos_advance(2);
        }
        let name = self.name(SyntaxKind::Name)?;
        let args = if self.at_statement_end() {
            Vec::new()
        } else {
            self.expression_list(SyntaxKind::Argument, &[])?
        };
        let dynamic = name.text.rsplit('.').next().is_some_and(|n| n.eq_ignore_ascii_case("sp_executesql"));
        if dynamic {
            let mut args = args.into_iter();
            let Some(sql) = args.next() else {
                return Err(self.expected("statement text"));
            };
            let mut children = vec![SyntaxNode { kind: SyntaxKind::Value, ..sql }];
            // The second argument declares the parameters.
            children.extend(args.skip(1));
            return Ok(self.finish(SyntaxKind::ExecuteDynamic, start, children));
        }
        let mut children = vec![name];
        children.extend(args);
        Ok(self.finish(SyntaxKind::Call, start, children))
    }
}
