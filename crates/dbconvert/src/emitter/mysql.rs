//! MySQL stored program rendering.
//!
//! MySQL requires declarations at the top of a compound statement in a fixed
//! order (variables, cursors, handlers), has no FOR loops and no cursor
//! exhaustion test: cursor loops are driven by a `NOT FOUND` handler that
//! sets `v_not_found`.

use super::writer::{string_literal, ScriptWriter};
use super::{
    default_message, error_code, handlers_of, has_cursor_guards, is_simple_message, map_condition,
    Emitter, ErrorCode, MappedHandler, Rendered,
};
use crate::dialect::DatabaseType;
use crate::error::Result;
use crate::model::*;

const NULL_STATEMENT: &str = "DO 0;";
/// Label of routine and trigger bodies, the target of `LEAVE` for early returns.
const BODY_LABEL: &str = "sp";
const NOT_FOUND_FLAG: &str = "v_not_found";
const DEFAULT_SQLSTATE: &str = "45000";

pub(super) fn render(e: &mut Emitter, script: &Script) -> Result<String> {
    match script {
        Script::Routine(r) => routine(e, r),
        Script::View(v) => view(e, v),
        Script::Trigger(t) => trigger(e, t),
        Script::Common(c) => common(e, c),
    }
}

// ===== Objects =====

fn routine(e: &mut Emitter, r: &RoutineScript) -> Result<String> {
    let function = r.kind == RoutineKind::Function;
    let body = body(e, &r.declarations, &r.statements)?;
    let mut w = ScriptWriter::new();
    let params = parameters(&r.parameters, function);
    if function {
        let returns = r
            .return_type
            .as_ref()
            .ok_or_else(|| e.unsupported("function without a return type"))?;
        w.line(format!("CREATE FUNCTION {}({})", r.name.qualified(), params));
        w.line(format!("RETURNS {}", returns.text));
        w.line("READS SQL DATA");
        w.line("BEGIN");
    } else {
        w.line(format!("CREATE PROCEDURE {}({})", r.name.qualified(), params));
        w.line(format!("{}: BEGIN", BODY_LABEL));
    }
    body.lines.iter().for_each(|l| w.line(l));
    w.line("END;");
    Ok(w.finish())
}

fn view(e: &mut Emitter, v: &ViewScript) -> Result<String> {
    let columns = if v.columns.is_empty() {
        String::new()
    } else {
        format!(" ({})", e.toks(&v.columns))
    };
    let mut w = ScriptWriter::new();
    w.line(format!("CREATE OR REPLACE VIEW {}{} AS", v.name.qualified(), columns));
    w.line(format!("{};", e.select(&v.query)?));
    Ok(w.finish())
}

/// One trigger per event; a `WHEN` filter wraps the body in an IF.
fn trigger(e: &mut Emitter, t: &TriggerScript) -> Result<String> {
    if t.timing == TriggerTiming::InsteadOf {
        return Err(e.unsupported("INSTEAD OF trigger"));
    }
    if !t.for_each_row {
        return Err(e.unsupported("statement-level trigger"));
    }
    let statements = match &t.condition {
        Some(condition) => vec![Statement::If(IfStatement {
            items: vec![IfItem {
                condition: condition.clone(),
                statements: t.statements.clone(),
            }],
            else_statements: None,
        })],
        None => t.statements.clone(),
    };
    let body = body(e, &t.declarations, &statements)?;

    let mut out = Vec::new();
    for event in &t.events {
        let name = if t.events.len() > 1 {
            format!("{}_{}", t.name.qualified(), event.keyword().to_ascii_lowercase())
        } else {
            t.name.qualified()
        };
        let mut w = ScriptWriter::new();
        w.line(format!("CREATE TRIGGER {}", name));
        w.line(format!("{} {} ON {}", t.timing.keyword(), event.keyword(), t.table.text));
        w.line("FOR EACH ROW");
        w.line(format!("{}: BEGIN", BODY_LABEL));
        body.lines.iter().for_each(|l| w.line(l));
        w.line("END;");
        out.push(w.finish());
    }
    Ok(out.join("\n"))
}

fn common(e: &mut Emitter, c: &CommonScript) -> Result<String> {
    if c.declarations.iter().any(|d| matches!(d, Statement::Declare(_) | Statement::Exception(_))) {
        return Err(e.unsupported("declarations outside a stored program"));
    }
    if let Some(s) = c.statements.iter().find(|s| is_compound(s)) {
        return Err(e.unsupported(format!("{} outside a stored program", s.kind_name())));
    }
    let rendered = e.render_block(|e, w| {
        for stmt in &c.statements {
            statement(e, w, stmt)?;
        }
        Ok(())
    })?;
    if !rendered.declarations.is_empty() {
        return Err(e.unsupported("local variables outside a stored program"));
    }
    let mut w = ScriptWriter::new();
    rendered.lines.iter().for_each(|l| w.line(l));
    Ok(w.finish())
}

/// Statements MySQL only accepts inside stored programs.
fn is_compound(stmt: &Statement) -> bool {
    matches!(
        stmt,
        Statement::If(_)
            | Statement::Case(_)
            | Statement::Loop(_)
            | Statement::While(_)
            | Statement::LoopExit(_)
            | Statement::Continue(_)
            | Statement::TryCatch(_)
            | Statement::OpenCursor(_)
            | Statement::FetchCursor(_)
            | Statement::CloseCursor(_)
            | Statement::Return(_)
            | Statement::Leave
            | Statement::RaiseError(_)
    )
}

fn parameters(parameters: &[Parameter], function: bool) -> String {
    parameters
        .iter()
        .map(|p| {
            // Function parameters are always IN and take no mode keyword.
            let direction = match (function, p.direction) {
                (true, _) => "",
                (false, ParameterDirection::In) => "IN ",
                (false, ParameterDirection::Out) => "OUT ",
                (false, ParameterDirection::InOut) => "INOUT ",
            };
            format!("{}{} {}", direction, p.name.text, p.data_type.text)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ===== Bodies =====

/// Body of a compound statement, declarations first.
fn body(e: &mut Emitter, declarations: &[Statement], statements: &[Statement]) -> Result<Rendered> {
    let handlers = handlers_of(declarations);
    let guarded = has_cursor_guards(statements);
    let mut handler_lines = Vec::new();
    let mut rendered = e.render_block(|e, w| {
        if guarded {
            e.synthesize(NOT_FOUND_FLAG, "INT", Some("0"));
        }
        let mut hw = ScriptWriter::new();
        hw.indent();
        let (mapped, dropped) = e.map_handlers(&handlers);
        if guarded && mapped.iter().any(|h| h.conditions.iter().any(|c| c == "NOT FOUND")) {
            return Err(e.unsupported("NO_DATA_FOUND handler in a routine with cursor loops"));
        }
        dropped.iter().for_each(|c| hw.line(c));
        for h in &mapped {
            handler(e, &mut hw, "EXIT", h)?;
        }
        if guarded {
            hw.line(format!(
                "DECLARE CONTINUE HANDLER FOR NOT FOUND SET {} = 1;",
                NOT_FOUND_FLAG
            ));
        }
        handler_lines = hw.split_off(0);

        w.indent();
        for decl in declarations {
            if let Statement::Declare(Declaration::Table(t)) = decl {
                w.line(format!(
                    "CREATE TEMPORARY TABLE IF NOT EXISTS {} (\n    {}\n);",
                    t.name.text,
                    e.column_definitions(&t.columns)
                ));
            }
        }
        block(e, w, statements)?;
        w.dedent();
        Ok(())
    })?;

    let mut w = ScriptWriter::new();
    w.indent();
    for decl in declarations {
        if let Statement::Declare(Declaration::Variable(v)) = decl {
            let default = v
                .default
                .as_ref()
                .map(|d| format!(" DEFAULT {}", e.tok(d)))
                .unwrap_or_default();
            w.line(format!("DECLARE {} {}{};", v.name.text, v.data_type.text, default));
        }
    }
    for v in &rendered.declarations {
        let default = v.default.as_ref().map(|d| format!(" DEFAULT {}", d)).unwrap_or_default();
        w.line(format!("DECLARE {} {}{};", v.name, v.data_type, default));
    }
    for decl in declarations {
        if let Statement::Declare(Declaration::Cursor(c)) = decl {
            let query = c
                .query
                .as_ref()
                .ok_or_else(|| e.unsupported("cursor variable without a query"))?;
            w.line(format!("DECLARE {} CURSOR FOR", c.name.text));
            let text = e.select(query)?;
            w.nested(|w| w.line(format!("{};", text)));
        }
    }
    let mut lines = w.split_off(0);
    lines.extend(handler_lines);
    lines.append(&mut rendered.lines);
    rendered.lines = lines;
    Ok(rendered)
}

fn handler(e: &mut Emitter, w: &mut ScriptWriter, kind: &str, h: &MappedHandler) -> Result<()> {
    w.line(format!("DECLARE {} HANDLER FOR {}", kind, h.conditions.join(", ")));
    w.line("BEGIN");
    nested_block(e, w, &h.handler.statements)?;
    w.line("END;");
    Ok(())
}

fn block(e: &mut Emitter, w: &mut ScriptWriter, statements: &[Statement]) -> Result<()> {
    let mark = w.len();
    for stmt in statements {
        statement(e, w, stmt)?;
    }
    if w.len() == mark {
        w.line(NULL_STATEMENT);
    }
    Ok(())
}

fn nested_block(e: &mut Emitter, w: &mut ScriptWriter, statements: &[Statement]) -> Result<()> {
    w.indent();
    let result = block(e, w, statements);
    w.dedent();
    result
}

fn statement(e: &mut Emitter, w: &mut ScriptWriter, stmt: &Statement) -> Result<()> {
    match stmt {
        Statement::Select(s) => select(e, w, s)?,
        Statement::Insert(s) => {
            for text in e.insert(s, true)? {
                w.line(format!("{};", text));
            }
        }
        Statement::Update(u) => update(e, w, u)?,
        Statement::Delete(d) => delete(e, w, d)?,
        Statement::Set(s) => match &s.value {
            SetValue::Expression(v) => w.line(format!("SET {} = {};", e.tok(&s.key), e.tok(v))),
            SetValue::Query(_) => return Err(e.unsupported("assignment of a query to a cursor variable")),
        },
        Statement::If(s) => {
            for (i, item) in s.items.iter().enumerate() {
                let keyword = if i == 0 { "IF" } else { "ELSEIF" };
                w.line(format!("{} {} THEN", keyword, e.tok(&item.condition)));
                nested_block(e, w, &item.statements)?;
            }
            if let Some(els) = &s.else_statements {
                w.line("ELSE");
                nested_block(e, w, els)?;
            }
            w.line("END IF;");
        }
        Statement::Case(s) => {
            match &s.selector {
                Some(sel) => w.line(format!("CASE {}", e.tok(sel))),
                None => w.line("CASE"),
            }
            w.indent();
            for item in &s.items {
                w.line(format!("WHEN {} THEN", e.tok(&item.when)));
                nested_block(e, w, &item.statements)?;
            }
            // MySQL raises an error when no branch matches.
            w.line("ELSE");
            nested_block(e, w, s.else_statements.as_deref().unwrap_or(&[]))?;
            w.dedent();
            w.line("END CASE;");
        }
        Statement::Loop(l) => match &l.kind {
            LoopKind::Basic => {
                let label = e.loop_label_for(l.label.as_ref(), &l.statements, true);
                labelled_loop(e, w, l.label.clone(), label, "LOOP", "END LOOP", &l.statements, None)?;
            }
            LoopKind::For {
                iterator,
                range: ForRange::Numeric { lower, upper, reverse },
            } => {
                // Step before the body so ITERATE cannot skip the increment.
                let var = e.synthesize(&iterator.text, "INT", None);
                let (start, test, step) = if *reverse {
                    (
                        format!("SET {} = ({}) + 1;", var, e.tok(upper)),
                        format!("WHILE {} > {} DO", var, e.tok(lower)),
                        format!("SET {} = {} - 1;", var, var),
                    )
                } else {
                    (
                        format!("SET {} = ({}) - 1;", var, e.tok(lower)),
                        format!("WHILE {} < {} DO", var, e.tok(upper)),
                        format!("SET {} = {} + 1;", var, var),
                    )
                };
                w.line(start);
                let label = e.loop_label_for(l.label.as_ref(), &l.statements, true);
                labelled_loop(e, w, l.label.clone(), label, &test, "END WHILE", &l.statements, Some(&step))?;
            }
            LoopKind::For { .. } => return Err(e.unsupported("cursor FOR loop")),
        },
        Statement::While(l) => {
            let label = e.loop_label_for(l.label.as_ref(), &l.statements, true);
            let head = format!("WHILE {} DO", e.tok(&l.condition));
            labelled_loop(e, w, l.label.clone(), label, &head, "END WHILE", &l.statements, None)?;
        }
        Statement::LoopExit(x) => {
            let label = required_label(e, x.label.as_deref())?;
            let leave = format!("LEAVE {};", label);
            match (&x.cursor, &x.condition) {
                (Some(_), _) => conditional(w, &format!("{} = 1", NOT_FOUND_FLAG), &leave),
                (None, Some(cond)) => conditional(w, &e.tok(cond), &leave),
                (None, None) => w.line(leave),
            }
        }
        Statement::Continue(c) => {
            let label = required_label(e, c.label.as_deref())?;
            let iterate = format!("ITERATE {};", label);
            match &c.condition {
                Some(cond) => conditional(w, &e.tok(cond), &iterate),
                None => w.line(iterate),
            }
        }
        Statement::Declare(_) | Statement::Exception(_) => {
            return Err(e.unsupported(format!("{} inside a statement block", stmt.kind_name())))
        }
        Statement::TryCatch(tc) => {
            w.line("BEGIN");
            w.indent();
            let handlers: Vec<&ExceptionHandler> = tc.handlers.iter().collect();
            let (mapped, dropped) = e.map_handlers(&handlers);
            dropped.iter().for_each(|c| w.line(c));
            for h in &mapped {
                handler(e, w, "EXIT", h)?;
            }
            block(e, w, &tc.try_statements)?;
            w.dedent();
            w.line("END;");
        }
        Statement::OpenCursor(o) => {
            if o.query.is_some() {
                return Err(e.unsupported("OPEN ... FOR on a cursor declared with a query"));
            }
            w.line(format!("OPEN {};", o.cursor.text));
            if e.variables.contains(NOT_FOUND_FLAG) {
                w.line(format!("SET {} = 0;", NOT_FOUND_FLAG));
            }
        }
        Statement::FetchCursor(f) => {
            w.line(format!("FETCH {} INTO {};", f.cursor.text, e.toks(&f.variables)));
        }
        Statement::CloseCursor(c) => {
            if !c.deallocate {
                w.line(format!("CLOSE {};", c.cursor.text));
            }
        }
        Statement::Return(r) => match (&r.value, e.routine) {
            (Some(v), Some(RoutineKind::Function)) => w.line(format!("RETURN {};", e.tok(v))),
            (None, Some(RoutineKind::Function)) => return Err(e.unsupported("RETURN without a value in a function")),
            (Some(v), _) => {
                // A procedure's return code becomes a one-row result.
                w.line(format!("SELECT {};", e.tok(v)));
                leave_body(e, w)?;
            }
            (None, _) => leave_body(e, w)?,
        },
        Statement::Leave => leave_body(e, w)?,
        Statement::Print(p) => w.line(format!("SELECT {};", e.tok(&p.content))),
        Statement::RaiseError(r) => raise(e, w, r),
        Statement::Call(c) => match c.kind {
            CallKind::Procedure => w.line(format!("CALL {}({});", c.name.text, e.toks(&c.arguments))),
            CallKind::Function => w.line(format!("DO {}({});", c.name.text, e.toks(&c.arguments))),
            CallKind::Dynamic => {
                w.line(format!("SET @dyn_sql = {};", e.tok(&c.name)));
                let mut names = Vec::new();
                for (i, arg) in c.arguments.iter().enumerate() {
                    let name = format!("@dyn_arg{}", i + 1);
                    w.line(format!("SET {} = {};", name, e.tok(arg)));
                    names.push(name);
                }
                w.line("PREPARE dyn_stmt FROM @dyn_sql;");
                if names.is_empty() {
                    w.line("EXECUTE dyn_stmt;");
                } else {
                    w.line(format!("EXECUTE dyn_stmt USING {};", names.join(", ")));
                }
                w.line("DEALLOCATE PREPARE dyn_stmt;");
            }
        },
        Statement::Goto(_) => return Err(e.unsupported("GOTO")),
        Statement::Label(_) => {}
        Statement::Transaction(t) => match t.kind {
            TransactionKind::Begin => w.line("START TRANSACTION;"),
            TransactionKind::Commit => w.line("COMMIT;"),
            TransactionKind::Rollback => w.line("ROLLBACK;"),
        },
        Statement::CreateTable(c) => {
            let temporary = if c.temporary { "TEMPORARY " } else { "" };
            match &c.as_select {
                Some(q) => w.line(format!("CREATE {}TABLE {} AS\n{};", temporary, c.name.text, e.select(q)?)),
                None => w.line(format!(
                    "CREATE {}TABLE {} (\n    {}\n);",
                    temporary,
                    c.name.text,
                    e.column_definitions(&c.columns)
                )),
            }
        }
        Statement::Truncate(t) => w.line(format!("TRUNCATE TABLE {};", t.table.text)),
        Statement::Drop(d) => w.line(format!(
            "DROP {}{} {};",
            d.object_type.keyword(),
            if d.if_exists { " IF EXISTS" } else { "" },
            d.name.text
        )),
        Statement::Prepared(p) => match &p.kind {
            PreparedKind::Prepare(text) => w.line(format!("PREPARE {} FROM {};", p.id.text, e.tok(text))),
            PreparedKind::Execute(args) if args.is_empty() => w.line(format!("EXECUTE {};", p.id.text)),
            PreparedKind::Execute(args) => w.line(format!("EXECUTE {} USING {};", p.id.text, e.toks(args))),
            PreparedKind::Deallocate => w.line(format!("DEALLOCATE PREPARE {};", p.id.text)),
        },
        Statement::Null => w.line(NULL_STATEMENT),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn labelled_loop(
    e: &mut Emitter,
    w: &mut ScriptWriter,
    source_label: Option<String>,
    label: Option<String>,
    head: &str,
    end: &str,
    statements: &[Statement],
    step: Option<&str>,
) -> Result<()> {
    match &label {
        Some(l) => w.line(format!("{}: {}", l, head)),
        None => w.line(head),
    }
    e.push_loop(source_label, label.clone());
    w.indent();
    if let Some(step) = step {
        w.line(step);
    }
    let result = block(e, w, statements);
    w.dedent();
    e.pop_loop();
    result?;
    match &label {
        Some(l) => w.line(format!("{} {};", end, l)),
        None => w.line(format!("{};", end)),
    }
    // The handler leaves the flag set once the cursor is exhausted.
    if has_cursor_guards(statements) {
        w.line(format!("SET {} = 0;", NOT_FOUND_FLAG));
    }
    Ok(())
}

fn required_label(e: &Emitter, label: Option<&str>) -> Result<String> {
    e.loop_label(label)?
        .ok_or_else(|| e.unsupported("loop exit without a loop label"))
}

fn conditional(w: &mut ScriptWriter, condition: &str, action: &str) {
    w.line(format!("IF {} THEN", condition));
    w.nested(|w| w.line(action));
    w.line("END IF;");
}

fn leave_body(e: &Emitter, w: &mut ScriptWriter) -> Result<()> {
    if e.routine == Some(RoutineKind::Function) {
        return Err(e.unsupported("LEAVE from a function"));
    }
    w.line(format!("LEAVE {};", BODY_LABEL));
    Ok(())
}

fn select(e: &mut Emitter, w: &mut ScriptWriter, s: &SelectStatement) -> Result<()> {
    match &s.into {
        Some(SelectInto::Variables(_)) => w.line(format!("{};", e.select(s)?)),
        Some(SelectInto::Table { name, temporary }) => {
            let mut query = s.clone();
            query.into = None;
            let text = e.select(&query)?;
            if *temporary {
                w.line(format!("CREATE TEMPORARY TABLE IF NOT EXISTS {} AS (\n{}\n);", name.text, text));
            } else {
                w.line(format!("CREATE TABLE {} AS\n{};", name.text, text));
            }
        }
        None if e.is_function() => return Err(e.unsupported("result set returned from a function")),
        None => w.line(format!("{};", e.select(s)?)),
    }
    Ok(())
}

/// Qualify an unqualified SET column with the target handle.
fn qualified(column: &str, handle: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", handle, column)
    }
}

fn update(e: &mut Emitter, w: &mut ScriptWriter, u: &UpdateStatement) -> Result<()> {
    let mut text = if u.from.is_empty() {
        format!(
            "UPDATE {}\nSET {}",
            e.source(&u.table, u.alias.as_ref()),
            e.set_items(&u.set_items)
        )
    } else {
        let handle = u.alias.as_ref().map(|a| a.text.clone()).unwrap_or_else(|| u.table.text.clone());
        let sets = u
            .set_items
            .iter()
            .map(|item| format!("{} = {}", qualified(&e.tok(&item.column), &handle), e.tok(&item.value)))
            .collect::<Vec<_>>()
            .join(",\n    ");
        let sources = if u.from.iter().any(|f| f.source.text.eq_ignore_ascii_case(&u.table.text)) {
            e.from_items(&u.from)
        } else {
            format!("{}, {}", e.source(&u.table, u.alias.as_ref()), e.from_items(&u.from))
        };
        format!("UPDATE {}\nSET {}", sources, sets)
    };
    if let Some(where_clause) = &u.where_clause {
        text.push_str(&format!("\nWHERE {}", e.tok(where_clause)));
    }
    w.line(format!("{};", text));
    Ok(())
}

fn delete(e: &mut Emitter, w: &mut ScriptWriter, d: &DeleteStatement) -> Result<()> {
    let mut text = match (&d.alias, d.from.is_empty()) {
        (None, true) => format!("DELETE FROM {}", d.table.text),
        (Some(a), true) => format!("DELETE {} FROM {} {}", a.text, d.table.text, a.text),
        (alias, false) => {
            let handle = alias.as_ref().map(|a| a.text.clone()).unwrap_or_else(|| d.table.text.clone());
            format!("DELETE {} FROM {}", handle, e.from_items(&d.from))
        }
    };
    if let Some(where_clause) = &d.where_clause {
        text.push_str(&format!("\nWHERE {}", e.tok(where_clause)));
    }
    w.line(format!("{};", text));
    Ok(())
}

fn raise(e: &mut Emitter, w: &mut ScriptWriter, r: &RaiseErrorStatement) {
    let code = r.code.as_ref().map(error_code);
    if code.is_none() && r.message.is_none() {
        w.line("RESIGNAL;");
        return;
    }
    let (state, errno) = match &code {
        Some(ErrorCode::SqlState(s)) => (s.clone(), None),
        Some(ErrorCode::Number(n)) if (1..=65535).contains(n) => (DEFAULT_SQLSTATE.to_string(), Some(*n)),
        Some(ErrorCode::Name(n)) => match map_condition(DatabaseType::MySql, n) {
            Some(mapped) if mapped.to_ascii_uppercase().starts_with("SQLSTATE") => (
                mapped
                    .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c.is_whitespace())
                    .trim_matches('\'')
                    .to_string(),
                None,
            ),
            _ => (DEFAULT_SQLSTATE.to_string(), None),
        },
        _ => (DEFAULT_SQLSTATE.to_string(), None),
    };
    let message = match &r.message {
        Some(m) if is_simple_message(&e.tok(m)) => e.tok(m),
        Some(m) => {
            let var = e.synthesize("v_error_message", "VARCHAR(4000)", None);
            w.line(format!("SET {} = {};", var, e.tok(m)));
            var
        }
        None => string_literal(&default_message(code.as_ref())),
    };
    let errno = errno.map(|n| format!(", MYSQL_ERRNO = {}", n)).unwrap_or_default();
    w.line(format!(
        "SIGNAL SQLSTATE '{}' SET MESSAGE_TEXT = {}{};",
        state, message, errno
    ));
}

#[cfg(test)]
mod tests {
    use crate::adapter::{parse, ParseMode};
    use crate::dialect::DatabaseType;
    use crate::emitter::{render, EmitOptions};

    fn to_mysql(db: DatabaseType, source: &str, mode: ParseMode) -> String {
        let script = parse(db, source, mode).unwrap();
        render(DatabaseType::MySql, &script, &EmitOptions::default()).unwrap()
    }

    #[test]
    fn test_cursor_loop_uses_not_found_handler() {
        let out = to_mysql(
            DatabaseType::Oracle,
            "CREATE OR REPLACE PROCEDURE p AS CURSOR c IS SELECT id FROM t; v_id NUMBER; \
             BEGIN OPEN c; LOOP FETCH c INTO v_id; EXIT WHEN c%NOTFOUND; \
             INSERT INTO log (id) VALUES (v_id); END LOOP; CLOSE c; END;",
            ParseMode::Procedure,
        );
        let var = out.find("DECLARE v_id NUMBER;").unwrap();
        let flag = out.find("DECLARE v_not_found INT DEFAULT 0;").unwrap();
        let cursor = out.find("DECLARE c CURSOR FOR").unwrap();
        let handler = out.find("DECLARE CONTINUE HANDLER FOR NOT FOUND SET v_not_found = 1;").unwrap();
        assert!(var < cursor && flag < cursor && cursor < handler);
        assert!(out.contains("loop1: LOOP\n"));
        assert!(out.contains("IF v_not_found = 1 THEN\n            LEAVE loop1;\n        END IF;"));
        assert!(out.contains("END LOOP loop1;\n    SET v_not_found = 0;"));
    }

    #[test]
    fn test_procedure_return_value_and_signal() {
        let out = to_mysql(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p @qty INT AS BEGIN IF @qty < 0 \
             THROW 50001, 'negative quantity', 1; RETURN 1; END",
            ParseMode::Procedure,
        );
        assert!(out.starts_with("CREATE PROCEDURE p(IN qty INT)\nsp: BEGIN\n"));
        assert!(out.contains("SIGNAL SQLSTATE '45000' SET MESSAGE_TEXT = 'negative quantity', MYSQL_ERRNO = 50001;"));
        assert!(out.contains("    SELECT 1;\n    LEAVE sp;\n"));
    }

    #[test]
    fn test_update_join_form() {
        let out = to_mysql(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS BEGIN UPDATE i SET price = s.price FROM items i \
             JOIN staging s ON s.sku = i.sku; END",
            ParseMode::Procedure,
        );
        assert!(out.contains("UPDATE items i\n        INNER JOIN staging s ON s.sku = i.sku\n    SET i.price = s.price;"));
    }

    #[test]
    fn test_numeric_for_loop_is_desugared() {
        let out = to_mysql(
            DatabaseType::Oracle,
            "CREATE OR REPLACE PROCEDURE p AS BEGIN FOR i IN 1..3 LOOP \
             INSERT INTO t (n) VALUES (i); END LOOP; END;",
            ParseMode::Procedure,
        );
        assert!(out.contains("DECLARE i INT;"));
        assert!(out.contains("SET i = (1) - 1;\n    WHILE i < 3 DO\n        SET i = i + 1;"));
        assert!(out.contains("END WHILE;"));
    }
}
