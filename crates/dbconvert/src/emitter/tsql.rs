//! SQL Server T-SQL rendering.

use super::writer::{string_literal, ScriptWriter};
use super::{
    default_message, error_code, handlers_of, is_simple_message, Emitter, ErrorCode, Rendered,
};
use crate::error::Result;
use crate::model::*;

const NULL_STATEMENT: &str = "WAITFOR DELAY '00:00:00';";
/// Lowest user-defined error number `THROW` accepts.
const MIN_USER_ERROR: i64 = 50000;

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
    let body = body(e, &r.declarations, &r.statements)?;
    let mut w = ScriptWriter::new();
    match r.kind {
        RoutineKind::Procedure => {
            w.line(format!("CREATE OR ALTER PROCEDURE {}", r.name.qualified()));
            let params = parameters(e, &r.parameters);
            if !params.is_empty() {
                w.nested(|w| w.line(params.join(",\n")));
            }
        }
        RoutineKind::Function => {
            let returns = r
                .return_type
                .as_ref()
                .ok_or_else(|| e.unsupported("function without a return type"))?;
            w.line(format!(
                "CREATE OR ALTER FUNCTION {}({})",
                r.name.qualified(),
                parameters(e, &r.parameters).join(", ")
            ));
            w.line(format!("RETURNS {}", returns.text));
        }
    }
    w.line("AS");
    w.line("BEGIN");
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
    w.line(format!("CREATE OR ALTER VIEW {}{} AS", v.name.qualified(), columns));
    w.line(format!("{};", e.select(&v.query)?));
    Ok(w.finish())
}

fn trigger(e: &mut Emitter, t: &TriggerScript) -> Result<String> {
    if t.timing == TriggerTiming::Before {
        return Err(e.unsupported("BEFORE trigger"));
    }
    if t.condition.is_some() {
        return Err(e.unsupported("trigger WHEN clause"));
    }
    if references_row_values(t) {
        return Err(e.unsupported("NEW/OLD row references in a trigger"));
    }
    let body = body(e, &t.declarations, &t.statements)?;
    let events = t.events.iter().map(|ev| ev.keyword()).collect::<Vec<_>>().join(", ");
    let mut w = ScriptWriter::new();
    w.line(format!("CREATE OR ALTER TRIGGER {}", t.name.qualified()));
    w.line(format!("ON {}", t.table.text));
    w.line(format!("{} {}", t.timing.keyword(), events));
    w.line("AS");
    w.line("BEGIN");
    body.lines.iter().for_each(|l| w.line(l));
    w.line("END;");
    Ok(w.finish())
}

/// Whether a trigger body reads `NEW.col` or `OLD.col`; SQL Server triggers
/// only see the `inserted` and `deleted` tables.
fn references_row_values(t: &TriggerScript) -> bool {
    let mut script = Script::Trigger(t.clone());
    let mut found = false;
    script.visit_tokens_mut(&mut |token| {
        let mut check = |text: &str| {
            let head = text.split('.').next().unwrap_or_default();
            if text.contains('.') && (head.eq_ignore_ascii_case("NEW") || head.eq_ignore_ascii_case("OLD")) {
                found = true;
            }
        };
        check(&token.text);
        token.identifiers().for_each(|c| check(&c.text));
    });
    found
}

fn common(e: &mut Emitter, c: &CommonScript) -> Result<String> {
    let body = e.render_block(|e, w| {
        prologue(e, w, &c.declarations)?;
        block(e, w, &c.statements)
    })?;
    let mut w = ScriptWriter::new();
    declare_section(e, &mut w, &c.declarations, &body)?;
    body.lines.iter().for_each(|l| w.line(l));
    Ok(w.finish())
}

fn parameters(e: &Emitter, parameters: &[Parameter]) -> Vec<String> {
    parameters
        .iter()
        .map(|p| {
            let mut out = format!("{} {}", e.variable(&p.name.text), p.data_type.text);
            if let Some(d) = &p.default {
                out.push_str(&format!(" = {}", e.tok(d)));
            }
            if p.direction != ParameterDirection::In {
                out.push_str(" OUTPUT");
            }
            out
        })
        .collect()
}

// ===== Bodies =====

fn body(e: &mut Emitter, declarations: &[Statement], statements: &[Statement]) -> Result<Rendered> {
    let handlers = handlers_of(declarations);
    let mut rendered = e.render_block(|e, w| {
        w.indent();
        prologue(e, w, declarations)?;
        if handlers.is_empty() {
            block(e, w, statements)?;
        } else {
            try_catch(e, w, statements, &handlers)?;
        }
        w.dedent();
        Ok(())
    })?;
    let mut w = ScriptWriter::new();
    w.indent();
    declare_section(e, &mut w, declarations, &rendered)?;
    let mut lines = w.split_off(0);
    lines.append(&mut rendered.lines);
    rendered.lines = lines;
    Ok(rendered)
}

/// Table variables; declared in the body so their column defaults are rendered once.
fn prologue(e: &Emitter, w: &mut ScriptWriter, declarations: &[Statement]) -> Result<()> {
    for decl in declarations {
        if let Statement::Declare(Declaration::Table(t)) = decl {
            w.line(format!(
                "DECLARE {} TABLE (\n    {}\n);",
                e.table(&t.name.text),
                e.column_definitions(&t.columns)
            ));
        }
    }
    Ok(())
}

/// Variable and cursor declarations, written ahead of the body.
fn declare_section(e: &Emitter, w: &mut ScriptWriter, declarations: &[Statement], body: &Rendered) -> Result<()> {
    let mut variables: Vec<String> = Vec::new();
    for decl in declarations {
        if let Statement::Declare(Declaration::Variable(v)) = decl {
            let default = v
                .default
                .as_ref()
                .map(|d| format!(" = {}", e.tok(d)))
                .unwrap_or_default();
            variables.push(format!("{} {}{}", e.variable(&v.name.text), v.data_type.text, default));
        }
    }
    for v in &body.declarations {
        let default = v.default.as_ref().map(|d| format!(" = {}", d)).unwrap_or_default();
        variables.push(format!("{} {}{}", e.variable(&v.name), v.data_type, default));
    }
    if !variables.is_empty() {
        if e.options.hoist_declarations {
            w.line(format!("DECLARE {};", variables.join(",\n        ")));
        } else {
            variables.iter().for_each(|v| w.line(format!("DECLARE {};", v)));
        }
    }
    for decl in declarations {
        if let Statement::Declare(Declaration::Cursor(c)) = decl {
            let query = c
                .query
                .as_ref()
                .ok_or_else(|| e.unsupported("cursor variable without a query"))?;
            w.line(format!("DECLARE {} CURSOR LOCAL FOR", c.name.text));
            let text = e.select(query)?;
            w.nested(|w| w.line(format!("{};", text)));
        }
    }
    Ok(())
}

/// Routine-level handlers: the body runs in TRY, handlers are tested in
/// CATCH by error number. Errors no handler matches are rethrown.
fn try_catch(
    e: &mut Emitter,
    w: &mut ScriptWriter,
    statements: &[Statement],
    handlers: &[&ExceptionHandler],
) -> Result<()> {
    w.line("BEGIN TRY");
    nested_block(e, w, statements)?;
    w.line("END TRY");
    w.line("BEGIN CATCH");
    w.indent();
    let (mapped, dropped) = e.map_handlers(handlers);
    dropped.iter().for_each(|c| w.line(c));
    let (catch_all, tested): (Vec<_>, Vec<_>) = mapped.into_iter().partition(|h| h.handler.is_catch_all());
    for (i, h) in tested.iter().enumerate() {
        let keyword = if i == 0 { "IF" } else { "ELSE IF" };
        w.line(format!("{} {}", keyword, h.conditions.join(" OR ")));
        begin_end(e, w, &h.handler.statements)?;
    }
    let fallback = catch_all.first().map(|h| h.handler.statements.clone());
    match (tested.is_empty(), fallback) {
        (true, Some(statements)) => block(e, w, &statements)?,
        (true, None) => w.line("THROW;"),
        (false, Some(statements)) => {
            w.line("ELSE");
            begin_end(e, w, &statements)?;
        }
        (false, None) => {
            w.line("ELSE");
            w.nested(|w| w.line("THROW;"));
        }
    }
    w.dedent();
    w.line("END CATCH;");
    Ok(())
}

fn block(e: &mut Emitter, w: &mut ScriptWriter, statements: &[Statement]) -> Result<()> {
    let mark = w.len();
    let mut iter = statements.iter().peekable();
    while let Some(stmt) = iter.next() {
        // `CLOSE c; DEALLOCATE c;` stay together.
        if let Statement::CloseCursor(CloseCursorStatement { cursor, deallocate: false }) = stmt {
            w.line(format!("CLOSE {};", cursor.text));
            if let Some(Statement::CloseCursor(next)) = iter.peek() {
                if next.deallocate && next.cursor.text.eq_ignore_ascii_case(&cursor.text) {
                    w.line(format!("DEALLOCATE {};", cursor.text));
                    iter.next();
                }
            }
            continue;
        }
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

fn begin_end(e: &mut Emitter, w: &mut ScriptWriter, statements: &[Statement]) -> Result<()> {
    w.line("BEGIN");
    nested_block(e, w, statements)?;
    w.line("END");
    Ok(())
}

fn statement(e: &mut Emitter, w: &mut ScriptWriter, stmt: &Statement) -> Result<()> {
    match stmt {
        Statement::Select(s) => {
            if s.into.is_none() && e.is_function() {
                return Err(e.unsupported("result set returned from a function"));
            }
            w.line(format!("{};", e.select(s)?));
        }
        Statement::Insert(s) => {
            for text in e.insert(s, true)? {
                w.line(format!("{};", text));
            }
        }
        Statement::Update(u) => update(e, w, u)?,
        Statement::Delete(d) => delete(e, w, d)?,
        Statement::Set(s) => match &s.value {
            SetValue::Expression(v) => w.line(format!("SET {} = {};", e.tok(&s.key), e.tok(v))),
            SetValue::Query(q) => {
                w.line(format!("SET {} = CURSOR FOR", e.variable(&s.key.text)));
                let text = e.select(q)?;
                w.nested(|w| w.line(format!("{};", text)));
            }
        },
        Statement::If(s) => {
            for (i, item) in s.items.iter().enumerate() {
                let keyword = if i == 0 { "IF" } else { "ELSE IF" };
                w.line(format!("{} {}", keyword, e.tok(&item.condition)));
                begin_end(e, w, &item.statements)?;
            }
            if let Some(els) = &s.else_statements {
                w.line("ELSE");
                begin_end(e, w, els)?;
            }
        }
        Statement::Case(s) => {
            // No CASE statement in T-SQL: an IF chain with the same branches.
            let items = s
                .items
                .iter()
                .map(|item| IfItem {
                    condition: match &s.selector {
                        Some(sel) => Token::condition(format!("{} = {}", e.tok(sel), e.tok(&item.when))),
                        None => Token::condition(e.tok(&item.when)),
                    },
                    statements: item.statements.clone(),
                })
                .collect();
            let chain = Statement::If(IfStatement {
                items,
                else_statements: s.else_statements.clone(),
            });
            statement(e, w, &chain)?;
        }
        Statement::Loop(l) => match &l.kind {
            LoopKind::Basic => loop_body(e, w, l.label.clone(), "WHILE 1 = 1", &l.statements, None)?,
            LoopKind::For {
                iterator,
                range: ForRange::Numeric { lower, upper, reverse },
            } => {
                // Step before the body so CONTINUE cannot skip the increment.
                let var = e.synthesize(&iterator.text, "INT", None);
                let (start, test, step) = if *reverse {
                    (
                        format!("SET {} = ({}) + 1;", var, e.tok(upper)),
                        format!("WHILE {} > {}", var, e.tok(lower)),
                        format!("SET {} = {} - 1;", var, var),
                    )
                } else {
                    (
                        format!("SET {} = ({}) - 1;", var, e.tok(lower)),
                        format!("WHILE {} < {}", var, e.tok(upper)),
                        format!("SET {} = {} + 1;", var, var),
                    )
                };
                w.line(start);
                loop_body(e, w, l.label.clone(), &test, &l.statements, Some(&step))?;
            }
            LoopKind::For { .. } => return Err(e.unsupported("cursor FOR loop")),
        },
        Statement::While(l) => {
            let head = format!("WHILE {}", e.tok(&l.condition));
            loop_body(e, w, l.label.clone(), &head, &l.statements, None)?;
        }
        Statement::LoopExit(x) => {
            innermost(e, x.label.as_deref())?;
            match (&x.cursor, &x.condition) {
                (Some(_), _) => w.line("IF @@FETCH_STATUS <> 0 BREAK;"),
                (None, Some(cond)) => w.line(format!("IF {} BREAK;", e.tok(cond))),
                (None, None) => w.line("BREAK;"),
            }
        }
        Statement::Continue(c) => {
            innermost(e, c.label.as_deref())?;
            match &c.condition {
                Some(cond) => w.line(format!("IF {} CONTINUE;", e.tok(cond))),
                None => w.line("CONTINUE;"),
            }
        }
        Statement::Declare(_) | Statement::Exception(_) => {
            return Err(e.unsupported(format!("{} inside a statement block", stmt.kind_name())))
        }
        Statement::TryCatch(tc) => {
            let handlers: Vec<&ExceptionHandler> = tc.handlers.iter().collect();
            try_catch(e, w, &tc.try_statements, &handlers)?;
        }
        Statement::OpenCursor(o) => {
            if o.query.is_some() {
                return Err(e.unsupported("OPEN ... FOR on a cursor declared with a query"));
            }
            w.line(format!("OPEN {};", o.cursor.text));
        }
        Statement::FetchCursor(f) => {
            w.line(format!("FETCH NEXT FROM {} INTO {};", f.cursor.text, e.toks(&f.variables)));
        }
        Statement::CloseCursor(c) => {
            if c.deallocate {
                w.line(format!("DEALLOCATE {};", c.cursor.text));
            } else {
                w.line(format!("CLOSE {};", c.cursor.text));
            }
        }
        Statement::Return(r) => match &r.value {
            Some(v) => w.line(format!("RETURN {};", e.tok(v))),
            None => w.line("RETURN;"),
        },
        Statement::Leave => w.line("RETURN;"),
        Statement::Print(p) => w.line(format!("PRINT {};", e.tok(&p.content))),
        Statement::RaiseError(r) => raise(e, w, r),
        Statement::Call(c) => match c.kind {
            CallKind::Procedure | CallKind::Function if c.arguments.is_empty() => {
                w.line(format!("EXEC {};", c.name.text))
            }
            CallKind::Procedure | CallKind::Function => {
                w.line(format!("EXEC {} {};", c.name.text, e.toks(&c.arguments)))
            }
            CallKind::Dynamic if c.arguments.is_empty() => w.line(format!("EXEC({});", e.tok(&c.name))),
            CallKind::Dynamic => return Err(e.unsupported("dynamic SQL with bind arguments")),
        },
        Statement::Goto(g) => w.line(format!("GOTO {};", g.label)),
        Statement::Label(l) => w.line(format!("{}:", l.name)),
        Statement::Transaction(t) => match t.kind {
            TransactionKind::Begin => w.line("BEGIN TRANSACTION;"),
            TransactionKind::Commit => w.line("COMMIT TRANSACTION;"),
            TransactionKind::Rollback => w.line("ROLLBACK TRANSACTION;"),
        },
        Statement::CreateTable(c) => match &c.as_select {
            Some(q) => {
                let mut query = (**q).clone();
                query.into = Some(SelectInto::Table {
                    name: c.name.clone(),
                    temporary: c.temporary,
                });
                w.line(format!("{};", e.select(&query)?));
            }
            None => w.line(format!(
                "CREATE TABLE {} (\n    {}\n);",
                e.table(&c.name.text),
                e.column_definitions(&c.columns)
            )),
        },
        Statement::Truncate(t) => w.line(format!("TRUNCATE TABLE {};", e.table(&t.table.text))),
        Statement::Drop(d) => {
            let name = match d.object_type {
                DropObjectType::Table => e.table(&d.name.text),
                _ => d.name.text.clone(),
            };
            w.line(format!(
                "DROP {}{} {};",
                d.object_type.keyword(),
                if d.if_exists { " IF EXISTS" } else { "" },
                name
            ));
        }
        Statement::Prepared(_) => return Err(e.unsupported("prepared statement")),
        Statement::Null => w.line(NULL_STATEMENT),
    }
    Ok(())
}

fn loop_body(
    e: &mut Emitter,
    w: &mut ScriptWriter,
    source_label: Option<String>,
    head: &str,
    statements: &[Statement],
    step: Option<&str>,
) -> Result<()> {
    w.line(head);
    w.line("BEGIN");
    e.push_loop(source_label, None);
    w.indent();
    if let Some(step) = step {
        w.line(step);
    }
    let result = block(e, w, statements);
    w.dedent();
    e.pop_loop();
    result?;
    w.line("END");
    Ok(())
}

/// T-SQL can only leave or continue the innermost loop.
fn innermost(e: &Emitter, label: Option<&str>) -> Result<()> {
    e.loop_label(label)?;
    if e.targets_innermost(label) {
        Ok(())
    } else {
        Err(e.unsupported("exit from an outer loop"))
    }
}

fn update(e: &mut Emitter, w: &mut ScriptWriter, u: &UpdateStatement) -> Result<()> {
    let mut text = if u.from.is_empty() && u.alias.is_none() {
        format!("UPDATE {}\nSET {}", e.table(&u.table.text), e.set_items(&u.set_items))
    } else {
        let handle = u.alias.as_ref().map(|a| a.text.clone()).unwrap_or_else(|| e.table(&u.table.text));
        let from = if u.from.is_empty() {
            e.source(&u.table, u.alias.as_ref())
        } else {
            e.from_items(&u.from)
        };
        format!("UPDATE {}\nSET {}\nFROM {}", handle, e.set_items(&u.set_items), from)
    };
    if let Some(where_clause) = &u.where_clause {
        text.push_str(&format!("\nWHERE {}", e.tok(where_clause)));
    }
    w.line(format!("{};", text));
    Ok(())
}

fn delete(e: &mut Emitter, w: &mut ScriptWriter, d: &DeleteStatement) -> Result<()> {
    let mut text = if d.from.is_empty() && d.alias.is_none() {
        format!("DELETE FROM {}", e.table(&d.table.text))
    } else {
        let handle = d.alias.as_ref().map(|a| a.text.clone()).unwrap_or_else(|| e.table(&d.table.text));
        let from = if d.from.is_empty() {
            e.source(&d.table, d.alias.as_ref())
        } else {
            e.from_items(&d.from)
        };
        format!("DELETE {}\nFROM {}", handle, from)
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
        w.line("THROW;");
        return;
    }
    let number = match &code {
        Some(ErrorCode::Number(n)) if *n >= MIN_USER_ERROR && *n <= i64::from(i32::MAX) => *n,
        _ => MIN_USER_ERROR,
    };
    let message = match &r.message {
        Some(m) if is_simple_message(&e.tok(m)) => e.tok(m),
        Some(m) => {
            let var = e.synthesize("error_message", "NVARCHAR(4000)", None);
            w.line(format!("SET {} = {};", var, e.tok(m)));
            var
        }
        None => string_literal(&default_message(code.as_ref())),
    };
    w.line(format!("THROW {}, {}, 1;", number, message));
}

#[cfg(test)]
mod tests {
    use crate::adapter::{parse, ParseMode};
    use crate::dialect::DatabaseType;
    use crate::emitter::{render, EmitOptions};

    fn to_tsql(db: DatabaseType, source: &str, options: &EmitOptions) -> String {
        let script = parse(db, source, ParseMode::Procedure).unwrap();
        render(DatabaseType::SqlServer, &script, options).unwrap()
    }

    const CURSOR_PROC: &str = "CREATE OR REPLACE PROCEDURE archive_orders AS \
        CURSOR c IS SELECT id FROM orders; v_id NUMBER; v_count NUMBER := 0; \
        BEGIN OPEN c; LOOP FETCH c INTO v_id; EXIT WHEN c%NOTFOUND; \
        v_count := v_count + 1; END LOOP; CLOSE c; END;";

    #[test]
    fn test_cursor_loop_and_hoisted_declarations() {
        let out = to_tsql(DatabaseType::Oracle, CURSOR_PROC, &EmitOptions::default());
        assert!(out.starts_with("CREATE OR ALTER PROCEDURE archive_orders\nAS\nBEGIN\n"));
        assert!(out.contains("    DECLARE @v_id NUMBER,\n            @v_count NUMBER = 0;\n"));
        assert!(out.contains("    DECLARE c CURSOR LOCAL FOR\n"));
        assert!(out.contains("    WHILE 1 = 1\n    BEGIN\n        FETCH NEXT FROM c INTO @v_id;\n        IF @@FETCH_STATUS <> 0 BREAK;\n"));
        assert!(out.contains("        SET @v_count = @v_count + 1;\n"));
    }

    #[test]
    fn test_declarations_one_per_statement_without_hoisting() {
        let options = EmitOptions {
            hoist_declarations: false,
        };
        let out = to_tsql(DatabaseType::Oracle, CURSOR_PROC, &options);
        assert!(out.contains("    DECLARE @v_id NUMBER;\n    DECLARE @v_count NUMBER = 0;\n"));
    }

    #[test]
    fn test_exception_handlers_become_try_catch() {
        let out = to_tsql(
            DatabaseType::Oracle,
            "CREATE OR REPLACE PROCEDURE p AS BEGIN INSERT INTO t (id) VALUES (1); \
             EXCEPTION WHEN DUP_VAL_ON_INDEX THEN NULL; WHEN OTHERS THEN RAISE; END;",
            &EmitOptions::default(),
        );
        assert!(out.contains("BEGIN TRY\n        INSERT INTO t (id)\n        VALUES (1);\n    END TRY\n    BEGIN CATCH\n"));
        assert!(out.contains("IF ERROR_NUMBER() IN (2601, 2627)\n        BEGIN\n"));
        assert!(out.contains("        ELSE\n        BEGIN\n            THROW;\n        END\n    END CATCH;"));
    }

    #[test]
    fn test_labelled_exit_of_outer_loop_is_unsupported() {
        let script = parse(
            DatabaseType::Oracle,
            "CREATE OR REPLACE PROCEDURE p AS BEGIN <<outer_loop>> LOOP LOOP \
             EXIT outer_loop; END LOOP; END LOOP; END;",
            ParseMode::Procedure,
        )
        .unwrap();
        let err = render(DatabaseType::SqlServer, &script, &EmitOptions::default()).unwrap_err();
        assert!(err.to_string().contains("exit from an outer loop"));
    }
}
