//! Oracle PL/SQL rendering.

use super::writer::{string_literal, ScriptWriter};
use super::{
    default_message, error_code, handlers_of, map_condition, strip_size, Emitter, ErrorCode,
    Rendered,
};
use crate::dialect::DatabaseType;
use crate::error::Result;
use crate::model::*;

const NULL_STATEMENT: &str = "NULL;";

/// Exceptions Oracle declares in STANDARD.
const PREDEFINED_EXCEPTIONS: &[&str] = &[
    "ACCESS_INTO_NULL",
    "CASE_NOT_FOUND",
    "COLLECTION_IS_NULL",
    "CURSOR_ALREADY_OPEN",
    "DUP_VAL_ON_INDEX",
    "INVALID_CURSOR",
    "INVALID_NUMBER",
    "LOGIN_DENIED",
    "NO_DATA_FOUND",
    "NOT_LOGGED_ON",
    "OTHERS",
    "PROGRAM_ERROR",
    "ROWTYPE_MISMATCH",
    "SELF_IS_NULL",
    "STORAGE_ERROR",
    "SUBSCRIPT_BEYOND_COUNT",
    "SUBSCRIPT_OUTSIDE_LIMIT",
    "SYS_INVALID_ROWID",
    "TIMEOUT_ON_RESOURCE",
    "TOO_MANY_ROWS",
    "VALUE_ERROR",
    "ZERO_DIVIDE",
];

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
    let (kind, returns) = match (r.kind, &r.return_type) {
        (RoutineKind::Procedure, _) => ("PROCEDURE", String::new()),
        (RoutineKind::Function, Some(t)) => ("FUNCTION", format!(" RETURN {}", strip_size(&t.text))),
        (RoutineKind::Function, None) => return Err(e.unsupported("function without a return type")),
    };
    let body = body(e, &r.declarations, &r.statements)?;

    let mut w = ScriptWriter::new();
    w.line(format!(
        "CREATE OR REPLACE {} {}{}{} AS",
        kind,
        r.name.qualified(),
        parameters(&r.parameters),
        returns
    ));
    declarations(e, &mut w, &r.declarations, &r.statements, &body)?;
    w.line("BEGIN");
    body.lines.iter().for_each(|l| w.line(l));
    w.line(format!("END {};", r.name.name));
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

fn trigger(e: &mut Emitter, t: &TriggerScript) -> Result<String> {
    let body = body(e, &t.declarations, &t.statements)?;
    let events = t.events.iter().map(|ev| ev.keyword()).collect::<Vec<_>>().join(" OR ");

    let mut w = ScriptWriter::new();
    w.line(format!("CREATE OR REPLACE TRIGGER {}", t.name.qualified()));
    w.line(format!("{} {} ON {}", t.timing.keyword(), events, t.table.text));
    if t.for_each_row {
        w.line("FOR EACH ROW");
    }
    if let Some(condition) = &t.condition {
        // Row references in WHEN are written without the bind colon.
        w.line(format!("WHEN ({})", strip_parens(&condition.text)));
    }
    if has_declarations(&t.declarations, &t.statements, &body) {
        w.line("DECLARE");
        declarations(e, &mut w, &t.declarations, &t.statements, &body)?;
    }
    w.line("BEGIN");
    body.lines.iter().for_each(|l| w.line(l));
    w.line("END;");
    Ok(w.finish())
}

fn common(e: &mut Emitter, c: &CommonScript) -> Result<String> {
    let body = body(e, &c.declarations, &c.statements)?;
    let mut w = ScriptWriter::new();
    if has_declarations(&c.declarations, &c.statements, &body) {
        w.line("DECLARE");
        declarations(e, &mut w, &c.declarations, &c.statements, &body)?;
    }
    w.line("BEGIN");
    body.lines.iter().for_each(|l| w.line(l));
    w.line("END;");
    Ok(w.finish())
}

fn parameters(parameters: &[Parameter]) -> String {
    if parameters.is_empty() {
        return String::new();
    }
    let list = parameters
        .iter()
        .map(|p| {
            let direction = match p.direction {
                ParameterDirection::In => "IN",
                ParameterDirection::Out => "OUT",
                ParameterDirection::InOut => "IN OUT",
            };
            let mut out = format!("{} {} {}", p.name.text, direction, strip_size(&p.data_type.text));
            if let Some(d) = &p.default {
                out.push_str(&format!(" DEFAULT {}", d.text));
            }
            out
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(" ({})", list)
}

// ===== Declarations =====

fn has_declarations(declarations: &[Statement], statements: &[Statement], body: &Rendered) -> bool {
    !body.declarations.is_empty()
        || declarations
            .iter()
            .any(|d| matches!(d, Statement::Declare(Declaration::Variable(_) | Declaration::Cursor(_))))
        || !user_exceptions(declarations, statements).is_empty()
}

fn declarations(
    e: &Emitter,
    w: &mut ScriptWriter,
    declarations: &[Statement],
    statements: &[Statement],
    body: &Rendered,
) -> Result<()> {
    w.indent();
    for name in user_exceptions(declarations, statements) {
        w.line(format!("{} EXCEPTION;", name));
    }
    for decl in declarations {
        match decl {
            Statement::Declare(Declaration::Variable(v)) => {
                let constant = if v.constant { "CONSTANT " } else { "" };
                let default = v
                    .default
                    .as_ref()
                    .map(|d| format!(" := {}", e.tok(d)))
                    .unwrap_or_default();
                w.line(format!("{} {}{}{};", v.name.text, constant, v.data_type.text, default));
            }
            Statement::Declare(Declaration::Cursor(c)) => match &c.query {
                Some(query) => {
                    w.line(format!("CURSOR {} IS", c.name.text));
                    let text = e.select(query)?;
                    w.nested(|w| w.line(format!("{};", text)));
                }
                None => w.line(format!("{} SYS_REFCURSOR;", c.name.text)),
            },
            _ => {}
        }
    }
    for v in &body.declarations {
        let default = v.default.as_ref().map(|d| format!(" := {}", d)).unwrap_or_default();
        w.line(format!("{} {}{};", v.name, v.data_type, default));
    }
    w.dedent();
    Ok(())
}

/// Exceptions the script raises or handles that Oracle does not predefine.
fn user_exceptions(declarations: &[Statement], statements: &[Statement]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut add = |name: &str| {
        let Some(mapped) = map_condition(DatabaseType::Oracle, name) else {
            return;
        };
        let plain = mapped.chars().all(|c| c.is_alphanumeric() || c == '_');
        let predefined = PREDEFINED_EXCEPTIONS.iter().any(|p| p.eq_ignore_ascii_case(&mapped));
        if plain && !predefined && !names.iter().any(|n| n.eq_ignore_ascii_case(&mapped)) {
            names.push(mapped);
        }
    };
    let mut visit = |stmt: &Statement| match stmt {
        Statement::Exception(ex) => ex.handlers.iter().flat_map(|h| &h.conditions).for_each(|c| add(c)),
        Statement::TryCatch(tc) => tc.handlers.iter().flat_map(|h| &h.conditions).for_each(|c| add(c)),
        Statement::RaiseError(RaiseErrorStatement {
            code: Some(code),
            message: None,
        }) => {
            if let ErrorCode::Name(n) = error_code(code) {
                add(&n);
            }
        }
        _ => {}
    };
    walk(declarations, &mut visit);
    walk(statements, &mut visit);
    names
}

// ===== Bodies =====

fn body(e: &mut Emitter, declarations: &[Statement], statements: &[Statement]) -> Result<Rendered> {
    let handlers = handlers_of(declarations);
    e.render_block(|e, w| {
        w.indent();
        for decl in declarations {
            if let Statement::Declare(Declaration::Table(t)) = decl {
                let ddl = format!(
                    "CREATE GLOBAL TEMPORARY TABLE {} ({}) ON COMMIT PRESERVE ROWS",
                    t.name.text,
                    e.column_definitions(&t.columns)
                );
                w.line(execute_immediate(&ddl));
            }
        }
        block(e, w, statements)?;
        w.dedent();
        exception_section(e, w, &handlers)
    })
}

fn exception_section(e: &mut Emitter, w: &mut ScriptWriter, handlers: &[&ExceptionHandler]) -> Result<()> {
    if handlers.is_empty() {
        return Ok(());
    }
    let (mapped, dropped) = e.map_handlers(handlers);
    w.nested(|w| dropped.iter().for_each(|c| w.line(c)));
    if mapped.is_empty() {
        return Ok(());
    }
    w.line("EXCEPTION");
    w.indent();
    for h in mapped {
        w.line(format!("WHEN {} THEN", h.conditions.join(" OR ")));
        nested_block(e, w, &h.handler.statements)?;
    }
    w.dedent();
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
            for text in e.insert(s, false)? {
                w.line(format!("{};", text));
            }
        }
        Statement::Update(s) => update(e, w, s)?,
        Statement::Delete(s) => delete(e, w, s)?,
        Statement::Set(s) => match &s.value {
            SetValue::Expression(v) => w.line(format!("{} := {};", e.tok(&s.key), e.tok(v))),
            SetValue::Query(_) => return Err(e.unsupported("assignment of a query to a cursor variable")),
        },
        Statement::If(s) => {
            for (i, item) in s.items.iter().enumerate() {
                let keyword = if i == 0 { "IF" } else { "ELSIF" };
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
            // A CASE statement without a matching branch raises CASE_NOT_FOUND.
            w.line("ELSE");
            nested_block(e, w, s.else_statements.as_deref().unwrap_or(&[]))?;
            w.dedent();
            w.line("END CASE;");
        }
        Statement::Loop(l) => {
            let head = match &l.kind {
                LoopKind::Basic => "LOOP".to_string(),
                LoopKind::For {
                    iterator,
                    range: ForRange::Numeric { lower, upper, reverse },
                } => format!(
                    "FOR {} IN {}{}..{} LOOP",
                    iterator.text,
                    if *reverse { "REVERSE " } else { "" },
                    e.tok(lower),
                    e.tok(upper)
                ),
                LoopKind::For {
                    iterator,
                    range: ForRange::Query(q),
                } => format!("FOR {} IN (\n{}\n) LOOP", iterator.text, e.select(q)?),
                LoopKind::For {
                    iterator,
                    range: ForRange::Cursor(c),
                } => format!("FOR {} IN {} LOOP", iterator.text, c.text),
            };
            loop_body(e, w, l.label.as_ref(), &head, &l.statements)?;
        }
        Statement::While(l) => {
            let head = format!("WHILE {} LOOP", e.tok(&l.condition));
            loop_body(e, w, l.label.as_ref(), &head, &l.statements)?;
        }
        Statement::LoopExit(x) => {
            let label = label_suffix(e.loop_label(x.label.as_deref())?);
            let when = match (&x.cursor, &x.condition) {
                (Some(c), _) => format!(" WHEN {}%NOTFOUND", c.text),
                (None, Some(cond)) => format!(" WHEN {}", e.tok(cond)),
                (None, None) => String::new(),
            };
            w.line(format!("EXIT{}{};", label, when));
        }
        Statement::Continue(c) => {
            let label = label_suffix(e.loop_label(c.label.as_deref())?);
            let when = c
                .condition
                .as_ref()
                .map(|cond| format!(" WHEN {}", e.tok(cond)))
                .unwrap_or_default();
            w.line(format!("CONTINUE{}{};", label, when));
        }
        Statement::Declare(_) | Statement::Exception(_) => {
            return Err(e.unsupported(format!("{} inside a statement block", stmt.kind_name())))
        }
        Statement::TryCatch(tc) => {
            w.line("BEGIN");
            nested_block(e, w, &tc.try_statements)?;
            let handlers: Vec<&ExceptionHandler> = tc.handlers.iter().collect();
            exception_section(e, w, &handlers)?;
            w.line("END;");
        }
        Statement::OpenCursor(o) => match &o.query {
            Some(q) => {
                w.line(format!("OPEN {} FOR", o.cursor.text));
                let text = e.select(q)?;
                w.nested(|w| w.line(format!("{};", text)));
            }
            None => w.line(format!("OPEN {};", o.cursor.text)),
        },
        Statement::FetchCursor(f) => {
            w.line(format!("FETCH {} INTO {};", f.cursor.text, e.toks(&f.variables)));
        }
        Statement::CloseCursor(c) => {
            if !c.deallocate {
                w.line(format!("CLOSE {};", c.cursor.text));
            }
        }
        Statement::Return(r) => match (&r.value, e.is_function()) {
            (Some(v), true) => w.line(format!("RETURN {};", e.tok(v))),
            _ => w.line("RETURN;"),
        },
        Statement::Leave => w.line("RETURN;"),
        Statement::Print(p) => w.line(format!("DBMS_OUTPUT.PUT_LINE({});", e.tok(&p.content))),
        Statement::RaiseError(r) => raise(e, w, r),
        Statement::Call(c) => match c.kind {
            CallKind::Procedure if c.arguments.is_empty() => w.line(format!("{};", c.name.text)),
            CallKind::Procedure => w.line(format!("{}({});", c.name.text, e.toks(&c.arguments))),
            CallKind::Function => return Err(e.unsupported("function call whose result is discarded")),
            CallKind::Dynamic if c.arguments.is_empty() => {
                w.line(format!("EXECUTE IMMEDIATE {};", e.tok(&c.name)))
            }
            CallKind::Dynamic => w.line(format!(
                "EXECUTE IMMEDIATE {} USING {};",
                e.tok(&c.name),
                e.toks(&c.arguments)
            )),
        },
        Statement::Goto(g) => w.line(format!("GOTO {};", g.label)),
        Statement::Label(l) => {
            w.line(format!("<<{}>>", l.name));
            w.line(NULL_STATEMENT);
        }
        Statement::Transaction(t) => match t.kind {
            TransactionKind::Begin => {}
            TransactionKind::Commit => w.line("COMMIT;"),
            TransactionKind::Rollback => w.line("ROLLBACK;"),
        },
        Statement::CreateTable(c) => {
            let ddl = match &c.as_select {
                Some(q) => create_table_as(&c.name.text, c.temporary, &e.select(q)?),
                None if c.temporary => format!(
                    "CREATE GLOBAL TEMPORARY TABLE {} ({}) ON COMMIT PRESERVE ROWS",
                    c.name.text,
                    e.column_definitions(&c.columns)
                ),
                None => format!("CREATE TABLE {} ({})", c.name.text, e.column_definitions(&c.columns)),
            };
            w.line(execute_immediate(&ddl));
        }
        Statement::Truncate(t) => w.line(execute_immediate(&format!("TRUNCATE TABLE {}", t.table.text))),
        Statement::Drop(d) => {
            let ddl = execute_immediate(&format!("DROP {} {}", d.object_type.keyword(), d.name.text));
            if d.if_exists {
                w.line("BEGIN");
                w.nested(|w| w.line(&ddl));
                w.line("EXCEPTION");
                w.nested(|w| w.line("WHEN OTHERS THEN NULL;"));
                w.line("END;");
            } else {
                w.line(ddl);
            }
        }
        Statement::Prepared(_) => return Err(e.unsupported("prepared statement")),
        Statement::Null => w.line(NULL_STATEMENT),
    }
    Ok(())
}

fn loop_body(
    e: &mut Emitter,
    w: &mut ScriptWriter,
    label: Option<&String>,
    head: &str,
    statements: &[Statement],
) -> Result<()> {
    if let Some(label) = label {
        w.line(format!("<<{}>>", label));
    }
    w.line(head);
    e.push_loop(label.cloned(), label.cloned());
    let result = nested_block(e, w, statements);
    e.pop_loop();
    result?;
    w.line(format!("END LOOP{};", label_suffix(label.cloned())));
    Ok(())
}

fn label_suffix(label: Option<String>) -> String {
    label.map(|l| format!(" {}", l)).unwrap_or_default()
}

fn select(e: &mut Emitter, w: &mut ScriptWriter, s: &SelectStatement) -> Result<()> {
    match &s.into {
        Some(SelectInto::Variables(_)) => w.line(format!("{};", e.select(s)?)),
        Some(SelectInto::Table { name, temporary }) => {
            let mut query = s.clone();
            query.into = None;
            let ddl = create_table_as(&name.text, *temporary, &e.select(&query)?);
            w.line(execute_immediate(&ddl));
        }
        None => {
            let text = e.select(s)?;
            let cursor = e.result_sets.fresh();
            e.synthesize(&cursor, "SYS_REFCURSOR", None);
            w.line(format!("OPEN {} FOR", cursor));
            w.nested(|w| w.line(format!("{};", text)));
            w.line(format!("DBMS_SQL.RETURN_RESULT({});", cursor));
        }
    }
    Ok(())
}

fn update(e: &mut Emitter, w: &mut ScriptWriter, u: &UpdateStatement) -> Result<()> {
    let target = e.source(&u.table, u.alias.as_ref());
    let correlation = e.correlate(&u.table, u.alias.as_ref(), &u.from, u.where_clause.as_ref())?;
    let filter = correlation.condition();
    if correlation.sources.is_empty() {
        let mut text = format!("UPDATE {}\nSET {}", target, e.set_items(&u.set_items));
        if let Some(f) = filter {
            text.push_str(&format!("\nWHERE {}", f));
        }
        w.line(format!("{};", text));
        return Ok(());
    }
    let from = correlation.sources.join(", ");
    let filter = filter.map(|f| format!(" WHERE {}", f)).unwrap_or_default();
    let sets = u
        .set_items
        .iter()
        .map(|item| {
            format!(
                "{} = (SELECT {} FROM {}{})",
                e.tok(&item.column),
                e.tok(&item.value),
                from,
                filter
            )
        })
        .collect::<Vec<_>>()
        .join(",\n    ");
    w.line(format!(
        "UPDATE {}\nSET {}\nWHERE EXISTS (SELECT 1 FROM {}{});",
        target, sets, from, filter
    ));
    Ok(())
}

fn delete(e: &mut Emitter, w: &mut ScriptWriter, d: &DeleteStatement) -> Result<()> {
    let target = e.source(&d.table, d.alias.as_ref());
    let correlation = e.correlate(&d.table, d.alias.as_ref(), &d.from, d.where_clause.as_ref())?;
    let filter = correlation.condition();
    let text = if correlation.sources.is_empty() {
        match filter {
            Some(f) => format!("DELETE FROM {}\nWHERE {};", target, f),
            None => format!("DELETE FROM {};", target),
        }
    } else {
        format!(
            "DELETE FROM {}\nWHERE EXISTS (SELECT 1 FROM {}{});",
            target,
            correlation.sources.join(", "),
            filter.map(|f| format!(" WHERE {}", f)).unwrap_or_default()
        )
    };
    w.line(text);
    Ok(())
}

fn raise(e: &mut Emitter, w: &mut ScriptWriter, r: &RaiseErrorStatement) {
    let code = r.code.as_ref().map(error_code);
    match (code, &r.message) {
        (None, None) => w.line("RAISE;"),
        (Some(ErrorCode::Name(name)), None) => {
            let name = map_condition(DatabaseType::Oracle, &name).unwrap_or(name);
            w.line(format!("RAISE {};", name));
        }
        (code, message) => {
            let number = match code {
                Some(ErrorCode::Number(n)) if (-20999..=-20000).contains(&n) => n,
                _ => -20000,
            };
            let message = match message {
                Some(m) => e.tok(m),
                None => string_literal(&default_message(code.as_ref())),
            };
            w.line(format!("RAISE_APPLICATION_ERROR({}, {});", number, message));
        }
    }
}

fn create_table_as(name: &str, temporary: bool, query: &str) -> String {
    if temporary {
        format!("CREATE GLOBAL TEMPORARY TABLE {} ON COMMIT PRESERVE ROWS AS {}", name, query)
    } else {
        format!("CREATE TABLE {} AS {}", name, query)
    }
}

/// DDL inside PL/SQL goes through dynamic SQL.
fn execute_immediate(ddl: &str) -> String {
    let flat = ddl.lines().map(str::trim).collect::<Vec<_>>().join(" ");
    format!("EXECUTE IMMEDIATE {};", string_literal(&flat))
}

fn strip_parens(text: &str) -> &str {
    let t = text.trim();
    if t.starts_with('(') && t.ends_with(')') {
        t[1..t.len() - 1].trim()
    } else {
        t
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::{parse, ParseMode};
    use crate::dialect::DatabaseType;
    use crate::emitter::{render, EmitOptions};

    fn to_oracle(db: DatabaseType, source: &str, mode: ParseMode) -> String {
        let script = parse(db, source, mode).unwrap();
        render(DatabaseType::Oracle, &script, &EmitOptions::default()).unwrap()
    }

    #[test]
    fn test_procedure_with_result_set_and_handler() {
        let out = to_oracle(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE dbo.list_orders @customer_id INT AS BEGIN \
             SELECT id, total FROM orders WHERE customer_id = @customer_id; END",
            ParseMode::Procedure,
        );
        assert!(out.starts_with("CREATE OR REPLACE PROCEDURE dbo.list_orders (customer_id IN INT) AS\n"));
        assert!(out.contains("    v_result1 SYS_REFCURSOR;\n"));
        assert!(out.contains("    OPEN v_result1 FOR\n"));
        assert!(out.contains("    DBMS_SQL.RETURN_RESULT(v_result1);\n"));
        assert!(out.ends_with("END list_orders;\n"));
    }

    #[test]
    fn test_update_from_becomes_correlated_subquery() {
        let out = to_oracle(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS BEGIN UPDATE o SET total = c.credit FROM orders o \
             JOIN customers c ON c.id = o.customer_id WHERE c.active = 1; END",
            ParseMode::Procedure,
        );
        assert!(out.contains(
            "UPDATE orders o\n    SET total = (SELECT c.credit FROM customers c WHERE c.id = o.customer_id AND c.active = 1)"
        ));
        assert!(out.contains("WHERE EXISTS (SELECT 1 FROM customers c WHERE c.id = o.customer_id AND c.active = 1);"));
    }

    #[test]
    fn test_raise_and_drop_if_exists() {
        let out = to_oracle(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS BEGIN DROP TABLE IF EXISTS work; \
             THROW 50001, 'bad input', 1; END",
            ParseMode::Procedure,
        );
        assert!(out.contains("EXECUTE IMMEDIATE 'DROP TABLE work';"));
        assert!(out.contains("WHEN OTHERS THEN NULL;"));
        assert!(out.contains("RAISE_APPLICATION_ERROR(-20000, 'bad input');"));
    }
}
