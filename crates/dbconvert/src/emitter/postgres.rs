//! PostgreSQL PL/pgSQL rendering.

use super::writer::{string_literal, ScriptWriter};
use super::{default_message, error_code, handlers_of, map_condition, unqualified, Emitter, ErrorCode, Rendered};
use crate::dialect::DatabaseType;
use crate::error::Result;
use crate::model::*;

const NULL_STATEMENT: &str = "NULL;";

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
        RoutineKind::Function => {
            let returns = match &r.return_type {
                Some(t) => t.text.clone(),
                None if returns_rows(&r.statements) => "SETOF record".to_string(),
                None => "void".to_string(),
            };
            w.line(format!(
                "CREATE OR REPLACE FUNCTION {}({})",
                r.name.qualified(),
                parameters(e, &r.parameters)
            ));
            w.line(format!("RETURNS {}", returns));
        }
        RoutineKind::Procedure => w.line(format!(
            "CREATE OR REPLACE PROCEDURE {}({})",
            r.name.qualified(),
            parameters(e, &r.parameters)
        )),
    }
    w.line("LANGUAGE plpgsql");
    w.line("AS $$");
    block_text(e, &mut w, &r.declarations, &body)?;
    w.line("$$;");
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

/// Row a trigger function hands back to the executor.
fn trigger_row(t: &TriggerScript) -> &'static str {
    match t.timing {
        TriggerTiming::After => "NULL",
        _ if !t.for_each_row => "NULL",
        _ if t.events.iter().all(|ev| *ev == TriggerEvent::Delete) => "OLD",
        _ => "NEW",
    }
}

fn trigger(e: &mut Emitter, t: &TriggerScript) -> Result<String> {
    let row = trigger_row(t);
    e.trigger_return = Some(row);
    let mut statements = t.statements.clone();
    if !matches!(statements.last(), Some(Statement::Return(_) | Statement::Leave)) {
        statements.push(Statement::Leave);
    }
    let body = body(e, &t.declarations, &statements)?;

    let function = format!("{}_fn", t.name.qualified());
    let events = t.events.iter().map(|ev| ev.keyword()).collect::<Vec<_>>().join(" OR ");
    let mut w = ScriptWriter::new();
    w.line(format!("CREATE OR REPLACE FUNCTION {}()", function));
    w.line("RETURNS trigger");
    w.line("LANGUAGE plpgsql");
    w.line("AS $$");
    block_text(e, &mut w, &t.declarations, &body)?;
    w.line("$$;");
    w.line("");
    w.line(format!("CREATE OR REPLACE TRIGGER {}", t.name.name));
    w.line(format!("{} {} ON {}", t.timing.keyword(), events, t.table.text));
    w.line(if t.for_each_row { "FOR EACH ROW" } else { "FOR EACH STATEMENT" });
    if let Some(condition) = &t.condition {
        w.line(format!("WHEN ({})", strip_parens(&e.tok(condition))));
    }
    w.line(format!("EXECUTE FUNCTION {}();", function));
    Ok(w.finish())
}

fn common(e: &mut Emitter, c: &CommonScript) -> Result<String> {
    let body = body(e, &c.declarations, &c.statements)?;
    let mut w = ScriptWriter::new();
    w.line("DO $$");
    block_text(e, &mut w, &c.declarations, &body)?;
    w.line("$$;");
    Ok(w.finish())
}

fn parameters(e: &Emitter, parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let direction = match p.direction {
                ParameterDirection::In => "",
                ParameterDirection::Out => "OUT ",
                ParameterDirection::InOut => "INOUT ",
            };
            let mut out = format!("{}{} {}", direction, p.name.text, p.data_type.text);
            if let Some(d) = &p.default {
                out.push_str(&format!(" DEFAULT {}", e.tok(d)));
            }
            out
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a function body returns a result set.
fn returns_rows(statements: &[Statement]) -> bool {
    any_statement(statements, &|s| matches!(s, Statement::Select(SelectStatement { into: None, .. })))
}

// ===== Bodies =====

/// `DECLARE ... BEGIN ... END;` between the dollar quotes.
fn block_text(e: &Emitter, w: &mut ScriptWriter, declarations: &[Statement], body: &Rendered) -> Result<()> {
    let mark = w.len();
    w.line("DECLARE");
    w.indent();
    let first = w.len();
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
                    w.line(format!("{} CURSOR FOR", c.name.text));
                    let text = e.select(query)?;
                    w.nested(|w| w.line(format!("{};", text)));
                }
                None => w.line(format!("{} refcursor;", c.name.text)),
            },
            _ => {}
        }
    }
    for v in &body.declarations {
        let default = v.default.as_ref().map(|d| format!(" := {}", d)).unwrap_or_default();
        w.line(format!("{} {}{};", v.name, v.data_type, default));
    }
    w.dedent();
    if w.len() == first {
        w.truncate(mark);
    }
    w.line("BEGIN");
    body.lines.iter().for_each(|l| w.line(l));
    w.line("END;");
    Ok(())
}

fn body(e: &mut Emitter, declarations: &[Statement], statements: &[Statement]) -> Result<Rendered> {
    let handlers = handlers_of(declarations);
    e.render_block(|e, w| {
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
            for text in e.insert(s, true)? {
                w.line(format!("{};", text));
            }
        }
        Statement::Update(u) => update(e, w, u)?,
        Statement::Delete(d) => delete(e, w, d)?,
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
            // PL/pgSQL raises CASE_NOT_FOUND when no branch matches.
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
                    range: ForRange::Numeric { lower, upper, reverse: false },
                } => format!("FOR {} IN {}..{} LOOP", iterator.text, e.tok(lower), e.tok(upper)),
                // REVERSE walks from the first bound down to the second.
                LoopKind::For {
                    iterator,
                    range: ForRange::Numeric { lower, upper, reverse: true },
                } => format!("FOR {} IN REVERSE {}..{} LOOP", iterator.text, e.tok(upper), e.tok(lower)),
                LoopKind::For {
                    iterator,
                    range: ForRange::Query(q),
                } => {
                    e.synthesize(&iterator.text, "RECORD", None);
                    format!("FOR {} IN\n{}\nLOOP", iterator.text, e.select(q)?)
                }
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
                (Some(_), _) => " WHEN NOT FOUND".to_string(),
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
        Statement::Return(r) => match (&r.value, e.is_function(), e.trigger_return) {
            (_, _, Some(row)) => w.line(format!("RETURN {};", row)),
            (Some(v), true, None) => w.line(format!("RETURN {};", e.tok(v))),
            _ => w.line("RETURN;"),
        },
        Statement::Leave => match e.trigger_return {
            Some(row) => w.line(format!("RETURN {};", row)),
            None => w.line("RETURN;"),
        },
        Statement::Print(p) => w.line(format!("RAISE NOTICE '%', {};", e.tok(&p.content))),
        Statement::RaiseError(r) => raise(e, w, r),
        Statement::Call(c) => match c.kind {
            CallKind::Procedure => w.line(format!("CALL {}({});", c.name.text, e.toks(&c.arguments))),
            CallKind::Function => w.line(format!("PERFORM {}({});", c.name.text, e.toks(&c.arguments))),
            CallKind::Dynamic if c.arguments.is_empty() => w.line(format!("EXECUTE {};", e.tok(&c.name))),
            CallKind::Dynamic => w.line(format!("EXECUTE {} USING {};", e.tok(&c.name), e.toks(&c.arguments))),
        },
        Statement::Goto(_) => return Err(e.unsupported("GOTO")),
        Statement::Label(_) => {}
        Statement::Transaction(t) => match t.kind {
            TransactionKind::Begin => {}
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
            w.line(format!(
                "CREATE {}TABLE {} AS\n{};",
                if *temporary { "TEMPORARY " } else { "" },
                name.text,
                e.select(&query)?
            ));
        }
        None if e.is_function() => w.line(format!("RETURN QUERY\n{};", e.select(s)?)),
        None => {
            let text = e.select(s)?;
            let cursor = e.result_sets.fresh();
            e.synthesize(&cursor, "refcursor", Some(&string_literal(&cursor)));
            w.line(format!("OPEN {} FOR", cursor));
            w.nested(|w| w.line(format!("{};", text)));
        }
    }
    Ok(())
}

fn update(e: &mut Emitter, w: &mut ScriptWriter, u: &UpdateStatement) -> Result<()> {
    let target = match &u.alias {
        Some(a) => format!("{} AS {}", u.table.text, a.text),
        None => u.table.text.clone(),
    };
    // SET columns cannot be qualified in PostgreSQL.
    let sets = u
        .set_items
        .iter()
        .map(|item| format!("{} = {}", unqualified(&e.tok(&item.column)), e.tok(&item.value)))
        .collect::<Vec<_>>()
        .join(",\n    ");
    let correlation = e.correlate(&u.table, u.alias.as_ref(), &u.from, u.where_clause.as_ref())?;
    let mut text = format!("UPDATE {}\nSET {}", target, sets);
    if !correlation.sources.is_empty() {
        text.push_str(&format!("\nFROM {}", correlation.sources.join(", ")));
    }
    if let Some(f) = correlation.condition() {
        text.push_str(&format!("\nWHERE {}", f));
    }
    w.line(format!("{};", text));
    Ok(())
}

fn delete(e: &mut Emitter, w: &mut ScriptWriter, d: &DeleteStatement) -> Result<()> {
    let target = match &d.alias {
        Some(a) => format!("{} AS {}", d.table.text, a.text),
        None => d.table.text.clone(),
    };
    let correlation = e.correlate(&d.table, d.alias.as_ref(), &d.from, d.where_clause.as_ref())?;
    let mut text = format!("DELETE FROM {}", target);
    if !correlation.sources.is_empty() {
        text.push_str(&format!("\nUSING {}", correlation.sources.join(", ")));
    }
    if let Some(f) = correlation.condition() {
        text.push_str(&format!("\nWHERE {}", f));
    }
    w.line(format!("{};", text));
    Ok(())
}

fn raise(e: &mut Emitter, w: &mut ScriptWriter, r: &RaiseErrorStatement) {
    let code = r.code.as_ref().map(error_code);
    match (code, &r.message) {
        (None, None) => w.line("RAISE;"),
        (Some(ErrorCode::Name(name)), None) => {
            let name = map_condition(DatabaseType::Postgres, &name).unwrap_or(name);
            w.line(format!("RAISE {};", name.to_ascii_lowercase()));
        }
        (code, message) => {
            let message = match message {
                Some(m) => e.tok(m),
                None => string_literal(&default_message(code.as_ref())),
            };
            let using = match &code {
                Some(ErrorCode::SqlState(state)) => format!(" USING ERRCODE = '{}'", state),
                _ => String::new(),
            };
            w.line(format!("RAISE EXCEPTION '%', {}{};", message, using));
        }
    }
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

    fn to_postgres(db: DatabaseType, source: &str, mode: ParseMode) -> String {
        let script = parse(db, source, mode).unwrap();
        render(DatabaseType::Postgres, &script, &EmitOptions::default()).unwrap()
    }

    #[test]
    fn test_function_with_dollar_quoted_body() {
        let out = to_postgres(
            DatabaseType::Oracle,
            "CREATE OR REPLACE FUNCTION add_one(p_value IN NUMBER) RETURN NUMBER IS \
             v_result NUMBER := 0; BEGIN v_result := p_value + 1; RETURN v_result; END;",
            ParseMode::Function,
        );
        assert!(out.starts_with("CREATE OR REPLACE FUNCTION add_one(p_value NUMBER)\nRETURNS NUMBER\nLANGUAGE plpgsql\nAS $$\n"));
        assert!(out.contains("DECLARE\n    v_result NUMBER := 0;\nBEGIN\n"));
        assert!(out.contains("    v_result := p_value + 1;\n    RETURN v_result;\n"));
        assert!(out.ends_with("END;\n$$;\n"));
    }

    #[test]
    fn test_trigger_function_returns_row() {
        let out = to_postgres(
            DatabaseType::Oracle,
            "CREATE OR REPLACE TRIGGER orders_bi BEFORE INSERT ON orders FOR EACH ROW \
             BEGIN :NEW.created := SYSDATE; END;",
            ParseMode::Trigger,
        );
        assert!(out.contains("CREATE OR REPLACE FUNCTION orders_bi_fn()\nRETURNS trigger"));
        assert!(out.contains("    NEW.created := SYSDATE;\n    RETURN NEW;\n"));
        assert!(out.contains("EXECUTE FUNCTION orders_bi_fn();"));
    }

    #[test]
    fn test_delete_join_uses_using() {
        let out = to_postgres(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS BEGIN DELETE o FROM orders o \
             JOIN customers c ON c.id = o.customer_id WHERE c.active = 0; END",
            ParseMode::Procedure,
        );
        assert!(out.contains("DELETE FROM orders AS o\n    USING customers c\n    WHERE c.id = o.customer_id AND c.active = 0;"));
    }
}
