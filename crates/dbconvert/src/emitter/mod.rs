//! Dialect back-end emitters.
//!
//! [`render`] turns a [`Script`] into target-dialect text. Each dialect module
//! matches every [`Statement`] variant exhaustively; constructs a dialect has
//! no counterpart for fail that object with
//! [`ConvertError::UnsupportedConstruct`].
//!
//! The parts shared by all dialects live here: SELECT/INSERT text, name
//! decoration (T-SQL `@variables` and `#temp` tables, PL/SQL `:NEW`), loop
//! bookkeeping and the mapping of exception conditions.

mod mysql;
mod plsql;
mod postgres;
pub mod prepass;
mod tsql;
pub mod writer;

use std::collections::HashSet;

use tracing::debug;

use crate::core::identifier;
use crate::dialect::DatabaseType;
use crate::error::{ConvertError, Result};
use crate::model::*;
use writer::{LabelGenerator, ScriptWriter};

/// Rendering options.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Render T-SQL declarations as one `DECLARE` list instead of one
    /// statement per variable. Dialects with a declaration section always
    /// hoist.
    pub hoist_declarations: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            hoist_declarations: true,
        }
    }
}

/// Render a script in the target dialect.
pub fn render(target: DatabaseType, script: &Script, options: &EmitOptions) -> Result<String> {
    let mut script = script.clone();
    prepass::prepare(target, &mut script);
    let mut emitter = Emitter::new(target, &script, options);
    let text = match target {
        DatabaseType::Oracle => plsql::render(&mut emitter, &script)?,
        DatabaseType::SqlServer => tsql::render(&mut emitter, &script)?,
        DatabaseType::MySql => mysql::render(&mut emitter, &script)?,
        DatabaseType::Postgres => postgres::render(&mut emitter, &script)?,
    };
    debug!(
        dialect = target.name(),
        kind = script.kind_name(),
        name = %script.name(),
        "rendered script"
    );
    Ok(text)
}

/// A variable the renderer needs that the source did not declare.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntheticVariable {
    pub name: String,
    pub data_type: String,
    pub default: Option<String>,
}

/// Output of rendering a statement list: its lines plus the variables the
/// rendering introduced, which the caller places in the declaration section.
#[derive(Debug, Default)]
pub(crate) struct Rendered {
    pub lines: Vec<String>,
    pub declarations: Vec<SyntheticVariable>,
}

#[derive(Debug, Clone)]
struct LoopFrame {
    source_label: Option<String>,
    label: Option<String>,
}

/// Per-render state shared by the dialect modules.
pub(crate) struct Emitter<'o> {
    pub db: DatabaseType,
    pub options: &'o EmitOptions,
    pub labels: LabelGenerator,
    /// Names of cursor variables carrying result sets back to the caller.
    pub result_sets: LabelGenerator,
    /// Row a PostgreSQL trigger function returns when it leaves early.
    pub trigger_return: Option<&'static str>,
    /// Routine kind; `None` for triggers, views and blocks.
    pub routine: Option<RoutineKind>,
    /// Variables (parameters included), lowercased.
    variables: HashSet<String>,
    /// Temporary tables created by the script, lowercased.
    temp_tables: HashSet<String>,
    /// Table variables declared by the script, lowercased.
    table_variables: HashSet<String>,
    /// Prefix `NEW.`/`OLD.` references with `:`.
    bind_row_references: bool,
    loops: Vec<LoopFrame>,
    synthesized: Vec<SyntheticVariable>,
}

impl<'o> Emitter<'o> {
    fn new(db: DatabaseType, script: &Script, options: &'o EmitOptions) -> Self {
        let mut variables = HashSet::new();
        let mut temp_tables = HashSet::new();
        let mut table_variables = HashSet::new();
        let mut source_labels = Vec::new();

        if let Script::Routine(routine) = script {
            for p in &routine.parameters {
                variables.insert(key(&p.name.text));
            }
        }
        for stmt in script.declarations() {
            match stmt {
                Statement::Declare(Declaration::Variable(v)) => {
                    variables.insert(key(&v.name.text));
                }
                Statement::Declare(Declaration::Table(t)) => {
                    table_variables.insert(key(&t.name.text));
                }
                _ => {}
            }
        }
        let mut visit = |stmt: &Statement| match stmt {
            Statement::Loop(l) => {
                source_labels.extend(l.label.clone());
                if let LoopKind::For {
                    iterator,
                    range: ForRange::Numeric { .. },
                } = &l.kind
                {
                    variables.insert(key(&iterator.text));
                }
            }
            Statement::While(w) => source_labels.extend(w.label.clone()),
            Statement::Label(l) => source_labels.push(l.name.clone()),
            Statement::CreateTable(c) if c.temporary => {
                temp_tables.insert(key(&c.name.text));
            }
            Statement::Select(SelectStatement {
                into: Some(SelectInto::Table { name, temporary: true }),
                ..
            }) => {
                temp_tables.insert(key(&name.text));
            }
            _ => {}
        };
        walk(script.declarations(), &mut visit);
        walk(script.statements(), &mut visit);

        let routine = match script {
            Script::Routine(r) => Some(r.kind),
            _ => None,
        };
        Self {
            db,
            options,
            labels: LabelGenerator::new("loop", source_labels),
            result_sets: LabelGenerator::new("v_result", Vec::new()),
            trigger_return: None,
            routine,
            variables,
            temp_tables,
            table_variables,
            bind_row_references: db == DatabaseType::Oracle && matches!(script, Script::Trigger(_)),
            loops: Vec::new(),
            synthesized: Vec::new(),
        }
    }

    pub fn unsupported(&self, construct: impl Into<String>) -> ConvertError {
        ConvertError::unsupported(self.db, construct)
    }

    pub fn is_function(&self) -> bool {
        self.routine == Some(RoutineKind::Function)
    }

    // ===== Names and tokens =====

    /// Render a declared name: `@name` for T-SQL variables.
    pub fn variable(&self, name: &str) -> String {
        if self.db == DatabaseType::SqlServer && !name.starts_with('@') {
            format!("@{}", name)
        } else {
            name.to_string()
        }
    }

    /// Render a table name, decorating T-SQL temporary tables and table variables.
    pub fn table(&self, name: &str) -> String {
        if self.db != DatabaseType::SqlServer {
            return name.to_string();
        }
        let k = key(name);
        if self.table_variables.contains(&k) {
            format!("@{}", name)
        } else if self.temp_tables.contains(&k) && !name.starts_with('#') {
            format!("#{}", name)
        } else {
            name.to_string()
        }
    }

    /// Text of a token in the target dialect.
    pub fn tok(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::VariableName | TokenKind::ParameterName => self.variable(&token.text),
            TokenKind::TableName => self.table(&token.text),
            TokenKind::ColumnName
            | TokenKind::CursorName
            | TokenKind::RoutineName
            | TokenKind::DataType
            | TokenKind::Alias => token.text.clone(),
            TokenKind::Expression
            | TokenKind::Condition
            | TokenKind::Subquery
            | TokenKind::Identifier
            | TokenKind::FunctionCall => self.decorate(token),
        }
    }

    pub fn toks(&self, tokens: &[Token]) -> String {
        tokens.iter().map(|t| self.tok(t)).collect::<Vec<_>>().join(", ")
    }

    fn decorate(&self, token: &Token) -> String {
        let decorates = self.db == DatabaseType::SqlServer || self.bind_row_references;
        if !decorates || token.children.is_empty() {
            return token.text.clone();
        }
        let mut copy = token.clone();
        copy.rewrite_children(|child| {
            (child.kind == TokenKind::Identifier)
                .then(|| self.decorate_identifier(&child.text))
                .flatten()
        });
        copy.text
    }

    fn decorate_identifier(&self, text: &str) -> Option<String> {
        if text.starts_with('@') || text.starts_with('#') {
            return None;
        }
        let (head, rest) = match text.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (text, None),
        };
        if self.bind_row_references {
            let upper = head.to_ascii_uppercase();
            return (rest.is_some() && (upper == "NEW" || upper == "OLD")).then(|| format!(":{}", text));
        }
        let k = key(head);
        match rest {
            None if self.variables.contains(&k) || self.table_variables.contains(&k) => {
                Some(format!("@{}", text))
            }
            _ if self.temp_tables.contains(&k) => Some(format!("#{}", text)),
            _ => None,
        }
    }

    // ===== Synthesized declarations =====

    /// Declare a helper variable once; returns its rendered name.
    pub fn synthesize(&mut self, name: &str, data_type: &str, default: Option<&str>) -> String {
        if !self.synthesized.iter().any(|s| s.name == name) {
            self.synthesized.push(SyntheticVariable {
                name: name.to_string(),
                data_type: data_type.to_string(),
                default: default.map(str::to_string),
            });
            self.variables.insert(key(name));
        }
        self.variable(name)
    }

    /// Render a statement list with `f` and collect the variables it introduced.
    pub fn render_block(
        &mut self,
        f: impl FnOnce(&mut Self, &mut ScriptWriter) -> Result<()>,
    ) -> Result<Rendered> {
        let outer = std::mem::take(&mut self.synthesized);
        let mut w = ScriptWriter::new();
        let result = f(self, &mut w);
        let declarations = std::mem::replace(&mut self.synthesized, outer);
        result?;
        Ok(Rendered {
            lines: w.split_off(0),
            declarations,
        })
    }

    // ===== Loops =====

    pub fn push_loop(&mut self, source_label: Option<String>, label: Option<String>) {
        self.loops.push(LoopFrame { source_label, label });
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    /// Rendered label of the loop an exit or continue targets.
    pub fn loop_label(&self, label: Option<&str>) -> Result<Option<String>> {
        Ok(self.target_frame(label)?.label.clone())
    }

    /// Whether an exit or continue targets the innermost loop.
    pub fn targets_innermost(&self, label: Option<&str>) -> bool {
        match (label, self.loops.last()) {
            (None, _) => true,
            (Some(l), Some(frame)) => frame
                .source_label
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(l)),
            (Some(_), None) => false,
        }
    }

    fn target_frame(&self, label: Option<&str>) -> Result<&LoopFrame> {
        let frame = match label {
            None => self.loops.last(),
            Some(l) => self
                .loops
                .iter()
                .rev()
                .find(|f| f.source_label.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(l))),
        };
        frame.ok_or_else(|| self.unsupported("loop exit outside of a loop"))
    }

    /// Label for a loop: the source label, a fresh one when the body exits
    /// the loop and `needs_label` says the dialect must name it, else none.
    pub fn loop_label_for(
        &mut self,
        source_label: Option<&String>,
        body: &[Statement],
        needs_label: bool,
    ) -> Option<String> {
        match source_label {
            Some(l) => Some(l.clone()),
            None if needs_label && exits_loop(body, None) => Some(self.labels.fresh()),
            None => None,
        }
    }

    // ===== Queries =====

    /// FROM clause items.
    pub fn from_items(&self, items: &[FromItem]) -> String {
        items
            .iter()
            .map(|item| self.from_item(item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn from_item(&self, item: &FromItem) -> String {
        let mut out = self.source(&item.source, item.alias.as_ref());
        for join in &item.joins {
            out.push_str(&format!("\n    {} {}", join.kind.keyword(), self.source(&join.source, join.alias.as_ref())));
            if let Some(on) = &join.on {
                out.push_str(&format!(" ON {}", self.tok(on)));
            }
        }
        out
    }

    pub fn source(&self, source: &Token, alias: Option<&Token>) -> String {
        match alias {
            Some(a) => format!("{} {}", self.tok(source), a.text),
            None => self.tok(source),
        }
    }

    /// Render a query. `SELECT ... INTO table` is the caller's business; the
    /// table target is ignored here except for T-SQL, where it stays inline.
    pub fn select(&self, select: &SelectStatement) -> Result<String> {
        let mut out = String::new();
        if !select.with.is_empty() {
            let ctes = select
                .with
                .iter()
                .map(|cte| {
                    let columns = if cte.columns.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", self.toks(&cte.columns))
                    };
                    Ok(format!("{}{} AS (\n{}\n)", cte.name.text, columns, self.select(&cte.query)?))
                })
                .collect::<Result<Vec<_>>>()?;
            let recursive = if matches!(self.db, DatabaseType::MySql | DatabaseType::Postgres)
                && select.with.iter().any(|cte| references(&cte.query, &cte.name.text))
            {
                "RECURSIVE "
            } else {
                ""
            };
            out.push_str(&format!("WITH {}{}\n", recursive, ctes.join(",\n")));
        }
        out.push_str(&self.select_core(select)?);
        for union in &select.unions {
            let keyword = match (self.db, union.kind) {
                (DatabaseType::Oracle, UnionKind::Except) => "MINUS",
                (_, kind) => kind.keyword(),
            };
            out.push_str(&format!("\n{}\n{}", keyword, self.select_core(&union.select)?));
        }
        Ok(out)
    }

    fn select_core(&self, select: &SelectStatement) -> Result<String> {
        let limit = effective_limit(select);
        let mut head = String::from("SELECT");
        if select.distinct {
            head.push_str(" DISTINCT");
        }
        if self.db == DatabaseType::SqlServer {
            if let Some((None, count)) = &limit {
                head.push_str(&format!(" TOP ({})", strip_outer_parens(&self.tok(count))));
            }
        }

        let columns = match (&select.into, self.db) {
            (Some(SelectInto::Variables(vars)), DatabaseType::SqlServer) => {
                if vars.len() != select.columns.len() {
                    return Err(self.unsupported("SELECT INTO with a different number of variables and columns"));
                }
                select
                    .columns
                    .iter()
                    .zip(vars)
                    .map(|(item, var)| format!("{} = {}", self.tok(var), self.tok(&item.expression)))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            _ => self.select_items(&select.columns),
        };
        let mut out = format!("{} {}", head, columns);

        match &select.into {
            Some(SelectInto::Variables(vars)) if self.db != DatabaseType::SqlServer => {
                out.push_str(&format!("\nINTO {}", self.toks(vars)));
            }
            Some(SelectInto::Table { name, .. }) if self.db == DatabaseType::SqlServer => {
                out.push_str(&format!("\nINTO {}", self.tok(name)));
            }
            _ => {}
        }

        if select.from.is_empty() {
            if self.db == DatabaseType::Oracle && !select.columns.is_empty() {
                out.push_str("\nFROM DUAL");
            }
        } else {
            out.push_str(&format!("\nFROM {}", self.from_items(&select.from)));
        }
        if let Some(w) = &select.where_clause {
            out.push_str(&format!("\nWHERE {}", self.tok(w)));
        }
        if !select.group_by.is_empty() {
            out.push_str(&format!("\nGROUP BY {}", self.toks(&select.group_by)));
        }
        if let Some(h) = &select.having {
            out.push_str(&format!("\nHAVING {}", self.tok(h)));
        }
        let mut order_by = self.toks(&select.order_by);
        if let Some((offset, count)) = &limit {
            let count = self.tok(count);
            let offset = offset.map(|o| self.tok(o));
            match (self.db, offset) {
                (DatabaseType::MySql, Some(o)) => {
                    push_order(&mut out, &order_by);
                    out.push_str(&format!("\nLIMIT {}, {}", o, count));
                }
                (DatabaseType::MySql, None) => {
                    push_order(&mut out, &order_by);
                    out.push_str(&format!("\nLIMIT {}", count));
                }
                (DatabaseType::Postgres, o) => {
                    push_order(&mut out, &order_by);
                    out.push_str(&format!("\nLIMIT {}", count));
                    if let Some(o) = o {
                        out.push_str(&format!(" OFFSET {}", o));
                    }
                }
                (DatabaseType::Oracle, o) => {
                    push_order(&mut out, &order_by);
                    match o {
                        Some(o) => out.push_str(&format!("\nOFFSET {} ROWS FETCH NEXT {} ROWS ONLY", o, count)),
                        None => out.push_str(&format!("\nFETCH FIRST {} ROWS ONLY", count)),
                    }
                }
                (DatabaseType::SqlServer, Some(o)) => {
                    if order_by.is_empty() {
                        order_by = "(SELECT NULL)".to_string();
                    }
                    push_order(&mut out, &order_by);
                    out.push_str(&format!("\nOFFSET {} ROWS FETCH NEXT {} ROWS ONLY", o, count));
                }
                (DatabaseType::SqlServer, None) => push_order(&mut out, &order_by),
            }
        } else {
            push_order(&mut out, &order_by);
        }
        Ok(out)
    }

    pub fn select_items(&self, items: &[SelectItem]) -> String {
        items
            .iter()
            .map(|item| match &item.alias {
                Some(alias) => format!("{} AS {}", self.tok(&item.expression), alias.text),
                None => self.tok(&item.expression),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `INSERT` text; one statement per row when `multi_row` is false.
    pub fn insert(&self, insert: &InsertStatement, multi_row: bool) -> Result<Vec<String>> {
        let columns = if insert.columns.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.toks(&insert.columns))
        };
        let head = format!("INSERT INTO {}{}", self.tok(&insert.table), columns);
        Ok(match &insert.source {
            InsertSource::Select(query) => vec![format!("{}\n{}", head, self.select(query)?)],
            InsertSource::Values(rows) if multi_row || rows.len() == 1 => {
                let rows = rows
                    .iter()
                    .map(|row| format!("({})", self.toks(row)))
                    .collect::<Vec<_>>()
                    .join(",\n       ");
                vec![format!("{}\nVALUES {}", head, rows)]
            }
            InsertSource::Values(rows) => rows
                .iter()
                .map(|row| format!("{}\nVALUES ({})", head, self.toks(row)))
                .collect(),
        })
    }

    /// Split the sources of a multi-table UPDATE or DELETE into the tables
    /// other than the target and the conditions linking them. Only inner and
    /// cross joins can be flattened this way.
    pub fn correlate(
        &self,
        table: &Token,
        alias: Option<&Token>,
        from: &[FromItem],
        where_clause: Option<&Token>,
    ) -> Result<Correlation> {
        let is_target = |source: &Token, source_alias: Option<&Token>| match alias {
            Some(alias) => source_alias
                .map(|a| a.text.as_str())
                .unwrap_or(source.text.as_str())
                .eq_ignore_ascii_case(&alias.text),
            None => identifier::unquote(&source.text).eq_ignore_ascii_case(&identifier::unquote(&table.text)),
        };
        let mut found = false;
        let mut correlation = Correlation::default();
        for item in from {
            if !found && is_target(&item.source, item.alias.as_ref()) {
                found = true;
            } else {
                correlation.sources.push(self.source(&item.source, item.alias.as_ref()));
            }
            for join in &item.joins {
                if !matches!(join.kind, JoinKind::Inner | JoinKind::Cross) {
                    return Err(self.unsupported(format!("{} in a multi-table UPDATE or DELETE", join.kind.keyword())));
                }
                if !found && is_target(&join.source, join.alias.as_ref()) {
                    found = true;
                } else {
                    correlation.sources.push(self.source(&join.source, join.alias.as_ref()));
                }
                if let Some(on) = &join.on {
                    correlation.conditions.push(self.tok(on));
                }
            }
        }
        if let Some(w) = where_clause {
            correlation.conditions.push(self.tok(w));
        }
        Ok(correlation)
    }

    /// `col = value, ...` for UPDATE.
    pub fn set_items(&self, items: &[SetItem]) -> String {
        items
            .iter()
            .map(|item| format!("{} = {}", self.tok(&item.column), self.tok(&item.value)))
            .collect::<Vec<_>>()
            .join(",\n    ")
    }

    pub fn column_definitions(&self, columns: &[ColumnDefinition]) -> String {
        columns
            .iter()
            .map(|c| {
                let mut out = format!("{} {}", c.name.text, c.data_type.text);
                if !c.nullable {
                    out.push_str(" NOT NULL");
                }
                if let Some(d) = &c.default {
                    out.push_str(&format!(" DEFAULT {}", self.tok(d)));
                }
                out
            })
            .collect::<Vec<_>>()
            .join(",\n    ")
    }

    /// Handlers whose conditions the target can express, catch-all last,
    /// plus a comment for every handler that was dropped.
    pub fn map_handlers<'h>(&self, handlers: &[&'h ExceptionHandler]) -> (Vec<MappedHandler<'h>>, Vec<String>) {
        let mut mapped = Vec::new();
        let mut catch_all = Vec::new();
        let mut dropped = Vec::new();
        for handler in handlers.iter().copied() {
            if handler.is_catch_all() {
                catch_all.push(MappedHandler {
                    conditions: map_condition(self.db, "OTHERS").into_iter().collect(),
                    handler,
                });
                continue;
            }
            let conditions = self.handler_conditions(handler);
            if conditions.is_empty() {
                dropped.push(self.comment(&format!(
                    "handler for {} has no {} counterpart",
                    handler.conditions.join(", "),
                    self.db
                )));
            } else {
                mapped.push(MappedHandler { conditions, handler });
            }
        }
        mapped.extend(catch_all);
        (mapped, dropped)
    }

    /// Conditions of a handler spelled for the target; empty when none map.
    pub fn handler_conditions(&self, handler: &ExceptionHandler) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for c in &handler.conditions {
            if let Some(mapped) = map_condition(self.db, c) {
                if !out.contains(&mapped) {
                    out.push(mapped);
                }
            }
        }
        out
    }

    /// Comment line in the target dialect.
    pub fn comment(&self, text: &str) -> String {
        format!("{}{}", self.db.comment_prefix(), text)
    }
}

/// Exception handler with its conditions spelled for the target.
#[derive(Debug)]
pub(crate) struct MappedHandler<'h> {
    pub conditions: Vec<String>,
    pub handler: &'h ExceptionHandler,
}

/// Message used when a raise statement carries none.
pub(crate) fn default_message(code: Option<&ErrorCode>) -> String {
    match code {
        Some(ErrorCode::Number(n)) => format!("Error {}", n),
        Some(ErrorCode::SqlState(s)) => format!("SQLSTATE {}", s),
        Some(ErrorCode::Name(n)) => n.clone(),
        None => "Error".to_string(),
    }
}

/// Tables and conditions of a flattened multi-table statement.
#[derive(Debug, Default)]
pub(crate) struct Correlation {
    pub sources: Vec<String>,
    pub conditions: Vec<String>,
}

impl Correlation {
    /// Conditions joined with AND; conditions containing OR are parenthesized.
    pub fn condition(&self) -> Option<String> {
        match self.conditions.len() {
            0 => None,
            1 => Some(self.conditions[0].clone()),
            _ => Some(
                self.conditions
                    .iter()
                    .map(|c| {
                        if c.to_ascii_uppercase().contains(" OR ") {
                            format!("({})", c)
                        } else {
                            c.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }
}

/// Column name without its table qualifier.
pub(crate) fn unqualified(column: &str) -> &str {
    column.rsplit('.').next().unwrap_or(column)
}

/// Routine-level exception handlers lifted into the declaration list.
pub(crate) fn handlers_of(declarations: &[Statement]) -> Vec<&ExceptionHandler> {
    declarations
        .iter()
        .filter_map(|s| match s {
            Statement::Exception(e) => Some(&e.handlers),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Data type without its size or precision, as PL/SQL parameters require.
pub(crate) fn strip_size(data_type: &str) -> &str {
    data_type.split('(').next().unwrap_or(data_type).trim()
}

fn push_order(out: &mut String, order_by: &str) {
    if !order_by.is_empty() {
        out.push_str(&format!("\nORDER BY {}", order_by));
    }
}

fn key(name: &str) -> String {
    identifier::unquote(identifier::strip_temp_marker(identifier::strip_variable_sigil(name)))
        .to_ascii_lowercase()
}

/// Row cap of a query as (offset, count): `LIMIT`/`FETCH`, else `TOP`.
fn effective_limit(select: &SelectStatement) -> Option<(Option<&Token>, &Token)> {
    match (&select.limit, &select.top) {
        (Some(limit), _) => Some((limit.offset.as_ref(), &limit.count)),
        (None, Some(top)) => Some((None, top)),
        (None, None) => None,
    }
}

fn strip_outer_parens(text: &str) -> &str {
    let t = text.trim();
    if t.starts_with('(') && t.ends_with(')') {
        &t[1..t.len() - 1]
    } else {
        t
    }
}

/// Whether a query mentions `name` as a table.
fn references(select: &SelectStatement, name: &str) -> bool {
    let mentions = |items: &[FromItem]| {
        items.iter().any(|item| {
            item.source.text.eq_ignore_ascii_case(name)
                || item.joins.iter().any(|j| j.source.text.eq_ignore_ascii_case(name))
        })
    };
    mentions(&select.from) || select.unions.iter().any(|u| mentions(&u.select.from))
}

/// Whether `body` contains an exit or continue that targets the loop owning
/// it. Nested loops are only searched for exits naming `label`.
pub(crate) fn exits_loop(body: &[Statement], label: Option<&str>) -> bool {
    body.iter().any(|stmt| {
        let targets = |l: &Option<String>| match (l, label) {
            (None, _) => true,
            (Some(l), Some(own)) => l.eq_ignore_ascii_case(own),
            (Some(_), None) => false,
        };
        match stmt {
            Statement::LoopExit(e) => targets(&e.label),
            Statement::Continue(c) => targets(&c.label),
            s if s.is_loop() => {
                label.is_some()
                    && s.blocks().into_iter().any(|b| {
                        any_statement(b, &|inner| match inner {
                            Statement::LoopExit(e) => e.label.as_deref().is_some_and(|l| Some(l) == label),
                            Statement::Continue(c) => c.label.as_deref().is_some_and(|l| Some(l) == label),
                            _ => false,
                        })
                    })
            }
            s => s.blocks().into_iter().any(|b| exits_loop(b, label)),
        }
    })
}

// ===== Exception conditions =====

/// Condition spellings per dialect: Oracle, PostgreSQL, MySQL, and the
/// SQL Server `CATCH` test. An empty entry has no counterpart.
const CONDITIONS: &[[&str; 4]] = &[
    ["NO_DATA_FOUND", "NO_DATA_FOUND", "NOT FOUND", ""],
    ["OTHERS", "OTHERS", "SQLEXCEPTION", "1 = 1"],
    [
        "DUP_VAL_ON_INDEX",
        "UNIQUE_VIOLATION",
        "SQLSTATE '23000'",
        "ERROR_NUMBER() IN (2601, 2627)",
    ],
    ["ZERO_DIVIDE", "DIVISION_BY_ZERO", "SQLSTATE '22012'", "ERROR_NUMBER() = 8134"],
    ["TOO_MANY_ROWS", "TOO_MANY_ROWS", "1172", "ERROR_NUMBER() = 512"],
];

/// Spelling of an exception condition in the target dialect; `None` when the
/// target has no counterpart. For SQL Server this is a `CATCH` block test.
pub(crate) fn map_condition(target: DatabaseType, condition: &str) -> Option<String> {
    let normalized = condition.split_whitespace().collect::<Vec<_>>().join(" ");
    let column = match target {
        DatabaseType::Oracle => 0,
        DatabaseType::Postgres => 1,
        DatabaseType::MySql => 2,
        DatabaseType::SqlServer => 3,
    };
    if let Some(row) = CONDITIONS
        .iter()
        .find(|row| row.iter().any(|c| !c.is_empty() && c.eq_ignore_ascii_case(&normalized)))
    {
        return (!row[column].is_empty()).then(|| row[column].to_string());
    }
    let upper = normalized.to_ascii_uppercase();
    if upper.starts_with("SQLSTATE") {
        return match target {
            DatabaseType::Postgres | DatabaseType::MySql => Some(normalized),
            DatabaseType::Oracle | DatabaseType::SqlServer => None,
        };
    }
    match target {
        DatabaseType::SqlServer => None,
        _ => Some(normalized),
    }
}

/// Error code of a raise statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    /// Five-character SQLSTATE, without quotes.
    SqlState(String),
    Number(i64),
    /// Named exception or condition.
    Name(String),
}

pub(crate) fn error_code(token: &Token) -> ErrorCode {
    let text = token.text.trim();
    let unquoted = text.trim_matches('\'');
    if text.starts_with('\'') && unquoted.len() == 5 && unquoted.chars().all(|c| c.is_ascii_alphanumeric()) {
        return ErrorCode::SqlState(unquoted.to_ascii_uppercase());
    }
    match text.replace(' ', "").parse::<i64>() {
        Ok(n) => ErrorCode::Number(n),
        Err(_) => ErrorCode::Name(text.to_string()),
    }
}

/// Whether a message is a single string literal or a single name, which is
/// what `THROW` and `SIGNAL ... MESSAGE_TEXT` accept.
pub(crate) fn is_simple_message(text: &str) -> bool {
    let t = text.trim();
    if t.len() >= 2 && t.starts_with('\'') && t.ends_with('\'') {
        return !t[1..t.len() - 1].replace("''", "").contains('\'');
    }
    !t.is_empty() && t.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '@')
}

/// Cursors of the script's loops that end with a cursor guard.
pub(crate) fn has_cursor_guards(statements: &[Statement]) -> bool {
    any_statement(statements, &|s| {
        matches!(s, Statement::LoopExit(e) if e.is_cursor_guard())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{parse, ParseMode};

    fn emitter_for<'o>(db: DatabaseType, script: &Script, options: &'o EmitOptions) -> Emitter<'o> {
        Emitter::new(db, script, options)
    }

    #[test]
    fn test_tsql_decoration_of_variables_and_temp_tables() {
        let script = parse(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p @min_id INT AS BEGIN SELECT * INTO #t FROM orders WHERE id > @min_id; \
             SELECT total FROM #t WHERE id > @min_id; END",
            ParseMode::Procedure,
        )
        .unwrap();
        let options = EmitOptions::default();
        let tsql = emitter_for(DatabaseType::SqlServer, &script, &options);
        let Statement::Select(second) = &script.statements()[1] else {
            panic!("expected a select");
        };
        let text = tsql.select(second).unwrap();
        assert_eq!(text, "SELECT total\nFROM #t\nWHERE id > @min_id");

        let pg = emitter_for(DatabaseType::Postgres, &script, &options);
        assert_eq!(pg.select(second).unwrap(), "SELECT total\nFROM t\nWHERE id > min_id");
    }

    #[test]
    fn test_limit_per_dialect() {
        let script = parse(
            DatabaseType::MySql,
            "CREATE PROCEDURE p() BEGIN SELECT a FROM t ORDER BY a LIMIT 5, 10; END",
            ParseMode::Procedure,
        )
        .unwrap();
        let Statement::Select(select) = &script.statements()[0] else {
            panic!("expected a select");
        };
        let options = EmitOptions::default();
        let render = |db| emitter_for(db, &script, &options).select(select).unwrap();
        assert!(render(DatabaseType::MySql).ends_with("ORDER BY a\nLIMIT 5, 10"));
        assert!(render(DatabaseType::Postgres).ends_with("ORDER BY a\nLIMIT 10 OFFSET 5"));
        assert!(render(DatabaseType::Oracle).ends_with("OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"));
        assert!(render(DatabaseType::SqlServer).ends_with("ORDER BY a\nOFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"));
    }

    #[test]
    fn test_map_condition() {
        assert_eq!(map_condition(DatabaseType::MySql, "NO_DATA_FOUND").as_deref(), Some("NOT FOUND"));
        assert_eq!(map_condition(DatabaseType::Oracle, "SQLEXCEPTION").as_deref(), Some("OTHERS"));
        assert_eq!(
            map_condition(DatabaseType::Postgres, "dup_val_on_index").as_deref(),
            Some("UNIQUE_VIOLATION")
        );
        assert_eq!(map_condition(DatabaseType::SqlServer, "NO_DATA_FOUND"), None);
        assert_eq!(map_condition(DatabaseType::Oracle, "SQLSTATE '45000'"), None);
        assert_eq!(map_condition(DatabaseType::Oracle, "my_error").as_deref(), Some("my_error"));
    }

    #[test]
    fn test_error_code_and_messages() {
        assert_eq!(error_code(&Token::expression("'45000'")), ErrorCode::SqlState("45000".into()));
        assert_eq!(error_code(&Token::expression("-20001")), ErrorCode::Number(-20001));
        assert_eq!(error_code(&Token::expression("bad_input")), ErrorCode::Name("bad_input".into()));
        assert!(is_simple_message("'it''s bad'"));
        assert!(is_simple_message("v_msg"));
        assert!(!is_simple_message("'a' + @b"));
    }

    #[test]
    fn test_exits_loop_skips_nested_loops() {
        let exit = Statement::LoopExit(LoopExitStatement::default());
        let nested = Statement::Loop(LoopStatement {
            kind: LoopKind::Basic,
            label: None,
            statements: vec![exit.clone()],
        });
        assert!(!exits_loop(&[nested.clone()], None));
        assert!(exits_loop(&[nested, exit], None));
    }
}
