//! Dialect front-end adapters.
//!
//! [`parse`] runs the dialect grammar and turns the syntax tree into a
//! [`Script`]. Statement nodes are built through a fixed table mapping each
//! [`SyntaxKind`] to a builder function: a dialect table is consulted first,
//! then the shared table below. Node kinds without a builder are skipped with a
//! debug log, so grammar drift degrades a script instead of failing it.
//!
//! After building, [`normalize`] lifts declarations, strips dialect sigils and
//! desugars cursor loops so every emitter sees the same tree shape.

mod mysql;
pub mod normalize;
mod plsql;
mod postgres;

use std::collections::HashSet;

use tracing::debug;

pub use crate::parser::ParseMode;

use crate::core::identifier;
use crate::dialect::DatabaseType;
use crate::error::{ConvertError, Result};
use crate::model::*;
use crate::parser::{self, SyntaxKind, SyntaxNode};

/// Builds the statements for one syntax node. Most nodes yield exactly one
/// statement; flattened blocks yield several, skipped nodes none.
pub(crate) type BuildFn = fn(&BuildContext, &SyntaxNode) -> Result<Vec<Statement>>;

/// Parse one object definition into the statement model.
pub fn parse(db: DatabaseType, source: &str, mode: ParseMode) -> Result<Script> {
    let root = parser::parse(db, source, mode)?;
    let unit = root
        .children
        .first()
        .ok_or_else(|| ConvertError::syntax(1, 1, "empty script"))?;
    let ctx = BuildContext::new(db, unit);
    let mut script = ctx.script(unit)?;
    normalize::normalize(db, &mut script);
    debug!(
        dialect = db.name(),
        kind = script.kind_name(),
        name = %script.name(),
        "built script"
    );
    Ok(script)
}

/// State shared by the builders of one script.
pub(crate) struct BuildContext {
    pub db: DatabaseType,
    /// Whether a `RETURN` carries a value (functions only).
    returns_value: bool,
    /// Cursors declared without a query; assignments to them carry the query.
    open_cursors: HashSet<String>,
    /// Label of the routine or trigger body; leaving it returns early.
    body_label: Option<String>,
    builders: &'static [(SyntaxKind, BuildFn)],
}

impl BuildContext {
    fn new(db: DatabaseType, unit: &SyntaxNode) -> Self {
        let builders = match db {
            DatabaseType::Oracle => plsql::BUILDERS,
            // T-SQL statements all map through the shared table.
            DatabaseType::SqlServer => &[],
            DatabaseType::MySql => mysql::BUILDERS,
            DatabaseType::Postgres => postgres::BUILDERS,
        };
        let mut open_cursors = HashSet::new();
        collect_open_cursors(unit, &mut open_cursors);
        Self {
            db,
            returns_value: unit.kind == SyntaxKind::Function,
            open_cursors,
            body_label: label(unit),
            builders,
        }
    }

    fn builder(&self, kind: SyntaxKind) -> Option<BuildFn> {
        self.builders
            .iter()
            .chain(COMMON_BUILDERS)
            .find(|(k, _)| *k == kind)
            .map(|(_, f)| *f)
    }

    /// Statements for one node.
    pub fn statement(&self, node: &SyntaxNode) -> Result<Vec<Statement>> {
        match self.builder(node.kind) {
            Some(build) => build(self, node),
            None => {
                debug!(kind = ?node.kind, line = node.line, text = %node.text, "skipping node");
                Ok(Vec::new())
            }
        }
    }

    /// Statements of every child of a `Body` node.
    pub fn body(&self, body: &SyntaxNode) -> Result<Vec<Statement>> {
        let mut out = Vec::new();
        for child in &body.children {
            out.extend(self.statement(child)?);
        }
        Ok(out)
    }

    /// Statements of the `Body` child of `node`; empty when there is none.
    pub fn child_body(&self, node: &SyntaxNode) -> Result<Vec<Statement>> {
        match node.child(SyntaxKind::Body) {
            Some(body) => self.body(body),
            None => Ok(Vec::new()),
        }
    }

    pub fn unsupported(&self, construct: &str) -> ConvertError {
        ConvertError::unsupported(self.db, construct)
    }

    // ===== Scripts =====

    fn script(&self, unit: &SyntaxNode) -> Result<Script> {
        match unit.kind {
            SyntaxKind::Procedure | SyntaxKind::Function => self.routine(unit).map(Script::Routine),
            SyntaxKind::Trigger => self.trigger(unit).map(Script::Trigger),
            SyntaxKind::View => self.view(unit).map(Script::View),
            _ => {
                let (declarations, statements) = self.unit_body(unit)?;
                Ok(Script::Common(CommonScript {
                    declarations,
                    statements,
                }))
            }
        }
    }

    fn routine(&self, unit: &SyntaxNode) -> Result<RoutineScript> {
        let kind = if unit.kind == SyntaxKind::Function {
            RoutineKind::Function
        } else {
            RoutineKind::Procedure
        };
        let parameters = match unit.child(SyntaxKind::ParameterList) {
            Some(list) => list
                .children_of(SyntaxKind::Parameter)
                .map(|p| self.parameter(p))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        let (declarations, statements) = self.unit_body(unit)?;
        Ok(RoutineScript {
            kind,
            name: object_name(unit),
            parameters,
            return_type: unit
                .child(SyntaxKind::ReturnType)
                .map(|t| Token::new(TokenKind::DataType, t.text.clone())),
            declarations,
            statements,
        })
    }

    fn parameter(&self, node: &SyntaxNode) -> Result<Parameter> {
        let name = require(node, SyntaxKind::Name, TokenKind::ParameterName)?;
        let direction = match node.child_text(SyntaxKind::Mode).map(normalized_words) {
            Some(mode) => match mode.as_str() {
                "OUT" | "OUTPUT" => ParameterDirection::Out,
                "IN OUT" | "INOUT" => ParameterDirection::InOut,
                _ => ParameterDirection::In,
            },
            None => ParameterDirection::In,
        };
        Ok(Parameter {
            name: Token::new(TokenKind::ParameterName, name.text),
            data_type: require(node, SyntaxKind::DataType, TokenKind::DataType)?,
            direction,
            default: child_token(node, SyntaxKind::Default, TokenKind::Expression),
        })
    }

    /// Declarations, body and routine-level handlers of a unit.
    fn unit_body(&self, unit: &SyntaxNode) -> Result<(Vec<Statement>, Vec<Statement>)> {
        let mut declarations = Vec::new();
        if let Some(section) = unit.child(SyntaxKind::DeclareSection) {
            declarations.extend(self.statement(section)?);
        }
        if let Some(section) = unit.child(SyntaxKind::ExceptionSection) {
            declarations.push(Statement::Exception(ExceptionStatement {
                handlers: self.handlers(section)?,
            }));
        }
        let statements = self.child_body(unit)?;
        Ok((declarations, statements))
    }

    fn trigger(&self, unit: &SyntaxNode) -> Result<TriggerScript> {
        let timing = match unit.child_text(SyntaxKind::Timing).map(normalized_words).as_deref() {
            Some("BEFORE") => TriggerTiming::Before,
            Some("INSTEAD OF") => TriggerTiming::InsteadOf,
            _ => TriggerTiming::After,
        };
        let events = unit
            .children_of(SyntaxKind::Event)
            .filter_map(|e| match e.text.to_ascii_uppercase().as_str() {
                "INSERT" => Some(TriggerEvent::Insert),
                "UPDATE" => Some(TriggerEvent::Update),
                "DELETE" => Some(TriggerEvent::Delete),
                _ => None,
            })
            .collect();
        let (declarations, statements) = self.unit_body(unit)?;
        Ok(TriggerScript {
            name: object_name(unit),
            table: require(unit, SyntaxKind::TableName, TokenKind::TableName)?,
            timing,
            events,
            for_each_row: unit.has(SyntaxKind::ForEachRow),
            condition: child_token(unit, SyntaxKind::Condition, TokenKind::Condition),
            declarations,
            statements,
        })
    }

    fn view(&self, unit: &SyntaxNode) -> Result<ViewScript> {
        let query = unit
            .child(SyntaxKind::Select)
            .ok_or_else(|| missing(unit, "query"))?;
        Ok(ViewScript {
            name: object_name(unit),
            columns: unit
                .child(SyntaxKind::ColumnList)
                .map(|l| names(l, SyntaxKind::Name, TokenKind::ColumnName))
                .unwrap_or_default(),
            query: self.select(query)?,
        })
    }

    /// Handlers of an `ExceptionSection` node.
    pub fn handlers(&self, section: &SyntaxNode) -> Result<Vec<ExceptionHandler>> {
        section
            .children_of(SyntaxKind::Handler)
            .map(|h| {
                Ok(ExceptionHandler {
                    conditions: h
                        .children_of(SyntaxKind::Name)
                        .map(|n| normalized_words(&n.text))
                        .collect(),
                    statements: self.child_body(h)?,
                })
            })
            .collect()
    }

    // ===== Queries =====

    pub fn select(&self, node: &SyntaxNode) -> Result<SelectStatement> {
        let mut select = SelectStatement::default();
        let mut assign_targets = Vec::new();
        for child in &node.children {
            match child.kind {
                SyntaxKind::With => {
                    for cte in child.children_of(SyntaxKind::Cte) {
                        let query = cte.child(SyntaxKind::Select).ok_or_else(|| missing(cte, "query"))?;
                        select.with.push(CommonTableExpression {
                            name: require(cte, SyntaxKind::Name, TokenKind::TableName)?,
                            columns: cte
                                .child(SyntaxKind::ColumnList)
                                .map(|l| names(l, SyntaxKind::Name, TokenKind::ColumnName))
                                .unwrap_or_default(),
                            query: self.select(query)?,
                        });
                    }
                }
                SyntaxKind::Distinct => select.distinct = true,
                SyntaxKind::Top => select.top = Some(child.to_token(TokenKind::Expression)),
                SyntaxKind::SelectItem => {
                    if let Some(target) = child.child(SyntaxKind::AssignTarget) {
                        assign_targets.push(Token::new(TokenKind::VariableName, target.text.clone()));
                    }
                    select.columns.push(SelectItem {
                        expression: require(child, SyntaxKind::Expression, TokenKind::Expression)?,
                        alias: child_token(child, SyntaxKind::Alias, TokenKind::Alias),
                    });
                }
                SyntaxKind::IntoVariables => {
                    select.into = Some(SelectInto::Variables(names(child, SyntaxKind::Target, TokenKind::VariableName)));
                }
                SyntaxKind::IntoTable => {
                    select.into = Some(SelectInto::Table {
                        name: require(child, SyntaxKind::Name, TokenKind::TableName)?,
                        temporary: false,
                    });
                }
                SyntaxKind::From => select.from = self.from_items(child)?,
                SyntaxKind::Where => select.where_clause = Some(child.to_token(TokenKind::Condition)),
                SyntaxKind::GroupBy => {
                    select.group_by = tokens(child, SyntaxKind::Expression, TokenKind::Expression);
                }
                SyntaxKind::Having => select.having = Some(child.to_token(TokenKind::Condition)),
                SyntaxKind::OrderBy => {
                    select.order_by = tokens(child, SyntaxKind::Expression, TokenKind::Expression);
                }
                SyntaxKind::Limit => {
                    let count = child
                        .child(SyntaxKind::Count)
                        .ok_or_else(|| self.unsupported("OFFSET without a row limit"))?;
                    select.limit = Some(LimitClause {
                        offset: child_token(child, SyntaxKind::Offset, TokenKind::Expression),
                        count: count.to_token(TokenKind::Expression),
                    });
                }
                SyntaxKind::Union => {
                    let kind = match child.child_text(SyntaxKind::UnionType).map(normalized_words).as_deref() {
                        Some("UNION ALL") => UnionKind::UnionAll,
                        Some("EXCEPT") | Some("MINUS") => UnionKind::Except,
                        Some("INTERSECT") => UnionKind::Intersect,
                        _ => UnionKind::Union,
                    };
                    let branch = child.child(SyntaxKind::Select).ok_or_else(|| missing(child, "query"))?;
                    select.unions.push(UnionItem {
                        kind,
                        select: self.select(branch)?,
                    });
                }
                _ => {}
            }
        }
        if !assign_targets.is_empty() {
            select.into = Some(SelectInto::Variables(assign_targets));
        }
        Ok(select)
    }

    pub fn from_items(&self, from: &SyntaxNode) -> Result<Vec<FromItem>> {
        from.children_of(SyntaxKind::TableRef)
            .map(|table_ref| {
                let joins = table_ref
                    .children_of(SyntaxKind::Join)
                    .map(|join| {
                        let kind = match join.child_text(SyntaxKind::JoinType).map(normalized_words) {
                            Some(t) if t.starts_with("LEFT") => JoinKind::Left,
                            Some(t) if t.starts_with("RIGHT") => JoinKind::Right,
                            Some(t) if t.starts_with("FULL") => JoinKind::Full,
                            Some(t) if t.starts_with("CROSS") => JoinKind::Cross,
                            _ => JoinKind::Inner,
                        };
                        Ok(JoinItem {
                            kind,
                            source: table_source(join)?,
                            alias: child_token(join, SyntaxKind::Alias, TokenKind::Alias),
                            on: child_token(join, SyntaxKind::On, TokenKind::Condition),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FromItem {
                    source: table_source(table_ref)?,
                    alias: child_token(table_ref, SyntaxKind::Alias, TokenKind::Alias),
                    joins,
                })
            })
            .collect()
    }
}

/// Builders shared by every dialect.
/// Data types of cursor variables.
const REF_CURSOR_TYPES: &[&str] = &["SYS_REFCURSOR", "REFCURSOR"];

const COMMON_BUILDERS: &[(SyntaxKind, BuildFn)] = &[
    (SyntaxKind::Select, build_select),
    (SyntaxKind::Insert, build_insert),
    (SyntaxKind::Update, build_update),
    (SyntaxKind::Delete, build_delete),
    (SyntaxKind::Assignment, build_assignment),
    (SyntaxKind::If, build_if),
    (SyntaxKind::Case, build_case),
    (SyntaxKind::Loop, build_loop),
    (SyntaxKind::While, build_while),
    (SyntaxKind::ForLoop, build_for),
    (SyntaxKind::Exit, build_exit),
    (SyntaxKind::Continue, build_continue),
    (SyntaxKind::DeclareSection, build_declarations),
    (SyntaxKind::Open, build_open),
    (SyntaxKind::Fetch, build_fetch),
    (SyntaxKind::Close, build_close),
    (SyntaxKind::Deallocate, build_close),
    (SyntaxKind::Return, build_return),
    (SyntaxKind::Print, build_print),
    (SyntaxKind::Raise, build_raise),
    (SyntaxKind::Call, build_call),
    (SyntaxKind::ExecuteDynamic, build_execute_dynamic),
    (SyntaxKind::Goto, build_goto),
    (SyntaxKind::LabelDecl, build_label),
    (SyntaxKind::Transaction, build_transaction),
    (SyntaxKind::NestedBlock, build_nested_block),
    (SyntaxKind::TryCatch, build_try_catch),
    (SyntaxKind::CreateTable, build_create_table),
    (SyntaxKind::Truncate, build_truncate),
    (SyntaxKind::Drop, build_drop),
    (SyntaxKind::Null, build_null),
];

fn build_select(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Select(ctx.select(node)?)])
}

fn build_insert(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let source = match node.child(SyntaxKind::Select) {
        Some(query) => InsertSource::Select(Box::new(ctx.select(query)?)),
        None => InsertSource::Values(
            node.children_of(SyntaxKind::Values)
                .map(|row| tokens(row, SyntaxKind::Expression, TokenKind::Expression))
                .collect(),
        ),
    };
    Ok(vec![Statement::Insert(InsertStatement {
        table: require(node, SyntaxKind::TableName, TokenKind::TableName)?,
        columns: node
            .child(SyntaxKind::ColumnList)
            .map(|l| names(l, SyntaxKind::Name, TokenKind::ColumnName))
            .unwrap_or_default(),
        source,
    })])
}

fn build_update(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let target_ref = node
        .child(SyntaxKind::TableRef)
        .ok_or_else(|| missing(node, "table"))?;
    let set_items = node
        .children_of(SyntaxKind::SetItem)
        .map(|item| {
            Ok(SetItem {
                column: require(item, SyntaxKind::Target, TokenKind::ColumnName)?,
                value: require(item, SyntaxKind::Value, TokenKind::Expression)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // `UPDATE t JOIN u ...`: the target reference carries the joins.
    let wrapper = SyntaxNode::marker(SyntaxKind::From).with_children(vec![target_ref.clone()]);
    let mut target = ctx
        .from_items(&wrapper)?
        .into_iter()
        .next()
        .ok_or_else(|| missing(node, "table"))?;
    let target_joins = std::mem::take(&mut target.joins);
    let mut from = match node.child(SyntaxKind::From) {
        Some(from) => ctx.from_items(from)?,
        None => Vec::new(),
    };

    let (table, alias) = resolve_target(&target, &mut from, target_joins);
    Ok(vec![Statement::Update(UpdateStatement {
        table,
        alias,
        set_items,
        from,
        where_clause: child_token(node, SyntaxKind::Where, TokenKind::Condition),
    })])
}

/// Find the real table behind an UPDATE/DELETE target and make sure a joined
/// statement's FROM list contains it.
///
/// `target` is the reference written after the verb; it may be an alias
/// defined in `from`. Returns the canonical table name and the alias used.
fn resolve_target(target: &FromItem, from: &mut Vec<FromItem>, target_joins: Vec<JoinItem>) -> (Token, Option<Token>) {
    let handle = target.handle().to_string();
    if let Some(item) = from.iter().find(|i| i.alias.as_ref().is_some_and(|a| a.text.eq_ignore_ascii_case(&handle))) {
        return (item.source.clone(), item.alias.clone());
    }
    if let Some(item) = from
        .iter()
        .find(|i| i.alias.is_none() && i.source.text.eq_ignore_ascii_case(&handle))
    {
        return (item.source.clone(), target.alias.clone());
    }
    if !target_joins.is_empty() || !from.is_empty() {
        let mut item = target.clone();
        item.joins = target_joins;
        from.insert(0, item);
    }
    (target.source.clone(), target.alias.clone())
}

fn build_delete(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let mut from = match node.child(SyntaxKind::From) {
        Some(from) => ctx.from_items(from)?,
        None => Vec::new(),
    };
    if let Some(using) = node.child(SyntaxKind::Using) {
        from.extend(ctx.from_items(using)?);
    }
    let (table, alias) = match node.child(SyntaxKind::Target) {
        Some(target) => {
            let target = FromItem::table(Token::new(TokenKind::TableName, target.text.clone()));
            resolve_target(&target, &mut from, Vec::new())
        }
        None => {
            if from.is_empty() {
                return Err(missing(node, "table"));
            }
            let first = from[0].clone();
            if from.len() == 1 && first.joins.is_empty() {
                from.clear();
            }
            (first.source, first.alias)
        }
    };
    Ok(vec![Statement::Delete(DeleteStatement {
        table,
        alias,
        from,
        where_clause: child_token(node, SyntaxKind::Where, TokenKind::Condition),
    })])
}

fn build_assignment(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let target = node.child(SyntaxKind::Target).ok_or_else(|| missing(node, "target"))?;
    let key = Token::new(TokenKind::VariableName, target.text.clone());
    let query = node.child(SyntaxKind::Select);
    let value = match (node.child(SyntaxKind::Value), query) {
        (None, Some(query)) => SetValue::Query(Box::new(ctx.select(query)?)),
        (Some(_), Some(query)) if ctx.open_cursors.contains(&cursor_key(&target.text)) => {
            SetValue::Query(Box::new(ctx.select(query)?))
        }
        (Some(value), _) => SetValue::Expression(value.to_token(TokenKind::Expression)),
        (None, None) => return Err(missing(node, "value")),
    };
    Ok(vec![Statement::Set(SetStatement { key, value })])
}

fn build_if(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let items = node
        .children_of(SyntaxKind::IfBranch)
        .map(|branch| {
            Ok(IfItem {
                condition: require(branch, SyntaxKind::Condition, TokenKind::Condition)?,
                statements: ctx.child_body(branch)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let else_statements = match node.child(SyntaxKind::ElseBranch) {
        Some(branch) => Some(ctx.child_body(branch)?),
        None => None,
    };
    Ok(vec![Statement::If(IfStatement { items, else_statements })])
}

fn build_case(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let items = node
        .children_of(SyntaxKind::When)
        .map(|when| {
            Ok(CaseItem {
                when: require(when, SyntaxKind::Condition, TokenKind::Condition)?,
                statements: ctx.child_body(when)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let else_statements = match node.child(SyntaxKind::ElseBranch) {
        Some(branch) => Some(ctx.child_body(branch)?),
        None => None,
    };
    Ok(vec![Statement::Case(CaseStatement {
        selector: child_token(node, SyntaxKind::Selector, TokenKind::Expression),
        items,
        else_statements,
    })])
}

fn build_loop(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Loop(LoopStatement {
        kind: LoopKind::Basic,
        label: label(node),
        statements: ctx.child_body(node)?,
    })])
}

fn build_while(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::While(WhileStatement {
        condition: require(node, SyntaxKind::Condition, TokenKind::Condition)?,
        label: label(node),
        statements: ctx.child_body(node)?,
    })])
}

pub(crate) fn build_for(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let iterator = require(node, SyntaxKind::Name, TokenKind::VariableName)?;
    let range = if let Some(query) = node.child(SyntaxKind::Select) {
        ForRange::Query(Box::new(ctx.select(query)?))
    } else if let Some(cursor) = node.child(SyntaxKind::CursorName) {
        ForRange::Cursor(Token::new(TokenKind::CursorName, cursor.text.clone()))
    } else {
        let range = node.child(SyntaxKind::Range).ok_or_else(|| missing(node, "loop range"))?;
        let mut bounds = range.children_of(SyntaxKind::Value);
        let (Some(lower), Some(upper)) = (bounds.next(), bounds.next()) else {
            return Err(missing(range, "loop bounds"));
        };
        ForRange::Numeric {
            lower: lower.to_token(TokenKind::Expression),
            upper: upper.to_token(TokenKind::Expression),
            reverse: node.has(SyntaxKind::Reverse),
        }
    };
    Ok(vec![Statement::Loop(LoopStatement {
        kind: LoopKind::For {
            iterator: Token::new(TokenKind::VariableName, iterator.text),
            range,
        },
        label: label(node),
        statements: ctx.child_body(node)?,
    })])
}

fn build_exit(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let condition = child_token(node, SyntaxKind::Condition, TokenKind::Condition);
    let label = label(node);
    let leaves_body = match (&label, &ctx.body_label) {
        (Some(target), Some(body)) => condition.is_none() && target.eq_ignore_ascii_case(body),
        _ => false,
    };
    if leaves_body {
        return Ok(vec![Statement::Leave]);
    }
    Ok(vec![Statement::LoopExit(LoopExitStatement {
        condition,
        label,
        cursor: None,
    })])
}

fn build_continue(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Continue(ContinueStatement {
        condition: child_token(node, SyntaxKind::Condition, TokenKind::Condition),
        label: label(node),
    })])
}

pub(crate) fn build_declarations(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let mut out = Vec::new();
    for item in &node.children {
        match item.kind {
            // Cursor variables (`c SYS_REFCURSOR`, `c refcursor`) get their query when opened.
            SyntaxKind::VariableDecl
                if item
                    .child_text(SyntaxKind::DataType)
                    .is_some_and(|t| REF_CURSOR_TYPES.iter().any(|r| t.trim().eq_ignore_ascii_case(r))) =>
            {
                out.push(Statement::Declare(Declaration::Cursor(CursorDeclaration {
                    name: require(item, SyntaxKind::Name, TokenKind::CursorName)?,
                    query: None,
                })));
            }
            SyntaxKind::VariableDecl => out.push(Statement::Declare(Declaration::Variable(VariableDeclaration {
                name: require(item, SyntaxKind::Name, TokenKind::VariableName)?,
                data_type: require(item, SyntaxKind::DataType, TokenKind::DataType)?,
                default: child_token(item, SyntaxKind::Default, TokenKind::Expression),
                constant: item.has(SyntaxKind::Constant),
            }))),
            SyntaxKind::CursorDecl => {
                let query = match item.child(SyntaxKind::Select) {
                    Some(q) => Some(Box::new(ctx.select(q)?)),
                    None => None,
                };
                out.push(Statement::Declare(Declaration::Cursor(CursorDeclaration {
                    name: require(item, SyntaxKind::Name, TokenKind::CursorName)?,
                    query,
                })));
            }
            SyntaxKind::TableVariableDecl => out.push(Statement::Declare(Declaration::Table(TableDeclaration {
                name: require(item, SyntaxKind::Name, TokenKind::TableName)?,
                columns: column_definitions(item)?,
            }))),
            _ => out.extend(ctx.statement(item)?),
        }
    }
    Ok(out)
}

fn build_open(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let query = match node.child(SyntaxKind::Select) {
        Some(q) => Some(Box::new(ctx.select(q)?)),
        None => None,
    };
    Ok(vec![Statement::OpenCursor(OpenCursorStatement {
        cursor: require(node, SyntaxKind::CursorName, TokenKind::CursorName)?,
        query,
    })])
}

fn build_fetch(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::FetchCursor(FetchCursorStatement {
        cursor: require(node, SyntaxKind::CursorName, TokenKind::CursorName)?,
        variables: node
            .child(SyntaxKind::IntoVariables)
            .map(|into| names(into, SyntaxKind::Target, TokenKind::VariableName))
            .unwrap_or_default(),
    })])
}

fn build_close(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::CloseCursor(CloseCursorStatement {
        cursor: require(node, SyntaxKind::CursorName, TokenKind::CursorName)?,
        deallocate: node.kind == SyntaxKind::Deallocate,
    })])
}

fn build_return(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let value = child_token(node, SyntaxKind::Value, TokenKind::Expression);
    if value.is_none() && !ctx.returns_value {
        return Ok(vec![Statement::Leave]);
    }
    Ok(vec![Statement::Return(ReturnStatement { value })])
}

fn build_print(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let content = require(node, SyntaxKind::Value, TokenKind::Expression)?;
    let arguments = tokens(node, SyntaxKind::Argument, TokenKind::Expression);
    Ok(vec![Statement::Print(PrintStatement {
        content: splice_placeholders(ctx.db, content, &arguments)?,
    })])
}

fn build_raise(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let message = match node.child(SyntaxKind::Value) {
        Some(value) => {
            let arguments = tokens(node, SyntaxKind::Argument, TokenKind::Expression);
            Some(splice_placeholders(ctx.db, value.to_token(TokenKind::Expression), &arguments)?)
        }
        None => None,
    };
    Ok(vec![Statement::RaiseError(RaiseErrorStatement {
        code: child_token(node, SyntaxKind::Code, TokenKind::Expression),
        message,
    })])
}

pub(crate) fn build_call(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Call(CallStatement {
        kind: CallKind::Procedure,
        name: require(node, SyntaxKind::Name, TokenKind::RoutineName)?,
        arguments: tokens(node, SyntaxKind::Argument, TokenKind::Expression),
    })])
}

fn build_execute_dynamic(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    if node.has(SyntaxKind::IntoVariables) {
        return Err(ctx.unsupported("dynamic SQL with INTO"));
    }
    Ok(vec![Statement::Call(CallStatement {
        kind: CallKind::Dynamic,
        name: require(node, SyntaxKind::Value, TokenKind::Expression)?,
        arguments: tokens(node, SyntaxKind::Argument, TokenKind::Expression),
    })])
}

fn build_goto(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let name = node.child_text(SyntaxKind::Name).ok_or_else(|| missing(node, "label"))?;
    Ok(vec![Statement::Goto(GotoStatement {
        label: name.to_string(),
    })])
}

fn build_label(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let name = node.child_text(SyntaxKind::Name).ok_or_else(|| missing(node, "label"))?;
    Ok(vec![Statement::Label(LabelStatement {
        name: name.to_string(),
    })])
}

fn build_transaction(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let first = node.text.split_whitespace().next().unwrap_or_default().to_ascii_uppercase();
    let kind = match first.as_str() {
        "COMMIT" => TransactionKind::Commit,
        "ROLLBACK" => TransactionKind::Rollback,
        _ => TransactionKind::Begin,
    };
    Ok(vec![Statement::Transaction(TransactionStatement { kind })])
}

/// `BEGIN ... END` inside a body: a try/catch when it has handlers, else its
/// declarations and statements spliced into the enclosing block.
pub(crate) fn build_nested_block(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    if let Some(section) = node.child(SyntaxKind::DeclareSection) {
        statements.extend(ctx.statement(section)?);
    }
    let body = ctx.child_body(node)?;
    match node.child(SyntaxKind::ExceptionSection) {
        Some(section) => statements.push(Statement::TryCatch(TryCatchStatement {
            try_statements: body,
            handlers: ctx.handlers(section)?,
        })),
        None => statements.extend(body),
    }
    Ok(statements)
}

fn build_try_catch(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let try_statements = match node.child(SyntaxKind::TryBlock) {
        Some(block) => ctx.child_body(block)?,
        None => Vec::new(),
    };
    let catch_statements = match node.child(SyntaxKind::CatchBlock) {
        Some(block) => ctx.child_body(block)?,
        None => Vec::new(),
    };
    Ok(vec![Statement::TryCatch(TryCatchStatement {
        try_statements,
        handlers: vec![ExceptionHandler::catch_all(catch_statements)],
    })])
}

fn build_create_table(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let as_select = match node.child(SyntaxKind::Select) {
        Some(q) => Some(Box::new(ctx.select(q)?)),
        None => None,
    };
    Ok(vec![Statement::CreateTable(CreateTableStatement {
        name: require(node, SyntaxKind::Name, TokenKind::TableName)?,
        temporary: node.has(SyntaxKind::Temporary),
        columns: column_definitions(node)?,
        as_select,
    })])
}

fn build_truncate(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Truncate(TruncateStatement {
        table: require(node, SyntaxKind::TableName, TokenKind::TableName)?,
    })])
}

fn build_drop(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let object_type = match node.child_text(SyntaxKind::ObjectType).map(|t| t.to_ascii_uppercase()).as_deref() {
        Some("TABLE") => DropObjectType::Table,
        Some("VIEW") => DropObjectType::View,
        Some("PROCEDURE") | Some("PROC") => DropObjectType::Procedure,
        Some("FUNCTION") => DropObjectType::Function,
        Some("TRIGGER") => DropObjectType::Trigger,
        Some("SEQUENCE") => DropObjectType::Sequence,
        Some("INDEX") => DropObjectType::Index,
        other => return Err(ctx.unsupported(&format!("DROP {}", other.unwrap_or("?")))),
    };
    let kind = if object_type == DropObjectType::Table {
        TokenKind::TableName
    } else {
        TokenKind::RoutineName
    };
    Ok(vec![Statement::Drop(DropStatement {
        object_type,
        name: require(node, SyntaxKind::Name, kind)?,
        if_exists: node.has(SyntaxKind::IfExists),
    })])
}

fn build_null(_ctx: &BuildContext, _node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Null])
}

// ===== Helpers =====

fn missing(node: &SyntaxNode, what: &str) -> ConvertError {
    ConvertError::syntax(node.line, node.column, format!("missing {} in {:?}", what, node.kind))
}

/// Token for the first child of a kind.
pub(crate) fn child_token(node: &SyntaxNode, kind: SyntaxKind, token_kind: TokenKind) -> Option<Token> {
    node.child(kind).map(|c| c.to_token(token_kind))
}

/// Token for a child that the grammar always produces.
pub(crate) fn require(node: &SyntaxNode, kind: SyntaxKind, token_kind: TokenKind) -> Result<Token> {
    child_token(node, kind, token_kind).ok_or_else(|| missing(node, &format!("{:?}", kind)))
}

/// Tokens for all children of a kind.
pub(crate) fn tokens(node: &SyntaxNode, kind: SyntaxKind, token_kind: TokenKind) -> Vec<Token> {
    node.children_of(kind).map(|c| c.to_token(token_kind)).collect()
}

/// Name tokens (no child references) for all children of a kind.
fn names(node: &SyntaxNode, kind: SyntaxKind, token_kind: TokenKind) -> Vec<Token> {
    node.children_of(kind)
        .map(|c| Token::new(token_kind, c.text.clone()))
        .collect()
}

fn table_source(node: &SyntaxNode) -> Result<Token> {
    if let Some(name) = node.child(SyntaxKind::TableName) {
        return Ok(Token::new(TokenKind::TableName, name.text.clone()));
    }
    require(node, SyntaxKind::Subquery, TokenKind::Subquery)
}

fn label(node: &SyntaxNode) -> Option<String> {
    node.child_text(SyntaxKind::Label).map(identifier::unquote)
}

fn column_definitions(node: &SyntaxNode) -> Result<Vec<ColumnDefinition>> {
    node.children_of(SyntaxKind::ColumnDef)
        .map(|col| {
            Ok(ColumnDefinition {
                name: require(col, SyntaxKind::Name, TokenKind::ColumnName)?,
                data_type: require(col, SyntaxKind::DataType, TokenKind::DataType)?,
                nullable: !col.has(SyntaxKind::NotNull),
                default: child_token(col, SyntaxKind::Default, TokenKind::Expression),
            })
        })
        .collect()
}

fn object_name(unit: &SyntaxNode) -> ObjectName {
    let Some(name) = unit.child_text(SyntaxKind::Name) else {
        return ObjectName::default();
    };
    let mut parts: Vec<String> = identifier::split_qualified(name)
        .iter()
        .map(|p| identifier::unquote(p))
        .collect();
    let base = parts.pop().unwrap_or_default();
    ObjectName::new(parts.join("."), base)
}

/// Upper-case text with single spaces between words.
pub(crate) fn normalized_words(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comparison key for a cursor or variable name.
pub(crate) fn cursor_key(name: &str) -> String {
    identifier::strip_variable_sigil(&identifier::unquote(name)).to_ascii_lowercase()
}

fn collect_open_cursors(node: &SyntaxNode, out: &mut HashSet<String>) {
    for child in &node.children {
        if child.kind == SyntaxKind::CursorDecl && !child.has(SyntaxKind::Select) {
            if let Some(name) = child.child_text(SyntaxKind::Name) {
                out.insert(cursor_key(name));
            }
        }
        collect_open_cursors(child, out);
    }
}

/// Expression token for `text`, with its references scanned in `db`.
pub(crate) fn expression_token(db: DatabaseType, text: String) -> Result<Token> {
    let children = parser::scan_references(db, &text)?;
    Ok(Token::new(TokenKind::Expression, text).with_children(children))
}

/// Splice arguments into the `%` placeholders of a string-literal message.
///
/// PostgreSQL marks a placeholder with a bare `%`; T-SQL uses printf-style
/// `%s`/`%d` with optional flags and width. `%%` is a literal percent sign in
/// both. The result is a `CONCAT(...)` of literal pieces and arguments; a
/// message without arguments is returned unchanged.
pub(crate) fn splice_placeholders(db: DatabaseType, message: Token, arguments: &[Token]) -> Result<Token> {
    let text = message.text.trim();
    if arguments.is_empty() || text.len() < 2 || !text.starts_with('\'') || !text.ends_with('\'') {
        return Ok(message);
    }
    let inner = &text[1..text.len() - 1];
    let mut parts: Vec<String> = Vec::new();
    let mut literal = String::new();
    let mut args = arguments.iter();
    let mut chars = inner.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if ch != '%' {
            literal.push(ch);
            continue;
        }
        if chars.peek().is_some_and(|(_, c)| *c == '%') {
            chars.next();
            literal.push('%');
            continue;
        }
        if db == DatabaseType::SqlServer {
            while chars.peek().is_some_and(|(_, c)| "-+ 0#".contains(*c) || c.is_ascii_digit()) {
                chars.next();
            }
            if chars.peek().is_some_and(|(_, c)| "sdiuoxX".contains(*c)) {
                chars.next();
            }
        }
        let Some(arg) = args.next() else {
            literal.push('%');
            continue;
        };
        if !literal.is_empty() {
            parts.push(format!("'{}'", std::mem::take(&mut literal)));
        }
        parts.push(arg.text.clone());
    }
    if !literal.is_empty() {
        parts.push(format!("'{}'", literal));
    }
    let text = match parts.len() {
        0 => "''".to_string(),
        1 => parts.remove(0),
        _ => format!("CONCAT({})", parts.join(", ")),
    };
    expression_token(db, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn procedure(db: DatabaseType, sql: &str) -> RoutineScript {
        match parse(db, sql, ParseMode::Procedure).unwrap() {
            Script::Routine(r) => r,
            other => panic!("expected a routine, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_function_script_header() {
        let script = parse(
            DatabaseType::Oracle,
            "CREATE OR REPLACE FUNCTION hr.F(a IN NUMBER, b OUT VARCHAR2) RETURN NUMBER AS BEGIN RETURN NVL(a,0); END;",
            ParseMode::Function,
        )
        .unwrap();
        let Script::Routine(routine) = script else {
            panic!("expected a routine");
        };
        assert_eq!(routine.kind, RoutineKind::Function);
        assert_eq!(routine.name, ObjectName::new("hr", "F"));
        assert_eq!(routine.parameters.len(), 2);
        assert_eq!(routine.parameters[1].direction, ParameterDirection::Out);
        assert_eq!(routine.return_type.as_ref().map(|t| t.text.as_str()), Some("NUMBER"));
        match &routine.statements[0] {
            Statement::Return(r) => {
                let value = r.value.as_ref().unwrap();
                assert_eq!(value.text, "NVL(a,0)");
                assert_eq!(value.function_calls().count(), 1);
            }
            other => panic!("unexpected statement {}", other.kind_name()),
        }
    }

    #[test]
    fn test_bare_return_in_procedure_is_leave() {
        let routine = procedure(DatabaseType::Oracle, "CREATE PROCEDURE p AS BEGIN IF 1 = 1 THEN RETURN; END IF; END;");
        let Statement::If(stmt) = &routine.statements[0] else {
            panic!("expected IF");
        };
        assert_eq!(stmt.items[0].statements, vec![Statement::Leave]);
    }

    #[test]
    fn test_leaving_the_body_label_is_an_early_return() {
        let routine = procedure(
            DatabaseType::MySql,
            "CREATE PROCEDURE p(IN n INT) sp: BEGIN \
             l1: LOOP LEAVE l1; END LOOP; \
             IF n = 0 THEN LEAVE SP; END IF; SELECT 1; END;",
        );
        assert!(matches!(
            &routine.statements[0],
            Statement::Loop(l) if matches!(&l.statements[0], Statement::LoopExit(_))
        ));
        let Statement::If(stmt) = &routine.statements[1] else {
            panic!("expected IF");
        };
        assert_eq!(stmt.items[0].statements, vec![Statement::Leave]);
    }

    #[test]
    fn test_update_with_join_resolves_alias() {
        let routine = procedure(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS UPDATE o SET o.total = s.total FROM orders o JOIN sums s ON s.id = o.id",
        );
        let Statement::Update(update) = &routine.statements[0] else {
            panic!("expected UPDATE");
        };
        assert_eq!(update.table.text, "orders");
        assert_eq!(update.alias.as_ref().unwrap().text, "o");
        assert_eq!(update.from.len(), 1);
        assert_eq!(update.from[0].joins.len(), 1);
    }

    #[test]
    fn test_mysql_update_join_moves_into_from() {
        let routine = procedure(
            DatabaseType::MySql,
            "CREATE PROCEDURE p() BEGIN UPDATE orders o JOIN sums s ON s.id = o.id SET o.total = s.total; END",
        );
        let Statement::Update(update) = &routine.statements[0] else {
            panic!("expected UPDATE");
        };
        assert_eq!(update.table.text, "orders");
        assert_eq!(update.from[0].source.text, "orders");
        assert_eq!(update.from[0].joins[0].source.text, "sums");
    }

    #[test]
    fn test_plain_delete_has_no_from() {
        let routine = procedure(DatabaseType::Postgres, "CREATE PROCEDURE p() LANGUAGE plpgsql AS $$ BEGIN DELETE FROM t WHERE id = 1; END $$");
        let Statement::Delete(delete) = &routine.statements[0] else {
            panic!("expected DELETE");
        };
        assert_eq!(delete.table.text, "t");
        assert!(delete.from.is_empty());
    }

    #[test]
    fn test_splice_placeholders() {
        let msg = Token::expression("'row % of %'");
        let args = vec![Token::expression("i"), Token::expression("n")];
        let out = splice_placeholders(DatabaseType::Postgres, msg, &args).unwrap();
        assert_eq!(out.text, "CONCAT('row ', i, ' of ', n)");
        assert_eq!(out.function_calls().count(), 1);

        let msg = Token::expression("'bad value %d (100%%)'");
        let out = splice_placeholders(DatabaseType::SqlServer, msg, &[Token::expression("@v")]).unwrap();
        assert_eq!(out.text, "CONCAT('bad value ', @v, ' (100%)')");
    }

    #[test]
    fn test_unknown_statements_are_skipped() {
        let routine = procedure(DatabaseType::SqlServer, "CREATE PROCEDURE p AS SET NOCOUNT ON; SELECT 1");
        assert_eq!(routine.statements.len(), 1);
        assert!(matches!(routine.statements[0], Statement::Select(_)));
    }
}
