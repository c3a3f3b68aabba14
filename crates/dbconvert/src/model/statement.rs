//! Dialect-neutral statements.
//!
//! Every construct the adapters recognise is one variant of [`Statement`].
//! Emitters match on it exhaustively, so adding a variant fails the build until
//! every target dialect renders it.

use super::token::Token;

/// One statement of a routine body or script.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    /// Variable assignment.
    Set(SetStatement),
    If(IfStatement),
    Case(CaseStatement),
    Loop(LoopStatement),
    While(WhileStatement),
    /// Leave the enclosing (or labelled) loop, optionally when a condition holds.
    LoopExit(LoopExitStatement),
    /// Skip to the next iteration of the enclosing (or labelled) loop.
    Continue(ContinueStatement),
    Declare(Declaration),
    /// Routine-level exception handlers.
    Exception(ExceptionStatement),
    TryCatch(TryCatchStatement),
    OpenCursor(OpenCursorStatement),
    FetchCursor(FetchCursorStatement),
    CloseCursor(CloseCursorStatement),
    Return(ReturnStatement),
    /// Value-less return from a procedure.
    Leave,
    Print(PrintStatement),
    RaiseError(RaiseErrorStatement),
    Call(CallStatement),
    Goto(GotoStatement),
    Label(LabelStatement),
    Transaction(TransactionStatement),
    CreateTable(CreateTableStatement),
    Truncate(TruncateStatement),
    Drop(DropStatement),
    Prepared(PreparedStatement),
    /// Statement that does nothing (`NULL;`).
    Null,
}

/// Common table expression of a `WITH` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpression {
    pub name: Token,
    pub columns: Vec<Token>,
    pub query: SelectStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expression: Token,
    pub alias: Option<Token>,
}

/// Destination of `SELECT ... INTO`.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectInto {
    /// Assign the single result row to variables.
    Variables(Vec<Token>),
    /// Create a table from the result set.
    Table { name: Token, temporary: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinItem {
    pub kind: JoinKind,
    /// Table name or derived table.
    pub source: Token,
    pub alias: Option<Token>,
    pub on: Option<Token>,
}

/// One comma-separated entry of a FROM clause with its joins.
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    /// Table name or derived table.
    pub source: Token,
    pub alias: Option<Token>,
    pub joins: Vec<JoinItem>,
}

impl FromItem {
    pub fn table(source: Token) -> Self {
        Self {
            source,
            alias: None,
            joins: Vec::new(),
        }
    }

    /// Name the item is referred to by: its alias, else its source text.
    pub fn handle(&self) -> &str {
        self.alias
            .as_ref()
            .map(|a| a.text.as_str())
            .unwrap_or(self.source.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitClause {
    pub offset: Option<Token>,
    pub count: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    Union,
    UnionAll,
    Except,
    Intersect,
}

impl UnionKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            UnionKind::Union => "UNION",
            UnionKind::UnionAll => "UNION ALL",
            UnionKind::Except => "EXCEPT",
            UnionKind::Intersect => "INTERSECT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionItem {
    pub kind: UnionKind,
    pub select: SelectStatement,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub with: Vec<CommonTableExpression>,
    pub distinct: bool,
    /// Row cap written before the select list (`TOP n`).
    pub top: Option<Token>,
    pub columns: Vec<SelectItem>,
    pub into: Option<SelectInto>,
    pub from: Vec<FromItem>,
    pub where_clause: Option<Token>,
    pub group_by: Vec<Token>,
    pub having: Option<Token>,
    pub order_by: Vec<Token>,
    pub limit: Option<LimitClause>,
    pub unions: Vec<UnionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Token>>),
    Select(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: Token,
    pub columns: Vec<Token>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub column: Token,
    pub value: Token,
}

/// `UPDATE`.
///
/// When `from` is non-empty it contains the updated table itself (found by
/// name or alias) plus the other joined or listed tables.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: Token,
    pub alias: Option<Token>,
    pub set_items: Vec<SetItem>,
    pub from: Vec<FromItem>,
    pub where_clause: Option<Token>,
}

/// `DELETE`.
///
/// `table` is always the canonical table name; `alias` is how the statement
/// referred to it. `from` follows the same convention as [`UpdateStatement`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: Token,
    pub alias: Option<Token>,
    pub from: Vec<FromItem>,
    pub where_clause: Option<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Expression(Token),
    /// Query assigned to a cursor variable.
    Query(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetStatement {
    pub key: Token,
    pub value: SetValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfItem {
    pub condition: Token,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// `IF` followed by every `ELSIF`, in order.
    pub items: Vec<IfItem>,
    pub else_statements: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    pub when: Token,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseStatement {
    /// Present for simple `CASE v WHEN ...`, absent for searched CASE.
    pub selector: Option<Token>,
    pub items: Vec<CaseItem>,
    pub else_statements: Option<Vec<Statement>>,
}

/// Iteration domain of a FOR loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ForRange {
    /// `lower..upper`, walked downwards when `reverse` is set.
    Numeric {
        lower: Token,
        upper: Token,
        reverse: bool,
    },
    /// Rows of an inline query.
    Query(Box<SelectStatement>),
    /// Rows of a declared cursor.
    Cursor(Token),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopKind {
    /// Unconditional loop, left through an exit statement.
    Basic,
    For { iterator: Token, range: ForRange },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopStatement {
    pub kind: LoopKind,
    pub label: Option<String>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Token,
    pub label: Option<String>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopExitStatement {
    pub condition: Option<Token>,
    pub label: Option<String>,
    /// Set when the exit tests for exhaustion of this cursor.
    pub cursor: Option<Token>,
}

impl LoopExitStatement {
    pub fn cursor_exhausted(cursor: Token) -> Self {
        Self {
            condition: None,
            label: None,
            cursor: Some(cursor),
        }
    }

    pub fn is_cursor_guard(&self) -> bool {
        self.cursor.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContinueStatement {
    pub condition: Option<Token>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub name: Token,
    pub data_type: Token,
    pub default: Option<Token>,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorDeclaration {
    pub name: Token,
    /// Missing when the query is assigned later (`SET @c = CURSOR FOR ...`).
    pub query: Option<Box<SelectStatement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: Token,
    pub data_type: Token,
    pub nullable: bool,
    pub default: Option<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDeclaration {
    pub name: Token,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Variable(VariableDeclaration),
    Cursor(CursorDeclaration),
    Table(TableDeclaration),
}

impl Declaration {
    pub fn name(&self) -> &Token {
        match self {
            Declaration::Variable(v) => &v.name,
            Declaration::Cursor(c) => &c.name,
            Declaration::Table(t) => &t.name,
        }
    }
}

/// Handler for one or more named conditions (`WHEN NO_DATA_FOUND OR ...`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    /// Condition names; `OTHERS` catches everything.
    pub conditions: Vec<String>,
    pub statements: Vec<Statement>,
}

impl ExceptionHandler {
    pub fn catch_all(statements: Vec<Statement>) -> Self {
        Self {
            conditions: vec!["OTHERS".to_string()],
            statements,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.conditions.iter().any(|c| {
            c.eq_ignore_ascii_case("OTHERS") || c.eq_ignore_ascii_case("SQLEXCEPTION")
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionStatement {
    pub handlers: Vec<ExceptionHandler>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryCatchStatement {
    pub try_statements: Vec<Statement>,
    pub handlers: Vec<ExceptionHandler>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenCursorStatement {
    pub cursor: Token,
    /// Query bound at open time (`OPEN c FOR SELECT ...`).
    pub query: Option<Box<SelectStatement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCursorStatement {
    pub cursor: Token,
    pub variables: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloseCursorStatement {
    pub cursor: Token,
    /// Also release the cursor (`DEALLOCATE`).
    pub deallocate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStatement {
    pub content: Token,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaiseErrorStatement {
    /// Error number or SQLSTATE as written; `None` means "use the default".
    pub code: Option<Token>,
    /// Message; `None` together with `code` re-raises the current error.
    pub message: Option<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Stored procedure call.
    Procedure,
    /// Function evaluated for its side effects; the result is discarded.
    Function,
    /// Dynamic SQL held in an expression.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStatement {
    pub kind: CallKind,
    /// Routine name, or the SQL text expression for dynamic calls.
    pub name: Token,
    pub arguments: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GotoStatement {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStatement {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStatement {
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub name: Token,
    pub temporary: bool,
    pub columns: Vec<ColumnDefinition>,
    pub as_select: Option<Box<SelectStatement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruncateStatement {
    pub table: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropObjectType {
    Table,
    View,
    Procedure,
    Function,
    Trigger,
    Sequence,
    Index,
}

impl DropObjectType {
    pub fn keyword(&self) -> &'static str {
        match self {
            DropObjectType::Table => "TABLE",
            DropObjectType::View => "VIEW",
            DropObjectType::Procedure => "PROCEDURE",
            DropObjectType::Function => "FUNCTION",
            DropObjectType::Trigger => "TRIGGER",
            DropObjectType::Sequence => "SEQUENCE",
            DropObjectType::Index => "INDEX",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropStatement {
    pub object_type: DropObjectType,
    pub name: Token,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreparedKind {
    /// `PREPARE id FROM text`.
    Prepare(Token),
    /// `EXECUTE id USING args`.
    Execute(Vec<Token>),
    Deallocate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub kind: PreparedKind,
    pub id: Token,
}

impl SelectStatement {
    /// Visit every token of the query, nested queries included.
    pub fn visit_tokens_mut(&mut self, f: &mut dyn FnMut(&mut Token)) {
        for cte in &mut self.with {
            f(&mut cte.name);
            cte.columns.iter_mut().for_each(&mut *f);
            cte.query.visit_tokens_mut(f);
        }
        if let Some(top) = &mut self.top {
            f(top);
        }
        for item in &mut self.columns {
            f(&mut item.expression);
            if let Some(alias) = &mut item.alias {
                f(alias);
            }
        }
        match &mut self.into {
            Some(SelectInto::Variables(vars)) => vars.iter_mut().for_each(&mut *f),
            Some(SelectInto::Table { name, .. }) => f(name),
            None => {}
        }
        visit_from_mut(&mut self.from, f);
        if let Some(w) = &mut self.where_clause {
            f(w);
        }
        self.group_by.iter_mut().for_each(&mut *f);
        if let Some(h) = &mut self.having {
            f(h);
        }
        self.order_by.iter_mut().for_each(&mut *f);
        if let Some(limit) = &mut self.limit {
            if let Some(offset) = &mut limit.offset {
                f(offset);
            }
            f(&mut limit.count);
        }
        for union in &mut self.unions {
            union.select.visit_tokens_mut(f);
        }
    }

    /// Whether the query or any union branch has a FROM clause.
    pub fn has_from(&self) -> bool {
        !self.from.is_empty()
    }
}

fn visit_from_mut(items: &mut [FromItem], f: &mut dyn FnMut(&mut Token)) {
    for item in items {
        f(&mut item.source);
        if let Some(alias) = &mut item.alias {
            f(alias);
        }
        for join in &mut item.joins {
            f(&mut join.source);
            if let Some(alias) = &mut join.alias {
                f(alias);
            }
            if let Some(on) = &mut join.on {
                f(on);
            }
        }
    }
}

fn visit_columns_mut(columns: &mut [ColumnDefinition], f: &mut dyn FnMut(&mut Token)) {
    for col in columns {
        f(&mut col.name);
        f(&mut col.data_type);
        if let Some(d) = &mut col.default {
            f(d);
        }
    }
}

fn visit_handlers_mut(handlers: &mut [ExceptionHandler], f: &mut dyn FnMut(&mut Token)) {
    for handler in handlers {
        for stmt in &mut handler.statements {
            stmt.visit_tokens_mut(f);
        }
    }
}

impl Statement {
    /// Short name of the variant, used in diagnostics and unsupported-construct errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Set(_) => "SET",
            Statement::If(_) => "IF",
            Statement::Case(_) => "CASE",
            Statement::Loop(_) => "LOOP",
            Statement::While(_) => "WHILE",
            Statement::LoopExit(_) => "EXIT",
            Statement::Continue(_) => "CONTINUE",
            Statement::Declare(Declaration::Variable(_)) => "DECLARE variable",
            Statement::Declare(Declaration::Cursor(_)) => "DECLARE CURSOR",
            Statement::Declare(Declaration::Table(_)) => "DECLARE TABLE",
            Statement::Exception(_) => "EXCEPTION",
            Statement::TryCatch(_) => "TRY/CATCH",
            Statement::OpenCursor(_) => "OPEN",
            Statement::FetchCursor(_) => "FETCH",
            Statement::CloseCursor(_) => "CLOSE",
            Statement::Return(_) => "RETURN",
            Statement::Leave => "LEAVE",
            Statement::Print(_) => "PRINT",
            Statement::RaiseError(_) => "RAISE",
            Statement::Call(_) => "CALL",
            Statement::Goto(_) => "GOTO",
            Statement::Label(_) => "LABEL",
            Statement::Transaction(_) => "TRANSACTION",
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::Truncate(_) => "TRUNCATE",
            Statement::Drop(_) => "DROP",
            Statement::Prepared(_) => "PREPARE",
            Statement::Null => "NULL",
        }
    }

    /// Nested statement blocks, in source order.
    pub fn blocks(&self) -> Vec<&Vec<Statement>> {
        match self {
            Statement::If(s) => {
                let mut out: Vec<_> = s.items.iter().map(|i| &i.statements).collect();
                out.extend(s.else_statements.as_ref());
                out
            }
            Statement::Case(s) => {
                let mut out: Vec<_> = s.items.iter().map(|i| &i.statements).collect();
                out.extend(s.else_statements.as_ref());
                out
            }
            Statement::Loop(s) => vec![&s.statements],
            Statement::While(s) => vec![&s.statements],
            Statement::Exception(s) => s.handlers.iter().map(|h| &h.statements).collect(),
            Statement::TryCatch(s) => {
                let mut out = vec![&s.try_statements];
                out.extend(s.handlers.iter().map(|h| &h.statements));
                out
            }
            _ => Vec::new(),
        }
    }

    /// Mutable access to nested statement blocks, in source order.
    pub fn blocks_mut(&mut self) -> Vec<&mut Vec<Statement>> {
        match self {
            Statement::If(s) => {
                let mut out: Vec<_> = s.items.iter_mut().map(|i| &mut i.statements).collect();
                out.extend(s.else_statements.as_mut());
                out
            }
            Statement::Case(s) => {
                let mut out: Vec<_> = s.items.iter_mut().map(|i| &mut i.statements).collect();
                out.extend(s.else_statements.as_mut());
                out
            }
            Statement::Loop(s) => vec![&mut s.statements],
            Statement::While(s) => vec![&mut s.statements],
            Statement::Exception(s) => s.handlers.iter_mut().map(|h| &mut h.statements).collect(),
            Statement::TryCatch(s) => {
                let mut out = vec![&mut s.try_statements];
                out.extend(s.handlers.iter_mut().map(|h| &mut h.statements));
                out
            }
            _ => Vec::new(),
        }
    }

    /// Whether this is a loop statement.
    pub fn is_loop(&self) -> bool {
        matches!(self, Statement::Loop(_) | Statement::While(_))
    }

    /// Visit every token owned by the statement and its nested statements.
    pub fn visit_tokens_mut(&mut self, f: &mut dyn FnMut(&mut Token)) {
        match self {
            Statement::Select(s) => s.visit_tokens_mut(f),
            Statement::Insert(s) => {
                f(&mut s.table);
                s.columns.iter_mut().for_each(&mut *f);
                match &mut s.source {
                    InsertSource::Values(rows) => {
                        for row in rows {
                            row.iter_mut().for_each(&mut *f);
                        }
                    }
                    InsertSource::Select(q) => q.visit_tokens_mut(f),
                }
            }
            Statement::Update(s) => {
                f(&mut s.table);
                if let Some(a) = &mut s.alias {
                    f(a);
                }
                for item in &mut s.set_items {
                    f(&mut item.column);
                    f(&mut item.value);
                }
                visit_from_mut(&mut s.from, f);
                if let Some(w) = &mut s.where_clause {
                    f(w);
                }
            }
            Statement::Delete(s) => {
                f(&mut s.table);
                if let Some(a) = &mut s.alias {
                    f(a);
                }
                visit_from_mut(&mut s.from, f);
                if let Some(w) = &mut s.where_clause {
                    f(w);
                }
            }
            Statement::Set(s) => {
                f(&mut s.key);
                match &mut s.value {
                    SetValue::Expression(t) => f(t),
                    SetValue::Query(q) => q.visit_tokens_mut(f),
                }
            }
            Statement::If(s) => {
                for item in &mut s.items {
                    f(&mut item.condition);
                    item.statements.iter_mut().for_each(|st| st.visit_tokens_mut(f));
                }
                if let Some(els) = &mut s.else_statements {
                    els.iter_mut().for_each(|st| st.visit_tokens_mut(f));
                }
            }
            Statement::Case(s) => {
                if let Some(sel) = &mut s.selector {
                    f(sel);
                }
                for item in &mut s.items {
                    f(&mut item.when);
                    item.statements.iter_mut().for_each(|st| st.visit_tokens_mut(f));
                }
                if let Some(els) = &mut s.else_statements {
                    els.iter_mut().for_each(|st| st.visit_tokens_mut(f));
                }
            }
            Statement::Loop(s) => {
                if let LoopKind::For { iterator, range } = &mut s.kind {
                    f(iterator);
                    match range {
                        ForRange::Numeric { lower, upper, .. } => {
                            f(lower);
                            f(upper);
                        }
                        ForRange::Query(q) => q.visit_tokens_mut(f),
                        ForRange::Cursor(c) => f(c),
                    }
                }
                s.statements.iter_mut().for_each(|st| st.visit_tokens_mut(f));
            }
            Statement::While(s) => {
                f(&mut s.condition);
                s.statements.iter_mut().for_each(|st| st.visit_tokens_mut(f));
            }
            Statement::LoopExit(s) => {
                if let Some(c) = &mut s.condition {
                    f(c);
                }
                if let Some(c) = &mut s.cursor {
                    f(c);
                }
            }
            Statement::Continue(s) => {
                if let Some(c) = &mut s.condition {
                    f(c);
                }
            }
            Statement::Declare(Declaration::Variable(d)) => {
                f(&mut d.name);
                f(&mut d.data_type);
                if let Some(v) = &mut d.default {
                    f(v);
                }
            }
            Statement::Declare(Declaration::Cursor(d)) => {
                f(&mut d.name);
                if let Some(q) = &mut d.query {
                    q.visit_tokens_mut(f);
                }
            }
            Statement::Declare(Declaration::Table(d)) => {
                f(&mut d.name);
                visit_columns_mut(&mut d.columns, f);
            }
            Statement::Exception(s) => visit_handlers_mut(&mut s.handlers, f),
            Statement::TryCatch(s) => {
                s.try_statements.iter_mut().for_each(|st| st.visit_tokens_mut(f));
                visit_handlers_mut(&mut s.handlers, f);
            }
            Statement::OpenCursor(s) => {
                f(&mut s.cursor);
                if let Some(q) = &mut s.query {
                    q.visit_tokens_mut(f);
                }
            }
            Statement::FetchCursor(s) => {
                f(&mut s.cursor);
                s.variables.iter_mut().for_each(&mut *f);
            }
            Statement::CloseCursor(s) => f(&mut s.cursor),
            Statement::Return(s) => {
                if let Some(v) = &mut s.value {
                    f(v);
                }
            }
            Statement::Print(s) => f(&mut s.content),
            Statement::RaiseError(s) => {
                if let Some(c) = &mut s.code {
                    f(c);
                }
                if let Some(m) = &mut s.message {
                    f(m);
                }
            }
            Statement::Call(s) => {
                f(&mut s.name);
                s.arguments.iter_mut().for_each(&mut *f);
            }
            Statement::CreateTable(s) => {
                f(&mut s.name);
                visit_columns_mut(&mut s.columns, f);
                if let Some(q) = &mut s.as_select {
                    q.visit_tokens_mut(f);
                }
            }
            Statement::Truncate(s) => f(&mut s.table),
            Statement::Drop(s) => f(&mut s.name),
            Statement::Prepared(s) => {
                f(&mut s.id);
                match &mut s.kind {
                    PreparedKind::Prepare(text) => f(text),
                    PreparedKind::Execute(args) => args.iter_mut().for_each(&mut *f),
                    PreparedKind::Deallocate => {}
                }
            }
            Statement::Transaction(_)
            | Statement::Goto(_)
            | Statement::Label(_)
            | Statement::Leave
            | Statement::Null => {}
        }
    }
}

/// Walk a statement list depth-first, calling `f` on every statement.
pub fn walk<'a>(statements: &'a [Statement], f: &mut dyn FnMut(&'a Statement)) {
    for stmt in statements {
        f(stmt);
        for block in stmt.blocks() {
            walk(block, f);
        }
    }
}

/// Whether any statement in the list (nested blocks included) satisfies `pred`.
pub fn any_statement(statements: &[Statement], pred: &dyn Fn(&Statement) -> bool) -> bool {
    statements
        .iter()
        .any(|s| pred(s) || s.blocks().into_iter().any(|b| any_statement(b, pred)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_when(cond: &str) -> Statement {
        Statement::LoopExit(LoopExitStatement {
            condition: Some(Token::condition(cond)),
            ..Default::default()
        })
    }

    #[test]
    fn test_blocks_follow_source_order() {
        let stmt = Statement::If(IfStatement {
            items: vec![
                IfItem {
                    condition: Token::condition("a > 1"),
                    statements: vec![Statement::Null],
                },
                IfItem {
                    condition: Token::condition("a > 0"),
                    statements: vec![Statement::Leave, Statement::Null],
                },
            ],
            else_statements: Some(vec![]),
        });
        let sizes: Vec<_> = stmt.blocks().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1, 2, 0]);
    }

    #[test]
    fn test_visit_tokens_reaches_nested_statements() {
        let mut stmt = Statement::While(WhileStatement {
            condition: Token::condition("i < 10"),
            label: None,
            statements: vec![exit_when("i = 5")],
        });
        let mut seen = Vec::new();
        stmt.visit_tokens_mut(&mut |t| seen.push(t.text.clone()));
        assert_eq!(seen, vec!["i < 10", "i = 5"]);
    }

    #[test]
    fn test_any_statement_descends() {
        let body = vec![Statement::Loop(LoopStatement {
            kind: LoopKind::Basic,
            label: None,
            statements: vec![exit_when("done")],
        })];
        assert!(any_statement(&body, &|s| matches!(s, Statement::LoopExit(_))));
        assert!(!any_statement(&body, &|s| matches!(s, Statement::Goto(_))));
    }

    #[test]
    fn test_from_item_handle() {
        let mut item = FromItem::table(Token::new(crate::model::TokenKind::TableName, "orders"));
        assert_eq!(item.handle(), "orders");
        item.alias = Some(Token::new(crate::model::TokenKind::Alias, "o"));
        assert_eq!(item.handle(), "o");
    }
}
