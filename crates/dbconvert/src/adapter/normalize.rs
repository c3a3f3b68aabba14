//! Dialect-neutral normalization of a freshly built script.
//!
//! Runs once per script, after building and before translation:
//!
//! 1. Source sigils are removed: T-SQL `@var` and `#temp`, PL/SQL `:NEW`/`:OLD`.
//!    Temporary tables are remembered on the statements that create them.
//! 2. Declarations and handlers anywhere in the body move to the script's
//!    declaration list. A default on a declaration that followed executable
//!    statements stays behind as an assignment.
//! 3. Cursor loops are brought to one shape: a basic loop whose body starts
//!    with the fetch followed by a cursor guard ([`LoopExitStatement::cursor`]).
//!    Exhaustion tests are recognized in every dialect's spelling, including
//!    MySQL's handler-driven `done` flags, which are removed once unused.

use std::collections::HashSet;

use tracing::debug;

use super::cursor_key;
use crate::core::identifier;
use crate::dialect::DatabaseType;
use crate::model::*;

pub fn normalize(db: DatabaseType, script: &mut Script) {
    match db {
        DatabaseType::SqlServer => strip_tsql_sigils(script),
        DatabaseType::Oracle => strip_bind_prefixes(script),
        DatabaseType::MySql | DatabaseType::Postgres => {}
    }
    let Some((declarations, statements)) = script.bodies_mut() else {
        return;
    };
    lift_declarations(declarations, statements);

    let flags = not_found_flags(declarations);
    let mut desugar = CursorLoops { flags, guards: 0 };
    desugar.block(statements, false);
    if desugar.guards > 0 && !desugar.flags.is_empty() {
        remove_flags(declarations, statements, &desugar.flags);
    }
    if desugar.guards > 0 {
        debug!(guards = desugar.guards, "normalized cursor loops");
    }
}

// ===== Sigils =====

fn strip_tsql_sigils(script: &mut Script) {
    if let Some((declarations, statements)) = script.bodies_mut() {
        walk_mut(declarations, &mut mark_temporary);
        walk_mut(statements, &mut mark_temporary);
    }
    script.visit_tokens_mut(&mut |token| {
        if token.kind.is_name() {
            token.text = strip_tsql_name(&token.text);
        }
        token.rewrite_children(|child| Some(strip_tsql_name(&child.text)));
    });
}

fn strip_tsql_name(text: &str) -> String {
    identifier::strip_temp_marker(identifier::strip_variable_sigil(text)).to_string()
}

fn mark_temporary(statement: &mut Statement) {
    match statement {
        Statement::CreateTable(create) => {
            create.temporary |= identifier::is_temp_table(&create.name.text);
        }
        Statement::Select(SelectStatement {
            into: Some(SelectInto::Table { name, temporary }),
            ..
        }) => {
            *temporary |= identifier::is_temp_table(&name.text);
        }
        _ => {}
    }
}

/// `:NEW.col` and `:OLD.col` lose the bind prefix.
fn strip_bind_prefixes(script: &mut Script) {
    fn strip(text: &str) -> Option<String> {
        let rest = text.strip_prefix(':')?;
        let upper = rest.to_ascii_uppercase();
        (upper.starts_with("NEW.") || upper.starts_with("OLD.")).then(|| rest.to_string())
    }
    script.visit_tokens_mut(&mut |token| {
        if let Some(stripped) = strip(&token.text) {
            if token.children.is_empty() {
                token.text = stripped;
                return;
            }
        }
        token.rewrite_children(|child| strip(&child.text));
    });
}

// ===== Declarations =====

fn lift_declarations(declarations: &mut Vec<Statement>, statements: &mut Vec<Statement>) {
    let mut names: HashSet<String> = declarations
        .iter()
        .filter_map(|s| match s {
            Statement::Declare(d) => Some(cursor_key(&d.name().text)),
            _ => None,
        })
        .collect();
    let mut lifted = Vec::new();
    lift_block(statements, true, &mut lifted, &mut names);
    // Handlers follow the variables they refer to.
    let (handlers, variables): (Vec<_>, Vec<_>) =
        lifted.into_iter().partition(|s| matches!(s, Statement::Exception(_)));
    let split = declarations
        .iter()
        .position(|s| matches!(s, Statement::Exception(_)))
        .unwrap_or(declarations.len());
    declarations.splice(split..split, variables);
    declarations.extend(handlers);
}

fn lift_block(
    block: &mut Vec<Statement>,
    top_level: bool,
    lifted: &mut Vec<Statement>,
    names: &mut HashSet<String>,
) {
    let mut executable_seen = !top_level;
    let mut kept = Vec::with_capacity(block.len());
    for statement in block.drain(..) {
        match statement {
            Statement::Declare(Declaration::Variable(mut variable)) => {
                if executable_seen && !variable.constant {
                    if let Some(default) = variable.default.take() {
                        kept.push(Statement::Set(SetStatement {
                            key: variable.name.clone(),
                            value: SetValue::Expression(default),
                        }));
                    }
                }
                if names.insert(cursor_key(&variable.name.text)) {
                    lifted.push(Statement::Declare(Declaration::Variable(variable)));
                }
            }
            Statement::Declare(declaration) => {
                if names.insert(cursor_key(&declaration.name().text)) {
                    lifted.push(Statement::Declare(declaration));
                }
            }
            Statement::Exception(handlers) => lifted.push(Statement::Exception(handlers)),
            mut other => {
                for inner in other.blocks_mut() {
                    lift_block(inner, false, lifted, names);
                }
                executable_seen = true;
                kept.push(other);
            }
        }
    }
    *block = kept;
}

// ===== Cursor loops =====

/// What a condition says about the most recent fetch.
#[derive(Debug, Clone, PartialEq)]
enum CursorTest {
    /// True once the cursor is exhausted; names the cursor when the test does.
    Exhausted(Option<String>),
    /// True while the last fetch returned a row.
    Continues(Option<String>),
}

impl CursorTest {
    fn negate(self) -> Self {
        match self {
            CursorTest::Exhausted(c) => CursorTest::Continues(c),
            CursorTest::Continues(c) => CursorTest::Exhausted(c),
        }
    }
}

/// Classify a condition as a cursor test. `flags` holds the keys of variables
/// set by a `NOT FOUND` handler.
fn classify(text: &str, flags: &HashSet<String>) -> Option<CursorTest> {
    let text = strip_parens(text);
    let negated = text.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("NOT"))
        && text[3..].starts_with(|c: char| c.is_whitespace() || c == '(');
    if negated {
        return classify(&text[3..], flags).map(CursorTest::negate);
    }
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    classify_positive(&compact, flags)
}

fn classify_positive(compact: &str, flags: &HashSet<String>) -> Option<CursorTest> {
    let compact = strip_parens(compact);
    let upper = compact.to_ascii_uppercase();
    if let Some(name) = upper.strip_suffix("%NOTFOUND") {
        return Some(CursorTest::Exhausted(Some(compact[..name.len()].to_string())));
    }
    if let Some(name) = upper.strip_suffix("%FOUND") {
        return Some(CursorTest::Continues(Some(compact[..name.len()].to_string())));
    }
    match upper.as_str() {
        "FOUND" => return Some(CursorTest::Continues(None)),
        "@@FETCH_STATUS<>0" | "@@FETCH_STATUS!=0" | "@@FETCH_STATUS=-1" | "@@FETCH_STATUS<0" => {
            return Some(CursorTest::Exhausted(None))
        }
        "@@FETCH_STATUS=0" => return Some(CursorTest::Continues(None)),
        _ => {}
    }
    if flags.is_empty() {
        return None;
    }
    let is_flag = |name: &str| flags.contains(&cursor_key(name));
    if is_flag(&upper) {
        return Some(CursorTest::Exhausted(None));
    }
    let truthy = |v: &str| matches!(v, "1" | "TRUE");
    let falsy = |v: &str| matches!(v, "0" | "FALSE");
    if let Some((name, value)) = upper.split_once("<>").or_else(|| upper.split_once("!=")) {
        if is_flag(name) && truthy(value) {
            return Some(CursorTest::Continues(None));
        }
        if is_flag(name) && falsy(value) {
            return Some(CursorTest::Exhausted(None));
        }
        return None;
    }
    let (name, value) = upper.split_once('=')?;
    if !is_flag(name) {
        return None;
    }
    if truthy(value) {
        Some(CursorTest::Exhausted(None))
    } else if falsy(value) {
        Some(CursorTest::Continues(None))
    } else {
        None
    }
}

fn strip_parens(text: &str) -> &str {
    let mut text = text.trim();
    while text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// Keys of variables that a `CONTINUE HANDLER FOR NOT FOUND` sets to true.
fn not_found_flags(declarations: &[Statement]) -> HashSet<String> {
    declarations
        .iter()
        .filter_map(|s| match s {
            Statement::Exception(e) => Some(&e.handlers),
            _ => None,
        })
        .flatten()
        .filter(|h| h.conditions.iter().all(|c| c == "NOT FOUND"))
        .flat_map(|h| h.statements.iter().filter_map(flag_assignment))
        .collect()
}

/// Key of the variable a `SET flag = 1` / `SET flag = TRUE` assigns.
fn flag_assignment(statement: &Statement) -> Option<String> {
    match statement {
        Statement::Set(SetStatement {
            key,
            value: SetValue::Expression(value),
        }) if matches!(value.text.trim().to_ascii_uppercase().as_str(), "1" | "TRUE") => {
            Some(cursor_key(&key.text))
        }
        _ => None,
    }
}

fn cursor_token(name: &str) -> Token {
    Token::new(TokenKind::CursorName, name)
}

fn fetches(statement: &Statement, key: &str) -> bool {
    matches!(statement, Statement::FetchCursor(f) if cursor_key(&f.cursor.text) == key)
}

fn is_guard_for(statement: &Statement, key: &str) -> bool {
    matches!(statement, Statement::LoopExit(LoopExitStatement { cursor: Some(c), .. }) if cursor_key(&c.text) == key)
}

struct CursorLoops {
    flags: HashSet<String>,
    guards: usize,
}

impl CursorLoops {
    fn block(&mut self, block: &mut Vec<Statement>, in_loop: bool) {
        for statement in block.iter_mut() {
            let inner_loop = in_loop || statement.is_loop();
            for inner in statement.blocks_mut() {
                self.block(inner, inner_loop);
            }
        }
        self.guards_in(block, in_loop);
        self.while_loops(block);
    }

    /// Turn exhaustion exits and `IF done THEN LEAVE` into cursor guards.
    fn guards_in(&mut self, block: &mut Vec<Statement>, in_loop: bool) {
        let mut last_fetch: Option<Token> = None;
        let mut i = 0;
        while i < block.len() {
            match &mut block[i] {
                Statement::FetchCursor(f) => last_fetch = Some(f.cursor.clone()),
                Statement::LoopExit(exit) if !exit.is_cursor_guard() => {
                    let test = exit.condition.as_ref().and_then(|c| classify(&c.text, &self.flags));
                    if let Some(CursorTest::Exhausted(named)) = test {
                        if let Some(cursor) = named.as_deref().map(cursor_token).or_else(|| last_fetch.clone()) {
                            exit.condition = None;
                            exit.cursor = Some(cursor);
                            self.guards += 1;
                        }
                    }
                }
                Statement::If(stmt) => {
                    if let Some((guard, rest)) = self.if_guard(stmt, last_fetch.as_ref(), in_loop) {
                        let count = rest.len();
                        block.splice(i..=i, std::iter::once(guard).chain(rest));
                        self.guards += 1;
                        i += count;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        dedupe_guards(block);
    }

    /// `IF exhausted THEN [reset;] EXIT; END IF` becomes a guard. Inside a loop
    /// and right after a fetch, `IF continues THEN body END IF` becomes a guard
    /// followed by the body.
    fn if_guard(
        &self,
        stmt: &mut IfStatement,
        last_fetch: Option<&Token>,
        in_loop: bool,
    ) -> Option<(Statement, Vec<Statement>)> {
        if stmt.items.len() != 1 || stmt.else_statements.is_some() {
            return None;
        }
        let item = &mut stmt.items[0];
        let test = classify(&item.condition.text, &self.flags)?;
        let (named, exhausted) = match test {
            CursorTest::Exhausted(named) => (named, true),
            CursorTest::Continues(named) => (named, false),
        };
        let cursor = named.as_deref().map(cursor_token).or_else(|| last_fetch.cloned())?;

        if !exhausted {
            if !in_loop || last_fetch.is_none() {
                return None;
            }
            let guard = Statement::LoopExit(LoopExitStatement::cursor_exhausted(cursor));
            return Some((guard, std::mem::take(&mut item.statements)));
        }

        let (last, resets) = item.statements.split_last()?;
        let Statement::LoopExit(exit) = last else {
            return None;
        };
        if exit.condition.is_some() || !resets.iter().all(|s| flag_assignment_any(s, &self.flags)) {
            return None;
        }
        let guard = Statement::LoopExit(LoopExitStatement {
            condition: None,
            label: exit.label.clone(),
            cursor: Some(cursor),
        });
        Some((guard, Vec::new()))
    }

    /// `WHILE continues DO ... FETCH ... END` becomes a basic loop that
    /// fetches first and exits through a guard.
    fn while_loops(&mut self, block: &mut Vec<Statement>) {
        let mut i = 0;
        while i < block.len() {
            let Statement::While(while_stmt) = &mut block[i] else {
                i += 1;
                continue;
            };
            let Some(CursorTest::Continues(named)) = classify(&while_stmt.condition.text, &self.flags) else {
                i += 1;
                continue;
            };
            let fetched = while_stmt.statements.iter().find_map(|s| match s {
                Statement::FetchCursor(f) => Some(f.cursor.clone()),
                _ => None,
            });
            let cursor = match (named, fetched) {
                (Some(name), Some(f)) if cursor_key(&name) == cursor_key(&f.text) => f,
                (None, Some(f)) => f,
                _ => {
                    i += 1;
                    continue;
                }
            };
            let key = cursor_key(&cursor.text);
            let mut body = std::mem::take(&mut while_stmt.statements);
            let label = while_stmt.label.take();

            let mut primed = false;
            if body.len() > 1 && body.last().is_some_and(|s| fetches(s, &key)) && !fetches(&body[0], &key) {
                if let Some(fetch) = body.pop() {
                    body.insert(0, fetch);
                    primed = true;
                }
            }
            if let Some(pos) = body.iter().position(|s| fetches(s, &key)) {
                if !body.get(pos + 1).is_some_and(|s| is_guard_for(s, &key)) {
                    body.insert(pos + 1, Statement::LoopExit(LoopExitStatement::cursor_exhausted(cursor)));
                }
            }
            block[i] = Statement::Loop(LoopStatement {
                kind: LoopKind::Basic,
                label,
                statements: body,
            });
            self.guards += 1;
            if primed && i > 0 && fetches(&block[i - 1], &key) {
                block.remove(i - 1);
                continue;
            }
            i += 1;
        }
    }
}

fn flag_assignment_any(statement: &Statement, flags: &HashSet<String>) -> bool {
    match statement {
        Statement::Set(SetStatement { key, .. }) => flags.contains(&cursor_key(&key.text)),
        _ => false,
    }
}

/// Drop a guard that repeats an earlier one with no fetch in between.
fn dedupe_guards(block: &mut Vec<Statement>) {
    let mut guarded: HashSet<String> = HashSet::new();
    block.retain(|s| match s {
        Statement::FetchCursor(f) => {
            guarded.remove(&cursor_key(&f.cursor.text));
            true
        }
        Statement::LoopExit(LoopExitStatement { cursor: Some(c), .. }) => guarded.insert(cursor_key(&c.text)),
        _ => true,
    });
}

/// Remove the handlers that drive `flags`, the constant assignments to them,
/// and their declarations once nothing reads them.
fn remove_flags(declarations: &mut Vec<Statement>, statements: &mut Vec<Statement>, flags: &HashSet<String>) {
    declarations.retain_mut(|s| match s {
        Statement::Exception(e) => {
            e.handlers.retain(|h| {
                !(h.conditions.iter().all(|c| c == "NOT FOUND")
                    && h.statements.iter().all(|st| flag_assignment_any(st, flags)))
            });
            !e.handlers.is_empty()
        }
        _ => true,
    });
    remove_flag_assignments(statements, flags);

    let mut referenced: HashSet<String> = HashSet::new();
    for statement in statements.iter_mut() {
        statement.visit_tokens_mut(&mut |token| {
            if token.kind.is_name() {
                referenced.insert(cursor_key(&token.text));
            }
            for id in token.identifiers() {
                referenced.insert(cursor_key(&id.text));
            }
        });
    }
    declarations.retain(|s| match s {
        Statement::Declare(Declaration::Variable(v)) => {
            let key = cursor_key(&v.name.text);
            !flags.contains(&key) || referenced.contains(&key)
        }
        _ => true,
    });
}

fn remove_flag_assignments(block: &mut Vec<Statement>, flags: &HashSet<String>) {
    block.retain(|s| {
        !matches!(s, Statement::Set(SetStatement { key, value: SetValue::Expression(v) })
            if flags.contains(&cursor_key(&key.text))
                && matches!(v.text.trim().to_ascii_uppercase().as_str(), "0" | "1" | "TRUE" | "FALSE"))
    });
    for statement in block.iter_mut() {
        for inner in statement.blocks_mut() {
            remove_flag_assignments(inner, flags);
        }
    }
}

fn walk_mut(statements: &mut [Statement], f: &mut dyn FnMut(&mut Statement)) {
    for statement in statements {
        f(statement);
        for inner in statement.blocks_mut() {
            walk_mut(inner, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{parse, ParseMode};

    fn flags(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn loop_body(statement: &Statement) -> &[Statement] {
        match statement {
            Statement::Loop(LoopStatement {
                kind: LoopKind::Basic,
                statements,
                ..
            }) => statements,
            other => panic!("expected a basic loop, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_classify_cursor_tests() {
        let none = HashSet::new();
        assert_eq!(
            classify("c1%NOTFOUND", &none),
            Some(CursorTest::Exhausted(Some("c1".into())))
        );
        assert_eq!(
            classify("NOT (c1 % FOUND)", &none),
            Some(CursorTest::Exhausted(Some("c1".into())))
        );
        assert_eq!(classify("NOT FOUND", &none), Some(CursorTest::Exhausted(None)));
        assert_eq!(classify("@@FETCH_STATUS = 0", &none), Some(CursorTest::Continues(None)));
        assert_eq!(classify("@@FETCH_STATUS <> 0", &none), Some(CursorTest::Exhausted(None)));
        assert_eq!(classify("done", &none), None);

        let done = flags(&["done"]);
        assert_eq!(classify("done", &done), Some(CursorTest::Exhausted(None)));
        assert_eq!(classify("done = 1", &done), Some(CursorTest::Exhausted(None)));
        assert_eq!(classify("NOT done", &done), Some(CursorTest::Continues(None)));
        assert_eq!(classify("done = FALSE", &done), Some(CursorTest::Continues(None)));
        assert_eq!(classify("other = 1", &done), None);
    }

    #[test]
    fn test_tsql_fetch_status_loop() {
        let script = parse(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS
             DECLARE @id INT
             DECLARE c CURSOR FOR SELECT id FROM #ids
             OPEN c
             FETCH NEXT FROM c INTO @id
             WHILE @@FETCH_STATUS = 0
             BEGIN
                 PRINT @id
                 FETCH NEXT FROM c INTO @id
             END
             CLOSE c
             DEALLOCATE c",
            ParseMode::Procedure,
        )
        .unwrap();
        let statements = script.statements();
        assert_eq!(statements.len(), 4, "{:#?}", statements);
        assert!(matches!(statements[0], Statement::OpenCursor(_)));
        let body = loop_body(&statements[1]);
        match &body[0] {
            Statement::FetchCursor(f) => assert_eq!(f.variables[0].text, "id"),
            other => panic!("unexpected {}", other.kind_name()),
        }
        assert!(is_guard_for(&body[1], "c"));
        assert!(matches!(&body[2], Statement::Print(p) if p.content.text == "id"));
        assert_eq!(body.len(), 3);

        let Statement::Declare(Declaration::Cursor(cursor)) = &script.declarations()[1] else {
            panic!("expected cursor declaration");
        };
        let query = cursor.query.as_ref().unwrap();
        assert_eq!(query.from[0].source.text, "ids");
    }

    #[test]
    fn test_mysql_done_flag_loop() {
        let script = parse(
            DatabaseType::MySql,
            "CREATE PROCEDURE p()
             BEGIN
                 DECLARE done INT DEFAULT 0;
                 DECLARE v INT;
                 DECLARE c CURSOR FOR SELECT id FROM t;
                 DECLARE CONTINUE HANDLER FOR NOT FOUND SET done = 1;
                 OPEN c;
                 read_loop: LOOP
                     FETCH c INTO v;
                     IF done THEN
                         LEAVE read_loop;
                     END IF;
                     INSERT INTO log VALUES (v);
                 END LOOP;
                 CLOSE c;
             END",
            ParseMode::Procedure,
        )
        .unwrap();
        let declarations = script.declarations();
        assert!(declarations.iter().all(|s| !matches!(s, Statement::Exception(_))));
        assert!(!declarations
            .iter()
            .any(|s| matches!(s, Statement::Declare(d) if d.name().text == "done")));
        let body = loop_body(&script.statements()[1]);
        assert!(matches!(&body[1], Statement::LoopExit(e) if e.is_cursor_guard() && e.label.as_deref() == Some("read_loop")));
        assert!(matches!(body[2], Statement::Insert(_)));
    }

    #[test]
    fn test_oracle_exit_when_notfound() {
        let script = parse(
            DatabaseType::Oracle,
            "CREATE PROCEDURE p AS CURSOR c IS SELECT id FROM t; v NUMBER;
             BEGIN OPEN c; LOOP FETCH c INTO v; EXIT WHEN c%NOTFOUND; NULL; END LOOP; CLOSE c; END;",
            ParseMode::Procedure,
        )
        .unwrap();
        let body = loop_body(&script.statements()[1]);
        assert!(is_guard_for(&body[1], "c"));
    }

    #[test]
    fn test_postgres_exit_when_not_found_uses_preceding_fetch() {
        let script = parse(
            DatabaseType::Postgres,
            "DO $$ DECLARE c CURSOR FOR SELECT 1; v int; BEGIN OPEN c; \
             LOOP FETCH c INTO v; EXIT WHEN NOT FOUND; END LOOP; CLOSE c; END $$;",
            ParseMode::CommonBlock,
        )
        .unwrap();
        let body = loop_body(&script.statements()[1]);
        assert!(is_guard_for(&body[1], "c"));
    }

    #[test]
    fn test_late_declaration_keeps_assignment() {
        let script = parse(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS DECLARE @a INT = 1; SELECT @a; DECLARE @b INT = 2; SELECT @b;",
            ParseMode::Procedure,
        )
        .unwrap();
        let declarations = script.declarations();
        let defaults: Vec<_> = declarations
            .iter()
            .map(|s| match s {
                Statement::Declare(Declaration::Variable(v)) => (v.name.text.clone(), v.default.is_some()),
                other => panic!("unexpected {}", other.kind_name()),
            })
            .collect();
        assert_eq!(defaults, vec![("a".to_string(), true), ("b".to_string(), false)]);
        assert!(matches!(&script.statements()[1], Statement::Set(s) if s.key.text == "b"));
    }

    #[test]
    fn test_temp_table_select_into() {
        let script = parse(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS SELECT id INTO #work FROM t WHERE x = @x",
            ParseMode::Procedure,
        )
        .unwrap();
        let Statement::Select(select) = &script.statements()[0] else {
            panic!("expected SELECT");
        };
        match &select.into {
            Some(SelectInto::Table { name, temporary }) => {
                assert_eq!(name.text, "work");
                assert!(*temporary);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(select.where_clause.as_ref().unwrap().text, "x = x");
    }

    #[test]
    fn test_oracle_new_old_prefix() {
        let script = parse(
            DatabaseType::Oracle,
            "CREATE OR REPLACE TRIGGER trg BEFORE UPDATE ON t FOR EACH ROW \
             BEGIN :NEW.total := :OLD.total + 1; END;",
            ParseMode::Trigger,
        )
        .unwrap();
        let Statement::Set(set) = &script.statements()[0] else {
            panic!("expected assignment");
        };
        assert_eq!(set.key.text, "NEW.total");
        match &set.value {
            SetValue::Expression(v) => assert_eq!(v.text, "OLD.total + 1"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
