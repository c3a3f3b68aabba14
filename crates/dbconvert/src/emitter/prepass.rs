//! Structural rewrites applied to a script copy before rendering.

use std::collections::HashMap;

use tracing::debug;

use crate::adapter::cursor_key;
use crate::core::identifier;
use crate::dialect::DatabaseType;
use crate::model::*;

/// Bring the script into the shape the target's renderer expects.
pub fn prepare(target: DatabaseType, script: &mut Script) {
    if target != DatabaseType::Postgres {
        if let Script::Routine(routine) = script {
            void_function_to_procedure(routine);
        }
    }
    let Some((declarations, statements)) = script.bodies_mut() else {
        return;
    };
    // Oracle and PostgreSQL bind a query when a cursor variable is opened.
    let bind_at_open = matches!(target, DatabaseType::Oracle | DatabaseType::Postgres);
    merge_cursor_queries(declarations, statements, bind_at_open);
    if target != DatabaseType::MySql {
        fold_prepared(statements);
    }
    if target == DatabaseType::MySql {
        for_each_block(statements, &mut |block| {
            for stmt in block.iter_mut() {
                if let Statement::Delete(delete) = stmt {
                    unalias_delete_target(delete);
                }
            }
        });
    }
}

fn for_each_block(block: &mut Vec<Statement>, f: &mut dyn FnMut(&mut Vec<Statement>)) {
    f(block);
    for stmt in block.iter_mut() {
        for inner in stmt.blocks_mut() {
            for_each_block(inner, f);
        }
    }
}

/// A function returning nothing is a procedure everywhere but PostgreSQL.
fn void_function_to_procedure(routine: &mut RoutineScript) {
    let returns_nothing = routine
        .return_type
        .as_ref()
        .map_or(true, |t| t.text.trim().eq_ignore_ascii_case("void"));
    if routine.kind != RoutineKind::Function || !returns_nothing {
        return;
    }
    debug!(name = %routine.name.qualified(), "rendering void function as a procedure");
    routine.kind = RoutineKind::Procedure;
    routine.return_type = None;
    for_each_block(&mut routine.statements, &mut |block| {
        for stmt in block.iter_mut() {
            if matches!(stmt, Statement::Return(ReturnStatement { value: None })) {
                *stmt = Statement::Leave;
            }
        }
    });
}

// ===== Cursor queries =====

/// Move queries assigned to a cursor after its declaration back into the
/// declaration: `SET @c = CURSOR FOR SELECT ...` always, `OPEN c FOR SELECT`
/// unless the target binds queries at open time.
fn merge_cursor_queries(
    declarations: &mut [Statement],
    statements: &mut Vec<Statement>,
    bind_at_open: bool,
) {
    let mut pending: HashMap<String, usize> = declarations
        .iter()
        .enumerate()
        .filter_map(|(i, s)| match s {
            Statement::Declare(Declaration::Cursor(c)) if c.query.is_none() => {
                Some((cursor_key(&c.name.text), i))
            }
            _ => None,
        })
        .collect();
    if pending.is_empty() {
        return;
    }
    let mut merged: Vec<(usize, Box<SelectStatement>)> = Vec::new();
    for_each_block(statements, &mut |block| {
        block.retain_mut(|stmt| match stmt {
            Statement::Set(SetStatement {
                key,
                value: SetValue::Query(query),
            }) => match pending.remove(&cursor_key(&key.text)) {
                Some(index) => {
                    merged.push((index, query.clone()));
                    false
                }
                None => true,
            },
            Statement::OpenCursor(open) if !bind_at_open && open.query.is_some() => {
                if let Some(index) = pending.remove(&cursor_key(&open.cursor.text)) {
                    if let Some(query) = open.query.take() {
                        merged.push((index, query));
                    }
                }
                true
            }
            _ => true,
        });
    });
    for (index, query) in merged {
        if let Some(Statement::Declare(Declaration::Cursor(cursor))) = declarations.get_mut(index) {
            debug!(cursor = %cursor.name.text, "merged cursor query into its declaration");
            cursor.query = Some(query);
        }
    }
}

// ===== Prepared statements =====

/// Fold `PREPARE id FROM text` / `EXECUTE id` / `DEALLOCATE PREPARE id` into
/// one dynamic call per execution.
fn fold_prepared(statements: &mut Vec<Statement>) {
    let mut texts: HashMap<String, Token> = HashMap::new();
    for_each_block(statements, &mut |block| {
        let mut out = Vec::with_capacity(block.len());
        for stmt in block.drain(..) {
            match stmt {
                Statement::Prepared(PreparedStatement {
                    kind: PreparedKind::Prepare(text),
                    id,
                }) => {
                    texts.insert(id.text.to_ascii_lowercase(), text);
                }
                Statement::Prepared(PreparedStatement {
                    kind: PreparedKind::Execute(arguments),
                    id,
                }) => match texts.get(&id.text.to_ascii_lowercase()) {
                    Some(text) => out.push(Statement::Call(CallStatement {
                        kind: CallKind::Dynamic,
                        name: text.clone(),
                        arguments,
                    })),
                    None => out.push(Statement::Prepared(PreparedStatement {
                        kind: PreparedKind::Execute(arguments),
                        id,
                    })),
                },
                Statement::Prepared(PreparedStatement {
                    kind: PreparedKind::Deallocate,
                    id,
                }) if texts.contains_key(&id.text.to_ascii_lowercase()) => {}
                other => out.push(other),
            }
        }
        *block = out;
    });
}

// ===== DELETE with joins =====

/// Refer to the deleted table by its name instead of its alias.
///
/// Identifier children qualified with the alias are rewritten in the WHERE
/// clause and in every join condition; other text is left alone.
pub fn unalias_delete_target(delete: &mut DeleteStatement) {
    if delete.from.is_empty() {
        return;
    }
    let Some(alias) = delete.alias.take() else {
        return;
    };
    let alias_key = identifier::unquote(&alias.text).to_ascii_lowercase();
    let table = delete.table.text.clone();
    if identifier::unquote(&table).eq_ignore_ascii_case(&alias_key) {
        return;
    }
    let uses_table = delete
        .from
        .iter()
        .filter(|item| identifier::unquote(&item.source.text).eq_ignore_ascii_case(&identifier::unquote(&table)))
        .count()
        + delete
            .from
            .iter()
            .flat_map(|item| item.joins.iter())
            .filter(|join| identifier::unquote(&join.source.text).eq_ignore_ascii_case(&identifier::unquote(&table)))
            .count();
    if uses_table > 1 {
        // A self-join needs the alias to tell the two sides apart.
        delete.alias = Some(alias);
        return;
    }

    for item in &mut delete.from {
        if item
            .alias
            .as_ref()
            .is_some_and(|a| identifier::unquote(&a.text).eq_ignore_ascii_case(&alias_key))
        {
            item.alias = None;
        }
        for join in &mut item.joins {
            if join
                .alias
                .as_ref()
                .is_some_and(|a| identifier::unquote(&a.text).eq_ignore_ascii_case(&alias_key))
            {
                join.alias = None;
            }
            if let Some(on) = &mut join.on {
                requalify(on, &alias_key, &table);
            }
        }
    }
    if let Some(where_clause) = &mut delete.where_clause {
        requalify(where_clause, &alias_key, &table);
    }
}

/// Replace the qualifier `from` of identifier children with `to`.
fn requalify(token: &mut Token, from: &str, to: &str) -> usize {
    token.rewrite_children(|child| {
        if child.kind != TokenKind::Identifier {
            return None;
        }
        let (qualifier, rest) = child.text.split_once('.')?;
        identifier::unquote(qualifier)
            .eq_ignore_ascii_case(from)
            .then(|| format!("{}.{}", to, rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{parse, ParseMode};

    fn body(script: &Script) -> &[Statement] {
        script.statements()
    }

    #[test]
    fn test_set_cursor_query_merges_into_declaration() {
        let mut script = parse(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS BEGIN DECLARE @c CURSOR; DECLARE @id INT; \
             SET @c = CURSOR FOR SELECT id FROM t; OPEN @c; FETCH NEXT FROM @c INTO @id; \
             CLOSE @c; END",
            ParseMode::Procedure,
        )
        .unwrap();
        prepare(DatabaseType::Postgres, &mut script);
        let cursor = script
            .declarations()
            .iter()
            .find_map(|s| match s {
                Statement::Declare(Declaration::Cursor(c)) => Some(c),
                _ => None,
            })
            .unwrap();
        assert!(cursor.query.is_some());
        assert!(!body(&script).iter().any(|s| matches!(s, Statement::Set(_))));
    }

    #[test]
    fn test_open_for_merges_only_without_bind_at_open() {
        let source = "CREATE PROCEDURE p AS c SYS_REFCURSOR; BEGIN OPEN c FOR SELECT id FROM t; CLOSE c; END;";
        let mut oracle = parse(DatabaseType::Oracle, source, ParseMode::Procedure).unwrap();
        let mut mysql = oracle.clone();
        prepare(DatabaseType::Postgres, &mut oracle);
        prepare(DatabaseType::MySql, &mut mysql);
        let open_query = |s: &Script| match &s.statements()[0] {
            Statement::OpenCursor(o) => o.query.is_some(),
            other => panic!("unexpected {}", other.kind_name()),
        };
        assert!(open_query(&oracle));
        assert!(!open_query(&mysql));
    }

    #[test]
    fn test_prepared_statements_fold_into_dynamic_call() {
        let mut script = parse(
            DatabaseType::MySql,
            "CREATE PROCEDURE p() BEGIN PREPARE s FROM @sql; EXECUTE s USING @a; \
             DEALLOCATE PREPARE s; END",
            ParseMode::Procedure,
        )
        .unwrap();
        prepare(DatabaseType::Postgres, &mut script);
        assert_eq!(body(&script).len(), 1);
        match &body(&script)[0] {
            Statement::Call(call) => {
                assert_eq!(call.kind, CallKind::Dynamic);
                assert_eq!(call.name.text, "@sql");
                assert_eq!(call.arguments.len(), 1);
            }
            other => panic!("unexpected {}", other.kind_name()),
        }
    }

    #[test]
    fn test_void_function_becomes_procedure_outside_postgres() {
        let script = parse(
            DatabaseType::Postgres,
            "CREATE FUNCTION log_it(x integer) RETURNS void AS $$\nBEGIN\n  \
             IF x < 0 THEN RETURN; END IF;\n  INSERT INTO log (v) VALUES (x);\nEND;\n$$ LANGUAGE plpgsql;",
            ParseMode::Function,
        )
        .unwrap();

        let mut same = script.clone();
        prepare(DatabaseType::Postgres, &mut same);
        let Script::Routine(routine) = &same else {
            panic!("expected a routine");
        };
        assert_eq!(routine.kind, RoutineKind::Function);

        let mut mysql = script;
        prepare(DatabaseType::MySql, &mut mysql);
        let Script::Routine(routine) = &mysql else {
            panic!("expected a routine");
        };
        assert_eq!(routine.kind, RoutineKind::Procedure);
        assert!(routine.return_type.is_none());
        let Statement::If(stmt) = &routine.statements[0] else {
            panic!("expected IF");
        };
        assert_eq!(stmt.items[0].statements, vec![Statement::Leave]);
    }

    #[test]
    fn test_delete_alias_rewritten_to_table() {
        let mut script = parse(
            DatabaseType::SqlServer,
            "CREATE PROCEDURE p AS BEGIN DELETE o FROM orders o \
             JOIN customers c ON c.id = o.customer_id WHERE o.total = 0 AND c.active = 0; END",
            ParseMode::Procedure,
        )
        .unwrap();
        prepare(DatabaseType::MySql, &mut script);
        let Statement::Delete(delete) = &body(&script)[0] else {
            panic!("expected a delete");
        };
        assert!(delete.alias.is_none());
        assert_eq!(
            delete.where_clause.as_ref().unwrap().text,
            "orders.total = 0 AND c.active = 0"
        );
        let join = &delete.from[0].joins[0];
        assert_eq!(join.on.as_ref().unwrap().text, "c.id = orders.customer_id");
        assert!(delete.from[0].alias.is_none());
    }
}
