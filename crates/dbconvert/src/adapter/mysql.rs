//! MySQL statement builders.

use super::{label, normalized_words, require, tokens, BuildContext, BuildFn};
use crate::error::Result;
use crate::model::*;
use crate::parser::{SyntaxKind, SyntaxNode};

pub(super) const BUILDERS: &[(SyntaxKind, BuildFn)] = &[
    (SyntaxKind::HandlerDecl, build_handler),
    (SyntaxKind::Repeat, build_repeat),
    (SyntaxKind::Prepare, build_prepare),
    (SyntaxKind::ExecutePrepared, build_execute_prepared),
    (SyntaxKind::DeallocatePrepare, build_deallocate_prepare),
];

/// SQLSTATE class that means "no row".
const NO_DATA_SQLSTATE: &str = "SQLSTATE '02000'";

/// `DECLARE {CONTINUE|EXIT} HANDLER FOR cond, ... statement`.
///
/// Every handler becomes an exception statement; the normalizer later drops
/// the `NOT FOUND` handlers that only drive cursor loops.
fn build_handler(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let conditions = node
        .children_of(SyntaxKind::Name)
        .map(|c| {
            let condition = normalized_words(&c.text).replace("SQLSTATE VALUE", "SQLSTATE");
            if condition == NO_DATA_SQLSTATE {
                "NOT FOUND".to_string()
            } else {
                condition
            }
        })
        .collect();
    Ok(vec![Statement::Exception(ExceptionStatement {
        handlers: vec![ExceptionHandler {
            conditions,
            statements: ctx.child_body(node)?,
        }],
    })])
}

/// `REPEAT body UNTIL cond END REPEAT` runs the body at least once, so it is a
/// basic loop whose last statement exits on the condition.
fn build_repeat(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let mut statements = ctx.child_body(node)?;
    statements.push(Statement::LoopExit(LoopExitStatement {
        condition: Some(require(node, SyntaxKind::Condition, TokenKind::Condition)?),
        label: label(node),
        cursor: None,
    }));
    Ok(vec![Statement::Loop(LoopStatement {
        kind: LoopKind::Basic,
        label: label(node),
        statements,
    })])
}

fn build_prepare(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Prepared(PreparedStatement {
        kind: PreparedKind::Prepare(require(node, SyntaxKind::Value, TokenKind::Expression)?),
        id: require(node, SyntaxKind::Name, TokenKind::Identifier)?,
    })])
}

fn build_execute_prepared(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Prepared(PreparedStatement {
        kind: PreparedKind::Execute(tokens(node, SyntaxKind::Argument, TokenKind::Expression)),
        id: require(node, SyntaxKind::Name, TokenKind::Identifier)?,
    })])
}

fn build_deallocate_prepare(_ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    Ok(vec![Statement::Prepared(PreparedStatement {
        kind: PreparedKind::Deallocate,
        id: require(node, SyntaxKind::Name, TokenKind::Identifier)?,
    })])
}

#[cfg(test)]
mod tests {
    use crate::adapter::{parse, ParseMode};
    use crate::dialect::DatabaseType;
    use crate::model::*;

    #[test]
    fn test_repeat_becomes_basic_loop_with_trailing_exit() {
        let script = parse(
            DatabaseType::MySql,
            "CREATE PROCEDURE p() BEGIN DECLARE i INT DEFAULT 0; \
             REPEAT SET i = i + 1; UNTIL i >= 10 END REPEAT; END",
            ParseMode::Procedure,
        )
        .unwrap();
        let Statement::Loop(lp) = &script.statements()[0] else {
            panic!("expected a loop");
        };
        assert_eq!(lp.kind, LoopKind::Basic);
        match lp.statements.last() {
            Some(Statement::LoopExit(exit)) => {
                assert_eq!(exit.condition.as_ref().unwrap().text, "i >= 10");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exit_handler_is_exception() {
        let script = parse(
            DatabaseType::MySql,
            "CREATE PROCEDURE p() BEGIN DECLARE EXIT HANDLER FOR SQLEXCEPTION ROLLBACK; \
             START TRANSACTION; COMMIT; END",
            ParseMode::Procedure,
        )
        .unwrap();
        let handler = script
            .declarations()
            .iter()
            .find_map(|s| match s {
                Statement::Exception(e) => e.handlers.first(),
                _ => None,
            })
            .expect("handler");
        assert!(handler.is_catch_all());
        assert!(matches!(
            handler.statements[0],
            Statement::Transaction(TransactionStatement {
                kind: TransactionKind::Rollback
            })
        ));
    }

    #[test]
    fn test_prepared_statements() {
        let script = parse(
            DatabaseType::MySql,
            "CREATE PROCEDURE p() BEGIN PREPARE stmt FROM @sql; EXECUTE stmt USING @a; \
             DEALLOCATE PREPARE stmt; END",
            ParseMode::Procedure,
        )
        .unwrap();
        let kinds: Vec<_> = script
            .statements()
            .iter()
            .map(|s| match s {
                Statement::Prepared(p) => p.kind.clone(),
                other => panic!("unexpected {}", other.kind_name()),
            })
            .collect();
        assert!(matches!(kinds[0], PreparedKind::Prepare(_)));
        assert!(matches!(&kinds[1], PreparedKind::Execute(args) if args.len() == 1));
        assert_eq!(kinds[2], PreparedKind::Deallocate);
    }

    #[test]
    fn test_multi_assignment_set_is_flattened() {
        let script = parse(
            DatabaseType::MySql,
            "CREATE PROCEDURE p() BEGIN DECLARE a INT; DECLARE b INT; SET a = 1, b = 2; END",
            ParseMode::Procedure,
        )
        .unwrap();
        assert_eq!(script.statements().len(), 2);
        assert!(script.statements().iter().all(|s| matches!(s, Statement::Set(_))));
    }
}
