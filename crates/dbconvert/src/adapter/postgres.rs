//! PL/pgSQL statement builders.

use super::{build_for, require, tokens, BuildContext, BuildFn};
use crate::error::Result;
use crate::model::*;
use crate::parser::{SyntaxKind, SyntaxNode};

pub(super) const BUILDERS: &[(SyntaxKind, BuildFn)] = &[
    (SyntaxKind::ForLoop, build_pg_for),
    (SyntaxKind::Perform, build_perform),
];

/// `FOR i IN REVERSE hi..lo` writes the upper bound first.
fn build_pg_for(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let mut statements = build_for(ctx, node)?;
    for statement in &mut statements {
        if let Statement::Loop(LoopStatement {
            kind: LoopKind::For {
                range: ForRange::Numeric { lower, upper, reverse: true },
                ..
            },
            ..
        }) = statement
        {
            std::mem::swap(lower, upper);
        }
    }
    Ok(statements)
}

/// `PERFORM f(args)` is a function call for its side effects; any other
/// `PERFORM expr` evaluates a one-column query.
fn build_perform(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    if node.has(SyntaxKind::Name) {
        return Ok(vec![Statement::Call(CallStatement {
            kind: CallKind::Function,
            name: require(node, SyntaxKind::Name, TokenKind::RoutineName)?,
            arguments: tokens(node, SyntaxKind::Argument, TokenKind::Expression),
        })]);
    }
    let value = require(node, SyntaxKind::Value, TokenKind::Expression)?;
    if value.text.trim_start().to_ascii_uppercase().starts_with("SELECT") {
        return Err(ctx.unsupported("PERFORM with a query"));
    }
    Ok(vec![Statement::Select(SelectStatement {
        columns: vec![SelectItem {
            expression: value,
            alias: None,
        }],
        ..Default::default()
    })])
}

#[cfg(test)]
mod tests {
    use crate::adapter::{parse, ParseMode};
    use crate::dialect::DatabaseType;
    use crate::model::*;

    fn block(sql: &str) -> Vec<Statement> {
        parse(DatabaseType::Postgres, sql, ParseMode::CommonBlock)
            .unwrap()
            .statements()
            .to_vec()
    }

    #[test]
    fn test_reverse_for_swaps_bounds() {
        let statements = block("DO $$ BEGIN FOR i IN REVERSE 10..1 LOOP RAISE NOTICE '%', i; END LOOP; END $$;");
        let Statement::Loop(LoopStatement {
            kind: LoopKind::For { range, .. },
            ..
        }) = &statements[0]
        else {
            panic!("expected FOR loop");
        };
        match range {
            ForRange::Numeric { lower, upper, reverse } => {
                assert_eq!(lower.text, "1");
                assert_eq!(upper.text, "10");
                assert!(*reverse);
            }
            other => panic!("unexpected range {:?}", other),
        }
    }

    #[test]
    fn test_perform_function_call() {
        let statements = block("DO $$ BEGIN PERFORM log_event('x', 1); END $$;");
        match &statements[0] {
            Statement::Call(c) => {
                assert_eq!(c.kind, CallKind::Function);
                assert_eq!(c.name.text, "log_event");
                assert_eq!(c.arguments.len(), 2);
            }
            other => panic!("unexpected {}", other.kind_name()),
        }
    }

    #[test]
    fn test_raise_notice_is_print_with_spliced_arguments() {
        let statements = block("DO $$ BEGIN RAISE NOTICE 'count: %', n; END $$;");
        match &statements[0] {
            Statement::Print(p) => assert_eq!(p.content.text, "CONCAT('count: ', n)"),
            other => panic!("unexpected {}", other.kind_name()),
        }
    }
}
