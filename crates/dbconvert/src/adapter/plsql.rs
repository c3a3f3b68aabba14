//! PL/SQL statement builders.

use super::{build_call, tokens, BuildContext, BuildFn};
use crate::error::Result;
use crate::model::*;
use crate::parser::{SyntaxKind, SyntaxNode};

pub(super) const BUILDERS: &[(SyntaxKind, BuildFn)] = &[(SyntaxKind::Call, build_package_call)];

/// Procedure calls, with the two built-in packages that have statement
/// counterparts turned into those statements.
fn build_package_call(ctx: &BuildContext, node: &SyntaxNode) -> Result<Vec<Statement>> {
    let name = node.child_text(SyntaxKind::Name).unwrap_or_default().to_ascii_uppercase();
    let mut arguments = tokens(node, SyntaxKind::Argument, TokenKind::Expression);
    match name.as_str() {
        "DBMS_OUTPUT.PUT_LINE" | "SYS.DBMS_OUTPUT.PUT_LINE" if arguments.len() == 1 => {
            Ok(vec![Statement::Print(PrintStatement {
                content: arguments.remove(0),
            })])
        }
        "RAISE_APPLICATION_ERROR" if arguments.len() >= 2 => {
            let code = arguments.remove(0);
            let message = arguments.remove(0);
            Ok(vec![Statement::RaiseError(RaiseErrorStatement {
                code: Some(code),
                message: Some(message),
            })])
        }
        _ => build_call(ctx, node),
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::{parse, ParseMode};
    use crate::dialect::DatabaseType;
    use crate::model::*;

    #[test]
    fn test_put_line_becomes_print() {
        let script = parse(
            DatabaseType::Oracle,
            "BEGIN DBMS_OUTPUT.PUT_LINE('v=' || v); my_proc(1, 'a'); END;",
            ParseMode::CommonBlock,
        )
        .unwrap();
        let statements = script.statements();
        match &statements[0] {
            Statement::Print(p) => assert_eq!(p.content.text, "'v=' || v"),
            other => panic!("unexpected {}", other.kind_name()),
        }
        match &statements[1] {
            Statement::Call(c) => {
                assert_eq!(c.kind, CallKind::Procedure);
                assert_eq!(c.name.text, "my_proc");
                assert_eq!(c.arguments.len(), 2);
            }
            other => panic!("unexpected {}", other.kind_name()),
        }
    }

    #[test]
    fn test_raise_application_error() {
        let script = parse(
            DatabaseType::Oracle,
            "BEGIN RAISE_APPLICATION_ERROR(-20001, 'bad input'); END;",
            ParseMode::CommonBlock,
        )
        .unwrap();
        let Statement::RaiseError(raise) = &script.statements()[0] else {
            panic!("expected a raise");
        };
        assert_eq!(raise.code.as_ref().unwrap().text, "-20001");
        assert_eq!(raise.message.as_ref().unwrap().text, "'bad input'");
    }

    #[test]
    fn test_exception_section_lands_in_declarations() {
        let script = parse(
            DatabaseType::Oracle,
            "CREATE PROCEDURE p AS v NUMBER; BEGIN SELECT 1 INTO v FROM dual; \
             EXCEPTION WHEN NO_DATA_FOUND THEN v := 0; WHEN OTHERS THEN RAISE; END;",
            ParseMode::Procedure,
        )
        .unwrap();
        let handlers = script
            .declarations()
            .iter()
            .find_map(|s| match s {
                Statement::Exception(e) => Some(&e.handlers),
                _ => None,
            })
            .expect("exception statement");
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].conditions, vec!["NO_DATA_FOUND".to_string()]);
        assert!(handlers[1].is_catch_all());
        assert!(matches!(
            handlers[1].statements[0],
            Statement::RaiseError(RaiseErrorStatement { code: None, message: None })
        ));
    }
}
