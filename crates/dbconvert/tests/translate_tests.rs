//! End-to-end translation scenarios.

use std::collections::HashSet;

use dbconvert::adapter::parse;
use dbconvert::emitter::{render, EmitOptions};
use dbconvert::function;
use dbconvert::model::{IfStatement, Statement, TokenKind};
use dbconvert::schema::ObjectType;
use dbconvert::{DatabaseType, InfoType, ParseMode, TranslateEngine, TranslateObject};
use tokio_util::sync::CancellationToken;

#[test]
fn test_oracle_nvl_function_to_mysql() {
    let engine = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::MySql);
    let out = engine
        .translate_text(
            "CREATE FUNCTION F(a IN NUMBER) RETURN NUMBER AS BEGIN RETURN NVL(a,0); END;",
            ParseMode::Function,
        )
        .unwrap();
    assert!(out.contains("IFNULL(a,0)"), "{}", out);
    assert!(!out.contains("NVL("));
    assert!(!out.contains("IFNULL()"));
}

#[tokio::test]
async fn test_continue_on_error_batch() {
    let objects = vec![
        TranslateObject::new(
            ObjectType::Procedure,
            "",
            "p_first",
            "CREATE PROCEDURE p_first AS BEGIN NULL; END;",
        ),
        TranslateObject::new(
            ObjectType::Procedure,
            "",
            "p_broken",
            "CREATE PROCEDURE p_broken AS BEGIN IF THEN",
        ),
        TranslateObject::new(
            ObjectType::Procedure,
            "",
            "p_third",
            "CREATE PROCEDURE p_third AS BEGIN NULL; END;",
        ),
    ];
    let mut engine = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::Postgres)
        .with_continue_on_error(true);
    let summary = engine
        .translate_all(&objects, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status, InfoType::Warning);
    assert_eq!(summary.succeeded().count(), 2);
    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].object_name, "p_broken");
    assert!(summary.failure_messages()[0].contains("p_broken"));
}

#[test]
fn test_function_translation_is_identity_on_same_dialect() {
    let expressions = [
        "NVL(a,0)",
        "ISNULL(@a, 0) + LEN(@name)",
        "IFNULL(a, 0)",
        "COALESCE(a, b) || SUBSTRING(s FROM 1 FOR 2)",
        "GETDATE()",
    ];
    for db in DatabaseType::ALL {
        for expr in expressions {
            assert_eq!(function::translate(expr, db, db), expr, "{} on {}", expr, db);
        }
    }
}

#[test]
fn test_loop_labels_are_unique_within_a_script() {
    let script = parse(
        DatabaseType::Oracle,
        "CREATE OR REPLACE PROCEDURE p AS x NUMBER := 0; BEGIN \
         LOOP x := x + 1; EXIT WHEN x > 3; \
           LOOP x := x + 1; EXIT WHEN x > 5; END LOOP; \
         END LOOP; \
         LOOP x := x - 1; EXIT WHEN x < 0; END LOOP; END;",
        ParseMode::Procedure,
    )
    .unwrap();
    let out = render(DatabaseType::MySql, &script, &EmitOptions::default()).unwrap();

    let labels: Vec<String> = out
        .lines()
        .filter_map(|line| line.trim().strip_suffix(": LOOP").map(str::to_string))
        .collect();
    assert_eq!(labels.len(), 3, "{}", out);
    let unique: HashSet<_> = labels.iter().collect();
    assert_eq!(unique.len(), labels.len(), "{}", out);
}

fn first_loop_body(statements: &[Statement]) -> &[Statement] {
    statements
        .iter()
        .find_map(|s| match s {
            Statement::Loop(l) => Some(l.statements.as_slice()),
            _ => None,
        })
        .unwrap()
}

#[test]
fn test_cursor_loop_round_trip_keeps_fetch_before_test() {
    let oracle = "CREATE OR REPLACE PROCEDURE p AS CURSOR c IS SELECT id FROM t; v_id NUMBER; \
                  BEGIN OPEN c; LOOP FETCH c INTO v_id; EXIT WHEN c%NOTFOUND; \
                  INSERT INTO log (id) VALUES (v_id); END LOOP; CLOSE c; END;";
    let script = parse(DatabaseType::Oracle, oracle, ParseMode::Procedure).unwrap();
    let mysql = render(DatabaseType::MySql, &script, &EmitOptions::default()).unwrap();
    assert!(mysql.contains("DECLARE CONTINUE HANDLER FOR NOT FOUND"), "{}", mysql);

    let back = parse(DatabaseType::MySql, &mysql, ParseMode::Procedure).unwrap();
    let body = first_loop_body(back.statements());
    assert!(matches!(&body[0], Statement::FetchCursor(_)), "{:?}", body);
    assert!(matches!(&body[1], Statement::LoopExit(e) if e.is_cursor_guard()), "{:?}", body);

    let oracle_again = render(DatabaseType::Oracle, &back, &EmitOptions::default()).unwrap();
    let fetch = oracle_again.find("FETCH c").unwrap();
    let test = oracle_again.find("c%NOTFOUND").unwrap();
    assert!(fetch < test, "{}", oracle_again);
}

#[test]
fn test_data_types_follow_the_target() {
    let engine = TranslateEngine::new(DatabaseType::SqlServer, DatabaseType::Postgres);
    let script = parse(
        DatabaseType::SqlServer,
        "CREATE PROCEDURE p @name NVARCHAR(50) AS BEGIN SELECT @name; END",
        ParseMode::Procedure,
    )
    .unwrap();
    let param_type = match &script {
        dbconvert::model::Script::Routine(r) => r.parameters[0].data_type.clone(),
        _ => panic!("expected routine"),
    };
    assert_eq!(param_type.kind, TokenKind::DataType);

    let out = engine
        .translate_text(
            "CREATE PROCEDURE p @name NVARCHAR(50) AS BEGIN SELECT @name; END",
            ParseMode::Procedure,
        )
        .unwrap();
    assert!(!out.to_ascii_uppercase().contains("NVARCHAR"), "{}", out);
}

/// Nesting of loops and conditionals, ignoring exit tests.
fn control_flow_shape(statements: &[Statement]) -> String {
    statements
        .iter()
        .filter_map(|s| {
            let kind = match s {
                Statement::Loop(_) | Statement::While(_) => "loop",
                Statement::If(i) if is_exit_test(i) => return None,
                Statement::If(_) | Statement::Case(_) => "cond",
                _ => return None,
            };
            let inner: String = s.blocks().iter().map(|b| control_flow_shape(b)).collect();
            Some(format!("{}[{}]", kind, inner))
        })
        .collect()
}

fn is_exit_test(statement: &IfStatement) -> bool {
    statement.else_statements.is_none()
        && statement.items.len() == 1
        && matches!(
            statement.items[0].statements.as_slice(),
            [Statement::LoopExit(_)] | [Statement::Continue(_)]
        )
}

#[test]
fn test_rendered_routines_reparse_with_the_same_control_flow() {
    let oracle = "CREATE OR REPLACE PROCEDURE p(n IN NUMBER) AS v NUMBER := 0; BEGIN \
                  IF n < 0 THEN RETURN; END IF; \
                  IF n > 10 THEN v := 1; ELSE v := 2; END IF; \
                  WHILE v < n LOOP v := v + 1; END LOOP; \
                  LOOP v := v - 1; EXIT WHEN v < 0; END LOOP; END;";
    let script = parse(DatabaseType::Oracle, oracle, ParseMode::Procedure).unwrap();
    let expected = control_flow_shape(script.statements());
    assert_eq!(expected, "cond[]cond[]loop[]loop[]");

    for target in DatabaseType::ALL {
        let engine = TranslateEngine::new(DatabaseType::Oracle, target);
        let rendered = engine.translate_text(oracle, ParseMode::Procedure).unwrap();
        let back = parse(target, &rendered, ParseMode::Procedure)
            .unwrap_or_else(|e| panic!("{} output does not parse: {}\n{}", target, e, rendered));
        assert_eq!(control_flow_shape(back.statements()), expected, "{}:\n{}", target, rendered);
    }

    // MySQL returns early by leaving the labelled body; every dialect must accept that.
    let mysql = TranslateEngine::new(DatabaseType::Oracle, DatabaseType::MySql)
        .translate_text(oracle, ParseMode::Procedure)
        .unwrap();
    assert!(mysql.contains("LEAVE sp;"), "{}", mysql);
    for target in DatabaseType::ALL {
        let engine = TranslateEngine::new(DatabaseType::MySql, target);
        let rendered = engine
            .translate_text(&mysql, ParseMode::Procedure)
            .unwrap_or_else(|e| panic!("MySQL to {} failed: {}\n{}", target, e, mysql));
        let back = parse(target, &rendered, ParseMode::Procedure)
            .unwrap_or_else(|e| panic!("{} output does not parse: {}\n{}", target, e, rendered));
        assert_eq!(control_flow_shape(back.statements()), expected, "{}:\n{}", target, rendered);
    }
}

#[test]
fn test_mysql_body_leave_translates_to_every_dialect() {
    let mysql = "CREATE PROCEDURE p(IN n INT) sp: BEGIN IF n = 0 THEN LEAVE sp; END IF; SELECT 1; END;";
    for target in DatabaseType::ALL {
        let engine = TranslateEngine::new(DatabaseType::MySql, target);
        let out = engine
            .translate_text(mysql, ParseMode::Procedure)
            .unwrap_or_else(|e| panic!("{}: {}", target, e));
        if target != DatabaseType::MySql {
            assert!(out.contains("RETURN"), "{}:\n{}", target, out);
        }
    }
}

#[test]
fn test_postgres_void_function_renders_as_mysql_procedure() {
    let pg = "CREATE FUNCTION log_it(x integer) RETURNS void AS $$\nBEGIN\n  \
              IF x < 0 THEN RETURN; END IF;\n  INSERT INTO log (v) VALUES (x);\nEND;\n$$ LANGUAGE plpgsql;";
    let engine = TranslateEngine::new(DatabaseType::Postgres, DatabaseType::MySql);
    let out = engine.translate_text(pg, ParseMode::Function).unwrap();
    assert!(out.starts_with("CREATE PROCEDURE"), "{}", out);
    assert!(!out.to_ascii_uppercase().contains("VOID"), "{}", out);
    assert!(out.contains("LEAVE sp;"), "{}", out);
}
