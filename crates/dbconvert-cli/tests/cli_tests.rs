//! CLI integration tests for dbconvert.
//!
//! These tests verify command-line argument parsing, help output,
//! translation output and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// Get a command for the dbconvert binary.
fn cmd() -> Command {
    Command::cargo_bin("dbconvert").unwrap()
}

fn sql_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".sql").tempfile().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("translate"))
        .stdout(predicate::str::contains("function"))
        .stdout(predicate::str::contains("map-type"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn test_translate_subcommand_help() {
    cmd()
        .args(["translate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--from"))
        .stdout(predicate::str::contains("--to"))
        .stdout(predicate::str::contains("--kind"))
        .stdout(predicate::str::contains("--continue-on-error"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dbconvert"));
}

#[test]
fn test_log_flags_have_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: warn]"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Translation Tests
// =============================================================================

#[test]
fn test_translate_function_file_to_mysql() {
    let file = sql_file("CREATE FUNCTION f(a IN NUMBER) RETURN NUMBER AS BEGIN RETURN NVL(a,0); END;");

    cmd()
        .args(["translate", "--from", "oracle", "--to", "mysql"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("IFNULL(a,0)"))
        .stdout(predicate::str::contains("NVL(").not());
}

#[test]
fn test_translate_reads_stdin() {
    cmd()
        .args(["translate", "--from", "oracle", "--to", "mysql", "--kind", "function"])
        .write_stdin("CREATE FUNCTION f(a IN NUMBER) RETURN NUMBER AS BEGIN RETURN NVL(a,0); END;")
        .assert()
        .success()
        .stdout(predicate::str::contains("IFNULL(a,0)"));
}

#[test]
fn test_translate_writes_output_file() {
    let file = sql_file("CREATE PROCEDURE p AS BEGIN NULL; END;");
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.sql");

    cmd()
        .args(["translate", "--from", "oracle", "--to", "postgres", "-o"])
        .arg(&out)
        .arg(file.path())
        .assert()
        .success();

    let script = std::fs::read_to_string(&out).unwrap();
    assert!(script.to_uppercase().contains("PROCEDURE"), "{}", script);
    assert!(!dir.path().join("out.tmp").exists());
}

#[test]
fn test_translate_json_summary() {
    let file = sql_file("CREATE PROCEDURE p AS BEGIN NULL; END;");

    cmd()
        .args(["--output-json", "translate", "--from", "oracle", "--to", "postgres"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\""))
        .stdout(predicate::str::contains("\"results\""));
}

#[test]
fn test_broken_file_with_continue_exits_with_code_4() {
    let good = sql_file("CREATE PROCEDURE p_good AS BEGIN NULL; END;");
    let broken = sql_file("CREATE PROCEDURE p_broken AS BEGIN IF THEN");

    cmd()
        .args(["translate", "--from", "oracle", "--to", "postgres", "--continue-on-error"])
        .arg(good.path())
        .arg(broken.path())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Failed:"));
}

#[test]
fn test_broken_file_without_continue_exits_with_code_3() {
    let broken = sql_file("CREATE PROCEDURE p_broken AS BEGIN IF THEN");

    cmd()
        .args(["translate", "--from", "oracle", "--to", "postgres"])
        .arg(broken.path())
        .assert()
        .code(3);
}

#[test]
fn test_headerless_input_needs_kind() {
    let file = sql_file("BEGIN NULL; END;");

    cmd()
        .args(["translate", "--from", "oracle", "--to", "postgres"])
        .arg(file.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--kind"));
}

#[test]
fn test_unknown_dialect_is_rejected() {
    cmd()
        .args(["translate", "--from", "db2", "--to", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown database type"));
}

#[test]
fn test_missing_input_file_exits_with_code_1() {
    cmd()
        .args(["translate", "--from", "oracle", "--to", "mysql", "nonexistent_input.sql"])
        .assert()
        .code(1);
}

// =============================================================================
// Expression and Type Tests
// =============================================================================

#[test]
fn test_function_command_translates_expression() {
    cmd()
        .args(["function", "--from", "oracle", "--to", "mysql", "NVL(a,0)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IFNULL(a,0)"));
}

#[test]
fn test_map_type_command() {
    cmd()
        .args(["map-type", "--from", "sqlserver", "--to", "postgres", "NVARCHAR(50)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NVARCHAR").not());
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_valid_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "continueOnErrorOccurs: true").unwrap();
    writeln!(file, "dataBatchSize: 1000").unwrap();

    cmd()
        .args(["check-config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Batch size: 1000"));
}

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error, not a config error
    cmd()
        .args(["check-config", "nonexistent_config_file.yaml"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["check-config"])
        .arg(file.path())
        .assert()
        .code(2);
}

#[test]
fn test_zero_batch_size_exits_with_code_2() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "dataBatchSize: 0").unwrap();

    cmd()
        .args(["check-config"])
        .arg(file.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dataBatchSize"));
}
