// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the `pda` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn pda() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("pda").expect("binary `pda` should be built")
}

fn write_config(dir: &std::path::Path, base_dir: &std::path::Path) -> std::path::PathBuf {
    let config_path = dir.join("pda.toml");
    let mut f = std::fs::File::create(&config_path).unwrap();
    writeln!(
        f,
        r#"
allowed_base_dirs = ["{base}"]
secret_key_source = {{ scheme = "hmac", key_env_var = "PDA_TEST_SECRET" }}
executor_secret_key_source = {{ scheme = "hmac", key_env_var = "PDA_TEST_EXECUTOR_SECRET" }}
"#,
        base = base_dir.display()
    )
    .unwrap();
    config_path
}

#[test]
fn help_exits_zero_and_lists_subcommands() {
    pda()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("lease"))
        .stdout(predicate::str::contains("execute"));
}

#[test]
fn version_shows_version_string() {
    pda().arg("--version").assert().success().stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn validate_prints_ast_for_a_well_formed_statement() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), dir.path());
    let statement_path = dir.path().join("statement.txt");
    std::fs::write(
        &statement_path,
        "SUBJECT(USER,alice) VERB(MUTATE,MOVE) OBJECT(FILE,/home/alice/in/a.txt,/home/alice/out/a.txt) META(home,true,LOW,false)",
    )
    .unwrap();

    pda()
        .env("PDA_TEST_SECRET", "aabbcc")
        .args(["--config", config_path.to_str().unwrap(), "validate", statement_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"action\": \"MOVE\""));
}

#[test]
fn compile_reports_hard_no_violation_for_irreversible_delete() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), dir.path());
    let statement_path = dir.path().join("statement.txt");
    std::fs::write(
        &statement_path,
        "SUBJECT(USER,alice) VERB(MUTATE,DELETE) OBJECT(FILE,/home/alice/in/a.txt) META(home,false,LOW,false)",
    )
    .unwrap();

    pda()
        .env("PDA_TEST_SECRET", "aabbcc")
        .args(["--config", config_path.to_str().unwrap(), "compile", statement_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HARD_NO_VIOLATION"));
}

#[test]
fn execute_moves_a_file_through_the_whole_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    std::fs::write(&source, b"hi").unwrap();
    let dest = dir.path().join("b.txt");
    let config_path = write_config(dir.path(), dir.path());

    let statement_path = dir.path().join("statement.txt");
    std::fs::write(
        &statement_path,
        format!(
            "SUBJECT(USER,alice) VERB(MUTATE,MOVE) OBJECT(FILE,{},{}) META(home,true,LOW,false)",
            source.display(),
            dest.display()
        ),
    )
    .unwrap();

    pda()
        .env("PDA_TEST_SECRET", "aabbcc")
        .env("PDA_TEST_EXECUTOR_SECRET", "112233")
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "execute",
            statement_path.to_str().unwrap(),
            "--trust-score",
            "0.9",
            "--minimum-trust",
            "0.5",
            "--now",
            "1000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"SUCCESS\""));

    assert!(dest.exists());
    assert!(!source.exists());
}
