// Tests for the `compiler` binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn write_source(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).unwrap();
    path
}

#[test]
fn test_no_arguments_prints_usage() {
    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_help_flag() {
    for flag in ["--help", "-h"] {
        let mut cmd = Command::cargo_bin("compiler").unwrap();
        cmd.arg(flag);
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("Usage"))
            .stdout(predicate::str::contains("--symbols"));
    }
}

#[test]
fn test_valid_program_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(
        &dir,
        "ok.c",
        "int square(int n) { return n * n; }\nint main(void) { return square(3); }\n",
    );

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.arg(path);
    cmd.assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn test_parse_error_is_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "bad.c", "int main(void) {\n    return y;\n}\n");

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.arg(path);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ERROR: 2:12: undeclared identifier 'y'"));
}

#[test]
fn test_lex_error_is_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "open.c", "int x; /* no end");

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.arg(path);
    cmd.assert().failure().stderr(predicate::str::contains("ERROR:"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.arg(dir.path().join("absent.c"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: cannot read"));
}

#[test]
fn test_pp_tokens_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "pp.c", "a+=1");

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.arg("--pp-tokens").arg(path);
    cmd.assert().success().stdout(predicate::eq(
        "identifier 1 a\npunctuator 2 +=\npp-number 1 1\nnew-line\neof\n",
    ));
}

#[test]
fn test_tokens_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "tokens.c", "return 'a';\n");

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.arg("--tokens").arg(path);
    cmd.assert().success().stdout(predicate::eq(
        "1-1: keyword Return return\n1-8: literal char 'a' 61\n1-11: punctuator Semicolon ;\n2-1: eof Eof\n",
    ));
}

#[test]
fn test_symbols_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "symbols.c", "int count;\nint get(void) { return count; }\n");

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.arg("--symbols").arg(path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("  global scope\n"))
        .stdout(predicate::str::contains("    count: int\n"))
        .stdout(predicate::str::contains("    get: function (void) returning int\n"))
        .stdout(predicate::str::contains("    parameters scope\n"));
}

#[test]
fn test_flags_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(&dir, "x.c", "int x;");

    let mut cmd = Command::cargo_bin("compiler").unwrap();
    cmd.args(["--tokens", "--symbols"]).arg(path);
    cmd.assert().failure();
}
