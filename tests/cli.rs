//! Command line tests for the spire binary

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use common::create_files;
use predicates::prelude::*;
use tempfile::TempDir;

const BUILD: &str = r#"
doc: Test build
default: hello
properties:
  name: spire
targets:
  hello:
    doc: Say hello
    steps:
      - print: "Hello #{name}"
  fail:
    depends: hello
    steps:
      - throw: broken
"#;

fn spire(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("spire");
    cmd.current_dir(temp.path())
        .arg("--repo")
        .arg(temp.path().join("repo"));
    cmd
}

#[test]
fn test_help_and_version() {
    cargo_bin_cmd!("spire")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
    cargo_bin_cmd!("spire")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_list_tasks_and_builtins() {
    cargo_bin_cmd!("spire")
        .arg("--tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("threads").and(predicate::str::contains("print")));
    cargo_bin_cmd!("spire")
        .arg("--builtins")
        .assert()
        .success()
        .stdout(predicate::str::contains("joinpath"));
}

#[test]
fn test_task_help() {
    cargo_bin_cmd!("spire")
        .args(["--task", "try"])
        .assert()
        .success()
        .stdout(predicate::str::contains("finally"));
    cargo_bin_cmd!("spire")
        .args(["--task", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task 'nope' not found"));
}

#[test]
fn test_list_targets() {
    let temp = create_files(&[("build.yml", BUILD)]);
    spire(&temp)
        .arg("--targets")
        .assert()
        .success()
        .stdout("fail\nhello\n");
}

#[test]
fn test_info() {
    let temp = create_files(&[("build.yml", BUILD)]);
    spire(&temp)
        .arg("--info")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("doc: Test build")
                .and(predicate::str::contains("name: spire"))
                .and(predicate::str::contains("hello: Say hello")),
        );
}

#[test]
fn test_run_default_target() {
    let temp = create_files(&[("build.yml", BUILD)]);
    spire(&temp)
        .arg("-q")
        .assert()
        .success()
        .stdout("Hello spire\n");
}

#[test]
fn test_property_override() {
    let temp = create_files(&[("build.yml", BUILD)]);
    spire(&temp)
        .args(["-q", "-p", "{name: you}", "hello"])
        .assert()
        .success()
        .stdout("Hello you\n");
}

#[test]
fn test_build_file_found_in_parent_dir() {
    let temp = create_files(&[("build.yml", BUILD), ("sub/dir/.keep", "")]);
    let mut cmd = spire(&temp);
    cmd.current_dir(temp.path().join("sub/dir"))
        .arg("-q")
        .assert()
        .success()
        .stdout("Hello spire\n");
}

#[test]
fn test_failing_build_exits_with_error() {
    let temp = create_files(&[("build.yml", BUILD)]);
    spire(&temp)
        .arg("fail")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Hello spire"))
        .stderr(
            predicate::str::contains("Error:")
                .and(predicate::str::contains("target 'fail': step 1"))
                .and(predicate::str::contains("broken")),
        );
}

#[test]
fn test_unknown_target() {
    let temp = create_files(&[("build.yml", BUILD)]);
    spire(&temp)
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Target 'nope' not found"));
}

#[test]
fn test_missing_build_file() {
    let temp = create_files(&[("other.yml", BUILD)]);
    spire(&temp)
        .args(["-f", "missing.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.yml"));
}

#[test]
fn test_template_runs_in_current_dir() {
    let temp = create_files(&[
        (
            "repo/templates/mkdir.yml",
            "targets:\n  make:\n    steps:\n      - mkdir: created\n",
        ),
        ("work/.keep", ""),
    ]);
    let mut cmd = spire(&temp);
    cmd.current_dir(temp.path().join("work"))
        .args(["-T", "-f", "templates/mkdir.yml", "-q", "make"])
        .assert()
        .success();
    assert!(temp.path().join("work/created").is_dir());
    assert!(!temp.path().join("repo/templates/created").exists());
}

#[test]
fn test_completion_script() {
    cargo_bin_cmd!("spire")
        .args(["--completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spire"));
}
