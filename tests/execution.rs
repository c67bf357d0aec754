//! Integration tests for target execution

mod common;

use common::{create_build, property, run};
use serde_yaml::Value;
use spire::error::{BuildError, EvalError, ExecutionError, ResolutionError};

#[test]
fn test_steps_run_in_order() {
    let (temp, _) = create_build(
        r#"
properties:
  log: ''
targets:
  t:
    steps:
      - "log = log .. 'a'"
      - "log = log .. 'b'"
      - "log = log .. 'c'"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "log"), "abc");
}

#[test]
fn test_shared_dependency_runs_each_time() {
    let (temp, _) = create_build(
        r#"
properties:
  log: ''
targets:
  a:
    depends: [b, c]
    steps: ["log = log .. 'A'"]
  b:
    depends: d
    steps: ["log = log .. 'B'"]
  c:
    depends: d
    steps: ["log = log .. 'C'"]
  d:
    steps: ["log = log .. 'D'"]
"#,
    );
    let (ctx, result) = run(&temp, &["a"]);
    result.unwrap();
    assert_eq!(property(&ctx, "log"), "DBDCA");
    assert_eq!(ctx.history.count("d"), 2);
    assert_eq!(ctx.history.entries(), &["a", "b", "d", "c", "d"]);
}

#[test]
fn test_cycle_is_reported_with_chain() {
    let (temp, _) = create_build(
        r#"
targets:
  foo:
    depends: bar
  bar:
    depends: foo
"#,
    );
    let (_, result) = run(&temp, &["foo"]);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Infinite loop in targets: foo -> bar -> foo"));
}

#[test]
fn test_call_into_running_target_is_a_cycle() {
    let (temp, _) = create_build(
        r#"
targets:
  t:
    steps:
      - call: t
"#,
    );
    let (_, result) = run(&temp, &["t"]);
    let err = result.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BuildError::Execution(ExecutionError::Cycle(chain)) if chain == "t -> t"
    ));
}

#[test]
fn test_unless_skips_target_and_dependencies() {
    let (temp, _) = create_build(
        r#"
properties:
  log: ''
  done: true
targets:
  t:
    depends: dep
    unless: done
    steps: ["log = log .. 't'"]
  dep:
    steps: ["log = log .. 'dep'"]
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "log"), "");
    assert!(ctx.history.entries().is_empty());
}

#[test]
fn test_unless_false_runs_target() {
    let (temp, _) = create_build(
        r#"
properties:
  log: ''
targets:
  t:
    unless: "=1 > 2"
    steps: ["log = log .. 't'"]
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "log"), "t");
}

#[test]
fn test_unless_must_be_boolean() {
    let (temp, _) = create_build("targets:\n  t:\n    unless: \"'yes'\"\n");
    let (_, result) = run(&temp, &["t"]);
    let err = result.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BuildError::Evaluation(EvalError::NotABoolean(_))
    ));
}

#[test]
fn test_error_names_target_and_step() {
    let (temp, _) = create_build(
        r#"
targets:
  a:
    depends: b
  b:
    steps:
      - print: ok
      - throw: "broken #{1 + 1}"
"#,
    );
    let (_, result) = run(&temp, &["a"]);
    let err = result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "target 'a': target 'b': step 2: Execution error: broken 2"
    );
}

#[test]
fn test_unknown_target() {
    let (temp, _) = create_build("targets:\n  t: {}\n");
    let (_, result) = run(&temp, &["missing"]);
    let err = result.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BuildError::Resolution(ResolutionError::TargetNotFound(name)) if name == "missing"
    ));
}

#[test]
fn test_default_targets_run_in_order() {
    let (temp, _) = create_build(
        r#"
default: [b, a]
properties:
  log: ''
targets:
  a:
    steps: ["log = log .. 'a'"]
  b:
    steps: ["log = log .. 'b'"]
"#,
    );
    let (ctx, result) = run(&temp, &[]);
    result.unwrap();
    assert_eq!(property(&ctx, "log"), "ba");
}

#[test]
fn test_no_default_target() {
    let (temp, _) = create_build("targets:\n  t: {}\n");
    let (_, result) = run(&temp, &[]);
    assert!(matches!(
        result,
        Err(BuildError::Resolution(ResolutionError::NoDefaultTarget))
    ));
}

#[test]
fn test_try_catch_finally() {
    let (temp, _) = create_build(
        r#"
properties:
  log: ''
targets:
  t:
    steps:
      - try:
          - "log = log .. 'try,'"
          - throw: boom
          - "log = log .. 'unreached,'"
        catch:
          - "log = log .. 'catch,'"
          - "caught = _error"
        finally:
          - "log = log .. 'finally'"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "log"), "try,catch,finally");
    assert!(property(&ctx, "caught").contains("boom"));
}

#[test]
fn test_try_without_catch_fails_after_finally() {
    let (temp, _) = create_build(
        r#"
properties:
  log: ''
targets:
  t:
    steps:
      - try:
          - throw: boom
        finally:
          - "log = log .. 'finally'"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    assert!(result.unwrap_err().to_string().contains("boom"));
    assert_eq!(property(&ctx, "log"), "finally");
}

#[test]
fn test_call_resolves_from_root() {
    let (temp, _) = create_build(
        r#"
properties:
  log: ''
  which: [a, b]
targets:
  t:
    steps:
      - call: "=which"
  a:
    steps: ["log = log .. 'a'"]
  b:
    steps: ["log = log .. 'b'"]
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "log"), "ab");
}

#[test]
fn test_properties_evaluated_before_targets() {
    let (temp, _) = create_build(
        r#"
properties:
  greeting: "hello #{name}"
  name: world
  sum: =1 + 2
  literal: \=1 + 2
targets:
  t:
    steps:
      - "message = greeting .. ' ' .. sum"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "message"), "hello world 3");
    assert_eq!(ctx.get("sum").unwrap(), Some(Value::from(3)));
    assert_eq!(property(&ctx, "literal"), "=1 + 2");
}

#[test]
fn test_mkdir_relative_to_build_dir() {
    let (temp, _) = create_build(
        r##"
properties:
  name: out
targets:
  t:
    steps:
      - mkdir: ["#{name}/a/b", "#{name}/c"]
"##,
    );
    let (_, result) = run(&temp, &["t"]);
    result.unwrap();
    assert!(temp.path().join("out/a/b").is_dir());
    assert!(temp.path().join("out/c").is_dir());
}

#[cfg(unix)]
#[test]
fn test_command_output_into_property() {
    let (temp, _) = create_build(
        r#"
environment:
  GREETING: hello
targets:
  t:
    steps:
      - $: "echo $GREETING there"
        quiet: true
        output: said
      - $: [pwd]
        output: dir
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "said"), "hello there");
    let dir = std::path::PathBuf::from(property(&ctx, "dir"));
    assert_eq!(
        dir.canonicalize().unwrap(),
        temp.path().canonicalize().unwrap()
    );
}

#[cfg(unix)]
#[test]
fn test_command_dir_expands_home() {
    let (temp, _) = create_build(
        r#"
targets:
  t:
    steps:
      - $: [pwd]
        dir: ~/
        quiet: true
        output: dir
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    let home = spire::utils::home_dir().unwrap();
    assert_eq!(
        std::path::PathBuf::from(property(&ctx, "dir")).canonicalize().unwrap(),
        home.canonicalize().unwrap()
    );
}

#[cfg(unix)]
#[test]
fn test_failing_command() {
    let (temp, _) = create_build("targets:\n  t:\n    steps:\n      - $: exit 3\n");
    let (_, result) = run(&temp, &["t"]);
    let err = result.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BuildError::Execution(ExecutionError::CommandFailed(Some(3)))
    ));
}

#[test]
fn test_unknown_variable_fails() {
    let (temp, _) = create_build("targets:\n  t:\n    steps:\n      - \"x = nope + 1\"\n");
    let (_, result) = run(&temp, &["t"]);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("undefined variable 'nope'"));
}
