//! Integration tests for parallel steps and the singleton guard

mod common;

use common::{create_build, property, run};
use serde_yaml::Value;
use spire::error::{BuildError, ExecutionError};
use std::net::TcpListener;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn test_threads_consume_all_input() {
    let (temp, _) = create_build(
        r#"
properties:
  items: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
targets:
  t:
    steps:
      - threads: 3
        input: items
        steps:
          - "_output = _input * 2"
      - "table.sort(_output)"
      - "joined = table.concat(_output, ',')"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "joined"), "2,4,6,8,10,12,14,16,18,20");
}

#[test]
fn test_threads_without_input_run_once_each() {
    let (temp, _) = create_build(
        r#"
targets:
  t:
    steps:
      - threads: 2 + 2
        steps:
          - "_output = _thread"
      - "table.sort(_output)"
      - "joined = table.concat(_output, ',')"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "joined"), "0,1,2,3");
}

#[test]
fn test_threads_see_properties() {
    let (temp, _) = create_build(
        r#"
properties:
  prefix: item-
targets:
  t:
    steps:
      - threads: 2
        input: "{'a', 'b', 'c'}"
        steps:
          - "_output = prefix .. _input"
      - "table.sort(_output)"
      - "joined = table.concat(_output, ',')"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "joined"), "item-a,item-b,item-c");
}

#[test]
fn test_threads_see_functions_defined_by_steps() {
    let (temp, _) = create_build(
        r#"
targets:
  t:
    steps:
      - "function double(x) return 2 * x end"
      - threads: 2
        input: "{1, 2}"
        steps:
          - "_output = double(_input)"
      - "table.sort(_output)"
      - "joined = table.concat(_output, ',')"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(property(&ctx, "joined"), "2,4");
}

#[test]
fn test_thread_failure_surfaces_after_all_items() {
    let (temp, _) = create_build(
        r#"
targets:
  t:
    steps:
      - try:
          - threads: 3
            input: "{1, 2, 3, 4, 5, 6}"
            steps:
              - "if _input == 3 then error('bad ' .. _input) end"
              - "_output = _input"
        catch:
          - "count = #_output"
          - "message = _error"
"#,
    );
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(ctx.get("count").unwrap(), Some(Value::from(5)));
    assert!(property(&ctx, "message").contains("bad 3"));
}

#[test]
fn test_threads_count_must_be_positive() {
    let (temp, _) = create_build(
        r#"
targets:
  t:
    steps:
      - threads: 0
        steps:
          - "x = 1"
"#,
    );
    let (_, result) = run(&temp, &["t"]);
    let err = result.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BuildError::Execution(ExecutionError::InvalidThreads(0))
    ));
}

#[test]
fn test_singleton_port_busy() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (temp, _) = create_build(&format!(
        "singleton: {}\ntargets:\n  t:\n    steps: [\"ran = true\"]\n",
        port
    ));
    let (ctx, result) = run(&temp, &["t"]);
    assert!(matches!(
        result,
        Err(BuildError::Execution(ExecutionError::SingletonBusy { port: p, .. })) if p == port
    ));
    assert_eq!(ctx.get("ran").ok().flatten(), None);
}

#[test]
fn test_singleton_port_from_expression() {
    let port = free_port();
    let (temp, _) = create_build(&format!(
        "singleton: \"=base + 0\"\nproperties:\n  base: {}\ntargets:\n  t:\n    steps: [\"ran = true\"]\n",
        port
    ));
    let (ctx, result) = run(&temp, &["t"]);
    result.unwrap();
    assert_eq!(ctx.get("ran").unwrap(), Some(Value::Bool(true)));
    assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
}
