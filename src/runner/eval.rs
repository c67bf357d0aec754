//! Property and environment evaluation

use crate::error::{EvalError, EvalResult};
use crate::runner::interpolate::{environment_pattern, substitute, to_text, whole_expression};
use crate::runner::ExecutionContext;
use crate::tasks::binder::describe_value;
use crate::utils::resolve_path;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Evaluate properties that may reference each other in any order
///
/// Each pass tries every pending property in name order and defines those that evaluate.
/// Passes repeat until all are defined, or a pass makes no progress.
pub fn evaluate_properties(
    ctx: &ExecutionContext,
    properties: &BTreeMap<String, Value>,
) -> EvalResult<()> {
    let mut pending: Vec<&String> = properties.keys().collect();
    let mut pass = 0;

    while !pending.is_empty() {
        pass += 1;
        let mut remaining = Vec::new();
        let mut last_error = None;

        for name in pending.iter().copied() {
            match ctx.evaluate_value(&properties[name]) {
                Ok(value) => ctx.define(name, &value)?,
                Err(e) => {
                    last_error = Some(e);
                    remaining.push(name);
                }
            }
        }

        if remaining.len() == pending.len() {
            return Err(EvalError::Unresolved {
                names: remaining.into_iter().cloned().collect(),
                cause: last_error.map(|e| e.to_string()).unwrap_or_default(),
            });
        }

        ctx.console.debug(&format!(
            "Property pass {}: {} left",
            pass,
            remaining.len()
        ));
        pending = remaining;
    }

    Ok(())
}

/// Build the environment of commands
///
/// Starts from the process environment, applies dotenv files, then declared entries in
/// name order, each seeing the entries processed before it. `_BASE` and `_HERE` always
/// hold the build and invocation directories.
pub fn resolve_environment(ctx: &ExecutionContext) -> EvalResult<BTreeMap<String, String>> {
    let tree = ctx.tree();
    let root = tree.root();
    let mut environment: BTreeMap<String, String> = std::env::vars().collect();

    for file in tree.resolved_dotenv(tree.root_id()) {
        let path = resolve_path(&root.dir, &file);
        let error = |message: String| EvalError::Dotenv {
            path: path.clone(),
            message,
        };
        let entries = dotenvy::from_path_iter(&path).map_err(|e| error(e.to_string()))?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| error(e.to_string()))?;
            environment.insert(key, value);
        }
    }

    for (name, raw) in tree.resolved_environment(tree.root_id()) {
        let value = environment_value(ctx, &environment, &name, &raw)?;
        environment.insert(name, value);
    }

    environment.insert("_BASE".to_string(), root.dir.to_string_lossy().into_owned());
    environment.insert("_HERE".to_string(), root.here.to_string_lossy().into_owned());
    Ok(environment)
}

fn environment_value(
    ctx: &ExecutionContext,
    environment: &BTreeMap<String, String>,
    name: &str,
    raw: &Value,
) -> EvalResult<String> {
    let expand = |text: &str| {
        substitute(text, environment_pattern(), |introducer, source| {
            if introducer == '$' {
                Ok(environment.get(source).cloned())
            } else {
                Ok(Some(to_text(&ctx.evaluate_expression(source)?)))
            }
        })
    };

    match raw {
        Value::String(text) => match whole_expression(text) {
            Some(whole) => {
                let slashes = "\\".repeat(whole.slashes / 2);
                if whole.slashes == 0 {
                    return match ctx.evaluate_expression(whole.source)? {
                        Value::String(value) => Ok(value),
                        other => Err(EvalError::NotAString {
                            name: name.to_string(),
                            actual: describe_value(&other),
                        }),
                    };
                }
                if whole.slashes % 2 == 0 {
                    let value = ctx.evaluate_expression(whole.source)?;
                    return Ok(format!("{}{}", slashes, to_text(&value)));
                }
                Ok(format!("{}{}={}", whole.leading, slashes, expand(whole.source)?))
            }
            None => expand(text),
        },
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) => Ok(to_text(raw)),
        _ => Err(EvalError::InvalidEnvironment(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildTree, LoadOptions};
    use crate::tasks::Registry;
    use crate::ui::Verbosity;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(yaml: &str, extra: &[(&str, &str)]) -> (TempDir, Result<ExecutionContext, crate::BuildError>) {
        let temp = TempDir::new().unwrap();
        for (name, content) in extra {
            fs::write(temp.path().join(name), content).unwrap();
        }
        let path = temp.path().join("build.yml");
        fs::write(&path, yaml).unwrap();
        let registry = Arc::new(Registry::with_defaults());
        let options = LoadOptions::new().with_here(temp.path().to_path_buf());
        let tree = Arc::new(BuildTree::load(&path, &registry, &options).unwrap());
        let mut ctx = ExecutionContext::new(tree, registry)
            .unwrap()
            .with_verbosity(Verbosity::Silent);
        let result = ctx.init().map(|_| ctx);
        (temp, result)
    }

    #[test]
    fn test_properties_in_any_order() {
        let (_temp, ctx) = context("properties:\n  a: '#{b}'\n  b: '1'\n", &[]);
        let ctx = ctx.unwrap();
        assert_eq!(ctx.get("a").unwrap(), Some(Value::from("1")));
        assert_eq!(ctx.get("b").unwrap(), Some(Value::from("1")));
    }

    #[test]
    fn test_chain_resolves_over_several_passes() {
        let (_temp, ctx) = context(
            "properties:\n  a: '=b + 1'\n  b: '=c + 1'\n  c: 1\n",
            &[],
        );
        let ctx = ctx.unwrap();
        assert_eq!(ctx.get("a").unwrap(), Some(Value::from(3)));
    }

    #[test]
    fn test_circular_properties_fail() {
        let (_temp, ctx) = context("properties:\n  a: '#{b}'\n  b: '#{a}'\n", &[]);
        let err = ctx.err().unwrap();
        match err {
            crate::BuildError::Evaluation(EvalError::Unresolved { names, cause }) => {
                assert_eq!(names, vec!["a", "b"]);
                assert!(cause.contains("undefined variable"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_environment_sees_earlier_entries() {
        let (_temp, ctx) = context(
            "environment:\n  A_FIRST: one\n  B_SECOND: '${A_FIRST}-two'\n  C_THIRD: '${Z_LAST}'\n  Z_LAST: last\n",
            &[],
        );
        let ctx = ctx.unwrap();
        let env = ctx.environment();
        assert_eq!(env["B_SECOND"], "one-two");
        assert_eq!(env["C_THIRD"], "${Z_LAST}");
        assert_eq!(env["Z_LAST"], "last");
    }

    #[test]
    fn test_environment_expressions() {
        let (_temp, ctx) = context(
            "properties:\n  n: 2\nenvironment:\n  COUNT: 'n=#{n}'\n  WHOLE: '=\"v\" .. n'\n  BAD: '=n'\n",
            &[],
        );
        assert!(matches!(
            ctx.err().unwrap(),
            crate::BuildError::Evaluation(EvalError::NotAString { .. })
        ));

        let (_temp, ctx) = context(
            "properties:\n  n: 2\nenvironment:\n  COUNT: 'n=#{n}'\n  WHOLE: '=\"v\" .. n'\n",
            &[],
        );
        let ctx = ctx.unwrap();
        assert_eq!(ctx.environment()["COUNT"], "n=2");
        assert_eq!(ctx.environment()["WHOLE"], "v2");
    }

    #[test]
    fn test_environment_escaped_expressions() {
        let (_temp, ctx) = context(
            "properties:\n  n: 2\nenvironment:\n  LITERAL: '\\=x'\n  NESTED: '\\=${LITERAL} #{n}'\n  EVEN: '\\\\=n + 1'\n",
            &[],
        );
        let ctx = ctx.unwrap();
        let env = ctx.environment();
        assert_eq!(env["LITERAL"], "=x");
        assert_eq!(env["NESTED"], "==x 2");
        assert_eq!(env["EVEN"], r"\3");
    }

    #[test]
    fn test_malformed_dotenv_line_fails() {
        let (_temp, ctx) = context(
            "dotenv: bad.env\n",
            &[("bad.env", "GOOD=1\nnot a valid line\n")],
        );
        assert!(matches!(
            ctx.err().unwrap(),
            crate::BuildError::Evaluation(EvalError::Dotenv { .. })
        ));
    }

    #[test]
    fn test_dotenv_and_forced_directories() {
        let (temp, ctx) = context(
            "dotenv: [a.env, b.env]\nenvironment:\n  _BASE: nope\n  FROM_FILE: '${SHARED}'\n",
            &[("a.env", "SHARED=a\nONLY_A=1\n"), ("b.env", "SHARED=b\n")],
        );
        let ctx = ctx.unwrap();
        let env = ctx.environment();
        assert_eq!(env["SHARED"], "b");
        assert_eq!(env["ONLY_A"], "1");
        assert_eq!(env["FROM_FILE"], "b");
        assert_eq!(
            env["_BASE"],
            temp.path().canonicalize().unwrap().to_string_lossy()
        );
    }
}
