//! Execution context
//!
//! The context owns the interpreter holding named values, the resolved environment and
//! the stack and history of the current run. A context can be forked into a `Send`
//! snapshot that a worker thread turns back into a private context.

use crate::build::BuildTree;
use crate::error::{EvalError, EvalResult, ResolutionError, Result};
use crate::runner::eval::{evaluate_properties, resolve_environment};
use crate::runner::interpolate::{property_pattern, substitute, to_text, whole_expression};
use crate::runner::script::{Interpreter, Snapshot};
use crate::runner::stack::{ExecutionStack, History};
use crate::tasks::binder::describe_value;
use crate::tasks::Registry;
use crate::ui::{Console, Verbosity};
use crate::utils::{cpu_count, resolve_path};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// State of a build run
pub struct ExecutionContext {
    interpreter: Interpreter,
    tree: Arc<BuildTree>,
    registry: Arc<Registry>,
    environment: BTreeMap<String, String>,
    overrides: BTreeMap<String, Value>,
    scripts: Vec<String>,

    /// Targets currently running
    pub stack: ExecutionStack,

    /// Targets entered so far
    pub history: History,

    pub console: Console,
}

impl ExecutionContext {
    /// Create a context for a loaded build; call [`init`](Self::init) before running it
    pub fn new(tree: Arc<BuildTree>, registry: Arc<Registry>) -> Result<Self> {
        let interpreter = Interpreter::new(&registry)?;
        let scripts = tree.resolved_scripts(tree.root_id());
        Ok(ExecutionContext {
            interpreter,
            tree,
            registry,
            environment: BTreeMap::new(),
            overrides: BTreeMap::new(),
            scripts,
            stack: ExecutionStack::new(),
            history: History::new(),
            console: Console::default(),
        })
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.console = Console::new(verbosity);
        self
    }

    /// Properties taking precedence over the build's own
    pub fn with_overrides(mut self, overrides: BTreeMap<String, Value>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Run context scripts, evaluate properties and resolve the environment
    pub fn init(&mut self) -> Result<()> {
        for source in &self.scripts {
            self.interpreter.run(source)?;
        }
        self.interpreter.seal();

        let root = self.tree.root();
        let builtins = [
            ("_OS", Value::from(std::env::consts::OS)),
            ("_ARCH", Value::from(std::env::consts::ARCH)),
            ("_NCPU", Value::from(cpu_count() as u64)),
            ("_BASE", Value::from(root.dir.to_string_lossy().into_owned())),
            ("_HERE", Value::from(root.here.to_string_lossy().into_owned())),
            ("_REPO", Value::from(root.repository.to_string_lossy().into_owned())),
        ];
        for (name, value) in &builtins {
            self.define(name, value)?;
        }

        let mut properties = self.tree.resolved_properties(self.tree.root_id());
        for file in self.tree.resolved_configuration(self.tree.root_id()) {
            properties.extend(self.read_configuration(&file)?);
        }
        properties.extend(self.overrides.clone());
        self.console
            .debug(&format!("Evaluating {} properties", properties.len()));
        evaluate_properties(self, &properties)?;

        self.environment = resolve_environment(self)?;
        Ok(())
    }

    fn read_configuration(&self, file: &str) -> EvalResult<BTreeMap<String, Value>> {
        let path = resolve_path(&self.base_dir(), file);
        let error = |message: String| EvalError::Configuration {
            path: path.clone(),
            message,
        };

        let text = fs::read_to_string(&path).map_err(|e| error(e.to_string()))?;
        let value: Value = serde_yaml::from_str(&text).map_err(|e| error(e.to_string()))?;
        match value {
            Value::Null => Ok(BTreeMap::new()),
            Value::Mapping(mapping) => mapping
                .into_iter()
                .map(|(key, value)| match key {
                    Value::String(name) => Ok((name, value)),
                    other => Err(error(format!("non-string key {:?}", other))),
                })
                .collect(),
            other => Err(error(format!("expected a map, got {}", describe_value(&other)))),
        }
    }

    pub fn tree(&self) -> &Arc<BuildTree> {
        &self.tree
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Working directory of the build
    pub fn base_dir(&self) -> PathBuf {
        self.tree.root().dir.clone()
    }

    /// Resolved environment passed to commands
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Shell prefix for the current OS, falling back to `default`
    pub fn shell(&self) -> Result<Vec<String>> {
        let table = self.tree.resolved_shell(self.tree.root_id());
        let os = std::env::consts::OS;
        table
            .get(os)
            .or_else(|| table.get("default"))
            .cloned()
            .ok_or_else(|| ResolutionError::NoShell(os.to_string()).into())
    }

    pub fn define(&self, name: &str, value: &Value) -> EvalResult<()> {
        self.interpreter.define(name, value)
    }

    pub fn get(&self, name: &str) -> EvalResult<Option<Value>> {
        self.interpreter.get(name)
    }

    /// Execute source, returning the value of an expression
    pub fn execute(&self, source: &str) -> EvalResult<Value> {
        self.interpreter.execute(source)
    }

    /// Run a script step
    pub fn run_script(&self, source: &str) -> EvalResult<()> {
        self.interpreter.run(source)
    }

    pub fn evaluate_expression(&self, source: &str) -> EvalResult<Value> {
        self.interpreter.execute(source)
    }

    /// Evaluate a string through the substitution grammar
    pub fn evaluate_string(&self, text: &str) -> EvalResult<Value> {
        if let Some(whole) = whole_expression(text) {
            let slashes = "\\".repeat(whole.slashes / 2);
            if whole.slashes == 0 {
                return self.execute(whole.source);
            }
            if whole.slashes % 2 == 0 {
                let value = self.execute(whole.source)?;
                return Ok(Value::String(format!("{}{}", slashes, to_text(&value))));
            }
            let rest = self.interpolate(whole.source)?;
            return Ok(Value::String(format!("{}{}={}", whole.leading, slashes, rest)));
        }

        Ok(Value::String(self.interpolate(text)?))
    }

    /// Replace `#{expr}` placeholders
    pub fn interpolate(&self, text: &str) -> EvalResult<String> {
        substitute(text, property_pattern(), |_, source| {
            Ok(Some(to_text(&self.execute(source)?)))
        })
    }

    /// Evaluate strings nested in lists and maps, keeping their shape
    pub fn evaluate_value(&self, value: &Value) -> EvalResult<Value> {
        match value {
            Value::String(text) => self.evaluate_string(text),
            Value::Sequence(items) => Ok(Value::Sequence(
                items
                    .iter()
                    .map(|item| self.evaluate_value(item))
                    .collect::<EvalResult<_>>()?,
            )),
            Value::Mapping(entries) => Ok(Value::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.evaluate_value(value)?)))
                    .collect::<EvalResult<_>>()?,
            )),
            other => Ok(other.clone()),
        }
    }

    /// Evaluate a skip condition: a boolean, or an expression with optional leading `=`
    pub fn evaluate_condition(&self, condition: &Value) -> EvalResult<bool> {
        let value = match condition {
            Value::String(text) if whole_expression(text).is_some() => self.evaluate_string(text)?,
            Value::String(source) => self.execute(source)?,
            other => other.clone(),
        };
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::NotABoolean(describe_value(&other))),
        }
    }

    /// Evaluate the singleton port of the build
    pub fn evaluate_port(&self, port: &Value) -> EvalResult<u16> {
        let value = match port {
            Value::String(source) => {
                let source = source.trim_start();
                self.execute(source.strip_prefix('=').unwrap_or(source))?
            }
            other => other.clone(),
        };
        value
            .as_i64()
            .and_then(|port| u16::try_from(port).ok())
            .filter(|port| *port > 0)
            .ok_or_else(|| EvalError::InvalidPort(to_text(&value)))
    }

    /// Snapshot this context for a worker thread
    pub fn fork(&self) -> ContextFork {
        ContextFork {
            tree: Arc::clone(&self.tree),
            registry: Arc::clone(&self.registry),
            scripts: self.scripts.clone(),
            globals: self.interpreter.snapshot(),
            environment: self.environment.clone(),
            overrides: self.overrides.clone(),
            stack: self.stack.clone(),
            history: self.history.clone(),
            console: self.console,
        }
    }
}

/// A `Send` copy of a context
#[derive(Debug, Clone)]
pub struct ContextFork {
    tree: Arc<BuildTree>,
    registry: Arc<Registry>,
    scripts: Vec<String>,
    globals: Snapshot,
    environment: BTreeMap<String, String>,
    overrides: BTreeMap<String, Value>,
    stack: ExecutionStack,
    history: History,
    console: Console,
}

impl ContextFork {
    /// Rebuild a private context: builtins, then context scripts, then globals
    pub fn into_context(self) -> Result<ExecutionContext> {
        let mut interpreter = Interpreter::new(&self.registry)?;
        for source in &self.scripts {
            interpreter.run(source)?;
        }
        interpreter.seal();
        interpreter.restore(&self.globals)?;

        Ok(ExecutionContext {
            interpreter,
            tree: self.tree,
            registry: self.registry,
            environment: self.environment,
            overrides: self.overrides,
            scripts: self.scripts,
            stack: self.stack,
            history: self.history,
            console: self.console,
        })
    }
}
