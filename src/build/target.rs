//! Targets and steps
//!
//! Runtime representation of the targets of a build file. Steps are parsed once,
//! against the task registry, when the build file is loaded.

use crate::config::TargetConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::tasks::{binder, Registry};
use serde_yaml::{Mapping, Value};

/// A named unit of work with dependencies and steps
#[derive(Debug, Clone)]
pub struct Target {
    /// Target name
    pub name: String,

    /// Documentation for help text
    pub doc: String,

    /// Targets run before this one, in order
    pub depends: Vec<String>,

    /// Skip condition
    pub unless: Option<Value>,

    /// Steps to run
    pub steps: Vec<Step>,
}

impl Target {
    /// Create a target from its build file configuration
    pub fn from_config(name: &str, config: TargetConfig, registry: &Registry) -> ConfigResult<Self> {
        let mut steps = Vec::with_capacity(config.steps.len());
        for (index, raw) in config.steps.iter().enumerate() {
            let step = Step::parse(raw, registry).map_err(|e| ConfigError::InvalidStep {
                target: name.to_string(),
                index: index + 1,
                message: e.to_string(),
            })?;
            steps.push(step);
        }

        Ok(Target {
            name: name.to_string(),
            doc: config.doc.unwrap_or_default(),
            depends: config.depends,
            unless: config.unless,
            steps,
        })
    }
}

/// One unit of work inside a target
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Source run by the interpreter
    Script { source: String },

    /// Dispatch to a registered task with unvalidated arguments
    Task { task: String, args: Mapping },
}

impl Step {
    /// Parse a raw step: text is a script, a mapping is a task
    pub fn parse(raw: &Value, registry: &Registry) -> ConfigResult<Step> {
        match raw {
            Value::String(source) => Ok(Step::Script {
                source: source.clone(),
            }),
            Value::Mapping(args) => {
                let keys: Vec<&str> = args.keys().filter_map(Value::as_str).collect();
                let tasks: Vec<&str> = keys
                    .iter()
                    .copied()
                    .filter(|key| registry.has_task(key))
                    .collect();

                let task = match tasks.as_slice() {
                    [task] => *task,
                    [] => return Err(ConfigError::UnknownTask(keys.join(", "))),
                    _ => return Err(ConfigError::AmbiguousStep(tasks.join(", "))),
                };

                let descriptor = registry
                    .task(task)
                    .ok_or_else(|| ConfigError::UnknownTask(task.to_string()))?;
                binder::validate(&descriptor.schema, args, registry).map_err(|source| {
                    ConfigError::Arguments {
                        task: task.to_string(),
                        source,
                    }
                })?;

                Ok(Step::Task {
                    task: task.to_string(),
                    args: args.clone(),
                })
            }
            other => Err(ConfigError::Invalid(format!(
                "a step must be a script or a task, got {}",
                binder::describe_value(other)
            ))),
        }
    }

    /// Parse a nested list of steps
    pub fn parse_list(raw: &Value, registry: &Registry) -> ConfigResult<Vec<Step>> {
        match raw {
            Value::Null => Ok(Vec::new()),
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    Step::parse(item, registry)
                        .map_err(|e| ConfigError::Invalid(format!("step {}: {}", index + 1, e)))
                })
                .collect(),
            other => Err(ConfigError::Invalid(format!(
                "steps must be a list, got {}",
                binder::describe_value(other)
            ))),
        }
    }
}
