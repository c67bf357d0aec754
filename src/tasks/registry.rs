//! Task and builtin registries
//!
//! The registry is built once at process start and shared read-only by the engine.

use crate::error::Result;
use crate::runner::ExecutionContext;
use crate::tasks::binder::{BoundArgs, Schema};
use mlua::{Function, Lua};
use std::collections::BTreeMap;
use std::fmt;

/// Handler invoked with the bound arguments of a task step
pub type TaskHandler = fn(&mut ExecutionContext, &BoundArgs) -> Result<()>;

/// A registered task: name, argument schema, handler and help text
#[derive(Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub schema: Schema,
    pub handler: TaskHandler,
    pub help: String,
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// A function installed as a global in every interpreter
#[derive(Clone)]
pub struct BuiltinDescriptor {
    pub name: String,
    pub help: String,
    pub install: fn(&Lua) -> mlua::Result<Function>,
}

impl fmt::Debug for BuiltinDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Tasks and builtins known to the engine
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tasks: BTreeMap<String, TaskDescriptor>,
    builtins: BTreeMap<String, BuiltinDescriptor>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the bundled tasks and builtins
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::tasks::core::register(&mut registry);
        crate::tasks::system::register(&mut registry);
        crate::tasks::builtins::register(&mut registry);
        registry
    }

    /// Register a task
    ///
    /// # Panics
    ///
    /// Panics if a task with the same name is already registered.
    pub fn register_task(&mut self, descriptor: TaskDescriptor) {
        if self.tasks.contains_key(&descriptor.name) {
            panic!("task '{}' already registered", descriptor.name);
        }
        self.tasks.insert(descriptor.name.clone(), descriptor);
    }

    /// Register a builtin function
    ///
    /// # Panics
    ///
    /// Panics if a builtin with the same name is already registered.
    pub fn register_builtin(&mut self, descriptor: BuiltinDescriptor) {
        if self.builtins.contains_key(&descriptor.name) {
            panic!("builtin '{}' already registered", descriptor.name);
        }
        self.builtins.insert(descriptor.name.clone(), descriptor);
    }

    pub fn task(&self, name: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(name)
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered tasks, sorted by name
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.values()
    }

    /// Registered builtins, sorted by name
    pub fn builtins(&self) -> impl Iterator<Item = &BuiltinDescriptor> {
        self.builtins.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ExecutionContext, _: &BoundArgs) -> Result<()> {
        Ok(())
    }

    fn descriptor(name: &str) -> TaskDescriptor {
        TaskDescriptor {
            name: name.to_string(),
            schema: Schema::new(vec![]),
            handler: noop,
            help: String::new(),
        }
    }

    #[test]
    fn test_defaults_registered() {
        let registry = Registry::with_defaults();
        for name in ["print", "throw", "$", "mkdir", "call", "super", "try", "threads"] {
            assert!(registry.has_task(name), "missing task {}", name);
        }
        let builtins: Vec<&str> = registry.builtins().map(|b| b.name.as_str()).collect();
        assert_eq!(builtins, vec!["appendpath", "exists", "expand", "find", "joinpath"]);
    }

    #[test]
    fn test_register_task() {
        let mut registry = Registry::new();
        registry.register_task(descriptor("spam"));
        assert!(registry.has_task("spam"));
        assert!(registry.task("eggs").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_task_panics() {
        let mut registry = Registry::new();
        registry.register_task(descriptor("spam"));
        registry.register_task(descriptor("spam"));
    }
}
