//! Embedded Lua interpreter
//!
//! Named values are Lua globals. Values cross the boundary as YAML values, and reading
//! a global that was never defined is an error.

use crate::error::EvalResult;
use crate::tasks::Registry;
use mlua::{ChunkMode, DeserializeOptions, Function, Lua, LuaSerdeExt, Table, Value as LuaValue};
use serde_yaml::Value;
use std::collections::HashSet;

pub struct Interpreter {
    lua: Lua,

    /// Globals present before any user code ran
    baseline: HashSet<String>,

    /// Functions defined by context scripts, rebuilt from source by every worker
    scripted: Vec<(String, Function)>,
}

/// User globals copied out of an interpreter
///
/// Functions travel as bytecode. Only the globals upvalue survives the trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub values: Vec<(String, Value)>,
    pub functions: Vec<(String, Vec<u8>)>,
}

impl Interpreter {
    /// A fresh interpreter with the registry's builtins installed
    pub fn new(registry: &Registry) -> EvalResult<Self> {
        let lua = Lua::new();
        let globals = lua.globals();

        for builtin in registry.builtins() {
            let function = (builtin.install)(&lua)?;
            globals.raw_set(builtin.name.as_str(), function)?;
        }

        let mut baseline = HashSet::new();
        for pair in globals.pairs::<LuaValue, LuaValue>() {
            let (key, _) = pair?;
            if let LuaValue::String(name) = key {
                baseline.insert(name.to_string_lossy());
            }
        }

        let strict = lua.create_table()?;
        strict.set(
            "__index",
            lua.create_function(|_, (_, name): (Table, LuaValue)| -> mlua::Result<LuaValue> {
                let name = match name {
                    LuaValue::String(s) => s.to_string_lossy(),
                    other => format!("{:?}", other),
                };
                Err(mlua::Error::runtime(format!("undefined variable '{}'", name)))
            })?,
        )?;
        globals.set_metatable(Some(strict))?;

        Ok(Interpreter {
            lua,
            baseline,
            scripted: Vec::new(),
        })
    }

    /// Remember the functions context scripts defined
    pub fn seal(&mut self) {
        self.scripted = self
            .user_globals()
            .into_iter()
            .filter_map(|(name, value)| match value {
                LuaValue::Function(function) => Some((name, function)),
                _ => None,
            })
            .collect();
    }

    /// Define a global
    pub fn define(&self, name: &str, value: &Value) -> EvalResult<()> {
        let value = self.lua.to_value(value)?;
        self.lua.globals().raw_set(name, value)?;
        Ok(())
    }

    /// Read a global, `None` when undefined
    pub fn get(&self, name: &str) -> EvalResult<Option<Value>> {
        match self.lua.globals().raw_get::<LuaValue>(name)? {
            LuaValue::Nil => Ok(None),
            value => Ok(Some(self.from_lua(value)?)),
        }
    }

    /// Evaluate source as an expression, or run it as a block returning null
    pub fn execute(&self, source: &str) -> EvalResult<Value> {
        let value: LuaValue = self.lua.load(source).set_name("=step").eval()?;
        self.from_lua(value)
    }

    /// Run source as a block
    pub fn run(&self, source: &str) -> EvalResult<()> {
        self.lua.load(source).set_name("=step").exec()?;
        Ok(())
    }

    /// User globals that can be carried to another interpreter
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (name, value) in self.user_globals() {
            match value {
                LuaValue::Function(function) => {
                    if self.scripted.iter().any(|(n, f)| *n == name && *f == function) {
                        continue;
                    }
                    // C functions have no bytecode
                    let bytecode = function.dump(false);
                    if !bytecode.is_empty() {
                        snapshot.functions.push((name, bytecode));
                    }
                }
                value => {
                    if let Ok(value) = self.from_lua(value) {
                        snapshot.values.push((name, value));
                    }
                }
            }
        }
        snapshot.values.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot.functions.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    /// Define the functions and values of a snapshot
    pub fn restore(&self, snapshot: &Snapshot) -> EvalResult<()> {
        let globals = self.lua.globals();
        for (name, bytecode) in &snapshot.functions {
            let function = self
                .lua
                .load(&bytecode[..])
                .set_name(format!("={}", name))
                .set_mode(ChunkMode::Binary)
                .into_function()?;
            globals.raw_set(name.as_str(), function)?;
        }
        for (name, value) in &snapshot.values {
            self.define(name, value)?;
        }
        Ok(())
    }

    fn user_globals(&self) -> Vec<(String, LuaValue)> {
        let globals = self.lua.globals();
        let user = globals
            .pairs::<LuaValue, LuaValue>()
            .flatten()
            .filter_map(|(key, value)| match key {
                LuaValue::String(name) => Some((name.to_string_lossy(), value)),
                _ => None,
            })
            .filter(|(name, _)| !self.baseline.contains(name))
            .collect();
        user
    }

    fn from_lua(&self, value: LuaValue) -> EvalResult<Value> {
        let options = DeserializeOptions::new().sort_keys(true);
        Ok(self.lua.from_value_with(value, options)?)
    }
}
