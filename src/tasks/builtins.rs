//! Builtin functions installed in every interpreter

use crate::tasks::{BuiltinDescriptor, Registry};
use crate::utils::expand_home;
use mlua::prelude::*;
use std::path::PathBuf;

pub fn register(registry: &mut Registry) {
    let builtins: [(&str, &str, fn(&Lua) -> LuaResult<LuaFunction>); 5] = [
        ("joinpath", "joinpath(a, b, ...): join path segments with the OS separator", joinpath),
        ("appendpath", "appendpath(dir, list): join dir in front of every path of list", appendpath),
        ("expand", "expand(path): expand a leading ~/ to the home directory", expand),
        ("exists", "exists(path): tell whether a path exists", exists),
        ("find", "find(dir, pattern, ...): sorted paths under dir matching glob patterns", find),
    ];

    for (name, help, install) in builtins {
        registry.register_builtin(BuiltinDescriptor {
            name: name.to_string(),
            help: help.to_string(),
            install,
        });
    }
}

fn joinpath(lua: &Lua) -> LuaResult<LuaFunction> {
    lua.create_function(|_, segments: LuaMultiValue| {
        let mut result = PathBuf::new();
        for (index, segment) in segments.into_iter().enumerate() {
            match segment {
                LuaValue::String(s) if index == 0 => result.push(expand_home(&s.to_str()?)),
                LuaValue::String(s) => result.push(&*s.to_str()?),
                other => {
                    return Err(LuaError::runtime(format!(
                        "joinpath: expected strings, got {}",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(result.to_string_lossy().into_owned())
    })
}

fn appendpath(lua: &Lua) -> LuaResult<LuaFunction> {
    lua.create_function(|_, (dir, paths): (String, Vec<String>)| {
        let dir = expand_home(&dir);
        Ok(paths
            .iter()
            .map(|path| dir.join(path).to_string_lossy().into_owned())
            .collect::<Vec<_>>())
    })
}

fn expand(lua: &Lua) -> LuaResult<LuaFunction> {
    lua.create_function(|_, path: String| Ok(expand_home(&path).to_string_lossy().into_owned()))
}

fn exists(lua: &Lua) -> LuaResult<LuaFunction> {
    lua.create_function(|_, path: String| Ok(expand_home(&path).exists()))
}

fn find(lua: &Lua) -> LuaResult<LuaFunction> {
    lua.create_function(|_, (dir, patterns): (String, LuaVariadic<String>)| {
        let dir = expand_home(&dir);
        let mut found = Vec::new();
        for pattern in patterns.iter() {
            let full = dir.join(pattern);
            let entries = glob::glob(&full.to_string_lossy())
                .map_err(|e| LuaError::runtime(format!("find: bad pattern '{}': {}", pattern, e)))?;
            for entry in entries.flatten() {
                if let Ok(relative) = entry.strip_prefix(&dir) {
                    found.push(relative.to_string_lossy().into_owned());
                }
            }
        }
        found.sort();
        found.dedup();
        Ok(found)
    })
}
