//! Tasks and builtin functions
//!
//! Tasks are registered in a [`Registry`] as a name, an argument [`Schema`](binder::Schema)
//! and a handler. Builtins are functions installed in the interpreter.

pub mod binder;
pub mod builtins;
pub mod core;
pub mod registry;
pub mod system;

pub use binder::{BoundArgs, Field, Schema, Shape};
pub use registry::*;
